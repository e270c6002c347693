// =============================================================================
// Average Directional Index (ADX)
// =============================================================================
//
// ADX quantifies trend **strength** regardless of direction.
//
// Calculation pipeline:
//   1. up = H_t - H_{t-1},  down = L_{t-1} - L_t
//      +DM = up   if up > down and up > 0, else 0
//      -DM = down if down > up and down > 0, else 0
//      (missing comparisons count as "no movement": DM = 0)
//   2. Wilder-smooth +DM and -DM (alpha = 1/period, `period` observations).
//   3. +DI = 100 * smoothed(+DM) / ATR,  -DI = 100 * smoothed(-DM) / ATR
//      A zero or missing ATR leaves both DI values missing.
//   4. DX  = 100 * |+DI - -DI| / (+DI + -DI), or 0 when the sum is 0.
//   5. ADX = Wilder-smoothed DX, again requiring `period` observations.
//
// With a complete series, DX is first defined on row `period - 1` and ADX on
// row `2 * period - 2`.
// =============================================================================

use super::ema::Ewm;

/// Compute the ADX column.
///
/// `atr` must be the ATR column for the same bars and `period` (computed
/// earlier in the pipeline).
pub fn calculate_adx(
    highs: &[Option<f64>],
    lows: &[Option<f64>],
    atr: &[Option<f64>],
    period: usize,
) -> Vec<Option<f64>> {
    let len = highs.len().min(lows.len()).min(atr.len());
    if period == 0 {
        return vec![None; len];
    }

    let mut smooth_plus_dm = Ewm::wilder(period);
    let mut smooth_minus_dm = Ewm::wilder(period);
    let mut smooth_dx = Ewm::wilder(period);
    let mut result = Vec::with_capacity(len);

    for i in 0..len {
        let (plus_dm, minus_dm) = if i == 0 {
            (0.0, 0.0)
        } else {
            directional_movement(highs[i], highs[i - 1], lows[i], lows[i - 1])
        };

        let plus = smooth_plus_dm.update(Some(plus_dm));
        let minus = smooth_minus_dm.update(Some(minus_dm));

        let safe_atr = atr[i].filter(|a| *a != 0.0);
        let dx = match (plus, minus, safe_atr) {
            (Some(p), Some(m), Some(a)) => compute_dx(100.0 * p / a, 100.0 * m / a),
            _ => None,
        };

        result.push(smooth_dx.update(dx));
    }

    result
}

// =============================================================================
// Internal helpers
// =============================================================================

fn directional_movement(
    high: Option<f64>,
    prev_high: Option<f64>,
    low: Option<f64>,
    prev_low: Option<f64>,
) -> (f64, f64) {
    let up = high.zip(prev_high).map(|(h, ph)| h - ph);
    let down = low.zip(prev_low).map(|(l, pl)| pl - l);

    match (up, down) {
        (Some(up), Some(down)) => {
            let plus_dm = if up > down && up > 0.0 { up } else { 0.0 };
            let minus_dm = if down > up && down > 0.0 { down } else { 0.0 };
            (plus_dm, minus_dm)
        }
        _ => (0.0, 0.0),
    }
}

/// DX from the two directional indicators.
fn compute_dx(plus_di: f64, minus_di: f64) -> Option<f64> {
    let di_sum = (plus_di + minus_di).abs();
    if di_sum == 0.0 {
        // Both +DI and -DI are zero, no directional movement.
        return Some(0.0);
    }
    let dx = 100.0 * (plus_di - minus_di).abs() / di_sum;
    dx.is_finite().then_some(dx)
}
