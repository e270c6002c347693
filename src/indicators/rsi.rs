// =============================================================================
// Relative Strength Index (RSI): Wilder's Smoothing
// =============================================================================
//
// Step 1: Price change per row: delta_i = close_i - close_{i-1}
//          (missing on row 0 and wherever either close is missing).
// Step 2: gain = max(delta, 0), loss = max(-delta, 0).
// Step 3: avg_gain / avg_loss are Wilder averages (alpha = 1/period) seeded
//          from the first delta and defined after `period` deltas.
// Step 4: RSI = 100                               if avg_loss == 0
//              = 100 - 100 / (1 + avg_gain/avg_loss)  otherwise
//
// The first defined RSI therefore lands on row `period` (row 0 has no delta).
// =============================================================================

use super::ema::Ewm;

/// Compute the RSI column for `closes`.
///
/// # Edge cases
/// - `period == 0` => every row missing
/// - Fewer than `period` deltas => every row missing
/// - No losses in the smoothed window => 100.0
pub fn calculate_rsi(closes: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; closes.len()];
    }

    let mut gains = Ewm::wilder(period);
    let mut losses = Ewm::wilder(period);
    let mut prev_close: Option<f64> = None;
    let mut result = Vec::with_capacity(closes.len());

    for &close in closes {
        let delta = match (prev_close, close) {
            (Some(prev), Some(cur)) => Some(cur - prev),
            _ => None,
        };
        prev_close = close;

        let avg_gain = gains.update(delta.map(|d| d.max(0.0)));
        let avg_loss = losses.update(delta.map(|d| (-d).max(0.0)));

        result.push(match (avg_gain, avg_loss) {
            (Some(g), Some(l)) => rsi_from_averages(g, l),
            _ => None,
        });
    }

    result
}

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rsi = 100.0 - 100.0 / (1.0 + avg_gain / avg_loss);
    rsi.is_finite().then_some(rsi)
}
