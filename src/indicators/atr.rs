// =============================================================================
// Average True Range (ATR): Wilder's Smoothing Method
// =============================================================================
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// Terms whose inputs are missing are dropped from the max; the first bar has
// no previous close so its TR is simply H - L.
//
// ATR is the Wilder average (alpha = 1/period) of TR, defined once `period`
// TR values have been observed.  With a complete series that is row
// `period - 1`.
// =============================================================================

use super::ema::wilder_smooth;

/// True Range column.
pub fn calculate_true_range(
    highs: &[Option<f64>],
    lows: &[Option<f64>],
    closes: &[Option<f64>],
) -> Vec<Option<f64>> {
    let len = highs.len().min(lows.len()).min(closes.len());
    (0..len)
        .map(|i| {
            let prev_close = if i > 0 { closes[i - 1] } else { None };
            true_range(highs[i], lows[i], prev_close)
        })
        .collect()
}

fn true_range(high: Option<f64>, low: Option<f64>, prev_close: Option<f64>) -> Option<f64> {
    let hl = high.zip(low).map(|(h, l)| h - l);
    let hc = high.zip(prev_close).map(|(h, c)| (h - c).abs());
    let lc = low.zip(prev_close).map(|(l, c)| (l - c).abs());

    [hl, hc, lc].into_iter().flatten().reduce(f64::max)
}

/// ATR column with Wilder smoothing over `period` bars.
pub fn calculate_atr(
    highs: &[Option<f64>],
    lows: &[Option<f64>],
    closes: &[Option<f64>],
    period: usize,
) -> Vec<Option<f64>> {
    wilder_smooth(&calculate_true_range(highs, lows, closes), period)
}

/// High - low per bar.
pub fn calculate_daily_range(highs: &[Option<f64>], lows: &[Option<f64>]) -> Vec<Option<f64>> {
    highs
        .iter()
        .zip(lows)
        .map(|(h, l)| h.zip(*l).map(|(h, l)| h - l))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    /// Split (high, low, close) triples into columns.
    fn columns(bars: &[(f64, f64, f64)]) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
        (
            bars.iter().map(|b| Some(b.0)).collect(),
            bars.iter().map(|b| Some(b.1)).collect(),
            bars.iter().map(|b| Some(b.2)).collect(),
        )
    }

    #[test]
    fn true_range_first_bar_is_high_minus_low() {
        let (h, l, c) = columns(&[(105.0, 95.0, 100.0)]);
        assert_eq!(calculate_true_range(&h, &l, &c), vec![Some(10.0)]);
    }

    #[test]
    fn true_range_uses_prev_close_on_gap() {
        // Gap up: |115 - 95| = 20 > 115 - 108 = 7
        let (h, l, c) = columns(&[(105.0, 95.0, 95.0), (115.0, 108.0, 112.0)]);
        assert_eq!(calculate_true_range(&h, &l, &c)[1], Some(20.0));
    }

    #[test]
    fn true_range_skips_missing_terms() {
        let highs = vec![Some(10.0), None];
        let lows = vec![Some(8.0), Some(7.0)];
        let closes = vec![Some(9.0), Some(7.5)];
        // Only |low - prev_close| = 2 survives on row 1.
        assert_eq!(calculate_true_range(&highs, &lows, &closes)[1], Some(2.0));
    }

    #[test]
    fn atr_period_zero() {
        let (h, l, c) = columns(&[(105.0, 95.0, 102.0); 20]);
        assert!(calculate_atr(&h, &l, &c, 0).iter().all(Option::is_none));
    }

    #[test]
    fn atr_gating() {
        let (h, l, c) = columns(&[(105.0, 95.0, 100.0); 20]);
        let atr = calculate_atr(&h, &l, &c, 14);
        assert!(atr[..13].iter().all(Option::is_none));
        assert!(atr[13..].iter().all(|v| (v.unwrap() - 10.0).abs() < 1e-12));
    }

    #[test]
    fn atr_increasing_volatility() {
        let bars: Vec<(f64, f64, f64)> = (0..30)
            .map(|i| {
                let spread = 1.0 + i as f64 * 0.5;
                (100.0 + spread, 100.0 - spread, 100.0)
            })
            .collect();
        let (h, l, c) = columns(&bars);
        let atr = calculate_atr(&h, &l, &c, 5);
        assert!(atr[29].unwrap() > 5.0);
    }

    #[test]
    fn daily_range_per_bar() {
        let highs = vec![Some(3.0), None];
        let lows = vec![Some(1.0), Some(1.0)];
        assert_eq!(calculate_daily_range(&highs, &lows), vec![Some(2.0), None]);
    }
}
