// =============================================================================
// On-Balance Volume (OBV) and its slope
// =============================================================================
//
// OBV_t = OBV_{t-1} + signed volume, where the sign follows the close:
//   close up   => +volume
//   close down => -volume
//   tie, first row, or a missing close => 0 (volume ignored)
//
// A missing volume on an up/down row makes that row's OBV missing but does not
// poison the running total for later rows.
//
// slope_k = (OBV_t - OBV_{t-k}) / k

/// Signed volume contribution of one row given the previous close.
pub fn obv_contribution(prev_close: Option<f64>, close: Option<f64>, volume: Option<f64>) -> Option<f64> {
    match (prev_close, close) {
        (Some(prev), Some(cur)) if cur > prev => volume,
        (Some(prev), Some(cur)) if cur < prev => volume.map(|v| -v),
        _ => Some(0.0),
    }
}

/// Running OBV column.
pub fn calculate_obv(closes: &[Option<f64>], volumes: &[Option<f64>]) -> Vec<Option<f64>> {
    let len = closes.len().min(volumes.len());
    let mut total = 0.0;

    (0..len)
        .map(|i| {
            let prev_close = if i > 0 { closes[i - 1] } else { None };
            let change = obv_contribution(prev_close, closes[i], volumes[i])?;
            total += change;
            Some(total)
        })
        .collect()
}

/// Average OBV change per row over the trailing `period` rows.
pub fn calculate_obv_slope(obv: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; obv.len()];
    }
    (0..obv.len())
        .map(|i| {
            let base = obv[i.checked_sub(period)?]?;
            Some((obv[i]? - base) / period as f64)
        })
        .collect()
}
