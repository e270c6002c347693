// =============================================================================
// Bollinger Band Width
// =============================================================================
//
// upper = SMA + k*σ,  lower = SMA - k*σ
// width = (upper - lower) / SMA
//
// σ is the sample standard deviation over the same window as the SMA.  A zero
// middle band gives a width of 0 rather than a division error.

/// Band width column from a precomputed SMA and rolling standard deviation.
pub fn calculate_bb_width(
    middle: &[Option<f64>],
    std_dev: &[Option<f64>],
    num_std: f64,
) -> Vec<Option<f64>> {
    middle
        .iter()
        .zip(std_dev)
        .map(|(m, s)| {
            let (m, s) = ((*m)?, (*s)?);
            if m == 0.0 {
                return Some(0.0);
            }
            let upper = m + num_std * s;
            let lower = m - num_std * s;
            Some((upper - lower) / m)
        })
        .collect()
}
