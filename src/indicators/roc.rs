// =============================================================================
// Rate of Change: returns and lags
// =============================================================================
//
// ROC as a fraction (not a percentage):
//   ROC_k = value_t / value_{t-k} - 1
//
// Missing when either endpoint is missing or the base is zero.

/// Fractional change over `period` rows.
pub fn calculate_roc(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            let base = values.get(i.checked_sub(period)?).copied().flatten()?;
            let cur = values[i]?;
            if base == 0.0 {
                return None;
            }
            Some(cur / base - 1.0)
        })
        .collect()
}

/// Return since the first row: `close_t / close_0 - 1`.
///
/// A zero first close pins every row to 0; a missing first close leaves the
/// whole column missing.
pub fn calculate_cumulative_return(closes: &[Option<f64>]) -> Vec<Option<f64>> {
    match closes.first().copied().flatten() {
        Some(first) if first == 0.0 => vec![Some(0.0); closes.len()],
        Some(first) => closes.iter().map(|c| Some((*c)? / first - 1.0)).collect(),
        None => vec![None; closes.len()],
    }
}

/// Shift a column back by `lag` rows: row `i` takes row `i - lag`.
pub fn shift(values: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| i.checked_sub(lag).and_then(|j| values[j]))
        .collect()
}
