// =============================================================================
// Exponential Moving Average (EMA) and Wilder Smoothing
// =============================================================================
//
// Both are the same unadjusted recursion with a different smoothing factor:
//
//   EMA(span):       alpha = 2 / (span + 1)
//   Wilder(period):  alpha = 1 / period
//
//   avg_0 = x_0                                  (seeded from the first value)
//   avg_t = (1 - alpha) * avg_{t-1} + alpha * x_t
//
// Missing inputs do not reset the average.  The held value is emitted for the
// missing row, and the next observation is blended against the held average
// decayed by (1 - alpha) for every row skipped:
//
//   w     = (1 - alpha)^(gap + 1)
//   avg_t = (w * avg_prev + alpha * x_t) / (w + alpha)
//
// With no gap, w + alpha = 1 and this reduces to the plain recursion.
// =============================================================================

/// Incremental, unadjusted exponential smoother.
#[derive(Debug, Clone)]
pub struct Ewm {
    alpha: f64,
    min_periods: usize,
    average: Option<f64>,
    old_weight: f64,
    observations: usize,
}

impl Ewm {
    /// `alpha` in (0, 1]; `min_periods` is the number of observations required
    /// before a value is emitted (treated as at least one).
    pub fn new(alpha: f64, min_periods: usize) -> Self {
        Self {
            alpha,
            min_periods: min_periods.max(1),
            average: None,
            old_weight: 1.0,
            observations: 0,
        }
    }

    /// EMA keyed by span, defined from the first observation.
    pub fn span(span: usize) -> Self {
        Self::new(2.0 / (span as f64 + 1.0), 1)
    }

    /// Wilder smoothing: alpha = 1/period, defined after `period` observations.
    pub fn wilder(period: usize) -> Self {
        Self::new(1.0 / period as f64, period)
    }

    /// Feed the next row and return the current average, if defined.
    pub fn update(&mut self, value: Option<f64>) -> Option<f64> {
        match (self.average, value) {
            (Some(prev), observed) => {
                self.old_weight *= 1.0 - self.alpha;
                if let Some(x) = observed {
                    self.observations += 1;
                    self.average =
                        Some((self.old_weight * prev + self.alpha * x) / (self.old_weight + self.alpha));
                    self.old_weight = 1.0;
                }
            }
            (None, Some(x)) => {
                self.average = Some(x);
                self.observations = 1;
            }
            (None, None) => {}
        }

        if self.observations >= self.min_periods {
            self.average
        } else {
            None
        }
    }
}

/// EMA column for the given `span`.
///
/// # Edge cases
/// - `span == 0` => every row missing
/// - Leading missing values are skipped; the EMA seeds from the first present value.
pub fn calculate_ema(values: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    if span == 0 {
        return vec![None; values.len()];
    }
    let mut ewm = Ewm::span(span);
    values.iter().map(|&v| ewm.update(v)).collect()
}

/// Wilder-smoothed column, defined once `period` observations have been seen.
pub fn wilder_smooth(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    let mut ewm = Ewm::wilder(period);
    values.iter().map(|&v| ewm.update(v)).collect()
}

/// MACD line: EMA(12) - EMA(26).  Defined from the first close but only
/// meaningful once ~26 rows have accumulated.
pub fn calculate_macd(closes: &[Option<f64>]) -> Vec<Option<f64>> {
    let fast = calculate_ema(closes, 12);
    let slow = calculate_ema(closes, 26);
    fast.iter()
        .zip(&slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect()
}
