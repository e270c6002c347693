// =============================================================================
// Series Normalizer
// =============================================================================
//
// Turns an arbitrarily-ordered batch of raw rows for one symbol into an
// ascending, numerically-coerced `Series`.  Nothing here ever fails: bad
// numeric fields become missing values, empty input becomes an empty series.

use tracing::{debug, warn};

use crate::types::{Bar, OhlcvRow};

/// A time-ordered run of normalized bars for a single instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    /// Sort ascending by time and coerce every numeric field.
    pub fn normalize(rows: Vec<OhlcvRow>) -> Self {
        Self::from_bars(rows.iter().map(Bar::from).collect())
    }

    /// Sort already-coerced bars.  The sort is stable so rows sharing a
    /// timestamp keep their input order, which makes normalization idempotent.
    pub fn from_bars(mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|bar| bar.time);

        if let Some(first) = bars.first() {
            let mixed = bars.iter().filter(|b| b.symbol != first.symbol).count();
            if mixed > 0 {
                warn!(
                    symbol = %first.symbol,
                    mismatched = mixed,
                    "series contains rows for more than one symbol"
                );
            }
        }

        let duplicates = bars.windows(2).filter(|w| w[0].time == w[1].time).count();
        if duplicates > 0 {
            warn!(duplicates, "series contains duplicate timestamps");
        }

        debug!(rows = bars.len(), "series normalized");
        Self { bars }
    }

    /// Keep only the most recent `max_rows` bars.
    pub fn tail(mut self, max_rows: usize) -> Self {
        if self.bars.len() > max_rows {
            let dropped = self.bars.len() - max_rows;
            self.bars.drain(..dropped);
            debug!(dropped, kept = max_rows, "series truncated to most recent rows");
        }
        self
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Symbol of the first bar, if any.
    pub fn symbol(&self) -> Option<&str> {
        self.bars.first().map(|b| b.symbol.as_str())
    }

    pub fn highs(&self) -> Vec<Option<f64>> {
        self.column(|b| b.high)
    }

    pub fn lows(&self) -> Vec<Option<f64>> {
        self.column(|b| b.low)
    }

    pub fn closes(&self) -> Vec<Option<f64>> {
        self.column(|b| b.close)
    }

    pub fn volumes(&self) -> Vec<Option<f64>> {
        self.column(|b| b.volume)
    }

    fn column(&self, field: impl Fn(&Bar) -> Option<f64>) -> Vec<Option<f64>> {
        self.bars.iter().map(field).collect()
    }
}
