// =============================================================================
// HypeStock Metrics: OHLCV technical-indicator engine
// =============================================================================
//
// Raw OHLCV rows in, one enriched row per input out.  The engine modules
// (`normalize`, `indicators`, `engine`, `sanitize`) are pure and synchronous;
// `source`, `service` and `envelope` form the calling layer around them.
// =============================================================================

pub mod engine;
pub mod envelope;
pub mod indicators;
pub mod normalize;
pub mod runtime_config;
pub mod sanitize;
pub mod service;
pub mod snapshot;
pub mod source;
pub mod types;

pub use engine::{compute_indicators, compute_series, IndicatorRow};
pub use envelope::{Envelope, IndicatorPayload, IndicatorRequest};
pub use normalize::Series;
pub use runtime_config::RuntimeConfig;
pub use service::MetricsService;
pub use snapshot::{AdxLabel, RsiLabel, Snapshot, TrendLabel};
pub use source::{FileSource, InMemorySource, OhlcvSource};
pub use types::{Bar, OhlcvRow, RawValue};
