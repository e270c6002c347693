// =============================================================================
// MetricsService: request pipeline around the indicator engine
// =============================================================================
//
// fetch -> normalize -> truncate -> compute -> wrap in an envelope
//
// The source and the engine are synchronous, so both run on the blocking pool.
// The caller gives up once fetch plus compute exceed `compute_timeout_ms`; the
// task itself is never interrupted and its result is simply discarded.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::engine::{compute_series, IndicatorRow};
use crate::envelope::{Envelope, IndicatorPayload, IndicatorRequest};
use crate::normalize::Series;
use crate::runtime_config::RuntimeConfig;
use crate::snapshot::Snapshot;
use crate::source::OhlcvSource;

pub const INDICATORS_KIND: &str = "indicators";
pub const SNAPSHOT_KIND: &str = "snapshot";

pub struct MetricsService<S> {
    config: RuntimeConfig,
    source: Arc<S>,
}

impl<S> MetricsService<S>
where
    S: OhlcvSource + Send + Sync + 'static,
{
    pub fn new(config: RuntimeConfig, source: S) -> Self {
        Self {
            config,
            source: Arc::new(source),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Full indicator table for the requested symbol and range.
    pub async fn indicators(&self, request: &IndicatorRequest) -> Result<Envelope> {
        let rows = self.compute(request).await?;
        let payload = IndicatorPayload {
            symbol: request.symbol.clone(),
            count: rows.len(),
            rows,
        };
        Envelope::new(INDICATORS_KIND, request.request_id.clone(), payload)
    }

    /// Latest-row snapshot; the payload is `null` when no rows matched.
    pub async fn snapshot(&self, request: &IndicatorRequest) -> Result<Envelope> {
        let rows = self.compute(request).await?;
        let snapshot = Snapshot::latest(&rows);
        match &snapshot {
            Some(snap) => info!(request_id = %request.request_id, summary = %snap.summary(), "snapshot built"),
            None => warn!(request_id = %request.request_id, symbol = %request.symbol, "no rows for snapshot"),
        }
        Envelope::new(SNAPSHOT_KIND, request.request_id.clone(), snapshot)
    }

    async fn compute(&self, request: &IndicatorRequest) -> Result<Vec<IndicatorRow>> {
        let source = Arc::clone(&self.source);
        let owned = request.clone();
        let max_rows = self.config.max_rows;
        let limit = Duration::from_millis(self.config.compute_timeout_ms);

        let task = tokio::task::spawn_blocking(move || -> Result<Vec<IndicatorRow>> {
            let raw = source
                .fetch(&owned)
                .with_context(|| format!("failed to fetch rows for {}", owned.symbol))?;
            let fetched = raw.len();
            let series = Series::normalize(raw).tail(max_rows);
            debug!(fetched, kept = series.len(), "series ready for the engine");
            Ok(compute_series(&series))
        });

        let rows = tokio::time::timeout(limit, task)
            .await
            .with_context(|| {
                format!(
                    "fetching and computing indicators for {} timed out after {} ms",
                    request.symbol, self.config.compute_timeout_ms
                )
            })?
            .context("indicator computation task failed")??;

        info!(
            request_id = %request.request_id,
            symbol = %request.symbol,
            rows = rows.len(),
            "indicators computed"
        );
        Ok(rows)
    }
}
