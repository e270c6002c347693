// =============================================================================
// Runtime Configuration: calling-layer limits with atomic save
// =============================================================================
//
// The indicator engine itself takes no configuration.  These settings govern
// the layer that feeds it: how many rows a single request may hand to the
// engine, how long the caller waits for a result, and how output is written.
//
// All fields carry `#[serde(default)]` so that adding new fields never breaks
// loading an older config file.  Environment variables override the file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "HYPESTOCK_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "runtime_config.json";

const MAX_ROWS_ENV: &str = "HYPESTOCK_MAX_ROWS";
const COMPUTE_TIMEOUT_ENV: &str = "HYPESTOCK_COMPUTE_TIMEOUT_MS";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_max_rows() -> usize {
    5_000
}

fn default_compute_timeout_ms() -> u64 {
    10_000
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Most recent rows kept per request; older rows are dropped before the
    /// engine runs.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// How long a caller waits for the engine before discarding the result.
    #[serde(default = "default_compute_timeout_ms")]
    pub compute_timeout_ms: u64,

    /// Pretty-print JSON output.
    #[serde(default)]
    pub pretty_output: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
            compute_timeout_ms: default_compute_timeout_ms(),
            pretty_output: false,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            max_rows = config.max_rows,
            compute_timeout_ms = config.compute_timeout_ms,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup.  Unparseable values are ignored
    /// with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(MAX_ROWS_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(v) if v > 0 => self.max_rows = v,
                _ => warn!(key = MAX_ROWS_ENV, value = %raw, "ignoring invalid override"),
            }
        }
        if let Some(raw) = lookup(COMPUTE_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(v) if v > 0 => self.compute_timeout_ms = v,
                _ => warn!(key = COMPUTE_TIMEOUT_ENV, value = %raw, "ignoring invalid override"),
            }
        }
    }
}
