// =============================================================================
// HypeStock Metrics: Main Entry Point
// =============================================================================
//
// Reads an OHLCV file, computes indicators for one symbol and prints a JSON
// envelope.  Failures are reported as an `error` envelope on stdout with a
// non-zero exit code.  `init-config` writes the effective config instead.
// =============================================================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hypestock_metrics::runtime_config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use hypestock_metrics::{Envelope, FileSource, IndicatorRequest, MetricsService, RuntimeConfig};

#[derive(Parser, Debug)]
#[command(name = "hypestock-metrics", version, about = "OHLCV technical-indicator engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full indicator table, one row per input bar
    Indicators(QueryArgs),
    /// Latest indicator state with labels
    Snapshot(QueryArgs),
    /// Write the effective runtime config (file + env overrides) to disk
    InitConfig {
        /// Destination; defaults to the configured config path
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// CSV or JSON file with OHLCV rows
    #[arg(short, long)]
    input: PathBuf,

    /// Symbol to compute (case-insensitive)
    #[arg(short, long)]
    symbol: String,

    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Write the envelope here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env();

    // ── 2. Build request ──────────────────────────────────────────────────
    let (args, is_snapshot) = match cli.command {
        Command::Indicators(args) => (args, false),
        Command::Snapshot(args) => (args, true),
        Command::InitConfig { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(&config_path));
            return config.save(&path);
        }
    };
    let request = IndicatorRequest::new(args.symbol.trim()).with_range(args.from, args.to);
    info!(
        request_id = %request.request_id,
        symbol = %request.symbol,
        input = %args.input.display(),
        "request received"
    );

    // ── 3. Compute ────────────────────────────────────────────────────────
    let service = MetricsService::new(config, FileSource::new(&args.input));
    let result = if is_snapshot {
        service.snapshot(&request).await
    } else {
        service.indicators(&request).await
    };

    let (envelope, failed) = match result {
        Ok(envelope) => (envelope, false),
        Err(e) => {
            error!(request_id = %request.request_id, error = %format!("{e:#}"), "request failed");
            (Envelope::error(request.request_id.clone(), format!("{e:#}")), true)
        }
    };

    // ── 4. Emit ───────────────────────────────────────────────────────────
    let body = if service.config().pretty_output {
        serde_json::to_string_pretty(&envelope)
    } else {
        serde_json::to_string(&envelope)
    }
    .context("failed to serialise envelope")?;

    match &args.output {
        Some(path) if !failed => {
            std::fs::write(path, body)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "envelope written");
        }
        _ => println!("{body}"),
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
