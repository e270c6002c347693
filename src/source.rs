// =============================================================================
// Data-access collaborators
// =============================================================================
//
// The engine never touches storage.  A source hands it the raw rows for one
// symbol; rows that are not OHLCV rows at all (no usable timestamp) are
// filtered out here, before the engine sees them.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::envelope::IndicatorRequest;
use crate::types::{parse_time, OhlcvRow, RawValue};

/// Supplies raw rows for a request.
pub trait OhlcvSource {
    fn fetch(&self, request: &IndicatorRequest) -> Result<Vec<OhlcvRow>>;
}

/// Keep rows for the requested symbol inside the requested date range.
///
/// Rows without a symbol are assumed to belong to the request and are stamped
/// with it.  Loaders only produce such rows for inputs that carry no symbol
/// field at all; a blank symbol in a multi-symbol input is dropped earlier.
pub fn filter_rows(rows: Vec<OhlcvRow>, request: &IndicatorRequest) -> Vec<OhlcvRow> {
    rows.into_iter()
        .filter_map(|mut row| {
            if row.symbol.is_empty() {
                row.symbol = request.symbol.clone();
            } else if !row.symbol.eq_ignore_ascii_case(&request.symbol) {
                return None;
            }
            request.covers(row.time.date_naive()).then_some(row)
        })
        .collect()
}

// =============================================================================
// InMemorySource
// =============================================================================

/// Rows already held by the caller.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    rows: Vec<OhlcvRow>,
}

impl InMemorySource {
    pub fn new(rows: Vec<OhlcvRow>) -> Self {
        Self { rows }
    }
}

impl OhlcvSource for InMemorySource {
    fn fetch(&self, request: &IndicatorRequest) -> Result<Vec<OhlcvRow>> {
        Ok(filter_rows(self.rows.clone(), request))
    }
}

// =============================================================================
// FileSource
// =============================================================================

const TIME_HEADERS: &[&str] = &["time", "date", "timestamp", "datetime"];
const SYMBOL_HEADERS: &[&str] = &["symbol", "stock_code", "stock code", "ticker", "code"];

/// Rows read from a CSV or JSON file, chosen by extension.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<Vec<OhlcvRow>> {
        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => load_csv(&self.path),
            Some("json") => load_json(&self.path),
            _ => bail!("unsupported input format: {}", self.path.display()),
        }
    }
}

impl OhlcvSource for FileSource {
    fn fetch(&self, request: &IndicatorRequest) -> Result<Vec<OhlcvRow>> {
        let rows = filter_rows(self.read_all()?, request);
        info!(
            path = %self.path.display(),
            symbol = %request.symbol,
            rows = rows.len(),
            "rows fetched"
        );
        Ok(rows)
    }
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

/// Load OHLCV rows from a CSV file with a header row.
pub fn load_csv(path: &Path) -> Result<Vec<OhlcvRow>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read CSV header from {}", path.display()))?
        .clone();

    let Some(time_idx) = find_column(&headers, TIME_HEADERS) else {
        bail!("{} has no time/date column", path.display());
    };
    let symbol_idx = find_column(&headers, SYMBOL_HEADERS);
    let field_idx = |name: &str| find_column(&headers, &[name]);
    let (open_idx, high_idx, low_idx, close_idx, volume_idx) = (
        field_idx("open"),
        field_idx("high"),
        field_idx("low"),
        field_idx("close"),
        field_idx("volume"),
    );

    let raw = |record: &csv::StringRecord, idx: Option<usize>| -> RawValue {
        idx.and_then(|i| record.get(i)).map_or(RawValue::Missing, RawValue::from)
    };

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    let mut unlabelled = 0usize;
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("malformed CSV record {} in {}", line + 1, path.display()))?;
        let Some(time) = record.get(time_idx).and_then(parse_time) else {
            skipped += 1;
            continue;
        };
        let symbol = match symbol_idx {
            Some(i) => match record.get(i).map(str::trim) {
                Some(s) if !s.is_empty() => s.to_string(),
                _ => {
                    unlabelled += 1;
                    continue;
                }
            },
            None => String::new(),
        };
        rows.push(OhlcvRow {
            time,
            symbol,
            open: raw(&record, open_idx),
            high: raw(&record, high_idx),
            low: raw(&record, low_idx),
            close: raw(&record, close_idx),
            volume: raw(&record, volume_idx),
        });
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped, "dropped rows without a usable timestamp");
    }
    if unlabelled > 0 {
        warn!(path = %path.display(), unlabelled, "dropped rows with a blank symbol");
    }
    Ok(rows)
}

/// A row that names a `symbol` key but leaves it empty or null.  Rows with no
/// `symbol` key at all are kept and stamped later.
fn has_blank_symbol(item: &serde_json::Value) -> bool {
    match item.get("symbol") {
        None => false,
        Some(serde_json::Value::String(s)) => s.trim().is_empty(),
        Some(serde_json::Value::Null) => true,
        Some(_) => false,
    }
}

/// Load OHLCV rows from a JSON file: either a top-level array or an object
/// with a `rows` or `data` array.
pub fn load_json(path: &Path) -> Result<Vec<OhlcvRow>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse JSON from {}", path.display()))?;

    let items = match json {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("rows").or_else(|| map.remove("data")) {
            Some(serde_json::Value::Array(items)) => items,
            _ => bail!("{} has no rows array", path.display()),
        },
        _ => bail!("{} is not an array of rows", path.display()),
    };

    let total = items.len();
    let mut unlabelled = 0usize;
    let mut rows = Vec::with_capacity(total);
    for item in items {
        if has_blank_symbol(&item) {
            unlabelled += 1;
            continue;
        }
        if let Ok(row) = serde_json::from_value::<OhlcvRow>(item) {
            rows.push(row);
        }
    }

    if unlabelled > 0 {
        warn!(path = %path.display(), unlabelled, "dropped rows with a blank symbol");
    }
    let malformed = total - rows.len() - unlabelled;
    if malformed > 0 {
        warn!(path = %path.display(), skipped = malformed, "dropped entries that are not OHLCV rows");
    }
    Ok(rows)
}
