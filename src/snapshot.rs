// =============================================================================
// Latest-row snapshot for the explanation service
// =============================================================================
//
// The prediction-explanation consumer only needs the most recent state of a
// series, with a few coarse labels it can quote directly.

use serde::{Deserialize, Serialize};

use crate::engine::IndicatorRow;
use crate::types::{format_time, serialize_time};

const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;
const ADX_TRENDING: f64 = 25.0;
const ADX_RANGING: f64 = 20.0;

// =============================================================================
// Labels
// =============================================================================

/// Where RSI sits relative to the 70 / 30 bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsiLabel {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiLabel {
    pub fn classify(rsi: f64) -> Self {
        if rsi >= RSI_OVERBOUGHT {
            Self::Overbought
        } else if rsi <= RSI_OVERSOLD {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }
}

impl std::fmt::Display for RsiLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overbought => write!(f, "OVERBOUGHT"),
            Self::Oversold => write!(f, "OVERSOLD"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Close relative to the 50-row moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendLabel {
    AboveMa50,
    BelowMa50,
}

impl TrendLabel {
    pub fn classify(dist_from_ma50: f64) -> Self {
        if dist_from_ma50 >= 0.0 {
            Self::AboveMa50
        } else {
            Self::BelowMa50
        }
    }
}

impl std::fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AboveMa50 => write!(f, "ABOVE_MA50"),
            Self::BelowMa50 => write!(f, "BELOW_MA50"),
        }
    }
}

/// Trend strength from ADX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdxLabel {
    /// ADX above 25.
    Trending,
    /// ADX below 20.
    Ranging,
    Weak,
}

impl AdxLabel {
    pub fn classify(adx: f64) -> Self {
        if adx > ADX_TRENDING {
            Self::Trending
        } else if adx < ADX_RANGING {
            Self::Ranging
        } else {
            Self::Weak
        }
    }
}

impl std::fmt::Display for AdxLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trending => write!(f, "TRENDING"),
            Self::Ranging => write!(f, "RANGING"),
            Self::Weak => write!(f, "WEAK"),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Most recent indicator state plus human-readable labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub symbol: String,
    #[serde(
        serialize_with = "serialize_time",
        deserialize_with = "crate::types::deserialize_time"
    )]
    pub as_of: chrono::DateTime<chrono::Utc>,
    pub close: Option<f64>,
    pub rsi: Option<f64>,
    pub rsi_label: Option<RsiLabel>,
    pub trend_label: Option<TrendLabel>,
    pub adx: Option<f64>,
    pub adx_label: Option<AdxLabel>,
    pub ma20: Option<f64>,
    pub ma50: Option<f64>,
    pub macd: Option<f64>,
    pub atr: Option<f64>,
    pub bb_width: Option<f64>,
    pub daily_return_1d: Option<f64>,
    pub cumulative_return: Option<f64>,
}

impl Snapshot {
    /// Build a snapshot from the last row, or `None` for an empty table.
    pub fn latest(rows: &[IndicatorRow]) -> Option<Self> {
        let row = rows.last()?;
        Some(Self {
            symbol: row.bar.symbol.clone(),
            as_of: row.bar.time,
            close: row.bar.close,
            rsi: row.rsi,
            rsi_label: row.rsi.map(RsiLabel::classify),
            trend_label: row.dist_from_ma50.map(TrendLabel::classify),
            adx: row.adx,
            adx_label: row.adx.map(AdxLabel::classify),
            ma20: row.ma20,
            ma50: row.ma50,
            macd: row.macd,
            atr: row.atr,
            bb_width: row.bb_width,
            daily_return_1d: row.daily_return_1d,
            cumulative_return: row.cumulative_return,
        })
    }

    /// One-line plain-text summary suitable for prompting.
    pub fn summary(&self) -> String {
        format!(
            "{} as of {}: close={} rsi={} ({}) adx={} ({}) trend={} macd={} atr={}",
            self.symbol,
            format_time(&self.as_of),
            or_na(self.close),
            or_na(self.rsi),
            or_na(self.rsi_label),
            or_na(self.adx),
            or_na(self.adx_label),
            or_na(self.trend_label),
            or_na(self.macd),
            or_na(self.atr),
        )
    }
}

fn or_na<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compute_indicators;
    use crate::types::{OhlcvRow, RawValue};
    use chrono::{Duration, TimeZone, Utc};

    fn series(closes: impl Iterator<Item = f64>) -> Vec<OhlcvRow> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .enumerate()
            .map(|(i, c)| OhlcvRow {
                time: base + Duration::days(i as i64),
                symbol: "NVDA".into(),
                open: RawValue::Number(c),
                high: RawValue::Number(c + 1.0),
                low: RawValue::Number(c - 1.0),
                close: RawValue::Number(c),
                volume: RawValue::Number(500.0),
            })
            .collect()
    }

    #[test]
    fn empty_table_has_no_snapshot() {
        assert!(Snapshot::latest(&[]).is_none());
    }

    #[test]
    fn uptrend_labels() {
        let rows = compute_indicators(series((0..60).map(|i| 100.0 + i as f64)));
        let snap = Snapshot::latest(&rows).unwrap();
        assert_eq!(snap.symbol, "NVDA");
        assert_eq!(snap.close, Some(159.0));
        assert_eq!(snap.rsi_label, Some(RsiLabel::Overbought));
        assert_eq!(snap.trend_label, Some(TrendLabel::AboveMa50));
        assert_eq!(snap.adx_label, Some(AdxLabel::Trending));
        assert!(snap.summary().starts_with("NVDA as of 2024-02-29T00:00:00Z: close=159"));
        assert!(snap.summary().contains("(OVERBOUGHT)"));
    }

    #[test]
    fn downtrend_labels() {
        let rows = compute_indicators(series((0..60).map(|i| 200.0 - i as f64)));
        let snap = Snapshot::latest(&rows).unwrap();
        assert_eq!(snap.rsi_label, Some(RsiLabel::Oversold));
        assert_eq!(snap.trend_label, Some(TrendLabel::BelowMa50));
    }

    #[test]
    fn short_series_has_no_labels() {
        let rows = compute_indicators(series((0..5).map(|i| 10.0 + i as f64)));
        let snap = Snapshot::latest(&rows).unwrap();
        assert!(snap.rsi_label.is_none());
        assert!(snap.trend_label.is_none());
        assert!(snap.adx_label.is_none());
        assert!(snap.summary().contains("rsi=n/a (n/a)"));
    }

    #[test]
    fn label_thresholds() {
        assert_eq!(RsiLabel::classify(70.0), RsiLabel::Overbought);
        assert_eq!(RsiLabel::classify(50.0), RsiLabel::Neutral);
        assert_eq!(RsiLabel::classify(30.0), RsiLabel::Oversold);
        assert_eq!(AdxLabel::classify(25.0), AdxLabel::Weak);
        assert_eq!(AdxLabel::classify(22.0), AdxLabel::Weak);
        assert_eq!(AdxLabel::classify(10.0), AdxLabel::Ranging);
        assert_eq!(TrendLabel::classify(0.0), TrendLabel::AboveMa50);
    }

    #[test]
    fn labels_serialize_and_display_in_screaming_case() {
        assert_eq!(serde_json::to_value(RsiLabel::Overbought).unwrap(), "OVERBOUGHT");
        assert_eq!(serde_json::to_value(TrendLabel::AboveMa50).unwrap(), "ABOVE_MA50");
        assert_eq!(serde_json::to_value(TrendLabel::BelowMa50).unwrap(), "BELOW_MA50");
        assert_eq!(serde_json::to_value(AdxLabel::Weak).unwrap(), "WEAK");
        assert_eq!(TrendLabel::BelowMa50.to_string(), "BELOW_MA50");
        assert_eq!(AdxLabel::Ranging.to_string(), "RANGING");

        let back: TrendLabel = serde_json::from_str(r#""ABOVE_MA50""#).unwrap();
        assert_eq!(back, TrendLabel::AboveMa50);
    }
}
