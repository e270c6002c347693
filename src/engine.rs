// =============================================================================
// Indicator Engine
// =============================================================================
//
// Normalizer -> indicator stages -> sanitizer, over one in-memory series.
//
// Stages run in a fixed order and each only reads raw columns or columns an
// earlier stage produced:
//
//   1. trend        ma20, ma50, ema20
//   2. momentum     rsi, macd
//   3. volatility   volatility (std20), atr
//   4. volume       volume_ma20, volume_change_pct
//   5. performance  daily_return_1d/5d, cumulative_return, daily_range
//   6. composite    vol_close_corr_20d, bb_width, adx, obv_slope_5d
//   7. memory       lagged_return_t1/t3/t5, dist_from_ma50
//
// The engine is total: any syntactically valid series, including an empty one,
// produces one output row per input row and never an error.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::indicators::{
    calculate_adx, calculate_atr, calculate_bb_width, calculate_cumulative_return,
    calculate_daily_range, calculate_ema, calculate_macd, calculate_obv, calculate_obv_slope,
    calculate_roc, calculate_rolling_corr, calculate_rolling_std, calculate_rsi, calculate_sma,
    shift,
};
use crate::normalize::Series;
use crate::sanitize::sanitize;
use crate::types::{Bar, OhlcvRow};

const SHORT_WINDOW: usize = 20;
const LONG_WINDOW: usize = 50;
const WILDER_PERIOD: usize = 14;
const BOLLINGER_STD: f64 = 2.0;
const OBV_SLOPE_PERIOD: usize = 5;

/// Number of derived fields on every [`IndicatorRow`].
pub const DERIVED_FIELD_COUNT: usize = 21;

/// One normalized bar extended with every derived indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    #[serde(flatten)]
    pub bar: Bar,
    pub ma20: Option<f64>,
    pub ma50: Option<f64>,
    pub ema20: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub atr: Option<f64>,
    pub volatility: Option<f64>,
    pub volume_ma20: Option<f64>,
    pub volume_change_pct: Option<f64>,
    pub daily_return_1d: Option<f64>,
    pub daily_return_5d: Option<f64>,
    pub cumulative_return: Option<f64>,
    pub daily_range: Option<f64>,
    pub vol_close_corr_20d: Option<f64>,
    pub bb_width: Option<f64>,
    pub adx: Option<f64>,
    pub obv_slope_5d: Option<f64>,
    pub lagged_return_t1: Option<f64>,
    pub lagged_return_t3: Option<f64>,
    pub lagged_return_t5: Option<f64>,
    pub dist_from_ma50: Option<f64>,
}

impl IndicatorRow {
    /// Derived fields keyed by their output names, in output order.
    pub fn derived(&self) -> [(&'static str, Option<f64>); DERIVED_FIELD_COUNT] {
        [
            ("ma20", self.ma20),
            ("ma50", self.ma50),
            ("ema20", self.ema20),
            ("rsi", self.rsi),
            ("macd", self.macd),
            ("atr", self.atr),
            ("volatility", self.volatility),
            ("volume_ma20", self.volume_ma20),
            ("volume_change_pct", self.volume_change_pct),
            ("daily_return_1d", self.daily_return_1d),
            ("daily_return_5d", self.daily_return_5d),
            ("cumulative_return", self.cumulative_return),
            ("daily_range", self.daily_range),
            ("vol_close_corr_20d", self.vol_close_corr_20d),
            ("bb_width", self.bb_width),
            ("adx", self.adx),
            ("obv_slope_5d", self.obv_slope_5d),
            ("lagged_return_t1", self.lagged_return_t1),
            ("lagged_return_t3", self.lagged_return_t3),
            ("lagged_return_t5", self.lagged_return_t5),
            ("dist_from_ma50", self.dist_from_ma50),
        ]
    }

    /// Re-apply the output sanitizer to every derived field.
    pub fn sanitized(mut self) -> Self {
        for field in self.derived_mut() {
            *field = sanitize(*field);
        }
        self
    }

    fn derived_mut(&mut self) -> [&mut Option<f64>; DERIVED_FIELD_COUNT] {
        [
            &mut self.ma20,
            &mut self.ma50,
            &mut self.ema20,
            &mut self.rsi,
            &mut self.macd,
            &mut self.atr,
            &mut self.volatility,
            &mut self.volume_ma20,
            &mut self.volume_change_pct,
            &mut self.daily_return_1d,
            &mut self.daily_return_5d,
            &mut self.cumulative_return,
            &mut self.daily_range,
            &mut self.vol_close_corr_20d,
            &mut self.bb_width,
            &mut self.adx,
            &mut self.obv_slope_5d,
            &mut self.lagged_return_t1,
            &mut self.lagged_return_t3,
            &mut self.lagged_return_t5,
            &mut self.dist_from_ma50,
        ]
    }
}

/// Normalize raw rows and compute every indicator.
pub fn compute_indicators(rows: Vec<OhlcvRow>) -> Vec<IndicatorRow> {
    compute_series(&Series::normalize(rows))
}

/// Compute every indicator for an already-normalized series.
pub fn compute_series(series: &Series) -> Vec<IndicatorRow> {
    if series.is_empty() {
        trace!("empty series, nothing to compute");
        return Vec::new();
    }

    let columns = IndicatorColumns::compute(series);
    let rows: Vec<IndicatorRow> = series
        .bars()
        .iter()
        .enumerate()
        .map(|(i, bar)| columns.row(i, bar.clone()).sanitized())
        .collect();

    let defined = rows
        .last()
        .map_or(0, |row| row.derived().iter().filter(|(_, v)| v.is_some()).count());
    debug!(
        symbol = series.symbol().unwrap_or_default(),
        rows = rows.len(),
        defined_on_last_row = defined,
        total_fields = DERIVED_FIELD_COUNT,
        "indicators computed"
    );
    rows
}

// =============================================================================
// Column computation
// =============================================================================

/// Unsanitized indicator columns, each the same length as the series.
struct IndicatorColumns {
    ma20: Vec<Option<f64>>,
    ma50: Vec<Option<f64>>,
    ema20: Vec<Option<f64>>,
    rsi: Vec<Option<f64>>,
    macd: Vec<Option<f64>>,
    atr: Vec<Option<f64>>,
    volatility: Vec<Option<f64>>,
    volume_ma20: Vec<Option<f64>>,
    volume_change_pct: Vec<Option<f64>>,
    daily_return_1d: Vec<Option<f64>>,
    daily_return_5d: Vec<Option<f64>>,
    cumulative_return: Vec<Option<f64>>,
    daily_range: Vec<Option<f64>>,
    vol_close_corr_20d: Vec<Option<f64>>,
    bb_width: Vec<Option<f64>>,
    adx: Vec<Option<f64>>,
    obv_slope_5d: Vec<Option<f64>>,
    lagged_return_t1: Vec<Option<f64>>,
    lagged_return_t3: Vec<Option<f64>>,
    lagged_return_t5: Vec<Option<f64>>,
    dist_from_ma50: Vec<Option<f64>>,
}

impl IndicatorColumns {
    fn compute(series: &Series) -> Self {
        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();
        let volumes = series.volumes();

        // 1. Trend
        let ma20 = calculate_sma(&closes, SHORT_WINDOW);
        let ma50 = calculate_sma(&closes, LONG_WINDOW);
        let ema20 = calculate_ema(&closes, SHORT_WINDOW);
        trace!(stage = "trend", "stage complete");

        // 2. Momentum
        let rsi = calculate_rsi(&closes, WILDER_PERIOD);
        let macd = calculate_macd(&closes);
        trace!(stage = "momentum", "stage complete");

        // 3. Volatility
        let volatility = calculate_rolling_std(&closes, SHORT_WINDOW);
        let atr = calculate_atr(&highs, &lows, &closes, WILDER_PERIOD);
        trace!(stage = "volatility", "stage complete");

        // 4. Volume
        let volume_ma20 = calculate_sma(&volumes, SHORT_WINDOW);
        let volume_change_pct = calculate_roc(&volumes, 1);
        trace!(stage = "volume", "stage complete");

        // 5. Performance
        let daily_return_1d = calculate_roc(&closes, 1);
        let daily_return_5d = calculate_roc(&closes, 5);
        let cumulative_return = calculate_cumulative_return(&closes);
        let daily_range = calculate_daily_range(&highs, &lows);
        trace!(stage = "performance", "stage complete");

        // 6. Composite / correlation
        let vol_close_corr_20d = calculate_rolling_corr(&closes, &volumes, SHORT_WINDOW);
        let bb_width = calculate_bb_width(&ma20, &volatility, BOLLINGER_STD);
        let adx = calculate_adx(&highs, &lows, &atr, WILDER_PERIOD);
        let obv_slope_5d = calculate_obv_slope(&calculate_obv(&closes, &volumes), OBV_SLOPE_PERIOD);
        trace!(stage = "composite", "stage complete");

        // 7. Memory features
        let lagged_return_t1 = shift(&daily_return_1d, 1);
        let lagged_return_t3 = shift(&daily_return_1d, 3);
        let lagged_return_t5 = shift(&daily_return_1d, 5);
        let dist_from_ma50 = distance_from(&closes, &ma50);
        trace!(stage = "memory", "stage complete");

        Self {
            ma20,
            ma50,
            ema20,
            rsi,
            macd,
            atr,
            volatility,
            volume_ma20,
            volume_change_pct,
            daily_return_1d,
            daily_return_5d,
            cumulative_return,
            daily_range,
            vol_close_corr_20d,
            bb_width,
            adx,
            obv_slope_5d,
            lagged_return_t1,
            lagged_return_t3,
            lagged_return_t5,
            dist_from_ma50,
        }
    }

    fn row(&self, i: usize, bar: Bar) -> IndicatorRow {
        IndicatorRow {
            bar,
            ma20: self.ma20[i],
            ma50: self.ma50[i],
            ema20: self.ema20[i],
            rsi: self.rsi[i],
            macd: self.macd[i],
            atr: self.atr[i],
            volatility: self.volatility[i],
            volume_ma20: self.volume_ma20[i],
            volume_change_pct: self.volume_change_pct[i],
            daily_return_1d: self.daily_return_1d[i],
            daily_return_5d: self.daily_return_5d[i],
            cumulative_return: self.cumulative_return[i],
            daily_range: self.daily_range[i],
            vol_close_corr_20d: self.vol_close_corr_20d[i],
            bb_width: self.bb_width[i],
            adx: self.adx[i],
            obv_slope_5d: self.obv_slope_5d[i],
            lagged_return_t1: self.lagged_return_t1[i],
            lagged_return_t3: self.lagged_return_t3[i],
            lagged_return_t5: self.lagged_return_t5[i],
            dist_from_ma50: self.dist_from_ma50[i],
        }
    }
}

/// `(close - ma) / close`, 0 on a zero close, missing until `ma` is defined.
fn distance_from(closes: &[Option<f64>], ma: &[Option<f64>]) -> Vec<Option<f64>> {
    closes
        .iter()
        .zip(ma)
        .map(|(c, m)| {
            let (c, m) = ((*c)?, (*m)?);
            if c == 0.0 {
                return Some(0.0);
            }
            Some((c - m) / c)
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawValue;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn day(i: usize) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
    }

    /// Build rows from (close, volume) pairs with a +/-1 high/low band.
    fn rows(bars: &[(f64, f64)]) -> Vec<OhlcvRow> {
        bars.iter()
            .enumerate()
            .map(|(i, &(close, volume))| OhlcvRow {
                time: day(i),
                symbol: "TEST".into(),
                open: RawValue::Number(close),
                high: RawValue::Number(close + 1.0),
                low: RawValue::Number(close - 1.0),
                close: RawValue::Number(close),
                volume: RawValue::Number(volume),
            })
            .collect()
    }

    fn rising(n: usize) -> Vec<OhlcvRow> {
        rows(&(0..n).map(|i| (100.0 + i as f64, 1000.0)).collect::<Vec<_>>())
    }

    // ---- reference scenarios ----------------------------------------------

    #[test]
    fn rising_series_of_25_rows() {
        let out = compute_indicators(rising(25));
        assert_eq!(out.len(), 25);

        assert!(out[..19].iter().all(|r| r.ma20.is_none()));
        assert_eq!(out[19].ma20, Some(109.5));
        for w in out[19..].windows(2) {
            assert!(w[1].ma20.unwrap() > w[0].ma20.unwrap());
        }

        assert!(out[..14].iter().all(|r| r.rsi.is_none()));
        assert!(out[14..].iter().all(|r| r.rsi == Some(100.0)));

        assert_eq!(out[0].daily_return_1d, None);
        assert_eq!(out[1].daily_return_1d, Some(0.01));
        assert_eq!(out[24].daily_return_1d, Some(0.0081));
        for r in &out[1..] {
            let v = r.daily_return_1d.unwrap();
            assert!((0.008..=0.0101).contains(&v));
        }

        assert_eq!(out[19].volatility, Some(5.9161));
        assert_eq!(out[19].bb_width, Some(0.2161));
        assert_eq!(out[24].cumulative_return, Some(0.24));
        assert_eq!(out[0].ema20, Some(100.0));
        assert_eq!(out[0].macd, Some(0.0));
        assert_eq!(out[13].atr, Some(2.0));
        assert_eq!(out[12].atr, None);
        assert_eq!(out[5].obv_slope_5d, Some(1000.0));
        assert_eq!(out[4].obv_slope_5d, None);
        assert_eq!(out[2].lagged_return_t1, Some(0.01));
        assert!(out.iter().all(|r| r.volume_change_pct.map_or(true, |v| v == 0.0)));
        // Constant volume has zero variance.
        assert!(out.iter().all(|r| r.vol_close_corr_20d.is_none()));
        // ADX needs 27 rows.
        assert!(out.iter().all(|r| r.adx.is_none()));
        assert!(out.iter().all(|r| r.ma50.is_none() && r.dist_from_ma50.is_none()));
    }

    #[test]
    fn short_series_of_5_rows() {
        let out = compute_indicators(rows(&[(10.0, 5.0), (11.0, 6.0), (9.0, 7.0), (12.0, 8.0), (12.5, 9.0)]));
        assert_eq!(out.len(), 5);
        for r in &out {
            assert!(r.ma20.is_none());
            assert!(r.ma50.is_none());
            assert!(r.bb_width.is_none());
            assert!(r.dist_from_ma50.is_none());
            assert!(r.volatility.is_none());
            assert_eq!(r.daily_range, Some(2.0));
            assert!(r.cumulative_return.is_some());
        }
        assert_eq!(out[4].cumulative_return, Some(0.25));
    }

    #[test]
    fn zero_previous_volume_gives_missing_change() {
        let out = compute_indicators(rows(&[
            (10.0, 100.0),
            (10.0, 100.0),
            (10.0, 80.0),
            (10.0, 0.0),
            (10.0, 50.0),
        ]));
        assert_eq!(out[3].volume_change_pct, Some(-1.0));
        assert_eq!(out[4].volume_change_pct, None);
        assert_eq!(out[2].volume_change_pct, Some(-0.2));
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(compute_indicators(Vec::new()).is_empty());
    }

    #[test]
    fn tie_close_adds_nothing_to_obv() {
        // Closes: 10, 11, 12, 13, 14, 14 (tie), 15. Volume 100 everywhere.
        // OBV: 0, 100, 200, 300, 400, 400, 500.
        let out = compute_indicators(rows(&[
            (10.0, 100.0),
            (11.0, 100.0),
            (12.0, 100.0),
            (13.0, 100.0),
            (14.0, 100.0),
            (14.0, 100.0),
            (15.0, 100.0),
        ]));
        assert_eq!(out[5].obv_slope_5d, Some(80.0));
        assert_eq!(out[6].obv_slope_5d, Some(80.0));
    }

    // ---- other behaviour ----------------------------------------------------

    #[test]
    fn output_follows_normalized_order() {
        let mut input = rising(30);
        input.reverse();
        let out = compute_indicators(input);
        assert!(out.windows(2).all(|w| w[0].bar.time < w[1].bar.time));
        assert_eq!(out[0].bar.close, Some(100.0));
        assert_eq!(out, compute_indicators(rising(30)));
    }

    #[test]
    fn adx_defined_after_27_rows() {
        let out = compute_indicators(rising(40));
        assert!(out[..26].iter().all(|r| r.adx.is_none()));
        assert_eq!(out[26].adx, Some(100.0));
    }

    #[test]
    fn ma50_and_distance() {
        let out = compute_indicators(rising(60));
        assert!(out[..49].iter().all(|r| r.ma50.is_none()));
        assert_eq!(out[49].ma50, Some(124.5));
        // (149 - 124.5) / 149
        assert_eq!(out[49].dist_from_ma50, Some(0.1644));
    }

    #[test]
    fn malformed_close_is_missing_not_fatal() {
        let mut input = rising(25);
        input[3].close = RawValue::from("garbage");
        let out = compute_indicators(input);
        assert_eq!(out[3].bar.close, None);
        assert_eq!(out[3].daily_return_1d, None);
        assert_eq!(out[4].daily_return_1d, None);
        assert!(out[19].ma20.is_none());
        assert!(out[22].ma20.is_none());
        assert!(out[23].ma20.is_some());
        // Range does not depend on close.
        assert_eq!(out[3].daily_range, Some(2.0));
    }

    #[test]
    fn zero_first_close_pins_cumulative_return() {
        let out = compute_indicators(rows(&[(0.0, 1.0), (5.0, 1.0), (6.0, 1.0)]));
        assert!(out.iter().all(|r| r.cumulative_return == Some(0.0)));
        assert_eq!(out[1].daily_return_1d, None);
    }

    #[test]
    fn serialises_with_lowercase_keys_and_nulls() {
        let out = compute_indicators(rising(2));
        let json = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(json["time"], "2024-01-01T00:00:00Z");
        assert_eq!(json["symbol"], "TEST");
        assert_eq!(json["close"], 100.0);
        assert!(json["ma20"].is_null());
        assert_eq!(json["daily_range"], 2.0);
        for (key, _) in out[0].derived() {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn derived_lists_fields_in_output_order() {
        let out = compute_indicators(rising(25));
        let derived = out[24].derived();
        assert_eq!(derived[0].0, "ma20");
        assert_eq!(derived[DERIVED_FIELD_COUNT - 1].0, "dist_from_ma50");
        assert!(derived.contains(&("cumulative_return", Some(0.24))));
        assert!(derived.contains(&("ma50", None)));
    }

    // ---- properties ----------------------------------------------------------

    fn arb_bars() -> impl Strategy<Value = Vec<(f64, f64, f64, f64)>> {
        prop::collection::vec((1.0f64..1_000.0, 0.0f64..0.05, 0.0f64..0.05, 0.0f64..1.0e6), 0..90)
            .prop_map(|raw| {
                raw.into_iter()
                    .map(|(close, up, down, volume)| (close, close * (1.0 + up), close * (1.0 - down), volume))
                    .collect()
            })
    }

    fn to_rows(bars: &[(f64, f64, f64, f64)]) -> Vec<OhlcvRow> {
        bars.iter()
            .enumerate()
            .map(|(i, &(close, high, low, volume))| OhlcvRow {
                time: day(i),
                symbol: "PROP".into(),
                open: RawValue::Number(close),
                high: RawValue::Number(high),
                low: RawValue::Number(low),
                close: RawValue::Number(close),
                volume: RawValue::Number(volume.round()),
            })
            .collect()
    }

    proptest! {
        #[test]
        fn output_is_deterministic(bars in arb_bars()) {
            let a = serde_json::to_string(&compute_indicators(to_rows(&bars))).unwrap();
            let b = serde_json::to_string(&compute_indicators(to_rows(&bars))).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn future_rows_do_not_change_the_past(bars in arb_bars(), cut in 0usize..90, factor in 0.5f64..2.0) {
            prop_assume!(!bars.is_empty());
            let cut = cut % bars.len();
            let mut altered = bars.clone();
            for bar in &mut altered[cut + 1..] {
                *bar = (bar.0 * factor, bar.1 * factor, bar.2 * factor, bar.3 * factor);
            }
            let original = compute_indicators(to_rows(&bars));
            let changed = compute_indicators(to_rows(&altered));
            prop_assert_eq!(&original[..=cut], &changed[..=cut]);
        }

        #[test]
        fn no_non_finite_values_leak(bars in arb_bars()) {
            for row in compute_indicators(to_rows(&bars)) {
                for (key, value) in row.derived() {
                    if let Some(v) = value {
                        prop_assert!(v.is_finite(), "{} = {}", key, v);
                    }
                }
            }
        }

        #[test]
        fn sanitizing_twice_changes_nothing(bars in arb_bars()) {
            for row in compute_indicators(to_rows(&bars)) {
                prop_assert_eq!(row.clone().sanitized(), row);
            }
        }

        #[test]
        fn rolling_windows_gate_on_length(bars in arb_bars()) {
            let out = compute_indicators(to_rows(&bars));
            prop_assert_eq!(out.len(), bars.len());
            for (i, row) in out.iter().enumerate() {
                prop_assert_eq!(row.ma20.is_some(), i >= 19);
                prop_assert_eq!(row.volatility.is_some(), i >= 19);
                prop_assert_eq!(row.volume_ma20.is_some(), i >= 19);
                prop_assert_eq!(row.bb_width.is_some(), i >= 19);
                prop_assert_eq!(row.ma50.is_some(), i >= 49);
                prop_assert_eq!(row.atr.is_some(), i >= 13);
                prop_assert_eq!(row.rsi.is_some(), i >= 14);
                prop_assert_eq!(row.daily_return_5d.is_some(), i >= 5);
                prop_assert_eq!(row.obv_slope_5d.is_some(), i >= 5);
                prop_assert_eq!(row.lagged_return_t5.is_some(), i >= 6);
            }
        }
    }
}
