// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free column transforms.  Every function takes one or more
// input columns (`&[Option<f64>]`, oldest first) and returns a column of the
// same length where `None` marks a row the indicator cannot define yet
// (insufficient history, missing input, degenerate denominator).
//
// All computations are causal: row `i` of an output only reads rows `0..=i`
// of its inputs.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod obv;
pub mod roc;
pub mod rolling;
pub mod rsi;

pub use adx::calculate_adx;
pub use atr::{calculate_atr, calculate_daily_range, calculate_true_range};
pub use bollinger::calculate_bb_width;
pub use ema::{calculate_ema, calculate_macd, wilder_smooth, Ewm};
pub use obv::{calculate_obv, calculate_obv_slope};
pub use roc::{calculate_cumulative_return, calculate_roc, shift};
pub use rolling::{calculate_rolling_corr, calculate_rolling_std, calculate_sma};
pub use rsi::calculate_rsi;
