// =============================================================================
// Output Sanitizer
// =============================================================================
//
// Every derived value leaving the engine passes through here: non-finite
// values become missing, finite values are rounded to `DECIMALS` places.
// The same function serves every caller so identical input always
// serialises to identical bytes.

/// Decimal places kept on every derived field.
pub const DECIMALS: i32 = 4;

/// Scaled magnitudes at or above this are returned unrounded.  Between 2^51
/// and 2^53 an `f64` can still hold a half, so numpy's `rint` would round
/// there while this does not.  At four decimals the cut-off is about 2.25e11,
/// where a fourth decimal is far below any meaningful precision.
const MAX_EXACT_SCALED: f64 = 2_251_799_813_685_248.0; // 2^51

/// Round `value` to `decimals` places, ties to even.  `-0.0` comes back as `0.0`.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if !scaled.is_finite() || scaled.abs() >= MAX_EXACT_SCALED {
        return value;
    }
    scaled.round_ties_even() / factor + 0.0
}

/// Round a derived value and map `±inf` / NaN to missing.
pub fn sanitize(value: Option<f64>) -> Option<f64> {
    let value = value?;
    if !value.is_finite() {
        return None;
    }
    let rounded = round_to(value, DECIMALS);
    rounded.is_finite().then_some(rounded)
}
