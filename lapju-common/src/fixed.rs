//! Fixed-point hundredths for percentages, weights, volumes and prices
//!
//! All fractional quantities LAPJU persists are stored as `i64` hundredths
//! (two decimal places): `12.34` is stored as `1234`. Floating point is only
//! used transiently inside a computation, and every result is rounded back
//! to hundredths with round-half-away-from-zero before it is stored or
//! compared. Repeated normalization passes therefore cannot drift.
//!
//! Conversion flow:
//!
//! ```text
//! User input (f64, e.g. CLI)
//!     ↓
//! from_f64() → database storage (i64 hundredths)
//!     ↓
//! arithmetic in hundredths (exact) or f64 (rounded on the way out)
//!     ↓
//! format() → display ("12.34")
//! ```

/// One whole unit (1.00) in hundredths
pub const ONE: i64 = 100;

/// Full scale for percentages and weight sums: 100.00
pub const FULL_SCALE: i64 = 10_000;

/// Tolerance for the leaf-weight-sum invariant: 0.01
pub const WEIGHT_SUM_TOLERANCE: i64 = 1;

/// Round a float to the nearest integer, halves away from zero
pub fn round_half_away(value: f64) -> i64 {
    if value >= 0.0 {
        (value + 0.5).floor() as i64
    } else {
        (value - 0.5).ceil() as i64
    }
}

/// Convert a display value (e.g. `12.34`) into hundredths
pub fn from_f64(value: f64) -> i64 {
    round_half_away(value * ONE as f64)
}

/// Convert hundredths back into a display value
pub fn to_f64(hundredths: i64) -> f64 {
    hundredths as f64 / ONE as f64
}

/// Product of two hundredths quantities, in hundredths
///
/// Used for `total_price = price × volume`. Exact integer arithmetic:
/// the raw product carries four decimal places, which are folded back to
/// two with half-away-from-zero rounding.
pub fn mul(a: i64, b: i64) -> i64 {
    let product = a * b;
    let quotient = product / ONE;
    let remainder = product % ONE;
    if remainder.abs() * 2 >= ONE {
        quotient + product.signum()
    } else {
        quotient
    }
}

/// Format hundredths as a two-decimal string, e.g. `"12.34"`
pub fn format(hundredths: i64) -> String {
    let sign = if hundredths < 0 { "-" } else { "" };
    let abs = hundredths.abs();
    format!("{}{}.{:02}", sign, abs / ONE, abs % ONE)
}
