//! Display formatting for leaderboard values.

use rust_decimal::Decimal;

/// Shown wherever a value is missing.
pub const MISSING: &str = "—";

/// Format a fraction as a percentage, `0.1234` becomes `12.34%`.
#[must_use]
pub fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{:.2}%", v * 100.0))
}

/// Format an amount as US dollars with thousands separators.
#[must_use]
pub fn currency(value: Option<Decimal>) -> String {
    let Some(value) = value else {
        return MISSING.to_string();
    };
    let rounded = value.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("{sign}${}.{cents}", group_thousands(whole))
}

/// Format a number with a fixed number of decimal places.
#[must_use]
pub fn decimal(value: Option<f64>, places: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.places$}"))
}

/// Format a count with thousands separators.
#[must_use]
pub fn integer(value: Option<i64>) -> String {
    let Some(value) = value else {
        return MISSING.to_string();
    };
    let digits = group_thousands(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{digits}")
    } else {
        digits
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
