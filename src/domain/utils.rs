//! Pure operations behind the arithmetic, text and date tools

use chrono::{DateTime, Datelike, Duration, SecondsFormat, Timelike, Utc};
use rust_mcp_sdk::macros;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, macros::JsonSchema)]
pub enum ArithmeticOperation {
    #[serde(rename = "add")]
    Add,
    #[serde(rename = "subtract")]
    Subtract,
    #[serde(rename = "multiply")]
    Multiply,
    #[serde(rename = "divide")]
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, macros::JsonSchema)]
pub enum TextOperation {
    #[serde(rename = "uppercase")]
    Uppercase,
    #[serde(rename = "lowercase")]
    Lowercase,
    #[serde(rename = "reverse")]
    Reverse,
    #[serde(rename = "count")]
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, macros::JsonSchema)]
pub enum DateOperation {
    #[serde(rename = "current")]
    Current,
    #[serde(rename = "format")]
    Format,
    #[serde(rename = "add")]
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, macros::JsonSchema)]
pub enum TimeUnit {
    #[serde(rename = "days")]
    Days,
    #[serde(rename = "hours")]
    Hours,
    #[serde(rename = "minutes")]
    Minutes,
}

impl TimeUnit {
    pub fn millis(self) -> i64 {
        match self {
            Self::Days => 86_400_000,
            Self::Hours => 3_600_000,
            Self::Minutes => 60_000,
        }
    }
}

/// Returns `None` when dividing by zero.
pub fn calculate(operation: ArithmeticOperation, a: f64, b: f64) -> Option<f64> {
    match operation {
        ArithmeticOperation::Add => Some(a + b),
        ArithmeticOperation::Subtract => Some(a - b),
        ArithmeticOperation::Multiply => Some(a * b),
        ArithmeticOperation::Divide if b == 0.0 => None,
        ArithmeticOperation::Divide => Some(a / b),
    }
}

/// Renders a number the way a JavaScript client prints it.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if value == 0.0 {
        "0".to_string()
    } else {
        let sign = if value.is_sign_negative() { "-" } else { "" };
        format!("{sign}{}", format_magnitude(value.abs()))
    }
}

/// `Number#toString` layout for a finite positive value: plain decimal when
/// the decimal point sits within `-6 < n <= 21`, exponent form otherwise.
fn format_magnitude(value: f64) -> String {
    // `{:e}` yields the shortest round-trip digits, e.g. `1.23456e2`.
    let scientific = format!("{value:e}");
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let digits = mantissa.replace('.', "");
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exponent + 1;

    if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (whole, fraction) = digits.split_at(n as usize);
        format!("{whole}.{fraction}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let exponent_sign = if n - 1 < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{lead}e{exponent_sign}{}", (n - 1).abs())
        } else {
            format!("{lead}.{rest}e{exponent_sign}{}", (n - 1).abs())
        }
    }
}

pub fn transform_text(text: &str, operation: TextOperation) -> String {
    match operation {
        TextOperation::Uppercase => text.to_uppercase(),
        TextOperation::Lowercase => text.to_lowercase(),
        TextOperation::Reverse => text.chars().rev().collect(),
        TextOperation::Count => format!("Character count: {}", text.chars().count()),
    }
}

pub fn format_iso(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Formats with a `YYYY-MM-DD HH:mm:ss.SSS` style pattern. Characters that are
/// not part of a token are copied as-is.
pub fn format_with_pattern(timestamp: DateTime<Utc>, pattern: &str) -> String {
    const TOKENS: [&str; 8] = ["YYYY", "SSS", "YY", "MM", "DD", "HH", "mm", "ss"];

    let mut output = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    while !rest.is_empty() {
        if let Some(token) = TOKENS.iter().find(|token| rest.starts_with(**token)) {
            let rendered = match *token {
                "YYYY" => format!("{:04}", timestamp.year()),
                "YY" => format!("{:02}", timestamp.year().rem_euclid(100)),
                "MM" => format!("{:02}", timestamp.month()),
                "DD" => format!("{:02}", timestamp.day()),
                "HH" => format!("{:02}", timestamp.hour()),
                "mm" => format!("{:02}", timestamp.minute()),
                "ss" => format!("{:02}", timestamp.second()),
                _ => format!("{:03}", timestamp.timestamp_subsec_millis()),
            };
            output.push_str(&rendered);
            rest = &rest[token.len()..];
        } else if let Some(character) = rest.chars().next() {
            output.push(character);
            rest = &rest[character.len_utf8()..];
        }
    }
    output
}

/// Shifts `timestamp` by a possibly fractional number of units. Returns `None`
/// when the result is not representable.
pub fn add_units(timestamp: DateTime<Utc>, units: f64, unit: TimeUnit) -> Option<DateTime<Utc>> {
    let millis = (units * unit.millis() as f64).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }

    let delta = Duration::try_milliseconds(millis as i64)?;
    timestamp.checked_add_signed(delta)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 7, 9, 5, 3)
            .single()
            .expect("valid timestamp")
            + Duration::milliseconds(42)
    }

    #[test]
    fn calculates_all_operations() {
        assert_eq!(calculate(ArithmeticOperation::Add, 2.0, 3.0), Some(5.0));
        assert_eq!(calculate(ArithmeticOperation::Subtract, 2.0, 3.0), Some(-1.0));
        assert_eq!(calculate(ArithmeticOperation::Multiply, 2.5, 4.0), Some(10.0));
        assert_eq!(calculate(ArithmeticOperation::Divide, 5.0, 2.0), Some(2.5));
    }

    #[test]
    fn division_by_zero_has_no_result() {
        assert_eq!(calculate(ArithmeticOperation::Divide, 1.0, 0.0), None);
        assert_eq!(calculate(ArithmeticOperation::Divide, 0.0, -0.0), None);
    }

    #[test]
    fn formats_numbers_like_javascript() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn switches_to_exponent_form_outside_plain_range() {
        assert_eq!(format_number(123.456), "123.456");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-2.5e22), "-2.5e+22");
        assert_eq!(format_number(3e300), "3e+300");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(1.5e-9), "1.5e-9");
    }

    #[test]
    fn transforms_text() {
        assert_eq!(transform_text("abc", TextOperation::Reverse), "cba");
        assert_eq!(transform_text("hello", TextOperation::Count), "Character count: 5");
        assert_eq!(transform_text("MiXeD", TextOperation::Uppercase), "MIXED");
        assert_eq!(transform_text("MiXeD", TextOperation::Lowercase), "mixed");
        assert_eq!(transform_text("héllo", TextOperation::Reverse), "olléh");
        assert_eq!(transform_text("héllo", TextOperation::Count), "Character count: 5");
    }

    #[test]
    fn formats_iso_with_millis() {
        assert_eq!(format_iso(fixed_time()), "2026-02-07T09:05:03.042Z");
    }

    #[test]
    fn formats_with_pattern_tokens() {
        let now = fixed_time();
        assert_eq!(format_with_pattern(now, "YYYY-MM-DD"), "2026-02-07");
        assert_eq!(format_with_pattern(now, "DD/MM/YY HH:mm:ss.SSS"), "07/02/26 09:05:03.042");
        assert_eq!(format_with_pattern(now, "[at] HH"), "[at] 09");
    }

    #[test]
    fn adds_whole_and_fractional_units() {
        let now = fixed_time();
        assert_eq!(
            add_units(now, 2.0, TimeUnit::Days).map(format_iso).as_deref(),
            Some("2026-02-09T09:05:03.042Z")
        );
        assert_eq!(
            add_units(now, 1.5, TimeUnit::Hours).map(format_iso).as_deref(),
            Some("2026-02-07T10:35:03.042Z")
        );
        assert_eq!(
            add_units(now, -5.0, TimeUnit::Minutes).map(format_iso).as_deref(),
            Some("2026-02-07T09:00:03.042Z")
        );
    }

    #[test]
    fn adding_out_of_range_fails() {
        assert!(add_units(fixed_time(), 1e300, TimeUnit::Days).is_none());
        assert!(add_units(fixed_time(), f64::NAN, TimeUnit::Days).is_none());
    }
}
