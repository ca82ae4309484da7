use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::types::timestamp;

/// Placeholder for absent or unrenderable values.
pub const MISSING: &str = "—";

/// Renders one result cell.
#[must_use]
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => MISSING.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                group_signed(&i.to_string())
            } else if let Some(u) = n.as_u64() {
                group_digits(&u.to_string())
            } else {
                match n.as_f64() {
                    Some(v) if v.fract() == 0.0 => format_integer(v),
                    Some(v) => format_decimal(v, if v.abs() < 1.0 { 3 } else { 2 }),
                    None => n.to_string(),
                }
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[must_use]
pub fn format_integer(value: f64) -> String {
    format_fixed(value, 0, 0)
}

/// Up to `max_fraction` decimals, trailing zeros dropped, thousands grouped.
#[must_use]
pub fn format_decimal(value: f64, max_fraction: usize) -> String {
    format_fixed(value, 0, max_fraction)
}

/// Megabytes, switching to gigabytes from 1024 MB.
#[must_use]
pub fn format_scan_volume(mb: f64) -> String {
    if !mb.is_finite() {
        return MISSING.to_string();
    }
    if mb >= 1024.0 {
        format!("{} GB", format_decimal(mb / 1024.0, 1))
    } else {
        format!("{} MB", format_decimal(mb, 1))
    }
}

/// US dollars with two to four decimals.
#[must_use]
pub fn format_currency(value: f64) -> String {
    let amount = format_fixed(value.abs(), 2, 4);
    if amount == MISSING {
        return amount;
    }
    if value < 0.0 && amount.bytes().any(|b| (b'1'..=b'9').contains(&b)) {
        format!("-${amount}")
    } else {
        format!("${amount}")
    }
}

/// Reads a date out of a loose value: epoch seconds or milliseconds, RFC 3339,
/// or a bare `YYYY-MM-DD`.
#[must_use]
pub fn coerce_date(value: &Value) -> Option<DateTime<Utc>> {
    timestamp::from_document_value(value).or_else(|| {
        let text = value.as_str()?.trim();
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|ndt| ndt.and_utc())
    })
}

/// `May 1, 2024`
#[must_use]
pub fn format_date_label(value: &DateTime<Utc>) -> String {
    value.format("%b %-d, %Y").to_string()
}

/// Relative to `now`, e.g. "3 hours ago" or "in 2 days".
#[must_use]
pub fn format_relative_time(value: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(*value);
    let future = diff.num_seconds() < 0;
    let diff = if future { -diff } else { diff };

    if diff.num_seconds() < 60 {
        return "just now".to_string();
    }

    let (count, unit) = if diff.num_minutes() < 60 {
        (diff.num_minutes(), "minute")
    } else if diff.num_hours() < 24 {
        (diff.num_hours(), "hour")
    } else if diff.num_days() < 30 {
        (diff.num_days(), "day")
    } else if diff.num_days() < 365 {
        (diff.num_days() / 30, "month")
    } else {
        (diff.num_days() / 365, "year")
    };

    let plural = if count == 1 { "" } else { "s" };
    if future {
        format!("in {count} {unit}{plural}")
    } else {
        format!("{count} {unit}{plural} ago")
    }
}

fn format_fixed(value: f64, min_fraction: usize, max_fraction: usize) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }

    let rendered = format!("{:.*}", max_fraction, value.abs());
    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));

    let mut fraction = frac_part.trim_end_matches('0').to_string();
    while fraction.len() < min_fraction {
        fraction.push('0');
    }

    let is_zero = rendered.bytes().all(|b| b == b'0' || b == b'.');
    let mut out = String::new();
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&group_digits(int_part));
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(&fraction);
    }
    out
}

fn group_signed(text: &str) -> String {
    match text.strip_prefix('-') {
        Some(digits) => format!("-{}", group_digits(digits)),
        None => group_digits(text),
    }
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
