//! Compact duration strings
//!
//! Accepts `"30s"`, `"15m"`, `"1h30m"`, `"250ms"`, `"1d"` and the long unit
//! names (`"1 day"`, `"10 minutes"`). A trailing bare number means seconds.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Parse a duration string into a [`Duration`]
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::DurationParse("empty duration string".to_string()));
    }

    let mut total = Duration::ZERO;
    let mut chars = s.chars().peekable();

    while chars.peek().is_some() {
        skip_whitespace(&mut chars);

        let mut num_buf = String::new();
        while let Some(&c) = chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            num_buf.push(c);
            chars.next();
        }
        let num: u64 = num_buf
            .parse()
            .map_err(|_| Error::DurationParse(format!("invalid number in duration: {}", s)))?;

        skip_whitespace(&mut chars);

        let mut unit = String::new();
        while let Some(&c) = chars.peek() {
            if !c.is_ascii_alphabetic() {
                break;
            }
            unit.push(c);
            chars.next();
        }

        let step = unit_duration(num, &unit.to_ascii_lowercase())
            .ok_or_else(|| Error::DurationParse(format!("unknown duration unit: {}", unit)))?;

        total = total
            .checked_add(step)
            .ok_or_else(|| Error::DurationParse(format!("duration overflows: {}", s)))?;

        skip_whitespace(&mut chars);
    }

    Ok(total)
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn unit_duration(num: u64, unit: &str) -> Option<Duration> {
    let secs_per_unit = match unit {
        "ms" | "milli" | "millis" | "millisecond" | "milliseconds" => {
            return Some(Duration::from_millis(num))
        }
        "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hour" | "hours" => 3600,
        "d" | "day" | "days" => 86400,
        _ => return None,
    };
    num.checked_mul(secs_per_unit).map(Duration::from_secs)
}

/// Serde adapter for `Option<Duration>` fields written as duration strings
pub(crate) fn deserialize_optional<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}

// =============================================================================
// Tests
// =============================================================================
