use serde::{Deserialize, Deserializer};
use std::time::Duration;

use super::TextOrNumber;

/// Parse a duration such as `"30s"`, `"1m30s"`, `"1.5h"` or `"250ms"`
///
/// A bare number is taken as seconds. Negative durations are rejected.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty duration".to_string());
    }
    if text.starts_with('-') {
        return Err(format!("duration should be positive, but got {}", text));
    }
    if let Ok(secs) = text.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total_ns = 0f64;
    let mut rest = text.strip_prefix('+').unwrap_or(text);

    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("missing unit in duration {}", text))?;
        if num_end == 0 {
            return Err(format!("invalid duration {}", text));
        }
        let value: f64 = rest[..num_end]
            .parse()
            .map_err(|_| format!("invalid duration {}", text))?;
        rest = &rest[num_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            unit => return Err(format!("unknown unit '{}' in duration {}", unit, text)),
        };
        rest = &rest[unit_end..];

        total_ns += value * scale;
    }

    if !total_ns.is_finite() || total_ns > u64::MAX as f64 {
        return Err(format!("duration out of range: {}", text));
    }

    Ok(Duration::from_nanos(total_ns.round() as u64))
}

/// Serde helper for optional durations written as seconds or duration text
pub fn deserialize_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<TextOrNumber>::deserialize(deserializer)?;
    raw.map(|value| parse_duration(&value.into_text()).map_err(serde::de::Error::custom))
        .transpose()
}
