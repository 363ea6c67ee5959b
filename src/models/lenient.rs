//! Number fields that models write as strings or floats.

use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::Value;

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_whole(value: &Value) -> Option<i64> {
    as_f64(value)
        .filter(|n| n.is_finite())
        .map(|n| n.round() as i64)
}

/// Required count; anything that does not read as a non-negative number fails the item
pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    as_whole(&value)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| D::Error::custom(format!("expected a non-negative number, got {}", value)))
}

/// Optional count; unreadable values become `None`
pub fn optional_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_whole(&value).and_then(|n| u32::try_from(n).ok()))
}

/// Optional year; date strings such as `1965-08-01` yield their year
pub fn optional_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let year = as_whole(&value).or_else(|| match &value {
        Value::String(s) => s.trim().get(..4).and_then(|y| y.parse().ok()),
        _ => None,
    });
    Ok(year.and_then(|n| i32::try_from(n).ok()))
}

/// Confidence in `[0, 1]` territory; unreadable values fall back to 0.5
pub fn confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_f64(&value).filter(|n| n.is_finite()).unwrap_or(DEFAULT_CONFIDENCE))
}

pub const DEFAULT_CONFIDENCE: f64 = 0.5;
