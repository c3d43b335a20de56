//! Readers for loosely typed wire values.
//!
//! Older clients and the server itself are not strict about JSON types: widths
//! arrive as `"4"`, budgets as `3.0`, points with a trailing pressure value.
//! These helpers read what they can and yield `None` for the rest, so one odd
//! field never rejects the message that carries it.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A finite number from a JSON number or a numeric string.
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|v| v.is_finite())
}

/// A point from an array whose first two elements are numbers. Extra elements are ignored.
pub fn point(value: &Value) -> Option<[f64; 2]> {
    let items = value.as_array()?;
    Some([number(items.first()?)?, number(items.get(1)?)?])
}

pub(crate) fn deserialize_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number))
}

pub(crate) fn deserialize_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Point list; entries that do not read as a point are skipped.
pub(crate) fn deserialize_points<'de, D>(deserializer: D) -> Result<Option<Vec<[f64; 2]>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(point).collect()))
}

/// Array of raw values; anything else reads as empty.
pub(crate) fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Ok(items),
        _ => Ok(Vec::new()),
    }
}
