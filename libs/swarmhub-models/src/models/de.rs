//! Lenient deserializers for server quirks

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, Deserialize, DeserializeOwned, Deserializer};
use serde_json::Value;

/// Decode an integer that may arrive as a JSON number, a numeric string,
/// an empty string or `null`. Empty and `null` decode to zero.
pub fn int_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| de::Error::custom(format!("integer out of range: {}", n))),
        Value::String(s) if s.trim().is_empty() => Ok(0),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| de::Error::custom(format!("invalid integer {:?}: {}", s, e))),
        other => Err(de::Error::custom(format!("expected integer, got {}", other))),
    }
}

/// Decode a list where the server may send `null` for "no items".
pub fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items: Option<Vec<T>> = Option::deserialize(deserializer)?;
    Ok(items.unwrap_or_default())
}

/// Decode a timestamp sent either as epoch milliseconds or as RFC 3339 text.
pub fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(DateTime::<Utc>::default()),
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", n)))?;
            Utc.timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", millis)))
        }
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| de::Error::custom(format!("invalid timestamp {:?}: {}", s, e))),
        other => Err(de::Error::custom(format!("expected timestamp, got {}", other))),
    }
}
