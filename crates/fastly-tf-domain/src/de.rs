//! Lenient decoders for API payloads.
//!
//! The API is not consistent about numeric encoding: the same field can come
//! back as `3600`, `"3600"`, `""` or `null` depending on endpoint and age of
//! the record. Everything here decodes to the zero value when the field is
//! blank.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decode an unsigned integer sent either as a JSON number or a decimal string.
pub fn lenient_uint<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64> + Default,
{
    let value = Value::deserialize(d)?;
    let n = match &value {
        Value::Null => return Ok(T::default()),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("expected unsigned integer, got {}", n)))?,
        Value::String(s) if s.trim().is_empty() => return Ok(T::default()),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| D::Error::custom(format!("invalid integer '{}': {}", s, e)))?,
        other => return Err(D::Error::custom(format!("expected integer, got {}", other))),
    };
    T::try_from(n).map_err(|_| D::Error::custom(format!("integer {} out of range", n)))
}

/// Decode a boolean sent as `true`/`false`, `1`/`0` or `"1"`/`"0"`.
pub fn lenient_bool<'de, D>(d: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(d)? {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::Number(n) => n
            .as_u64()
            .map(|v| v != 0)
            .ok_or_else(|| D::Error::custom(format!("invalid boolean {}", n))),
        Value::String(s) => match s.as_str() {
            "" | "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            other => Err(D::Error::custom(format!("invalid boolean '{}'", other))),
        },
        other => Err(D::Error::custom(format!("expected boolean, got {}", other))),
    }
}

/// Decode a string field that may be `null`.
pub fn nullable_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}
