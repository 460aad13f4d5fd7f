//! Serde helpers for peer-supplied fields that are read best-effort.
//!
//! Use with `#[serde(default, deserialize_with = "...")]`. A value of the
//! wrong JSON type decodes as the field's zero value instead of failing the
//! enclosing struct.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `null` reads as the default; any other value must match `T`.
pub fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// A string, or empty for anything else.
pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

/// The string elements of an array. Non-string elements are skipped.
pub fn strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// A boolean, or `false` for anything else.
pub fn boolean<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(Value::deserialize(d)?.as_bool().unwrap_or_default())
}

/// An integer. Fractional numbers truncate toward zero. Non-numbers and
/// values outside the range of `T` read as zero.
pub fn int<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64> + Default,
{
    let Value::Number(n) = Value::deserialize(d)? else {
        return Ok(T::default());
    };
    #[allow(clippy::cast_possible_truncation)]
    let whole = n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.is_finite() && f.abs() < 9.2e18)
            .map(|f| f.trunc() as i64)
    });
    Ok(whole.and_then(|v| T::try_from(v).ok()).unwrap_or_default())
}
