//! Lenient type coercion for submission fields
//!
//! Submissions arrive from hand-written forms and from model replies, so the
//! values are coerced into the column type instead of being rejected. A value
//! that cannot be coerced becomes null.
//!
//! The `text`, `integer`, `real`, `boolean` and `label` adapters are meant for
//! `#[serde(default, deserialize_with = "...")]` on tri-state patch fields: an
//! absent key stays `None`, a present key becomes `Some(coerced)`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

/// Coerce a JSON value into optional text
pub fn text_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            if s.trim().is_empty() {
                None
            } else {
                Some(s)
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let lines: Vec<String> = items.into_iter().filter_map(text_value).collect();
            if lines.is_empty() {
                None
            } else {
                Some(lines.join("\n"))
            }
        }
        object @ Value::Object(_) => Some(object.to_string()),
    }
}

/// Coerce a JSON value into an optional integer
pub fn integer_value(value: Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_to_integer)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(float_to_integer))
        }
        _ => None,
    }
}

fn float_to_integer(f: f64) -> Option<i64> {
    if f.is_finite() && f.abs() < i64::MAX as f64 {
        Some(f.round() as i64)
    } else {
        None
    }
}

/// Coerce a JSON value into an optional real number
///
/// Currency decorations (`$`, thousands separators) are ignored.
pub fn real_value(value: Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
            cleaned
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
        }
        _ => None,
    }
}

/// Coerce a JSON value into an optional boolean
pub fn bool_value(value: Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Coerce a JSON value into one label of a closed set
pub fn label_value<T: FromStr>(value: Value) -> Option<T> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn text<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(text_value(Value::deserialize(deserializer)?)))
}

pub fn integer<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(integer_value(Value::deserialize(deserializer)?)))
}

pub fn real<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(real_value(Value::deserialize(deserializer)?)))
}

pub fn boolean<'de, D>(deserializer: D) -> Result<Option<Option<bool>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(bool_value(Value::deserialize(deserializer)?)))
}

pub fn label<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    Ok(Some(label_value(Value::deserialize(deserializer)?)))
}

/// Label adapter for full records, where absence and null both mean "unset"
pub fn optional_label<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    Ok(label_value(Value::deserialize(deserializer)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_coercion() {
        assert_eq!(text_value(json!("Acme")), Some("Acme".to_string()));
        assert_eq!(text_value(json!("   ")), None);
        assert_eq!(text_value(json!(null)), None);
        assert_eq!(text_value(json!(42)), Some("42".to_string()));
        assert_eq!(
            text_value(json!(["Counter-UAS", "Base defense"])),
            Some("Counter-UAS\nBase defense".to_string())
        );
        assert_eq!(
            text_value(json!({"phase": 2})),
            Some("{\"phase\":2}".to_string())
        );
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(integer_value(json!(6)), Some(6));
        assert_eq!(integer_value(json!(6.0)), Some(6));
        assert_eq!(integer_value(json!(6.6)), Some(7));
        assert_eq!(integer_value(json!(" 7 ")), Some(7));
        assert_eq!(integer_value(json!("TRL 6")), None);
        assert_eq!(integer_value(json!(true)), None);
    }

    #[test]
    fn test_real_coercion() {
        assert_eq!(real_value(json!(7.5)), Some(7.5));
        assert_eq!(real_value(json!("$1,250,000")), Some(1_250_000.0));
        assert_eq!(real_value(json!("$95 million")), None);
        assert_eq!(real_value(json!([1.0])), None);
    }

    #[test]
    fn test_bool_coercion() {
        assert_eq!(bool_value(json!(true)), Some(true));
        assert_eq!(bool_value(json!("Yes")), Some(true));
        assert_eq!(bool_value(json!("no")), Some(false));
        assert_eq!(bool_value(json!(0)), Some(false));
        assert_eq!(bool_value(json!("pending")), None);
        assert_eq!(bool_value(json!(null)), None);
    }
}
