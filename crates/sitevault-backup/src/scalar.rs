//! JSON-safe cell values
//!
//! Snapshot rows only carry the scalars JSON can express. Richer driver values
//! (dates, decimals, JSON documents, binary) are flattened to text on the way out
//! and bound back as text on the way in, leaving the database to coerce them
//! into the column's declared type.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use sitevault_core::Value;

/// A single cell in a snapshot row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Flatten a driver value into its JSON-safe form
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Int8(v) => Scalar::Integer(*v as i64),
            Value::Int16(v) => Scalar::Integer(*v as i64),
            Value::Int32(v) => Scalar::Integer(*v as i64),
            Value::Int64(v) => Scalar::Integer(*v),
            Value::Float32(v) => Self::from_float(*v as f64),
            Value::Float64(v) => Self::from_float(*v),
            Value::Decimal(d) => Scalar::String(d.clone()),
            Value::String(s) => Scalar::String(s.clone()),
            Value::Bytes(b) => Scalar::String(BASE64.encode(b)),
            Value::Date(d) => Scalar::String(d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => Scalar::String(t.format("%H:%M:%S%.f").to_string()),
            Value::DateTime(dt) => Scalar::String(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            Value::DateTimeUtc(dt) => Scalar::String(dt.to_rfc3339()),
            Value::Json(j) => Scalar::String(j.to_string()),
        }
    }

    /// JSON has no NaN or infinities; those travel as their text labels.
    fn from_float(value: f64) -> Self {
        if value.is_finite() {
            Scalar::Float(value)
        } else if value.is_nan() {
            Scalar::String("NaN".to_string())
        } else if value.is_sign_positive() {
            Scalar::String("Infinity".to_string())
        } else {
            Scalar::String("-Infinity".to_string())
        }
    }

    /// The value bound as a statement parameter on import
    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Integer(i) => Value::Int64(*i),
            Scalar::Float(f) => Value::Float64(*f),
            Scalar::String(s) => Value::String(s.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Integer(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Integer(i as i64)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Self::from_float(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rich_values_become_text() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(Scalar::from_value(&Value::Date(date)), Scalar::from("2024-03-09"));

        let at = date.and_hms_opt(14, 30, 0).unwrap();
        assert_eq!(
            Scalar::from_value(&Value::DateTime(at)),
            Scalar::from("2024-03-09 14:30:00")
        );

        let utc = Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap();
        assert_eq!(
            Scalar::from_value(&Value::DateTimeUtc(utc)),
            Scalar::from("2024-03-09T14:30:00+00:00")
        );

        assert_eq!(
            Scalar::from_value(&Value::Decimal("19.90".into())),
            Scalar::from("19.90")
        );
        assert_eq!(
            Scalar::from_value(&Value::Json(serde_json::json!({"k": [1, 2]}))),
            Scalar::from(r#"{"k":[1,2]}"#)
        );
        assert_eq!(
            Scalar::from_value(&Value::Bytes(vec![0, 159, 146, 150])),
            Scalar::from("AJ+Slg==")
        );
    }

    #[test]
    fn test_non_finite_floats_survive_json() {
        assert_eq!(Scalar::from(f64::NAN), Scalar::from("NaN"));
        assert_eq!(Scalar::from(f64::NEG_INFINITY), Scalar::from("-Infinity"));

        let json = serde_json::to_string(&Scalar::from_value(&Value::Float64(f64::INFINITY)))
            .unwrap();
        assert_eq!(json, r#""Infinity""#);
    }

    #[test]
    fn test_json_numbers_pick_integer_or_float() {
        let cells: Vec<Scalar> = serde_json::from_str(r#"[1, 1.5, -7, true, null, "x"]"#).unwrap();
        assert_eq!(
            cells,
            vec![
                Scalar::Integer(1),
                Scalar::Float(1.5),
                Scalar::Integer(-7),
                Scalar::Bool(true),
                Scalar::Null,
                Scalar::from("x"),
            ]
        );
        assert_eq!(cells[0].to_value(), Value::Int64(1));
        assert_eq!(cells[1].to_value(), Value::Float64(1.5));
    }

    #[test]
    fn test_nested_json_is_not_a_scalar() {
        assert!(serde_json::from_str::<Scalar>(r#"{"a": 1}"#).is_err());
        assert!(serde_json::from_str::<Scalar>("[1]").is_err());
    }
}
