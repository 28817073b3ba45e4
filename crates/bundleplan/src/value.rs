//! value representation
//!
//! The record argument model contains the following data types
//! - null (the unresolved placement slot in addUnit records)
//! - boolean (true/false)
//! - integer (signed, currently: i64 - may change)
//! - decimal (currently: f64 - may change)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//!
//! Values enter the system twice: decoded from bundle documents (service
//! `options`, machine `constraints`) and emitted as record args. Both
//! directions go through serde; objects keep their document order so the
//! printed changeset is deterministic.
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

/// All possible value types
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(indexmap::IndexMap<String, Value>),
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>> From<indexmap::IndexMap<String, V>> for Value {
    fn from(value: indexmap::IndexMap<String, V>) -> Self {
        Value::Object(value.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_is_order_preserving() {
        let value: Value = serde_yaml::from_str("{zeta: 1, alpha: 2.5, beta: [true, null]}")
            .expect("value must decode");

        let Value::Object(object) = &value else {
            panic!("expected an object, got {value:?}");
        };
        let keys: Vec<_> = object.keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha", "beta"]);

        assert_eq!(object["zeta"], Value::Integer(1));
        assert_eq!(object["alpha"], Value::Decimal(2.5));
        assert_eq!(
            object["beta"],
            Value::Array(vec![Value::Boolean(true), Value::Null])
        );
    }

    #[test]
    fn serialize_round_trips_through_json() {
        let value: Value = serde_yaml::from_str("{b: one, a: {nested: 2}}").unwrap();
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"b":"one","a":{"nested":2}}"#);
    }
}
