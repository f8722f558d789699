//! Conversion of JSON-Cadence encoded values into plain JSON.
//!
//! JSON-Cadence wraps every value as `{"type": ..., "value": ...}`. API
//! consumers only care about the payload, so composites become objects of
//! their fields, numbers become JSON numbers where they fit, and so on.

use crate::AccessError;
use serde_json::{Map, Number, Value};

const SIGNED_INTEGERS: &[&str] = &["Int", "Int8", "Int16", "Int32", "Int64", "Int128", "Int256"];
const UNSIGNED_INTEGERS: &[&str] = &[
    "UInt", "UInt8", "UInt16", "UInt32", "UInt64", "UInt128", "UInt256", "Word8", "Word16",
    "Word32", "Word64", "Word128", "Word256",
];

/// Decode a JSON-Cadence payload from raw bytes.
pub fn decode_slice(bytes: &[u8]) -> Result<Value, AccessError> {
    let raw: Value = serde_json::from_slice(bytes)
        .map_err(|err| AccessError::decode(format!("invalid JSON-Cadence payload: {err}")))?;
    decode_value(&raw)
}

/// Decode a single JSON-Cadence value.
pub fn decode_value(raw: &Value) -> Result<Value, AccessError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| AccessError::decode("JSON-Cadence value must be an object"))?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| AccessError::decode("JSON-Cadence value is missing its type"))?;
    let value = obj.get("value").unwrap_or(&Value::Null);

    match kind {
        "Void" => Ok(Value::Null),
        "Optional" => {
            if value.is_null() {
                Ok(Value::Null)
            } else {
                decode_value(value)
            }
        }
        "Bool" => value
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| AccessError::decode("Bool value must be a boolean")),
        "String" | "Character" | "Address" => Ok(Value::String(expect_str(kind, value)?.to_string())),
        k if SIGNED_INTEGERS.contains(&k) => {
            let text = expect_str(kind, value)?;
            Ok(text
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .unwrap_or_else(|_| Value::String(text.to_string())))
        }
        k if UNSIGNED_INTEGERS.contains(&k) => {
            let text = expect_str(kind, value)?;
            Ok(text
                .parse::<u64>()
                .map(|n| Value::Number(n.into()))
                .unwrap_or_else(|_| Value::String(text.to_string())))
        }
        "Fix64" | "UFix64" => {
            let text = expect_str(kind, value)?;
            let parsed = text
                .parse::<f64>()
                .map_err(|err| AccessError::decode(format!("invalid {kind} {text}: {err}")))?;
            Number::from_f64(parsed)
                .map(Value::Number)
                .ok_or_else(|| AccessError::decode(format!("non-finite {kind} {text}")))
        }
        "Array" => value
            .as_array()
            .ok_or_else(|| AccessError::decode("Array value must be a list"))?
            .iter()
            .map(decode_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        "Dictionary" => {
            let entries = value
                .as_array()
                .ok_or_else(|| AccessError::decode("Dictionary value must be a list"))?;
            let mut map = Map::new();
            for entry in entries {
                let key = entry
                    .get("key")
                    .ok_or_else(|| AccessError::decode("Dictionary entry is missing its key"))?;
                let val = entry
                    .get("value")
                    .ok_or_else(|| AccessError::decode("Dictionary entry is missing its value"))?;
                map.insert(key_text(&decode_value(key)?), decode_value(val)?);
            }
            Ok(Value::Object(map))
        }
        "Struct" | "Resource" | "Event" | "Contract" | "Enum" => {
            decode_composite(value).map(Value::Object)
        }
        "Path" => {
            let domain = value.get("domain").and_then(Value::as_str).unwrap_or_default();
            let identifier = value
                .get("identifier")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Ok(Value::String(format!("/{domain}/{identifier}")))
        }
        "Type" => Ok(static_type_id(value.get("staticType").unwrap_or(&Value::Null))),
        "Capability" => {
            let mut map = Map::new();
            for field in ["address", "id", "borrowType"] {
                let entry = match (field, value.get(field)) {
                    ("borrowType", Some(ty)) => static_type_id(ty),
                    (_, Some(v)) => v.clone(),
                    (_, None) => Value::Null,
                };
                map.insert(field.to_string(), entry);
            }
            Ok(Value::Object(map))
        }
        _ => Ok(value.clone()),
    }
}

/// Decode a composite value (`{"id": ..., "fields": [...]}`) into its fields.
pub fn decode_composite(value: &Value) -> Result<Map<String, Value>, AccessError> {
    let fields = value
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| AccessError::decode("composite value is missing its fields"))?;
    let mut map = Map::new();
    for field in fields {
        let name = field
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| AccessError::decode("composite field is missing its name"))?;
        let inner = field
            .get("value")
            .ok_or_else(|| AccessError::decode(format!("field {name} is missing its value")))?;
        map.insert(name.to_string(), decode_value(inner)?);
    }
    Ok(map)
}

fn expect_str<'a>(kind: &str, value: &'a Value) -> Result<&'a str, AccessError> {
    value
        .as_str()
        .ok_or_else(|| AccessError::decode(format!("{kind} value must be a string")))
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn static_type_id(ty: &Value) -> Value {
    match ty {
        Value::String(s) => Value::String(s.clone()),
        Value::Object(obj) => obj
            .get("typeID")
            .cloned()
            .unwrap_or_else(|| ty.clone()),
        other => other.clone(),
    }
}
