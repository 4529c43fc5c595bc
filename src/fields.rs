//! Typed access into loosely structured dump documents.
//!
//! Dump exporters are not consistent about number encoding, so every scalar
//! accessor accepts both JSON numbers and numeric strings.

use serde_json::Value;

use crate::error::{Error, Result};

/// Walk a chain of object keys / array indices, e.g. `["m_Rect", "x"]`
pub fn get<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Value> {
    path.iter()
        .try_fold(value, |v, key| index(v, key))
        .ok_or_else(|| Error::field(path.join(".")))
}

pub fn get_mut<'a>(value: &'a mut Value, path: &[&str]) -> Result<&'a mut Value> {
    let mut cur = value;
    for key in path {
        cur = match cur {
            Value::Object(map) => map.get_mut(*key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        }
        .ok_or_else(|| Error::field(path.join(".")))?;
    }
    Ok(cur)
}

fn index<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

pub fn get_array<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Vec<Value>> {
    get(value, path)?
        .as_array()
        .ok_or_else(|| Error::field(path.join(".")))
}

pub fn get_i64(value: &Value, path: &[&str]) -> Result<i64> {
    let v = get(value, path)?;
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::field(path.join(".")))
}

pub fn get_u32(value: &Value, path: &[&str]) -> Result<u32> {
    let v = get(value, path)?;
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::field(path.join(".")))
}

pub fn get_f64(value: &Value, path: &[&str]) -> Result<f64> {
    let v = get(value, path)?;
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::field(path.join(".")))
}

/// Overwrite an existing field. The parent must exist, the leaf may not.
pub fn set(value: &mut Value, path: &[&str], new_value: Value) -> Result<()> {
    let (leaf, parent) = path
        .split_last()
        .ok_or_else(|| Error::field("<empty path>"))?;

    match get_mut(value, parent)? {
        Value::Object(map) => {
            map.insert(leaf.to_string(), new_value);
            Ok(())
        }
        _ => Err(Error::field(path.join("."))),
    }
}

/// JSON number for a float, falling back to null for NaN / infinities
pub fn float(x: f64) -> Value {
    serde_json::Number::from_f64(x)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_get_nested() {
        let doc = json!({"m_RenderDataMap": {"Array": [{"first": {"second": 7}}]}});

        let v = get_i64(&doc, &["m_RenderDataMap", "Array", "0", "first", "second"]).unwrap();

        assert_eq!(v, 7);
    }

    #[test]
    fn test_numeric_strings() {
        let doc = json!({"a": "42", "b": " 1.5", "c": "-3"});

        assert_eq!(get_u32(&doc, &["a"]).unwrap(), 42);
        assert_eq!(get_f64(&doc, &["b"]).unwrap(), 1.5);
        assert_eq!(get_i64(&doc, &["c"]).unwrap(), -3);
    }

    #[test]
    fn test_missing_field() {
        let doc = json!({"m_Rect": {"x": 1}});

        let err = get_f64(&doc, &["m_Rect", "y"]).unwrap_err();

        assert!(matches!(err, Error::Field { field } if field == "m_Rect.y"));
    }

    #[test]
    fn test_u32_out_of_range() {
        let doc = json!({"a": 4294967296u64});

        assert!(get_u32(&doc, &["a"]).is_err());
    }

    #[test]
    fn test_set() {
        let mut doc = json!({"m_Pivot": {"x": 0.0, "y": 0.0}});

        set(&mut doc, &["m_Pivot", "x"], float(0.5)).unwrap();

        assert_eq!(doc, json!({"m_Pivot": {"x": 0.5, "y": 0.0}}));
        assert!(set(&mut doc, &["m_Border", "x"], float(1.0)).is_err());
    }
}
