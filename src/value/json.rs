//! Canonical JSON text of a value, used for forced-string storage and the
//! forced-string size estimate.

use chrono::SecondsFormat;
use serde_json::{Map, Number, Value as Json};

use super::{PropertyKey, Value};
use crate::error::{CacheError, Result};

/// Largest integer an f64 represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Converts a value to JSON.
///
/// Returns `Ok(None)` for values with no JSON form (`Undefined`, functions).
/// Errors with `ESERIALIZE` on cyclic graphs.
pub fn to_json(value: &Value) -> Result<Option<Json>> {
    convert(value, &mut Vec::new())
}

/// Serializes a value to its canonical JSON text.
pub fn to_json_string(value: &Value) -> Result<Option<String>> {
    match to_json(value)? {
        Some(json) => serde_json::to_string(&json)
            .map(Some)
            .map_err(|e| CacheError::Serialize(e.to_string())),
        None => Ok(None),
    }
}

fn convert(value: &Value, stack: &mut Vec<usize>) -> Result<Option<Json>> {
    let json = match value {
        Value::Undefined | Value::Function(_) => return Ok(None),
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => number(*n),
        Value::String(s) => Json::String(s.clone()),
        Value::Date(d) => Json::String(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
        Value::Deferred(_) => Json::Object(Map::new()),
        _ => {
            let id = value.identity().unwrap_or_default();
            if stack.contains(&id) {
                return Err(CacheError::Serialize(
                    "Converting circular structure to JSON".to_string(),
                ));
            }
            stack.push(id);
            let json = container(value, stack);
            stack.pop();
            json?
        }
    };
    Ok(Some(json))
}

fn container(value: &Value, stack: &mut Vec<usize>) -> Result<Json> {
    let json = match value {
        Value::Array(items) => {
            let items = items.read().clone();
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                out.push(convert(item, stack)?.unwrap_or(Json::Null));
            }
            Json::Array(out)
        }
        Value::Bytes(bytes) => {
            let data = bytes.read().iter().map(|b| Json::from(*b)).collect();
            let mut map = Map::new();
            map.insert("type".to_string(), Json::from("Buffer"));
            map.insert("data".to_string(), Json::Array(data));
            Json::Object(map)
        }
        Value::Object(object) | Value::Error(object) => {
            let properties = object.read().properties().to_vec();
            let mut map = Map::new();
            for (key, property) in properties.iter().filter(|(_, p)| p.enumerable) {
                let PropertyKey::Name(name) = key else {
                    continue;
                };
                if let Some(json) = convert(&property.read(), stack)? {
                    map.insert(name.clone(), json);
                }
            }
            Json::Object(map)
        }
        // maps, sets and patterns carry no enumerable own properties
        _ => Json::Object(Map::new()),
    };
    Ok(json)
}

fn number(n: f64) -> Json {
    if !n.is_finite() {
        return Json::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Json::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Object, Property};

    fn text(value: &Value) -> Option<String> {
        to_json_string(value).unwrap()
    }

    #[test]
    fn test_primitives() {
        assert_eq!(text(&Value::Null).as_deref(), Some("null"));
        assert_eq!(text(&Value::from(1)).as_deref(), Some("1"));
        assert_eq!(text(&Value::from(1.5)).as_deref(), Some("1.5"));
        assert_eq!(text(&Value::Number(f64::NAN)).as_deref(), Some("null"));
        assert_eq!(text(&Value::from("a\"b")).as_deref(), Some(r#""a\"b""#));
        assert_eq!(text(&Value::Undefined), None);
        assert_eq!(text(&Value::new_function(|_| Value::Null)), None);
    }

    #[test]
    fn test_object_keeps_order_and_skips_unserializable() {
        let mut object = Object::new();
        object.insert("z", Value::from(1));
        object.insert("a", Value::Undefined);
        object.insert("m", Value::new_array(vec![Value::Undefined, Value::from(true)]));
        object.define("hidden", Property::hidden(Value::from(1)));
        let value = Value::from_object(object);

        assert_eq!(text(&value).as_deref(), Some(r#"{"z":1,"m":[null,true]}"#));
    }

    #[test]
    fn test_special_shapes() {
        let date = Value::date_from_millis(0).unwrap();
        assert_eq!(text(&date).as_deref(), Some(r#""1970-01-01T00:00:00.000Z""#));
        assert_eq!(
            text(&Value::new_bytes(vec![1, 2])).as_deref(),
            Some(r#"{"type":"Buffer","data":[1,2]}"#)
        );
        assert_eq!(text(&Value::new_map([])).as_deref(), Some("{}"));
        assert_eq!(text(&Value::new_regexp("a", "g").unwrap()).as_deref(), Some("{}"));
    }

    #[test]
    fn test_cycle_is_an_error() {
        let value = Value::new_object([("a", Value::from(1))]);
        value.set_property("me", value.clone());
        let err = to_json_string(&value).unwrap_err();
        assert_eq!(err.code(), "ESERIALIZE");
    }

    #[test]
    fn test_shared_but_acyclic_is_fine() {
        let shared = Value::new_array(vec![Value::from(1)]);
        let value = Value::new_array(vec![shared.clone(), shared]);
        assert_eq!(text(&value).as_deref(), Some("[[1],[1]]"));
    }
}
