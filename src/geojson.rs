//! Conversion between script values and JSON documents, and the check the
//! session applies before accepting a script result as a layer.

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Number, Value as Json};

use crate::{
    diagnostics::{Diagnostic, Result, ScriptError},
    value::{Value, ValueKind},
};

/// Deeper values are rejected; this also stops self-referencing maps.
const MAX_JSON_DEPTH: usize = 128;

const GEOJSON_TYPES: [&str; 9] = [
    "FeatureCollection",
    "Feature",
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
    "GeometryCollection",
];

pub fn to_json(value: &Value) -> Result<Json> {
    convert(value, 0)
}

fn convert(value: &Value, depth: usize) -> Result<Json> {
    if depth > MAX_JSON_DEPTH {
        return Err(unrepresentable(format!(
            "value nests deeper than {MAX_JSON_DEPTH} levels"
        )));
    }
    Ok(match &*value.0 {
        ValueKind::Unit => Json::Null,
        ValueKind::Bool(b) => Json::Bool(*b),
        ValueKind::Int(n) => Json::Number((*n).into()),
        ValueKind::Float(n) => Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
        ValueKind::String(s) => Json::String(s.clone()),
        ValueKind::Array(values) => {
            let items = values.borrow().clone();
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                out.push(convert(item, depth + 1)?);
            }
            Json::Array(out)
        }
        ValueKind::Map(map) => {
            let entries: Vec<(String, Value)> = map
                .borrow()
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            let mut out = JsonMap::new();
            for (key, item) in entries {
                out.insert(key, convert(&item, depth + 1)?);
            }
            Json::Object(out)
        }
        ValueKind::Module(_) | ValueKind::Function(_) | ValueKind::NativeFunction(_) => {
            return Err(unrepresentable(format!(
                "{} values cannot be converted to JSON",
                value.type_name()
            )));
        }
    })
}

fn unrepresentable(message: String) -> ScriptError {
    ScriptError::from(Diagnostic::runtime(message))
}

pub fn from_json(json: &Json) -> Value {
    match json {
        Json::Null => Value::unit(),
        Json::Bool(b) => Value::bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(int) => Value::int(int),
            None => Value::float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Value::string(s.clone()),
        Json::Array(items) => Value::array(items.iter().map(from_json).collect()),
        Json::Object(entries) => {
            let map: IndexMap<String, Value> = entries
                .iter()
                .map(|(key, value)| (key.clone(), from_json(value)))
                .collect();
            Value::map(map)
        }
    }
}

/// Whether a map names a GeoJSON type, or an array holds only such maps.
pub fn is_displayable(value: &Value) -> bool {
    displayable_at(value, 0)
}

fn displayable_at(value: &Value, depth: usize) -> bool {
    if depth > MAX_JSON_DEPTH {
        return false;
    }
    match &*value.0 {
        ValueKind::Map(_) => value
            .get_field("type")
            .and_then(|kind| kind.as_str().map(|name| GEOJSON_TYPES.contains(&name)))
            .unwrap_or(false),
        ValueKind::Array(_) => value
            .array_snapshot()
            .map(|items| {
                !items.is_empty() && items.iter().all(|item| displayable_at(item, depth + 1))
            })
            .unwrap_or(false),
        _ => false,
    }
}
