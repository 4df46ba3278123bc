//! Conversion to and from [`serde_json::Value`].

use serde_json::Value as Json;

use crate::{ArrayRef, ObjectRef, Value};

/// Largest integer magnitude that an `f64` represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

impl From<Json> for Value {
    /// Deep conversion. Every array and object becomes a fresh container.
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Self::from(s),
            Json::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Json::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect::<ObjectRef>(),
            ),
        }
    }
}

impl From<&Json> for Value {
    fn from(json: &Json) -> Self {
        Self::from(json.clone())
    }
}

impl Value {
    /// Deep copy into a [`serde_json::Value`].
    ///
    /// `Undefined` and non-finite numbers become `null`; integral numbers
    /// within the exact `f64` range become JSON integers. Cyclic graphs are
    /// not supported.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Undefined | Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => Json::String(s.to_string()),
            Self::Array(items) => array_to_json(items),
            Self::Object(entries) => Json::Object(
                entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn array_to_json(items: &ArrayRef) -> Json {
    Json::Array(items.borrow().iter().map(Value::to_json).collect())
}

#[allow(clippy::cast_possible_truncation)]
fn number_to_json(n: f64) -> Json {
    if !n.is_finite() {
        return Json::Null;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Json::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number)
}
