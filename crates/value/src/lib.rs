//! Shared, mutable JSON-like values with reference identity.
//!
//! This crate provides the object graph that `json-observe` watches. Unlike
//! [`serde_json::Value`], containers here are *shared handles*: cloning an
//! array or object value yields another handle to the same storage, so a
//! mutation made through one handle is visible through every other one. That
//! is what makes dirty checking meaningful: an observer keeps a handle to the
//! live data and re-reads it on every checkpoint.
//!
//! # Example
//!
//! ```
//! use json_observe_value::{same_value, Value};
//! use serde_json::json;
//!
//! let doc = Value::from(json!({"items": [1, 2, 3]}));
//! let items = doc.as_object().unwrap().get("items").unwrap();
//!
//! // Same storage, seen through two handles.
//! let alias = items.clone();
//! alias.as_array().unwrap().push(Value::from(4));
//! assert_eq!(doc.to_json(), json!({"items": [1, 2, 3, 4]}));
//!
//! // Containers compare by identity, not content.
//! assert!(same_value(&items, &alias));
//! assert!(!same_value(&items, &Value::from(json!([1, 2, 3, 4]))));
//! ```

mod array;
mod equal;
mod json;
mod object;
mod value;

pub use array::{ArrayRef, MAX_ARRAY_GROWTH};
pub use equal::{same_number, same_value};
pub use object::ObjectRef;
pub use value::Value;
