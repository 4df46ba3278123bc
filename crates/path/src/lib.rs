//! Property-access paths over [`json_observe_value::Value`].
//!
//! A path is text such as `a.b[0]['c d']`. [`parse_path`] tokenizes it into
//! [`PathKey`]s; [`ObservablePath`] wraps the keys with null-guarded
//! traversal; [`PathCache`] shares parsed instances between identical source
//! strings.
//!
//! # Example
//!
//! ```
//! use json_observe_path::PathCache;
//! use json_observe_value::Value;
//! use serde_json::json;
//!
//! let cache = PathCache::new();
//! let root = Value::from(json!({"user": {"tags": ["a", "b"]}}));
//!
//! let path = cache.get("user.tags[1]");
//! assert_eq!(path.get(&root), Value::from("b"));
//! assert!(path.set(&root, Value::from("c")));
//! assert_eq!(root.to_json(), json!({"user": {"tags": ["a", "c"]}}));
//!
//! // Malformed paths are inert rather than an error.
//! let bad = cache.get("user..tags");
//! assert!(!bad.is_valid());
//! assert!(bad.get(&root).is_undefined());
//! ```

mod access;
mod cache;
mod key;
mod parser;
mod path;

pub use access::{read_key, write_key};
pub use cache::{IntoObservablePath, PathCache};
pub use key::{is_ident, parse_index, PathKey};
pub use parser::{parse_path, ParserState, PathParseError};
pub use path::{CompiledGetter, ObservablePath};
