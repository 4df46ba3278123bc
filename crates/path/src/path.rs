use std::fmt;
use std::rc::Rc;

use json_observe_value::Value;

use crate::access::{read_key, write_key};
use crate::key::is_ident;
use crate::parser::{parse_path, PathParseError};
use crate::PathKey;

/// Closure that resolves a path against a root value.
pub type CompiledGetter = Rc<dyn Fn(&Value) -> Value>;

struct PathInner {
    keys: Vec<PathKey>,
    valid: bool,
    getter: CompiledGetter,
}

/// An immutable, parsed property path.
///
/// Cloning is O(1); clones share the parsed keys and the compiled getter.
/// An invalid path never reads or writes: [`get`](Self::get) returns
/// `Undefined` and [`set`](Self::set) returns false.
#[derive(Clone)]
pub struct ObservablePath(Rc<PathInner>);

impl ObservablePath {
    /// Parses `text`, falling back to an invalid path on malformed input.
    ///
    /// Use a [`PathCache`](crate::PathCache) to share instances between
    /// identical source strings.
    pub fn parse(text: &str) -> Self {
        Self::try_parse(text).unwrap_or_else(|_| Self::invalid())
    }

    pub fn try_parse(text: &str) -> Result<Self, PathParseError> {
        parse_path(text).map(Self::from_keys)
    }

    pub fn from_keys(keys: Vec<PathKey>) -> Self {
        let getter = compile(&keys);
        Self(Rc::new(PathInner {
            keys,
            valid: true,
            getter,
        }))
    }

    /// Creates a fresh invalid path.
    pub fn invalid() -> Self {
        Self(Rc::new(PathInner {
            keys: Vec::new(),
            valid: false,
            getter: Rc::new(|_: &Value| Value::Undefined),
        }))
    }

    pub fn is_valid(&self) -> bool {
        self.0.valid
    }

    pub fn len(&self) -> usize {
        self.0.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.keys.is_empty()
    }

    pub fn keys(&self) -> &[PathKey] {
        &self.0.keys
    }

    /// Returns true when both handles share the same parsed instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Resolves the path against `root`.
    ///
    /// Returns `Undefined` as soon as an intermediate value is missing or
    /// cannot hold properties.
    pub fn get(&self, root: &Value) -> Value {
        (self.0.getter)(root)
    }

    /// Returns the compiled getter backing [`get`](Self::get).
    pub fn compiled_getter(&self) -> CompiledGetter {
        Rc::clone(&self.0.getter)
    }

    /// Assigns `value` at the end of the path.
    ///
    /// Returns false for invalid and root paths, and when any intermediate
    /// value is not an object or array.
    ///
    /// # Example
    ///
    /// ```
    /// use json_observe_path::ObservablePath;
    /// use json_observe_value::Value;
    /// use serde_json::json;
    ///
    /// let root = Value::from(json!({"a": {"b": 1}}));
    /// assert!(ObservablePath::parse("a.b").set(&root, Value::from(2)));
    /// assert!(!ObservablePath::parse("x.y").set(&root, Value::from(2)));
    /// assert_eq!(root.to_json(), json!({"a": {"b": 2}}));
    /// ```
    pub fn set(&self, root: &Value, value: Value) -> bool {
        let Some((last, init)) = self.split_last() else {
            return false;
        };
        let mut current = root.clone();
        for key in init {
            if !current.is_container() {
                return false;
            }
            current = read_key(&current, key);
        }
        current.is_container() && write_key(&current, last, value)
    }

    /// Like [`set`](Self::set), but replaces missing or nullish intermediate
    /// values with fresh empty objects.
    ///
    /// Still returns false when an intermediate value is a non-nullish
    /// primitive.
    pub fn set_or_spawn(&self, root: &Value, value: Value) -> bool {
        let Some((last, init)) = self.split_last() else {
            return false;
        };
        if !root.is_container() {
            return false;
        }
        let mut current = root.clone();
        for key in init {
            let mut next = read_key(&current, key);
            if next.is_nullish() {
                next = Value::empty_object();
                if !write_key(&current, key, next.clone()) {
                    return false;
                }
            } else if !next.is_container() {
                return false;
            }
            current = next;
        }
        write_key(&current, last, value)
    }

    fn split_last(&self) -> Option<(&PathKey, &[PathKey])> {
        if !self.is_valid() {
            return None;
        }
        self.0.keys.split_last()
    }
}

fn compile(keys: &[PathKey]) -> CompiledGetter {
    match keys {
        [] => Rc::new(|root: &Value| root.clone()),
        [a] => {
            let a = a.clone();
            Rc::new(move |root: &Value| read_key(root, &a))
        }
        [a, b] => {
            let (a, b) = (a.clone(), b.clone());
            Rc::new(move |root: &Value| {
                let v = read_key(root, &a);
                if v.is_nullish() {
                    return Value::Undefined;
                }
                read_key(&v, &b)
            })
        }
        [a, b, c] => {
            let (a, b, c) = (a.clone(), b.clone(), c.clone());
            Rc::new(move |root: &Value| {
                let v = read_key(root, &a);
                if v.is_nullish() {
                    return Value::Undefined;
                }
                let v = read_key(&v, &b);
                if v.is_nullish() {
                    return Value::Undefined;
                }
                read_key(&v, &c)
            })
        }
        _ => {
            let keys = keys.to_vec();
            Rc::new(move |root: &Value| {
                let mut current = root.clone();
                for key in &keys {
                    if current.is_nullish() {
                        return Value::Undefined;
                    }
                    current = read_key(&current, key);
                }
                current
            })
        }
    }
}

impl PartialEq for ObservablePath {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.0.valid == other.0.valid && self.0.keys == other.0.keys)
    }
}

impl Eq for ObservablePath {}

impl fmt::Display for ObservablePath {
    /// Normalized text: identifiers use dot access, indices use `[n]`, other
    /// names are double-quoted in brackets.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.keys.iter().enumerate() {
            match key {
                PathKey::Name(name) if is_ident(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathKey::Name(name) => write!(f, "[\"{}\"]", name.replace('"', "\\\""))?,
                PathKey::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ObservablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "ObservablePath({self})")
        } else {
            f.write_str("ObservablePath(<invalid>)")
        }
    }
}
