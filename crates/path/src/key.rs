//! Path keys and the character predicates shared by the parser and formatter.

use std::fmt;

/// One step of a path: a property name or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    Name(String),
    Index(usize),
}

impl PathKey {
    /// Builds a key from a property name, normalizing canonical index
    /// strings (`"0"`, `"42"`) to [`PathKey::Index`].
    ///
    /// # Example
    ///
    /// ```
    /// use json_observe_path::PathKey;
    ///
    /// assert_eq!(PathKey::name("7"), PathKey::Index(7));
    /// assert_eq!(PathKey::name("07"), PathKey::Name("07".into()));
    /// assert_eq!(PathKey::name("foo"), PathKey::Name("foo".into()));
    /// ```
    pub fn name(name: impl Into<String>) -> Self {
        let name = name.into();
        match parse_index(&name) {
            Some(index) => Self::Index(index),
            None => Self::Name(name),
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Name(_) => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(n) => Some(n),
            Self::Index(_) => None,
        }
    }
}

impl From<&str> for PathKey {
    fn from(name: &str) -> Self {
        Self::name(name)
    }
}

impl From<String> for PathKey {
    fn from(name: String) -> Self {
        Self::name(name)
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(n) => f.write_str(n),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Parses a canonical 32-bit array index: ASCII digits, no leading zero
/// unless the string is exactly `"0"`.
///
/// # Example
///
/// ```
/// use json_observe_path::parse_index;
///
/// assert_eq!(parse_index("0"), Some(0));
/// assert_eq!(parse_index("123"), Some(123));
/// assert_eq!(parse_index("-1"), None);
/// assert_eq!(parse_index("01"), None);
/// assert_eq!(parse_index("4294967296"), None);
/// ```
pub fn parse_index(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    s.parse::<u32>().ok().map(|n| n as usize)
}

pub(crate) const fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

pub(crate) const fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

/// Returns true when `s` can be written as a bare dotted identifier.
pub fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_part),
        _ => false,
    }
}
