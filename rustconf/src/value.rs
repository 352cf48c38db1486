//! Tree value: the universal document representation.
//!
//! Every NETCONF document (requests, replies, notifications, schema
//! skeletons) is represented as a [`Value`]: a primitive, an ordered
//! mapping, or an ordered list. Two mapping keys are reserved by the XML
//! codec: [`ATTRS`] (`"$"`) holds an element's attributes as a sub-mapping,
//! and [`TEXT`] (`"_"`) holds element text when the element also carries
//! attributes or children.

use std::fmt;

use indexmap::IndexMap;

/// Reserved mapping key for XML attributes.
pub const ATTRS: &str = "$";

/// Reserved mapping key for XML element text.
pub const TEXT: &str = "_";

/// A document tree node.
///
/// Mappings and lists are ordered; insertion order is preserved all the
/// way through encode, so the wire XML reflects the order in which the
/// tree was built.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / empty element.
    Null,

    /// Boolean primitive.
    Bool(bool),

    /// Integer primitive.
    Int(i64),

    /// Floating-point primitive.
    Float(f64),

    /// String primitive.
    String(String),

    /// Ordered name → value mapping (an XML element's children).
    Map(IndexMap<String, Value>),

    /// Ordered list of values (repeated same-name XML siblings).
    List(Vec<Value>),
}

impl Value {
    /// Build a mapping from an ordered sequence of entries.
    pub fn map<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build an empty mapping.
    pub fn empty_map() -> Value {
        Value::Map(IndexMap::new())
    }

    /// Build a list from a sequence of values.
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Value {
        Value::List(items.into_iter().collect())
    }

    /// Parse a text fragment the way the decoder does: numeric-looking
    /// values are coerced to numbers, everything else stays a string.
    pub fn from_text(text: &str) -> Value {
        let trimmed = text.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::Int(n);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            return Value::Float(f);
        }
        Value::String(trimmed.to_string())
    }

    /// True for `Null`, `Bool`, `Int`, `Float`, and `String`.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Map(_) | Value::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Borrow the mapping entries, if this is a mapping.
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Mutably borrow the mapping entries, if this is a mapping.
    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow the list items, if this is a list.
    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Child lookup on a mapping. Returns `None` for non-mappings.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Mutable child lookup on a mapping.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.as_map_mut().and_then(|m| m.get_mut(key))
    }

    /// Walk a key path from this node (`get` chained).
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let mut node = self;
        for key in path {
            node = node.get(key)?;
        }
        Some(node)
    }

    /// Walk a key path mutably.
    pub fn get_path_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Value> {
        let mut node = self;
        for key in path {
            node = node.get_mut(key.as_ref())?;
        }
        Some(node)
    }

    /// Insert a child into a mapping, converting `Null`/primitives into a
    /// mapping first if necessary. Returns a mutable reference to the
    /// inserted value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> &mut Value {
        if !self.is_map() {
            *self = Value::empty_map();
        }
        let map = self.as_map_mut().unwrap();
        let key = key.into();
        map.insert(key.clone(), value);
        map.get_mut(&key).unwrap()
    }

    /// Set an attribute under the reserved `$` sub-mapping, creating it if
    /// absent.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if !self.is_map() {
            *self = Value::empty_map();
        }
        let map = self.as_map_mut().unwrap();
        let attrs = map
            .entry(ATTRS.to_string())
            .or_insert_with(Value::empty_map);
        attrs.insert(name, Value::String(value.into()));
    }

    /// The `$` attributes sub-mapping, if present.
    pub fn attrs(&self) -> Option<&IndexMap<String, Value>> {
        self.get(ATTRS).and_then(Value::as_map)
    }

    /// Deep-merge `other` into this node.
    ///
    /// Mapping entries are merged recursively; any other combination
    /// replaces the existing value. Entry order of the existing mapping is
    /// preserved; new keys append.
    pub fn deep_merge(&mut self, other: &Value) {
        match (self, other) {
            (Value::Map(dst), Value::Map(src)) => {
                for (key, value) in src {
                    match dst.get_mut(key) {
                        Some(existing) => existing.deep_merge(value),
                        None => {
                            dst.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            (dst, src) => *dst = src.clone(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for Value {
    /// Primitive rendering as element text. Mappings and lists render via
    /// `Debug` for diagnostics only; the codec never uses `Display` on
    /// non-primitives.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{:?}", other),
        }
    }
}
