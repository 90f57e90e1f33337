//! Core types for spark-fiber.
//!
//! Property values and property maps that flow from declarative elements
//! through fibers into host nodes.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::element::Node;

// =============================================================================
// Callback
// =============================================================================

/// Event handler stored in a property (`onclick`, `onchange`, ...).
///
/// Compared by identity, two callbacks are equal only if they are the same
/// allocation.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&str)>);

impl Callback {
    /// Wrap a handler. The handler receives the event name.
    pub fn new(f: impl Fn(&str) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the handler.
    pub fn call(&self, event: &str) {
        (self.0)(event)
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

// =============================================================================
// Prop Value
// =============================================================================

/// A single property value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PropValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Nested properties, assigned as `prop.key` on the host node.
    Map(BTreeMap<String, PropValue>),
    Handler(Callback),
}

impl PropValue {
    /// String form used for attributes and text.
    pub fn to_text(&self) -> String {
        match self {
            PropValue::Null => String::new(),
            PropValue::Bool(b) => b.to_string(),
            PropValue::Int(i) => i.to_string(),
            PropValue::Float(f) => f.to_string(),
            PropValue::Str(s) => s.clone(),
            PropValue::Map(_) => "[object]".to_string(),
            PropValue::Handler(_) => "[handler]".to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&Callback> {
        match self {
            PropValue::Handler(cb) => Some(cb),
            _ => None,
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value as i64)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<Callback> for PropValue {
    fn from(value: Callback) -> Self {
        PropValue::Handler(value)
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for PropValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        PropValue::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// =============================================================================
// Props
// =============================================================================

/// Property map of an element, including its children.
///
/// `children` is kept apart from the named values so it is never assigned
/// to a host node. The child list is shared: cloning props copies the
/// named values and one pointer, never the subtree below.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Props {
    values: BTreeMap<String, PropValue>,
    pub children: Rc<[Node]>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set a value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a value. A `children` key is ignored.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        let key = key.into();
        if key == "children" {
            return;
        }
        self.values.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropValue::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PropValue::as_i64)
    }

    pub fn get_handler(&self, key: &str) -> Option<&Callback> {
        self.get(key).and_then(PropValue::as_handler)
    }

    /// Named values in key order (children excluded).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Same values, no children.
    pub fn without_children(&self) -> Props {
        Props {
            values: self.values.clone(),
            children: Rc::default(),
        }
    }

    /// `self` overlaid with `overrides`; keys present in both take the
    /// override. Children are dropped.
    pub fn overlay(&self, overrides: &Props) -> Props {
        let mut values = self.values.clone();
        for (k, v) in &overrides.values {
            values.insert(k.clone(), v.clone());
        }
        Props {
            values,
            children: Rc::default(),
        }
    }
}
