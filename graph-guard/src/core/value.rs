//! Runtime values and the object arena they point into.
//!
//! Objects live in an [`ObjectGraph`] and are referenced by [`ObjectId`], so
//! back-references and self-references are ordinary values. Object identity is
//! the id, which is what the cascade cycle guard keys on.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity of a type, used to look up its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName(Arc<str>);

impl TypeName {
    /// Creates a type name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Identity of an object inside an [`ObjectGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Returns the arena slot of this object.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value found at some location of an object graph.
///
/// Container shapes are explicit: [`Value::List`] is indexable, [`Value::Set`]
/// is iterable without an index, [`Value::Map`] is keyed and
/// [`Value::Optional`] is a single-slot wrapper. An `Optional(None)` is an
/// *empty wrapper*, which is distinct from [`Value::Null`] (no wrapper at all).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Absence of any value
    Null,
    /// Boolean value
    Bool(bool),
    /// Signed integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
    /// Point in time
    Timestamp(DateTime<Utc>),
    /// Indexable sequence
    List(Vec<Value>),
    /// Unordered collection without stable indices
    Set(Vec<Value>),
    /// Keyed mapping, in insertion order
    Map(Vec<(Value, Value)>),
    /// Single-valued optional-like wrapper
    Optional(Option<Box<Value>>),
    /// Reference to an object in the graph
    Object(ObjectId),
}

impl Value {
    /// Creates a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Creates a wrapper holding `value`.
    pub fn some(value: Value) -> Self {
        Value::Optional(Some(Box::new(value)))
    }

    /// Creates an empty wrapper.
    pub fn none() -> Self {
        Value::Optional(None)
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for lists, sets, maps and optional wrappers.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Value::List(_) | Value::Set(_) | Value::Map(_) | Value::Optional(_)
        )
    }

    /// Returns the object id if this value references an object.
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the text if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns a numeric view of integer and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the integer if this is an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the number of elements (or characters for text).
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Text(s) => Some(s.chars().count()),
            Value::List(items) | Value::Set(items) => Some(items.len()),
            Value::Map(entries) => Some(entries.len()),
            Value::Optional(inner) => Some(usize::from(inner.is_some())),
            _ => None,
        }
    }

    /// Short name of the variant, used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Optional(_) => "optional",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::List(items) | Value::Set(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Optional(None) => f.write_str("empty"),
            Value::Optional(Some(inner)) => write!(f, "some({inner})"),
            Value::Object(id) => write!(f, "{id}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Value::some(v.into()),
            None => Value::none(),
        }
    }
}

/// One object stored in the arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    type_name: TypeName,
    fields: IndexMap<String, Value>,
}

impl Object {
    /// Returns the object's type.
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Returns a field value, if the field exists.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Iterates over all fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Arena of objects addressed by [`ObjectId`].
///
/// # Examples
///
/// ```rust
/// use graph_guard::core::{ObjectGraph, Value};
///
/// let mut graph = ObjectGraph::new();
/// let a = graph.insert("Node", [("name", Value::from("a"))]);
/// let b = graph.insert("Node", [("name", Value::from("b"))]);
/// graph.set_field(a, "next", Value::Object(b));
/// graph.set_field(b, "next", Value::Object(a));
///
/// assert_eq!(graph.type_of(a).map(|t| t.as_str()), Some("Node"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectGraph {
    objects: Vec<Object>,
}

impl ObjectGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an object and returns its identity.
    pub fn insert<I, K>(&mut self, type_name: impl Into<TypeName>, fields: I) -> ObjectId
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let id = ObjectId(self.objects.len());
        self.objects.push(Object {
            type_name: type_name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        });
        id
    }

    /// Sets (or replaces) a field. Returns false if the object does not exist.
    pub fn set_field(&mut self, id: ObjectId, name: impl Into<String>, value: Value) -> bool {
        match self.objects.get_mut(id.0) {
            Some(object) => {
                object.fields.insert(name.into(), value);
                true
            }
            None => false,
        }
    }

    /// Returns the object with the given id.
    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.0)
    }

    /// Returns the type of the object with the given id.
    pub fn type_of(&self, id: ObjectId) -> Option<&TypeName> {
        self.get(id).map(Object::type_name)
    }

    /// Returns the number of objects in the arena.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if the arena holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
