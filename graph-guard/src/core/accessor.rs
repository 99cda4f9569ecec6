//! Property accessors: how the engine reads a property from an object.

use super::value::{ObjectGraph, ObjectId, TypeName, Value};
use crate::error::{GuardError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Reads a property of an object in a graph.
///
/// An `Err` is an access fault: it aborts the validation call.
pub trait PropertyAccessor: fmt::Debug + Send + Sync {
    /// Returns the value of `property` on `object`.
    fn read(&self, graph: &ObjectGraph, object: ObjectId, property: &str) -> Result<Value>;
}

/// Reads stored fields directly. A field that was never set reads as null.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldAccessor;

impl PropertyAccessor for FieldAccessor {
    fn read(&self, graph: &ObjectGraph, object: ObjectId, property: &str) -> Result<Value> {
        let obj = graph.get(object).ok_or_else(|| {
            GuardError::access_fault("<unknown>", property, format!("no object {object} in graph"))
        })?;
        Ok(obj.field(property).cloned().unwrap_or(Value::Null))
    }
}

type Getter = dyn Fn(&ObjectGraph, ObjectId) -> Result<Value> + Send + Sync;

/// Per-type, per-property getters with a fallback accessor.
///
/// Useful for computed properties that are not stored as fields.
///
/// # Examples
///
/// ```rust
/// use graph_guard::core::{AccessorTable, ObjectGraph, PropertyAccessor, Value};
///
/// let table = AccessorTable::new().getter("Person", "initials", |graph, id| {
///     let name = graph.get(id).and_then(|o| o.field("name")).and_then(Value::as_str);
///     Ok(name.and_then(|n| n.chars().next()).map(|c| Value::Text(c.to_string())).unwrap_or(Value::Null))
/// });
///
/// let mut graph = ObjectGraph::new();
/// let id = graph.insert("Person", [("name", Value::from("Ada"))]);
/// assert_eq!(table.read(&graph, id, "initials").unwrap(), Value::from("A"));
/// assert_eq!(table.read(&graph, id, "name").unwrap(), Value::from("Ada"));
/// ```
#[derive(Clone)]
pub struct AccessorTable {
    getters: HashMap<(TypeName, String), Arc<Getter>>,
    fallback: Arc<dyn PropertyAccessor>,
}

impl fmt::Debug for AccessorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .getters
            .keys()
            .map(|(t, p)| format!("{t}.{p}"))
            .collect();
        keys.sort();
        f.debug_struct("AccessorTable")
            .field("getters", &keys)
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl Default for AccessorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessorTable {
    /// Creates a table that falls back to [`FieldAccessor`].
    pub fn new() -> Self {
        Self::with_fallback(FieldAccessor)
    }

    /// Creates a table with a custom fallback accessor.
    pub fn with_fallback(fallback: impl PropertyAccessor + 'static) -> Self {
        Self {
            getters: HashMap::new(),
            fallback: Arc::new(fallback),
        }
    }

    /// Registers a getter for `type_name.property`.
    pub fn getter<F>(mut self, type_name: impl Into<TypeName>, property: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ObjectGraph, ObjectId) -> Result<Value> + Send + Sync + 'static,
    {
        self.getters
            .insert((type_name.into(), property.into()), Arc::new(f));
        self
    }
}

impl PropertyAccessor for AccessorTable {
    fn read(&self, graph: &ObjectGraph, object: ObjectId, property: &str) -> Result<Value> {
        if let Some(type_name) = graph.type_of(object) {
            if let Some(getter) = self.getters.get(&(type_name.clone(), property.to_string())) {
                return getter(graph, object);
            }
        }
        self.fallback.read(graph, object, property)
    }
}
