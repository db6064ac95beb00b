use std::fmt;

use serde_json::{Map, Value};

/// A sparse merge-update for a single document.
///
/// A `Patch` collects only the fields a default rule decided to change.
/// Applying it through a store merges the listed fields into the document
/// and leaves every other field untouched. Empty patches are never
/// applied; callers check [`Patch::is_empty`] first.
///
/// # Example
///
/// ```rust
/// use backfill::Patch;
/// use serde_json::{json, Value};
///
/// let mut patch = Patch::new();
/// patch.set("status", json!("pending"));
/// patch.set("assignedTo", Value::Null);
///
/// assert!(!patch.is_empty());
/// assert_eq!(patch.fields(), vec!["status", "assignedTo"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    fields: Map<String, Value>,
}

impl Patch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self {
            fields: Map::new(),
        }
    }

    /// Stages a field for update.
    ///
    /// Staging the same field twice keeps the last value.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Returns `true` when no fields are staged.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of staged fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns the value staged for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns the names of the staged fields, in insertion order.
    ///
    /// Used for the per-document progress lines operators watch during a
    /// migration run.
    pub fn fields(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Consumes the patch and returns the merge-update payload.
    ///
    /// Only the staged fields appear in the payload; merge semantics are
    /// the store's responsibility.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Borrows the staged fields as a map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl fmt::Display for Patch {
    /// Formats the patch as compact JSON, matching the progress log lines.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let compact =
            serde_json::to_string(&self.fields).map_err(|_| fmt::Error)?;
        write!(f, "{}", compact)
    }
}
