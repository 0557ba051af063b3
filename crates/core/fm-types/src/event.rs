//! Event abstraction consumed by lookup filters.

use fm_error::LookupError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field that receives tags added on a successful lookup.
pub const TAGS_FIELD: &str = "tags";

/// A pipeline event.
///
/// Fields are addressed either by plain name (`status`) or by a bracketed
/// nested reference (`[http][status]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    fields: Map<String, Value>,
}

impl Event {
    /// Creates an empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an event from a JSON object.
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Creates an event from a JSON value, returning `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Consumes the event and returns it as a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Returns the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Gets a field value by name or nested reference.
    pub fn get(&self, field: &str) -> Option<&Value> {
        let mut segments = field_path(field).into_iter();
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Returns true if the field exists (a JSON `null` counts as present).
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Sets a field, creating intermediate objects for nested references.
    ///
    /// Fails if an intermediate segment exists and is not an object.
    pub fn set(&mut self, field: &str, value: Value) -> Result<(), LookupError> {
        let path = field_path(field);
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| LookupError::InvalidPath(field.to_string()))?;

        let mut current = &mut self.fields;
        for segment in parents {
            current = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or_else(|| LookupError::InvalidPath(field.to_string()))?;
        }

        current.insert(last.to_string(), value);
        Ok(())
    }

    /// Removes a top-level or nested field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let path = field_path(field);
        let (last, parents) = path.split_last()?;

        let mut current = &mut self.fields;
        for segment in parents {
            current = current.get_mut(*segment)?.as_object_mut()?;
        }
        current.remove(*last)
    }

    /// Appends a tag to the `tags` array unless it is already present.
    pub fn add_tag(&mut self, tag: &str) {
        let tags = self
            .fields
            .entry(TAGS_FIELD.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        // A scalar tags field is promoted to a one-element array.
        if !tags.is_array() {
            let existing = tags.take();
            *tags = Value::Array(vec![existing]);
        }

        if let Value::Array(list) = tags {
            if !list.iter().any(|t| t.as_str() == Some(tag)) {
                list.push(Value::String(tag.to_string()));
            }
        }
    }

    /// Returns the event's tags.
    pub fn tags(&self) -> Vec<&str> {
        match self.fields.get(TAGS_FIELD) {
            Some(Value::Array(list)) => list.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(tag)) => vec![tag.as_str()],
            _ => Vec::new(),
        }
    }

    /// Renders a template, replacing each `%{field}` with the field's value.
    ///
    /// References to absent fields are left in place verbatim.
    pub fn sprintf(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("%{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };

            let name = &after[..end];
            match self.get(name) {
                Some(value) => out.push_str(&render_value(value)),
                None => out.push_str(&rest[start..start + end + 3]),
            }
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        out
    }
}

impl From<Map<String, Value>> for Event {
    fn from(fields: Map<String, Value>) -> Self {
        Self::from_map(fields)
    }
}

/// Renders a value for template interpolation.
///
/// Strings are inserted raw, arrays are joined with commas, everything else
/// is written as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Splits a field reference into path segments.
///
/// `[a][b]` yields `["a", "b"]`; anything else is a single top-level name.
fn field_path(field: &str) -> Vec<&str> {
    match field
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
    {
        Some(inner) => inner.split("][").collect(),
        None => vec![field],
    }
}
