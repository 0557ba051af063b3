//! Per-event lookup and substitution.

use crate::{MapStore, MapTable};
use fm_error::LookupError;
use fm_types::{Event, LookupConfig, Placement};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// Outcome of looking up one configured field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    /// The field's value was found; carries the mapped value.
    Matched(Value),
    /// The value was not found and the rendered fallback was written.
    Fallback(String),
    /// The value was not found and nothing was written.
    Unmatched,
    /// The field is not present on the event.
    Absent,
    /// The destination already exists and override is off.
    Skipped,
}

impl FieldOutcome {
    /// Returns true if this outcome wrote a value to the event.
    pub fn is_populated(&self) -> bool {
        matches!(self, Self::Matched(_) | Self::Fallback(_))
    }
}

/// Outcome for a named field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldResult {
    pub field: String,
    pub outcome: FieldOutcome,
}

impl FieldResult {
    fn new(field: &str, outcome: FieldOutcome) -> Self {
        Self {
            field: field.to_string(),
            outcome,
        }
    }
}

/// Result of applying the lookup to one event.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupResult {
    /// One entry per configured field, in configuration order.
    pub fields: Vec<FieldResult>,
    /// Whether the event counts as successfully enriched.
    pub matched: bool,
}

impl LookupResult {
    /// Returns the outcome for `field`.
    pub fn outcome(&self, field: &str) -> Option<&FieldOutcome> {
        self.fields
            .iter()
            .find(|r| r.field == field)
            .map(|r| &r.outcome)
    }

    /// Number of fields that wrote a value.
    pub fn populated(&self) -> usize {
        self.count(FieldOutcome::is_populated)
    }

    /// Number of fields found in the map.
    pub fn hits(&self) -> usize {
        self.count(|o| matches!(o, FieldOutcome::Matched(_)))
    }

    /// Number of present fields not found in the map.
    pub fn misses(&self) -> usize {
        self.count(|o| matches!(o, FieldOutcome::Fallback(_) | FieldOutcome::Unmatched))
    }

    /// Number of fallback values written.
    pub fn fallbacks(&self) -> usize {
        self.count(|o| matches!(o, FieldOutcome::Fallback(_)))
    }

    fn count(&self, pred: impl Fn(&FieldOutcome) -> bool) -> usize {
        self.fields.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Applies exact-match lookups against a [`MapStore`].
///
/// Each call reads a single snapshot of the table, so a refresh landing
/// mid-event is never half visible.
pub struct LookupEngine {
    config: LookupConfig,
    store: Arc<MapStore>,
}

impl LookupEngine {
    pub fn new(config: &LookupConfig, store: Arc<MapStore>) -> Self {
        Self {
            config: config.clone(),
            store,
        }
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Looks up the configured fields and writes results onto `event`.
    ///
    /// On error the event is left as it was.
    pub fn apply(&self, event: &mut Event) -> Result<LookupResult, LookupError> {
        let table = self.store.snapshot();
        match &self.config.placement {
            Placement::Destination { destination } => self.apply_single(event, &table, destination),
            Placement::ResultField { result_key } => {
                self.apply_multi(event, &table, Some(result_key.as_str()))
            }
            Placement::OverwriteSource => self.apply_multi(event, &table, None),
        }
    }

    /// Multi-field lookup. Results go under `result_key`, or over the source
    /// fields when it is `None`.
    fn apply_multi(
        &self,
        event: &mut Event,
        table: &MapTable,
        result_key: Option<&str>,
    ) -> Result<LookupResult, LookupError> {
        let mut results = Vec::with_capacity(self.config.fields.len());
        let mut writes: Vec<(&str, Value)> = Vec::new();
        let mut all_hit = true;

        for field in &self.config.fields {
            let Some(value) = event.get(field) else {
                results.push(FieldResult::new(field, FieldOutcome::Absent));
                continue;
            };

            let outcome = match lookup_key(field, value)?.and_then(|key| table.get(&key)) {
                Some(mapped) => FieldOutcome::Matched(mapped.clone()),
                None => {
                    all_hit = false;
                    self.render_fallback(event, field)
                }
            };

            match &outcome {
                FieldOutcome::Matched(mapped) => writes.push((field.as_str(), mapped.clone())),
                FieldOutcome::Fallback(text) => {
                    writes.push((field.as_str(), Value::String(text.clone())))
                }
                _ => {}
            }
            results.push(FieldResult::new(field, outcome));
        }

        let matched = all_hit && writes.len() == self.config.fields.len();

        // All outcomes are known before the event is touched.
        match result_key {
            Some(key) => {
                let object: Map<String, Value> = writes
                    .into_iter()
                    .map(|(field, value)| (field.to_string(), value))
                    .collect();
                event.set(key, Value::Object(object))?;
            }
            None => {
                for (field, value) in writes {
                    event.set(field, value)?;
                }
            }
        }

        Ok(LookupResult {
            fields: results,
            matched,
        })
    }

    fn apply_single(
        &self,
        event: &mut Event,
        table: &MapTable,
        destination: &str,
    ) -> Result<LookupResult, LookupError> {
        let Some(field) = self.config.fields.first() else {
            return Ok(LookupResult {
                fields: Vec::new(),
                matched: false,
            });
        };
        let in_place = field == destination;

        let Some(value) = event.get(field) else {
            return Ok(LookupResult {
                fields: vec![FieldResult::new(field, FieldOutcome::Absent)],
                matched: false,
            });
        };

        if event.contains(destination) && !self.config.override_existing {
            debug!(
                field = %field,
                destination = %destination,
                "Destination already set, skipping lookup"
            );
            return Ok(LookupResult {
                fields: vec![FieldResult::new(field, FieldOutcome::Skipped)],
                matched: in_place,
            });
        }

        let outcome = match lookup_key(field, value)?.and_then(|key| table.get(&key)) {
            Some(mapped) => FieldOutcome::Matched(mapped.clone()),
            None => self.render_fallback(event, field),
        };

        match &outcome {
            FieldOutcome::Matched(mapped) => event.set(destination, mapped.clone())?,
            FieldOutcome::Fallback(text) => event.set(destination, Value::String(text.clone()))?,
            _ => {}
        }

        let matched = outcome.is_populated() || in_place;
        Ok(LookupResult {
            fields: vec![FieldResult::new(field, outcome)],
            matched,
        })
    }

    fn render_fallback(&self, event: &Event, field: &str) -> FieldOutcome {
        match self.config.fallback_for(field) {
            Some(template) => FieldOutcome::Fallback(event.sprintf(template)),
            None => FieldOutcome::Unmatched,
        }
    }
}

impl std::fmt::Debug for LookupEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupEngine")
            .field("fields", &self.config.fields)
            .field("placement", &self.config.placement)
            .finish_non_exhaustive()
    }
}

/// Turns a field value into the string used as map key.
///
/// Arrays use their first element. `None` means the value can never match.
fn lookup_key<'a>(field: &str, value: &'a Value) -> Result<Option<Cow<'a, str>>, LookupError> {
    match value {
        Value::Array(items) => match items.first() {
            None => Ok(None),
            Some(Value::Array(_)) => Err(unsupported(field, "nested array")),
            Some(first) => scalar_key(field, first),
        },
        other => scalar_key(field, other),
    }
}

fn scalar_key<'a>(field: &str, value: &'a Value) -> Result<Option<Cow<'a, str>>, LookupError> {
    match value {
        Value::String(s) => Ok(Some(Cow::Borrowed(s.as_str()))),
        Value::Number(n) => Ok(Some(Cow::Owned(n.to_string()))),
        Value::Bool(b) => Ok(Some(Cow::Owned(b.to_string()))),
        Value::Null => Ok(None),
        Value::Object(_) => Err(unsupported(field, "object")),
        Value::Array(_) => Err(unsupported(field, "array")),
    }
}

fn unsupported(field: &str, kind: &'static str) -> LookupError {
    LookupError::UnsupportedValue {
        field: field.to_string(),
        kind,
    }
}
