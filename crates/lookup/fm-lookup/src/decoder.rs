//! Decoders turning raw map bytes into a [`MapTable`].
//!
//! Every decoder either returns a complete table or fails; nothing is merged
//! into the live map from here.

use crate::MapTable;
use fm_error::DecodeError;
use fm_types::MapFormat;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde_json::Value;
use std::fmt;

/// Decodes `bytes` in the given format.
///
/// - YAML and JSON must hold a mapping at the top level.
/// - CSV rows are `key,value` pairs; there is no header row.
pub fn decode(format: MapFormat, bytes: &[u8]) -> Result<MapTable, DecodeError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::Encoding(format!("Map data is not valid UTF-8: {e}")))?;

    match format {
        MapFormat::Yaml => decode_yaml(text),
        MapFormat::Json => decode_json(text),
        MapFormat::Csv => decode_csv(text),
    }
}

fn decode_yaml(text: &str) -> Result<MapTable, DecodeError> {
    serde_yaml::Deserializer::from_str(text)
        .deserialize_map(YamlTableVisitor)
        .map_err(|e| DecodeError::Malformed(format!("Invalid YAML: {e}")))
}

/// Builds a [`MapTable`] straight from the top-level YAML mapping.
///
/// Entries are inserted in document order, so a repeated key keeps its
/// last value as it does for JSON and CSV.
struct YamlTableVisitor;

impl<'de> Visitor<'de> for YamlTableVisitor {
    type Value = MapTable;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a YAML mapping of keys to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<MapTable, A::Error> {
        let mut table = MapTable::with_capacity(access.size_hint().unwrap_or(0));

        while let Some((key, value)) =
            access.next_entry::<serde_yaml::Value, serde_yaml::Value>()?
        {
            let key = yaml_key(&key).ok_or_else(|| {
                <A::Error as de::Error>::custom(format!(
                    "YAML map keys must be scalars, found {}",
                    yaml_kind(&key)
                ))
            })?;
            let value = serde_json::to_value(&value).map_err(|e| {
                <A::Error as de::Error>::custom(format!(
                    "Unsupported YAML value for key '{key}': {e}"
                ))
            })?;
            table.insert(key, value);
        }

        Ok(table)
    }
}

fn yaml_key(key: &serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "boolean",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "sequence",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged value",
    }
}

fn decode_json(text: &str) -> Result<MapTable, DecodeError> {
    let document: Value = serde_json::from_str(text)
        .map_err(|e| DecodeError::Malformed(format!("Invalid JSON: {e}")))?;

    match document {
        Value::Object(object) => Ok(object.into_iter().collect()),
        other => Err(DecodeError::Malformed(format!(
            "JSON map must be an object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn decode_csv(text: &str) -> Result<MapTable, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut table = MapTable::new();
    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let record = record
            .map_err(|e| DecodeError::Malformed(format!("Invalid CSV at row {row}: {e}")))?;

        if record.len() != 2 {
            return Err(DecodeError::Malformed(format!(
                "CSV row {row} has {} columns, expected 2",
                record.len()
            )));
        }

        table.insert(&record[0], Value::String(record[1].to_string()));
    }

    Ok(table)
}
