//! JSON record artifact.
//!
//! The processed-articles file is a JSON array of flat objects, one per
//! record, in which every standard field is present and defaults to
//! `Unknown`:
//!
//! ```json
//! [{ "id": "wing2006", "type": "article", "abstract": "Unknown", "title": "..." }]
//! ```
//!
//! Reading is lenient: numbers and booleans become strings, arrays are
//! joined with `"; "`, nulls are dropped and elements that are not objects
//! are reported and skipped.

use crate::record::ParseOutcome;
use crate::{ClusterError, Record, RecordSource, Result};
use itertools::Itertools;
use log::warn;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct JsonParser;

impl JsonParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parses a JSON array of records.
    ///
    /// # Errors
    ///
    /// [`ClusterError::InvalidFormat`] when `input` is not a JSON array.
    pub fn parse(&self, input: &str) -> Result<ParseOutcome> {
        let values: Vec<Value> = serde_json::from_str(input)?;
        let mut outcome = ParseOutcome::default();
        for (index, value) in values.into_iter().enumerate() {
            match value {
                Value::Object(map) => outcome.records.push(
                    map.into_iter()
                        .fold(Record::builder(), |builder, (name, value)| {
                            match (name.as_str(), value_to_string(value)) {
                                (_, None) => builder,
                                ("id", Some(id)) => builder.id(id),
                                ("type" | "entrytype", Some(t)) => builder.entry_type(t),
                                (_, Some(v)) => builder.field(&name, v),
                            }
                        })
                        .build(),
                ),
                other => {
                    let error = ClusterError::InvalidRecord {
                        index,
                        message: format!("expected an object, found {other}"),
                    };
                    warn!("Skipping JSON record: {error}");
                    outcome.ignored.push(error);
                }
            }
        }
        Ok(outcome)
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Object(_) => None,
        Value::String(s) => Some(s),
        Value::Array(items) => Some(items.into_iter().filter_map(value_to_string).join("; ")),
        other => Some(other.to_string()),
    }
}

impl RecordSource for JsonParser {
    fn records(&self, input: &str) -> Result<Vec<Record>> {
        Ok(self.parse(input)?.records)
    }
}

/// Serializes records as the processed-articles artifact.
///
/// # Errors
///
/// [`ClusterError::InvalidFormat`] if serialization fails.
pub fn write_json(records: &[Record]) -> Result<String> {
    let complete: Vec<Record> = records.iter().map(Record::with_defaults).collect();
    Ok(serde_json::to_string_pretty(&complete)?)
}
