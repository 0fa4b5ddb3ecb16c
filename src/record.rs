//! Bibliographic record model.
//!
//! A [`Record`] is a flat mapping of lower-cased field names to their string
//! values, plus the citation key (`id`) and the entry type. Absent fields read
//! as the [`UNKNOWN`] sentinel so that downstream stages never have to special
//! case a missing title or author.
//!
//! # Example
//!
//! ```
//! use bibcluster::{Record, UNKNOWN};
//!
//! let record = Record::builder()
//!     .id("smith2023")
//!     .field("title", "Computational Thinking in Schools")
//!     .field("author", "Smith, John")
//!     .build();
//!
//! assert_eq!(record.title(), "Computational Thinking in Schools");
//! assert_eq!(record.doi(), UNKNOWN);
//! assert_eq!(record.identity_key(), "Computational Thinking in SchoolsSmith, John");
//! ```

use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value reported for any field a record does not carry.
pub const UNKNOWN: &str = "Unknown";

/// Fields every exported record carries, defaulted to [`UNKNOWN`] when absent.
pub const KNOWN_FIELDS: [&str; 14] = [
    "abstract", "author", "doi", "issn", "journal", "keywords", "month", "note", "number",
    "pages", "title", "url", "volume", "year",
];

/// A single bibliographic entry.
///
/// Records are immutable once built; use [`Record::builder`] or
/// [`Record::to_builder`] to derive a modified copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Citation key. Generated when the source carried none.
    #[serde(default = "generate_id")]
    id: String,
    /// Entry type such as `article` or `inproceedings`.
    #[serde(rename = "type", default = "unknown")]
    entry_type: String,
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
}

fn generate_id() -> String {
    nanoid!()
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

impl Default for Record {
    fn default() -> Self {
        Self {
            id: generate_id(),
            entry_type: unknown(),
            fields: BTreeMap::new(),
        }
    }
}

impl Record {
    /// Starts building a record with a generated id and unknown type.
    #[must_use]
    pub fn builder() -> RecordBuilder {
        RecordBuilder {
            record: Record::default(),
        }
    }

    /// Starts a builder pre-filled with this record's content.
    #[must_use]
    pub fn to_builder(&self) -> RecordBuilder {
        RecordBuilder {
            record: self.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn entry_type(&self) -> &str {
        &self.entry_type
    }

    /// Returns the value of `name`, or [`UNKNOWN`] when the field is absent.
    pub fn field(&self, name: &str) -> &str {
        self.fields
            .get(&name.to_lowercase())
            .map_or(UNKNOWN, String::as_str)
    }

    /// Whether the field carries a real value: present, not blank and not the sentinel.
    pub fn has_field(&self, name: &str) -> bool {
        let value = self.field(name).trim();
        !value.is_empty() && value != UNKNOWN
    }

    /// Iterates the fields actually stored on the record, in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn title(&self) -> &str {
        self.field("title")
    }

    pub fn author(&self) -> &str {
        self.field("author")
    }

    pub fn doi(&self) -> &str {
        self.field("doi")
    }

    pub fn abstract_text(&self) -> &str {
        self.field("abstract")
    }

    pub fn year(&self) -> &str {
        self.field("year")
    }

    pub fn journal(&self) -> &str {
        self.field("journal")
    }

    /// Derived identity used for deduplication.
    ///
    /// The DOI when present and non-empty, otherwise the title and author
    /// concatenated verbatim. Missing title or author contribute [`UNKNOWN`].
    pub fn identity_key(&self) -> String {
        if self.has_doi() {
            self.doi().to_string()
        } else {
            format!("{}{}", self.title(), self.author())
        }
    }

    pub(crate) fn has_doi(&self) -> bool {
        self.fields
            .get("doi")
            .is_some_and(|doi| !doi.trim().is_empty() && doi != UNKNOWN)
    }

    /// Returns a copy in which every [`KNOWN_FIELDS`] entry is present,
    /// absent ones set to [`UNKNOWN`].
    #[must_use]
    pub fn with_defaults(&self) -> Record {
        let mut record = self.clone();
        for name in KNOWN_FIELDS {
            record
                .fields
                .entry(name.to_string())
                .or_insert_with(unknown);
        }
        record
    }
}

/// Builder for [`Record`].
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !id.trim().is_empty() {
            self.record.id = id;
        }
        self
    }

    #[must_use]
    pub fn entry_type(mut self, entry_type: impl Into<String>) -> Self {
        self.record.entry_type = entry_type.into();
        self
    }

    /// Sets a field, replacing any earlier value. Names are stored lower-cased.
    #[must_use]
    pub fn field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.record
            .fields
            .insert(name.trim().to_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn field_if_absent(mut self, name: &str, value: impl Into<String>) -> Self {
        self.record
            .fields
            .entry(name.trim().to_lowercase())
            .or_insert_with(|| value.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Record {
        self.record
    }
}

/// Records read from an artifact, with the entries that had to be skipped.
///
/// Every entry of `ignored` is a [`crate::ClusterError::InvalidRecord`].
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub records: Vec<Record>,
    pub ignored: Vec<crate::ClusterError>,
}

/// A capability that produces records from some textual artifact.
///
/// The BibTeX, CSV and JSON readers implement this so the pipeline never
/// depends on how records were obtained.
pub trait RecordSource {
    /// Reads every record contained in `input`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ClusterError::InvalidFormat`] when the artifact as a
    /// whole cannot be decoded. Individual bad records are recovered, not raised.
    fn records(&self, input: &str) -> crate::Result<Vec<Record>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_fields_read_unknown() {
        let record = Record::builder().field("title", "Abstraction").build();
        assert_eq!(record.title(), "Abstraction");
        assert_eq!(record.author(), UNKNOWN);
        assert_eq!(record.abstract_text(), UNKNOWN);
        assert!(!record.has_field("abstract"));
        assert_eq!(record.entry_type(), UNKNOWN);
        assert!(!record.id().is_empty());
    }

    #[test]
    fn test_field_names_are_case_insensitive() {
        let record = Record::builder().field("DOI", "10.1000/xyz").build();
        assert_eq!(record.field("doi"), "10.1000/xyz");
        assert_eq!(record.field("Doi"), "10.1000/xyz");
    }

    #[test]
    fn test_identity_key_prefers_doi() {
        let record = Record::builder()
            .field("doi", "10.1000/xyz")
            .field("title", "T")
            .field("author", "A")
            .build();
        assert_eq!(record.identity_key(), "10.1000/xyz");
    }

    #[test]
    fn test_identity_key_falls_back_on_empty_doi() {
        let record = Record::builder()
            .field("doi", "")
            .field("title", "Title")
            .field("author", "Author")
            .build();
        assert_eq!(record.identity_key(), "TitleAuthor");

        let record = Record::builder().field("title", "Title").build();
        assert_eq!(record.identity_key(), "TitleUnknown");
    }

    #[test]
    fn test_with_defaults_fills_known_fields() {
        let record = Record::builder().field("title", "X").build().with_defaults();
        assert_eq!(record.fields().count(), KNOWN_FIELDS.len());
        assert_eq!(record.field("title"), "X");
        assert_eq!(record.field("volume"), UNKNOWN);
    }

    #[test]
    fn test_blank_id_keeps_generated_one() {
        let record = Record::builder().id("  ").build();
        assert!(!record.id().trim().is_empty());
    }
}
