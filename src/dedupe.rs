//! Record deduplicator implementation.
//!
//! Partitions a list of records into unique records and duplicates using a
//! derived identity key. The first record seen with a key is the unique one;
//! every later record with the same key is a duplicate.
//!
//! ## Usage
//!
//! ```rust
//! use bibcluster::{dedupe::Deduplicator, Record};
//!
//! let records = vec![
//!     Record::builder()
//!         .field("title", "Computational Thinking")
//!         .field("doi", "10.1234/ct.2023.001")
//!         .build(),
//!     Record::builder()
//!         .field("title", "Computational thinking.")
//!         .field("doi", "10.1234/ct.2023.001")
//!         .build(),
//! ];
//!
//! let outcome = Deduplicator::new().partition(&records);
//! assert_eq!(outcome.unique.len(), 1);
//! assert_eq!(outcome.duplicates.len(), 1);
//! assert_eq!(outcome.unique[0].title(), "Computational Thinking");
//! ```
//!
//! ## Key strategies
//!
//! - [`KeyStrategy::Verbatim`] (default): the DOI when present, otherwise
//!   title and author concatenated exactly as written.
//! - [`KeyStrategy::Normalized`]: the DOI with URL prefixes removed and
//!   lower-cased, otherwise title and author passed through
//!   [`normalize_text`]. Catches duplicates that differ only in case or
//!   punctuation.
//!
//! Any other rule can be supplied with [`Deduplicator::partition_by`].

use crate::normalize::normalize_text;
use crate::utils::format_doi;
use crate::Record;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the identity key of a record is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    #[default]
    Verbatim,
    Normalized,
}

impl KeyStrategy {
    /// Derives the identity key of `record`.
    pub fn key(&self, record: &Record) -> String {
        match self {
            KeyStrategy::Verbatim => record.identity_key(),
            KeyStrategy::Normalized => record
                .has_doi()
                .then(|| format_doi(record.doi()))
                .flatten()
                .unwrap_or_else(|| {
                    format!(
                        "{} {}",
                        normalize_text(record.title()),
                        normalize_text(record.author())
                    )
                }),
        }
    }
}

/// Configuration options for the deduplication process.
///
/// # Examples
///
/// ```
/// use bibcluster::dedupe::{DeduplicatorConfig, KeyStrategy};
///
/// let config = DeduplicatorConfig {
///     key_strategy: KeyStrategy::Normalized,
/// };
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeduplicatorConfig {
    pub key_strategy: KeyStrategy,
}

/// The two partitions produced by deduplication, each in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupeOutcome {
    pub unique: Vec<Record>,
    pub duplicates: Vec<Record>,
    /// For each duplicate, the index in `unique` of the record it repeats.
    #[serde(skip)]
    duplicate_of: Vec<usize>,
}

impl DedupeOutcome {
    /// Groups every unique record that has duplicates with those duplicates.
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        let mut groups: Vec<(usize, Vec<Record>)> = Vec::new();
        let mut slots: HashMap<usize, usize> = HashMap::new();
        for (duplicate, &original) in self.duplicates.iter().zip(&self.duplicate_of) {
            let slot = *slots.entry(original).or_insert_with(|| {
                groups.push((original, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(duplicate.clone());
        }
        groups.sort_by_key(|(original, _)| *original);
        groups
            .into_iter()
            .map(|(original, duplicates)| DuplicateGroup {
                unique: self.unique[original].clone(),
                duplicates,
            })
            .collect()
    }
}

/// A unique record and the later records that repeat it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub unique: Record,
    pub duplicates: Vec<Record>,
}

/// Deduplication engine.
///
/// Runs in a single pass over the input, O(n) with a hash map from key to
/// the first record seen.
#[derive(Debug, Default, Clone)]
pub struct Deduplicator {
    config: DeduplicatorConfig,
}

impl Deduplicator {
    /// Creates a deduplicator with the verbatim key strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: DeduplicatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Partitions `records` with the configured key strategy.
    pub fn partition(&self, records: &[Record]) -> DedupeOutcome {
        let strategy = self.config.key_strategy;
        self.partition_by(records, |record| strategy.key(record))
    }

    /// Partitions `records` with a caller-supplied key.
    ///
    /// # Examples
    ///
    /// ```
    /// use bibcluster::{dedupe::Deduplicator, Record};
    ///
    /// let records = vec![
    ///     Record::builder().field("title", "A").field("year", "2020").build(),
    ///     Record::builder().field("title", "B").field("year", "2020").build(),
    /// ];
    /// let outcome = Deduplicator::new().partition_by(&records, |r| r.year().to_string());
    /// assert_eq!(outcome.duplicates.len(), 1);
    /// ```
    pub fn partition_by<F>(&self, records: &[Record], key: F) -> DedupeOutcome
    where
        F: Fn(&Record) -> String,
    {
        let mut first_seen: HashMap<String, usize> = HashMap::with_capacity(records.len());
        let mut outcome = DedupeOutcome::default();

        for record in records {
            let key = key(record);
            match first_seen.get(&key) {
                Some(&original) => {
                    outcome.duplicates.push(record.clone());
                    outcome.duplicate_of.push(original);
                }
                None => {
                    first_seen.insert(key, outcome.unique.len());
                    outcome.unique.push(record.clone());
                }
            }
        }

        info!(
            "Deduplicated {} records: {} unique, {} duplicates",
            records.len(),
            outcome.unique.len(),
            outcome.duplicates.len()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(id: &str, title: &str, author: &str, doi: Option<&str>) -> Record {
        let builder = Record::builder()
            .id(id)
            .field("title", title)
            .field("author", author);
        match doi {
            Some(doi) => builder.field("doi", doi).build(),
            None => builder.build(),
        }
    }

    #[test]
    fn test_first_seen_wins() {
        let records = vec![
            record("r", "Title 1", "Smith", Some("10.1234/abc")),
            record("x", "Other", "Doe", Some("10.1234/def")),
            record("r2", "Title 1 (preprint)", "Smith J", Some("10.1234/abc")),
        ];

        let outcome = Deduplicator::new().partition(&records);
        let unique: Vec<_> = outcome.unique.iter().map(Record::id).collect();
        let duplicates: Vec<_> = outcome.duplicates.iter().map(Record::id).collect();
        assert_eq!(unique, vec!["r", "x"]);
        assert_eq!(duplicates, vec!["r2"]);
    }

    #[test]
    fn test_no_collisions_keeps_input() {
        let records = vec![
            record("a", "Title 1", "Smith", None),
            record("b", "Title 2", "Smith", None),
            record("c", "Title 1", "Doe", None),
        ];
        let outcome = Deduplicator::new().partition(&records);
        assert_eq!(outcome.unique, records);
        assert!(outcome.duplicates.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let outcome = Deduplicator::new().partition(&[]);
        assert!(outcome.unique.is_empty());
        assert!(outcome.duplicates.is_empty());
    }

    #[test]
    fn test_title_author_fallback_is_verbatim() {
        let records = vec![
            record("a", "Title 1", "Smith", None),
            record("b", "Title 1", "Smith", Some("")),
            record("c", "title 1", "Smith", None),
        ];
        let outcome = Deduplicator::new().partition(&records);
        assert_eq!(outcome.unique.len(), 2);
        assert_eq!(outcome.duplicates[0].id(), "b");
    }

    #[test]
    fn test_normalized_key_strategy() {
        let records = vec![
            record("a", "Title 1", "Smith, J.", None),
            record("b", "title 1.", "smith j", None),
            record("c", "X", "Y", Some("https://doi.org/10.1000/ABC")),
            record("d", "Z", "W", Some("10.1000/abc")),
        ];
        let config = DeduplicatorConfig {
            key_strategy: KeyStrategy::Normalized,
        };
        let outcome = Deduplicator::new().with_config(config).partition(&records);
        let duplicates: Vec<_> = outcome.duplicates.iter().map(Record::id).collect();
        assert_eq!(duplicates, vec!["b", "d"]);
    }

    #[test]
    fn test_duplicate_groups() {
        let records = vec![
            record("a", "T", "A", Some("10.1/x")),
            record("b", "U", "B", Some("10.1/y")),
            record("c", "T", "A", Some("10.1/y")),
            record("d", "T", "A", Some("10.1/x")),
            record("e", "T", "A", Some("10.1/x")),
        ];
        let groups = Deduplicator::new().partition(&records).duplicate_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].unique.id(), "a");
        let ids: Vec<_> = groups[0].duplicates.iter().map(Record::id).collect();
        assert_eq!(ids, vec!["d", "e"]);
        assert_eq!(groups[1].unique.id(), "b");
        assert_eq!(groups[1].duplicates[0].id(), "c");
    }
}
