//! BibTeX reader and writer.
//!
//! # Example
//!
//! ```
//! use bibcluster::{BibtexParser, RecordSource};
//!
//! let input = r#"@article{wing2006,
//!   author = {Wing, Jeannette M.},
//!   title = {Computational Thinking},
//!   year = {2006}
//! }"#;
//!
//! let records = BibtexParser::new().records(input).unwrap();
//! assert_eq!(records[0].id(), "wing2006");
//! assert_eq!(records[0].title(), "Computational Thinking");
//! ```

mod parse;

use crate::record::ParseOutcome;
use crate::{ClusterError, Record, RecordSource, Result};
use either::Either;
use itertools::Itertools;
use log::warn;
use parse::{RawBibtexEntry, bibtex_parse};

/// Parser for BibTeX files.
#[derive(Debug, Clone, Default)]
pub struct BibtexParser;

impl BibtexParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parses `input`, returning the readable entries alongside the
    /// entries or fields that had to be skipped.
    pub fn parse(&self, input: &str) -> ParseOutcome {
        let (ignored, records): (Vec<_>, Vec<_>) = bibtex_parse(input)
            .into_iter()
            .enumerate()
            .partition_map(|(index, result)| match result {
                Either::Left((line, message)) => Either::Left(ClusterError::InvalidRecord {
                    index,
                    message: format!("line {line}: {message}"),
                }),
                Either::Right(entry) => Either::Right(into_record(entry)),
            });

        for error in &ignored {
            warn!("Skipping BibTeX entry: {error}");
        }
        ParseOutcome { records, ignored }
    }
}

fn into_record(entry: RawBibtexEntry) -> Record {
    for piece in &entry.ignored {
        warn!(
            "Ignoring malformed field in entry '{}' (line {}): {piece}",
            entry.key, entry.line
        );
    }
    entry
        .fields
        .into_iter()
        .fold(
            Record::builder().id(entry.key).entry_type(entry.entry_type),
            |builder, (name, value)| builder.field_if_absent(&name, value),
        )
        .build()
}

impl RecordSource for BibtexParser {
    fn records(&self, input: &str) -> Result<Vec<Record>> {
        Ok(self.parse(input).records)
    }
}

/// Serializes records as BibTeX entries.
///
/// Fields are written in name order; absent and `Unknown` values are left
/// out and records of unknown type are written as `@misc`.
pub fn write_bibtex(records: &[Record]) -> String {
    records
        .iter()
        .map(|record| {
            let entry_type = match record.entry_type().trim() {
                "" | crate::UNKNOWN => "misc",
                known => known,
            };
            let fields = record
                .fields()
                .filter(|(name, _)| record.has_field(name))
                .map(|(name, value)| format!("  {name} = {{{value}}},\n"))
                .join("");
            format!("@{entry_type}{{{},\n{fields}}}\n", record.id())
        })
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_into_records() {
        let input = r#"@article{a1,
  title = {First},
  TITLE = {Ignored second title},
  abstract = {Abstract
    over two lines.},
  doi = {10.1000/a1}
}
@article{ , title = {broken}}
"#;
        let outcome = BibtexParser::new().parse(input);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.ignored.len(), 1);

        let record = &outcome.records[0];
        assert_eq!(record.id(), "a1");
        assert_eq!(record.entry_type(), "article");
        assert_eq!(record.title(), "First");
        assert_eq!(record.abstract_text(), "Abstract over two lines.");
        assert_eq!(record.doi(), "10.1000/a1");
        assert_eq!(record.author(), crate::UNKNOWN);
    }

    #[test]
    fn test_write_bibtex() {
        let records = vec![
            Record::builder()
                .id("k1")
                .entry_type("article")
                .field("title", "T")
                .field("author", "A")
                .field("doi", crate::UNKNOWN)
                .build(),
            Record::builder().id("k2").field("title", "U").build(),
        ];
        let expected = "@article{k1,\n  author = {A},\n  title = {T},\n}\n\n@misc{k2,\n  title = {U},\n}\n";
        assert_eq!(write_bibtex(&records), expected);
    }

    #[test]
    fn test_written_entries_read_back() {
        let records = vec![
            Record::builder()
                .id("k1")
                .entry_type("article")
                .field("title", "Teaching {Abstraction}")
                .field("year", "2020")
                .build(),
        ];
        let parsed = BibtexParser::new().records(&write_bibtex(&records)).unwrap();
        assert_eq!(parsed, records);
    }
}
