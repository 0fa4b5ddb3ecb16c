//! CSV format parser implementation.
//!
//! Reads the CSV exports of library databases (one article per row) into
//! records, with configurable header mappings.
//!
//! # Example
//!
//! ```
//! use bibcluster::{CsvParser, RecordSource};
//!
//! let input = "Article title,Authors,Volume year,DOI\nExample Paper,Smith J,2023,10.1000/x";
//!
//! let records = CsvParser::new().records(input).unwrap();
//! assert_eq!(records[0].title(), "Example Paper");
//! assert_eq!(records[0].id(), "Smith2023");
//! ```

use csv::{ReaderBuilder, StringRecord};
use log::warn;
use std::collections::HashMap;

use crate::record::ParseOutcome;
use crate::utils::first_author_token;
use crate::{ClusterError, Record, RecordSource, Result, UNKNOWN};

/// Default header mappings for common CSV column names
const DEFAULT_HEADERS: &[(&str, &[&str])] = &[
    ("id", &["id", "citation_id", "key"]),
    ("title", &["title", "article title", "publication title"]),
    ("author", &["author", "authors", "creator", "creators"]),
    (
        "journal",
        &["journal", "journal title", "source title", "publication"],
    ),
    ("year", &["year", "volume year", "publication year", "pub year"]),
    ("volume", &["volume", "vol"]),
    ("number", &["issue", "number", "no"]),
    ("pages", &["pages", "page numbers", "page range"]),
    ("doi", &["doi", "digital object identifier"]),
    ("abstract", &["abstract", "summary"]),
    ("keywords", &["keywords", "tags"]),
    ("issn", &["issn", "isbn"]),
    ("publisher", &["publisher"]),
    ("url", &["url", "link", "web link"]),
];

/// Cell values that exports use to mean "no value".
const PLACEHOLDERS: &[&str] = &["No DOI", "No URL", "N/A"];

/// Year written when the export has none.
const UNKNOWN_YEAR: &str = "Unknown Year";

/// Configuration for CSV parsing with custom header mappings.
///
/// # Examples
///
/// ```
/// use bibcluster::csv::CsvConfig;
///
/// let mut config = CsvConfig::new();
/// config.set_header_mapping("title", vec!["Article Name".to_string()]);
/// config.set_delimiter(b';');
/// ```
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Custom header mappings for CSV columns
    header_map: HashMap<String, Vec<String>>,
    /// Delimiter to use for parsing the CSV
    delimiter: u8,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvConfig {
    /// Creates a new CSV configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        let header_map = DEFAULT_HEADERS
            .iter()
            .map(|(field, aliases)| {
                (
                    field.to_string(),
                    aliases.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();
        Self {
            header_map,
            delimiter: b',',
        }
    }

    /// Sets a custom header mapping
    pub fn set_header_mapping(&mut self, field: &str, aliases: Vec<String>) -> &mut Self {
        self.header_map.insert(field.to_string(), aliases);
        self
    }

    /// Sets the delimiter character
    pub fn set_delimiter(&mut self, delimiter: u8) -> &mut Self {
        self.delimiter = delimiter;
        self
    }

    /// Finds the field name for a given header
    fn get_field_for_header(&self, header: &str) -> Option<&str> {
        let header_lower = header.trim().to_lowercase();
        self.header_map
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| a.to_lowercase() == header_lower))
            .map(|(field, _)| field.as_str())
    }
}

/// Parser for CSV-formatted article exports.
///
/// Rows become records keyed on the first author token and the year, e.g.
/// `Smith2023`, unless an id column is present. A missing author reads as
/// `Unknown` and a missing year as `Unknown Year`.
#[derive(Debug, Clone, Default)]
pub struct CsvParser {
    config: CsvConfig,
}

impl CsvParser {
    /// Creates a new CSV parser with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new CSV parser with custom configuration
    #[must_use]
    pub fn with_config(mut self, config: CsvConfig) -> Self {
        self.config = config;
        self
    }

    /// Parses `input`, keeping unreadable rows aside instead of failing.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidFormat`] if the header row cannot be read.
    pub fn parse(&self, input: &str) -> Result<ParseOutcome> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.config.delimiter)
            .flexible(true)
            .from_reader(input.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();

        let mut outcome = ParseOutcome::default();
        for (index, result) in reader.records().enumerate() {
            match result {
                Ok(row) => outcome.records.push(self.parse_record(&headers, &row)),
                Err(e) => {
                    let error = ClusterError::InvalidRecord {
                        index,
                        message: e.to_string(),
                    };
                    warn!("Skipping CSV row: {error}");
                    outcome.ignored.push(error);
                }
            }
        }
        Ok(outcome)
    }

    /// Parses a row into a Record using the current header mapping
    fn parse_record(&self, headers: &[String], row: &StringRecord) -> Record {
        let mut builder = Record::builder().entry_type("article");
        let mut id = None;

        for (header, value) in headers.iter().zip(row.iter()) {
            let value = value.trim();
            if value.is_empty() || PLACEHOLDERS.contains(&value) {
                continue;
            }
            match self.config.get_field_for_header(header) {
                Some("id") => id = Some(value.to_string()),
                Some(field) => builder = builder.field_if_absent(field, value),
                None => {}
            }
        }

        let record = builder.build();
        let author = if record.has_field("author") {
            record.author().to_string()
        } else {
            UNKNOWN.to_string()
        };
        let year = if record.has_field("year") {
            record.year().to_string()
        } else {
            UNKNOWN_YEAR.to_string()
        };
        let id = id.unwrap_or_else(|| {
            format!("{}{}", first_author_token(&author), year).replace(' ', "")
        });

        record
            .to_builder()
            .id(id)
            .field("author", author)
            .field("year", year)
            .build()
    }
}

impl RecordSource for CsvParser {
    fn records(&self, input: &str) -> Result<Vec<Record>> {
        Ok(self.parse(input)?.records)
    }
}
