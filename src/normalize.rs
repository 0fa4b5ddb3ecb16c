//! Abstract normalization and corpus construction.
//!
//! [`normalize_text`] canonicalizes free text: lower-case, ASCII punctuation
//! replaced by a space, whitespace runs collapsed and the ends trimmed.
//! [`Corpus::from_records`] applies it to every abstract and keeps the
//! documents that still carry text, index-aligned with their record ids.

use crate::Record;
use crate::regex::Regex;
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static PUNCTUATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[[:punct:]]").unwrap());

/// Normalizes a free-text string.
///
/// Never fails, whatever the script of the input. Applying it twice gives the
/// same result as applying it once.
///
/// ```
/// use bibcluster::normalize::normalize_text;
///
/// assert_eq!(
///     normalize_text("  Deep-Learning, for IMAGE classification!  "),
///     "deep learning for image classification"
/// );
/// assert_eq!(normalize_text(" \t\n"), "");
/// ```
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let spaced = PUNCTUATION_REGEX.replace_all(&lowered, " ");
    // Unicode whitespace, independent of the regex engine
    spaced.split_whitespace().join(" ")
}

/// Builds the clustering corpus from the abstracts of `records`.
///
/// Shorthand for [`Corpus::from_records`].
pub fn normalize_abstracts(records: &[Record]) -> Corpus {
    Corpus::from_records(records)
}

/// Ordered documents with the ids of the records they came from.
///
/// Document `i` is row and column `i` of the distance matrix and leaf `i` of
/// the merge tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    documents: Vec<String>,
    record_ids: Vec<String>,
}

impl Corpus {
    /// Builds a corpus from `(record id, raw text)` pairs.
    ///
    /// Texts are normalized; those that normalize to nothing are left out.
    pub fn from_texts<I, S, T>(texts: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: AsRef<str>,
    {
        let mut corpus = Corpus::default();
        for (id, text) in texts {
            let id = id.into();
            let normalized = normalize_text(text.as_ref());
            if normalized.is_empty() {
                debug!("Excluding record {id}: abstract is empty after normalization");
                continue;
            }
            corpus.documents.push(normalized);
            corpus.record_ids.push(id);
        }
        corpus
    }

    /// Builds a corpus from record abstracts.
    ///
    /// Records without an abstract (missing, blank or the `Unknown` sentinel)
    /// cannot be vectorized and are excluded.
    pub fn from_records(records: &[Record]) -> Self {
        let with_abstract = records.iter().filter(|record| {
            let keep = record.has_field("abstract");
            if !keep {
                debug!("Excluding record {}: no abstract", record.id());
            }
            keep
        });
        Self::from_texts(with_abstract.map(|r| (r.id(), r.abstract_text())))
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn record_ids(&self) -> &[String] {
        &self.record_ids
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Keeps the first `cap` documents and returns how many were dropped.
    ///
    /// Truncation is always logged.
    pub fn truncate(&mut self, cap: usize) -> usize {
        let total = self.documents.len();
        if total <= cap {
            return 0;
        }
        warn!("Found {total} abstracts, only the first {cap} will be clustered");
        self.documents.truncate(cap);
        self.record_ids.truncate(cap);
        total - cap
    }
}
