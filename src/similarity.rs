//! TF-IDF vectorization and cosine distance.
//!
//! Documents are tokenized into runs of two or more word characters, stop
//! words are dropped, and each document becomes a TF-IDF vector over the
//! corpus vocabulary:
//!
//! ```text
//! tfidf(t, d) = count(t, d) * (ln((1 + n) / (1 + df(t))) + 1)
//! ```
//!
//! Vectors are L2-normalized, so the cosine similarity of two documents is
//! their dot product and the distance is `1 - similarity`.
//!
//! # Example
//!
//! ```
//! use bibcluster::normalize::Corpus;
//! use bibcluster::similarity::{distance_matrix, SimilarityConfig};
//!
//! let corpus = Corpus::from_texts([
//!     ("a", "deep learning for image classification"),
//!     ("b", "deep learning for image classification"),
//!     ("c", "quantum computing error correction"),
//! ]);
//! let matrix = distance_matrix(&corpus, &SimilarityConfig::default()).unwrap();
//!
//! assert_eq!(matrix.get(0, 1), 0.0);
//! assert_eq!(matrix.get(0, 2), 1.0);
//! ```

use crate::normalize::Corpus;
use crate::stopwords::StopWords;
use crate::{ClusterError, Result};
use compact_str::CompactString;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Absolute tolerance used when checking symmetry.
pub const SYMMETRY_TOLERANCE: f64 = 1e-12;

/// Options for the similarity stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub stop_words: StopWords,
    /// Compute matrix rows on the rayon pool. Only honoured with the
    /// `parallel` feature; results are identical either way.
    pub run_in_parallel: bool,
}

/// A sparse, L2-normalized document vector: `(term index, weight)` sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

/// The fitted vocabulary and the document vectors.
#[derive(Debug, Clone)]
pub struct TfidfMatrix {
    vocabulary: Vec<CompactString>,
    idf: Vec<f64>,
    rows: Vec<SparseVector>,
}

impl TfidfMatrix {
    pub fn vocabulary(&self) -> &[CompactString] {
        &self.vocabulary
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn rows(&self) -> &[SparseVector] {
        &self.rows
    }

    /// Cosine similarity of two documents, clamped to `[0, 1]`.
    pub fn cosine(&self, i: usize, j: usize) -> f64 {
        let (a, b) = (&self.rows[i], &self.rows[j]);
        if a == b && !a.is_empty() {
            return 1.0;
        }
        sparse_dot(a, b).clamp(0.0, 1.0)
    }
}

fn sparse_dot(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let (mut i, mut j, mut sum) = (0, 0, 0.0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

/// Fits a vocabulary on a set of documents and weights them by TF-IDF.
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    stop_words: StopWords,
}

impl TfidfVectorizer {
    #[must_use]
    pub fn new(stop_words: StopWords) -> Self {
        Self { stop_words }
    }

    /// Splits a document into its vocabulary terms, stop words removed.
    pub fn tokenize(&self, document: &str) -> Vec<CompactString> {
        let stop_words = self.stop_words.to_set();
        tokenize_with(document, |t| stop_words.contains(t))
    }

    /// Learns the vocabulary of `documents` and returns their TF-IDF vectors.
    ///
    /// # Errors
    ///
    /// [`ClusterError::InsufficientData`] when every document reduces to
    /// nothing once stop words are removed.
    pub fn fit_transform(&self, documents: &[String]) -> Result<TfidfMatrix> {
        let stop_words = self.stop_words.to_set();
        let counts: Vec<HashMap<CompactString, usize>> = documents
            .iter()
            .map(|doc| {
                let mut counts = HashMap::new();
                for token in tokenize_with(doc, |t| stop_words.contains(t)) {
                    *counts.entry(token).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut document_frequency: BTreeMap<CompactString, usize> = BTreeMap::new();
        for doc in &counts {
            for term in doc.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(ClusterError::insufficient(
                documents.len(),
                "empty vocabulary; every document contains only stop words",
            ));
        }

        let n = documents.len() as f64;
        let index: HashMap<&CompactString, usize> = document_frequency
            .keys()
            .enumerate()
            .map(|(i, term)| (term, i))
            .collect();
        let idf: Vec<f64> = document_frequency
            .values()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let rows = counts
            .iter()
            .map(|doc| {
                let mut row: SparseVector = doc
                    .iter()
                    .map(|(term, &count)| {
                        let i = index[term];
                        (i, count as f64 * idf[i])
                    })
                    .collect();
                row.sort_unstable_by_key(|&(i, _)| i);
                let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.iter_mut().for_each(|(_, w)| *w /= norm);
                }
                row
            })
            .collect();

        Ok(TfidfMatrix {
            vocabulary: document_frequency.into_keys().collect(),
            idf,
            rows,
        })
    }
}

fn tokenize_with(document: &str, is_stop_word: impl Fn(&str) -> bool) -> Vec<CompactString> {
    document
        .split(|c: char| !is_word_char(c))
        .filter(|token| token.chars().nth(1).is_some())
        .filter(|token| !is_stop_word(token))
        .map(CompactString::from)
        .collect()
}

/// Unicode letters, digits and the underscore.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A square, symmetric matrix of pairwise distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    size: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Builds a matrix from explicit rows.
    ///
    /// # Errors
    ///
    /// [`ClusterError::InvalidLinkageInput`] when the rows do not form a square matrix.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let size = rows.len();
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != size) {
            return Err(ClusterError::InvalidLinkageInput {
                reason: format!("row has {} entries, expected {size}", r.len()),
                row,
                col: r.len(),
                value: f64::NAN,
            });
        }
        Ok(Self {
            size,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// An all-zero `size` × `size` matrix.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            data: vec![0.0; size * size],
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.size + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.size + j] = value;
        self.data[j * self.size + i] = value;
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.size..(i + 1) * self.size]
    }

    /// Checks the matrix is usable as linkage input: finite, non-negative,
    /// zero on the diagonal and symmetric.
    ///
    /// # Errors
    ///
    /// [`ClusterError::InvalidLinkageInput`] naming the first offending entry.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str, row, col, value| ClusterError::InvalidLinkageInput {
            reason: reason.to_string(),
            row,
            col,
            value,
        };
        for i in 0..self.size {
            let diagonal = self.get(i, i);
            if diagonal != 0.0 {
                return Err(invalid("non-zero diagonal", i, i, diagonal));
            }
            for j in (i + 1)..self.size {
                let (upper, lower) = (self.get(i, j), self.get(j, i));
                if !upper.is_finite() || upper < 0.0 {
                    return Err(invalid("distance must be finite and non-negative", i, j, upper));
                }
                if !lower.is_finite() || (upper - lower).abs() > SYMMETRY_TOLERANCE {
                    return Err(invalid("matrix is not symmetric", j, i, lower));
                }
            }
        }
        Ok(())
    }
}

/// Computes the pairwise cosine distance matrix of a corpus.
///
/// # Errors
///
/// [`ClusterError::InsufficientData`] when the corpus holds fewer than two
/// documents or its vocabulary is empty after stop-word removal.
pub fn distance_matrix(corpus: &Corpus, config: &SimilarityConfig) -> Result<DistanceMatrix> {
    let documents = corpus.documents();
    if documents.len() < 2 {
        return Err(ClusterError::insufficient(
            documents.len(),
            "clustering needs at least 2 documents",
        ));
    }

    let tfidf = TfidfVectorizer::new(config.stop_words.clone()).fit_transform(documents)?;
    info!(
        "Vectorized {} documents over {} terms",
        documents.len(),
        tfidf.vocabulary().len()
    );

    let size = documents.len();
    let distance_row = |i: usize| -> Vec<f64> {
        (0..size)
            .map(|j| if i == j { 0.0 } else { 1.0 - tfidf.cosine(i, j) })
            .collect()
    };

    #[cfg(feature = "parallel")]
    let rows: Vec<Vec<f64>> = if config.run_in_parallel {
        use rayon::prelude::*;
        (0..size).into_par_iter().map(distance_row).collect()
    } else {
        (0..size).map(distance_row).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Vec<f64>> = (0..size).map(distance_row).collect();

    DistanceMatrix::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn corpus(texts: &[&str]) -> Corpus {
        Corpus::from_texts(texts.iter().enumerate().map(|(i, t)| (i.to_string(), *t)))
    }

    #[test]
    fn test_tokenize_drops_stop_words_and_short_tokens() {
        let vectorizer = TfidfVectorizer::default();
        assert_eq!(
            vectorizer.tokenize("a study of x ray imaging in the lab"),
            vec!["study", "ray", "imaging", "lab"]
        );
    }

    #[test]
    fn test_tokenize_keeps_non_ascii_letters() {
        let vectorizer = TfidfVectorizer::default();
        assert_eq!(
            vectorizer.tokenize("über ähnlichkeit étude"),
            vec!["über", "ähnlichkeit", "étude"]
        );
        assert_eq!(
            vectorizer.tokenize("量子 计算 x_ray a\u{00A0}b naïve-bayes"),
            vec!["量子", "计算", "x_ray", "naïve", "bayes"]
        );
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_rows_match_sequential() {
        let corpus = corpus(&[
            "computational thinking in primary schools",
            "abstraction as a computational thinking skill",
            "teaching abstraction with robots",
            "quantum error correction codes",
            "surface codes for quantum error correction",
            "the and of",
        ]);
        let sequential = distance_matrix(&corpus, &SimilarityConfig::default()).unwrap();
        let parallel = distance_matrix(
            &corpus,
            &SimilarityConfig {
                run_in_parallel: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_idf_is_smoothed() {
        let docs = vec!["alpha beta".to_string(), "alpha gamma".to_string()];
        let tfidf = TfidfVectorizer::default().fit_transform(&docs).unwrap();
        assert_eq!(tfidf.vocabulary(), &["alpha", "beta", "gamma"]);
        assert!((tfidf.idf()[0] - 1.0).abs() < 1e-12);
        assert!((tfidf.idf()[1] - ((3.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_rows_are_unit_length() {
        let docs = vec![
            "graph neural networks".to_string(),
            "graph theory proofs graph".to_string(),
        ];
        let tfidf = TfidfVectorizer::default().fit_transform(&docs).unwrap();
        for row in tfidf.rows() {
            let norm: f64 = row.iter().map(|(_, w)| w * w).sum();
            assert!((norm - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_matrix_is_symmetric_with_zero_diagonal() {
        let matrix = distance_matrix(
            &corpus(&[
                "computational thinking in primary schools",
                "abstraction as a computational thinking skill",
                "teaching abstraction with robots",
                "quantum error correction codes",
            ]),
            &SimilarityConfig::default(),
        )
        .unwrap();

        assert_eq!(matrix.len(), 4);
        for i in 0..4 {
            assert_eq!(matrix.get(i, i), 0.0);
            for j in 0..4 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
                assert!((0.0..=1.0).contains(&matrix.get(i, j)));
            }
        }
        assert!(matrix.validate().is_ok());
        assert!(matrix.get(0, 1) < matrix.get(0, 3));
    }

    #[test]
    fn test_identical_documents_have_zero_distance() {
        let matrix = distance_matrix(
            &corpus(&[
                "deep learning for image classification",
                "deep learning for image classification",
                "quantum computing error correction",
            ]),
            &SimilarityConfig::default(),
        )
        .unwrap();
        assert_eq!(matrix.get(0, 1), 0.0);
        assert_eq!(matrix.get(0, 2), 1.0);
        assert_eq!(matrix.get(1, 2), 1.0);
    }

    #[test]
    fn test_single_document_is_insufficient() {
        let result = distance_matrix(&corpus(&["only one"]), &SimilarityConfig::default());
        assert!(matches!(
            result,
            Err(ClusterError::InsufficientData { documents: 1, .. })
        ));
    }

    #[test]
    fn test_stop_word_only_corpus_is_insufficient() {
        let result = distance_matrix(
            &corpus(&["the and of", "it is what it is"]),
            &SimilarityConfig::default(),
        );
        assert!(matches!(
            result,
            Err(ClusterError::InsufficientData { documents: 2, .. })
        ));
    }

    #[test]
    fn test_stop_word_only_document_is_maximally_distant() {
        let matrix = distance_matrix(
            &corpus(&["the and of", "robots teaching"]),
            &SimilarityConfig::default(),
        )
        .unwrap();
        assert_eq!(matrix.get(0, 0), 0.0);
        assert_eq!(matrix.get(0, 1), 1.0);
    }

    #[test]
    fn test_validate_reports_offending_entry() {
        let matrix =
            DistanceMatrix::from_rows(vec![vec![0.0, 0.2], vec![0.3, 0.0]]).unwrap();
        match matrix.validate() {
            Err(ClusterError::InvalidLinkageInput { row, col, .. }) => {
                assert_eq!((row, col), (1, 0));
            }
            other => panic!("unexpected {other:?}"),
        }

        let matrix =
            DistanceMatrix::from_rows(vec![vec![0.1, 0.2], vec![0.2, 0.0]]).unwrap();
        assert!(matches!(
            matrix.validate(),
            Err(ClusterError::InvalidLinkageInput { row: 0, col: 0, .. })
        ));

        assert!(DistanceMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0]]).is_err());
    }
}
