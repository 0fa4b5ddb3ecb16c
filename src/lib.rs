//! A library for deduplicating bibliographic records and clustering article
//! abstracts by topic.
//!
//! `bibcluster` takes reference lists gathered from several databases, removes
//! duplicate entries, and groups the remaining articles by the wording of their
//! abstracts using TF-IDF cosine distances and agglomerative clustering.
//!
//! # Key Features
//!
//! - **Record Sources**: Read references from:
//!   - BibTeX
//!   - CSV library exports with configurable mappings
//!   - The JSON record artifact
//!
//! - **Deduplication**:
//!   - DOI-based identity with a title and author fallback
//!   - First occurrence wins, input order preserved
//!   - Pluggable key derivation
//!
//! - **Clustering**:
//!   - Text normalization and TF-IDF weighting with English stop words
//!   - Average and Ward linkage over cosine distances
//!   - Deterministic tie-breaking
//!   - Dendrogram layout with threshold-based color groups
//!
//! # Basic Usage
//!
//! ```rust
//! use bibcluster::{BibtexParser, RecordSource};
//!
//! let input = r#"@article{wing2006,
//!   title = {Computational Thinking},
//!   author = {Wing, Jeannette M.},
//!   abstract = {It represents a universally applicable attitude and skill set.}
//! }"#;
//!
//! let records = BibtexParser::new().records(input).unwrap();
//! println!("Title: {}", records[0].title());
//! ```
//!
//! # Clustering
//!
//! ```rust
//! use bibcluster::{Corpus, Linkage};
//! use bibcluster::linkage::cluster;
//! use bibcluster::similarity::{distance_matrix, SimilarityConfig};
//!
//! let corpus = Corpus::from_texts([
//!     ("a", "Deep learning for image classification."),
//!     ("b", "Deep learning for image classification!"),
//!     ("c", "Quantum computing error correction."),
//! ]);
//! let distances = distance_matrix(&corpus, &SimilarityConfig::default()).unwrap();
//! let tree = cluster(&distances, Linkage::Average).unwrap();
//!
//! let first = tree.merges()[0];
//! assert_eq!((first.left, first.right, first.height), (0, 1, 0.0));
//! ```
//!
//! # Error Handling
//!
//! The library uses a custom [`Result`] type that wraps [`ClusterError`] for consistent
//! error handling across all operations:
//!
//! ```rust
//! use bibcluster::{ClusterError, Corpus};
//! use bibcluster::similarity::{distance_matrix, SimilarityConfig};
//!
//! let corpus = Corpus::from_texts([("only", "a single abstract")]);
//! match distance_matrix(&corpus, &SimilarityConfig::default()) {
//!     Ok(_) => unreachable!(),
//!     Err(ClusterError::InsufficientData { documents, .. }) => assert_eq!(documents, 1),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```
//!
//! # Thread Safety
//!
//! Every stage is a pure function of its inputs. With the `parallel` feature
//! the distance matrix rows are computed on the rayon thread pool when
//! `run_in_parallel` is set.

#[cfg(feature = "bibtex")]
pub mod bibtex;
#[cfg(feature = "csv")]
pub mod csv;
pub mod dedupe;
pub mod dendrogram;
mod error;
#[cfg(feature = "json")]
pub mod json;
pub mod linkage;
pub mod normalize;
pub mod pipeline;
mod record;
mod regex;
pub mod similarity;
pub mod stopwords;
mod utils;

// Reexports
#[cfg(feature = "bibtex")]
pub use bibtex::{BibtexParser, write_bibtex};
#[cfg(feature = "csv")]
pub use csv::CsvParser;
pub use dedupe::{DedupeOutcome, Deduplicator, DuplicateGroup};
pub use dendrogram::Dendrogram;
pub use error::{ClusterError, Result};
#[cfg(feature = "json")]
pub use json::{JsonParser, write_json};
pub use linkage::{Linkage, MergeTree};
pub use normalize::{Corpus, normalize_text};
pub use pipeline::{Pipeline, PipelineConfig, PipelineReport};
pub use record::{KNOWN_FIELDS, ParseOutcome, Record, RecordBuilder, RecordSource, UNKNOWN};
pub use similarity::DistanceMatrix;
