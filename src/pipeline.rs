//! End-to-end clustering run.
//!
//! ```text
//! records → dedupe → abstracts → corpus (capped) → distance matrix
//!         → merge tree per linkage → dendrogram per linkage
//! ```
//!
//! Every run is independent: nothing is cached between calls.
//!
//! # Example
//!
//! ```
//! use bibcluster::pipeline::{Pipeline, PipelineConfig};
//! use bibcluster::Record;
//!
//! let records: Vec<Record> = [
//!     "Deep learning for image classification.",
//!     "Deep learning for image classification.",
//!     "Quantum computing error correction.",
//! ]
//! .iter()
//! .enumerate()
//! .map(|(i, text)| {
//!     Record::builder()
//!         .id(format!("r{i}"))
//!         .field("title", format!("Paper {i}"))
//!         .field("abstract", *text)
//!         .build()
//! })
//! .collect();
//!
//! let report = Pipeline::new().run(&records).unwrap();
//! assert_eq!(report.dedupe.duplicates.len(), 0);
//! assert_eq!(report.clustering.results.len(), 2);
//! assert_eq!(
//!     report.clustering.results[0].dendrogram.title,
//!     "Dendrogram - Average Linkage"
//! );
//! ```

use crate::dedupe::{DedupeOutcome, Deduplicator, DeduplicatorConfig};
use crate::dendrogram::{Dendrogram, DendrogramConfig};
use crate::linkage::{Linkage, MergeTree, cluster};
use crate::normalize::{Corpus, normalize_abstracts};
use crate::similarity::{DistanceMatrix, SimilarityConfig, distance_matrix};
use crate::{ClusterError, Record, Result};
use log::info;
use serde::{Deserialize, Serialize};

/// Default upper bound on the number of clustered documents.
pub const DEFAULT_CORPUS_CAP: usize = 100;

/// Configuration of a pipeline run.
///
/// Deserializable from JSON; missing keys take their defaults.
///
/// ```
/// use bibcluster::pipeline::PipelineConfig;
///
/// let config: PipelineConfig = serde_json::from_str(r#"{"corpus_cap": 50, "linkages": ["ward"]}"#).unwrap();
/// assert_eq!(config.corpus_cap, 50);
/// assert_eq!(config.dendrogram.color_threshold_ratio, 0.6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Documents beyond this count are dropped, keeping input order.
    pub corpus_cap: usize,
    /// Strategies to run, in output order.
    pub linkages: Vec<Linkage>,
    pub similarity: SimilarityConfig,
    pub dendrogram: DendrogramConfig,
    pub dedupe: DeduplicatorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            corpus_cap: DEFAULT_CORPUS_CAP,
            linkages: vec![Linkage::Average, Linkage::Ward],
            similarity: SimilarityConfig::default(),
            dendrogram: DendrogramConfig::default(),
            dedupe: DeduplicatorConfig::default(),
        }
    }
}

/// Result of one linkage strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringOutput {
    pub linkage: Linkage,
    pub tree: MergeTree,
    pub dendrogram: Dendrogram,
}

/// Everything derived from one corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusClustering {
    /// The corpus after the cap was applied.
    pub corpus: Corpus,
    /// Documents dropped by the corpus cap.
    pub truncated: usize,
    pub distances: DistanceMatrix,
    /// One entry per configured linkage, in configuration order.
    pub results: Vec<ClusteringOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub dedupe: DedupeOutcome,
    pub clustering: CorpusClustering,
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Deduplicates `records` and clusters the abstracts of the unique ones.
    ///
    /// # Errors
    ///
    /// - [`ClusterError::Config`] when the cap is zero or no linkage is requested.
    /// - [`ClusterError::InsufficientData`] when fewer than two usable abstracts
    ///   remain or their vocabulary is empty.
    pub fn run(&self, records: &[Record]) -> Result<PipelineReport> {
        info!("Total number of records: {}", records.len());
        let dedupe = Deduplicator::new()
            .with_config(self.config.dedupe.clone())
            .partition(records);
        let clustering = self.cluster_corpus(normalize_abstracts(&dedupe.unique))?;
        Ok(PipelineReport { dedupe, clustering })
    }

    /// Clusters an already assembled corpus, skipping deduplication.
    ///
    /// # Errors
    ///
    /// Same as [`Pipeline::run`].
    pub fn cluster_corpus(&self, mut corpus: Corpus) -> Result<CorpusClustering> {
        if self.config.corpus_cap == 0 {
            return Err(ClusterError::Config("corpus cap must be positive".to_string()));
        }
        if self.config.linkages.is_empty() {
            return Err(ClusterError::Config(
                "at least one linkage strategy is required".to_string(),
            ));
        }

        info!("Usable abstracts: {}", corpus.len());
        let truncated = corpus.truncate(self.config.corpus_cap);
        let distances = distance_matrix(&corpus, &self.config.similarity)?;

        let results = self
            .config
            .linkages
            .iter()
            .map(|&linkage| {
                let tree = cluster(&distances, linkage)?;
                let title = format!("Dendrogram - {} Linkage", linkage.display_name());
                let dendrogram =
                    Dendrogram::build(&tree, corpus.documents(), title, self.config.dendrogram)?;
                info!(
                    "{linkage} linkage: {} merges, max height {:.4}, {} groups",
                    tree.merges().len(),
                    tree.max_height(),
                    dendrogram.group_count()
                );
                Ok(ClusteringOutput {
                    linkage,
                    tree,
                    dendrogram,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CorpusClustering {
            corpus,
            truncated,
            distances,
            results,
        })
    }
}
