use anyhow::{Context, Result, bail};
use bibcluster::dedupe::{Deduplicator, DeduplicatorConfig, KeyStrategy};
use bibcluster::{
    BibtexParser, ClusterError, CsvParser, JsonParser, Pipeline, PipelineConfig, Record,
    RecordSource, write_bibtex, write_json,
};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cli::{ClusterArgs, IngestArgs, UnifyArgs};

pub const UNIFIED_FILE: &str = "unified_references.bib";
pub const DUPLICATED_FILE: &str = "duplicated_references.bib";

fn read_file(path: &Path) -> bibcluster::Result<String> {
    fs::read_to_string(path).map_err(|e| ClusterError::io(path, e))
}

fn write_file(path: &Path, contents: &str) -> bibcluster::Result<()> {
    fs::write(path, contents).map_err(|e| ClusterError::io(path, e))
}

fn create_dir(path: &Path) -> bibcluster::Result<()> {
    fs::create_dir_all(path).map_err(|e| ClusterError::io(path, e))
}

/// Reads every record of `path`, picking the reader from the file extension.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let source: Box<dyn RecordSource> = match extension.as_str() {
        "bib" | "bibtex" => Box::new(BibtexParser::new()),
        "csv" => Box::new(CsvParser::new()),
        "json" => Box::new(JsonParser::new()),
        other => bail!(
            "Unsupported file type '{other}' for {}: expected .bib, .csv or .json",
            path.display()
        ),
    };
    let input = read_file(path)?;
    let records = source
        .records(&input)
        .with_context(|| format!("Failed to read records from {}", path.display()))?;
    info!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Paths written by a unify run.
#[derive(Debug)]
pub struct UnifyOutput {
    pub unified: PathBuf,
    pub duplicated: Option<PathBuf>,
}

pub fn run_unify(args: UnifyArgs) -> Result<UnifyOutput> {
    let start_time = Instant::now();

    let mut records = Vec::new();
    for input in &args.inputs {
        records.extend(load_records(input)?);
    }

    let key_strategy = if args.normalized_keys {
        KeyStrategy::Normalized
    } else {
        KeyStrategy::Verbatim
    };
    let outcome = Deduplicator::new()
        .with_config(DeduplicatorConfig { key_strategy })
        .partition(&records);

    create_dir(&args.out_dir)?;
    let unified = args.out_dir.join(UNIFIED_FILE);
    write_file(&unified, &write_bibtex(&outcome.unique))?;
    info!(
        "Unified {} references into {}",
        outcome.unique.len(),
        unified.display()
    );

    let duplicated = if outcome.duplicates.is_empty() {
        info!("No duplicated references found");
        None
    } else {
        let path = args.out_dir.join(DUPLICATED_FILE);
        write_file(&path, &write_bibtex(&outcome.duplicates))?;
        info!(
            "Wrote {} duplicated references to {}",
            outcome.duplicates.len(),
            path.display()
        );
        Some(path)
    };

    info!("Unify finished in {:.2?}", start_time.elapsed());
    Ok(UnifyOutput {
        unified,
        duplicated,
    })
}

pub fn run_ingest(args: IngestArgs) -> Result<PathBuf> {
    let records = load_records(&args.input)?;
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir(parent)?;
    }
    write_file(&args.output, &write_json(&records)?)?;
    info!(
        "Wrote {} records to {}",
        records.len(),
        args.output.display()
    );
    Ok(args.output)
}

fn load_config(args: &ClusterArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&read_file(path)?)
            .with_context(|| format!("Invalid pipeline configuration in {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(cap) = args.cap {
        config.corpus_cap = cap;
    }
    if let Some(linkages) = &args.linkage {
        config.linkages = linkages.clone();
    }
    Ok(config)
}

/// Clusters the abstracts of `args.input` and returns the dendrogram files written.
pub fn run_cluster(args: ClusterArgs) -> Result<Vec<PathBuf>> {
    let start_time = Instant::now();
    let config = load_config(&args)?;
    let records = load_records(&args.input)?;

    let report = Pipeline::new().with_config(config).run(&records)?;

    create_dir(&args.results_dir)?;
    let mut written = Vec::with_capacity(report.clustering.results.len());
    for output in &report.clustering.results {
        let path = args
            .results_dir
            .join(format!("dendrogram_{}.json", output.linkage));
        let json = serde_json::to_string_pretty(output).map_err(ClusterError::from)?;
        write_file(&path, &json)?;
        info!("{} saved to {}", output.dendrogram.title, path.display());
        written.push(path);
    }

    info!("Clustering finished in {:.2?}", start_time.elapsed());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bibcluster::pipeline::ClusteringOutput;
    use bibcluster::Linkage;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    const BIB: &str = r#"@article{a1,
  title = {Teaching abstraction},
  author = {Smith, J.},
  doi = {10.1000/a1},
  abstract = {Deep learning for image classification.}
}
@article{a2,
  title = {Robots in class},
  author = {Doe, A.},
  abstract = {Deep learning for image classification!}
}
@article{a3,
  title = {Quantum},
  author = {Roe, B.},
  abstract = {Quantum computing error correction.}
}
"#;

    #[test]
    fn test_unify_splits_duplicates() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("acm.bib");
        let second = dir.path().join("ieee.csv");
        fs::write(&first, BIB).unwrap();
        fs::write(
            &second,
            "Article title,Authors,Volume year,DOI\nTeaching Abstraction,Smith J,2021,10.1000/a1\nNew Paper,Lee K,2022,No DOI\n",
        )
        .unwrap();

        let output = run_unify(UnifyArgs {
            inputs: vec![first, second],
            out_dir: dir.path().join("out"),
            normalized_keys: false,
        })
        .unwrap();

        let unified = BibtexParser::new()
            .records(&fs::read_to_string(&output.unified).unwrap())
            .unwrap();
        let ids: Vec<&str> = unified.iter().map(Record::id).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3", "Lee2022"]);

        let duplicated = BibtexParser::new()
            .records(&fs::read_to_string(output.duplicated.unwrap()).unwrap())
            .unwrap();
        assert_eq!(duplicated.len(), 1);
        assert_eq!(duplicated[0].id(), "Smith2021");
    }

    #[test]
    fn test_unify_without_duplicates_writes_one_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("refs.bib");
        fs::write(&input, BIB).unwrap();

        let output = run_unify(UnifyArgs {
            inputs: vec![input],
            out_dir: dir.path().to_path_buf(),
            normalized_keys: true,
        })
        .unwrap();
        assert!(output.duplicated.is_none());
        assert!(!dir.path().join(DUPLICATED_FILE).exists());
    }

    #[test]
    fn test_ingest_then_cluster() {
        let dir = tempdir().unwrap();
        let bib = dir.path().join("unified_references.bib");
        fs::write(&bib, BIB).unwrap();

        let json = run_ingest(IngestArgs {
            input: bib,
            output: dir.path().join("processed_articles.json"),
        })
        .unwrap();

        let written = run_cluster(ClusterArgs {
            input: json,
            results_dir: dir.path().join("results"),
            config: None,
            cap: None,
            linkage: None,
        })
        .unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("results/dendrogram_average.json"),
                dir.path().join("results/dendrogram_ward.json"),
            ]
        );

        let output: ClusteringOutput =
            serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert_eq!(output.linkage, Linkage::Average);
        let first = output.tree.merges()[0];
        assert_eq!((first.left, first.right), (0, 1));
        assert_eq!(output.dendrogram.leaves.len(), 3);
    }

    #[test]
    fn test_cluster_flags_override_config_file() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("config.json");
        fs::write(&config, r#"{"corpus_cap": 50, "linkages": ["average"]}"#).unwrap();

        let args = ClusterArgs {
            input: dir.path().join("unused.json"),
            results_dir: dir.path().to_path_buf(),
            config: Some(config),
            cap: Some(10),
            linkage: None,
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.corpus_cap, 10);
        assert_eq!(config.linkages, vec![Linkage::Average]);
    }

    #[test]
    fn test_missing_input_reports_path() {
        let error = load_records(Path::new("does/not/exist.bib")).unwrap_err();
        let io = error.downcast_ref::<ClusterError>().unwrap();
        assert!(matches!(io, ClusterError::ResourceIo { path, .. } if path.ends_with("exist.bib")));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(load_records(Path::new("refs.ris")).is_err());
    }
}
