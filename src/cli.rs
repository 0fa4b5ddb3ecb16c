use bibcluster::Linkage;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bibcluster")]
#[command(about = "Deduplicate reference lists and cluster article abstracts by topic")]
#[command(version)]
pub struct Cli {
    /// Logging level (DEBUG, INFO, WARN, ERROR)
    #[arg(short, long, global = true, default_value = "INFO")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge reference files and split them into unique and duplicated entries
    Unify(UnifyArgs),

    /// Convert a reference file into the JSON record artifact
    Ingest(IngestArgs),

    /// Cluster the abstracts of a record file and write one dendrogram per linkage
    Cluster(ClusterArgs),
}

#[derive(Args, Clone)]
pub struct UnifyArgs {
    /// Reference files (.bib, .csv or .json), read in order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory receiving unified_references.bib and duplicated_references.bib
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Compare normalized title/author and bare DOIs instead of the raw values
    #[arg(long)]
    pub normalized_keys: bool,
}

#[derive(Args, Clone)]
pub struct IngestArgs {
    /// Reference file to convert
    pub input: PathBuf,

    /// Output JSON file
    #[arg(short, long, default_value = "processed_articles.json")]
    pub output: PathBuf,
}

#[derive(Args, Clone)]
pub struct ClusterArgs {
    /// Record file (.json, .bib or .csv)
    pub input: PathBuf,

    /// Directory receiving dendrogram_<linkage>.json
    #[arg(short, long, default_value = "results")]
    pub results_dir: PathBuf,

    /// Pipeline configuration file (JSON); command-line flags take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum number of abstracts to cluster
    #[arg(long)]
    pub cap: Option<usize>,

    /// Linkage strategies, comma separated
    #[arg(long, value_delimiter = ',')]
    pub linkage: Option<Vec<Linkage>>,
}
