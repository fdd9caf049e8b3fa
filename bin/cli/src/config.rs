use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use uniconnect_core::{
    community::DEFAULT_RESOLUTION, engine::DEFAULT_RECOMPUTE_TIMEOUT, similarity::DEFAULT_SIMILARITY_THRESHOLD,
    EngineConfig, LouvainConfig, SimilarityConfig,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(name = "uniconnect-cli")]
#[clap(about = "Compatibility graph analysis for student profile pools")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the graph for a pool file and print it as JSON
    Analyze(AnalyzeArgs),
    /// Score one pair of profiles from a pool file
    Score(ScoreArgs),
}

/// Scoring and partitioning knobs shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GraphArgs {
    /// JSON array of profiles
    #[clap(long, help = "Path to a JSON pool file")]
    pub pool: PathBuf,

    /// Minimum score for an edge
    #[clap(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD, help = "Similarity threshold (0.0-1.0)")]
    pub threshold: f64,

    /// Louvain resolution
    #[clap(long, default_value_t = DEFAULT_RESOLUTION, help = "Louvain resolution (> 0)")]
    pub resolution: f64,

    /// Recomputation bound in milliseconds
    #[clap(long, default_value_t = DEFAULT_RECOMPUTE_TIMEOUT.as_millis() as u64)]
    pub timeout_ms: u64,
}

impl GraphArgs {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_similarity(SimilarityConfig::default().with_threshold(self.threshold))
            .with_louvain(LouvainConfig::default().with_resolution(self.resolution))
            .with_recompute_timeout(Duration::from_millis(self.timeout_ms))
    }
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[clap(flatten)]
    pub graph: GraphArgs,

    /// Restrict the output to one profile and its neighbors
    #[clap(long, help = "Profile id for an ego view")]
    pub ego: Option<String>,

    /// Pretty-print the JSON output
    #[clap(long)]
    pub pretty: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    #[clap(flatten)]
    pub graph: GraphArgs,

    /// First profile id
    pub a: String,

    /// Second profile id
    pub b: String,
}
