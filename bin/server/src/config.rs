use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uniconnect_core::{
    community::DEFAULT_RESOLUTION, engine::DEFAULT_RECOMPUTE_TIMEOUT, similarity::DEFAULT_SIMILARITY_THRESHOLD,
    EngineConfig, LouvainConfig, SimilarityConfig, SimilarityWeights,
};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server host
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Minimum score for an edge
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f64,

    /// Louvain resolution
    #[serde(default = "default_resolution")]
    pub resolution: f64,

    /// Upper bound for one recomputation, in milliseconds
    #[serde(default = "default_recompute_timeout_ms")]
    pub recompute_timeout_ms: u64,

    /// JSON pool loaded at startup (optional)
    #[serde(default)]
    pub seed_file: Option<PathBuf>,

    /// Per-dimension similarity weights
    #[serde(default)]
    pub weights: SimilarityWeights,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_resolution() -> f64 {
    DEFAULT_RESOLUTION
}

fn default_recompute_timeout_ms() -> u64 {
    DEFAULT_RECOMPUTE_TIMEOUT.as_millis() as u64
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            similarity_threshold: default_threshold(),
            resolution: default_resolution(),
            recompute_timeout_ms: default_recompute_timeout_ms(),
            seed_file: None,
            weights: SimilarityWeights::default(),
        }
    }
}

impl Settings {
    /// Load settings from `.env` and `UNICONNECT_*` environment variables.
    /// Nested weights use a double underscore, e.g. `UNICONNECT_WEIGHTS__COURSE`.
    pub fn load() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("UNICONNECT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    /// Get the server address as a string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Engine configuration derived from these settings
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_similarity(
                SimilarityConfig::default()
                    .with_weights(self.weights.clone())
                    .with_threshold(self.similarity_threshold),
            )
            .with_louvain(LouvainConfig::default().with_resolution(self.resolution))
            .with_recompute_timeout(Duration::from_millis(self.recompute_timeout_ms))
    }
}
