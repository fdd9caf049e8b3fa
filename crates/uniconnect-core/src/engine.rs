/*
Copyright 2024, Zep Software, Inc.

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Engine orchestrator: store update, recomputation, snapshot publication.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::{
    cancel::CancellationToken,
    centrality::analyze,
    community::{Louvain, LouvainConfig},
    errors::{ConnectError, ConnectResult},
    graph::build_graph,
    profile::{Profile, ProfileId},
    responder::GraphResponse,
    similarity::SimilarityConfig,
    store::{MemoryProfileStore, ProfileStore},
};

pub const DEFAULT_RECOMPUTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub similarity: SimilarityConfig,
    pub louvain: LouvainConfig,
    /// Upper bound for one recomputation.
    pub recompute_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity: SimilarityConfig::default(),
            louvain: LouvainConfig::default(),
            recompute_timeout: DEFAULT_RECOMPUTE_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_similarity(mut self, similarity: SimilarityConfig) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn with_louvain(mut self, louvain: LouvainConfig) -> Self {
        self.louvain = louvain;
        self
    }

    pub fn with_recompute_timeout(mut self, timeout: Duration) -> Self {
        self.recompute_timeout = timeout;
        self
    }

    pub fn validate(&self) -> ConnectResult<()> {
        self.similarity.validate()?;
        self.louvain.validate()
    }
}

/// Result of one completed recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Increases by one per published snapshot.
    pub generation: u64,
    pub computed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub graph: GraphResponse,
}

/// Score, build, partition, rank and format in one pass. Pure function of
/// the pool and the configuration.
pub fn compute_graph(pool: &[Profile], config: &EngineConfig, cancel: &CancellationToken) -> ConnectResult<GraphResponse> {
    let graph = build_graph(pool, &config.similarity, cancel)?;
    let detection = Louvain::new(config.louvain.clone()).detect(&graph, cancel)?;
    let centrality = analyze(&graph, cancel)?;
    GraphResponse::assemble(&graph, &detection, &centrality)
}

/// Owns the pool and the last published snapshot. Submissions and resets
/// are serialized; snapshot reads never wait for a recomputation.
pub struct CompatibilityEngine {
    store: Arc<dyn ProfileStore>,
    config: EngineConfig,
    writer: Mutex<()>,
    snapshot: RwLock<Arc<GraphSnapshot>>,
}

impl CompatibilityEngine {
    /// Create an engine over `store` and compute the initial snapshot.
    pub async fn new(config: EngineConfig, store: Arc<dyn ProfileStore>) -> ConnectResult<Self> {
        config.validate()?;

        let pool = store.list().await?;
        let pool_size = pool.len();
        let graph = if pool.is_empty() {
            GraphResponse::empty()
        } else {
            recompute(pool, &config).await?
        };
        info!(
            profiles = pool_size,
            edges = graph.stats.edge_count,
            "Compatibility engine initialized"
        );

        Ok(Self {
            store,
            config,
            writer: Mutex::new(()),
            snapshot: RwLock::new(Arc::new(GraphSnapshot {
                generation: 0,
                computed_at: Utc::now(),
                graph,
            })),
        })
    }

    /// Engine over an empty in-memory pool.
    pub async fn in_memory(config: EngineConfig) -> ConnectResult<Self> {
        Self::new(config, Arc::new(MemoryProfileStore::new())).await
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Last completed snapshot.
    pub async fn snapshot(&self) -> Arc<GraphSnapshot> {
        self.snapshot.read().await.clone()
    }

    pub async fn profile(&self, id: &ProfileId) -> ConnectResult<Profile> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ConnectError::ProfileNotFound { id: id.clone() })
    }

    pub async fn pool_size(&self) -> ConnectResult<usize> {
        self.store.count().await
    }

    /// Ego view of the last snapshot around `id`.
    pub async fn ego(&self, id: &ProfileId) -> ConnectResult<GraphResponse> {
        self.snapshot()
            .await
            .graph
            .ego_view(id)
            .ok_or_else(|| ConnectError::ProfileNotFound { id: id.clone() })
    }

    /// Upsert a profile and recompute the whole graph. On any failure the
    /// pool and the published snapshot are left as they were.
    pub async fn submit(&self, mut profile: Profile) -> ConnectResult<Arc<GraphSnapshot>> {
        if let Err(err) = profile.validate_submission() {
            warn!(id = %profile.id, "Rejected profile submission: {}", err);
            return Err(err);
        }
        profile.submitted_at = Utc::now();

        let _writer = self.writer.lock().await;

        let mut pool = self.store.list().await?;
        let replaced = match pool.iter_mut().find(|existing| existing.id == profile.id) {
            Some(slot) => {
                *slot = profile.clone();
                true
            }
            None => {
                pool.push(profile.clone());
                false
            }
        };
        let pool_size = pool.len();

        let graph = recompute(pool, &self.config).await?;
        self.store.upsert(profile.clone()).await?;
        let snapshot = self.publish(graph).await;

        info!(
            id = %profile.id,
            replaced,
            profiles = pool_size,
            generation = snapshot.generation,
            "Profile submitted"
        );
        Ok(snapshot)
    }

    /// Drop every profile and publish the empty graph.
    pub async fn reset(&self) -> ConnectResult<Arc<GraphSnapshot>> {
        let _writer = self.writer.lock().await;
        self.store.clear().await?;
        let snapshot = self.publish(GraphResponse::empty()).await;
        info!(generation = snapshot.generation, "Profile pool reset");
        Ok(snapshot)
    }

    async fn publish(&self, graph: GraphResponse) -> Arc<GraphSnapshot> {
        let mut current = self.snapshot.write().await;
        let next = Arc::new(GraphSnapshot {
            generation: current.generation + 1,
            computed_at: Utc::now(),
            graph,
        });
        *current = next.clone();
        next
    }
}

/// Run [`compute_graph`] on the blocking pool under the configured bound.
/// On timeout the worker is told to stop at its next checkpoint.
async fn recompute(pool: Vec<Profile>, config: &EngineConfig) -> ConnectResult<GraphResponse> {
    let limit = config.recompute_timeout;
    let cancel = CancellationToken::with_deadline(limit);
    let worker = cancel.clone();
    let job_config = config.clone();

    let task = tokio::task::spawn_blocking(move || compute_graph(&pool, &job_config, &worker));
    match tokio::time::timeout(limit, task).await {
        Ok(joined) => joined?,
        Err(_) => {
            cancel.cancel();
            warn!("Graph recomputation exceeded {}ms, keeping previous snapshot", limit.as_millis());
            Err(ConnectError::Timeout { limit })
        }
    }
}
