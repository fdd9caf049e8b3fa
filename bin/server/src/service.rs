use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use uniconnect_core::{
    CompatibilityEngine, ConnectResult, GraphResponse, GraphSnapshot, MemoryProfileStore, Profile, ProfileId,
    ProfileStore,
};

use crate::config::Settings;

/// Service layer that owns the engine and exposes the operations used by the routers
pub struct ConnectService {
    engine: CompatibilityEngine,
}

impl ConnectService {
    /// Create a new ConnectService, seeding the pool when a seed file is configured
    pub async fn new(settings: &Settings) -> Result<Self> {
        let store: Arc<dyn ProfileStore> = match &settings.seed_file {
            Some(path) => Arc::new(MemoryProfileStore::from_json_file(path).await?),
            None => Arc::new(MemoryProfileStore::new()),
        };

        let engine = CompatibilityEngine::new(settings.engine_config(), store).await?;
        info!(
            threshold = engine.config().similarity.threshold,
            resolution = engine.config().louvain.resolution,
            "Compatibility engine ready"
        );

        Ok(Self { engine })
    }

    /// Submit (upsert) a profile and return the new snapshot
    pub async fn submit_profile(&self, profile: Profile) -> ConnectResult<Arc<GraphSnapshot>> {
        self.engine.submit(profile).await
    }

    /// Get a stored profile by identity
    pub async fn get_profile(&self, id: &ProfileId) -> ConnectResult<Profile> {
        self.engine.profile(id).await
    }

    /// Drop every profile
    pub async fn reset(&self) -> ConnectResult<Arc<GraphSnapshot>> {
        self.engine.reset().await
    }

    /// Last completed snapshot
    pub async fn graph(&self) -> Arc<GraphSnapshot> {
        self.engine.snapshot().await
    }

    /// Neighborhood of one profile in the last snapshot
    pub async fn ego_graph(&self, id: &ProfileId) -> ConnectResult<GraphResponse> {
        self.engine.ego(id).await
    }
}
