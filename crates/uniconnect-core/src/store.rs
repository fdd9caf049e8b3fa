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

//! Profile pool storage.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::{
    errors::ConnectResult,
    profile::{Profile, ProfileId},
};

/// Pool of submitted profiles keyed by identity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look up one profile
    async fn get(&self, id: &ProfileId) -> ConnectResult<Option<Profile>>;

    /// All profiles in ascending identity order
    async fn list(&self) -> ConnectResult<Vec<Profile>>;

    /// Insert or replace by identity. Returns the replaced record.
    async fn upsert(&self, profile: Profile) -> ConnectResult<Option<Profile>>;

    /// Remove every profile
    async fn clear(&self) -> ConnectResult<()>;

    /// Number of stored profiles
    async fn count(&self) -> ConnectResult<usize>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<BTreeMap<ProfileId, Profile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `profiles`; later duplicates replace earlier ones.
    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let profiles = profiles.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            profiles: RwLock::new(profiles),
        }
    }

    /// Load a JSON array of profiles, validating each one.
    pub async fn from_json_file(path: impl AsRef<Path>) -> ConnectResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let profiles = parse_pool(&raw)?;
        info!("Seeded profile pool with {} profiles from {}", profiles.len(), path.display());
        Ok(Self::with_profiles(profiles))
    }
}

/// Parse and validate a JSON array of profiles.
pub fn parse_pool(raw: &str) -> ConnectResult<Vec<Profile>> {
    let profiles: Vec<Profile> = serde_json::from_str(raw)?;
    for profile in &profiles {
        profile.validate_submission()?;
    }
    Ok(profiles)
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, id: &ProfileId) -> ConnectResult<Option<Profile>> {
        Ok(self.profiles.read().await.get(id).cloned())
    }

    async fn list(&self) -> ConnectResult<Vec<Profile>> {
        Ok(self.profiles.read().await.values().cloned().collect())
    }

    async fn upsert(&self, profile: Profile) -> ConnectResult<Option<Profile>> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles.insert(profile.id.clone(), profile))
    }

    async fn clear(&self) -> ConnectResult<()> {
        self.profiles.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> ConnectResult<usize> {
        Ok(self.profiles.read().await.len())
    }
}
