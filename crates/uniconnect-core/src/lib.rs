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

//! # UniConnect Core
//!
//! Compatibility graph engine for student profiles.
//!
//! Profiles are scored pairwise on shared attributes, linked when the score
//! clears a threshold, partitioned into communities with Louvain and ranked
//! by weighted betweenness. [`CompatibilityEngine`] ties the stages together
//! behind a single-writer submission path.

pub mod cancel;
pub mod centrality;
pub mod community;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod profile;
pub mod responder;
pub mod similarity;
pub mod store;

mod scenarios;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use errors::{ConnectError, ConnectResult};
pub use profile::{ConnectionType, Profile, ProfileId, TagCategory};

// Re-export traits
pub use store::ProfileStore;

// Re-export concrete types
pub use centrality::{CentralityScores, NodeCentrality};
pub use community::{CommunityAssignment, CommunityDetection, Louvain, LouvainConfig};
pub use engine::{compute_graph, CompatibilityEngine, EngineConfig, GraphSnapshot};
pub use graph::{build_graph, CompatibilityGraph, GraphEdge, GraphNode};
pub use responder::{GraphResponse, GraphStats, LinkView, NodeView, RankedNode};
pub use similarity::{score, Dimension, Similarity, SimilarityConfig, SimilarityWeights};
pub use store::MemoryProfileStore;
