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

//! Louvain community detection.
//!
//! Multi-level greedy modularity optimization (Blondel et al. 2008):
//!
//! 1. **Local moving**: every node starts alone; nodes are visited in index
//!    order and moved to the neighboring community with the largest positive
//!    modularity gain until a full pass moves nothing.
//! 2. **Aggregation**: communities collapse into single nodes, inter-community
//!    weights are summed and intra-community weight becomes a self-loop.
//! 3. Repeat on the aggregate until a level brings no improvement, then
//!    unfold the memberships back onto the original nodes.
//!
//! Candidate communities are scanned in ascending id and ties keep the
//! current community, so the partition is a pure function of the graph and
//! the configuration.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    cancel::CancellationToken,
    errors::{ConnectError, ConnectResult},
    graph::CompatibilityGraph,
    profile::ProfileId,
};

pub const DEFAULT_RESOLUTION: f64 = 1.0;
pub const DEFAULT_MAX_PASSES: usize = 100;
pub const DEFAULT_MAX_LEVELS: usize = 10;
pub const DEFAULT_MIN_MODULARITY_GAIN: f64 = 1e-7;

/// Smallest gain treated as an improvement; absorbs float noise.
const GAIN_EPSILON: f64 = 1e-12;

/// Louvain settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LouvainConfig {
    /// Resolution (gamma). Higher values produce smaller communities.
    pub resolution: f64,
    /// Maximum local-moving passes per level.
    pub max_passes: usize,
    /// Maximum aggregation levels.
    pub max_levels: usize,
    /// Minimum modularity improvement for another level.
    pub min_modularity_gain: f64,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            max_passes: DEFAULT_MAX_PASSES,
            max_levels: DEFAULT_MAX_LEVELS,
            min_modularity_gain: DEFAULT_MIN_MODULARITY_GAIN,
        }
    }
}

impl LouvainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    pub fn validate(&self) -> ConnectResult<()> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(ConnectError::Config {
                message: format!("resolution must be positive, got {}", self.resolution),
            });
        }
        if self.max_passes == 0 || self.max_levels == 0 {
            return Err(ConnectError::Config {
                message: "max_passes and max_levels must be at least 1".to_string(),
            });
        }
        if !self.min_modularity_gain.is_finite() || self.min_modularity_gain < 0.0 {
            return Err(ConnectError::Config {
                message: format!("min_modularity_gain must be non-negative, got {}", self.min_modularity_gain),
            });
        }
        Ok(())
    }
}

/// Where a modularity sample was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModularityStep {
    Initial,
    Move,
    Pass,
    Aggregation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModularityRecord {
    pub level: usize,
    pub step: ModularityStep,
    pub modularity: f64,
}

/// Partition of the graph's nodes. Community ids are consecutive from 0,
/// numbered by the smallest identity they contain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommunityAssignment {
    communities: BTreeMap<ProfileId, usize>,
    community_count: usize,
}

impl CommunityAssignment {
    fn from_membership(graph: &CompatibilityGraph, membership: &[usize]) -> Self {
        let (labels, community_count) = renumber(membership);
        let communities = graph
            .nodes()
            .zip(labels)
            .map(|(node, community)| (node.id.clone(), community))
            .collect();
        Self {
            communities,
            community_count,
        }
    }

    pub fn community_of(&self, id: &ProfileId) -> Option<usize> {
        self.communities.get(id).copied()
    }

    pub fn community_count(&self) -> usize {
        self.community_count
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    /// Members grouped per community, in community id order.
    pub fn groups(&self) -> Vec<Vec<ProfileId>> {
        let mut groups = vec![Vec::new(); self.community_count];
        for (id, &community) in &self.communities {
            groups[community].push(id.clone());
        }
        groups
    }
}

/// Result of a detection run.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityDetection {
    pub assignment: CommunityAssignment,
    pub modularity: f64,
    /// Modularity after the start, every pass and every aggregation (and
    /// every move when move tracing is on).
    pub history: Vec<ModularityRecord>,
    /// Levels that produced an aggregation.
    pub levels: usize,
}

/// Louvain detector.
#[derive(Debug, Clone, Default)]
pub struct Louvain {
    config: LouvainConfig,
    trace_moves: bool,
}

impl Louvain {
    pub fn new(config: LouvainConfig) -> Self {
        Self {
            config,
            trace_moves: false,
        }
    }

    /// Record modularity after every single move. Costs a full modularity
    /// evaluation per move.
    pub fn with_move_trace(mut self, trace_moves: bool) -> Self {
        self.trace_moves = trace_moves;
        self
    }

    pub fn config(&self) -> &LouvainConfig {
        &self.config
    }

    pub fn detect(&self, graph: &CompatibilityGraph, cancel: &CancellationToken) -> ConnectResult<CommunityDetection> {
        cancel.check()?;

        let n = graph.node_count();
        if n == 0 {
            return Ok(CommunityDetection {
                assignment: CommunityAssignment::default(),
                modularity: 0.0,
                history: Vec::new(),
                levels: 0,
            });
        }

        let resolution = self.config.resolution;
        let original = LevelGraph::new(n, &graph.weighted_edges(), vec![0.0; n]);
        let mut level = original.clone();
        let mut membership: Vec<usize> = (0..n).collect();
        let mut current = original.modularity(&membership, resolution);
        let mut history = vec![ModularityRecord {
            level: 0,
            step: ModularityStep::Initial,
            modularity: current,
        }];
        let mut levels = 0;

        for depth in 0..self.config.max_levels {
            cancel.check()?;

            let (partition, moved) = self.local_moving(&level, depth, &mut history, cancel)?;
            if !moved {
                break;
            }

            let (labels, count) = renumber(&partition);
            let achieved = level.modularity(&labels, resolution);
            for community in membership.iter_mut() {
                *community = labels[*community];
            }

            let aggregated = level.aggregate(&labels, count);
            let singletons: Vec<usize> = (0..count).collect();
            history.push(ModularityRecord {
                level: depth,
                step: ModularityStep::Aggregation,
                modularity: aggregated.modularity(&singletons, resolution),
            });
            levels += 1;

            debug!(
                level = depth,
                communities = count,
                modularity = achieved,
                "Louvain level aggregated"
            );

            let gain = achieved - current;
            current = achieved;
            let shrunk = count < level.len();
            level = aggregated;
            if gain < self.config.min_modularity_gain || !shrunk {
                break;
            }
        }

        let modularity = original.modularity(&membership, resolution);
        Ok(CommunityDetection {
            assignment: CommunityAssignment::from_membership(graph, &membership),
            modularity,
            history,
            levels,
        })
    }

    /// Phase 1. Returns the community of every level node and whether any
    /// node moved.
    fn local_moving(
        &self,
        level: &LevelGraph,
        depth: usize,
        history: &mut Vec<ModularityRecord>,
        cancel: &CancellationToken,
    ) -> ConnectResult<(Vec<usize>, bool)> {
        let n = level.len();
        let m = level.total_weight;
        let resolution = self.config.resolution;
        let mut community: Vec<usize> = (0..n).collect();
        if m <= 0.0 {
            return Ok((community, false));
        }

        let mut totals = level.degrees.clone();
        let mut moved_any = false;

        for _pass in 0..self.config.max_passes {
            cancel.check()?;
            let mut moved = false;

            for node in 0..n {
                let current = community[node];
                let ki = level.degrees[node];

                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for &(neighbor, weight) in &level.adjacency[node] {
                    *links.entry(community[neighbor]).or_insert(0.0) += weight;
                }

                totals[current] -= ki;
                let gain = |target: usize, ki_in: f64| ki_in / m - resolution * totals[target] * ki / (2.0 * m * m);

                let mut best = current;
                let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));
                for (&target, &ki_in) in &links {
                    if target == current {
                        continue;
                    }
                    let candidate = gain(target, ki_in);
                    if candidate > best_gain + GAIN_EPSILON {
                        best = target;
                        best_gain = candidate;
                    }
                }

                totals[best] += ki;
                community[node] = best;

                if best != current {
                    moved = true;
                    moved_any = true;
                    if self.trace_moves {
                        history.push(ModularityRecord {
                            level: depth,
                            step: ModularityStep::Move,
                            modularity: level.modularity(&community, resolution),
                        });
                    }
                }
            }

            if !moved {
                break;
            }
            history.push(ModularityRecord {
                level: depth,
                step: ModularityStep::Pass,
                modularity: level.modularity(&community, resolution),
            });
        }

        Ok((community, moved_any))
    }
}

/// Modularity of an arbitrary assignment over `graph`. Every node must be
/// assigned.
pub fn modularity(graph: &CompatibilityGraph, assignment: &CommunityAssignment, resolution: f64) -> ConnectResult<f64> {
    let membership = graph
        .nodes()
        .map(|node| {
            assignment
                .community_of(&node.id)
                .ok_or_else(|| ConnectError::invariant(format!("node {} has no community", node.id)))
        })
        .collect::<ConnectResult<Vec<usize>>>()?;
    let (labels, _) = renumber(&membership);
    let n = graph.node_count();
    Ok(LevelGraph::new(n, &graph.weighted_edges(), vec![0.0; n]).modularity(&labels, resolution))
}

/// Map labels to consecutive ids in order of first appearance.
fn renumber(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    let renumbered = labels
        .iter()
        .map(|label| {
            let next = mapping.len();
            *mapping.entry(*label).or_insert(next)
        })
        .collect();
    (renumbered, mapping.len())
}

/// One level of the Louvain hierarchy.
#[derive(Debug, Clone)]
struct LevelGraph {
    adjacency: Vec<Vec<(usize, f64)>>,
    self_loops: Vec<f64>,
    degrees: Vec<f64>,
    /// Sum of edge weights, each edge and self-loop counted once.
    total_weight: f64,
}

impl LevelGraph {
    fn new(n: usize, edges: &[(usize, usize, f64)], self_loops: Vec<f64>) -> Self {
        let mut adjacency = vec![Vec::new(); n];
        let mut degrees = vec![0.0; n];
        let mut total_weight = 0.0;

        for &(i, j, weight) in edges {
            adjacency[i].push((j, weight));
            adjacency[j].push((i, weight));
            degrees[i] += weight;
            degrees[j] += weight;
            total_weight += weight;
        }
        for (i, &weight) in self_loops.iter().enumerate() {
            degrees[i] += 2.0 * weight;
            total_weight += weight;
        }
        for neighbors in &mut adjacency {
            neighbors.sort_by_key(|&(neighbor, _)| neighbor);
        }

        Self {
            adjacency,
            self_loops,
            degrees,
            total_weight,
        }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// `sum_c [in_c / m - gamma * (tot_c / 2m)^2]` with `community` ids below `len()`.
    fn modularity(&self, community: &[usize], resolution: f64) -> f64 {
        let m = self.total_weight;
        if m <= 0.0 {
            return 0.0;
        }

        let n = self.len();
        let mut internal = vec![0.0; n];
        let mut totals = vec![0.0; n];
        for node in 0..n {
            let c = community[node];
            totals[c] += self.degrees[node];
            internal[c] += self.self_loops[node];
            for &(neighbor, weight) in &self.adjacency[node] {
                if node < neighbor && community[neighbor] == c {
                    internal[c] += weight;
                }
            }
        }

        internal
            .iter()
            .zip(&totals)
            .map(|(&inside, &total)| inside / m - resolution * (total / (2.0 * m)).powi(2))
            .sum()
    }

    /// Phase 2. `community` must hold consecutive ids below `count`.
    fn aggregate(&self, community: &[usize], count: usize) -> LevelGraph {
        let mut self_loops = vec![0.0; count];
        let mut between: BTreeMap<(usize, usize), f64> = BTreeMap::new();

        for node in 0..self.len() {
            let c = community[node];
            self_loops[c] += self.self_loops[node];
            for &(neighbor, weight) in &self.adjacency[node] {
                if node >= neighbor {
                    continue;
                }
                let d = community[neighbor];
                if c == d {
                    self_loops[c] += weight;
                } else {
                    *between.entry((c.min(d), c.max(d))).or_insert(0.0) += weight;
                }
            }
        }

        let edges: Vec<(usize, usize, f64)> = between.into_iter().map(|((i, j), w)| (i, j, w)).collect();
        LevelGraph::new(count, &edges, self_loops)
    }
}
