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

//! Weighted undirected compatibility graph over a profile pool.

use std::collections::HashMap;

use petgraph::algo::connected_components;
use petgraph::graph::{EdgeReference, NodeIndex, UnGraph};
use petgraph::visit::{Bfs, EdgeRef};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    cancel::CancellationToken,
    errors::{ConnectError, ConnectResult},
    profile::{Profile, ProfileId},
    similarity::{score, Dimension, SimilarityConfig},
};

/// A student in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: ProfileId,
    pub label: String,
    /// Coloring group, the student's course.
    pub group: String,
}

impl GraphNode {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            label: profile.full_name.clone(),
            group: profile.course.clone(),
        }
    }
}

/// Compatibility link between two students. `source < target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: ProfileId,
    pub target: ProfileId,
    pub weight: f64,
    pub reason: Dimension,
}

/// Nodes ordered by identity plus their edges. Constructed only through
/// [`CompatibilityGraph::from_parts`], which enforces the edge invariants.
///
/// Node indices follow identity order, so `NodeIndex::index()` is the
/// position of the node in [`nodes`](Self::nodes).
#[derive(Debug, Clone, Default)]
pub struct CompatibilityGraph {
    graph: UnGraph<GraphNode, GraphEdge>,
    index: HashMap<ProfileId, NodeIndex>,
}

impl CompatibilityGraph {
    /// Assemble a graph, rejecting unknown endpoints, self-loops, duplicate
    /// pairs and weights outside `(0, 1]`.
    pub fn from_parts(mut nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> ConnectResult<Self> {
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut graph = UnGraph::with_capacity(nodes.len(), edges.len());
        let mut index = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let id = node.id.clone();
            let position = graph.add_node(node);
            if index.insert(id.clone(), position).is_some() {
                return Err(ConnectError::invariant(format!("duplicate node {}", id)));
            }
        }

        for mut edge in edges {
            let source = *index
                .get(&edge.source)
                .ok_or_else(|| ConnectError::invariant(format!("edge references unknown node {}", edge.source)))?;
            let target = *index
                .get(&edge.target)
                .ok_or_else(|| ConnectError::invariant(format!("edge references unknown node {}", edge.target)))?;
            if source == target {
                return Err(ConnectError::invariant(format!("self-loop on {}", edge.source)));
            }
            if !(edge.weight > 0.0 && edge.weight <= 1.0) {
                return Err(ConnectError::invariant(format!(
                    "edge {}-{} has weight {} outside (0, 1]",
                    edge.source, edge.target, edge.weight
                )));
            }
            if graph.contains_edge(source, target) {
                return Err(ConnectError::invariant(format!(
                    "duplicate edge {}-{}",
                    edge.source, edge.target
                )));
            }
            let (lo, hi) = if source < target {
                (source, target)
            } else {
                std::mem::swap(&mut edge.source, &mut edge.target);
                (target, source)
            };
            graph.add_edge(lo, hi, edge);
        }

        Ok(Self { graph, index })
    }

    /// Underlying petgraph graph.
    pub fn as_ungraph(&self) -> &UnGraph<GraphNode, GraphEdge> {
        &self.graph
    }

    /// Nodes in identity order.
    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &GraphNode> + '_ {
        self.graph.raw_nodes().iter().map(|node| &node.weight)
    }

    /// Edges in insertion order, each with `source < target`.
    pub fn edges(&self) -> impl ExactSizeIterator<Item = &GraphEdge> + '_ {
        self.graph.raw_edges().iter().map(|edge| &edge.weight)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn index_of(&self, id: &ProfileId) -> Option<usize> {
        self.index.get(id).map(|node| node.index())
    }

    /// Edges as `(i, j, weight)` over node indices with `i < j`.
    pub fn weighted_edges(&self) -> Vec<(usize, usize, f64)> {
        self.graph
            .edge_references()
            .map(|edge| (edge.source().index(), edge.target().index(), edge.weight().weight))
            .collect()
    }

    /// Neighbor lists per node index, each sorted by neighbor index.
    pub fn adjacency(&self) -> Vec<Vec<(usize, f64)>> {
        self.graph
            .node_indices()
            .map(|node| {
                let mut neighbors: Vec<(usize, f64)> = self
                    .graph
                    .edges(node)
                    .map(|edge| (other_end(node, &edge).index(), edge.weight().weight))
                    .collect();
                neighbors.sort_by_key(|&(neighbor, _)| neighbor);
                neighbors
            })
            .collect()
    }

    /// Identities directly connected to `id`, in identity order.
    pub fn neighbors(&self, id: &ProfileId) -> Vec<&ProfileId> {
        let Some(&node) = self.index.get(id) else {
            return Vec::new();
        };
        let mut neighbors: Vec<&ProfileId> = self.graph.neighbors(node).map(|other| &self.graph[other].id).collect();
        neighbors.sort();
        neighbors
    }

    /// Number of connected components.
    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }

    /// Connected component id per node index. Components are numbered in
    /// order of their smallest member.
    pub fn connected_components(&self) -> Vec<usize> {
        let mut component = vec![usize::MAX; self.graph.node_count()];
        let mut next = 0;

        for start in self.graph.node_indices() {
            if component[start.index()] != usize::MAX {
                continue;
            }
            let mut bfs = Bfs::new(&self.graph, start);
            while let Some(node) = bfs.next(&self.graph) {
                component[node.index()] = next;
            }
            next += 1;
        }

        component
    }
}

/// Endpoint of `edge` that is not `node`.
fn other_end(node: NodeIndex, edge: &EdgeReference<'_, GraphEdge>) -> NodeIndex {
    if edge.source() == node {
        edge.target()
    } else {
        edge.source()
    }
}

/// Score every unordered pair of the pool and keep the pairs at or above
/// the threshold. Zero-score pairs never become edges.
pub fn build_graph(
    pool: &[Profile],
    config: &SimilarityConfig,
    cancel: &CancellationToken,
) -> ConnectResult<CompatibilityGraph> {
    cancel.check()?;

    let mut profiles: Vec<&Profile> = pool.iter().collect();
    profiles.sort_by(|a, b| a.id.cmp(&b.id));

    let mut edges = Vec::new();
    for (i, a) in profiles.iter().enumerate() {
        cancel.check()?;
        for b in &profiles[i + 1..] {
            let similarity = score(a, b, &config.weights);
            let Some(reason) = similarity.reason else {
                continue;
            };
            if similarity.score >= config.threshold {
                edges.push(GraphEdge {
                    source: a.id.clone(),
                    target: b.id.clone(),
                    weight: similarity.score,
                    reason,
                });
            }
        }
    }

    let nodes = profiles.iter().map(|p| GraphNode::from_profile(p)).collect();
    let graph = CompatibilityGraph::from_parts(nodes, edges)?;
    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        components = graph.component_count(),
        threshold = config.threshold,
        "Built compatibility graph"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::TagCategory;

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.into(),
            label: id.to_uppercase(),
            group: "Law".to_string(),
        }
    }

    fn edge(source: &str, target: &str, weight: f64) -> GraphEdge {
        GraphEdge {
            source: source.into(),
            target: target.into(),
            weight,
            reason: Dimension::Course,
        }
    }

    fn trio() -> Vec<Profile> {
        vec![
            Profile::new("c", "Carla", "Law").with_tags(TagCategory::Hobbies, ["Dancing"]),
            Profile::new("a", "Ana", "Computer Science").with_tags(TagCategory::Hobbies, ["Reading", "Gaming"]),
            Profile::new("b", "Bruno", "Computer Science").with_tags(TagCategory::Hobbies, ["Gaming", "Photography"]),
        ]
    }

    #[test]
    fn test_from_parts_normalizes_orientation() {
        let graph = CompatibilityGraph::from_parts(vec![node("b"), node("a")], vec![edge("b", "a", 0.5)]).unwrap();
        assert_eq!(graph.nodes().next().unwrap().id, ProfileId::from("a"));
        let only = graph.edges().next().unwrap();
        assert_eq!(only.source, ProfileId::from("a"));
        assert_eq!(only.target, ProfileId::from("b"));
        assert_eq!(graph.weighted_edges(), vec![(0, 1, 0.5)]);
    }

    #[test]
    fn test_from_parts_rejects_broken_edges() {
        let unknown = CompatibilityGraph::from_parts(vec![node("a")], vec![edge("a", "z", 0.5)]);
        assert!(matches!(unknown, Err(ConnectError::InvariantViolation { .. })));

        let self_loop = CompatibilityGraph::from_parts(vec![node("a")], vec![edge("a", "a", 0.5)]);
        assert!(self_loop.is_err());

        let duplicate = CompatibilityGraph::from_parts(
            vec![node("a"), node("b")],
            vec![edge("a", "b", 0.5), edge("b", "a", 0.4)],
        );
        assert!(duplicate.is_err());

        let zero = CompatibilityGraph::from_parts(vec![node("a"), node("b")], vec![edge("a", "b", 0.0)]);
        assert!(zero.is_err());

        let twice = CompatibilityGraph::from_parts(vec![node("a"), node("a")], vec![]);
        assert!(twice.is_err());
    }

    #[test]
    fn test_build_graph_trio() {
        let graph = build_graph(&trio(), &SimilarityConfig::default(), &CancellationToken::new()).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 1);

        let only = graph.edges().next().unwrap();
        assert_eq!(only.source, ProfileId::from("a"));
        assert_eq!(only.target, ProfileId::from("b"));
        assert_eq!(only.reason, Dimension::Course);
        let first = graph.nodes().next().unwrap();
        assert_eq!(first.group, "Computer Science");
        assert_eq!(first.label, "Ana");
    }

    #[test]
    fn test_build_graph_has_no_self_loops_or_duplicates() {
        let pool: Vec<Profile> = (0..12)
            .map(|i| {
                Profile::new(format!("p{:02}", i), format!("P{}", i), if i % 2 == 0 { "Law" } else { "Design" })
                    .with_semester(1 + i % 5)
                    .with_tags(TagCategory::Hobbies, [format!("h{}", i % 3), "common".to_string()])
            })
            .collect();
        let config = SimilarityConfig::default().with_threshold(0.0);
        let graph = build_graph(&pool, &config, &CancellationToken::new()).unwrap();

        let mut pairs = std::collections::HashSet::new();
        for edge in graph.edges() {
            assert_ne!(edge.source, edge.target);
            assert!(edge.source < edge.target);
            assert!(pairs.insert((edge.source.clone(), edge.target.clone())));
            assert!(edge.weight > 0.0 && edge.weight <= 1.0);
        }
    }

    #[test]
    fn test_zero_threshold_still_skips_zero_scores() {
        let weights = crate::similarity::SimilarityWeights {
            course: 1.0,
            professional_interests: 0.0,
            hobbies: 0.0,
            sports: 0.0,
            music: 0.0,
            leisure: 0.0,
            semester: 0.0,
            connection_types: 0.0,
        };
        let config = SimilarityConfig::default().with_weights(weights).with_threshold(0.0);
        let graph = build_graph(&trio(), &config, &CancellationToken::new()).unwrap();
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_build_graph_honours_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let result = build_graph(&trio(), &SimilarityConfig::default(), &token);
        assert!(matches!(result, Err(ConnectError::Timeout { .. })));
    }

    #[test]
    fn test_connected_components_and_neighbors() {
        let graph = CompatibilityGraph::from_parts(
            vec![node("a"), node("b"), node("c"), node("d"), node("e")],
            vec![edge("a", "c", 0.5), edge("c", "e", 0.4), edge("b", "d", 0.9)],
        )
        .unwrap();
        assert_eq!(graph.connected_components(), vec![0, 1, 0, 1, 0]);
        assert_eq!(graph.component_count(), 2);
        assert_eq!(graph.index_of(&"d".into()), Some(3));

        let around_c: Vec<&str> = graph.neighbors(&"c".into()).into_iter().map(|id| id.as_str()).collect();
        assert_eq!(around_c, vec!["a", "e"]);
        assert!(graph.neighbors(&"zz".into()).is_empty());
    }
}
