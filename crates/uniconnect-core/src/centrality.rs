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

//! Node importance over a graph snapshot.
//!
//! Two measures are computed for every node:
//!
//! - **Degree**: sum of incident edge weights, normalized by `n - 1`.
//! - **Betweenness** (Brandes 2001): share of weighted shortest paths that
//!   pass through the node. Edge length is `1 / weight`, so strong
//!   compatibility means short distance. Scores are divided by the maximum
//!   so the strongest broker scores 1.

use petgraph::algo::dijkstra;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::{
    cancel::CancellationToken,
    errors::ConnectResult,
    graph::{CompatibilityGraph, GraphEdge},
    profile::ProfileId,
};

const DISTANCE_TOLERANCE: f64 = 1e-9;

/// Importance figures for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCentrality {
    pub id: ProfileId,
    /// Sum of incident edge weights.
    pub weighted_degree: f64,
    /// `weighted_degree / (n - 1)`, 0 for graphs with fewer than two nodes.
    pub degree_centrality: f64,
    /// Number of direct connections.
    pub connections: usize,
    /// Betweenness divided by the graph maximum, in `[0, 1]`.
    pub betweenness: f64,
}

/// Scores for every node, in graph node order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CentralityScores {
    scores: Vec<NodeCentrality>,
}

impl CentralityScores {
    pub fn get(&self, id: &ProfileId) -> Option<&NodeCentrality> {
        self.scores
            .binary_search_by(|score| score.id.cmp(id))
            .ok()
            .map(|i| &self.scores[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeCentrality> {
        self.scores.iter()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Most important first: betweenness, then weighted degree, then identity.
    pub fn ranking(&self) -> Vec<&NodeCentrality> {
        let mut ranked: Vec<&NodeCentrality> = self.scores.iter().collect();
        ranked.sort_by(|a, b| {
            b.betweenness
                .total_cmp(&a.betweenness)
                .then_with(|| b.weighted_degree.total_cmp(&a.weighted_degree))
                .then_with(|| a.id.cmp(&b.id))
        });
        ranked
    }
}

/// Compute degree and betweenness centrality for every node.
pub fn analyze(graph: &CompatibilityGraph, cancel: &CancellationToken) -> ConnectResult<CentralityScores> {
    let n = graph.node_count();
    let adjacency = graph.adjacency();
    let betweenness = normalize_by_max(betweenness(graph, cancel)?);
    let scale = if n > 1 { (n - 1) as f64 } else { 0.0 };

    let scores = graph
        .nodes()
        .enumerate()
        .map(|(i, node)| {
            let weighted_degree: f64 = adjacency[i].iter().map(|&(_, weight)| weight).sum();
            NodeCentrality {
                id: node.id.clone(),
                weighted_degree,
                degree_centrality: if scale > 0.0 { weighted_degree / scale } else { 0.0 },
                connections: adjacency[i].len(),
                betweenness: betweenness[i],
            }
        })
        .collect();

    Ok(CentralityScores { scores })
}

/// Raw weighted betweenness per node index, each unordered pair counted once.
pub fn betweenness(graph: &CompatibilityGraph, cancel: &CancellationToken) -> ConnectResult<Vec<f64>> {
    let g = graph.as_ungraph();
    let n = g.node_count();
    let mut centrality = vec![0.0; n];

    for source in g.node_indices() {
        cancel.check()?;

        let reached = dijkstra(g, source, None, |edge| edge_length(edge.weight()));
        let mut distance = vec![f64::INFINITY; n];
        for (node, d) in &reached {
            distance[node.index()] = *d;
        }

        // Settle order: distance, then index for ties.
        let mut order: Vec<NodeIndex> = reached.keys().copied().collect();
        order.sort_by(|a, b| {
            distance[a.index()]
                .total_cmp(&distance[b.index()])
                .then_with(|| a.cmp(b))
        });

        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut paths = vec![0.0_f64; n];
        paths[source.index()] = 1.0;
        for &node in order.iter().skip(1) {
            let v = node.index();
            for edge in g.edges(node) {
                let previous = if edge.source() == node { edge.target() } else { edge.source() };
                let u = previous.index();
                let through = distance[u] + edge_length(edge.weight());
                if (through - distance[v]).abs() <= DISTANCE_TOLERANCE {
                    paths[v] += paths[u];
                    predecessors[v].push(u);
                }
            }
        }

        let mut dependency = vec![0.0; n];
        while let Some(node) = order.pop() {
            let w = node.index();
            for &previous in &predecessors[w] {
                dependency[previous] += paths[previous] / paths[w] * (1.0 + dependency[w]);
            }
            if node != source {
                centrality[w] += dependency[w];
            }
        }
    }

    // Every pair was walked from both ends.
    for value in &mut centrality {
        *value /= 2.0;
    }
    Ok(centrality)
}

/// Strong compatibility means short distance.
fn edge_length(edge: &GraphEdge) -> f64 {
    1.0 / edge.weight
}

fn normalize_by_max(values: Vec<f64>) -> Vec<f64> {
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return values;
    }
    values.into_iter().map(|value| value / max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConnectError;
    use crate::graph::GraphNode;
    use crate::similarity::Dimension;

    fn graph(ids: &[&str], edges: &[(&str, &str, f64)]) -> CompatibilityGraph {
        let nodes = ids
            .iter()
            .map(|id| GraphNode {
                id: (*id).into(),
                label: id.to_string(),
                group: "g".to_string(),
            })
            .collect();
        let edges = edges
            .iter()
            .map(|&(s, t, w)| GraphEdge {
                source: s.into(),
                target: t.into(),
                weight: w,
                reason: Dimension::Sports,
            })
            .collect();
        CompatibilityGraph::from_parts(nodes, edges).unwrap()
    }

    fn scores(graph: &CompatibilityGraph) -> CentralityScores {
        analyze(graph, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_path_middle_is_the_broker() {
        let g = graph(&["a", "b", "c"], &[("a", "b", 0.5), ("b", "c", 0.5)]);
        let raw = betweenness(&g, &CancellationToken::new()).unwrap();
        assert_eq!(raw, vec![0.0, 1.0, 0.0]);

        let s = scores(&g);
        let b = s.get(&"b".into()).unwrap();
        assert_eq!(b.betweenness, 1.0);
        assert_eq!(b.connections, 2);
        assert!((b.weighted_degree - 1.0).abs() < 1e-12);
        assert!((b.degree_centrality - 0.5).abs() < 1e-12);
        assert_eq!(s.get(&"a".into()).unwrap().betweenness, 0.0);
    }

    #[test]
    fn test_weak_direct_link_routes_through_strong_pair() {
        // a-c is long (1 / 0.3) compared with a-b-c (1 + 1).
        let g = graph(&["a", "b", "c"], &[("a", "b", 1.0), ("b", "c", 1.0), ("a", "c", 0.3)]);
        let raw = betweenness(&g, &CancellationToken::new()).unwrap();
        assert!((raw[1] - 1.0).abs() < 1e-12);
        assert_eq!(raw[0], 0.0);
    }

    #[test]
    fn test_equal_paths_split_credit() {
        // Square a-b-d, a-c-d: b and c each carry half of the a-d paths.
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b", 0.5), ("a", "c", 0.5), ("b", "d", 0.5), ("c", "d", 0.5)],
        );
        let raw = betweenness(&g, &CancellationToken::new()).unwrap();
        for value in &raw {
            assert!((value - 0.5).abs() < 1e-12);
        }
        let normalized = scores(&g);
        assert!(normalized.iter().all(|s| (s.betweenness - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_star_ranking() {
        let g = graph(
            &["hub", "x", "y", "z"],
            &[("hub", "x", 0.4), ("hub", "y", 0.9), ("hub", "z", 0.4)],
        );
        let s = scores(&g);
        let ranked: Vec<&str> = s.ranking().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ranked, vec!["hub", "y", "x", "z"]);
    }

    #[test]
    fn test_isolated_and_tiny_graphs() {
        let single = scores(&graph(&["solo"], &[]));
        let solo = single.get(&"solo".into()).unwrap();
        assert_eq!(solo.degree_centrality, 0.0);
        assert_eq!(solo.betweenness, 0.0);
        assert_eq!(solo.connections, 0);

        assert!(scores(&CompatibilityGraph::default()).is_empty());
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let g = graph(
            &["a", "b", "c", "d", "e"],
            &[("a", "b", 0.5), ("b", "c", 0.7), ("c", "d", 0.5), ("d", "e", 0.9), ("a", "e", 0.35), ("b", "d", 0.4)],
        );
        assert_eq!(scores(&g), scores(&g));
    }

    #[test]
    fn test_cancelled_analysis_times_out() {
        let g = graph(&["a", "b"], &[("a", "b", 0.5)]);
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(analyze(&g, &token), Err(ConnectError::Timeout { .. })));
    }
}
