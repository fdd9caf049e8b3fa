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

//! Outbound graph payload.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    centrality::CentralityScores,
    community::CommunityDetection,
    errors::{ConnectError, ConnectResult},
    graph::CompatibilityGraph,
    profile::ProfileId,
    similarity::Dimension,
};

/// Node as rendered by the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: ProfileId,
    pub label: String,
    pub group: String,
    pub community: usize,
    pub component: usize,
    /// Normalized betweenness.
    pub centrality: f64,
    pub degree_centrality: f64,
    /// Direct connections in the full graph.
    pub connections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkView {
    pub source: ProfileId,
    pub target: ProfileId,
    pub weight: f64,
    pub reason: Dimension,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedNode {
    pub id: ProfileId,
    pub centrality: f64,
    pub weighted_degree: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub community_count: usize,
    pub component_count: usize,
    pub modularity: f64,
    /// Mean edge weight; absent when there are no edges.
    pub average_similarity: Option<f64>,
    /// `average_similarity` as a percentage, 0 when absent.
    pub average_similarity_pct: f64,
    pub average_connections: f64,
    /// Direct connections per node within this payload.
    pub connections: BTreeMap<ProfileId, usize>,
}

/// Nodes, links, ranking and summary counters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphResponse {
    pub nodes: Vec<NodeView>,
    pub links: Vec<LinkView>,
    pub ranking: Vec<RankedNode>,
    pub stats: GraphStats,
}

impl GraphResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Format a computed graph. Every node must have a community and a
    /// centrality entry.
    pub fn assemble(
        graph: &CompatibilityGraph,
        detection: &CommunityDetection,
        centrality: &CentralityScores,
    ) -> ConnectResult<Self> {
        let components = graph.connected_components();

        let nodes = graph
            .nodes()
            .zip(components)
            .map(|(node, component)| {
                let community = detection
                    .assignment
                    .community_of(&node.id)
                    .ok_or_else(|| ConnectError::invariant(format!("node {} has no community", node.id)))?;
                let score = centrality
                    .get(&node.id)
                    .ok_or_else(|| ConnectError::invariant(format!("node {} has no centrality", node.id)))?;
                Ok(NodeView {
                    id: node.id.clone(),
                    label: node.label.clone(),
                    group: node.group.clone(),
                    community,
                    component,
                    centrality: round(score.betweenness, 4),
                    degree_centrality: round(score.degree_centrality, 4),
                    connections: score.connections,
                })
            })
            .collect::<ConnectResult<Vec<_>>>()?;

        let links = graph
            .edges()
            .map(|edge| LinkView {
                source: edge.source.clone(),
                target: edge.target.clone(),
                weight: round(edge.weight, 4),
                reason: edge.reason,
            })
            .collect();

        let ranking = centrality
            .ranking()
            .into_iter()
            .map(|score| RankedNode {
                id: score.id.clone(),
                centrality: round(score.betweenness, 4),
                weighted_degree: round(score.weighted_degree, 4),
            })
            .collect();

        let similarity_sum = graph.edges().map(|edge| edge.weight).sum();
        Ok(Self::with_stats(nodes, links, ranking, detection.modularity, similarity_sum))
    }

    /// The node plus its direct neighbors and the links among them.
    /// Community, component and centrality values stay those of the full
    /// graph.
    pub fn ego_view(&self, id: &ProfileId) -> Option<Self> {
        if !self.nodes.iter().any(|node| &node.id == id) {
            return None;
        }

        let mut members: BTreeSet<&ProfileId> = BTreeSet::from([id]);
        for link in &self.links {
            if &link.source == id {
                members.insert(&link.target);
            } else if &link.target == id {
                members.insert(&link.source);
            }
        }

        let nodes = self
            .nodes
            .iter()
            .filter(|node| members.contains(&node.id))
            .cloned()
            .collect();
        let links: Vec<LinkView> = self
            .links
            .iter()
            .filter(|link| members.contains(&link.source) && members.contains(&link.target))
            .cloned()
            .collect();
        let ranking = self
            .ranking
            .iter()
            .filter(|ranked| members.contains(&ranked.id))
            .cloned()
            .collect();

        // Only the rounded link weights survive in a published response.
        let similarity_sum = links.iter().map(|link| link.weight).sum();
        Some(Self::with_stats(nodes, links, ranking, self.stats.modularity, similarity_sum))
    }

    /// `similarity_sum` is the total edge weight before any rounding.
    fn with_stats(
        nodes: Vec<NodeView>,
        links: Vec<LinkView>,
        ranking: Vec<RankedNode>,
        modularity: f64,
        similarity_sum: f64,
    ) -> Self {
        let mut connections: BTreeMap<ProfileId, usize> = nodes.iter().map(|node| (node.id.clone(), 0)).collect();
        for link in &links {
            for end in [&link.source, &link.target] {
                if let Some(count) = connections.get_mut(end) {
                    *count += 1;
                }
            }
        }

        let mean_similarity = if links.is_empty() {
            None
        } else {
            Some(similarity_sum / links.len() as f64)
        };
        let average_similarity = mean_similarity.map(|mean| round(mean, 4));
        let average_connections = if nodes.is_empty() {
            0.0
        } else {
            round(2.0 * links.len() as f64 / nodes.len() as f64, 4)
        };

        let stats = GraphStats {
            node_count: nodes.len(),
            edge_count: links.len(),
            community_count: nodes.iter().map(|node| node.community).collect::<BTreeSet<_>>().len(),
            component_count: nodes.iter().map(|node| node.component).collect::<BTreeSet<_>>().len(),
            modularity: round(modularity, 6),
            average_similarity,
            average_similarity_pct: mean_similarity.map_or(0.0, |mean| round(mean * 100.0, 2)),
            average_connections,
            connections,
        };

        Self {
            nodes,
            links,
            ranking,
            stats,
        }
    }
}

fn round(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::centrality::analyze;
    use crate::community::Louvain;
    use crate::graph::{GraphEdge, GraphNode};

    fn respond(ids: &[&str], edges: &[(&str, &str, f64)]) -> GraphResponse {
        let nodes = ids
            .iter()
            .map(|id| GraphNode {
                id: (*id).into(),
                label: id.to_uppercase(),
                group: "Design".to_string(),
            })
            .collect();
        let edges = edges
            .iter()
            .map(|&(s, t, w)| GraphEdge {
                source: s.into(),
                target: t.into(),
                weight: w,
                reason: Dimension::Music,
            })
            .collect();
        let graph = CompatibilityGraph::from_parts(nodes, edges).unwrap();
        let token = CancellationToken::new();
        let detection = Louvain::default().detect(&graph, &token).unwrap();
        let centrality = analyze(&graph, &token).unwrap();
        GraphResponse::assemble(&graph, &detection, &centrality).unwrap()
    }

    #[test]
    fn test_single_node_payload() {
        let response = respond(&["a"], &[]);
        assert_eq!(response.nodes.len(), 1);
        assert!(response.links.is_empty());
        assert_eq!(response.stats.community_count, 1);
        assert_eq!(response.stats.average_similarity, None);
        assert_eq!(response.stats.average_similarity_pct, 0.0);
        assert_eq!(response.stats.connections.get(&"a".into()), Some(&0));
    }

    #[test]
    fn test_stats_summarize_links() {
        let response = respond(&["a", "b", "c", "d"], &[("a", "b", 0.4), ("b", "c", 0.6)]);
        let stats = &response.stats;
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.component_count, 2);
        assert_eq!(stats.average_similarity, Some(0.5));
        assert_eq!(stats.average_similarity_pct, 50.0);
        assert_eq!(stats.average_connections, 1.0);
        assert_eq!(stats.connections.get(&"b".into()), Some(&2));
        assert_eq!(response.ranking[0].id, ProfileId::from("b"));

        let d = response.nodes.iter().find(|n| n.id.as_str() == "d").unwrap();
        assert_eq!(d.connections, 0);
        assert_eq!(d.label, "D");
    }

    #[test]
    fn test_weights_are_rounded() {
        let response = respond(&["a", "b"], &[("a", "b", 0.416666666)]);
        assert_eq!(response.links[0].weight, 0.4167);
    }

    #[test]
    fn test_average_similarity_rounds_once() {
        let response = respond(
            &["a", "b", "c", "d"],
            &[("a", "b", 0.10004), ("b", "c", 0.10004), ("c", "d", 0.10009)],
        );
        let weights: Vec<f64> = response.links.iter().map(|link| link.weight).collect();
        assert_eq!(weights, vec![0.1, 0.1, 0.1001]);
        assert_eq!(response.stats.average_similarity, Some(0.1001));
        assert_eq!(response.stats.average_similarity_pct, 10.01);
    }

    #[test]
    fn test_ego_view_keeps_neighbors_only() {
        let response = respond(
            &["a", "b", "c", "d", "e"],
            &[("a", "b", 0.5), ("a", "c", 0.5), ("b", "c", 0.5), ("c", "d", 0.5), ("d", "e", 0.5)],
        );
        let ego = response.ego_view(&"a".into()).unwrap();
        let ids: Vec<&str> = ego.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(ego.links.len(), 3);
        assert_eq!(ego.stats.node_count, 3);
        assert_eq!(ego.stats.connections.get(&"c".into()), Some(&2));
        assert_eq!(ego.ranking.len(), 3);

        let c = ego.nodes.iter().find(|n| n.id.as_str() == "c").unwrap();
        assert_eq!(c.connections, 3);

        assert!(response.ego_view(&"zz".into()).is_none());
    }

    #[test]
    fn test_missing_community_is_fatal() {
        let graph = CompatibilityGraph::from_parts(
            vec![GraphNode {
                id: "a".into(),
                label: "A".to_string(),
                group: "Law".to_string(),
            }],
            vec![],
        )
        .unwrap();
        let token = CancellationToken::new();
        let detection = Louvain::default().detect(&CompatibilityGraph::default(), &token).unwrap();
        let centrality = analyze(&graph, &token).unwrap();
        assert!(matches!(
            GraphResponse::assemble(&graph, &detection, &centrality),
            Err(ConnectError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_payload_serializes_for_the_front_end() {
        let response = respond(&["a", "b"], &[("a", "b", 0.5)]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["links"][0]["source"], "a");
        assert_eq!(json["links"][0]["reason"], "music");
        assert_eq!(json["nodes"][0]["group"], "Design");
        assert!(json["stats"]["average_similarity"].is_number());

        let empty = serde_json::to_value(GraphResponse::empty()).unwrap();
        assert!(empty["stats"]["average_similarity"].is_null());
    }
}
