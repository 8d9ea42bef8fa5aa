//! Node/edge projection of a resolved issue store.
//!
//! The element shapes follow cytoscape's `{nodes: [{data}], edges: [{data}]}`
//! layout so the JSON can be handed to the renderer as is.

use crate::domain::Issue;
use crate::icons::{icon_for, IconMap};
use crate::store::IssueStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    pub id: String,
    /// Inline `data:` URI, empty for no icon.
    pub icon: String,
    pub summary: String,
    /// Display key shown as the node label.
    pub name: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeData {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub data: NodeData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub data: EdgeData,
}

/// Graph ready for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphElements {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphElements {
    pub fn add_node(&mut self, data: NodeData) {
        self.nodes.push(Node { data });
    }

    pub fn add_edge(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.edges.push(Edge {
            data: EdgeData {
                source: source.into(),
                target: target.into(),
            },
        });
    }

    pub fn node_ids(&self) -> HashSet<&str> {
        self.nodes.iter().map(|n| n.data.id.as_str()).collect()
    }

    /// Edges with an endpoint that is not a node. Empty for built graphs.
    pub fn dangling_edges(&self) -> Vec<&EdgeData> {
        let ids = self.node_ids();
        self.edges
            .iter()
            .map(|e| &e.data)
            .filter(|e| !ids.contains(e.source.as_str()) || !ids.contains(e.target.as_str()))
            .collect()
    }
}

/// Project `store` into nodes and edges.
///
/// One node per stored issue, in store order. One edge per link endpoint that
/// is stored: `inward -> owner` and `owner -> outward`. Links reported from
/// both ends yield one edge per end; no global deduplication happens.
pub fn build_graph(store: &IssueStore, icons: &IconMap, base_url: &str) -> GraphElements {
    let mut elements = GraphElements::default();

    for issue in store.all() {
        elements.add_node(node_data(issue, icons, base_url));

        for link in issue.links() {
            if let Some(inward) = link.inward_issue.as_ref().filter(|r| store.contains(&r.id)) {
                elements.add_edge(inward.id.as_str(), issue.id.as_str());
            }
            if let Some(outward) = link.outward_issue.as_ref().filter(|r| store.contains(&r.id)) {
                elements.add_edge(issue.id.as_str(), outward.id.as_str());
            }
        }
    }

    elements
}

fn node_data(issue: &Issue, icons: &IconMap, base_url: &str) -> NodeData {
    NodeData {
        id: issue.id.clone(),
        icon: icon_for(icons, issue).to_string(),
        summary: issue.summary().to_string(),
        name: issue.key.clone(),
        href: issue.browse_url(base_url),
    }
}
