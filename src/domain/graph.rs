use crate::domain::edge::Edge;
use crate::domain::ids::BranchId;
use crate::domain::node::{DecisionNode, Node, ReturnNode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Facts about the initial call-flow query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    /// True when the analyzer stopped at `max_depth`
    #[serde(default, alias = "maxDepthReached")]
    pub depth_truncated: bool,
    #[serde(default)]
    pub external_call_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    /// Analyzer-specific extras, passed through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Base graph - the call-flow subgraph returned for a selected function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFlowGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub decision_nodes: Vec<DecisionNode>,
    #[serde(default)]
    pub return_nodes: Vec<ReturnNode>,
    #[serde(default)]
    pub metadata: GraphMetadata,
}

/// Incremental subgraph rooted at a branch's taken path.
///
/// May contain nested decision nodes; their branches start out unloaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchPayload {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub decision_nodes: Vec<DecisionNode>,
    #[serde(default)]
    pub return_nodes: Vec<ReturnNode>,
}

/// Branch-expand query result as sent by the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchExpansion {
    pub expanded_branch_id: BranchId,
    #[serde(default)]
    pub new_nodes: Vec<Node>,
    #[serde(default)]
    pub new_edges: Vec<Edge>,
    #[serde(default)]
    pub new_decision_nodes: Vec<DecisionNode>,
    #[serde(default)]
    pub new_return_nodes: Vec<ReturnNode>,
}

impl CallFlowGraph {
    pub fn element_count(&self) -> usize {
        self.nodes.len() + self.edges.len() + self.decision_nodes.len() + self.return_nodes.len()
    }
}

impl BranchPayload {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.edges.is_empty()
            && self.decision_nodes.is_empty()
            && self.return_nodes.is_empty()
    }
}

impl From<BranchExpansion> for BranchPayload {
    fn from(e: BranchExpansion) -> Self {
        Self {
            nodes: e.new_nodes,
            edges: e.new_edges,
            decision_nodes: e.new_decision_nodes,
            return_nodes: e.new_return_nodes,
        }
    }
}
