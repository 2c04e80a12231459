use crate::domain::composer::ComposedGraph;
use crate::domain::ids::BranchId;
use crate::domain::lifecycle::{BranchPhase, LifecycleCounts};
use crate::domain::node::DecisionId;
use crate::domain::ports::CallFlowRequest;
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    pub source: String,
    pub session_version: Option<u64>,
    pub node_count: usize,
    pub edge_count: usize,
}

/// Select a function to visualize. Omitted options fall back to engine defaults.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectFunctionRequest {
    pub file_path: String,
    pub function_name: String,
    pub max_depth: Option<u32>,
    pub class_name: Option<String>,
    pub include_external: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub branch_id: BranchId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToggleOutcome {
    Shown,
    Hidden,
    /// A fetch for this branch was already in flight
    Coalesced,
    Loaded { nested_branches: usize },
    Failed { error: String },
    /// The session changed while the fetch was in flight
    Stale,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphResponse {
    pub session_version: u64,
    pub graph: ComposedGraph,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub branch_id: BranchId,
    pub outcome: ToggleOutcome,
    /// Composed graph after the toggle; absent once the session is gone
    pub graph: Option<ComposedGraph>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BranchOutcome {
    pub branch_id: BranchId,
    pub outcome: ToggleOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkResponse {
    pub branches: Vec<BranchOutcome>,
    pub graph: Option<ComposedGraph>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BranchStatus {
    pub branch_id: BranchId,
    pub decision_id: DecisionId,
    pub label: String,
    pub phase: BranchPhase,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub session_version: u64,
    pub request: CallFlowRequest,
    pub counts: LifecycleCounts,
    pub cached_branches: usize,
    pub id_collisions: usize,
    pub branches: Vec<BranchStatus>,
}
