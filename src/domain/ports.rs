use crate::domain::graph::{BranchExpansion, CallFlowGraph};
use crate::domain::ids::BranchId;
use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Initial call-flow query: which function to visualize and how deep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallFlowRequest {
    pub file_path: String,
    pub function_name: String,
    pub max_depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default)]
    pub include_external: bool,
}

/// Branch-expand query, scoped by the session's call-flow request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchExpandRequest {
    pub file_path: String,
    pub function_name: String,
    pub max_depth: u32,
    #[serde(default)]
    pub include_external: bool,
    pub branch_id: BranchId,
}

impl CallFlowRequest {
    pub fn expand(&self, branch_id: BranchId) -> BranchExpandRequest {
        BranchExpandRequest {
            file_path: self.file_path.clone(),
            function_name: self.function_name.clone(),
            max_depth: self.max_depth,
            include_external: self.include_external,
            branch_id,
        }
    }
}

/// Call-flow query service port (implemented by adapters)
#[async_trait]
pub trait CallFlowSource: Send + Sync {
    async fn call_flow(&self, request: &CallFlowRequest) -> Result<CallFlowGraph>;
}

/// Branch-expand query service port
#[async_trait]
pub trait BranchExpander: Send + Sync {
    async fn expand(&self, request: &BranchExpandRequest) -> Result<BranchExpansion>;
}
