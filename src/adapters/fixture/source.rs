use crate::domain::graph::{BranchExpansion, BranchPayload, CallFlowGraph};
use crate::domain::ports::{BranchExpandRequest, BranchExpander, CallFlowRequest, CallFlowSource};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Recorded analyzer output: base graphs and branch payloads per function
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    pub functions: Vec<FunctionFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionFixture {
    pub file_path: String,
    pub function_name: String,
    #[serde(default)]
    pub class_name: Option<String>,
    pub graph: CallFlowGraph,
    #[serde(default)]
    pub branches: HashMap<String, BranchPayload>,
}

/// Serves both collaborator queries from a fixture file
pub struct FixtureSource {
    fixture: Fixture,
}

impl FixtureSource {
    pub fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {}", path.display()))?;
        let fixture: Fixture = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fixture JSON: {}", path.display()))?;
        Ok(Self::new(fixture))
    }

    pub fn functions(&self) -> &[FunctionFixture] {
        &self.fixture.functions
    }

    fn find(&self, file_path: &str, function_name: &str) -> Option<&FunctionFixture> {
        self.fixture
            .functions
            .iter()
            .find(|f| f.file_path == file_path && f.function_name == function_name)
    }
}

#[async_trait]
impl CallFlowSource for FixtureSource {
    async fn call_flow(&self, request: &CallFlowRequest) -> Result<CallFlowGraph> {
        let function = self
            .fixture
            .functions
            .iter()
            .find(|f| {
                f.file_path == request.file_path
                    && f.function_name == request.function_name
                    && (request.class_name.is_none() || f.class_name == request.class_name)
            })
            .ok_or_else(|| {
                anyhow!(
                    "Function not found: {}::{}",
                    request.file_path,
                    request.function_name
                )
            })?;

        let mut graph = function.graph.clone();
        graph.metadata.max_depth = Some(request.max_depth);
        if !request.include_external {
            let external: Vec<String> = graph
                .nodes
                .iter()
                .filter(|n| n.is_external())
                .map(|n| n.id.clone())
                .collect();
            graph.nodes.retain(|n| !n.is_external());
            graph
                .edges
                .retain(|e| !external.contains(&e.source) && !external.contains(&e.target));
        }
        graph.metadata.external_call_count = function
            .graph
            .nodes
            .iter()
            .filter(|n| n.is_external())
            .count() as u32;
        Ok(graph)
    }
}

#[async_trait]
impl BranchExpander for FixtureSource {
    async fn expand(&self, request: &BranchExpandRequest) -> Result<BranchExpansion> {
        let function = self
            .find(&request.file_path, &request.function_name)
            .ok_or_else(|| {
                anyhow!(
                    "Function not found: {}::{}",
                    request.file_path,
                    request.function_name
                )
            })?;
        let payload = function
            .branches
            .get(request.branch_id.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("No recorded payload for branch {}", request.branch_id))?;

        Ok(BranchExpansion {
            expanded_branch_id: request.branch_id.clone(),
            new_nodes: payload.nodes,
            new_edges: payload.edges,
            new_decision_nodes: payload.decision_nodes,
            new_return_nodes: payload.return_nodes,
        })
    }
}
