use crate::app::dto::*;
use crate::app::engine::CallFlowEngine;
use rmcp::{
    Json, ServerHandler, ServiceExt, handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters, model::*, tool, tool_handler, tool_router,
    transport::stdio,
};

#[derive(Clone)]
pub struct BranchflowMcpServer {
    engine: CallFlowEngine,
    tool_router: ToolRouter<Self>,
}

impl BranchflowMcpServer {
    pub fn new(engine: CallFlowEngine) -> Self {
        Self {
            engine,
            tool_router: Self::tool_router(),
        }
    }

    pub async fn serve_stdio(self) -> anyhow::Result<()> {
        let service = self.serve(stdio()).await?;
        service.waiting().await?;
        Ok(())
    }
}

#[tool_router]
impl BranchflowMcpServer {
    #[tool(
        description = "Select a function and load its base call-flow graph. Starts a new session; all branches begin collapsed."
    )]
    async fn select_function(
        &self,
        params: Parameters<SelectFunctionRequest>,
    ) -> Result<Json<GraphResponse>, String> {
        let request = self.engine.request_from(params.0);
        match self.engine.select_function(request).await {
            Ok(Some(res)) => Ok(Json(res)),
            Ok(None) => Err("selection superseded by a newer request".to_string()),
            Err(e) => Err(format!("{e:#}")),
        }
    }

    #[tool(
        description = "Expand or collapse one branch of a decision node. The first expansion fetches the branch from the analysis service."
    )]
    async fn toggle_branch(
        &self,
        params: Parameters<ToggleRequest>,
    ) -> Result<Json<ToggleResponse>, String> {
        self.engine
            .toggle_branch(params.0.branch_id.as_str())
            .await
            .map(Json)
            .map_err(|e| e.to_string())
    }

    #[tool(description = "Return the currently composed call-flow graph.")]
    async fn composed_graph(&self) -> Result<Json<GraphResponse>, String> {
        self.engine
            .graph()
            .map(Json)
            .ok_or_else(|| "no function selected".to_string())
    }

    #[tool(description = "Report the lifecycle state of every known branch in the session.")]
    async fn session_status(&self) -> Result<Json<StatusResponse>, String> {
        self.engine
            .status()
            .map(Json)
            .ok_or_else(|| "no function selected".to_string())
    }
}

#[tool_handler]
impl ServerHandler for BranchflowMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Explore a function's call flow. Select a function, then expand decision branches on demand."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fixture::source::{Fixture, FixtureSource, FunctionFixture};
    use crate::app::engine::EngineConfig;
    use crate::domain::graph::{BranchPayload, CallFlowGraph};
    use crate::domain::node::{DecisionNode, Node, NodeKind};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn make_engine() -> CallFlowEngine {
        let mut branches = HashMap::new();
        branches.insert(
            "b1".to_string(),
            BranchPayload {
                nodes: vec![Node::new("n1", NodeKind::Function, "helper")],
                ..Default::default()
            },
        );
        let fixture = Fixture {
            functions: vec![FunctionFixture {
                file_path: "app.py".into(),
                function_name: "main".into(),
                class_name: None,
                graph: CallFlowGraph {
                    nodes: vec![Node::new("root", NodeKind::Function, "main")],
                    decision_nodes: vec![DecisionNode::new("d1", [("b1", "then")])],
                    ..Default::default()
                },
                branches,
            }],
        };
        CallFlowEngine::with_source(EngineConfig::default(), Arc::new(FixtureSource::new(fixture)))
    }

    #[tokio::test]
    async fn test_mcp_tools_smoke() {
        let server = BranchflowMcpServer::new(make_engine());

        assert!(server.composed_graph().await.is_err());

        let selected = server
            .select_function(Parameters(SelectFunctionRequest {
                file_path: "app.py".into(),
                function_name: "main".into(),
                max_depth: None,
                class_name: None,
                include_external: None,
            }))
            .await
            .unwrap()
            .0;
        assert_eq!(selected.graph.nodes.len(), 1);

        let toggled = server
            .toggle_branch(Parameters(ToggleRequest {
                branch_id: "b1".into(),
            }))
            .await
            .unwrap()
            .0;
        assert_eq!(toggled.outcome, ToggleOutcome::Loaded { nested_branches: 0 });

        let graph = server.composed_graph().await.unwrap().0;
        assert_eq!(graph.graph.nodes.len(), 2);

        let status = server.session_status().await.unwrap().0;
        assert_eq!(status.cached_branches, 1);
        assert_eq!(status.request.max_depth, 5);

        assert!(
            server
                .toggle_branch(Parameters(ToggleRequest {
                    branch_id: "zz".into(),
                }))
                .await
                .is_err()
        );
    }
}
