//! Graph fixtures shared by integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use branchflow::app::engine::{CallFlowEngine, EngineConfig};
use branchflow::domain::edge::Edge;
use branchflow::domain::graph::{BranchPayload, CallFlowGraph};
use branchflow::domain::node::{DecisionNode, Node, NodeKind, ReturnNode};
use branchflow::domain::ports::CallFlowRequest;

use super::mock::ScriptedService;

pub const FILE: &str = "app/service.py";

/// `handle` -> d1 { b1: "then", b2: "else" }
pub fn scenario_base() -> CallFlowGraph {
    CallFlowGraph {
        nodes: vec![Node::new("root", NodeKind::Function, "handle").with_location(FILE, 10)],
        edges: vec![Edge::new("e0", "root", "d1")],
        decision_nodes: vec![DecisionNode::new("d1", [("b1", "then"), ("b2", "else")])],
        return_nodes: vec![ReturnNode::new("ret")],
        ..Default::default()
    }
}

/// `{newNodes:[n1,n2], newEdges:[e1]}`
pub fn payload_b1() -> BranchPayload {
    BranchPayload {
        nodes: vec![
            Node::new("n1", NodeKind::Function, "validate"),
            Node::new("n2", NodeKind::Function, "persist"),
        ],
        edges: vec![Edge::new("e1", "n1", "n2")],
        ..Default::default()
    }
}

/// Calls `n3` and the shared `n7`, and opens nested decision d2 { b3 }
pub fn payload_b2() -> BranchPayload {
    BranchPayload {
        nodes: vec![
            Node::new("n3", NodeKind::Function, "reject"),
            Node::new("n7", NodeKind::Function, "audit"),
        ],
        edges: vec![Edge::new("e3", "d1", "n3"), Edge::new("e7a", "n3", "n7")],
        decision_nodes: vec![DecisionNode::new("d2", [("b3", "retry")])],
        ..Default::default()
    }
}

/// Nested under d2; also reaches the shared `n7`
pub fn payload_b3() -> BranchPayload {
    BranchPayload {
        nodes: vec![
            Node::new("n4", NodeKind::Function, "backoff"),
            Node::new("n7", NodeKind::Function, "audit"),
        ],
        edges: vec![Edge::new("e4", "d2", "n4"), Edge::new("e7b", "n4", "n7")],
        ..Default::default()
    }
}

/// `other` -> d9 { b1 } where b1 has different content than in `handle`
pub fn other_base() -> CallFlowGraph {
    CallFlowGraph {
        nodes: vec![Node::new("o-root", NodeKind::Function, "other")],
        decision_nodes: vec![DecisionNode::new("d9", [("b1", "case a")])],
        ..Default::default()
    }
}

pub fn other_payload_b1() -> BranchPayload {
    BranchPayload {
        nodes: vec![Node::new("o1", NodeKind::Method, "fresh")],
        ..Default::default()
    }
}

pub fn scripted_service() -> ScriptedService {
    ScriptedService::new()
        .with_function("handle", scenario_base())
        .with_payload("handle", "b1", payload_b1())
        .with_payload("handle", "b2", payload_b2())
        .with_payload("handle", "b3", payload_b3())
        .with_function("other", other_base())
        .with_payload("other", "b1", other_payload_b1())
}

pub fn request(function: &str) -> CallFlowRequest {
    CallFlowRequest {
        file_path: FILE.to_string(),
        function_name: function.to_string(),
        max_depth: 5,
        class_name: None,
        include_external: false,
    }
}

pub fn engine_with(service: Arc<ScriptedService>) -> CallFlowEngine {
    CallFlowEngine::with_source(
        EngineConfig {
            source: "scripted".to_string(),
            ..Default::default()
        },
        service,
    )
}

/// Engine with `handle` already selected
pub async fn selected_engine() -> (CallFlowEngine, Arc<ScriptedService>) {
    let service = Arc::new(scripted_service());
    let engine = engine_with(service.clone());
    engine
        .select_function(request("handle"))
        .await
        .unwrap()
        .expect("selection is current");
    (engine, service)
}

/// Fixture file contents for the CLI and fixture adapter
pub fn fixture_json() -> serde_json::Value {
    serde_json::json!({
        "functions": [{
            "filePath": FILE,
            "functionName": "handle",
            "graph": scenario_base(),
            "branches": {
                "b1": payload_b1(),
                "b2": payload_b2(),
                "b3": payload_b3(),
            }
        }]
    })
}
