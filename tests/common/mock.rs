//! Scripted analysis service for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use branchflow::domain::graph::{BranchExpansion, BranchPayload, CallFlowGraph};
use branchflow::domain::ids::BranchId;
use branchflow::domain::ports::{
    BranchExpandRequest, BranchExpander, CallFlowRequest, CallFlowSource,
};
use tokio::sync::Notify;

/// Holds a query until the test releases it.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    /// Wait until the query has reached the gate
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

/// In-memory service answering both queries from scripted data, with
/// per-branch fetch counters, failure injection and gated completions.
#[derive(Default)]
pub struct ScriptedService {
    bases: Mutex<HashMap<String, CallFlowGraph>>,
    payloads: Mutex<HashMap<(String, String), BranchPayload>>,
    failures: Mutex<HashMap<String, usize>>,
    wrong_ids: Mutex<HashMap<String, String>>,
    base_gates: Mutex<HashMap<String, Arc<Gate>>>,
    branch_gates: Mutex<HashMap<String, Arc<Gate>>>,
    expand_log: Mutex<Vec<BranchExpandRequest>>,
    call_flow_calls: AtomicUsize,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(self, function: &str, graph: CallFlowGraph) -> Self {
        self.bases.lock().unwrap().insert(function.to_string(), graph);
        self
    }

    pub fn with_payload(self, function: &str, branch: &str, payload: BranchPayload) -> Self {
        self.payloads
            .lock()
            .unwrap()
            .insert((function.to_string(), branch.to_string()), payload);
        self
    }

    /// The next `times` fetches of `branch` fail
    pub fn fail_next(&self, branch: &str, times: usize) {
        self.failures
            .lock()
            .unwrap()
            .insert(branch.to_string(), times);
    }

    /// Answer fetches of `branch` as if `other` had been requested
    pub fn answer_as(&self, branch: &str, other: &str) {
        self.wrong_ids
            .lock()
            .unwrap()
            .insert(branch.to_string(), other.to_string());
    }

    /// Hold the next base-graph query for `function` until released
    pub fn gate_function(&self, function: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.base_gates
            .lock()
            .unwrap()
            .insert(function.to_string(), gate.clone());
        gate
    }

    /// Hold the next fetch of `branch` until released
    pub fn gate_branch(&self, branch: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.branch_gates
            .lock()
            .unwrap()
            .insert(branch.to_string(), gate.clone());
        gate
    }

    pub fn fetch_count(&self, branch: &str) -> usize {
        self.expand_log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.branch_id.as_str() == branch)
            .count()
    }

    pub fn total_fetches(&self) -> usize {
        self.expand_log.lock().unwrap().len()
    }

    pub fn expand_requests(&self) -> Vec<BranchExpandRequest> {
        self.expand_log.lock().unwrap().clone()
    }

    pub fn call_flow_count(&self) -> usize {
        self.call_flow_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallFlowSource for ScriptedService {
    async fn call_flow(&self, request: &CallFlowRequest) -> Result<CallFlowGraph> {
        self.call_flow_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self
            .base_gates
            .lock()
            .unwrap()
            .remove(&request.function_name);
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.bases
            .lock()
            .unwrap()
            .get(&request.function_name)
            .cloned()
            .ok_or_else(|| anyhow!("Function not found: {}", request.function_name))
    }
}

#[async_trait]
impl BranchExpander for ScriptedService {
    async fn expand(&self, request: &BranchExpandRequest) -> Result<BranchExpansion> {
        let branch = request.branch_id.as_str().to_string();
        self.expand_log.lock().unwrap().push(request.clone());

        let gate = self.branch_gates.lock().unwrap().remove(&branch);
        if let Some(gate) = gate {
            gate.pass().await;
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(left) = failures.get_mut(&branch) {
                if *left > 0 {
                    *left -= 1;
                    return Err(anyhow!("analysis service unavailable"));
                }
            }
        }

        let payload = self
            .payloads
            .lock()
            .unwrap()
            .get(&(request.function_name.clone(), branch.clone()))
            .cloned()
            .ok_or_else(|| anyhow!("No payload for branch {branch}"))?;

        let answered = self
            .wrong_ids
            .lock()
            .unwrap()
            .get(&branch)
            .cloned()
            .unwrap_or(branch);

        Ok(BranchExpansion {
            expanded_branch_id: BranchId::new(answered),
            new_nodes: payload.nodes,
            new_edges: payload.edges,
            new_decision_nodes: payload.decision_nodes,
            new_return_nodes: payload.return_nodes,
        })
    }
}
