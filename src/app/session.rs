use crate::domain::cache::BranchCache;
use crate::domain::composer::{ComposedGraph, compose};
use crate::domain::error::IdError;
use crate::domain::graph::CallFlowGraph;
use crate::domain::ids::{BranchId, IdCollision, IdentifierSpace};
use crate::domain::lifecycle::BranchLifecycle;
use crate::domain::ports::CallFlowRequest;
use std::collections::HashMap;

/// One call-flow session: a base graph plus everything learned by expanding
/// its branches. Dropped as a whole when another function is selected.
#[derive(Debug)]
pub struct Session {
    version: u64,
    request: CallFlowRequest,
    base: CallFlowGraph,
    pub(crate) cache: BranchCache,
    pub(crate) lifecycle: BranchLifecycle,
    pub(crate) ids: IdentifierSpace,
    /// Transient per-branch failure indicators
    pub(crate) errors: HashMap<BranchId, String>,
    pub(crate) collisions: Vec<IdCollision>,
    next_seq: u64,
}

impl Session {
    /// Start a session from a freshly fetched base graph.
    ///
    /// Fails when two decisions of the base graph claim the same branch id.
    pub fn new(version: u64, request: CallFlowRequest, base: CallFlowGraph) -> Result<Self, IdError> {
        let mut ids = IdentifierSpace::new();
        let fresh = ids.register_decisions(&base.decision_nodes)?;
        let collisions = ids.observe_graph(&base);

        let mut lifecycle = BranchLifecycle::new();
        for decision in &base.decision_nodes {
            for branch in &decision.branches {
                if fresh.contains(&branch.branch_id) {
                    lifecycle.discover(
                        branch.branch_id.clone(),
                        decision.id.clone(),
                        branch.label.clone(),
                    );
                }
            }
        }

        Ok(Self {
            version,
            request,
            base,
            cache: BranchCache::new(),
            lifecycle,
            ids,
            errors: HashMap::new(),
            collisions,
            next_seq: 0,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn request(&self) -> &CallFlowRequest {
        &self.request
    }

    pub fn base(&self) -> &CallFlowGraph {
        &self.base
    }

    pub fn cache(&self) -> &BranchCache {
        &self.cache
    }

    pub fn lifecycle(&self) -> &BranchLifecycle {
        &self.lifecycle
    }

    pub fn error_for(&self, branch: &str) -> Option<&str> {
        self.errors.get(branch).map(String::as_str)
    }

    pub fn collisions(&self) -> &[IdCollision] {
        &self.collisions
    }

    pub(crate) fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    pub fn compose(&self) -> ComposedGraph {
        let mut graph = compose(&self.base, &self.cache, &self.lifecycle, &self.errors);
        graph.stats.id_collisions = self.collisions.len();
        graph
    }
}
