//! Graph composition: base graph + visible branch payloads -> rendered graph.
//!
//! Composition is pure. Given the same base graph, cache contents and branch
//! states it produces the same output, element for element. Elements are
//! de-duplicated by id; the first contribution wins.
//!
//! Branches are visited breadth-first over decision nodes in output order,
//! starting with the base graph's decisions. A visible branch only
//! contributes when its owning decision is itself part of the output, so a
//! nested branch disappears together with its hidden parent and the result
//! never depends on the order in which fetches completed.

use crate::domain::cache::BranchCache;
use crate::domain::edge::Edge;
use crate::domain::graph::{BranchPayload, CallFlowGraph, GraphMetadata};
use crate::domain::ids::BranchId;
use crate::domain::lifecycle::{BranchLifecycle, BranchState};
use crate::domain::node::{DecisionId, DecisionNode, Node, ReturnNode, SourceLocation};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Branch descriptor as rendered, with flags derived from the lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BranchView {
    pub branch_id: BranchId,
    pub label: String,
    pub is_expanded: bool,
    pub is_loaded: bool,
    pub is_loading: bool,
    /// Last fetch failure for this branch, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComposedDecision {
    pub id: DecisionId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    pub branches: Vec<BranchView>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompositionStats {
    pub base_elements: usize,
    pub branch_elements: usize,
    /// Contributions dropped because their id was already present
    pub duplicates_skipped: usize,
    /// Branches whose payload was merged, in visitation order
    pub included_branches: Vec<BranchId>,
    /// Visible branches left out because their decision is not rendered
    pub detached_branches: Vec<BranchId>,
    /// Ids the session has seen reused for different content
    pub id_collisions: usize,
}

/// The graph handed to the renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComposedGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub decision_nodes: Vec<ComposedDecision>,
    pub return_nodes: Vec<ReturnNode>,
    pub metadata: GraphMetadata,
    pub stats: CompositionStats,
}

impl ComposedGraph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edges.iter().any(|e| e.id == id)
    }

    pub fn decision(&self, id: &str) -> Option<&ComposedDecision> {
        self.decision_nodes.iter().find(|d| d.id == id)
    }

    pub fn branch(&self, branch: &str) -> Option<&BranchView> {
        self.decision_nodes
            .iter()
            .flat_map(|d| d.branches.iter())
            .find(|b| b.branch_id.as_str() == branch)
    }
}

/// Working sets keyed by id, preserving first-seen order
#[derive(Default)]
struct Working<'a> {
    nodes: Vec<&'a Node>,
    edges: Vec<&'a Edge>,
    decisions: Vec<&'a DecisionNode>,
    returns: Vec<&'a ReturnNode>,
    node_ids: HashSet<&'a str>,
    edge_ids: HashSet<&'a str>,
    decision_ids: HashSet<&'a str>,
    return_ids: HashSet<&'a str>,
    added: usize,
    skipped: usize,
}

impl<'a> Working<'a> {
    fn union(
        &mut self,
        nodes: &'a [Node],
        edges: &'a [Edge],
        decisions: &'a [DecisionNode],
        returns: &'a [ReturnNode],
    ) {
        for n in nodes {
            if self.node_ids.insert(&n.id) {
                self.nodes.push(n);
                self.added += 1;
            } else {
                self.skipped += 1;
            }
        }
        for e in edges {
            if self.edge_ids.insert(&e.id) {
                self.edges.push(e);
                self.added += 1;
            } else {
                self.skipped += 1;
            }
        }
        for d in decisions {
            if self.decision_ids.insert(&d.id) {
                self.decisions.push(d);
                self.added += 1;
            } else {
                self.skipped += 1;
            }
        }
        for r in returns {
            if self.return_ids.insert(&r.id) {
                self.returns.push(r);
                self.added += 1;
            } else {
                self.skipped += 1;
            }
        }
    }

    fn union_payload(&mut self, payload: &'a BranchPayload) {
        self.union(
            &payload.nodes,
            &payload.edges,
            &payload.decision_nodes,
            &payload.return_nodes,
        );
    }
}

/// Derive the rendered graph.
///
/// `errors` carries the per-branch failure indicators of the session; they are
/// copied onto the matching `BranchView`s.
pub fn compose(
    base: &CallFlowGraph,
    cache: &BranchCache,
    lifecycle: &BranchLifecycle,
    errors: &HashMap<BranchId, String>,
) -> ComposedGraph {
    let mut w = Working::default();
    w.union(
        &base.nodes,
        &base.edges,
        &base.decision_nodes,
        &base.return_nodes,
    );
    let base_elements = w.added;

    let mut included: Vec<BranchId> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut cursor = 0;
    while cursor < w.decisions.len() {
        let decision = w.decisions[cursor];
        cursor += 1;

        for branch in decision.branch_ids() {
            if !lifecycle.is_visible(branch.as_str()) || !visited.insert(branch.as_str()) {
                continue;
            }
            let Some(payload) = cache.get(branch.as_str()) else {
                debug_assert!(false, "visible branch {branch} has no cache entry");
                continue;
            };
            w.union_payload(payload);
            included.push(branch.clone());
        }
    }

    let detached_branches = lifecycle
        .records()
        .iter()
        .filter(|r| {
            matches!(r.state, BranchState::Loaded { visible: true })
                && !visited.contains(r.branch_id.as_str())
        })
        .map(|r| r.branch_id.clone())
        .collect();

    let decision_nodes = w
        .decisions
        .iter()
        .map(|d| ComposedDecision {
            id: d.id.clone(),
            label: d.label.clone(),
            location: d.location.clone(),
            branches: d
                .branches
                .iter()
                .map(|b| {
                    let state = lifecycle.state(b.branch_id.as_str());
                    BranchView {
                        branch_id: b.branch_id.clone(),
                        label: b.label.clone(),
                        is_expanded: matches!(state, Some(BranchState::Loaded { visible: true })),
                        is_loaded: matches!(state, Some(BranchState::Loaded { .. })),
                        is_loading: matches!(state, Some(BranchState::Loading(_))),
                        error: errors.get(b.branch_id.as_str()).cloned(),
                    }
                })
                .collect(),
        })
        .collect();

    ComposedGraph {
        nodes: w.nodes.iter().map(|&n| n.clone()).collect(),
        edges: w.edges.iter().map(|&e| e.clone()).collect(),
        decision_nodes,
        return_nodes: w.returns.iter().map(|&r| r.clone()).collect(),
        metadata: base.metadata.clone(),
        stats: CompositionStats {
            base_elements,
            branch_elements: w.added - base_elements,
            duplicates_skipped: w.skipped,
            included_branches: included,
            detached_branches,
            id_collisions: 0,
        },
    }
}
