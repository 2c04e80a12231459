//! Identifier space of one call-flow session.
//!
//! Node, edge, decision and return ids share a single namespace. The same id
//! showing up in two payloads with identical content is fan-in and refers to
//! one entity; the same id with different content is a collision.

use crate::domain::edge::Edge;
use crate::domain::error::IdError;
use crate::domain::graph::{BranchPayload, CallFlowGraph};
use crate::domain::node::{DecisionId, DecisionNode, Node, ReturnNode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

/// Opaque branch identifier, scoped to one session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct BranchId(String);

impl BranchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for BranchId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BranchId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BranchId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Element kind within the shared id namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Node,
    Edge,
    Decision,
    Return,
}

/// An id reused for a different entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCollision {
    pub id: String,
    pub first: ElementKind,
    pub second: ElementKind,
}

#[derive(Debug, Clone, PartialEq)]
enum Element {
    Node(Node),
    Edge(Edge),
    Decision(DecisionNode),
    Return(ReturnNode),
}

impl Element {
    fn kind(&self) -> ElementKind {
        match self {
            Element::Node(_) => ElementKind::Node,
            Element::Edge(_) => ElementKind::Edge,
            Element::Decision(_) => ElementKind::Decision,
            Element::Return(_) => ElementKind::Return,
        }
    }
}

#[derive(Debug, Default)]
pub struct IdentifierSpace {
    branch_owner: HashMap<BranchId, DecisionId>,
    elements: HashMap<String, Element>,
}

impl IdentifierSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the branch ids of `decisions` for their owning decisions.
    ///
    /// Returns the branch ids seen for the first time, in descriptor order.
    /// Nothing is recorded when any branch id is already owned by another decision.
    pub fn register_decisions<'a, I>(&mut self, decisions: I) -> Result<Vec<BranchId>, IdError>
    where
        I: IntoIterator<Item = &'a DecisionNode>,
    {
        let mut pending: Vec<(BranchId, DecisionId)> = Vec::new();

        for decision in decisions {
            for branch in decision.branch_ids() {
                let owner = self
                    .branch_owner
                    .get(branch)
                    .or_else(|| pending.iter().find(|(b, _)| b == branch).map(|(_, d)| d));
                match owner {
                    Some(owner) if *owner != decision.id => {
                        return Err(IdError::DuplicateBranchId {
                            branch: branch.clone(),
                            owner: owner.clone(),
                            other: decision.id.clone(),
                        });
                    }
                    Some(_) => {}
                    None => pending.push((branch.clone(), decision.id.clone())),
                }
            }
        }

        let fresh = pending.iter().map(|(b, _)| b.clone()).collect();
        self.branch_owner.extend(pending);
        Ok(fresh)
    }

    pub fn owner_of(&self, branch: &str) -> Option<&DecisionId> {
        self.branch_owner.get(branch)
    }

    /// Record every element of the base graph
    pub fn observe_graph(&mut self, graph: &CallFlowGraph) -> Vec<IdCollision> {
        self.observe(
            graph
                .nodes
                .iter()
                .cloned()
                .map(Element::Node)
                .chain(graph.edges.iter().cloned().map(Element::Edge))
                .chain(graph.decision_nodes.iter().cloned().map(Element::Decision))
                .chain(graph.return_nodes.iter().cloned().map(Element::Return)),
        )
    }

    /// Record every element of a branch payload
    pub fn observe_payload(&mut self, payload: &BranchPayload) -> Vec<IdCollision> {
        self.observe(
            payload
                .nodes
                .iter()
                .cloned()
                .map(Element::Node)
                .chain(payload.edges.iter().cloned().map(Element::Edge))
                .chain(payload.decision_nodes.iter().cloned().map(Element::Decision))
                .chain(payload.return_nodes.iter().cloned().map(Element::Return)),
        )
    }

    fn observe(&mut self, elements: impl Iterator<Item = Element>) -> Vec<IdCollision> {
        let mut collisions = Vec::new();
        for element in elements {
            let id = element_id(&element).to_string();
            match self.elements.get(&id) {
                Some(existing) if *existing == element => {}
                Some(existing) => collisions.push(IdCollision {
                    id,
                    first: existing.kind(),
                    second: element.kind(),
                }),
                None => {
                    self.elements.insert(id, element);
                }
            }
        }
        collisions
    }
}

fn element_id(element: &Element) -> &str {
    match element {
        Element::Node(n) => &n.id,
        Element::Edge(e) => &e.id,
        Element::Decision(d) => &d.id,
        Element::Return(r) => &r.id,
    }
}
