use crate::domain::ids::BranchId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Identifier of a call-flow node (unique within one session)
pub type NodeId = String;

/// Identifier of a decision node
pub type DecisionId = String;

/// Identifier of a return node
pub type ReturnId = String;

/// Node kind as reported by the analyzer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Function,
    Method,
    #[serde(alias = "external", alias = "external_call")]
    ExternalCall,
    Class,
    Module,
    #[serde(other)]
    Other,
}

/// Source location of a definition or call site
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

/// Call-flow node. Immutable once produced by a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    #[serde(default)]
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
}

/// One outcome path of a decision, as delivered by the analyzer.
///
/// The analyzer also sends `isExpanded`/`isLoaded` flags; they are accepted on
/// input but never trusted. Visibility is always re-derived from the lifecycle
/// when a graph is composed (see `BranchView`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BranchDescriptor {
    pub branch_id: BranchId,
    pub label: String,
}

/// Conditional point with one or more branches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionNode {
    pub id: DecisionId,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    pub branches: Vec<BranchDescriptor>,
}

/// Terminal marker for a call path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnNode {
    pub id: ReturnId,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            id: id.into(),
            kind,
            qualified_name: label.clone(),
            label,
            location: None,
            docstring: None,
        }
    }

    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.location = Some(SourceLocation {
            file: file.into(),
            line,
        });
        self
    }

    pub fn is_external(&self) -> bool {
        matches!(self.kind, NodeKind::ExternalCall)
    }
}

impl DecisionNode {
    pub fn new<I, B, L>(id: impl Into<DecisionId>, branches: I) -> Self
    where
        I: IntoIterator<Item = (B, L)>,
        B: Into<BranchId>,
        L: Into<String>,
    {
        Self {
            id: id.into(),
            label: String::new(),
            location: None,
            branches: branches
                .into_iter()
                .map(|(branch_id, label)| BranchDescriptor {
                    branch_id: branch_id.into(),
                    label: label.into(),
                })
                .collect(),
        }
    }

    pub fn branch_ids(&self) -> impl Iterator<Item = &BranchId> {
        self.branches.iter().map(|b| &b.branch_id)
    }
}

impl ReturnNode {
    pub fn new(id: impl Into<ReturnId>) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            location: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_accepts_analyzer_spellings() {
        let k: NodeKind = serde_json::from_str("\"external-call\"").unwrap();
        assert_eq!(k, NodeKind::ExternalCall);
        let k: NodeKind = serde_json::from_str("\"external\"").unwrap();
        assert_eq!(k, NodeKind::ExternalCall);
        let k: NodeKind = serde_json::from_str("\"lambda\"").unwrap();
        assert_eq!(k, NodeKind::Other);
    }

    #[test]
    fn test_decision_node_ignores_incoming_flags() {
        let json = r#"{
            "id": "d1",
            "branches": [
                {"branchId": "b1", "label": "if x", "isExpanded": true, "isLoaded": true}
            ]
        }"#;
        let d: DecisionNode = serde_json::from_str(json).unwrap();
        assert_eq!(d.branches.len(), 1);
        assert_eq!(d.branches[0].branch_id.as_str(), "b1");
    }
}
