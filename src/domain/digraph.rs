use crate::domain::composer::ComposedGraph;
use crate::domain::edge::EdgeId;
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    Call,
    Decision,
    Return,
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: String,
    pub label: String,
    pub kind: VertexKind,
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.label.is_empty() { &self.id } else { &self.label };
        match self.kind {
            VertexKind::Call => write!(f, "{label}"),
            VertexKind::Decision => write!(f, "<{label}>"),
            VertexKind::Return => write!(f, "return {label}"),
        }
    }
}

/// Directed view of a composed graph, for traversal and DOT export
pub struct CallFlowDiGraph {
    pub graph: DiGraph<Vertex, String>,
    pub id_to_node: HashMap<String, NodeIndex>,
    /// Edges whose source or target is not rendered
    pub dangling_edges: Vec<EdgeId>,
}

impl CallFlowDiGraph {
    pub fn from_composed(composed: &ComposedGraph) -> Self {
        let mut graph = DiGraph::new();
        let mut id_to_node = HashMap::new();

        let vertices = composed
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n.label.as_str(), VertexKind::Call))
            .chain(
                composed
                    .decision_nodes
                    .iter()
                    .map(|d| (d.id.as_str(), d.label.as_str(), VertexKind::Decision)),
            )
            .chain(
                composed
                    .return_nodes
                    .iter()
                    .map(|r| (r.id.as_str(), r.label.as_str(), VertexKind::Return)),
            );
        for (id, label, kind) in vertices {
            if id_to_node.contains_key(id) {
                continue;
            }
            let idx = graph.add_node(Vertex {
                id: id.to_string(),
                label: label.to_string(),
                kind,
            });
            id_to_node.insert(id.to_string(), idx);
        }

        let mut dangling_edges = Vec::new();
        for edge in &composed.edges {
            match (id_to_node.get(&edge.source), id_to_node.get(&edge.target)) {
                (Some(&s), Some(&t)) => {
                    graph.add_edge(s, t, edge.label.clone().unwrap_or_default());
                }
                _ => dangling_edges.push(edge.id.clone()),
            }
        }

        Self {
            graph,
            id_to_node,
            dangling_edges,
        }
    }

    pub fn get_node_by_id(&self, id: &str) -> Option<NodeIndex> {
        self.id_to_node.get(id).copied()
    }

    pub fn to_dot(&self) -> String {
        format!("{}", Dot::new(&self.graph))
    }
}

impl ComposedGraph {
    pub fn to_digraph(&self) -> CallFlowDiGraph {
        CallFlowDiGraph::from_composed(self)
    }

    /// Graphviz DOT rendering
    pub fn to_dot(&self) -> String {
        self.to_digraph().to_dot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::composer::ComposedGraph;
    use crate::domain::edge::Edge;
    use crate::domain::node::{Node, NodeKind, ReturnNode};

    fn composed() -> ComposedGraph {
        ComposedGraph {
            nodes: vec![
                Node::new("n1", NodeKind::Function, "main"),
                Node::new("n2", NodeKind::ExternalCall, "print"),
            ],
            edges: vec![
                Edge::new("e1", "n1", "n2").labeled("print"),
                Edge::new("e2", "n2", "r1"),
                Edge::new("e3", "n2", "ghost"),
            ],
            return_nodes: vec![ReturnNode::new("r1")],
            ..Default::default()
        }
    }

    #[test]
    fn test_from_composed_counts_dangling_edges() {
        let g = CallFlowDiGraph::from_composed(&composed());
        assert_eq!(g.graph.node_count(), 3);
        assert_eq!(g.graph.edge_count(), 2);
        assert_eq!(g.dangling_edges, vec!["e3".to_string()]);
    }

    #[test]
    fn test_dot_export() {
        let g = composed().to_digraph();
        assert_eq!(g.get_node_by_id("r1").map(|i| g.graph[i].kind), Some(VertexKind::Return));

        let dot = g.to_dot();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("print"));
    }
}
