pub mod node;
pub mod edge;
pub mod graph;
pub mod ids;
pub mod error;
pub mod cache;
pub mod lifecycle;
pub mod composer;
pub mod digraph;
pub mod ports;
