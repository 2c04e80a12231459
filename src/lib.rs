//! branchflow: on-demand branch expansion for call-flow graphs.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod server;
