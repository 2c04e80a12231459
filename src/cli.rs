use crate::adapters::fixture::source::FixtureSource;
use crate::adapters::http::client::AnalysisServiceClient;
use crate::app::dto::{SelectFunctionRequest, ToggleOutcome};
use crate::app::engine::{CallFlowEngine, EngineConfig};
use crate::domain::composer::ComposedGraph;
use anyhow::{Context as _, Result, anyhow};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Where call-flow and branch-expand queries are answered
#[derive(Debug, Clone)]
pub enum SourceConfig {
    Service { url: String, timeout: Duration },
    Fixture(PathBuf),
}

impl SourceConfig {
    pub fn describe(&self) -> String {
        match self {
            SourceConfig::Service { url, .. } => url.clone(),
            SourceConfig::Fixture(path) => format!("fixture:{}", path.display()),
        }
    }
}

pub fn build_engine(
    source: SourceConfig,
    default_max_depth: u32,
    include_external: bool,
) -> Result<CallFlowEngine> {
    let config = EngineConfig {
        source: source.describe(),
        default_max_depth,
        include_external,
    };
    let engine = match source {
        SourceConfig::Service { url, timeout } => {
            let client = AnalysisServiceClient::new(url, timeout)?;
            CallFlowEngine::with_source(config, Arc::new(client))
        }
        SourceConfig::Fixture(path) => {
            let fixture = FixtureSource::load(&path)?;
            tracing::info!(
                path = %path.display(),
                functions = fixture.functions().len(),
                "fixture loaded"
            );
            CallFlowEngine::with_source(config, Arc::new(fixture))
        }
    };
    Ok(engine)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Dot,
}

/// Select a function, replay toggle intents in order, and print the result.
pub async fn show_graph(
    engine: &CallFlowEngine,
    select: SelectFunctionRequest,
    toggles: &[String],
    format: OutputFormat,
) -> Result<()> {
    let label = format!("{}::{}", select.file_path, select.function_name);
    let request = engine.request_from(select);
    engine
        .select_function(request)
        .await?
        .ok_or_else(|| anyhow!("selection of {label} was superseded"))?;

    for branch in toggles {
        let res = engine
            .toggle_branch(branch)
            .await
            .with_context(|| format!("Failed to toggle branch {branch}"))?;
        if let ToggleOutcome::Failed { error } = &res.outcome {
            eprintln!("warning: branch {branch} failed to load: {error}");
        }
    }

    let graph = engine
        .composed_graph()
        .ok_or_else(|| anyhow!("no composed graph for {label}"))?;

    match format {
        OutputFormat::Text => print!("{}", render_text(&label, &graph)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&*graph)?),
        OutputFormat::Dot => println!("{}", graph.to_dot()),
    }
    Ok(())
}

pub fn render_text(title: &str, graph: &ComposedGraph) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Call flow: {title}");
    let _ = writeln!(out, "{}", "=".repeat(60));

    let _ = writeln!(out, "\nNodes ({}):", graph.nodes.len());
    for n in &graph.nodes {
        let _ = write!(out, "  {:<12} {:?} {}", n.id, n.kind, n.label);
        if let Some(loc) = &n.location {
            let _ = write!(out, "  ({}:{})", loc.file, loc.line);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "\nEdges ({}):", graph.edges.len());
    for e in &graph.edges {
        let _ = write!(out, "  {:<12} {} -> {}", e.id, e.source, e.target);
        if let Some(l) = &e.label {
            let _ = write!(out, "  [{l}]");
        }
        out.push('\n');
    }

    let _ = writeln!(out, "\nDecisions ({}):", graph.decision_nodes.len());
    for d in &graph.decision_nodes {
        let _ = writeln!(out, "  {:<12} {}", d.id, d.label);
        for b in &d.branches {
            let marker = if b.is_loading {
                "~"
            } else if b.is_expanded {
                "-"
            } else {
                "+"
            };
            let _ = write!(out, "    [{marker}] {} {}", b.branch_id, b.label);
            if let Some(err) = &b.error {
                let _ = write!(out, "  (error: {err})");
            }
            out.push('\n');
        }
    }

    if !graph.return_nodes.is_empty() {
        let _ = writeln!(out, "\nReturns ({}):", graph.return_nodes.len());
        for r in &graph.return_nodes {
            let _ = writeln!(out, "  {:<12} {}", r.id, r.label);
        }
    }

    let stats = &graph.stats;
    let _ = writeln!(
        out,
        "\nBase elements: {}, branch elements: {}, duplicates skipped: {}",
        stats.base_elements, stats.branch_elements, stats.duplicates_skipped
    );
    if graph.metadata.depth_truncated {
        let _ = writeln!(out, "Depth limit reached; deeper calls are not shown.");
    }
    out
}
