use anyhow::{Result, bail};
use branchflow::app::dto::SelectFunctionRequest;
use branchflow::cli::{self, OutputFormat, SourceConfig};
use branchflow::server::{http, mcp::BranchflowMcpServer};
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bftool")]
#[command(about = "Explore a function's call flow, expanding decision branches on demand", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the REST API
    Serve {
        #[command(flatten)]
        source: SourceArgs,

        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },

    /// Serve MCP tools over stdio
    Mcp {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the composed graph for a function from a fixture file
    Show {
        /// Fixture JSON with base graphs and branch payloads
        #[arg(long)]
        fixture: PathBuf,

        /// Source file of the function
        #[arg(long)]
        file: String,

        /// Function name
        #[arg(long)]
        function: String,

        /// Enclosing class, for methods
        #[arg(long)]
        class: Option<String>,

        /// Branch to toggle (repeatable, applied in order)
        #[arg(long = "toggle")]
        toggles: Vec<String>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        request: RequestArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Base URL of the analysis service
    #[arg(long, env = "BRANCHFLOW_SERVICE_URL", conflicts_with = "fixture")]
    service_url: Option<String>,

    /// Answer queries from a fixture file instead of the service
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Request timeout in seconds for the analysis service
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    #[command(flatten)]
    request: RequestArgs,
}

#[derive(Args)]
struct RequestArgs {
    /// Default call depth for function selections
    #[arg(long, default_value_t = 5)]
    max_depth: u32,

    /// Keep calls into external code in base graphs
    #[arg(long)]
    include_external: bool,
}

impl SourceArgs {
    fn config(&self) -> Result<SourceConfig> {
        match (&self.service_url, &self.fixture) {
            (Some(url), None) => Ok(SourceConfig::Service {
                url: url.clone(),
                timeout: Duration::from_secs(self.timeout_secs),
            }),
            (None, Some(path)) => Ok(SourceConfig::Fixture(path.clone())),
            _ => bail!("exactly one of --service-url or --fixture is required"),
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "branchflow=info,tower_http=info".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Serve { source, addr } => {
            let engine = cli::build_engine(
                source.config()?,
                source.request.max_depth,
                source.request.include_external,
            )?;
            http::serve(engine, addr).await?;
        }
        Commands::Mcp { source } => {
            let engine = cli::build_engine(
                source.config()?,
                source.request.max_depth,
                source.request.include_external,
            )?;
            BranchflowMcpServer::new(engine).serve_stdio().await?;
        }
        Commands::Show {
            fixture,
            file,
            function,
            class,
            toggles,
            format,
            request,
        } => {
            let engine = cli::build_engine(
                SourceConfig::Fixture(fixture),
                request.max_depth,
                request.include_external,
            )?;
            let select = SelectFunctionRequest {
                file_path: file,
                function_name: function,
                max_depth: None,
                class_name: class,
                include_external: None,
            };
            cli::show_graph(&engine, select, &toggles, format).await?;
        }
    }

    Ok(())
}
