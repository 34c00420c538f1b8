mod report;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use waypoint_core::config::AppConfig;
use waypoint_core::state::State;
use waypoint_core::types::GraphId;
use waypoint_engine::{Engine, NodeRegistry};
use waypoint_tools::ToolRegistry;
use waypoint_workflows::{install_code_review, register_nodes, review_state};

const DEFAULT_LOG_FILTER: &str = "waypoint=info,warn";

#[derive(Parser)]
#[command(name = "waypoint", version, about = "Minimal graph workflow engine")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "waypoint.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway (default)
    Serve,
    /// Run a registered graph once and print the run record
    Run {
        /// Graph id, or the name of a graph registered from config
        graph: String,
        /// Initial state as a JSON object
        #[arg(long)]
        state: Option<String>,
        /// Step ceiling for this run
        #[arg(long)]
        max_steps: Option<usize>,
    },
    /// Review a source file with the built-in code review workflow
    Review {
        /// File to review (reads stdin when omitted)
        path: Option<PathBuf>,
        /// Quality score needed to accept
        #[arg(long)]
        threshold: Option<f64>,
        /// Suggestion passes before giving up
        #[arg(long)]
        max_loops: Option<i64>,
    },
    /// List registered graphs
    Graphs,
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "waypoint", &mut std::io::stdout());
        return Ok(());
    }

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    // RUST_LOG wins over the config file
    let fallback = config.log.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(false)
        .init();

    if let Some(Commands::Config) = &cli.command {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut engine = build_engine(&config)?;

    match cli.command {
        None | Some(Commands::Serve) => {
            let gateway_config = config.gateway_or_default();
            info!(bind = %gateway_config.bind, "Starting HTTP gateway");
            let server = waypoint_gateway::GatewayServer::new(gateway_config, engine);
            let cancel = tokio_util::sync::CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Graceful shutdown on Ctrl-C
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutting down gateway...");
                cancel_clone.cancel();
            });

            server.run(cancel).await?;
        }
        Some(Commands::Run {
            graph,
            state,
            max_steps,
        }) => {
            let graph_id = resolve_graph(&engine, &graph)
                .with_context(|| format!("no graph with id or name '{}'", graph))?;
            let initial: State = match state {
                Some(json) => serde_json::from_str(&json).context("--state must be a JSON object")?,
                None => State::new(),
            };
            let max_steps = max_steps.unwrap_or_else(|| engine.max_steps());

            let run = engine.run_graph(&graph_id, &initial, max_steps)?;
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        Some(Commands::Review {
            path,
            threshold,
            max_loops,
        }) => {
            if !config.engine.builtin_workflows {
                anyhow::bail!("review needs engine.builtin_workflows = true");
            }
            let code = match path {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };

            let graph_id = GraphId::from_string(waypoint_workflows::CODE_REVIEW_GRAPH_ID);
            let run = engine.run(&graph_id, &review_state(&code, threshold, max_loops))?;
            report::print_review(&run);
        }
        Some(Commands::Graphs) => {
            report::print_graphs(&engine.list_graphs());
        }
        // Handled before the engine is built
        Some(Commands::Config) | Some(Commands::Completions { .. }) => {}
    }

    Ok(())
}

/// Build the registries, then the engine, then register built-in and
/// configured graphs.
fn build_engine(config: &AppConfig) -> anyhow::Result<Engine> {
    let mut nodes = NodeRegistry::new();
    let tools = if config.engine.builtin_workflows {
        register_nodes(&mut nodes);
        ToolRegistry::with_builtins()
    } else {
        ToolRegistry::new()
    };
    info!(tools = tools.list().len(), nodes = nodes.list().len(), "Registries ready");

    let mut engine = Engine::new(Arc::new(tools), Arc::new(nodes))
        .with_max_steps(config.engine.max_steps);

    if config.engine.builtin_workflows {
        install_code_review(&mut engine)?;
    }

    for spec in &config.graphs {
        match engine.create_graph_from_spec(spec) {
            Ok(graph) => info!(graph_id = %graph.id(), name = %spec.name, "Graph loaded from config"),
            Err(e) => {
                warn!(name = %spec.name, error = %e, "Skipping graph from config");
            }
        }
    }

    Ok(engine)
}

/// Match a graph by id first, then by name.
fn resolve_graph(engine: &Engine, key: &str) -> Option<GraphId> {
    let id = GraphId::from_string(key);
    if engine.get_graph(&id).is_ok() {
        return Some(id);
    }
    engine
        .list_graphs()
        .into_iter()
        .find(|g| g.name == key)
        .map(|g| g.id)
}
