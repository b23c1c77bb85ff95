use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use geoscout::agent::Coordinator;
use geoscout::catalog::CatalogService;
use geoscout::config::Config;
use geoscout::models::build_provider_manager;
use geoscout::tools::{self, ToolContext};

#[derive(Parser, Debug)]
#[command(
    name = "geoscout",
    version,
    about = "Conversational discovery for community geospatial datasets"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the daemon (HTTP gateway)
    Start,
    /// Run a single discovery turn and print the answer
    Ask {
        /// The research need, in plain English
        query: String,
    },
    /// Check if the geoscout daemon is running
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| geoscout::geoscout_home().join("config.yaml"));

    info!(path = %config_path.display(), "loading configuration");
    let cfg = Config::load(&config_path).await?;
    info!(models = cfg.models.len(), "configuration loaded");

    // Wire up the service graph: catalog → tools → providers → coordinator.
    let catalog = Arc::new(CatalogService::new(&cfg.catalog));
    let ctx = ToolContext::new(Arc::clone(&catalog), &cfg.webpage);
    tools::init();

    let providers = build_provider_manager(&cfg);
    info!(providers = providers.provider_count(), "providers ready");

    let coordinator = Arc::new(Coordinator::new(
        providers,
        ctx,
        cfg.coordinator.max_tool_iterations,
    ));

    match cli.command {
        Some(Command::Ask { query }) => {
            let reply = coordinator.run_discovery(&query).await?;
            println!("{reply}");
            return Ok(());
        }
        Some(Command::Status) => {
            let addr = std::env::var("GEOSCOUT_GATEWAY_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string());
            let url = format!("http://{addr}/api/status");
            match reqwest::get(&url).await {
                Ok(resp) if resp.status().is_success() => {
                    println!("geoscout daemon is running at {addr}");
                }
                Ok(resp) => {
                    println!("geoscout daemon responded with {} at {addr}", resp.status());
                }
                Err(_) => {
                    println!("geoscout daemon is not running at {addr}");
                }
            }
            return Ok(());
        }
        Some(Command::Start) | None => { /* fall through to daemon startup */ }
    }

    // --- Normal server startup ---

    let gateway =
        geoscout::gateway::spawn_gateway_if_enabled(Arc::clone(&coordinator), Arc::clone(&catalog))
            .await;
    if gateway.is_none() && std::env::var("GEOSCOUT_GATEWAY").as_deref() != Ok("0") {
        anyhow::bail!("gateway failed to start (all ports in use?)");
    }

    if let Some(ref gw) = gateway {
        println!("geoscout v{} ready — http://{}", env!("CARGO_PKG_VERSION"), gw.addr);
    }
    info!("geoscout ready");

    // Wait for shutdown signal (Ctrl-C)
    tokio::signal::ctrl_c().await?;
    info!("received Ctrl-C, shutting down…");

    Ok(())
}
