//! Simbridge CLI
//!
//! Main entry point for running the objective-tracking harness.

use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use simbridge_harness::{
    create_router, flatten_ids, objectives, AppState, HarnessConfig, HarnessSession,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Default port for the HTTP API server.
const DEFAULT_PORT: u16 = 3000;

/// Simbridge - Simulation Objective Tracking Harness
///
/// Loads an objective tree, accepts colon-delimited status messages from a
/// running simulation, and reports learner progress to an LMS-style data
/// store and rendered progress views.
#[derive(Parser, Debug)]
#[command(name = "simbridge")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path or URL of the objectives XML document
    #[arg(value_name = "OBJECTIVES")]
    objectives: Option<String>,

    /// Path to configuration file (default: harness.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Port for the HTTP API server
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing subscriber with appropriate filter
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Simbridge harness starting");
    tracing::debug!(config = ?args.config, "Config file");

    match run_harness(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs the harness:
/// 1. Load config
/// 2. Load the objective tree (degrading to an empty tree on failure)
/// 3. Seed the data store and start the HTTP server
/// 4. Serve until Ctrl+C
async fn run_harness(args: Args) -> anyhow::Result<()> {
    // Load configuration
    let mut config = load_config(args.config.as_deref())?;

    // Apply CLI argument overrides
    if let Some(ref source) = args.objectives {
        config.objectives_source.clone_from(source);
    }

    // Re-validate after overrides
    config.validate()?;

    print_config(&config);

    // Load the objective tree; a missing or malformed document degrades to
    // an empty tree so the harness can still receive and log messages.
    tracing::info!(source = %config.objectives_source, "Loading objectives");
    let fetch_timeout = Duration::from_secs(u64::from(config.fetch_timeout_seconds));
    let objective_tree = match objectives::load(&config.objectives_source, fetch_timeout).await {
        Ok(tree) => tree,
        Err(e) => {
            tracing::warn!(error = %e, "Objectives unavailable, starting with an empty tree");
            eprintln!("Warning: {e}");
            Vec::new()
        }
    };
    print_objectives_info(&objective_tree);

    // Build shared state; seeds the data store from the tree
    let app_state = AppState::new(config, objective_tree);
    let session = app_state.session.clone();
    let router = create_router(app_state);

    // Start the HTTP server
    let addr: SocketAddr = ([127, 0, 0, 1], args.port).into();
    println!();
    println!("Starting HTTP API server on {addr}...");

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    println!("HTTP API server running on http://{addr}");
    println!();
    println!("POST status messages to http://{addr}/api/message");
    println!("Press Ctrl+C to stop");
    println!();

    // Serve until Ctrl+C
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {e}"))?;

    // Print a final summary of the session
    let final_session = session.lock().await.clone();
    println!();
    print_summary(&final_session);

    Ok(())
}

/// Completes when Ctrl+C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Received Ctrl+C, shutting down");
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<HarnessConfig> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            HarnessConfig::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => HarnessConfig::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Prints the loaded configuration.
fn print_config(config: &HarnessConfig) {
    println!("Configuration loaded:");
    println!("  Objectives source: {}", config.objectives_source);
    println!("  Fetch timeout: {}s", config.fetch_timeout_seconds);
    println!("  Event buffer capacity: {}", config.event_buffer_capacity);
}

/// Prints objective tree information.
fn print_objectives_info(tree: &[simbridge_harness::ObjectiveNode]) {
    let ids = flatten_ids(tree);
    println!();
    println!("Objectives loaded:");
    println!("  Top-level objectives: {}", tree.len());
    println!("  Total objectives: {}", ids.len());

    for id in &ids {
        tracing::debug!(objective_id = %id, "Objective registered");
    }
}

/// Prints a summary of the session.
fn print_summary(session: &HarnessSession) {
    println!("=== Simbridge Session Summary ===");
    println!("Status: {}", session.status);
    println!("Objectives completed: {}", session.completed_ids().len());
    println!("Messages received: {}", session.log().len());

    let elapsed = session.updated_at - session.started_at;
    println!(
        "Duration: {}m {}s",
        elapsed.num_minutes(),
        elapsed.num_seconds() % 60
    );
}
