//! keyblock-focusd - X11 daemon that keeps a key combination away from one
//! application.
//!
//! Grabs the blocked key (Ctrl+Q by default) on every window of the target
//! application as it gains focus, so the key never reaches it.

use anyhow::{Context, Result};
use clap::Parser;
use keyblock_focusd::backend::X11Display;
use keyblock_focusd::classify::WindowClassifier;
use keyblock_focusd::config::Config;
use keyblock_focusd::session::scan_clients;
use keyblock_focusd::supervisor::Supervisor;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Key blocking daemon for X11.
///
/// Watches the focused window and swallows the configured key combination
/// whenever a window of the target application has focus.
#[derive(Parser, Debug)]
#[command(name = "keyblock-focusd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Window class to protect (overrides the config file).
    #[arg(long)]
    class: Option<String>,

    /// Enable dry-run mode (log grabs instead of installing them).
    #[arg(long)]
    dry_run: bool,

    /// List client windows and whether they match, then exit.
    #[arg(long)]
    scan: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("keyblock-focusd v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config =
        Config::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(class) = args.class {
        config.target_class = class;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    config.validate().context("Invalid configuration")?;

    debug!("{:?}", config);
    info!(
        "Configuration loaded (target_class={}, dry_run={})",
        config.target_class, config.dry_run
    );

    if args.scan {
        return run_scan(&config);
    }

    run_daemon(config).await
}

/// Initialize logging with the specified level.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(format!("keyblock_focusd={level}"))
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    Ok(())
}

/// Print the client list with classes and match results.
fn run_scan(config: &Config) -> Result<()> {
    let display =
        X11Display::connect(config.display.as_deref()).context("Failed to connect to X")?;
    let classifier = WindowClassifier::new(config.target_class.clone(), config.class_match);

    let clients = scan_clients(&display, &classifier).context("Failed to list windows")?;
    for client in &clients {
        let class = client
            .class
            .as_ref()
            .map_or_else(|| "<gone>".to_string(), |c| c.names().join(", "));
        let marker = if client.matches { "*" } else { " " };
        println!("{} {} | class={}", marker, client.window, class);
    }

    info!(
        "{} windows, {} matching {}",
        clients.len(),
        clients.iter().filter(|c| c.matches).count(),
        config.target_class
    );
    Ok(())
}

/// Run the supervised event loop until interrupted.
async fn run_daemon(config: Config) -> Result<()> {
    let display = config.display.clone();
    let supervisor = Supervisor::new(config);

    tokio::select! {
        never = supervisor.run(|| X11Display::connect(display.as_deref())) => match never {},
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Interrupted, exiting");
        }
    }

    Ok(())
}
