//! cachekeeper
//!
//! Runs the embedded cache described by a YAML service document and serves
//! its diagnostics, health and metrics over HTTP.
//!
//! ```text
//! load + validate ──▶ CacheBundle::run ──▶ start_all ──▶ serve ──▶ ctrl-c ──▶ stop_all
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cachekeeper::config::ServiceConfig;
use cachekeeper::error::{Error, Result};
use cachekeeper::{server, CacheBundle, HostEnvironment};

// =============================================================================
// CLI Arguments
// =============================================================================

/// cachekeeper - embedded cache with cluster health and diagnostics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML service document
    #[arg(long, env = "CACHE_CONFIG")]
    config: PathBuf,

    /// HTTP bind address, overrides the document's server.listenAddress
    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let document = ServiceConfig::from_file(&args.config)?;
    if args.check {
        return check(&document);
    }

    info!("Starting cachekeeper");
    info!("  Configuration: {}", args.config.display());
    info!("  Topology: {}", document.cache.topology);

    let env = Arc::new(HostEnvironment::new());
    let bundle = CacheBundle::new();
    bundle.run(&document, &env)?;

    if let Err(e) = env.lifecycle().start_all() {
        error!("Failed to start cache: {}", e);
        env.lifecycle().stop_all();
        return Err(e);
    }

    let listen_addr = args
        .listen_addr
        .clone()
        .unwrap_or_else(|| document.server.listen_address.clone());
    let listener = match server::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            env.lifecycle().stop_all();
            return Err(e);
        }
    };

    let shutdown = CancellationToken::new();
    let mut server_task = tokio::spawn(server::serve(listener, Arc::clone(&env), shutdown.clone()));

    let finished = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
            shutdown.cancel();
            None
        }
        result = &mut server_task => Some(result),
    };
    let served = match finished {
        Some(result) => join(result),
        None => join(server_task.await),
    };

    env.lifecycle().stop_all();
    info!("cachekeeper shutdown complete");
    served
}

fn join(result: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    result.map_err(|e| Error::Internal(format!("HTTP server task failed: {}", e)))?
}

/// Print every violation of the document's cache section
fn check(document: &ServiceConfig) -> Result<()> {
    let violations = document.cache.validate();
    if violations.is_empty() {
        println!("Configuration is valid ({} topology)", document.cache.topology);
        return Ok(());
    }

    for violation in &violations {
        eprintln!("  {}: {}", violation.rule(), violation);
    }
    Err(Error::InvalidConfiguration(violations))
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "hyper_util=warn"] {
        if let Ok(directive) = directive.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
