//! Say-hi relay
//!
//! Runs the greeting origin and every configured relay distribution in one
//! process.
//!
//! # Architecture Overview
//!
//! ```text
//!   Viewer ──▶ relay "same-origin" :8080 ─┐
//!                                          ├─▶ origin :3000 /prod/api
//!   Viewer ──▶ relay "cors"        :8443 ─┘      (random 502s)
//!                 │
//!                 ├─ viewer_request: Host → x-viewer-host
//!                 └─ origin_response: 502 → 307 + RedirectCount cookie
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::Parser;

use say_hi_relay::config::loader::load_config;
use say_hi_relay::config::validation::parse_probability;
use say_hi_relay::config::watcher::{apply_updates, ConfigWatcher};
use say_hi_relay::config::AppConfig;
use say_hi_relay::edge::RedirectPolicy;
use say_hi_relay::lifecycle::{signals::shutdown_signal, start, Shutdown};
use say_hi_relay::observability::{logging, metrics};
use say_hi_relay::origin::RandomFailure;

#[derive(Parser)]
#[command(name = "say-hi-relay")]
#[command(about = "Greeting origin behind a retrying edge relay", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `origin.failure_probability`, within [0, 1].
    #[arg(long, value_parser = parse_probability)]
    failure_probability: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(p) = cli.failure_probability {
        config.origin.failure_probability = p;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("say-hi-relay v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let policy = Arc::new(ArcSwap::from_pointee(RedirectPolicy::from(&config.redirect)));
    let failures = Arc::new(RandomFailure::new(config.origin.failure_probability));
    let shutdown = Shutdown::new();

    let running = start(&config, failures, policy.clone(), &shutdown).await?;

    // Kept alive for the life of the process.
    let _watcher = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            tokio::spawn(apply_updates(updates, policy, shutdown.subscribe()));
            Some(watcher.run()?)
        }
        None => None,
    };

    shutdown_signal().await;
    shutdown.trigger();
    running.join().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
