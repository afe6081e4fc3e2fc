//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the origin listener, then one listener per distribution
//! - Load TLS material for distributions that have it
//! - Spawn each server as a task tied to the shutdown coordinator

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::{AppConfig, DistributionConfig};
use crate::edge::RedirectPolicy;
use crate::lifecycle::Shutdown;
use crate::net::tls::{load_tls_config, TlsError};
use crate::origin::{FailureSource, OriginServer};
use crate::relay::{RelayError, RelayServer};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("cannot bind {name} on {address}: {source}")]
    Bind {
        name: String,
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("relay {name}: {source}")]
    Relay {
        name: String,
        #[source]
        source: RelayError,
    },

    #[error("relay {name}: {source}")]
    Tls {
        name: String,
        #[source]
        source: TlsError,
    },
}

/// Handles to everything `start` spawned.
pub struct Running {
    /// Bound origin address, when the origin runs in-process.
    pub origin: Option<SocketAddr>,
    /// Bound address of each distribution, in config order.
    pub relays: Vec<(String, SocketAddr)>,
    tasks: Vec<JoinHandle<()>>,
}

impl Running {
    /// Wait for every server task to finish draining.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Server task failed");
            }
        }
    }
}

/// Bind and spawn the origin service.
pub async fn spawn_origin(
    config: &AppConfig,
    failures: Arc<dyn FailureSource>,
    shutdown: &Shutdown,
) -> Result<(SocketAddr, JoinHandle<()>), StartupError> {
    let address = &config.origin.bind_address;
    let bind_error = |source| StartupError::Bind {
        name: "origin".to_string(),
        address: address.clone(),
        source,
    };

    let listener = TcpListener::bind(address).await.map_err(bind_error)?;
    let addr = listener.local_addr().map_err(bind_error)?;

    let server = OriginServer::new(config, failures);
    let rx = shutdown.subscribe();
    let task = tokio::spawn(async move {
        if let Err(e) = server.run(listener, rx).await {
            tracing::error!(error = %e, "Origin server error");
        }
    });

    Ok((addr, task))
}

/// Bind and spawn one relay distribution.
pub async fn spawn_relay(
    distribution: &DistributionConfig,
    config: &AppConfig,
    policy: Arc<ArcSwap<RedirectPolicy>>,
    shutdown: &Shutdown,
) -> Result<(SocketAddr, JoinHandle<()>), StartupError> {
    let name = distribution.name.clone();
    let address = &distribution.bind_address;
    let bind_error = |source| StartupError::Bind {
        name: name.clone(),
        address: address.clone(),
        source,
    };

    let server = RelayServer::new(distribution, config, policy).map_err(|source| {
        StartupError::Relay {
            name: name.clone(),
            source,
        }
    })?;
    let rx = shutdown.subscribe();

    match &distribution.tls {
        None => {
            let listener = TcpListener::bind(address).await.map_err(bind_error)?;
            let addr = listener.local_addr().map_err(bind_error)?;
            let task = tokio::spawn(async move {
                if let Err(e) = server.run(listener, rx).await {
                    tracing::error!(error = %e, "Relay server error");
                }
            });
            Ok((addr, task))
        }
        Some(tls) => {
            let rustls = load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path))
                .await
                .map_err(|source| StartupError::Tls {
                    name: name.clone(),
                    source,
                })?;
            let listener = std::net::TcpListener::bind(address).map_err(bind_error)?;
            listener.set_nonblocking(true).map_err(bind_error)?;
            let addr = listener.local_addr().map_err(bind_error)?;
            let task = tokio::spawn(async move {
                if let Err(e) = server.run_tls(listener, rustls, rx).await {
                    tracing::error!(error = %e, "Relay server error");
                }
            });
            Ok((addr, task))
        }
    }
}

/// Start the origin (when enabled) and every configured distribution.
pub async fn start(
    config: &AppConfig,
    failures: Arc<dyn FailureSource>,
    policy: Arc<ArcSwap<RedirectPolicy>>,
    shutdown: &Shutdown,
) -> Result<Running, StartupError> {
    let mut tasks = Vec::new();

    let origin = if config.origin.enabled {
        let (addr, task) = spawn_origin(config, failures, shutdown).await?;
        tracing::info!(address = %addr, route = %config.origin.route, "Origin listening");
        tasks.push(task);
        Some(addr)
    } else {
        None
    };

    let mut relays = Vec::with_capacity(config.relays.len());
    for distribution in &config.relays {
        let (addr, task) = spawn_relay(distribution, config, policy.clone(), shutdown).await?;
        tracing::info!(
            distribution = %distribution.name,
            address = %addr,
            is_cors = distribution.is_cors,
            viewer_request_hook = distribution.viewer_request_hook,
            tls = distribution.tls.is_some(),
            origin = %distribution.origin_url,
            "Relay listening"
        );
        relays.push((distribution.name.clone(), addr));
        tasks.push(task);
    }

    Ok(Running {
        origin,
        relays,
        tasks,
    })
}
