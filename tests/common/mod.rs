//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use say_hi_relay::config::AppConfig;
use say_hi_relay::edge::RedirectPolicy;
use say_hi_relay::lifecycle::startup::{spawn_origin, spawn_relay};
use say_hi_relay::lifecycle::Shutdown;
use say_hi_relay::origin::FailureSource;

/// Origin plus both default distributions on loopback ports.
pub struct Stack {
    pub origin: SocketAddr,
    pub same_origin: SocketAddr,
    pub cors: SocketAddr,
    pub shutdown: Shutdown,
}

impl Stack {
    pub fn same_origin_url(&self) -> String {
        format!("http://{}/api", self.same_origin)
    }

    pub fn cors_url(&self) -> String {
        format!("http://{}/api", self.cors)
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

fn loopback(config: &mut AppConfig) {
    config.origin.bind_address = "127.0.0.1:0".to_string();
    for relay in &mut config.relays {
        relay.bind_address = "127.0.0.1:0".to_string();
    }
}

/// Start the in-process origin with `failures`, then point both relays at it.
pub async fn start_stack(
    failures: Arc<dyn FailureSource>,
    tweak: impl FnOnce(&mut AppConfig),
) -> Stack {
    let mut config = AppConfig::default();
    loopback(&mut config);
    tweak(&mut config);

    let shutdown = Shutdown::new();
    let (origin, _) = spawn_origin(&config, failures, &shutdown).await.unwrap();
    for relay in &mut config.relays {
        relay.origin_url = format!("http://{origin}/prod");
    }

    let (same_origin, cors) = start_relays(&config, &shutdown).await;
    Stack {
        origin,
        same_origin,
        cors,
        shutdown,
    }
}

/// Start only the relays, forwarding to `origin_url`.
pub async fn start_relays_for(
    origin_url: &str,
    tweak: impl FnOnce(&mut AppConfig),
) -> (SocketAddr, SocketAddr, Shutdown) {
    let mut config = AppConfig::default();
    loopback(&mut config);
    for relay in &mut config.relays {
        relay.origin_url = origin_url.to_string();
    }
    tweak(&mut config);

    let shutdown = Shutdown::new();
    let (same_origin, cors) = start_relays(&config, &shutdown).await;
    (same_origin, cors, shutdown)
}

async fn start_relays(config: &AppConfig, shutdown: &Shutdown) -> (SocketAddr, SocketAddr) {
    let policy = Arc::new(ArcSwap::from_pointee(RedirectPolicy::from(&config.redirect)));
    let mut addrs = Vec::new();
    for relay in &config.relays {
        let (addr, _) = spawn_relay(relay, config, policy.clone(), shutdown)
            .await
            .unwrap();
        addrs.push(addr);
    }
    (addrs[0], addrs[1])
}

/// HTTP client that surfaces 307s instead of following them.
pub fn manual_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Requests seen by a recording origin, head and body as text.
pub type Recorded = Arc<Mutex<Vec<String>>>;

/// Start a mock origin that records each raw request and answers with a
/// fixed status and body.
pub async fn start_recording_origin(status: u16, body: &'static str) -> (SocketAddr, Recorded) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let log = recorded.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let log = log.clone();
                    tokio::spawn(async move {
                        let request = read_request(&mut socket).await;
                        log.lock().unwrap().push(request);

                        let status_text = match status {
                            200 => "200 OK",
                            403 => "403 Forbidden",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            _ => "200 OK",
                        };
                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, recorded)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Value of a header in a recorded raw request, matched case-insensitively.
pub fn recorded_header(request: &str, name: &str) -> Option<String> {
    request
        .split("\r\n\r\n")
        .next()
        .unwrap_or_default()
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(n, _)| n.trim().eq_ignore_ascii_case(name))
        .map(|(_, v)| v.trim().to_string())
}
