pub mod rest;

use std::path::Path;
use std::time::Duration;

use anyhow::{Result, anyhow};
use filmes_server::config::{Parser, ServerConfig};
use futures::FutureExt as _;
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;
use tracing::debug;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let db_path = tmp_data_dir.path().join("filmes.db");
    let database_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://localhost:{}", port);
    let args = &[
        "filmes-e2e-tests",
        "--port",
        &port,
        "--base-url",
        &base_url,
        "--database-url",
        &database_url,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    test_config(test_name, &std::env::temp_dir())
}

/// Signals server shutdown when dropped.
pub struct ServerGuard {
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn launch_env(args: ServerConfig) -> Result<(reqwest::Client, ServerGuard)> {
    let base_url = args.base_url.clone();
    let state = filmes_server::build_state(&args).await?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(filmes_server::run_graceful_with_state(
        args,
        state,
        shutdown_rx.map(|_| ()),
    ));

    let client = reqwest::Client::new();
    let health_url = base_url.join("health")?;
    for _ in 0..100 {
        if let Ok(response) = client.get(health_url.clone()).send().await {
            if response.status().is_success() {
                debug!("Server ready at {base_url}");
                return Ok((
                    client,
                    ServerGuard {
                        shutdown: Some(shutdown_tx),
                    },
                ));
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    Err(anyhow!("Server did not become ready"))
}

pub fn extend_url(url: &Url, segment: impl ToString) -> Url {
    let mut url = url.clone();
    url.path_segments_mut()
        .expect("base url cannot be a base")
        .push(&segment.to_string());
    url
}
