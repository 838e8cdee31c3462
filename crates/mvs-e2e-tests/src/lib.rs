pub mod rest;

use std::time::Duration;

use anyhow::{anyhow, Result};
use mvs_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use tempfile::TempDir;
use url::Url;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
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

pub fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let args = &[
        "mvs-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--no-cors",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub struct ServerGuard {
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Starts the real server on the configured port and waits until it answers
/// on /health. The returned guard shuts the server down when dropped.
pub async fn launch_env(args: ServerConfig) -> Result<(reqwest::Client, Url, ServerGuard)> {
    let base_url: Url = format!("http://{}:{}/", args.listen_address, args.port).parse()?;
    let state = mvs_server::build_state(&args).await?;

    let (shutdown, on_shutdown) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        if let Err(e) = mvs_server::run_graceful_with_state(args, state, async {
            let _ = on_shutdown.await;
        })
        .await
        {
            tracing::error!("Server failed: {e:#}");
        }
    });

    let client = reqwest::Client::new();
    let health_url = base_url.join("health")?;
    for _ in 0..100 {
        if let Ok(response) = client.get(health_url.clone()).send().await {
            if response.status().is_success() {
                return Ok((
                    client,
                    base_url,
                    ServerGuard {
                        shutdown: Some(shutdown),
                    },
                ));
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    Err(anyhow!("Server did not become ready"))
}
