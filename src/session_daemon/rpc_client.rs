//! Client-side connection helpers for the daemon's API port.

use crate::rpc::api_service::CoreApiClient;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tarpc::client;
use tarpc::tokio_serde::formats::Bincode;
use tracing::debug;

/// Maximum connection attempts with exponential backoff.
const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 100;

/// Connects once to the API port.
pub async fn connect(addr: SocketAddr) -> Result<CoreApiClient> {
    use tarpc::serde_transport::tcp;

    let mut transport = tcp::connect(addr, Bincode::default);
    transport.config_mut().max_frame_length(usize::MAX);
    let transport = transport
        .await
        .with_context(|| format!("Failed to connect to daemon at {}", addr))?;
    Ok(CoreApiClient::new(client::Config::default(), transport).spawn())
}

/// Connect with retry and exponential backoff.
pub async fn connect_with_retry(addr: SocketAddr) -> Result<CoreApiClient> {
    let mut delay_ms = BASE_DELAY_MS;

    for attempt in 1..=MAX_CONNECT_ATTEMPTS {
        match connect(addr).await {
            Ok(client) => return Ok(client),
            Err(e) => debug!(attempt, "connect failed: {:#}", e),
        }

        if attempt < MAX_CONNECT_ATTEMPTS {
            // Add jitter (+-25%)
            let jitter = (delay_ms as f64 * 0.25 * (rand::random::<f64>() * 2.0 - 1.0)) as i64;
            let actual_delay = (delay_ms as i64 + jitter).max(10) as u64;
            tokio::time::sleep(Duration::from_millis(actual_delay)).await;
            delay_ms *= 2;
        }
    }

    anyhow::bail!(
        "Failed to connect to {} after {} attempts",
        addr,
        MAX_CONNECT_ATTEMPTS
    )
}
