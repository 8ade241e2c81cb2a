//! Control-port client for the audio engine.
//!
//! The engine speaks a newline-terminated ASCII command protocol on a TCP
//! port. Connections are throwaway: one connect / one command / read to
//! close, no persistent session state. Retries are the caller's policy,
//! never this layer's.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::error::{Result, StationError};
use station_proto::config::EngineConfig;

/// Command strings understood by the engine, kept in one place so the
/// wire format is not scattered through call sites.
pub mod commands {
    /// List pending request ids.
    pub const QUEUE: &str = "requests.queue";
    /// Liveness no-op; any reply means the engine is up.
    pub const HELP: &str = "help";

    pub fn request_metadata(request_id: &str) -> String {
        format!("request.metadata {}", request_id)
    }

    pub fn push(path: &str) -> String {
        format!("requests.push {}", path)
    }

    pub fn on_air_metadata(iface: &str) -> String {
        format!("{}.metadata", iface)
    }

    pub fn skip(iface: &str) -> String {
        format!("{}.skip", iface)
    }
}

#[derive(Clone)]
pub struct ControlClient {
    addr: String,
    timeout: Duration,
    response_cap: usize,
}

impl ControlClient {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            addr: format!("{}:{}", config.host, config.port),
            timeout: Duration::from_millis(config.socket_timeout_ms),
            response_cap: config.response_cap_bytes,
        }
    }

    /// Send one command and return the raw response bytes.
    ///
    /// Any connect/write/read failure, including timeout, maps to
    /// [`StationError::EngineUnreachable`].
    pub async fn send(&self, command: &str) -> Result<Vec<u8>> {
        debug!("engine command: {}", command);
        tokio::time::timeout(self.timeout, self.round_trip(command))
            .await
            .map_err(|_| {
                StationError::unreachable(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no response from {} within {:?}", self.addr, self.timeout),
                ))
            })?
    }

    async fn round_trip(&self, command: &str) -> Result<Vec<u8>> {
        let mut stream = TcpStream::connect(&self.addr)
            .await
            .map_err(StationError::unreachable)?;

        let mut line = command.as_bytes().to_vec();
        line.push(b'\n');
        stream
            .write_all(&line)
            .await
            .map_err(StationError::unreachable)?;

        let mut response = Vec::new();
        let mut tmp = [0u8; 4096];
        loop {
            let n = stream
                .read(&mut tmp)
                .await
                .map_err(StationError::unreachable)?;
            if n == 0 {
                break;
            }
            response.extend_from_slice(&tmp[..n]);
            if response.len() >= self.response_cap {
                warn!(
                    "engine response truncated at {} bytes for {:?}",
                    self.response_cap, command
                );
                break;
            }
        }
        Ok(response)
    }

    /// Liveness probe. Never errors: any successful round trip counts as
    /// alive, any failure as not alive.
    pub async fn is_reachable(&self) -> bool {
        match self.send(commands::HELP).await {
            Ok(_) => true,
            Err(e) => {
                warn!("engine not reachable: {}", e);
                false
            }
        }
    }
}
