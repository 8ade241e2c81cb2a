//! Shared fixtures: a scripted fake audio engine and config helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use station_proto::config::Config;

/// Minimal stand-in for the audio engine's control port: accepts one
/// command per connection, replies with a canned response, closes.
#[derive(Clone)]
pub struct FakeEngine {
    pub port: u16,
    responses: Arc<Mutex<HashMap<String, String>>>,
    received: Arc<Mutex<Vec<String>>>,
}

impl FakeEngine {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let engine = Self {
            port,
            responses: Arc::new(Mutex::new(HashMap::new())),
            received: Arc::new(Mutex::new(Vec::new())),
        };

        let responses = engine.responses.clone();
        let received = engine.received.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let responses = responses.clone();
                let received = received.clone();
                tokio::spawn(async move {
                    let (read_half, mut write_half) = stream.into_split();
                    let mut line = String::new();
                    if BufReader::new(read_half).read_line(&mut line).await.is_err() {
                        return;
                    }
                    let command = line.trim().to_string();
                    received.lock().await.push(command.clone());

                    let response = {
                        let map = responses.lock().await;
                        map.get(&command).cloned().unwrap_or_else(|| "END\r\n".to_string())
                    };
                    let _ = write_half.write_all(response.as_bytes()).await;
                    // Dropping the halves closes the connection, which is
                    // how the client knows the response is complete.
                });
            }
        });

        engine
    }

    pub async fn respond(&self, command: &str, response: &str) {
        self.responses
            .lock()
            .await
            .insert(command.to_string(), response.to_string());
    }

    pub async fn received(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }
}

/// Route tracing output through the test harness; set RUST_LOG to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config wired to the fake engine and a temp media dir, with the history
/// cache disabled so every call sees live engine state.
pub fn test_config(engine_port: u16, media_dir: &Path) -> Config {
    init_tracing();
    let mut config = Config::default();
    config.engine.host = "127.0.0.1".to_string();
    config.engine.port = engine_port;
    config.engine.iface = "radio".to_string();
    config.engine.socket_timeout_ms = 2000;
    // Nothing listens here; listener count degrades to 0.
    config.status.base_url = "http://127.0.0.1:9".to_string();
    config.status.timeout_ms = 300;
    config.media.dir = media_dir.to_path_buf();
    config.station.history_cache_ms = 0;
    config.station.admins = vec!["op".to_string()];
    config
}

/// An engine-style metadata dump covering the given paths, oldest
/// first (the engine appends; callers reverse).
pub fn metadata_dump(paths: &[&str]) -> String {
    let mut out = String::new();
    for (i, path) in paths.iter().enumerate() {
        out.push_str(&format!("--- {} ---\n", i + 1));
        out.push_str(&format!("title=\"Track {}\"\n", i + 1));
        out.push_str(&format!("filename=\"{}\"\n", path));
    }
    out.push_str("END\r\n");
    out
}
