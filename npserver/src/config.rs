//! Server configuration.
//!
//! Loaded from a YAML file (path in `NOWPLAYD_CONFIG`, default
//! `nowplayd.yaml` in the working directory), then overridden field by field
//! from `NOWPLAYD_*` environment variables. A missing file is not an error;
//! the defaults stand on their own.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interface to bind
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// JSON file holding the stream catalog
    pub streams_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            streams_file: PathBuf::from("streams.json"),
        }
    }
}

impl Config {
    /// Load from file and environment
    pub fn load() -> anyhow::Result<Self> {
        let path =
            std::env::var("NOWPLAYD_CONFIG").unwrap_or_else(|_| "nowplayd.yaml".to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => serde_yaml::from_str(&text)?,
            Err(_) => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("NOWPLAYD_HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("NOWPLAYD_PORT") {
            if let Ok(port) = port.parse() {
                self.port = port;
            }
        }
        if let Ok(file) = std::env::var("NOWPLAYD_STREAMS_FILE") {
            self.streams_file = PathBuf::from(file);
        }
    }

    /// `host:port` for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
