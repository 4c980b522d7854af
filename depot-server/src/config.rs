use depot::upload::DEFAULT_UPLOAD_WORKERS;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEFAULT_PORT: u16 = 9000;
const DEFAULT_SESSION_TTL_MINUTES: i64 = 24 * 60;
const DEFAULT_READ_TIMEOUT_SECONDS: u64 = 300;

#[derive(Serialize, Deserialize, Default)]
pub struct DepotServerConfig {
    /// The port the server listens on
    port: Option<u16>,
    /// Size of the worker pool executing storage writes
    upload_workers: Option<usize>,
    /// How long a session token stays valid after login
    session_ttl_minutes: Option<i64>,
    /// Per-connection read deadline; 0 disables it
    read_timeout_seconds: Option<u64>,
}

impl DepotServerConfig {
    /// Loads the configuration file, falling back to defaults when it is
    /// missing or malformed.
    pub fn load(path: &Path) -> DepotServerConfig {
        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring malformed configuration {}: {e}", path.display());
                    DepotServerConfig::default()
                }
            },
            Err(_) => DepotServerConfig::default(),
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn upload_workers(&self) -> usize {
        self.upload_workers.unwrap_or(DEFAULT_UPLOAD_WORKERS)
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_minutes
            .unwrap_or(DEFAULT_SESSION_TTL_MINUTES)
            * 60
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        match self
            .read_timeout_seconds
            .unwrap_or(DEFAULT_READ_TIMEOUT_SECONDS)
        {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }
}
