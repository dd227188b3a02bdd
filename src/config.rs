use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::error::ConfigError;
use crate::ws::Heartbeat;

/// Server settings. Every flag can also come from the environment or `.env`.
#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    /// path of the SQLite database
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// address the HTTP server listens on
    #[clap(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8080")]
    pub bind_address: String,

    /// directory served at `/` when it exists
    #[clap(long, env = "STATIC_DIR", default_value = "static/")]
    pub static_dir: PathBuf,

    /// seconds between websocket pings
    #[clap(long, env = "HEARTBEAT_INTERVAL_SECS", default_value_t = 5)]
    pub heartbeat_interval_secs: u64,

    /// seconds without a pong before a client is dropped
    #[clap(long, env = "CLIENT_TIMEOUT_SECS", default_value_t = 10)]
    pub client_timeout_secs: u64,

    #[clap(long, env = "DB_POOL_SIZE", default_value_t = 8)]
    pub db_pool_size: u32,
}

impl ServerConfig {
    pub fn heartbeat(&self) -> Result<Heartbeat, ConfigError> {
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.client_timeout_secs <= self.heartbeat_interval_secs {
            return Err(ConfigError::Heartbeat {
                interval: self.heartbeat_interval_secs,
                timeout: self.client_timeout_secs,
            });
        }
        Ok(Heartbeat {
            interval: Duration::from_secs(self.heartbeat_interval_secs),
            timeout: Duration::from_secs(self.client_timeout_secs),
        })
    }
}
