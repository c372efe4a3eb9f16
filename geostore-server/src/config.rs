use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::replication::ReplicationConfig;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server: Server,
    pub stores: StoresConfig,
    pub replication: ReplicationConfig,
    pub logging: LoggingConfig,
    /// Seed a handful of demo records into an empty master at startup.
    pub seed_demo_data: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

/// Master/replica pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoresConfig {
    /// Number of regional replica stores.
    pub replicas: usize,
    /// Display labels per replica slot, falling back to "Replica N".
    pub labels: Vec<String>,
    /// Initial connection attempts before giving up. Connection
    /// establishment is the only retried store operation.
    pub connect_retries: u32,
    pub connect_backoff_ms: u64,
    /// Upper bound for any single store call.
    pub op_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: Server {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            stores: StoresConfig::default(),
            replication: ReplicationConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
            seed_demo_data: true,
        }
    }
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            replicas: 4,
            labels: vec![
                "US".to_string(),
                "ASIA".to_string(),
                "SA".to_string(),
                "AFRICA".to_string(),
            ],
            connect_retries: 10,
            connect_backoff_ms: 2000,
            op_timeout_secs: 10,
        }
    }
}

impl StoresConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.op_timeout_secs)
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }

    pub fn label(&self, index: usize) -> String {
        self.labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Replica {}", index + 1))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.op_timeout_secs == 0 {
            return Err("stores.op_timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl ServerConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.stores.validate()?;
        self.replication.validate()?;
        Ok(())
    }

    /// Get server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
