//! Status server configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Disabled deployments run the pipeline with no listener at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_enabled() -> bool {
    true
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enabled: default_enabled(),
        }
    }
}

impl StatusConfig {
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}
