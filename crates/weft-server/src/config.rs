//! Configuration for the Weft server.
//!
//! Values are read from `WEFT_*` environment variables, with serde defaults
//! for everything optional.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory of YAML flow documents loaded at startup
    #[serde(default)]
    pub flow_dir: Option<PathBuf>,

    /// Log filter directive (tracing env-filter syntax)
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            flow_dir: None,
            log_filter: default_log_filter(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from `WEFT_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> ServerResult<Self> {
        let mut config = Self::default();
        if let Ok(bind_address) = env::var("WEFT_BIND_ADDRESS") {
            config.bind_address = bind_address;
        }
        if let Ok(port) = env::var("WEFT_PORT") {
            config.port = port.parse().map_err(|_| {
                ServerError::Configuration(format!("WEFT_PORT is not a valid port: '{port}'"))
            })?;
        }
        if let Ok(flow_dir) = env::var("WEFT_FLOW_DIR") {
            config.flow_dir = Some(PathBuf::from(flow_dir));
        }
        if let Ok(log_filter) = env::var("WEFT_LOG") {
            config.log_filter = log_filter;
        }
        Ok(config)
    }

    /// The socket address to bind.
    pub fn socket_addr(&self) -> ServerResult<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|_| {
                ServerError::Configuration(format!(
                    "invalid bind address: '{}:{}'",
                    self.bind_address, self.port
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_filter, "info");
        assert!(config.flow_dir.is_none());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 9000,
            ..Default::default()
        };
        assert_eq!(
            config.socket_addr().unwrap(),
            "127.0.0.1:9000".parse().unwrap()
        );
    }

    #[test]
    fn test_invalid_bind_address_is_rejected() {
        let config = ServerConfig {
            bind_address: "not an address".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.socket_addr(),
            Err(ServerError::Configuration(_))
        ));
    }
}
