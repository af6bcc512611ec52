//! Server configuration module.
//!
//! This module provides configuration loading for the review server from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `REVIEWS_LISTEN_ADDR`: IP address to bind (default: `0.0.0.0`)
//! - `REVIEWS_LISTEN_PORT`: Port to listen on (default: `8080`)
//! - `REVIEWS_DATA_FILE`: Command log backing the store (default: unset, in-memory store)
//! - `REVIEWS_SYNC_WRITES`: fsync the command log after every write (default: `false`)
//!
//! # Invariants
//!
//! - `listen_port` is always a valid port number (0-65535)
//! - `sync_writes` only has an effect when `data_file` is set

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub listen_addr: IpAddr,
    /// Port to listen on for HTTP requests.
    pub listen_port: u16,
    /// Command log for a durable store. `None` keeps reviews in memory only.
    pub data_file: Option<PathBuf>,
    /// Whether every command log append is followed by an fsync.
    pub sync_writes: bool,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::DEFAULT_ADDR,
            listen_port: Self::DEFAULT_PORT,
            data_file: None,
            sync_writes: false,
        }
    }
}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 8080;
    /// Default bind address.
    pub const DEFAULT_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_addr = match lookup("REVIEWS_LISTEN_ADDR") {
            Some(value) => value.parse::<IpAddr>().map_err(|_| ConfigError::InvalidValue {
                name: "REVIEWS_LISTEN_ADDR".to_string(),
                message: format!("'{value}' is not an IP address"),
            })?,
            None => Self::DEFAULT_ADDR,
        };

        let listen_port = match lookup("REVIEWS_LISTEN_PORT") {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "REVIEWS_LISTEN_PORT".to_string(),
                message: format!("'{value}' is not a valid port number (must be 0-65535)"),
            })?,
            None => Self::DEFAULT_PORT,
        };

        let data_file = lookup("REVIEWS_DATA_FILE")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        let sync_writes = match lookup("REVIEWS_SYNC_WRITES").as_deref() {
            None | Some("" | "0" | "false") => false,
            Some("1" | "true") => true,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    name: "REVIEWS_SYNC_WRITES".to_string(),
                    message: format!("'{other}' is not a boolean (use true or false)"),
                });
            }
        };

        Ok(Self {
            listen_addr,
            listen_port,
            data_file,
            sync_writes,
        })
    }

    /// The socket address to bind.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.listen_port)
    }
}
