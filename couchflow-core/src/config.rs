//! Connection configuration for the CouchDB connector.
//!
//! [`ConnectionConfig`] can be deserialized from whatever configuration format the host
//! uses; every field has a default so partial configurations are accepted.
//!
//! # Example
//!
//! ```ignore
//! use couchflow::config::ConnectionConfig;
//!
//! let config = ConnectionConfig::default()
//!     .with_host("couch.internal")
//!     .with_database("orders")
//!     .with_auto_create(false);
//!
//! assert_eq!(config.base_url(), "http://couch.internal:5984");
//! ```

use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

use crate::error::{ConnectorError, ConnectorResult};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PROTOCOL: &str = "http";
pub const DEFAULT_PORT: u16 = 5984;
pub const DEFAULT_DATABASE: &str = "test";

/// Where the connector finds CouchDB and which database it operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Host on which CouchDB is installed.
    pub host: String,
    /// Protocol to connect with, `http` or `https`.
    pub protocol: String,
    /// CouchDB port.
    pub port: u16,
    /// Target database to operate on.
    pub database: String,
    /// Create the target database on connect when it does not exist, instead of failing.
    pub auto_create: bool,
    /// Optional request timeout in seconds applied by the HTTP client.
    pub timeout_secs: Option<u64>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            auto_create: true,
            timeout_secs: None,
        }
    }
}

impl ConnectionConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Returns the configured request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Returns `host:port`, as used in connection failure messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the server root URL, e.g. `http://localhost:5984`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// Checks that the configuration can describe a reachable database.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidConfig`] for an empty host or database, or a
    /// protocol other than `http`/`https`.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConnectorError::InvalidConfig("host must not be empty".into()));
        }
        if self.database.trim().is_empty() {
            return Err(ConnectorError::InvalidConfig("database must not be empty".into()));
        }
        match self.protocol.as_str() {
            "http" | "https" => Ok(()),
            other => Err(ConnectorError::InvalidConfig(format!(
                "unsupported protocol '{other}', expected http or https"
            ))),
        }
    }
}

/// Credentials supplied to `connect` when CouchDB has user authentication enabled.
///
/// The username doubles as the connection key; the password is never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}
