//! Immutable configuration for each relay component.
//!
//! Values are read once at startup (see the `erp-relay` binary) and moved into the component
//! that needs them; nothing here is mutated afterwards.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::RelayError;
use crate::substitution::{DEFAULT_LINKED_SERVER, validate_linked_server};

/// Remote round trips through the ERP link are slow; two minutes matches the gateway's budget.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_BRIDGE_PORT: u16 = 4000;

/// Header carrying the pre-shared secret.
pub const SECRET_HEADER: &str = "x-bridge-secret";

/// Path of the bridge's single query endpoint.
pub const QUERY_PATH: &str = "/query-erp";

/// A shared secret that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Byte-exact comparison that does not short-circuit on the first differing byte.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let candidate = candidate.as_bytes();
        let mut diff = expected.len() ^ candidate.len();
        for (i, b) in expected.iter().enumerate() {
            let c = candidate.get(i).copied().unwrap_or(!*b);
            diff |= usize::from(b ^ c);
        }
        diff == 0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Which `QueryErp` implementation the public service uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum RelayStrategy {
    /// Forward envelopes to the bridge agent over HTTP(S).
    Http,
    /// Run OPENQUERY wrappers on a SQL Server with the ERP as a linked server.
    Gateway,
    /// Connect to the ERP from this process, for deployments that sit next to it.
    Direct,
}

/// Bridge agent settings.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub bind_addr: SocketAddr,
    pub secret: Secret,
    /// ODBC connection string for the ERP; never logged.
    pub erp_connection_string: Secret,
    /// Driver-side timeout applied to every ERP statement.
    pub query_timeout: Duration,
}

impl BridgeConfig {
    #[must_use]
    pub fn new(bind_addr: SocketAddr, secret: Secret, erp_connection_string: Secret) -> Self {
        Self {
            bind_addr,
            secret,
            erp_connection_string,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// # Errors
    /// Returns `RelayError::Config` when the secret is empty; an empty secret would let any
    /// caller that sends an empty header through.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.secret.is_empty() {
            return Err(RelayError::Config(
                "BRIDGE_SECRET_KEY must be set for the bridge agent".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP relay client settings.
#[derive(Debug, Clone)]
pub struct RelayClientConfig {
    /// Base URL of the bridge agent, e.g. `https://bridge.internal:4000`.
    pub endpoint: String,
    pub secret: Secret,
    pub timeout: Duration,
}

impl RelayClientConfig {
    pub fn new(endpoint: impl Into<String>, secret: Secret) -> Self {
        Self {
            endpoint: endpoint.into(),
            secret,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the query endpoint.
    #[must_use]
    pub fn query_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        if base.ends_with(QUERY_PATH) {
            base.to_string()
        } else {
            format!("{base}{QUERY_PATH}")
        }
    }

    /// # Errors
    /// Returns `RelayError::Config` for a missing endpoint or secret.
    pub fn validate(&self) -> Result<(), RelayError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(RelayError::Config("ERP_BRIDGE_URL must be set".to_string()));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(RelayError::Config(format!(
                "ERP_BRIDGE_URL must be an http(s) URL, got {endpoint:?}"
            )));
        }
        if self.secret.is_empty() {
            return Err(RelayError::Config("BRIDGE_SECRET_KEY must be set".to_string()));
        }
        Ok(())
    }
}

/// In-process ERP access settings.
#[derive(Debug, Clone)]
pub struct DirectConfig {
    /// ODBC connection string for the ERP; never logged.
    pub connection_string: Secret,
    pub timeout: Duration,
}

impl DirectConfig {
    #[must_use]
    pub fn new(connection_string: Secret) -> Self {
        Self {
            connection_string,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// # Errors
    /// Returns `RelayError::Config` when the connection string is empty.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.connection_string.is_empty() {
            return Err(RelayError::Config(
                "ERP_ODBC_CONNECTION_STRING must be set for the direct strategy".to_string(),
            ));
        }
        Ok(())
    }
}

/// OPENQUERY gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub server: String,
    pub port: Option<u16>,
    pub instance_name: Option<String>,
    pub database: String,
    pub user: String,
    pub password: Secret,
    pub linked_server: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(server: String, database: String, user: String, password: Secret) -> Self {
        Self {
            server,
            port: None,
            instance_name: None,
            database,
            user,
            password,
            linked_server: DEFAULT_LINKED_SERVER.to_string(),
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_instance_name(mut self, instance_name: Option<String>) -> Self {
        self.instance_name = instance_name;
        self
    }

    #[must_use]
    pub fn with_linked_server(mut self, linked_server: impl Into<String>) -> Self {
        self.linked_server = linked_server.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// # Errors
    /// Returns `RelayError::Config` for a missing host or an unusable linked server name.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.server.trim().is_empty() {
            return Err(RelayError::Config("GATEWAY_HOST must be set".to_string()));
        }
        validate_linked_server(&self.linked_server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_matching_is_exact() {
        let secret = Secret::new("abc123");
        assert!(secret.matches("abc123"));
        assert!(!secret.matches("wrong-secret"));
        assert!(!secret.matches("abc12"));
        assert!(!secret.matches("abc1234"));
        assert!(!secret.matches("ABC123"));
        assert!(!secret.matches(""));
    }

    #[test]
    fn empty_secret_only_matches_empty() {
        let secret = Secret::new("");
        assert!(secret.matches(""));
        assert!(!secret.matches("x"));
    }

    #[test]
    fn secret_is_redacted() {
        let cfg = RelayClientConfig::new("http://bridge:4000", Secret::new("abc123"));
        assert!(!format!("{cfg:?}").contains("abc123"));
    }

    #[test]
    fn query_url_is_normalized() {
        let secret = Secret::new("s");
        for endpoint in [
            "http://bridge:4000",
            "http://bridge:4000/",
            "http://bridge:4000/query-erp",
        ] {
            let cfg = RelayClientConfig::new(endpoint, secret.clone());
            assert_eq!(cfg.query_url(), "http://bridge:4000/query-erp");
        }
    }

    #[test]
    fn client_config_validation() {
        assert!(RelayClientConfig::new("", Secret::new("s")).validate().is_err());
        assert!(RelayClientConfig::new("bridge:4000", Secret::new("s")).validate().is_err());
        assert!(RelayClientConfig::new("https://bridge", Secret::new("")).validate().is_err());
        assert!(RelayClientConfig::new("https://bridge", Secret::new("s")).validate().is_ok());
    }

    #[test]
    fn bridge_requires_secret() {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let cfg = BridgeConfig::new(addr, Secret::new(""), Secret::new("DSN=ERP"));
        assert!(matches!(cfg.validate(), Err(RelayError::Config(_))));
    }

    #[test]
    fn direct_requires_connection_string() {
        assert!(DirectConfig::new(Secret::new("")).validate().is_err());
        let cfg = DirectConfig::new(Secret::new("DSN=ERP;PWD=masterkey"));
        assert!(cfg.validate().is_ok());
        assert!(!format!("{cfg:?}").contains("masterkey"));
    }

    #[test]
    fn gateway_defaults() {
        let cfg = GatewayConfig::new(
            "sql01".into(),
            "ponte".into(),
            "relay".into(),
            Secret::new("pw"),
        );
        assert_eq!(cfg.linked_server, "CONSULTA");
        assert_eq!(cfg.timeout, Duration::from_secs(120));
        assert!(cfg.validate().is_ok());
        assert!(cfg.with_linked_server("bad name").validate().is_err());
    }
}
