//! Client configuration
//!
//! Resolved once, before the client is built. [`ClientConfig::from_env`]
//! reads the conventional proxy and local-address variables.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::{HafasError, Result};

/// Variables consulted for a proxy, in order of preference
pub const PROXY_ENV_VARS: [&str; 2] = ["HTTPS_PROXY", "HTTP_PROXY"];

/// Comma-separated list of local addresses to bind outgoing connections to
pub const LOCAL_ADDRESS_ENV_VAR: &str = "LOCAL_ADDRESS";

/// Debug category variable; payload logging is enabled when it lists `hafas-client`
pub const DEBUG_ENV_VAR: &str = "DEBUG";

const DEBUG_CATEGORY: &str = "hafas-client";

/// How outgoing connections are established
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgressConfig {
    /// HTTP(S) proxy every request is routed through
    #[serde(default)]
    pub proxy: Option<String>,

    /// Local addresses to spread requests across (round-robin)
    #[serde(default)]
    pub local_addresses: Vec<String>,

    /// Idle keep-alive connections are closed after this many seconds
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,

    /// TCP keep-alive probe interval in seconds
    #[serde(default = "default_tcp_keepalive_secs")]
    pub tcp_keepalive_secs: u64,
}

const fn default_pool_idle_timeout_secs() -> u64 {
    90
}

const fn default_tcp_keepalive_secs() -> u64 {
    60
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            local_addresses: Vec::new(),
            pool_idle_timeout_secs: default_pool_idle_timeout_secs(),
            tcp_keepalive_secs: default_tcp_keepalive_secs(),
        }
    }
}

impl EgressConfig {
    /// Validate the configuration and parse the local addresses
    ///
    /// # Errors
    ///
    /// Returns a configuration error if both a proxy and local addresses are
    /// set, or if any local address is not a valid IPv4/IPv6 address.
    pub fn validate(&self) -> Result<Vec<IpAddr>> {
        if self.proxy.is_some() && !self.local_addresses.is_empty() {
            return Err(HafasError::Configuration(
                "Both env vars HTTPS_PROXY/HTTP_PROXY and LOCAL_ADDRESS are not supported."
                    .to_string(),
            ));
        }

        self.local_addresses
            .iter()
            .map(|addr| {
                addr.trim().parse::<IpAddr>().map_err(|_| {
                    HafasError::Configuration(format!("invalid local address: {addr}"))
                })
            })
            .collect()
    }
}

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Egress strategy settings
    #[serde(default)]
    pub egress: EgressConfig,

    /// Log request and response bodies at debug level
    #[serde(default)]
    pub log_payloads: bool,

    /// Default user-agent seed; randomized per call
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("hafas-client/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            egress: EgressConfig::default(),
            log_payloads: false,
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration suitable for testing
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            log_payloads: true,
            user_agent: "hafas-client-test".to_string(),
            ..Default::default()
        }
    }

    /// Read the configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the egress settings conflict or a
    /// local address is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_env_source(|key| std::env::var(key).ok())
    }

    /// Read the configuration from an arbitrary variable source
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let proxy = PROXY_ENV_VARS.iter().find_map(|&key| var(key));
        let local_addresses = var(LOCAL_ADDRESS_ENV_VAR)
            .map(|list| list.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        let log_payloads = var(DEBUG_ENV_VAR).is_some_and(|v| debug_category_enabled(&v));

        let config = Self {
            egress: EgressConfig {
                proxy,
                local_addresses,
                ..Default::default()
            },
            log_payloads,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(HafasError::Configuration(
                "user_agent must not be empty".to_string(),
            ));
        }
        self.egress.validate()?;
        Ok(())
    }
}

/// Whether a comma-separated debug category list enables this crate
fn debug_category_enabled(value: &str) -> bool {
    value.split(',').any(|category| category == DEBUG_CATEGORY)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn source(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.egress.proxy.is_none());
        assert!(config.egress.local_addresses.is_empty());
        assert!(!config.log_payloads);
        assert!(config.user_agent.starts_with("hafas-client/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_https_proxy_preferred() {
        let config = ClientConfig::from_env_source(source(&[
            ("HTTPS_PROXY", "http://secure:3128"),
            ("HTTP_PROXY", "http://plain:3128"),
        ]))
        .unwrap();
        assert_eq!(config.egress.proxy.as_deref(), Some("http://secure:3128"));

        let config =
            ClientConfig::from_env_source(source(&[("HTTP_PROXY", "http://plain:3128")])).unwrap();
        assert_eq!(config.egress.proxy.as_deref(), Some("http://plain:3128"));
    }

    #[test]
    fn test_local_addresses_parsed() {
        let config =
            ClientConfig::from_env_source(source(&[("LOCAL_ADDRESS", "10.0.0.1,::1")])).unwrap();
        let addrs = config.egress.validate().unwrap();
        assert_eq!(addrs.len(), 2);
        assert!(addrs[0].is_ipv4());
        assert!(addrs[1].is_ipv6());
    }

    #[test]
    fn test_proxy_and_local_address_conflict() {
        let err = ClientConfig::from_env_source(source(&[
            ("HTTP_PROXY", "http://plain:3128"),
            ("LOCAL_ADDRESS", "10.0.0.1"),
        ]))
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("LOCAL_ADDRESS"));
    }

    #[test]
    fn test_invalid_local_address() {
        let err = ClientConfig::from_env_source(source(&[("LOCAL_ADDRESS", "10.0.0.1,nope")]))
            .unwrap_err();
        assert!(err.to_string().contains("invalid local address: nope"));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = ClientConfig::from_env_source(source(&[
            ("HTTPS_PROXY", ""),
            ("LOCAL_ADDRESS", ""),
        ]))
        .unwrap();
        assert!(config.egress.proxy.is_none());
        assert!(config.egress.local_addresses.is_empty());
    }

    #[test]
    fn test_debug_category() {
        assert!(debug_category_enabled("hafas-client"));
        assert!(debug_category_enabled("foo,hafas-client,bar"));
        assert!(!debug_category_enabled("hafas-client-rest"));
        assert!(!debug_category_enabled("foo"));

        let config =
            ClientConfig::from_env_source(source(&[("DEBUG", "express,hafas-client")])).unwrap();
        assert!(config.log_payloads);
    }

    #[test]
    fn test_serde_defaults() {
        let config: ClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.egress.pool_idle_timeout_secs, 90);
        assert_eq!(config.egress.tcp_keepalive_secs, 60);
    }
}
