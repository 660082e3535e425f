//! Egress selection
//!
//! Decides once, at construction, how outbound connections are made: directly,
//! through a proxy, or bound to one of several local addresses. Every
//! strategy owns a keep-alive `reqwest::Client` (a connection pool) that lives
//! as long as the selector.

use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy, redirect};
use tracing::debug;

use crate::config::EgressConfig;
use crate::error::{HafasError, Result};

const MAX_REDIRECTS: usize = 10;

/// The way a strategy establishes its connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EgressKind {
    /// Direct connection from the default local address
    Direct,
    /// Routed through an HTTP(S) proxy
    Proxy(String),
    /// Bound to a specific local address
    LocalAddress(IpAddr),
}

impl fmt::Display for EgressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Proxy(url) => write!(f, "proxy {url}"),
            Self::LocalAddress(addr) => write!(f, "local address {addr}"),
        }
    }
}

/// A connection pool together with the way it connects
#[derive(Debug, Clone)]
pub struct ConnectionStrategy {
    kind: EgressKind,
    client: Client,
}

impl ConnectionStrategy {
    /// How this strategy connects
    #[must_use]
    pub const fn kind(&self) -> &EgressKind {
        &self.kind
    }

    /// The pooled HTTP client to send requests with
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }
}

/// Hands out connection strategies, rotating across local-address pools
#[derive(Debug)]
pub struct EgressSelector {
    strategies: Vec<ConnectionStrategy>,
    cursor: AtomicUsize,
}

impl EgressSelector {
    /// Build the strategies described by the configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a proxy and local addresses are both
    /// configured, a local address is invalid, or a client cannot be built.
    pub fn from_config(config: &EgressConfig) -> Result<Self> {
        let addresses = config.validate()?;

        let strategies = if let Some(proxy) = &config.proxy {
            let proxy_setting = Proxy::all(proxy.as_str()).map_err(|e| {
                HafasError::Configuration(format!("invalid proxy address {proxy}: {e}"))
            })?;
            let client = build(base_builder(config).proxy(proxy_setting))?;
            vec![ConnectionStrategy {
                kind: EgressKind::Proxy(proxy.clone()),
                client,
            }]
        } else if addresses.is_empty() {
            vec![ConnectionStrategy {
                kind: EgressKind::Direct,
                client: build(base_builder(config).no_proxy())?,
            }]
        } else {
            addresses
                .into_iter()
                .map(|addr| {
                    let client = build(base_builder(config).no_proxy().local_address(addr))?;
                    Ok(ConnectionStrategy {
                        kind: EgressKind::LocalAddress(addr),
                        client,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };

        debug!(
            pools = strategies.len(),
            first = %strategies[0].kind,
            "Egress strategies initialized"
        );

        Ok(Self {
            strategies,
            cursor: AtomicUsize::new(0),
        })
    }

    /// A selector using one direct keep-alive pool
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the client cannot be built.
    pub fn direct() -> Result<Self> {
        Self::from_config(&EgressConfig::default())
    }

    /// Strategy for the next request
    ///
    /// With several local-address pools this rotates in a fixed cyclic
    /// order; concurrent callers each advance the cursor exactly once.
    #[must_use]
    pub fn get_strategy(&self) -> &ConnectionStrategy {
        let count = self.strategies.len();
        if count == 1 {
            return &self.strategies[0];
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % count;
        &self.strategies[index]
    }

    /// Number of distinct connection pools
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.strategies.len()
    }
}

fn base_builder(config: &EgressConfig) -> ClientBuilder {
    Client::builder()
        .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
        .tcp_keepalive(Duration::from_secs(config.tcp_keepalive_secs))
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
}

fn build(builder: ClientBuilder) -> Result<Client> {
    builder
        .build()
        .map_err(|e| HafasError::Configuration(format!("failed to build HTTP client: {e}")))
}
