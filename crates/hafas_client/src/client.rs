//! HAFAS client facade
//!
//! Owns the egress pools and the user agent seed, and exposes both protocol
//! variants behind the [`HafasRequester`] trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use tracing::info;

use crate::config::ClientConfig;
use crate::context::Context;
use crate::egress::EgressSelector;
use crate::envelope::{self, EnvelopeResponse};
use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::rest::{self, RestResponse};

/// Trait for HAFAS request clients
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HafasRequester: Send + Sync {
    /// Send one logical request through the legacy envelope protocol
    async fn request(&self, ctx: &Context, logical_request: Value) -> Result<EnvelopeResponse>;

    /// Call a REST method with the given query parameters
    async fn rest_request(
        &self,
        ctx: &Context,
        method: &str,
        query: BTreeMap<String, String>,
    ) -> Result<RestResponse>;
}

/// HAFAS client backed by reqwest
#[derive(Debug)]
pub struct HafasClient {
    executor: RequestExecutor,
    user_agent: String,
}

impl HafasClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the egress settings conflict, a local
    /// address is invalid, or an HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let egress = EgressSelector::from_config(&config.egress)?;
        info!(
            pools = egress.pool_count(),
            user_agent = %config.user_agent,
            "HAFAS client initialized"
        );

        Ok(Self {
            executor: RequestExecutor::new(egress, config.log_payloads),
            user_agent: config.user_agent.clone(),
        })
    }

    /// Create a client configured from the process environment
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`] and [`HafasClient::new`].
    pub fn from_env() -> Result<Self> {
        Self::new(&ClientConfig::from_env()?)
    }

    /// The underlying request executor
    #[must_use]
    pub const fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Seed the per-call User-Agent is derived from
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[async_trait]
impl HafasRequester for HafasClient {
    async fn request(&self, ctx: &Context, logical_request: Value) -> Result<EnvelopeResponse> {
        envelope::request(&self.executor, ctx, &self.user_agent, logical_request).await
    }

    async fn rest_request(
        &self,
        ctx: &Context,
        method: &str,
        query: BTreeMap<String, String>,
    ) -> Result<RestResponse> {
        rest::request(&self.executor, ctx, &self.user_agent, method, query).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::config::EgressConfig;
    use crate::error::HafasError;
    use crate::profile::ProfileConfig;

    #[test]
    fn test_client_creation() {
        let client = HafasClient::new(&ClientConfig::for_testing()).unwrap();
        assert_eq!(client.executor().egress().pool_count(), 1);
        assert!(client.user_agent().starts_with("hafas-client/"));
    }

    #[test]
    fn test_client_rejects_conflicting_egress() {
        let config = ClientConfig {
            egress: EgressConfig {
                proxy: Some("http://proxy.local:3128".to_string()),
                local_addresses: vec!["127.0.0.1".to_string()],
                ..EgressConfig::default()
            },
            ..ClientConfig::for_testing()
        };
        let err = HafasClient::new(&config).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_client_with_local_addresses() {
        let config = ClientConfig {
            egress: EgressConfig {
                local_addresses: vec!["127.0.0.1".to_string(), "::1".to_string()],
                ..EgressConfig::default()
            },
            ..ClientConfig::for_testing()
        };
        let client = HafasClient::new(&config).unwrap();
        assert_eq!(client.executor().egress().pool_count(), 2);
    }

    async fn departures(requester: &dyn HafasRequester, ctx: &Context) -> Result<Value> {
        let response = requester
            .request(ctx, json!({"meth": "StationBoard", "req": {"type": "DEP"}}))
            .await?;
        Ok(response.res["jnyL"].clone())
    }

    #[tokio::test]
    async fn test_requester_can_be_mocked() {
        let mut mock = MockHafasRequester::new();
        mock.expect_request()
            .withf(|_, req| req["meth"] == "StationBoard")
            .times(1)
            .returning(|_, _| {
                Ok(EnvelopeResponse {
                    res: json!({"jnyL": [{"jid": "1"}]}),
                    common: Value::Null,
                })
            });

        let ctx = Context::new(Arc::new(ProfileConfig::for_testing("https://example.com/")));
        let journeys = departures(&mock, &ctx).await.unwrap();
        assert_eq!(journeys, json!([{"jid": "1"}]));
    }

    #[tokio::test]
    async fn test_mocked_error_propagates() {
        let mut mock = MockHafasRequester::new();
        mock.expect_rest_request()
            .returning(|_, _, _| Err(HafasError::Configuration("no token".to_string())));

        let ctx = Context::new(Arc::new(ProfileConfig::new("https://example.com/")));
        let err = mock
            .rest_request(&ctx, "location.name", BTreeMap::new())
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
