//! Backend profiles
//!
//! A [`Profile`] describes one HAFAS deployment: where it lives, how requests
//! are authenticated, which static fields every legacy body carries, and the
//! hooks that shape requests and extract common data. [`ProfileConfig`] is a
//! data-only implementation that can be loaded from configuration files.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::checksum::Salt;
use crate::context::Context;
use crate::error::{ErrorInfo, HafasError, Result};
use crate::error_codes;
use crate::request::OutgoingRequest;

/// Description of one HAFAS backend deployment
pub trait Profile: fmt::Debug + Send + Sync {
    /// Endpoint URL; REST method names are appended to it
    fn endpoint(&self) -> &str;

    /// Salt for checksum and mic/mac authentication
    fn salt(&self) -> Option<&Salt> {
        None
    }

    /// Add `checksum = md5(body ‖ salt)` to legacy requests
    fn add_checksum(&self) -> bool {
        false
    }

    /// Add `mic`/`mac` to legacy requests
    fn add_mic_mac(&self) -> bool {
        false
    }

    /// Language used when the caller does not pick one
    fn default_language(&self) -> Option<&str> {
        None
    }

    /// Client identification overlaid on every legacy body
    fn client(&self) -> Option<Value> {
        None
    }

    /// Extension identifier overlaid on every legacy body
    fn ext(&self) -> Option<Value> {
        None
    }

    /// Protocol version overlaid on every legacy body
    fn ver(&self) -> Option<Value> {
        None
    }

    /// Static authentication overlaid on every legacy body
    fn auth(&self) -> Option<Value> {
        None
    }

    /// Adjust an outgoing request before it is sent
    fn transform_req(&self, _ctx: &Context, req: OutgoingRequest) -> OutgoingRequest {
        req
    }

    /// Adjust a legacy request body before the static fields are overlaid
    fn transform_req_body(&self, _ctx: &Context, body: Value) -> Value {
        body
    }

    /// Extract the common data of a legacy response
    fn parse_common(&self, _ctx: &Context, res: &Value) -> Value {
        res.get("common").cloned().unwrap_or(Value::Null)
    }

    /// Look up a legacy envelope error code
    fn legacy_error(&self, code: &str) -> Option<&'static ErrorInfo> {
        error_codes::legacy_error(code)
    }

    /// Look up a REST error code
    fn rest_error(&self, code: &str) -> Option<&'static ErrorInfo> {
        error_codes::rest_error(code)
    }
}

/// Data-only profile, deserializable from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfig {
    /// Endpoint URL
    pub endpoint: String,

    /// Shared secret for checksum or mic/mac
    #[serde(default)]
    pub salt: Option<Salt>,

    /// Add a checksum query parameter
    #[serde(default)]
    pub add_checksum: bool,

    /// Add mic and mac query parameters
    #[serde(default)]
    pub add_mic_mac: bool,

    /// Default request language
    #[serde(default)]
    pub default_language: Option<String>,

    /// `client` field of legacy bodies
    #[serde(default)]
    pub client: Option<Value>,

    /// `ext` field of legacy bodies
    #[serde(default)]
    pub ext: Option<Value>,

    /// `ver` field of legacy bodies
    #[serde(default)]
    pub ver: Option<Value>,

    /// `auth` field of legacy bodies
    #[serde(default)]
    pub auth: Option<Value>,
}

impl ProfileConfig {
    /// Create a profile with only an endpoint
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            salt: None,
            add_checksum: false,
            add_mic_mac: false,
            default_language: None,
            client: None,
            ext: None,
            ver: None,
            auth: None,
        }
    }

    /// Create a profile suitable for testing
    #[must_use]
    pub fn for_testing(endpoint: impl Into<String>) -> Self {
        Self {
            default_language: Some("de".to_string()),
            client: Some(serde_json::json!({"id": "TEST", "type": "IPH", "name": "test"})),
            ver: Some(Value::String("1.16".to_string())),
            auth: Some(serde_json::json!({"type": "AID", "aid": "test-aid"})),
            ..Self::new(endpoint)
        }
    }

    /// Validate the profile
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the endpoint is not an absolute URL or
    /// an authentication scheme is enabled without a usable salt.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.endpoint).map_err(|e| {
            HafasError::Configuration(format!("invalid endpoint {}: {e}", self.endpoint))
        })?;

        if self.add_checksum || self.add_mic_mac {
            let salt = self.salt.as_ref().ok_or_else(|| {
                HafasError::Configuration(
                    "salt is required when addChecksum or addMicMac is set".to_string(),
                )
            })?;
            salt.to_bytes()?;
        }
        Ok(())
    }
}

impl Profile for ProfileConfig {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn salt(&self) -> Option<&Salt> {
        self.salt.as_ref()
    }

    fn add_checksum(&self) -> bool {
        self.add_checksum
    }

    fn add_mic_mac(&self) -> bool {
        self.add_mic_mac
    }

    fn default_language(&self) -> Option<&str> {
        self.default_language.as_deref()
    }

    fn client(&self) -> Option<Value> {
        self.client.clone()
    }

    fn ext(&self) -> Option<Value> {
        self.ext.clone()
    }

    fn ver(&self) -> Option<Value> {
        self.ver.clone()
    }

    fn auth(&self) -> Option<Value> {
        self.auth.clone()
    }
}
