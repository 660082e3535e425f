//! Outgoing request shape
//!
//! An [`OutgoingRequest`] is built fresh per call and may be layered: later
//! layers override the method and body, and add to or replace headers and
//! query entries.

use std::collections::BTreeMap;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{HafasError, Result};

/// Request fields set so far; unset fields fall through to lower layers
#[derive(Debug, Clone, Default)]
pub struct OutgoingRequest {
    /// HTTP method
    pub method: Option<Method>,
    /// Headers (case-insensitive names)
    pub headers: HeaderMap,
    /// Query parameters; folded into the URL before sending
    pub query: BTreeMap<String, String>,
    /// Raw body
    pub body: Option<String>,
}

impl OutgoingRequest {
    /// Create an empty request
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP method
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the raw body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header, replacing earlier values of the same name
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the name or value is not a valid header.
    pub fn try_header(mut self, name: &str, value: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HafasError::Configuration(format!("invalid header name {name}: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| HafasError::Configuration(format!("invalid value for header {name}: {e}")))?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Overlay the method, body and query entries of `other` onto this request
    ///
    /// Headers are left alone; they are layered separately.
    #[must_use]
    pub fn overlay_fields(mut self, other: &Self) -> Self {
        if let Some(method) = &other.method {
            self.method = Some(method.clone());
        }
        if let Some(body) = &other.body {
            self.body = Some(body.clone());
        }
        self.query
            .extend(other.query.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Overlay headers, replacing all values of names present in `headers`
    pub fn overlay_headers(&mut self, headers: HeaderMap) {
        self.headers.extend(headers);
    }
}
