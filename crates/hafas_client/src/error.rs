//! HAFAS client error types
//!
//! Every failure surfaced by the client is a [`HafasError`]. Failures that
//! happen after a response arrived carry a [`DiagnosticContext`] describing
//! what was sent and what came back.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T, E = HafasError> = std::result::Result<T, E>;

/// Normalized classification of a vendor error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Missing or invalid authentication data
    AccessDenied,
    /// The request was malformed or semantically invalid
    InvalidRequest,
    /// The requested entity or connection does not exist
    NotFound,
    /// The backend failed internally
    ServerError,
}

impl ErrorKind {
    /// Stable string code for this kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessDenied => "ACCESS_DENIED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::ServerError => "SERVER_ERROR",
        }
    }

    /// HTTP status a server relaying this error should answer with
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::AccessDenied => 401,
            Self::InvalidRequest => 400,
            Self::NotFound => 404,
            Self::ServerError => 500,
        }
    }

    /// Whether the caller (not the backend) is at fault
    #[must_use]
    pub const fn is_caller_error(self) -> bool {
        !matches!(self, Self::ServerError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of a static vendor error table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Normalized kind
    pub kind: ErrorKind,
    /// Human readable description
    pub message: &'static str,
}

/// Snapshot of the outgoing request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    /// HTTP method
    pub method: String,
    /// Header names (lowercase) and values
    pub headers: BTreeMap<String, String>,
}

/// Everything needed to reconstruct a failed exchange
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticContext {
    /// Literal request body
    pub request_body: Option<String>,
    /// The outgoing request as sent
    pub request: RequestSnapshot,
    /// Fully resolved URL including the query string
    pub url: String,
    /// HTTP status code of the response
    pub status_code: u16,
    /// Canonical reason phrase of the status code
    pub status_text: String,
    /// Response headers
    pub response_headers: BTreeMap<String, String>,
}

/// Flattens a header map into a sorted string map
///
/// Sensitive values are redacted; non-UTF-8 values are dropped.
pub(crate) fn header_snapshot(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let value = if value.is_sensitive() {
                "[REDACTED]"
            } else {
                value.to_str().ok()?
            };
            Some((name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

/// Protocol-level error reported by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorError {
    /// Normalized or vendor-supplied message
    pub message: String,
    /// Kind code when the vendor code is known, otherwise the raw vendor code
    pub code: Option<String>,
    /// Normalized kind (known codes only)
    pub kind: Option<ErrorKind>,
    /// Raw vendor error code (known codes only)
    pub hafas_error_code: Option<String>,
    /// Raw vendor error text (known codes only)
    pub hafas_error_message: Option<String>,
    /// Backend response id
    pub response_id: Option<String>,
    /// Exchange that produced the error
    pub context: DiagnosticContext,
}

impl VendorError {
    /// Normalize a vendor error against a static table
    ///
    /// Known codes take the table's kind and message and keep the raw code
    /// and text as auxiliary fields. Unknown codes degrade to a message-only
    /// error built from the text, falling back to the code.
    #[must_use]
    pub fn from_vendor(
        info: Option<&ErrorInfo>,
        code: Option<&str>,
        text: Option<&str>,
        response_id: Option<&str>,
        context: DiagnosticContext,
    ) -> Self {
        let response_id = response_id.map(str::to_string);
        match info {
            Some(info) => Self {
                message: info.message.to_string(),
                code: Some(info.kind.as_str().to_string()),
                kind: Some(info.kind),
                hafas_error_code: code.map(str::to_string),
                hafas_error_message: text.map(str::to_string),
                response_id,
                context,
            },
            None => Self {
                message: text.or(code).unwrap_or("unknown error").to_string(),
                code: code.map(str::to_string),
                kind: None,
                hafas_error_code: None,
                hafas_error_message: None,
                response_id,
                context,
            },
        }
    }
}

/// Errors that can occur while talking to a HAFAS backend
#[derive(Debug, Error)]
pub enum HafasError {
    /// Invalid configuration, raised before any network call
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network failure or undecodable response body
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status on a call path that checks the status
    #[error("{message}")]
    HttpStatus {
        /// Status text of the response
        message: String,
        /// Exchange that produced the error
        context: Box<DiagnosticContext>,
    },

    /// The response declared a non-JSON media type
    #[error("invalid response content-type: {content_type}")]
    ContentType {
        /// The offending Content-Type header value
        content_type: String,
        /// Exchange that produced the error
        context: Box<DiagnosticContext>,
    },

    /// The decoded body is missing the expected structure
    #[error("invalid response")]
    InvalidResponse {
        /// Exchange that produced the error
        context: Box<DiagnosticContext>,
    },

    /// The backend reported an error in the response body
    #[error("{}", .0.message)]
    Vendor(Box<VendorError>),
}

impl HafasError {
    /// Diagnostic context, present for every error raised after a response arrived
    #[must_use]
    pub fn context(&self) -> Option<&DiagnosticContext> {
        match self {
            Self::HttpStatus { context, .. }
            | Self::ContentType { context, .. }
            | Self::InvalidResponse { context } => Some(context),
            Self::Vendor(err) => Some(&err.context),
            Self::Configuration(_) | Self::Transport(_) => None,
        }
    }

    /// HTTP status code of the failed exchange
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => self.context().map(|c| c.status_code),
        }
    }

    /// Raw vendor error code, if the backend supplied one
    #[must_use]
    pub fn hafas_error_code(&self) -> Option<&str> {
        match self {
            Self::Vendor(err) => err
                .hafas_error_code
                .as_deref()
                .or(err.code.as_deref().filter(|_| err.kind.is_none())),
            _ => None,
        }
    }

    /// Normalized kind of a vendor error with a known code
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Vendor(err) => err.kind,
            _ => None,
        }
    }

    /// Returns true for configuration errors
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<VendorError> for HafasError {
    fn from(err: VendorError) -> Self {
        Self::Vendor(Box::new(err))
    }
}
