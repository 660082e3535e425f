//! Per-call request context

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::profile::Profile;

/// Language used when neither the caller nor the profile picks one
pub const DEFAULT_LANGUAGE: &str = "en";

/// Caller options that influence every request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Requested response language (e.g. `de`)
    #[serde(default)]
    pub language: Option<String>,
}

/// Immutable bundle passed into every request
#[derive(Debug, Clone)]
pub struct Context {
    /// Backend deployment the request targets
    pub profile: Arc<dyn Profile>,
    /// Caller options
    pub options: RequestOptions,
    /// Bearer token for the REST protocol
    pub token: Option<SecretString>,
}

impl Context {
    /// Create a context with default options and no token
    #[must_use]
    pub fn new(profile: Arc<dyn Profile>) -> Self {
        Self {
            profile,
            options: RequestOptions::default(),
            token: None,
        }
    }

    /// Set the requested language
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.options.language = Some(language.into());
        self
    }

    /// Set the REST bearer token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    /// The profile as a trait object
    #[must_use]
    pub fn profile(&self) -> &dyn Profile {
        self.profile.as_ref()
    }

    /// The bearer token, if any
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_ref().map(ExposeSecret::expose_secret)
    }

    /// Language for legacy bodies: caller choice, then profile default, then `en`
    #[must_use]
    pub fn envelope_language(&self) -> &str {
        self.options
            .language
            .as_deref()
            .or_else(|| self.profile.default_language())
            .unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Language for REST queries: caller choice, then `en`
    #[must_use]
    pub fn rest_language(&self) -> &str {
        self.options.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }
}
