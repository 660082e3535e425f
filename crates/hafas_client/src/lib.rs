//! HAFAS protocol client
//!
//! Talks to HAFAS journey-planning backends in both of their wire dialects:
//!
//! * the legacy envelope protocol (`mgate.exe`), a single JSON POST endpoint
//!   whose bodies wrap one logical request in `svcReqL`, optionally
//!   authenticated with an MD5 checksum or a mic/mac pair;
//! * the REST protocol, per-method URLs authenticated with a bearer token,
//!   whose deeply nested responses are flattened with a tree remap.
//!
//! # Architecture
//!
//! [`HafasClient`] owns an [`EgressSelector`] (direct, proxied, or a
//! round-robin over local bind addresses) and a [`RequestExecutor`] that
//! layers, sends and validates every request. Backend specifics live in a
//! [`Profile`]; [`ProfileConfig`] covers the common case of a purely
//! declarative profile. Per-call settings travel in a [`Context`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use hafas_client::{ClientConfig, Context, HafasClient, HafasRequester, ProfileConfig};
//! use serde_json::json;
//!
//! let client = HafasClient::new(&ClientConfig::from_env()?)?;
//! let profile = ProfileConfig::new("https://reiseauskunft.bahn.de/bin/mgate.exe");
//! let ctx = Context::new(Arc::new(profile)).with_language("de");
//!
//! let response = client
//!     .request(&ctx, json!({"meth": "LocMatch", "req": {"input": {"field": "S", "loc": {"name": "Berlin"}}}}))
//!     .await?;
//! ```

pub mod checksum;
mod client;
mod config;
mod context;
mod egress;
pub mod envelope;
mod error;
pub mod error_codes;
mod executor;
mod profile;
mod request;
pub mod rest;
pub mod tree;
mod user_agent;

pub use checksum::{AuthParams, Salt};
pub use client::{HafasClient, HafasRequester};
pub use config::{
    ClientConfig, DEBUG_ENV_VAR, EgressConfig, LOCAL_ADDRESS_ENV_VAR, PROXY_ENV_VARS,
};
pub use context::{Context, DEFAULT_LANGUAGE, RequestOptions};
pub use egress::{ConnectionStrategy, EgressKind, EgressSelector};
pub use envelope::EnvelopeResponse;
pub use error::{
    DiagnosticContext, ErrorInfo, ErrorKind, HafasError, RequestSnapshot, Result, VendorError,
};
pub use executor::{ExecuteOptions, FetchResponse, PreparedRequest, RequestExecutor};
pub use profile::{Profile, ProfileConfig};
pub use request::OutgoingRequest;
pub use rest::RestResponse;
pub use tree::{PathPattern, PathSegment, TreeMatch};
