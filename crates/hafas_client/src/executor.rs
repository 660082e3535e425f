//! HTTP execution and response validation
//!
//! The [`RequestExecutor`] layers the request, folds the query into the URL,
//! sends it over the selected egress strategy and checks status and content
//! type before decoding the JSON body.

use reqwest::header::{
    ACCEPT, CONNECTION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT,
};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::context::Context;
use crate::egress::EgressSelector;
use crate::error::{DiagnosticContext, HafasError, RequestSnapshot, Result, header_snapshot};
use crate::request::OutgoingRequest;
use crate::user_agent;

const APPLICATION_JSON: &str = "application/json";

/// Per-call execution options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Fail with [`HafasError::HttpStatus`] on non-2xx responses
    pub throw_if_not_ok: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            throw_if_not_ok: true,
        }
    }
}

/// A validated, decoded response
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Decoded JSON body
    pub body: Value,
    /// Diagnostic context of the exchange
    pub context: DiagnosticContext,
}

impl FetchResponse {
    /// Whether the status is in the 2xx range
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }
}

/// A request with every layer applied, ready to send
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: Method,
    /// Final headers
    pub headers: HeaderMap,
    /// Full URL including the serialized query
    pub url: Url,
    /// Raw body
    pub body: Option<String>,
}

/// Sends requests over an egress strategy and validates the responses
#[derive(Debug)]
pub struct RequestExecutor {
    egress: EgressSelector,
    log_payloads: bool,
}

impl RequestExecutor {
    /// Create an executor
    #[must_use]
    pub const fn new(egress: EgressSelector, log_payloads: bool) -> Self {
        Self {
            egress,
            log_payloads,
        }
    }

    /// The egress selector used for every call
    #[must_use]
    pub const fn egress(&self) -> &EgressSelector {
        &self.egress
    }

    /// Apply all request layers and build the final URL
    ///
    /// Layers, lowest priority first: defaults (POST, empty query), the
    /// profile's `transform_req` output, the caller's method/body/query,
    /// the fixed headers, the caller's headers.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the resource URL or user agent is invalid.
    pub fn prepare(
        ctx: &Context,
        user_agent_seed: &str,
        resource: &str,
        request: OutgoingRequest,
    ) -> Result<PreparedRequest> {
        let defaults = OutgoingRequest::new().with_method(Method::POST);
        let mut layered = ctx
            .profile()
            .transform_req(ctx, defaults)
            .overlay_fields(&request);

        layered.overlay_headers(fixed_headers(user_agent_seed)?);
        layered.overlay_headers(request.headers);

        let url = build_url(resource, &layered)?;

        Ok(PreparedRequest {
            method: layered.method.unwrap_or(Method::POST),
            headers: layered.headers,
            url,
            body: layered.body,
        })
    }

    /// Execute a request and validate the response
    ///
    /// # Errors
    ///
    /// * [`HafasError::Configuration`] if the request cannot be built
    /// * [`HafasError::Transport`] on network failure or undecodable JSON
    /// * [`HafasError::HttpStatus`] on non-2xx status when `throw_if_not_ok` is set
    /// * [`HafasError::ContentType`] if the response is not `application/json`
    #[instrument(skip_all, fields(resource = %resource))]
    pub async fn execute(
        &self,
        ctx: &Context,
        user_agent_seed: &str,
        resource: &str,
        request: OutgoingRequest,
        options: ExecuteOptions,
    ) -> Result<FetchResponse> {
        let prepared = Self::prepare(ctx, user_agent_seed, resource, request)?;
        let strategy = self.egress.get_strategy();

        if self.log_payloads {
            debug!(
                url = %prepared.url,
                body = prepared.body.as_deref().unwrap_or_default(),
                "HAFAS request"
            );
        }
        debug!(method = %prepared.method, egress = %strategy.kind(), "Sending HAFAS request");

        let mut builder = strategy
            .client()
            .request(prepared.method.clone(), prepared.url.clone())
            .headers(prepared.headers.clone());
        if let Some(body) = &prepared.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let context = DiagnosticContext {
            request_body: prepared.body,
            request: RequestSnapshot {
                method: prepared.method.to_string(),
                headers: header_snapshot(&prepared.headers),
            },
            url: prepared.url.to_string(),
            status_code: status.as_u16(),
            status_text: status_text(status),
            response_headers: header_snapshot(&headers),
        };

        if options.throw_if_not_ok && !status.is_success() {
            return Err(HafasError::HttpStatus {
                message: context.status_text.clone(),
                context: Box::new(context),
            });
        }

        if let Some(content_type) = headers.get(CONTENT_TYPE) {
            let raw = String::from_utf8_lossy(content_type.as_bytes()).into_owned();
            if !is_json_media_type(&raw) {
                return Err(HafasError::ContentType {
                    content_type: raw,
                    context: Box::new(context),
                });
            }
        }

        let body: Value = response.json().await?;

        if self.log_payloads {
            debug!(status = status.as_u16(), body = %body, "HAFAS response");
        }

        Ok(FetchResponse {
            status,
            headers,
            body,
            context,
        })
    }
}

fn fixed_headers(user_agent_seed: &str) -> Result<HeaderMap> {
    let ua = user_agent::randomize(user_agent_seed);
    let ua = HeaderValue::from_str(&ua)
        .map_err(|e| HafasError::Configuration(format!("invalid user agent {ua}: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
    headers.insert(USER_AGENT, ua);
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    Ok(headers)
}

fn build_url(resource: &str, request: &OutgoingRequest) -> Result<Url> {
    let mut url = Url::parse(resource)
        .map_err(|e| HafasError::Configuration(format!("invalid resource URL {resource}: {e}")))?;
    if !request.query.is_empty() {
        url.query_pairs_mut().extend_pairs(&request.query);
    }
    Ok(url)
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| status.as_str().to_string(), str::to_string)
}

/// Whether a Content-Type header value denotes `application/json`
///
/// Parameters such as `charset` are ignored; unparsable values are rejected.
fn is_json_media_type(content_type: &str) -> bool {
    content_type
        .parse::<mime::Mime>()
        .is_ok_and(|m| m.essence_str() == APPLICATION_JSON)
}
