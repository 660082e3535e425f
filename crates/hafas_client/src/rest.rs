//! REST protocol (`restproxy` / REST exe)
//!
//! Requests are authenticated with a bearer token. Responses are deeply
//! nested; the interesting parts are lifted to shallow fields with
//! [`tree::remap`](crate::tree::remap) before they are handed out.

use std::collections::BTreeMap;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::context::Context;
use crate::error::{HafasError, Result, VendorError};
use crate::executor::{ExecuteOptions, FetchResponse, RequestExecutor};
use crate::request::OutgoingRequest;
use crate::tree;

/// Nested positions lifted to shallow fields, with their field names
pub const TREE_MAPPING: [(&str, &str); 7] = [
    ("**.Stops.Stop", "stops"),
    ("**.Names.Name", "products"),
    ("**.Directions.Direction", "directions"),
    ("**.JourneyDetailRef.ref", "ref"),
    ("**.Notes.Note", "notes"),
    ("**.LegList.Leg", "legs"),
    ("**.ServiceDays[0]", "serviceDays"),
];

/// Remapped result of a REST request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestResponse {
    /// Response body with the shallow fields added
    pub res: Value,
}

/// Build the outgoing REST request (before the executor's layering)
///
/// # Errors
///
/// Returns a configuration error if the context has no token or the token is
/// not a valid header value.
pub fn build_request(ctx: &Context, query: BTreeMap<String, String>) -> Result<OutgoingRequest> {
    let token = ctx.token().ok_or_else(|| {
        HafasError::Configuration("REST requests require an access token".to_string())
    })?;
    let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| HafasError::Configuration("access token is not a valid header value".to_string()))?;
    authorization.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, authorization);

    let mut request = OutgoingRequest::new().with_query("lang", ctx.rest_language());
    request.query.extend(query);
    request.headers = headers;

    Ok(ctx.profile().transform_req(ctx, request))
}

/// Call a REST method
///
/// `method` is appended to the profile endpoint (e.g. `location.name`).
/// Non-2xx statuses do not fail by themselves; the body is inspected for
/// `errorCode`/`errorText` first.
///
/// # Errors
///
/// Returns any executor error other than a status error, or a vendor error
/// built from the response body when the status is not 2xx.
#[instrument(skip(executor, ctx, user_agent_seed, query))]
pub async fn request(
    executor: &RequestExecutor,
    ctx: &Context,
    user_agent_seed: &str,
    method: &str,
    query: BTreeMap<String, String>,
) -> Result<RestResponse> {
    let outgoing = build_request(ctx, query)?;
    let resource = format!("{}{}", ctx.profile().endpoint(), method);

    let response = executor
        .execute(
            ctx,
            user_agent_seed,
            &resource,
            outgoing,
            ExecuteOptions {
                throw_if_not_ok: false,
            },
        )
        .await?;

    normalize_response(ctx, response)
}

/// Map an error response or remap a successful one
///
/// # Errors
///
/// See [`request`].
pub fn normalize_response(ctx: &Context, response: FetchResponse) -> Result<RestResponse> {
    if !response.is_ok() {
        return Err(error_from_response(ctx, response));
    }
    Ok(RestResponse {
        res: tree::remap(response.body, &TREE_MAPPING),
    })
}

fn error_from_response(ctx: &Context, response: FetchResponse) -> HafasError {
    let FetchResponse { body, context, .. } = response;
    let field = |key: &str| body.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());
    let code = field("errorCode");
    let text = field("errorText");
    debug!(
        status = context.status_code,
        code = code.unwrap_or_default(),
        "HAFAS REST error"
    );

    if code.is_none() && text.is_none() {
        return HafasError::HttpStatus {
            message: context.status_text.clone(),
            context: Box::new(context),
        };
    }

    let info = code.and_then(|c| ctx.profile().rest_error(c));
    VendorError::from_vendor(info, code, text, None, context).into()
}
