//! Legacy envelope protocol (`mgate.exe`)
//!
//! One logical request travels as the single element of `svcReqL`; its
//! answer comes back as the single element of `svcResL`. Both the envelope
//! and the inner response carry their own `err` status.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::checksum::authenticate;
use crate::context::Context;
use crate::error::{HafasError, Result, VendorError};
use crate::executor::{ExecuteOptions, FetchResponse, RequestExecutor};
use crate::request::OutgoingRequest;

/// Status value signalling success
pub const SUCCESS: &str = "OK";

/// Unwrapped result of a legacy request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeResponse {
    /// `svcResL[0].res`
    pub res: Value,
    /// Common data extracted by the profile
    pub common: Value,
}

/// Build the request body for one logical request
///
/// The profile's `transform_req_body` runs first; `client`, `ext`, `ver` and
/// `auth` are overlaid afterwards and win over anything it produced.
#[must_use]
pub fn build_body(ctx: &Context, logical_request: Value) -> Value {
    let profile = ctx.profile();
    let body = json!({
        "lang": ctx.envelope_language(),
        "svcReqL": [logical_request],
    });
    let mut body = profile.transform_req_body(ctx, body);

    let overlays = [
        ("client", profile.client()),
        ("ext", profile.ext()),
        ("ver", profile.ver()),
        ("auth", profile.auth()),
    ];
    match &mut body {
        Value::Object(map) => {
            for (key, value) in overlays {
                if let Some(value) = value {
                    map.insert(key.to_string(), value);
                }
            }
        }
        _ => warn!("transform_req_body returned a non-object body; static fields not applied"),
    }
    body
}

/// Send one logical request through the envelope protocol
///
/// # Errors
///
/// Returns any executor error, a configuration error if authentication is
/// misconfigured, [`HafasError::Vendor`] if the backend reports an error, or
/// [`HafasError::InvalidResponse`] if `svcResL` is missing or empty.
#[instrument(skip_all)]
pub async fn request(
    executor: &RequestExecutor,
    ctx: &Context,
    user_agent_seed: &str,
    logical_request: Value,
) -> Result<EnvelopeResponse> {
    let body = build_body(ctx, logical_request).to_string();

    let mut outgoing = OutgoingRequest::new();
    authenticate(ctx.profile(), body.as_bytes())?.apply_to(&mut outgoing.query);
    let outgoing = outgoing.with_body(body);

    let response = executor
        .execute(
            ctx,
            user_agent_seed,
            ctx.profile().endpoint(),
            outgoing,
            ExecuteOptions::default(),
        )
        .await?;

    unwrap_response(ctx, response)
}

fn status_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Check both status levels of a decoded envelope and extract the result
///
/// # Errors
///
/// See [`request`].
pub fn unwrap_response(ctx: &Context, response: FetchResponse) -> Result<EnvelopeResponse> {
    let FetchResponse { body, context, .. } = response;
    let profile = ctx.profile();
    let response_id = status_field(&body, "id");

    let vendor_error = |code: Option<&str>, text: Option<&str>, context| {
        let info = code.and_then(|c| profile.legacy_error(c));
        HafasError::from(VendorError::from_vendor(
            info,
            code,
            text,
            response_id,
            context,
        ))
    };

    if let Some(err) = status_field(&body, "err").filter(|e| *e != SUCCESS) {
        debug!(code = err, "HAFAS envelope error");
        return Err(vendor_error(Some(err), status_field(&body, "errTxt"), context));
    }

    let Some(svc_res) = body
        .get("svcResL")
        .and_then(Value::as_array)
        .and_then(|list| list.first())
        .filter(|first| first.is_object())
    else {
        return Err(HafasError::InvalidResponse {
            context: Box::new(context),
        });
    };

    if status_field(svc_res, "err") != Some(SUCCESS) {
        let code = status_field(svc_res, "err");
        debug!(code = code.unwrap_or_default(), "HAFAS service error");
        return Err(vendor_error(code, status_field(svc_res, "errTxt"), context));
    }

    let res = svc_res.get("res").cloned().unwrap_or(Value::Null);
    let common = profile.parse_common(ctx, &res);
    Ok(EnvelopeResponse { res, common })
}
