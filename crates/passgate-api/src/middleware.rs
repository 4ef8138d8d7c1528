//! Axum adapters for the password and token middleware.
//!
//! This is the pipeline boundary: each adapter builds a [`PipelineRequest`] from the
//! HTTP request, runs one operation, and either forwards the request to `next` with
//! the outcome stored in request extensions, or short-circuits with the
//! `{ code, message }` error body.
//!
//! Extensions used:
//! - [`Protected`]: set by the route; `decode_access` only checks routes that carry it.
//! - [`RequestContext`]: decoded access/refresh claims.
//! - [`ResponseState`]: values a host's lookup stage leaves for `compare_password`,
//!   and the token rows written by `refresh_tokens`.
//! - [`TokenPair`](passgate_common::auth::TokenPair): the pair minted by `refresh_tokens`.

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use passgate_common::error::{PassgateError, PassgateResult};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    pipeline::{PipelineRequest, RequestContext, ResponseState},
    Passgate,
};

/// Largest JSON body the body-reading adapters will buffer.
pub const BODY_LIMIT: usize = 1024 * 1024;

/// Marker extension: the route requires a valid access token.
#[derive(Debug, Clone, Copy, Default)]
pub struct Protected;

/// Compare the submitted password with the hash left in [`ResponseState`].
pub async fn compare_password(
    State(gate): State<Arc<Passgate>>,
    request: Request,
    next: Next,
) -> Result<Response, PassgateError> {
    let (parts, bytes, body) = read_json(request).await?;
    let pipeline = pipeline_request(&parts, body);
    let response = parts
        .extensions
        .get::<ResponseState>()
        .cloned()
        .unwrap_or_default();

    gate.verifier.compare(&pipeline, &response)?;
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Generate `pwd` / `encryptedPwd` for every record in `body.rows`.
pub async fn create_passwords(
    State(gate): State<Arc<Passgate>>,
    request: Request,
    next: Next,
) -> Result<Response, PassgateError> {
    let (parts, _, body) = read_json(request).await?;
    let mut pipeline = pipeline_request(&parts, body);

    let count = gate.issuer.create(&mut pipeline)?;
    tracing::debug!(count, "Passwords created");
    Ok(next.run(write_json(parts, &pipeline.body)?).await)
}

/// Mint a new token pair for the decoded access claim or `body.id`.
pub async fn refresh_tokens(
    State(gate): State<Arc<Passgate>>,
    request: Request,
    next: Next,
) -> Result<Response, PassgateError> {
    let (mut parts, bytes, body) = read_json(request).await?;
    let pipeline = pipeline_request(&parts, body);
    let mut response = parts
        .extensions
        .get::<ResponseState>()
        .cloned()
        .unwrap_or_default();

    let pair = gate.tokens.issue(&pipeline, &mut response)?;
    parts.extensions.insert(response);
    parts.extensions.insert(pair);
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

/// Decode the bearer access token on routes marked [`Protected`].
pub async fn decode_access(
    State(gate): State<Arc<Passgate>>,
    mut request: Request,
    next: Next,
) -> Result<Response, PassgateError> {
    let mut pipeline = PipelineRequest {
        body: Value::Null,
        authorization: authorization(request.headers()),
        protected: request.extensions().get::<Protected>().is_some(),
        context: context(request.extensions()),
    };

    gate.tokens.verify_access(&mut pipeline)?;
    request.extensions_mut().insert(pipeline.context);
    Ok(next.run(request).await)
}

/// Decode `body.refreshToken`.
pub async fn decode_refresh(
    State(gate): State<Arc<Passgate>>,
    request: Request,
    next: Next,
) -> Result<Response, PassgateError> {
    let (mut parts, bytes, body) = read_json(request).await?;
    let mut pipeline = pipeline_request(&parts, body);

    gate.tokens.verify_refresh(&mut pipeline)?;
    parts.extensions.insert(pipeline.context);
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn pipeline_request(parts: &Parts, body: Value) -> PipelineRequest {
    PipelineRequest {
        body,
        authorization: authorization(&parts.headers),
        protected: parts.extensions.get::<Protected>().is_some(),
        context: context(&parts.extensions),
    }
}

fn authorization(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn context(extensions: &axum::http::Extensions) -> RequestContext {
    extensions.get::<RequestContext>().cloned().unwrap_or_default()
}

/// Buffer the body and parse it as JSON. An empty body reads as `null`.
pub(crate) async fn read_json(request: Request) -> PassgateResult<(Parts, Bytes, Value)> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|e| PassgateError::InvalidInput {
            detail: format!("unreadable body: {e}"),
        })?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).map_err(|e| PassgateError::InvalidInput {
            detail: format!("body is not valid JSON: {e}"),
        })?
    };
    Ok((parts, bytes, value))
}

/// Rebuild the request around a rewritten JSON body.
pub(crate) fn write_json(mut parts: Parts, body: &Value) -> PassgateResult<Request> {
    let bytes = serde_json::to_vec(body).map_err(|e| PassgateError::InvalidInput {
        detail: e.to_string(),
    })?;
    parts.headers.remove(header::CONTENT_LENGTH);
    Ok(Request::from_parts(parts, Body::from(bytes)))
}
