//! Demo routes wiring the middleware into request pipelines.
//!
//! There is no storage layer here, so `compare_password` is not mounted; hosts put it
//! after their own lookup stage, which leaves a `ResponseState` extension behind.

use axum::{
    extract::{Extension, Request},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use passgate_common::{
    auth::{TokenClaims, TokenPair},
    error::{PassgateError, PassgateResult},
};
use serde_json::Value;
use std::{convert::Infallible, sync::Arc};

use crate::{
    middleware::{self, read_json, write_json, Protected},
    pipeline::RequestContext,
    Passgate,
};

/// Auth router. Layers run bottom-up: the last one added sees the request first.
pub fn router(gate: Arc<Passgate>) -> Router<Arc<Passgate>> {
    Router::new()
        .route(
            "/passwords",
            post(created_records)
                .layer(from_fn_with_state(gate.clone(), middleware::create_passwords)),
        )
        .route(
            "/auth/refresh",
            post(issued_tokens)
                .layer(from_fn_with_state(gate.clone(), middleware::refresh_tokens))
                .layer(from_fn(subject_from_refresh))
                .layer(from_fn_with_state(gate.clone(), middleware::decode_refresh)),
        )
        .route(
            "/auth/renew",
            post(issued_tokens)
                .layer(from_fn_with_state(gate.clone(), middleware::refresh_tokens))
                .layer::<_, Infallible>(from_fn_with_state(gate.clone(), middleware::decode_access))
                .layer(Extension(Protected)),
        )
        .route(
            "/me",
            get(current_subject)
                .layer::<_, Infallible>(from_fn_with_state(gate, middleware::decode_access))
                .layer(Extension(Protected)),
        )
}

/// POST /passwords
///
/// Echoes `body.rows` with `pwd` and `encryptedPwd` filled in.
async fn created_records(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(body))
}

/// POST /auth/refresh, POST /auth/renew
async fn issued_tokens(Extension(pair): Extension<TokenPair>) -> Json<TokenPair> {
    Json(pair)
}

/// GET /me
async fn current_subject(
    Extension(context): Extension<RequestContext>,
) -> PassgateResult<Json<TokenClaims>> {
    context
        .access
        .map(Json)
        .ok_or(PassgateError::MissingAuthorization)
}

/// Host stage between `decode_refresh` and `refresh_tokens`: the refresh token's
/// subject becomes `body.id`.
async fn subject_from_refresh(request: Request, next: Next) -> PassgateResult<Response> {
    let (parts, _, mut body) = read_json(request).await?;
    let subject = parts
        .extensions
        .get::<RequestContext>()
        .and_then(|context| context.refresh.as_ref())
        .map(|claims| claims.iss);

    if let (Some(iss), Some(fields)) = (subject, body.as_object_mut()) {
        fields.insert("id".to_string(), Value::from(iss));
    }
    Ok(next.run(write_json(parts, &body)?).await)
}
