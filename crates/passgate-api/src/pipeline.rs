//! Request and response values as the middleware sees them.
//!
//! These are transport-neutral: the axum adapters in [`crate::middleware`] build them
//! from an HTTP request and write the outcome back into request extensions.

use passgate_common::auth::TokenClaims;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An inbound request reduced to what the middleware reads.
#[derive(Debug, Clone, Default)]
pub struct PipelineRequest {
    /// Parsed JSON body (`Null` when the request had none).
    pub body: Value,
    /// Raw `Authorization` header value.
    pub authorization: Option<String>,
    /// Route-level flag: the route requires a valid access token.
    pub protected: bool,
    pub context: RequestContext,
}

impl PipelineRequest {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }
}

/// Claims decoded earlier in the same pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub access: Option<TokenClaims>,
    pub refresh: Option<TokenClaims>,
}

/// Response-side values left by earlier stages, typically a database lookup.
///
/// Mirrors the three shapes callers use: a `rows` collection, direct fields on
/// the response, and a nested `locals.rows` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseState {
    #[serde(default)]
    pub rows: Value,
    #[serde(default)]
    pub locals: Map<String, Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
