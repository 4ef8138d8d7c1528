//! Token lifecycle: issue access/refresh pairs and decode the tokens presented
//! on later requests.
//!
//! Every decode goes through the same steps: pick the token, check its shape,
//! verify it, then range-check the subject id. A failure at any step ends the
//! request; nothing is retried.

use passgate_common::{
    auth::{subject_id, TokenClaims, TokenKind, TokenPair},
    config::AuthConfig,
    error::{PassgateError, PassgateResult},
    validation::is_jwt,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    jwt::{parse_bearer, TokenSigner},
    pipeline::{PipelineRequest, ResponseState},
};

/// Issues and decodes access and refresh tokens.
#[derive(Clone)]
pub struct TokenLifecycle {
    signer: Arc<dyn TokenSigner>,
    secrets: Vec<String>,
    access_duration: u64,
    refresh_duration: u64,
}

impl TokenLifecycle {
    pub fn new(signer: Arc<dyn TokenSigner>, auth: &AuthConfig) -> Self {
        Self {
            signer,
            secrets: auth.token_secrets.clone(),
            access_duration: auth.access_token_duration,
            refresh_duration: auth.refresh_token_duration,
        }
    }

    /// Mint a new token pair for the current subject.
    ///
    /// The subject comes from an access token decoded earlier in the pipeline, or
    /// else from `body.id`. The pair is also written to `response.rows`.
    pub fn issue(
        &self,
        request: &PipelineRequest,
        response: &mut ResponseState,
    ) -> PassgateResult<TokenPair> {
        let candidate = match &request.context.access {
            Some(claims) => Value::from(claims.iss),
            None => request.body.get("id").cloned().unwrap_or(Value::Null),
        };
        let iss = subject_id(&candidate).ok_or(PassgateError::MissingIss)?;

        tracing::debug!(iss, "Create tokens");
        let pair = TokenPair {
            access_token: self.sign(iss, TokenKind::Access)?,
            refresh_token: self.sign(iss, TokenKind::Refresh)?,
        };
        response.rows = json!([pair]);
        Ok(pair)
    }

    /// Decode the bearer access token of a protected route into `context.access`.
    /// Unprotected routes pass through untouched.
    pub fn verify_access(&self, request: &mut PipelineRequest) -> PassgateResult<()> {
        if !request.protected {
            return Ok(());
        }
        tracing::debug!("Decode access token");

        let token = parse_bearer(request.authorization.as_deref())?;
        let claims = self.decode(token, TokenKind::Access)?;
        request.context.access = Some(claims);
        Ok(())
    }

    /// Decode `body.refreshToken` into `context.refresh`. Always enforced.
    pub fn verify_refresh(&self, request: &mut PipelineRequest) -> PassgateResult<()> {
        tracing::debug!("Decode refresh token");

        let token = request
            .body
            .get("refreshToken")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let claims = self.decode(token, TokenKind::Refresh)?;
        request.context.refresh = Some(claims);
        Ok(())
    }

    fn sign(&self, iss: u32, kind: TokenKind) -> PassgateResult<String> {
        let duration = match kind {
            TokenKind::Access => self.access_duration,
            TokenKind::Refresh => self.refresh_duration,
        };
        self.signer
            .sign(iss, duration, kind, &self.secrets)
            .map_err(|e| PassgateError::Signing {
                kind,
                detail: e.to_string(),
            })
    }

    fn decode(&self, token: &str, kind: TokenKind) -> PassgateResult<TokenClaims> {
        if !is_jwt(token) {
            return Err(PassgateError::InvalidToken { kind });
        }
        let raw = self
            .signer
            .verify(token, &self.secrets, kind)
            .map_err(|e| PassgateError::TokenRejected {
                kind,
                detail: e.to_string(),
            })?;
        let claims = TokenClaims::try_from(raw)?;
        tracing::debug!(iss = claims.iss, typ = %claims.typ, "Decoded token");
        Ok(claims)
    }
}
