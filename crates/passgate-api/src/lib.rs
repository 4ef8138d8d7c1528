//! # passgate-api
//!
//! Password and token middleware for axum request pipelines: compare a submitted
//! password with a stored hash, generate passwords for new records, and issue or
//! decode access/refresh token pairs.

pub mod crypto;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod pipeline;
pub mod resolver;
pub mod routes;
pub mod token;

use axum::Router;
use passgate_common::{
    config::{AppConfig, AuthConfig, PasswordPolicy},
    error::PassgateResult,
};
use std::sync::Arc;

use crate::{
    crypto::{Argon2Cipher, PasswordCipher},
    jwt::{JwtSigner, TokenSigner},
    password::{CredentialIssuer, CredentialVerifier},
    token::TokenLifecycle,
};

/// Shared middleware state, handed to every adapter.
#[derive(Clone)]
pub struct Passgate {
    pub verifier: CredentialVerifier,
    pub issuer: CredentialIssuer,
    pub tokens: TokenLifecycle,
}

impl Passgate {
    /// Argon2id passwords and HS256 tokens, configured from `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_primitives(
            &config.auth,
            config.password.clone(),
            Arc::new(Argon2Cipher::default()),
            Arc::new(JwtSigner::default()),
        )
    }

    /// Build with caller-supplied primitives.
    pub fn with_primitives(
        auth: &AuthConfig,
        policy: PasswordPolicy,
        cipher: Arc<dyn PasswordCipher>,
        signer: Arc<dyn TokenSigner>,
    ) -> Self {
        Self {
            verifier: CredentialVerifier::new(cipher.clone(), auth.password_secret.clone()),
            issuer: CredentialIssuer::new(cipher, auth.password_secret.clone(), policy),
            tokens: TokenLifecycle::new(signer, auth),
        }
    }

    /// Replace the password policy. Hosts call this after construction and before
    /// wrapping the state in an `Arc` for [`build_router`].
    pub fn init(&mut self, policy: PasswordPolicy) -> PassgateResult<()> {
        self.issuer.init(policy)
    }
}

/// Build the demo router with all routes and middleware.
pub fn build_router(gate: Arc<Passgate>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::auth::router(gate.clone()))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(gate)
}
