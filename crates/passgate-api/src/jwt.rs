//! JWT primitives: signing, verification and bearer header parsing.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use passgate_common::{
    auth::{RawClaims, TokenKind},
    error::PassgateError,
};

/// Error raised by a token primitive.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("no signing secret configured")]
    NoSecret,

    #[error("unexpected token type")]
    WrongKind,

    #[error("token lifetime out of range")]
    Lifetime,

    #[error("{0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Token signing and verification.
pub trait TokenSigner: Send + Sync {
    /// Sign a token for `subject`, valid for `duration_secs`, with the first secret.
    fn sign(
        &self,
        subject: u32,
        duration_secs: u64,
        kind: TokenKind,
        secrets: &[String],
    ) -> Result<String, SignerError>;

    /// Check signature, expiry and type tag against any of `secrets`.
    fn verify(&self, token: &str, secrets: &[String], kind: TokenKind)
    -> Result<RawClaims, SignerError>;
}

/// HMAC-signed JWTs via `jsonwebtoken`.
#[derive(Debug, Clone)]
pub struct JwtSigner {
    algorithm: Algorithm,
}

impl Default for JwtSigner {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::HS256,
        }
    }
}

impl JwtSigner {
    pub fn new(algorithm: Algorithm) -> Self {
        Self { algorithm }
    }
}

impl TokenSigner for JwtSigner {
    fn sign(
        &self,
        subject: u32,
        duration_secs: u64,
        kind: TokenKind,
        secrets: &[String],
    ) -> Result<String, SignerError> {
        let secret = secrets.first().ok_or(SignerError::NoSecret)?;
        let now = Utc::now();
        let exp = i64::try_from(duration_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(SignerError::Lifetime)?;
        let claims = RawClaims {
            iss: subject.into(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            typ: kind,
        };

        Ok(encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?)
    }

    fn verify(
        &self,
        token: &str,
        secrets: &[String],
        kind: TokenKind,
    ) -> Result<RawClaims, SignerError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_required_spec_claims(&["exp"]);

        let mut last_err = SignerError::NoSecret;
        for secret in secrets {
            match decode::<RawClaims>(
                token,
                &DecodingKey::from_secret(secret.as_bytes()),
                &validation,
            ) {
                Ok(data) if data.claims.typ == kind => return Ok(data.claims),
                Ok(_) => return Err(SignerError::WrongKind),
                // Signed with another secret of the set: keep trying.
                Err(e) if matches!(e.kind(), ErrorKind::InvalidSignature) => last_err = e.into(),
                Err(e) => return Err(e.into()),
            }
        }
        Err(last_err)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, PassgateError> {
    let header = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(PassgateError::MissingAuthorization)?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(PassgateError::InvalidBearer)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() || token.contains(' ') {
        return Err(PassgateError::InvalidBearer);
    }
    Ok(token)
}
