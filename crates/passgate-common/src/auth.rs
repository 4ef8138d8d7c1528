//! Shared token claim types.
//!
//! Claims live here so the error taxonomy and the middleware crate agree on them.
//! Signing and verification stay in passgate-api.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::PassgateError;
use crate::validation::integer_in_range;

/// Smallest accepted subject id.
pub const MIN_SUBJECT_ID: i64 = 1;
/// Largest accepted subject id.
pub const MAX_SUBJECT_ID: i64 = 999_999_999;

/// Token type tag embedded in every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims exactly as decoded from a token whose signature checked out.
///
/// `iss` is left untyped: a token can carry a valid signature and still hold a
/// subject we refuse to trust.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawClaims {
    #[serde(default)]
    pub iss: Value,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    pub typ: TokenKind,
}

/// Claims after the subject id passed its range check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject id of the authenticated entity.
    pub iss: u32,
    pub iat: i64,
    pub exp: i64,
    pub typ: TokenKind,
}

impl TryFrom<RawClaims> for TokenClaims {
    type Error = PassgateError;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        let iss = subject_id(&raw.iss).ok_or(PassgateError::MissingIss)?;
        Ok(Self {
            iss,
            iat: raw.iat,
            exp: raw.exp,
            typ: raw.typ,
        })
    }
}

/// Token pair handed back by the refresh flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Read a subject id from an integer or a numeric string, within
/// `[MIN_SUBJECT_ID, MAX_SUBJECT_ID]`.
pub fn subject_id(value: &Value) -> Option<u32> {
    integer_in_range(value, MIN_SUBJECT_ID, MAX_SUBJECT_ID).and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subject_id_bounds() {
        assert_eq!(subject_id(&json!(1)), Some(1));
        assert_eq!(subject_id(&json!(999_999_999)), Some(999_999_999));
        assert_eq!(subject_id(&json!("42")), Some(42));
        assert_eq!(subject_id(&json!(0)), None);
        assert_eq!(subject_id(&json!(1_000_000_000)), None);
        assert_eq!(subject_id(&json!(-3)), None);
        assert_eq!(subject_id(&json!(4.5)), None);
        assert_eq!(subject_id(&json!(true)), None);
        assert_eq!(subject_id(&Value::Null), None);
    }

    #[test]
    fn raw_claims_with_bad_subject_are_rejected() {
        let raw: RawClaims =
            serde_json::from_value(json!({ "iss": "abc", "iat": 1, "exp": 2, "typ": "access" }))
                .unwrap();
        assert_eq!(
            TokenClaims::try_from(raw).unwrap_err(),
            PassgateError::MissingIss
        );
    }

    #[test]
    fn token_pair_uses_camel_case() {
        let pair = TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
        };
        assert_eq!(
            serde_json::to_value(&pair).unwrap(),
            json!({ "accessToken": "a", "refreshToken": "r" })
        );
    }
}
