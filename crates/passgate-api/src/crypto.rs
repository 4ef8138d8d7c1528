//! Password primitives: Argon2id hashing with a server-side secret, and random
//! password generation.
//!
//! The middleware only talks to [`PasswordCipher`]; [`Argon2Cipher`] is the
//! production implementation.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use passgate_common::{
    config::PasswordPolicy,
    error::PassgateError,
    validation::{decode_secret, validate_fields},
};
use rand::seq::{IndexedRandom, SliceRandom};

const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NUMBERS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()+_-=}{[]|:;\"/?.><,`~";
const SIMILAR_CHARS: &[char] = &['l', 'I', '1', 'o', 'O', '0'];

/// Error raised by a password primitive.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("{0}")]
    Input(String),

    #[error("{0}")]
    Secret(String),

    #[error("{0}")]
    Hash(String),

    #[error("{0}")]
    Argon2(String),

    #[error("{0}")]
    Policy(String),
}

impl From<password_hash::Error> for CipherError {
    fn from(err: password_hash::Error) -> Self {
        Self::Hash(err.to_string())
    }
}

impl From<argon2::Error> for CipherError {
    fn from(err: argon2::Error) -> Self {
        Self::Argon2(err.to_string())
    }
}

impl From<CipherError> for PassgateError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::Policy(detail) => PassgateError::InvalidPolicy { detail },
            other => PassgateError::InvalidInput {
                detail: other.to_string(),
            },
        }
    }
}

/// Password hashing, verification and generation.
pub trait PasswordCipher: Send + Sync {
    /// `Ok(false)` on mismatch; `Err` when the hash or secret is unusable.
    fn compare(&self, candidate: &str, hash: &str, secret: &str) -> Result<bool, CipherError>;

    /// Hash `plaintext` into a self-describing string.
    fn encrypt(&self, plaintext: &str, secret: &str) -> Result<String, CipherError>;

    /// Generate a random password shaped by `policy`.
    fn generate(&self, policy: &PasswordPolicy) -> Result<String, CipherError>;
}

/// Argon2id keyed with the decoded base64 secret, PHC string output.
#[derive(Debug, Clone)]
pub struct Argon2Cipher {
    params: Params,
}

impl Default for Argon2Cipher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl Argon2Cipher {
    /// Use custom cost parameters for new hashes. Verification always uses the
    /// parameters recorded in the stored hash.
    pub fn with_params(params: Params) -> Self {
        Self { params }
    }

    fn hasher<'k>(&self, key: &'k [u8]) -> Result<Argon2<'k>, CipherError> {
        Ok(Argon2::new_with_secret(
            key,
            Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )?)
    }
}

impl PasswordCipher for Argon2Cipher {
    fn compare(&self, candidate: &str, hash: &str, secret: &str) -> Result<bool, CipherError> {
        let key = decode_secret(secret).map_err(CipherError::Secret)?;
        let parsed_hash = PasswordHash::new(hash)?;
        match self
            .hasher(&key)?
            .verify_password(candidate.as_bytes(), &parsed_hash)
        {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn encrypt(&self, plaintext: &str, secret: &str) -> Result<String, CipherError> {
        if plaintext.is_empty() {
            return Err(CipherError::Input("password is empty".into()));
        }
        let key = decode_secret(secret).map_err(CipherError::Secret)?;
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.hasher(&key)?.hash_password(plaintext.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    fn generate(&self, policy: &PasswordPolicy) -> Result<String, CipherError> {
        random_password(policy)
    }
}

/// Generate a password from the character classes enabled in `policy`.
///
/// With `strict`, every enabled class contributes at least one character.
pub fn random_password(policy: &PasswordPolicy) -> Result<String, CipherError> {
    validate_fields(policy).map_err(CipherError::Policy)?;

    let enabled = [
        (policy.lcase, LOWERCASE),
        (policy.ucase, UPPERCASE),
        (policy.num, NUMBERS),
        (policy.sym, SYMBOLS),
    ];
    let pools: Vec<Vec<char>> = enabled
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, chars)| {
            chars
                .chars()
                .filter(|c| policy.similar_chars || !SIMILAR_CHARS.contains(c))
                .collect()
        })
        .collect();
    let all: Vec<char> = pools.iter().flatten().copied().collect();
    if all.is_empty() {
        return Err(CipherError::Policy("no characters available".into()));
    }

    let mut rng = rand::rng();
    let mut password: Vec<char> = Vec::with_capacity(policy.len);
    if policy.strict {
        for pool in &pools {
            password.extend(pool.choose(&mut rng));
        }
    }
    while password.len() < policy.len {
        password.extend(all.choose(&mut rng));
    }
    password.shuffle(&mut rng);
    Ok(password.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "YS1zdHJpbmctc2VjcmV0LWF0LWxlYXN0LTI1Ni1iaXRzLWxvbmc";

    fn cipher() -> Argon2Cipher {
        Argon2Cipher::with_params(Params::new(8, 1, 1, None).unwrap())
    }

    #[test]
    fn correct_password_matches() {
        let hash = cipher().encrypt("hunter2", SECRET).unwrap();
        assert!(cipher().compare("hunter2", &hash, SECRET).unwrap());
    }

    #[test]
    fn wrong_password_does_not_match() {
        let hash = cipher().encrypt("hunter2", SECRET).unwrap();
        assert!(!cipher().compare("Hunter2", &hash, SECRET).unwrap());
    }

    #[test]
    fn secret_is_applied() {
        let hash = cipher().encrypt("hunter2", SECRET).unwrap();
        // "b3RoZXItc2VjcmV0" is base64 for "other-secret"
        assert!(!cipher().compare("hunter2", &hash, "b3RoZXItc2VjcmV0").unwrap());
    }

    #[test]
    fn malformed_hash_returns_error() {
        let err = cipher().compare("pw", "not-a-hash", SECRET).unwrap_err();
        assert!(matches!(err, CipherError::Hash(_)));
        let mapped: PassgateError = err.into();
        assert_eq!(mapped.status_code().as_u16(), 400);
    }

    #[test]
    fn malformed_secret_returns_error() {
        assert!(matches!(
            cipher().encrypt("pw", "***").unwrap_err(),
            CipherError::Secret(_)
        ));
    }

    #[test]
    fn strict_policy_uses_every_class() {
        let policy = PasswordPolicy {
            len: 4,
            sym: true,
            ..PasswordPolicy::default()
        };
        for _ in 0..50 {
            let pwd = random_password(&policy).unwrap();
            assert_eq!(pwd.chars().count(), 4);
            assert!(pwd.chars().any(|c| c.is_ascii_lowercase()));
            assert!(pwd.chars().any(|c| c.is_ascii_uppercase()));
            assert!(pwd.chars().any(|c| c.is_ascii_digit()));
            assert!(pwd.chars().any(|c| SYMBOLS.contains(c)));
        }
    }

    #[test]
    fn similar_characters_are_excluded_by_default() {
        let policy = PasswordPolicy {
            len: 200,
            ..PasswordPolicy::default()
        };
        let pwd = random_password(&policy).unwrap();
        assert!(!pwd.chars().any(|c| SIMILAR_CHARS.contains(&c)));
    }

    #[test]
    fn policy_without_classes_is_rejected() {
        let policy = PasswordPolicy {
            num: false,
            ucase: false,
            lcase: false,
            sym: false,
            ..PasswordPolicy::default()
        };
        assert!(matches!(
            random_password(&policy).unwrap_err(),
            CipherError::Policy(_)
        ));
    }
}
