//! Configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > passgate.toml > defaults
//!
//! Secrets and token durations are read once and never change afterwards. The
//! password policy is the one setting a host may replace, during setup, through
//! `CredentialIssuer::init`.

use config::{builder::DefaultState, ConfigBuilder};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::validation::{decode_secret, validate_fields};

/// Access token lifetime used when none (or an unusable one) is configured.
pub const DEFAULT_ACCESS_TOKEN_DURATION: u64 = 600; // 10 min
/// Refresh token lifetime used when none (or an unusable one) is configured.
pub const DEFAULT_REFRESH_TOKEN_DURATION: u64 = 86_400; // 1 day

/// Fatal startup error. The process must not serve traffic after one of these.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing {0} configuration value")]
    MissingSecret(&'static str),

    #[error("Invalid {name} configuration value: {reason}")]
    InvalidSecret { name: &'static str, reason: String },

    #[error("Invalid password policy: {0}")]
    InvalidPolicy(String),
}

/// Initialize the configuration from `.env`, `passgate.toml` and the environment.
///
/// Should be called once at application startup, before the router is built.
pub fn init() -> Result<AppConfig, ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let cfg = defaults()?
        // Optional config file
        .add_source(config::File::with_name("passgate").required(false))
        // Environment variables (PASSGATE__AUTH__TOKEN_SECRETS, PASSGATE__PASSWORD__LEN, etc.)
        .add_source(
            config::Environment::with_prefix("PASSGATE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    AppConfig::from_config(cfg)
}

/// Builder pre-loaded with every default. Secrets have none.
pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let policy = PasswordPolicy::default();
    Ok(config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("password.len", policy.len as i64)?
        .set_default("password.num", policy.num)?
        .set_default("password.ucase", policy.ucase)?
        .set_default("password.lcase", policy.lcase)?
        .set_default("password.sym", policy.sym)?
        .set_default("password.strict", policy.strict)?
        .set_default("password.similar_chars", policy.similar_chars)?)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub password: PasswordPolicy,
}

impl AppConfig {
    /// Deserialize and check a built [`config::Config`].
    pub fn from_config(cfg: config::Config) -> Result<Self, ConfigError> {
        let raw: RawAppConfig = cfg.try_deserialize()?;
        validate_fields(&raw.password).map_err(ConfigError::InvalidPolicy)?;
        Ok(Self {
            server: raw.server,
            auth: AuthConfig::try_from(raw.auth)?,
            password: raw.password,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Secrets and token lifetimes, resolved and checked.
#[derive(Clone)]
pub struct AuthConfig {
    /// Base64 secret mixed into every password hash.
    pub password_secret: String,
    /// Token signing secrets. The first signs; all are tried when verifying.
    pub token_secrets: Vec<String>,
    /// Access token lifetime in seconds
    pub access_token_duration: u64,
    /// Refresh token lifetime in seconds
    pub refresh_token_duration: u64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("password_secret", &"<redacted>")
            .field("token_secrets", &format_args!("<{} redacted>", self.token_secrets.len()))
            .field("access_token_duration", &self.access_token_duration)
            .field("refresh_token_duration", &self.refresh_token_duration)
            .finish()
    }
}

impl TryFrom<RawAuthConfig> for AuthConfig {
    type Error = ConfigError;

    fn try_from(raw: RawAuthConfig) -> Result<Self, Self::Error> {
        let password_secret = raw
            .password_secret
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSecret("auth.password_secret"))?;
        decode_secret(&password_secret).map_err(|reason| ConfigError::InvalidSecret {
            name: "auth.password_secret",
            reason,
        })?;

        let token_secrets = raw
            .token_secrets
            .as_deref()
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .filter(|secrets| !secrets.is_empty())
            .ok_or(ConfigError::MissingSecret("auth.token_secrets"))?;

        Ok(Self {
            password_secret,
            token_secrets,
            access_token_duration: duration_or_default(
                "auth.access_token_duration",
                raw.access_token_duration.as_deref(),
                DEFAULT_ACCESS_TOKEN_DURATION,
            ),
            refresh_token_duration: duration_or_default(
                "auth.refresh_token_duration",
                raw.refresh_token_duration.as_deref(),
                DEFAULT_REFRESH_TOKEN_DURATION,
            ),
        })
    }
}

/// A duration that is absent, non-numeric or zero falls back to its default.
fn duration_or_default(name: &str, value: Option<&str>, default: u64) -> u64 {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => default,
        Some(v) => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => secs,
            _ => {
                tracing::warn!("Ignoring {name}={v:?}, using {default} seconds");
                default
            }
        },
    }
}

/// Options controlling the shape of generated passwords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_character_classes"))]
pub struct PasswordPolicy {
    /// Password length in characters
    #[validate(range(min = 1, max = 255, message = "Password length must be between 1 and 255"))]
    pub len: usize,
    /// Include digits
    pub num: bool,
    /// Include uppercase letters
    pub ucase: bool,
    /// Include lowercase letters
    pub lcase: bool,
    /// Include symbols
    pub sym: bool,
    /// Require at least one character from each enabled class
    pub strict: bool,
    /// Allow visually similar characters (l, I, 1, o, O, 0)
    pub similar_chars: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            len: 12,
            num: true,
            ucase: true,
            lcase: true,
            sym: false,
            strict: true,
            similar_chars: false,
        }
    }
}

fn validate_character_classes(policy: &PasswordPolicy) -> Result<(), ValidationError> {
    let classes = [policy.num, policy.ucase, policy.lcase, policy.sym];
    let enabled = classes.iter().filter(|on| **on).count();
    if enabled == 0 {
        return Err(ValidationError::new("no_character_class")
            .with_message("At least one character class must be enabled".into()));
    }
    if policy.strict && enabled > policy.len {
        return Err(ValidationError::new("too_short_for_strict")
            .with_message("Password length is shorter than the number of required classes".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct RawAppConfig {
    server: ServerConfig,
    #[serde(default)]
    auth: RawAuthConfig,
    password: PasswordPolicy,
}

#[derive(Debug, Default, Deserialize)]
struct RawAuthConfig {
    password_secret: Option<String>,
    token_secrets: Option<String>,
    access_token_duration: Option<String>,
    refresh_token_duration: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PWD_SECRET: &str = "YS1zdHJpbmctc2VjcmV0LWF0LWxlYXN0LTI1Ni1iaXRzLWxvbmc";

    fn load(overrides: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let mut builder = defaults()?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        AppConfig::from_config(builder.build()?)
    }

    #[test]
    fn durations_default_when_unset() {
        let cfg = load(&[
            ("auth.password_secret", PWD_SECRET),
            ("auth.token_secrets", "token-secret"),
        ])
        .unwrap();
        assert_eq!(cfg.auth.access_token_duration, 600);
        assert_eq!(cfg.auth.refresh_token_duration, 86_400);
        assert_eq!(cfg.auth.token_secrets, vec!["token-secret".to_string()]);
        assert_eq!(cfg.password, PasswordPolicy::default());
    }

    #[test]
    fn unusable_durations_fall_back() {
        let cfg = load(&[
            ("auth.password_secret", PWD_SECRET),
            ("auth.token_secrets", "a, b ,"),
            ("auth.access_token_duration", "ten"),
            ("auth.refresh_token_duration", "3600"),
        ])
        .unwrap();
        assert_eq!(cfg.auth.access_token_duration, 600);
        assert_eq!(cfg.auth.refresh_token_duration, 3600);
        assert_eq!(cfg.auth.token_secrets, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn missing_secrets_are_fatal() {
        let err = load(&[("auth.token_secrets", "t")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("auth.password_secret")));

        let err = load(&[("auth.password_secret", PWD_SECRET)]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret("auth.token_secrets")));

        let err = load(&[
            ("auth.password_secret", "%%%"),
            ("auth.token_secrets", "t"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSecret { .. }));
    }

    #[test]
    fn policy_needs_a_character_class() {
        let err = load(&[
            ("auth.password_secret", PWD_SECRET),
            ("auth.token_secrets", "t"),
            ("password.num", "false"),
            ("password.ucase", "false"),
            ("password.lcase", "false"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPolicy(_)));
    }

    #[test]
    fn auth_debug_hides_secrets() {
        let cfg = load(&[
            ("auth.password_secret", PWD_SECRET),
            ("auth.token_secrets", "super-secret"),
        ])
        .unwrap();
        let printed = format!("{:?}", cfg.auth);
        assert!(!printed.contains(PWD_SECRET));
        assert!(!printed.contains("super-secret"));
    }
}
