//! Password middleware: compare a submitted password with a stored hash, and
//! generate passwords for new records.

use passgate_common::{
    config::PasswordPolicy,
    error::{PassgateError, PassgateResult},
    validation::{non_empty_array, validate_fields},
};
use serde_json::Value;
use std::{fmt, sync::Arc};

use crate::{
    crypto::PasswordCipher,
    pipeline::{PipelineRequest, ResponseState},
    resolver::{hash_resolver, password_resolver},
};

/// A candidate password paired with the hash it must match. Lives for one request.
pub struct Credential<'a> {
    pub candidate_password: &'a str,
    pub stored_hash: &'a str,
}

impl fmt::Debug for Credential<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("candidate_password", &"<redacted>")
            .field("stored_hash", &"<redacted>")
            .finish()
    }
}

/// Checks a submitted password against the hash an earlier stage loaded.
#[derive(Clone)]
pub struct CredentialVerifier {
    cipher: Arc<dyn PasswordCipher>,
    secret: String,
}

impl CredentialVerifier {
    pub fn new(cipher: Arc<dyn PasswordCipher>, secret: impl Into<String>) -> Self {
        Self {
            cipher,
            secret: secret.into(),
        }
    }

    /// Locate the candidate password in the request and the hash in the response.
    pub fn resolve<'a>(
        &self,
        request: &'a PipelineRequest,
        response: &'a ResponseState,
    ) -> PassgateResult<Credential<'a>> {
        let passwords = password_resolver(&request.body);
        let candidate_password =
            passwords
                .resolve()
                .ok_or_else(|| PassgateError::MissingPassword {
                    locations: passwords.locations(),
                })?;

        let hashes = hash_resolver(response);
        let stored_hash = hashes
            .resolve()
            .ok_or_else(|| PassgateError::MissingHash {
                locations: hashes.locations(),
            })?;

        Ok(Credential {
            candidate_password,
            stored_hash,
        })
    }

    /// Succeeds only when the candidate password matches the stored hash.
    /// Neither value is modified.
    pub fn compare(&self, request: &PipelineRequest, response: &ResponseState) -> PassgateResult<()> {
        let credential = self.resolve(request, response)?;
        tracing::debug!(
            pwd = !credential.candidate_password.is_empty(),
            hash = !credential.stored_hash.is_empty(),
            "Compare password"
        );

        let matches = self.cipher.compare(
            credential.candidate_password,
            credential.stored_hash,
            &self.secret,
        )?;
        if !matches {
            return Err(PassgateError::WrongPassword);
        }

        tracing::debug!("Correct password");
        Ok(())
    }
}

/// Generates and hashes a password for every record of a batch.
#[derive(Clone)]
pub struct CredentialIssuer {
    cipher: Arc<dyn PasswordCipher>,
    secret: String,
    policy: PasswordPolicy,
}

impl CredentialIssuer {
    pub fn new(
        cipher: Arc<dyn PasswordCipher>,
        secret: impl Into<String>,
        policy: PasswordPolicy,
    ) -> Self {
        Self {
            cipher,
            secret: secret.into(),
            policy,
        }
    }

    /// Replace the active policy. Setup-phase only: takes `&mut self`, so it cannot
    /// race with requests once the issuer is shared.
    pub fn init(&mut self, policy: PasswordPolicy) -> PassgateResult<()> {
        validate_fields(&policy).map_err(|detail| PassgateError::InvalidPolicy { detail })?;
        self.policy = policy;
        Ok(())
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Set `pwd` and `encryptedPwd` on every record of `body.rows`.
    ///
    /// Records are processed in order and an error stops the batch; records already
    /// processed keep their new values. Returns the number of records updated.
    pub fn create(&self, request: &mut PipelineRequest) -> PassgateResult<usize> {
        tracing::debug!("Create passwords");

        if non_empty_array(request.body.get("rows")).is_none() {
            return Err(PassgateError::MissingResources);
        }
        let rows = request
            .body
            .get_mut("rows")
            .and_then(Value::as_array_mut)
            .ok_or(PassgateError::MissingResources)?;

        for (index, row) in rows.iter_mut().enumerate() {
            let record = row
                .as_object_mut()
                .ok_or(PassgateError::InvalidResource { index })?;

            let pwd = self.cipher.generate(&self.policy)?;
            let encrypted = self.cipher.encrypt(&pwd, &self.secret)?;
            record.insert("pwd".into(), Value::String(pwd));
            record.insert("encryptedPwd".into(), Value::String(encrypted));
        }

        Ok(rows.len())
    }
}
