use std::{fmt, sync::LazyLock};

use argon2::{
    Argon2, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString, rand_core::OsRng},
};
use thiserror::Error;

use crate::sanitizer::SafeText;

static CONTEXT: LazyLock<Argon2<'static>> = LazyLock::new(|| {
    Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2::Params::DEFAULT,
    )
});

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to generate password hash")]
    Hash(#[source] password_hash::Error),
    #[error("stored password hash is malformed")]
    MalformedHash(#[source] password_hash::Error),
    #[error("failed to verify password")]
    Verify(#[source] password_hash::Error),
}

/// PasswordHash
///
/// An Argon2id hash in PHC string format (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`).
/// The salt is generated per credential and travels inside the string together with the
/// cost parameters, so verification needs nothing but this value.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wraps a hash read back from storage.
    pub fn from_stored(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Hashes a sanitized password with a fresh random salt.
pub fn hash_password(password: &SafeText) -> Result<PasswordHash, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = CONTEXT
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(CredentialError::Hash)?;
    Ok(PasswordHash(hash.to_string()))
}

/// Re-hashes `password` with the salt and parameters stored in `hash` and compares.
///
/// `Ok(false)` is a mismatch; `Err` means the stored hash itself could not be used.
pub fn verify_password(password: &SafeText, hash: &PasswordHash) -> Result<bool, CredentialError> {
    let parsed = password_hash::PasswordHash::new(hash.as_str())
        .map_err(CredentialError::MalformedHash)?;

    match CONTEXT.verify_password(password.as_str().as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(error) => Err(CredentialError::Verify(error)),
    }
}

/// Runs [`hash_password`] on the blocking pool; Argon2 is deliberately slow.
pub async fn hash_password_blocking(password: SafeText) -> Result<PasswordHash, CredentialError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .unwrap_or_else(|join_error| {
            tracing::error!("password hashing task failed: {join_error}");
            Err(CredentialError::Hash(password_hash::Error::Crypto))
        })
}

pub async fn verify_password_blocking(
    password: SafeText,
    hash: PasswordHash,
) -> Result<bool, CredentialError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .unwrap_or_else(|join_error| {
            tracing::error!("password verification task failed: {join_error}");
            Err(CredentialError::Verify(password_hash::Error::Crypto))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitizer::Sanitizer;

    fn safe(text: &str) -> SafeText {
        Sanitizer::default().clean(text)
    }

    #[test]
    fn correct_password_verifies() {
        let hash = hash_password(&safe("correct horse battery staple")).unwrap();
        assert!(verify_password(&safe("correct horse battery staple"), &hash).unwrap());
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let hash = hash_password(&safe("hunter2")).unwrap();
        assert!(!verify_password(&safe("hunter3"), &hash).unwrap());
        assert!(!verify_password(&safe(""), &hash).unwrap());
    }

    #[test]
    fn hash_is_salted_and_never_contains_the_plaintext() {
        let first = hash_password(&safe("same-password")).unwrap();
        let second = hash_password(&safe("same-password")).unwrap();
        assert_ne!(first, second);
        assert!(first.as_str().starts_with("$argon2id$"));
        assert!(!first.as_str().contains("same-password"));
    }

    #[test]
    fn malformed_stored_hash_is_an_error() {
        let result = verify_password(&safe("x"), &PasswordHash::from_stored("not-a-phc-string"));
        assert!(matches!(result, Err(CredentialError::MalformedHash(_))));
    }

    #[test]
    fn debug_output_is_redacted() {
        let hash = hash_password(&safe("secret")).unwrap();
        assert_eq!(format!("{hash:?}"), "PasswordHash(<redacted>)");
    }

    #[tokio::test]
    async fn blocking_helpers_round_trip() {
        let hash = hash_password_blocking(safe("pw")).await.unwrap();
        assert!(verify_password_blocking(safe("pw"), hash).await.unwrap());
    }
}
