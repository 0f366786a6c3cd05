//! Password hashing with bcrypt.
//!
//! Stored credentials are bcrypt modular crypt strings (`$2b$<cost>$<salt+digest>`),
//! so the salt and work factor travel with the hash and are compared verbatim.
//!
//! bcrypt only reads the first [`MAX_PASSWORD_BYTES`] bytes of its input. Longer
//! passwords are refused here rather than truncated, so two passwords sharing
//! a 72 byte prefix never verify as each other.

use super::AuthError;
use bcrypt::BcryptError;
use tracing::{debug, error};

pub const DEFAULT_HASH_COST: u32 = 10;

/// Longest password, in bytes, bcrypt hashes without truncation.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_COST)
    }
}

impl CredentialHasher {
    #[must_use]
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }

    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// # Errors
    /// Returns `HashingFailure` if the password is longer than
    /// [`MAX_PASSWORD_BYTES`], bcrypt rejects the cost or the RNG fails.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            error!(
                bytes = plaintext.len(),
                "refusing to hash password longer than bcrypt reads"
            );
            return Err(AuthError::HashingFailure);
        }

        bcrypt::hash(plaintext, self.cost).map_err(|err| {
            error!(kind = error_kind(&err), "bcrypt hash failed");
            AuthError::HashingFailure
        })
    }

    /// Check a plaintext password against a stored hash.
    ///
    /// A wrong password is `Ok(false)`; only an unreadable stored hash is an error.
    /// A password longer than [`MAX_PASSWORD_BYTES`] was never hashable, so it
    /// never matches.
    ///
    /// # Errors
    /// Returns `MalformedCredential` if `hashed` is not a valid bcrypt string.
    pub fn verify(&self, hashed: &str, plaintext: &str) -> Result<bool, AuthError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            debug!(bytes = plaintext.len(), "password longer than bcrypt reads");
            return Ok(false);
        }

        bcrypt::verify(plaintext, hashed).map_err(|err| {
            error!(kind = error_kind(&err), "stored bcrypt hash rejected");
            AuthError::MalformedCredential
        })
    }

    /// Run [`Self::hash`] on the blocking pool.
    ///
    /// # Errors
    /// Same as [`Self::hash`]; a panicked worker is reported as `HashingFailure`.
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, AuthError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|err| {
                error!("password hashing task failed: {err}");
                AuthError::HashingFailure
            })?
    }

    /// Run [`Self::verify`] on the blocking pool.
    ///
    /// # Errors
    /// Same as [`Self::verify`]; a panicked worker is reported as `HashingFailure`.
    pub async fn verify_blocking(
        &self,
        hashed: String,
        plaintext: String,
    ) -> Result<bool, AuthError> {
        let hasher = *self;
        let matched = tokio::task::spawn_blocking(move || hasher.verify(&hashed, &plaintext))
            .await
            .map_err(|err| {
                error!("password verification task failed: {err}");
                AuthError::HashingFailure
            })??;

        debug!(matched, "password verification finished");

        Ok(matched)
    }
}

// Several bcrypt errors render the offending hash; log only which one it was.
fn error_kind(err: &BcryptError) -> &'static str {
    match err {
        BcryptError::InvalidHash(_) => "invalid hash",
        BcryptError::InvalidPrefix(_) => "invalid prefix",
        BcryptError::InvalidCost(_) => "invalid cost",
        BcryptError::CostNotAllowed(_) => "cost not allowed",
        BcryptError::InvalidSaltLen(_) => "invalid salt length",
        BcryptError::InvalidBase64(_) => "invalid base64",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(TEST_COST)
    }

    #[test]
    fn hash_then_verify() {
        let hasher = hasher();
        let hashed = hasher.hash("correct horse battery").unwrap();

        assert!(hashed.starts_with("$2"));
        assert!(!hashed.contains("correct horse battery"));
        assert!(hasher.verify(&hashed, "correct horse battery").unwrap());
    }

    #[test]
    fn wrong_password_is_false_not_error() {
        let hasher = hasher();
        let hashed = hasher.hash("password-one").unwrap();

        assert_eq!(hasher.verify(&hashed, "password-two"), Ok(false));
        assert_eq!(hasher.verify(&hashed, ""), Ok(false));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hasher = hasher();
        let first = hasher.hash("repeat-me-please").unwrap();
        let second = hasher.hash("repeat-me-please").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify(&first, "repeat-me-please").unwrap());
        assert!(hasher.verify(&second, "repeat-me-please").unwrap());
    }

    #[test]
    fn cost_is_embedded_in_hash() {
        let hashed = CredentialHasher::new(5).hash("cost-check").unwrap();
        assert_eq!(&hashed[4..7], "05$");
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let hasher = hasher();
        assert_eq!(
            hasher.verify("not-a-bcrypt-hash", "anything"),
            Err(AuthError::MalformedCredential)
        );
    }

    #[test]
    fn refuses_passwords_bcrypt_would_truncate() {
        let hasher = hasher();
        let prefix = "あ".repeat(24);
        let first = format!("{prefix}{}", "い".repeat(6));
        let second = format!("{prefix}{}", "う".repeat(6));
        assert_eq!(prefix.len(), MAX_PASSWORD_BYTES);
        assert_eq!(first.len(), 90);

        assert_eq!(hasher.hash(&first), Err(AuthError::HashingFailure));
        assert_eq!(hasher.hash(&second), Err(AuthError::HashingFailure));

        let hashed = hasher.hash(&prefix).unwrap();
        assert!(hasher.verify(&hashed, &prefix).unwrap());
        assert_eq!(hasher.verify(&hashed, &first), Ok(false));
        assert_eq!(hasher.verify(&hashed, &second), Ok(false));
    }

    #[test]
    fn error_kind_leaves_out_the_hash() {
        let stored = "$2b$10$truncatedButSensitiveHashMaterialXYZ";
        let err = bcrypt::verify("pw", stored).unwrap_err();
        assert!(err.to_string().contains(stored));

        let kind = error_kind(&err);
        assert_eq!(kind, "invalid hash");
        assert!(!kind.contains("truncatedButSensitive"));

        assert_eq!(
            hasher().verify(stored, "pw"),
            Err(AuthError::MalformedCredential)
        );
    }

    #[test]
    fn invalid_cost_fails_hashing() {
        let hasher = CredentialHasher::new(2);
        assert_eq!(hasher.hash("whatever"), Err(AuthError::HashingFailure));
    }

    #[test]
    fn default_cost() {
        assert_eq!(CredentialHasher::default().cost(), DEFAULT_HASH_COST);
    }

    #[tokio::test]
    async fn blocking_helpers_round_trip() {
        let hasher = hasher();
        let hashed = hasher
            .hash_blocking("from-the-pool".to_string())
            .await
            .unwrap();

        assert!(hasher
            .verify_blocking(hashed.clone(), "from-the-pool".to_string())
            .await
            .unwrap());
        assert!(!hasher
            .verify_blocking(hashed, "not-from-the-pool".to_string())
            .await
            .unwrap());
    }
}
