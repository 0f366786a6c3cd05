//! Signed access tokens.
//!
//! Tokens are compact HS256 JWTs carrying `{user_id, role, exp}`. Nothing is
//! stored server-side: a token stops working when it expires or the secret
//! changes.

use super::AuthError;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tracing::{debug, error};

pub const ADMIN_ROLE: &str = "admin";
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub role: String,
    /// Unix seconds.
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Identity a token is minted for, snapshotted from the user record at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: String,
}

impl Principal {
    #[must_use]
    pub fn new(user_id: i64, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: role.into(),
        }
    }
}

/// Signing material derived once from the configured secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    has_secret: bool,
    ttl_seconds: i64,
}

impl TokenKeys {
    #[must_use]
    pub fn new(secret: &SecretString, ttl_seconds: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            has_secret: !bytes.is_empty(),
            ttl_seconds,
        }
    }

    #[must_use]
    pub const fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    #[must_use]
    pub const fn has_secret(&self) -> bool {
        self.has_secret
    }

    pub(super) const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    /// Mint a token for `principal` valid until `now + ttl`.
    ///
    /// # Errors
    /// Returns `SigningFailure` when no secret is configured, the expiry
    /// overflows, or encoding fails.
    pub fn issue(&self, principal: &Principal, now: i64) -> Result<String, AuthError> {
        if !self.has_secret {
            error!("refusing to sign token: signing secret is empty");
            return Err(AuthError::SigningFailure);
        }

        let exp = now
            .checked_add(self.ttl_seconds)
            .ok_or(AuthError::SigningFailure)?;

        let claims = Claims {
            user_id: principal.user_id,
            role: principal.role.clone(),
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(
            |err| {
                error!("failed to encode token: {err}");
                AuthError::SigningFailure
            },
        )?;

        debug!(
            user_id = principal.user_id,
            role = %principal.role,
            exp,
            "issued access token"
        );

        Ok(token)
    }
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("secret", &"***")
            .field("has_secret", &self.has_secret)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

/// Current Unix time in seconds.
#[must_use]
pub fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
