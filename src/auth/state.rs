//! Auth configuration and the shared state handed to handlers.

use super::{CredentialHasher, TokenKeys, DEFAULT_HASH_COST, DEFAULT_TOKEN_TTL_SECONDS};
use secrecy::{ExposeSecret, SecretString};

#[derive(Clone, Debug)]
pub struct AuthConfig {
    jwt_secret: SecretString,
    token_ttl_seconds: i64,
    hash_cost: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(jwt_secret: SecretString) -> Self {
        Self {
            jwt_secret,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            hash_cost: DEFAULT_HASH_COST,
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub fn hash_cost(&self) -> u32 {
        self.hash_cost
    }

    #[must_use]
    pub fn has_secret(&self) -> bool {
        !self.jwt_secret.expose_secret().is_empty()
    }
}

pub struct AuthState {
    hasher: CredentialHasher,
    tokens: TokenKeys,
}

impl AuthState {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            hasher: CredentialHasher::new(config.hash_cost),
            tokens: TokenKeys::new(&config.jwt_secret, config.token_ttl_seconds),
        }
    }

    #[must_use]
    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenKeys {
        &self.tokens
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("hasher", &self.hasher)
            .field("tokens", &self.tokens)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn defaults() {
        let config = AuthConfig::new(secret("s3cret"));
        assert_eq!(config.token_ttl_seconds(), 86_400);
        assert_eq!(config.hash_cost(), 10);
        assert!(config.has_secret());
    }

    #[test]
    fn builders_override_defaults() {
        let config = AuthConfig::new(secret("s3cret"))
            .with_token_ttl_seconds(60)
            .with_hash_cost(4);
        let state = AuthState::new(&config);

        assert_eq!(state.tokens().ttl_seconds(), 60);
        assert_eq!(state.hasher().cost(), 4);
    }

    #[test]
    fn empty_secret_is_reported() {
        let config = AuthConfig::new(secret(""));
        assert!(!config.has_secret());
        assert!(!AuthState::new(&config).tokens().has_secret());
    }

    #[test]
    fn debug_never_prints_secret() {
        let config = AuthConfig::new(secret("hunter2-signing-key"));
        let state = AuthState::new(&config);

        assert!(!format!("{config:?}").contains("hunter2-signing-key"));
        assert!(!format!("{state:?}").contains("hunter2-signing-key"));
    }
}
