//! Credentials, tokens and the admin gate.
//!
//! Passwords are stored as bcrypt hashes. A successful login mints an HS256
//! token carrying `{user_id, role, exp}`; routes that change the catalog sit
//! behind [`admin_only`], which accepts only unexpired tokens whose role is
//! exactly `admin`.

mod error;
mod gate;
mod password;
mod state;
mod token;

pub use error::AuthError;
pub use gate::{admin_only, authorize_admin, bearer_token, verify_token};
pub use password::{CredentialHasher, DEFAULT_HASH_COST, MAX_PASSWORD_BYTES};
pub use state::{AuthConfig, AuthState};
pub use token::{
    now_unix_seconds, Claims, Principal, TokenKeys, ADMIN_ROLE, DEFAULT_TOKEN_TTL_SECONDS,
};
