use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, warn};

/// Failures of the credential and token flow.
///
/// Messages are safe to return to clients: they never carry the password, the
/// token or the signing secret.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("failed to hash password")]
    HashingFailure,
    #[error("stored credential is malformed")]
    MalformedCredential,
    #[error("failed to sign token")]
    SigningFailure,
    #[error("authorization header is missing")]
    MissingCredential,
    #[error("unexpected token signing algorithm")]
    UnexpectedAlgorithm,
    #[error("token is invalid or expired")]
    InvalidOrExpiredToken,
    #[error("insufficient permissions")]
    InsufficientRole,
}

impl AuthError {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::HashingFailure | Self::MalformedCredential | Self::SigningFailure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::MissingCredential => StatusCode::UNAUTHORIZED,
            Self::UnexpectedAlgorithm | Self::InvalidOrExpiredToken | Self::InsufficientRole => {
                StatusCode::FORBIDDEN
            }
        }
    }

    /// Whether the request was turned away by the gate rather than failing internally.
    #[must_use]
    pub fn is_denial(self) -> bool {
        !self.status().is_server_error()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.is_denial() {
            debug!(kind = ?self, "request denied");
        } else {
            warn!(kind = ?self, "credential flow failed");
        }
        (self.status(), self.to_string()).into_response()
    }
}
