pub mod health;
pub use self::health::health;

pub mod root;
pub use self::root::root;

pub mod users;
pub use self::users::register;

pub mod login;
pub use self::login::login;

pub mod products;

// common functions for the handlers
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Body returned by writes that only need to confirm what happened.
#[derive(ToSchema, Serialize, Debug)]
pub struct Message {
    pub message: String,
}

/// Body returned by writes that create a row.
#[derive(ToSchema, Serialize, Debug)]
pub struct Created {
    pub message: String,
    pub id: i64,
}

pub(crate) fn message(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(Message {
            message: message.to_string(),
        }),
    )
        .into_response()
}

pub(crate) fn created(message: &str, id: i64) -> Response {
    (
        StatusCode::CREATED,
        Json(Created {
            message: message.to_string(),
            id,
        }),
    )
        .into_response()
}

pub(crate) fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, message.to_string()).into_response()
}

/// Answer an unreadable body with axum's own explanation, always as 400.
pub(crate) fn json_rejected(rejection: &JsonRejection) -> Response {
    debug!(status = %rejection.status(), "request body rejected");
    bad_request(&rejection.body_text())
}

/// Render validator output as `field: code` pairs in a stable order.
pub(crate) fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let codes: Vec<String> = errs.iter().map(|err| err.code.to_string()).collect();
            format!("{field}: {}", codes.join(", "))
        })
        .collect();
    fields.sort();
    format!("invalid input: {}", fields.join("; "))
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parse a path id; anything but a positive integer is rejected.
pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
