//! Password login.
//!
//! Flow Overview:
//! 1) Look the user up by normalized email.
//! 2) Compare the password against the stored bcrypt hash on the blocking pool.
//! 3) Mint a token from the role stored at this moment.
//!
//! An unknown email and a wrong password produce the same `401` so the endpoint
//! does not reveal which accounts exist.

use super::{bad_request, json_rejected, normalize_email, users::User, validation_message};
use crate::auth::{now_unix_seconds, AuthState, Principal};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{debug, error, info_span, instrument, Instrument};
use utoipa::ToSchema;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "user not found or password is incorrect";

#[derive(ToSchema, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

struct StoredUser {
    user: User,
    password_hash: String,
}

#[utoipa::path(
    post,
    path= "/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Login successful", body = LoginResponse, content_type = "application/json"),
        (status = 400, description = "Unreadable JSON or invalid input"),
        (status = 401, description = "User not found or password is incorrect"),
        (status = 500, description = "Hashing, signing or database failure"),
    ),
    tag= "users"
)]
#[instrument(skip(pool, auth, payload))]
pub async fn login(
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let mut request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejected(&rejection),
    };

    request.email = normalize_email(&request.email);

    if let Err(errors) = request.validate() {
        return bad_request(&validation_message(&errors));
    }

    let stored = match find_user_by_email(&pool, &request.email).await {
        Ok(Some(stored)) => stored,
        Ok(None) => {
            debug!("login for unknown email");
            return (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS.to_string()).into_response();
        }
        Err(err) => {
            error!("Failed to look up user: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match auth
        .hasher()
        .verify_blocking(stored.password_hash, request.password)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            debug!(user_id = stored.user.id, "login with wrong password");
            return (StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS.to_string()).into_response();
        }
        Err(err) => return err.into_response(),
    }

    let principal = Principal::new(stored.user.id, stored.user.role.clone());
    match auth.tokens().issue(&principal, now_unix_seconds()) {
        Ok(token) => (
            StatusCode::OK,
            Json(LoginResponse {
                token,
                user: stored.user,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<StoredUser>, sqlx::Error> {
    let query = r#"
        SELECT
            id,
            name,
            email,
            password,
            role,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM users
        WHERE email = $1
        LIMIT 1
    "#;
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await?;

    Ok(row.map(|row| StoredUser {
        user: User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            created_at: row.get("created_at"),
            role: row.get("role"),
        },
        password_hash: row.get("password"),
    }))
}
