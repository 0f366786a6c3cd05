//! Customer registration.
//!
//! New accounts always get the default `customer` role; admins are promoted
//! directly in the database.

use super::{
    bad_request, created, is_unique_violation, json_rejected, normalize_email, validation_message,
};
use crate::auth::{AuthState, MAX_PASSWORD_BYTES};
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
use validator::{Validate, ValidationError};

#[derive(ToSchema, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    /// bcrypt only reads the first 72 bytes.
    #[validate(length(min = 8, max = 72), custom(function = "fits_bcrypt"))]
    pub password: String,
}

fn fits_bcrypt(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::new("too_many_bytes"));
    }
    Ok(())
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Public view of a stored user; never carries the password hash.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: String,
    pub role: String,
}

#[utoipa::path(
    post,
    path= "/users",
    request_body = RegisterRequest,
    responses (
        (status = 201, description = "Registration successful", body = super::Created, content_type = "application/json"),
        (status = 400, description = "Unreadable JSON or invalid input"),
        (status = 409, description = "User with the specified email already exists"),
        (status = 500, description = "Hashing or database failure"),
    ),
    tag= "users"
)]
#[instrument(skip(pool, auth, payload))]
pub async fn register(
    pool: Extension<PgPool>,
    auth: Extension<Arc<AuthState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let mut request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return json_rejected(&rejection),
    };

    request.name = request.name.trim().to_string();
    request.email = normalize_email(&request.email);

    if let Err(errors) = request.validate() {
        return bad_request(&validation_message(&errors));
    }

    debug!("register request: {:?}", request);

    let hashed = match auth.hasher().hash_blocking(request.password).await {
        Ok(hashed) => hashed,
        Err(err) => return err.into_response(),
    };

    match insert_user(&pool, &request.name, &request.email, &hashed).await {
        Ok(id) => {
            debug!(user_id = id, "user registered");
            created("user registered", id)
        }
        Err(err) if is_unique_violation(&err) => (
            StatusCode::CONFLICT,
            "email address is already registered".to_string(),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to insert user: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn insert_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    hashed_password: &str,
) -> Result<i64, sqlx::Error> {
    let query = "INSERT INTO users (name, email, password) VALUES ($1, $2, $3) RETURNING id";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(pool)
        .instrument(span)
        .await?;

    Ok(row.get("id"))
}
