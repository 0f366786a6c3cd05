//! Product catalog.
//!
//! Reads are public. Create, update and delete are mounted behind the admin
//! gate, which puts the verified claims into the request extensions.

use super::{bad_request, created, json_rejected, message, parse_id, validation_message};
use crate::auth::Claims;
use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{debug, error, info, info_span, instrument, Instrument};
use utoipa::ToSchema;
use validator::Validate;

const INVALID_ID: &str = "invalid product id";
const NOT_FOUND: &str = "product not found";

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: i64,
}

#[derive(ToSchema, Deserialize, Validate, Debug)]
pub struct ProductInput {
    #[validate(length(min = 3, max = 50))]
    pub name: String,
    #[validate(range(min = 1))]
    pub price: i64,
}

#[utoipa::path(
    get,
    path= "/products",
    responses (
        (status = 200, description = "All products ordered by id", body = [Product]),
        (status = 500, description = "Database failure"),
    ),
    tag= "products"
)]
pub async fn list(pool: Extension<PgPool>) -> Response {
    match fetch_products(&pool).await {
        Ok(products) => (StatusCode::OK, Json(products)).into_response(),
        Err(err) => {
            error!("Failed to list products: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path= "/products/{id}",
    params(
        ("id" = i64, Path, description = "Product id")
    ),
    responses (
        (status = 200, description = "Product detail", body = Product),
        (status = 400, description = "Invalid product id"),
        (status = 404, description = "Product not found"),
    ),
    tag= "products"
)]
pub async fn get(Path(id): Path<String>, pool: Extension<PgPool>) -> Response {
    let Some(id) = parse_id(&id) else {
        return bad_request(INVALID_ID);
    };

    match fetch_product(&pool, id).await {
        Ok(Some(product)) => (StatusCode::OK, Json(product)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, NOT_FOUND.to_string()).into_response(),
        Err(err) => {
            error!("Failed to fetch product: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path= "/products",
    request_body = ProductInput,
    responses (
        (status = 201, description = "Product created", body = super::Created),
        (status = 400, description = "Unreadable JSON or invalid input"),
        (status = 401, description = "Authorization header is missing"),
        (status = 403, description = "Token rejected or role is not admin"),
    ),
    security(("bearer" = [])),
    tag= "products"
)]
#[instrument(skip(pool, claims, payload), fields(user_id = claims.user_id))]
pub async fn create(
    pool: Extension<PgPool>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Response {
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => return json_rejected(&rejection),
    };

    if let Err(errors) = input.validate() {
        return bad_request(&validation_message(&errors));
    }

    match insert_product(&pool, &input).await {
        Ok(id) => {
            info!(product_id = id, "product created");
            created("product created", id)
        }
        Err(err) => {
            error!("Failed to insert product: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    put,
    path= "/products/{id}",
    params(
        ("id" = i64, Path, description = "Product id")
    ),
    request_body = ProductInput,
    responses (
        (status = 200, description = "Product updated", body = super::Message),
        (status = 400, description = "Invalid id, unreadable JSON or invalid input"),
        (status = 401, description = "Authorization header is missing"),
        (status = 403, description = "Token rejected or role is not admin"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer" = [])),
    tag= "products"
)]
#[instrument(skip(pool, claims, payload), fields(user_id = claims.user_id))]
pub async fn update(
    Path(id): Path<String>,
    pool: Extension<PgPool>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return bad_request(INVALID_ID);
    };
    let input = match payload {
        Ok(Json(input)) => input,
        Err(rejection) => return json_rejected(&rejection),
    };

    if let Err(errors) = input.validate() {
        return bad_request(&validation_message(&errors));
    }

    match update_product(&pool, id, &input).await {
        Ok(true) => {
            info!(product_id = id, "product updated");
            message(StatusCode::OK, "product updated")
        }
        Ok(false) => (StatusCode::NOT_FOUND, NOT_FOUND.to_string()).into_response(),
        Err(err) => {
            error!("Failed to update product: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path= "/products/{id}",
    params(
        ("id" = i64, Path, description = "Product id")
    ),
    responses (
        (status = 200, description = "Product deleted", body = super::Message),
        (status = 400, description = "Invalid product id"),
        (status = 401, description = "Authorization header is missing"),
        (status = 403, description = "Token rejected or role is not admin"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer" = [])),
    tag= "products"
)]
#[instrument(skip(pool, claims), fields(user_id = claims.user_id))]
pub async fn delete(
    Path(id): Path<String>,
    pool: Extension<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Response {
    let Some(id) = parse_id(&id) else {
        return bad_request(INVALID_ID);
    };

    match delete_product(&pool, id).await {
        Ok(true) => {
            info!(product_id = id, "product deleted");
            message(StatusCode::OK, "product deleted")
        }
        Ok(false) => {
            debug!(product_id = id, "nothing to delete");
            (StatusCode::NOT_FOUND, NOT_FOUND.to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to delete product: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn fetch_products(pool: &PgPool) -> Result<Vec<Product>, sqlx::Error> {
    let query = "SELECT id, name, price FROM products ORDER BY id";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query).fetch_all(pool).instrument(span).await?;
    Ok(rows.iter().map(product_from_row).collect())
}

async fn fetch_product(pool: &PgPool, id: i64) -> Result<Option<Product>, sqlx::Error> {
    let query = "SELECT id, name, price FROM products WHERE id = $1";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;
    Ok(row.as_ref().map(product_from_row))
}

async fn insert_product(pool: &PgPool, input: &ProductInput) -> Result<i64, sqlx::Error> {
    let query = "INSERT INTO products (name, price) VALUES ($1, $2) RETURNING id";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(&input.name)
        .bind(input.price)
        .fetch_one(pool)
        .instrument(span)
        .await?;
    Ok(row.get("id"))
}

async fn update_product(pool: &PgPool, id: i64, input: &ProductInput) -> Result<bool, sqlx::Error> {
    let query = "UPDATE products SET name = $1, price = $2 WHERE id = $3";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(&input.name)
        .bind(input.price)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn delete_product(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let query = "DELETE FROM products WHERE id = $1";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn product_from_row(row: &sqlx::postgres::PgRow) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        price: row.get("price"),
    }
}
