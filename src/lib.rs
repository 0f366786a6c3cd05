//! # ecsite
//!
//! Backend for a small shop: a public product catalog, customer accounts and
//! an admin-only write path for the catalog.
//!
//! ## Authentication
//!
//! Passwords are stored as bcrypt hashes. `POST /login` returns an HS256 token
//! with `{user_id, role, exp}` that lives for 24 hours by default. There is no
//! server-side session: rotating the signing secret invalidates every token.
//!
//! ## Authorization
//!
//! Creating, updating and deleting products requires a token whose role is
//! exactly `admin`. A missing `Authorization` header is `401`; every other
//! denial (foreign algorithm, bad signature, expired, wrong role) is `403`.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
