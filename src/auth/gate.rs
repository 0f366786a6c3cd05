//! Token verification and the admin gate.
//!
//! Flow Overview (one request):
//! 1) No `Authorization` value: `MissingCredential` (401).
//! 2) Strip an optional `Bearer ` prefix and read the token header; anything
//!    outside the HMAC family is `UnexpectedAlgorithm`.
//! 3) Check the signature against the current secret and `exp` against `now`;
//!    failures are `InvalidOrExpiredToken`.
//! 4) Decode the typed claims and require `role == "admin"`, otherwise
//!    `InsufficientRole`.
//!
//! Only a permitted request reaches the wrapped handler, with the verified
//! [`Claims`] attached as a request extension.

use super::{now_unix_seconds, AuthError, AuthState, Claims, TokenKeys};
use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const BEARER_PREFIX: &str = "Bearer ";
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Pull the raw token out of an `Authorization` header value.
///
/// # Errors
/// `MissingCredential` for an absent or blank value, `InvalidOrExpiredToken`
/// for a value that is not visible ASCII.
pub fn bearer_token(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let Some(value) = header else {
        return Err(AuthError::MissingCredential);
    };
    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidOrExpiredToken)?
        .trim_start();
    let token = value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}

/// Verify signature, algorithm and expiry, then decode the claims.
///
/// # Errors
/// See the module flow; a verified token whose claims do not decode is
/// `InsufficientRole`.
pub fn verify_token(keys: &TokenKeys, token: &str, now: i64) -> Result<Claims, AuthError> {
    let header = decode_header(token).map_err(|err| {
        debug!("token header rejected: {err}");
        AuthError::InvalidOrExpiredToken
    })?;

    if !HMAC_ALGORITHMS.contains(&header.alg) {
        warn!(alg = ?header.alg, "token signed with unexpected algorithm");
        return Err(AuthError::UnexpectedAlgorithm);
    }

    // An empty secret would accept tokens anyone can forge.
    if !keys.has_secret() {
        warn!("rejecting token: signing secret is empty");
        return Err(AuthError::InvalidOrExpiredToken);
    }

    let mut validation = Validation::new(header.alg);
    validation.algorithms = HMAC_ALGORITHMS.to_vec();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    // One signature check; the payload stays untyped until expiry is settled.
    let payload = decode::<Value>(token, keys.decoding_key(), &validation)
        .map_err(|err| {
            debug!("token signature rejected: {err}");
            AuthError::InvalidOrExpiredToken
        })?
        .claims;

    let Some(exp) = payload.get("exp").and_then(Value::as_i64) else {
        debug!("token exp is not an integer");
        return Err(AuthError::InvalidOrExpiredToken);
    };
    if exp <= now {
        debug!(exp, now, "token expired");
        return Err(AuthError::InvalidOrExpiredToken);
    }

    serde_json::from_value::<Claims>(payload).map_err(|err| {
        debug!("token claims rejected: {err}");
        AuthError::InsufficientRole
    })
}

/// Run the whole gate for one `Authorization` header value.
///
/// # Errors
/// Any [`AuthError`] denial; the header is checked before any signature work.
pub fn authorize_admin(
    keys: &TokenKeys,
    header: Option<&HeaderValue>,
    now: i64,
) -> Result<Claims, AuthError> {
    let token = bearer_token(header)?;
    let claims = verify_token(keys, token, now)?;
    if !claims.is_admin() {
        debug!(user_id = claims.user_id, role = %claims.role, "admin role required");
        return Err(AuthError::InsufficientRole);
    }
    Ok(claims)
}

/// axum middleware restricting the wrapped routes to admin tokens.
pub async fn admin_only(
    Extension(auth): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authorize_admin(
        auth.tokens(),
        request.headers().get(AUTHORIZATION),
        now_unix_seconds(),
    ) {
        Ok(claims) => {
            debug!(user_id = claims.user_id, "admin gate permitted request");
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Principal, ADMIN_ROLE, DEFAULT_TOKEN_TTL_SECONDS};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use secrecy::SecretString;
    use serde::Serialize;

    const SECRET: &str = "gate-test-secret";
    const T0: i64 = 1_700_000_000;
    const HOUR: i64 = 60 * 60;

    fn keys_with(secret: &str) -> TokenKeys {
        TokenKeys::new(
            &SecretString::from(secret.to_string()),
            DEFAULT_TOKEN_TTL_SECONDS,
        )
    }

    fn keys() -> TokenKeys {
        keys_with(SECRET)
    }

    fn bearer(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
    }

    fn sign_raw<T: Serialize>(alg: Algorithm, claims: &T) -> String {
        encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn admin_token_passes_within_window() {
        let keys = keys();
        let token = keys.issue(&Principal::new(1, ADMIN_ROLE), T0).unwrap();

        let claims = authorize_admin(&keys, Some(&bearer(&token)), T0 + HOUR).unwrap();
        assert_eq!(claims.user_id, 1);
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn admin_token_fails_after_window() {
        let keys = keys();
        let token = keys.issue(&Principal::new(1, ADMIN_ROLE), T0).unwrap();

        assert_eq!(
            authorize_admin(&keys, Some(&bearer(&token)), T0 + 25 * HOUR),
            Err(AuthError::InvalidOrExpiredToken)
        );
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let keys = keys();
        let token = keys.issue(&Principal::new(1, ADMIN_ROLE), T0).unwrap();
        let exp = T0 + DEFAULT_TOKEN_TTL_SECONDS;

        assert!(verify_token(&keys, &token, exp - 1).is_ok());
        assert_eq!(
            verify_token(&keys, &token, exp),
            Err(AuthError::InvalidOrExpiredToken)
        );
    }

    #[test]
    fn customer_token_is_denied() {
        let keys = keys();
        let token = keys.issue(&Principal::new(7, "customer"), T0).unwrap();

        assert_eq!(
            authorize_admin(&keys, Some(&bearer(&token)), T0 + HOUR),
            Err(AuthError::InsufficientRole)
        );
    }

    #[test]
    fn expired_token_denied_regardless_of_role() {
        let keys = keys();
        for role in [ADMIN_ROLE, "customer", ""] {
            let token = keys.issue(&Principal::new(3, role), T0).unwrap();
            assert_eq!(
                authorize_admin(&keys, Some(&bearer(&token)), T0 + 48 * HOUR),
                Err(AuthError::InvalidOrExpiredToken)
            );
        }
    }

    #[test]
    fn missing_header_is_missing_credential() {
        // Empty secret would fail verification; MissingCredential proves no signature check ran.
        let keys = keys_with("");
        assert_eq!(
            authorize_admin(&keys, None, T0),
            Err(AuthError::MissingCredential)
        );
        assert_eq!(
            authorize_admin(&keys, Some(&HeaderValue::from_static("")), T0),
            Err(AuthError::MissingCredential)
        );
        assert_eq!(
            authorize_admin(&keys, Some(&HeaderValue::from_static("Bearer ")), T0),
            Err(AuthError::MissingCredential)
        );
    }

    #[test]
    fn bearer_prefix_is_optional() {
        let keys = keys();
        let token = keys.issue(&Principal::new(1, ADMIN_ROLE), T0).unwrap();
        let raw = HeaderValue::from_str(&token).unwrap();

        assert!(authorize_admin(&keys, Some(&raw), T0 + HOUR).is_ok());
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let keys = keys();
        let token = keys.issue(&Principal::new(1, ADMIN_ROLE), T0).unwrap();

        let (signing_input, signature) = token.rsplit_once('.').unwrap();
        let mut signature = signature.as_bytes().to_vec();
        signature[5] = if signature[5] == b'A' { b'B' } else { b'A' };
        let tampered = format!("{signing_input}.{}", String::from_utf8(signature).unwrap());

        assert_eq!(
            verify_token(&keys, &tampered, T0 + HOUR),
            Err(AuthError::InvalidOrExpiredToken)
        );
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let keys = keys();
        let token = keys.issue(&Principal::new(1, "customer"), T0).unwrap();
        let forged_payload = "eyJ1c2VyX2lkIjoxLCJyb2xlIjoiYWRtaW4iLCJleHAiOjQxMDI0NDQ4MDB9";

        let mut parts = token.split('.');
        let header = parts.next().unwrap();
        let _payload = parts.next().unwrap();
        let signature = parts.next().unwrap();
        let forged = format!("{header}.{forged_payload}.{signature}");

        assert_eq!(
            verify_token(&keys, &forged, T0 + HOUR),
            Err(AuthError::InvalidOrExpiredToken)
        );
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = keys_with("some-other-secret")
            .issue(&Principal::new(1, ADMIN_ROLE), T0)
            .unwrap();

        assert_eq!(
            verify_token(&keys(), &token, T0 + HOUR),
            Err(AuthError::InvalidOrExpiredToken)
        );
    }

    #[test]
    fn non_hmac_algorithm_is_unexpected() {
        // {"alg":"RS256","typ":"JWT"} . {"user_id":1,"role":"admin","exp":4102444800} . junk
        let token = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.\
                     eyJ1c2VyX2lkIjoxLCJyb2xlIjoiYWRtaW4iLCJleHAiOjQxMDI0NDQ4MDB9.\
                     c2lnbmF0dXJl";

        assert_eq!(
            verify_token(&keys(), token, T0),
            Err(AuthError::UnexpectedAlgorithm)
        );
    }

    #[test]
    fn unsigned_token_is_rejected() {
        // {"alg":"none","typ":"JWT"}
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.\
                     eyJ1c2VyX2lkIjoxLCJyb2xlIjoiYWRtaW4iLCJleHAiOjQxMDI0NDQ4MDB9.";

        assert_eq!(
            verify_token(&keys(), token, T0),
            Err(AuthError::InvalidOrExpiredToken)
        );
    }

    #[test]
    fn other_hmac_variants_are_accepted() {
        let claims = Claims {
            user_id: 9,
            role: ADMIN_ROLE.to_string(),
            exp: T0 + HOUR,
        };
        for alg in [Algorithm::HS384, Algorithm::HS512] {
            let token = sign_raw(alg, &claims);
            assert_eq!(verify_token(&keys(), &token, T0), Ok(claims.clone()));
        }
    }

    #[test]
    fn garbage_is_invalid() {
        for token in ["garbage", "a.b.c", "...", "Bearer"] {
            assert_eq!(
                verify_token(&keys(), token, T0),
                Err(AuthError::InvalidOrExpiredToken),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn missing_exp_is_invalid() {
        #[derive(Serialize)]
        struct NoExpiry {
            user_id: i64,
            role: &'static str,
        }

        let token = sign_raw(
            Algorithm::HS256,
            &NoExpiry {
                user_id: 1,
                role: ADMIN_ROLE,
            },
        );
        assert_eq!(
            verify_token(&keys(), &token, T0),
            Err(AuthError::InvalidOrExpiredToken)
        );
    }

    #[test]
    fn non_integer_exp_is_invalid() {
        #[derive(Serialize)]
        struct OddExpiry {
            user_id: i64,
            role: &'static str,
            exp: &'static str,
        }

        let token = sign_raw(
            Algorithm::HS256,
            &OddExpiry {
                user_id: 1,
                role: ADMIN_ROLE,
                exp: "4102444800",
            },
        );
        assert_eq!(
            verify_token(&keys(), &token, T0),
            Err(AuthError::InvalidOrExpiredToken)
        );
    }

    #[test]
    fn unknown_claims_are_ignored() {
        let token = sign_raw(
            Algorithm::HS256,
            &serde_json::json!({
                "user_id": 4,
                "role": ADMIN_ROLE,
                "exp": T0 + HOUR,
                "iss": "somewhere",
            }),
        );
        assert_eq!(
            verify_token(&keys(), &token, T0),
            Ok(Claims {
                user_id: 4,
                role: ADMIN_ROLE.to_string(),
                exp: T0 + HOUR,
            })
        );
    }

    #[test]
    fn malformed_role_claim_is_insufficient_role() {
        #[derive(Serialize)]
        struct NumericRole {
            user_id: i64,
            role: u32,
            exp: i64,
        }

        let token = sign_raw(
            Algorithm::HS256,
            &NumericRole {
                user_id: 1,
                role: 1,
                exp: T0 + HOUR,
            },
        );
        assert_eq!(
            authorize_admin(&keys(), Some(&bearer(&token)), T0),
            Err(AuthError::InsufficientRole)
        );
    }

    #[test]
    fn missing_role_claim_is_insufficient_role() {
        #[derive(Serialize)]
        struct NoRole {
            user_id: i64,
            exp: i64,
        }

        let token = sign_raw(
            Algorithm::HS256,
            &NoRole {
                user_id: 1,
                exp: T0 + HOUR,
            },
        );
        assert_eq!(
            authorize_admin(&keys(), Some(&bearer(&token)), T0),
            Err(AuthError::InsufficientRole)
        );
    }

    #[test]
    fn empty_secret_fails_closed() {
        let token = sign_raw(
            Algorithm::HS256,
            &Claims {
                user_id: 1,
                role: ADMIN_ROLE.to_string(),
                exp: T0 + HOUR,
            },
        );
        assert_eq!(
            verify_token(&keys_with(""), &token, T0),
            Err(AuthError::InvalidOrExpiredToken)
        );
    }
}
