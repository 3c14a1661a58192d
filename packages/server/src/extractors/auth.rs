use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::AppState;

/// Alternate header the periodic trigger may use instead of `Authorization`.
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Proof that the request came from the periodic retry trigger.
///
/// Accepts `Authorization: Bearer <cron_secret>` or `x-cron-secret: <cron_secret>`.
/// Rejection happens during extraction, before the handler touches any store.
pub struct CronAuth;

/// Proof that the request carries the admin bearer token.
pub struct AdminAuth;

impl FromRequestParts<AppState> for CronAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = presented_secret(&parts.headers, Some(CRON_SECRET_HEADER))?;
        if secrets_match(presented, &state.config.auth.cron_secret) {
            Ok(CronAuth)
        } else {
            tracing::warn!("Rejected retry trigger with invalid secret");
            Err(AppError::TokenInvalid)
        }
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = presented_secret(&parts.headers, None)?;
        if secrets_match(presented, &state.config.auth.admin_token) {
            Ok(AdminAuth)
        } else {
            Err(AppError::TokenInvalid)
        }
    }
}

/// Bearer token from `Authorization`, falling back to `fallback_header` when given.
///
/// A non-Bearer `Authorization` value only counts as invalid if the fallback
/// header is absent too.
fn presented_secret<'a>(
    headers: &'a HeaderMap,
    fallback_header: Option<&str>,
) -> Result<&'a str, AppError> {
    let authorization = headers.get(AUTHORIZATION);
    let bearer = authorization
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Ok(token);
    }

    if let Some(value) = fallback_header.and_then(|name| headers.get(name)) {
        return value.to_str().map_err(|_| AppError::TokenInvalid);
    }

    match authorization {
        Some(_) => Err(AppError::TokenInvalid),
        None => Err(AppError::TokenMissing),
    }
}

/// Compare secrets in constant time. Hashing first hides the expected length.
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented.as_slice().ct_eq(expected.as_slice()).into()
}
