//! Request-side auth helpers: the bearer-token extractor and cookie builder.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use cookie::{Cookie, SameSite};

use super::types::AuthUser;
use super::verify::VerifyError;
use crate::error::ApiError;
use crate::AppState;

pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Thirty days.
pub const REFRESH_COOKIE_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;

/// Build the Set-Cookie value carrying Google's refresh token.
pub fn build_refresh_cookie(value: &str) -> String {
    Cookie::build((REFRESH_COOKIE_NAME, value.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(REFRESH_COOKIE_MAX_AGE_SECS))
        .build()
        .to_string()
}

fn extract_token_from_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Resolves the caller from a Google identity token in the Authorization header.
#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token_from_header(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authorization token is missing or invalid"))?;

        let claims = state
            .verifier
            .verify(&token, &state.config.google.client_id)
            .await
            .map_err(|e| match e {
                VerifyError::Invalid(reason) => {
                    tracing::warn!("Bearer token rejected: {}", reason);
                    ApiError::unauthorized("Invalid or expired token")
                }
                other => other.into(),
            })?;

        Ok(AuthUser {
            external_id: claims.sub,
            email: claims.email,
        })
    }
}
