//! Authorization-code exchange and identity reconciliation.
//!
//! The flow runs in fixed stages: trade the code for tokens, verify the
//! identity token, apply the email policy, then upsert the user. Any stage
//! failing aborts the flow before anything is persisted.

use shared::api::{ExchangeRequest, ExchangeResponse, UserProfile};
use shared::Role;

use super::types::IdTokenClaims;
use crate::error::{ApiError, ApiResult};
use crate::models::{normalize_avatar_url, UserLogin};
use crate::AppState;

/// Result of a successful exchange, before HTTP assembly.
#[derive(Debug)]
pub struct ExchangeOutcome {
    pub response: ExchangeResponse,
    /// Value for the refresh-token cookie, if there is one to set.
    pub refresh_token: Option<String>,
    pub created: bool,
}

/// Reject identities whose email Google has not verified.
pub fn enforce_email_policy(claims: &IdTokenClaims, require_verified: bool) -> ApiResult<()> {
    if require_verified && !claims.email_verified {
        tracing::warn!(sub = %claims.sub, "Login rejected: email not verified by Google");
        return Err(ApiError::Forbidden(
            "User email not verified by Google".to_string(),
        ));
    }
    Ok(())
}

pub async fn exchange_code(state: &AppState, request: ExchangeRequest) -> ApiResult<ExchangeOutcome> {
    let code = request
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing authorization code in request body"))?;

    let tokens = state.exchanger.exchange(code).await?;

    let claims = state
        .verifier
        .verify(&tokens.id_token, &state.config.google.client_id)
        .await?;

    enforce_email_policy(&claims, state.config.require_verified_email)?;

    let login = UserLogin {
        external_id: claims.sub,
        email: claims.email,
        display_name: claims.name.unwrap_or_default(),
        avatar_url: normalize_avatar_url(claims.picture.as_deref().unwrap_or_default()),
        email_verified: claims.email_verified,
        role: request.role.unwrap_or(Role::LEAST_PRIVILEGED),
        refresh_token: tokens.refresh_token.clone(),
    };

    let outcome = state
        .store
        .upsert_login(&login)
        .await
        .map_err(ApiError::from_store)?;
    let user = outcome.user;

    if outcome.created {
        tracing::info!(user_id = %user.id, role = %user.role, "Created user from Google login");
    } else {
        tracing::info!(user_id = %user.id, "Refreshed user from Google login");
    }

    // Google omits the refresh token on repeat consents; fall back to the stored one
    let refresh_token = tokens.refresh_token.or_else(|| user.refresh_token.clone());

    let profile = UserProfile {
        id: user.id.to_string(),
        email: user.email,
        name: user.display_name,
        picture: user.avatar_url,
        role: user.role,
    };

    Ok(ExchangeOutcome {
        response: ExchangeResponse::success(profile, tokens.access_token, tokens.id_token),
        refresh_token,
        created: outcome.created,
    })
}
