//! Authentication HTTP handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use shared::api::ExchangeRequest;

use super::exchange::exchange_code;
use super::middleware::build_refresh_cookie;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Exchange a Google authorization code for a signed-in user.
///
/// Returns the user's profile with Google's access and identity tokens, and
/// sets the refresh token as an HTTP-only cookie.
pub async fn google_exchange(
    State(state): State<AppState>,
    payload: Result<Json<ExchangeRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!("Rejected exchange body: {}", rejection.body_text());
        ApiError::bad_request(format!("Invalid JSON payload: {}", rejection.body_text()))
    })?;

    let outcome = exchange_code(&state, request).await?;

    let cookie = outcome
        .refresh_token
        .as_deref()
        .map(|token| HeaderValue::from_str(&build_refresh_cookie(token)))
        .transpose()
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("invalid refresh cookie")))?;

    let mut response = Json(outcome.response).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use crate::auth::testing::{claims, TestHarness};
    use crate::auth::TokenSet;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    const EXCHANGE_PATH: &str = "/api/auth/google/exchange";

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(EXCHANGE_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_successful_exchange_sets_cookie() {
        let h = TestHarness::new();
        h.exchanger.grant(
            "abc123",
            TokenSet {
                id_token: "idt-1".to_string(),
                access_token: "ya29.access".to_string(),
                refresh_token: Some("1//refresh".to_string()),
            },
        );
        h.verifier.accept("idt-1", claims("g-1", "a@x.com", true));

        let response = h
            .app()
            .oneshot(post_json(r#"{"code":"abc123","role":"creator"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("cookie should be set")
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("refresh_token=1//refresh"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=2592000"));

        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Authentication successful");
        assert_eq!(body["user"]["role"], "creator");
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["access_token"], "ya29.access");
        assert_eq!(body["id_token"], "idt-1");
    }

    #[tokio::test]
    async fn test_no_cookie_without_any_refresh_token() {
        let h = TestHarness::new();
        h.exchanger.grant(
            "abc",
            TokenSet {
                id_token: "idt".to_string(),
                access_token: "ya29".to_string(),
                refresh_token: None,
            },
        );
        h.verifier.accept("idt", claims("g-1", "a@x.com", true));

        let response = h.app().oneshot(post_json(r#"{"code":"abc"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_missing_code_is_bad_request() {
        let h = TestHarness::new();

        let response = h.app().oneshot(post_json(r#"{"role":"admin"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Missing authorization code in request body");
        assert_eq!(h.exchanger.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let h = TestHarness::new();

        let response = h.app().oneshot(post_json("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.exchanger.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_role_is_bad_request() {
        let h = TestHarness::new();

        let response = h
            .app()
            .oneshot(post_json(r#"{"code":"abc","role":"superuser"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.exchanger.calls(), 0);
    }

    #[tokio::test]
    async fn test_issuer_rejection_passes_status_through() {
        let h = TestHarness::new();

        let response = h
            .app()
            .oneshot(post_json(r#"{"code":"never-granted"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = body_json(response).await;
        assert_eq!(body["error"], "Failed to exchange code with Google");
        assert_eq!(body["details"]["error"], "invalid_grant");
    }

    #[tokio::test]
    async fn test_verification_failure_is_unauthorized() {
        let h = TestHarness::new();
        h.exchanger.grant(
            "abc",
            TokenSet {
                id_token: "forged".to_string(),
                access_token: "ya29".to_string(),
                refresh_token: Some("1//r".to_string()),
            },
        );

        let response = h.app().oneshot(post_json(r#"{"code":"abc"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid ID token. Verification failed.");
        assert_eq!(h.store.writes(), 0);
    }

    #[tokio::test]
    async fn test_unverified_email_is_forbidden() {
        let h = TestHarness::new();
        h.exchanger.grant(
            "abc",
            TokenSet {
                id_token: "idt".to_string(),
                access_token: "ya29".to_string(),
                refresh_token: None,
            },
        );
        h.verifier.accept("idt", claims("g-1", "a@x.com", false));

        let response = h.app().oneshot(post_json(r#"{"code":"abc"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["error"], "User email not verified by Google");
    }
}
