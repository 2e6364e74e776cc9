//! Client for Google's OAuth token endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use super::types::TokenSet;
use crate::config::GoogleConfig;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum TokenExchangeError {
    /// DNS, connect, timeout or body read failure
    #[error("transport failure: {0}")]
    Network(String),

    /// Google answered with a non-2xx status
    #[error("token endpoint returned {status}")]
    Http {
        status: u16,
        details: serde_json::Value,
    },

    #[error("ID token not received from Google")]
    MissingIdToken,

    #[error("malformed token response: {0}")]
    Malformed(String),
}

impl From<TokenExchangeError> for ApiError {
    fn from(err: TokenExchangeError) -> Self {
        match err {
            TokenExchangeError::Network(msg) => ApiError::Network(msg),
            TokenExchangeError::Http { status, details } => ApiError::Upstream { status, details },
            TokenExchangeError::MissingIdToken => {
                ApiError::UpstreamProtocol("ID token not received from Google".to_string())
            }
            TokenExchangeError::Malformed(msg) => ApiError::UpstreamProtocol(msg),
        }
    }
}

/// Trades a single-use authorization code for tokens.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, code: &str) -> Result<TokenSet, TokenExchangeError>;
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: Option<String>,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// reqwest-backed client bound to the configured OAuth registration.
#[derive(Clone)]
pub struct GoogleTokenClient {
    http: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleTokenClient {
    /// `http` is expected to carry the request timeout.
    pub fn new(http: reqwest::Client, config: GoogleConfig) -> Self {
        Self { http, config }
    }

    async fn post_form(&self, form: &[(&str, &str)]) -> Result<GoogleTokenResponse, TokenExchangeError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| TokenExchangeError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TokenExchangeError::Network(e.to_string()))?;

        if !status.is_success() {
            let details = serde_json::from_str(&body)
                .unwrap_or_else(|_| serde_json::Value::String(body));
            tracing::error!("Token endpoint rejected request: {} - {}", status, details);
            return Err(TokenExchangeError::Http {
                status: status.as_u16(),
                details,
            });
        }

        serde_json::from_str(&body).map_err(|e| TokenExchangeError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl TokenExchanger for GoogleTokenClient {
    async fn exchange(&self, code: &str) -> Result<TokenSet, TokenExchangeError> {
        let tokens = self
            .post_form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        let id_token = tokens
            .id_token
            .filter(|t| !t.is_empty())
            .ok_or(TokenExchangeError::MissingIdToken)?;
        let access_token = tokens
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TokenExchangeError::Malformed("access_token missing".to_string()))?;

        tracing::debug!(
            expires_in = ?tokens.expires_in,
            has_refresh_token = tokens.refresh_token.is_some(),
            "Authorization code exchanged"
        );

        Ok(TokenSet {
            id_token,
            access_token,
            refresh_token: tokens.refresh_token.filter(|t| !t.is_empty()),
        })
    }
}
