//! Google identity-token verification against the published JWKS.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

use super::types::IdTokenClaims;
use crate::error::ApiError;

/// Both spellings Google uses for the `iss` claim.
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

const DEFAULT_JWKS_TTL: Duration = Duration::from_secs(3600);

/// Floor between refetches triggered by an unknown `kid`.
const MIN_FORCED_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum VerifyError {
    /// Signature, issuer, audience, expiry or structure rejected
    #[error("{0}")]
    Invalid(String),

    /// The issuer's key set could not be fetched
    #[error("key set unavailable: {0}")]
    KeySetUnavailable(String),
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Invalid(reason) => {
                tracing::warn!("ID token verification failed: {}", reason);
                ApiError::unauthorized("Invalid ID token. Verification failed.")
            }
            VerifyError::KeySetUnavailable(msg) => ApiError::Network(msg),
        }
    }
}

/// Verifies identity tokens minted for `expected_audience`.
#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify(
        &self,
        id_token: &str,
        expected_audience: &str,
    ) -> Result<IdTokenClaims, VerifyError>;
}

enum KeySource {
    Remote { http: reqwest::Client, url: String },
    Static,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
    expires_at: Option<Instant>,
}

impl CachedKeys {
    /// Whether this entry can be served for a lookup.
    ///
    /// A forced lookup only bypasses entries older than `min_refresh`.
    fn usable(&self, now: Instant, force_refresh: bool, min_refresh: Duration) -> bool {
        let fresh = self.expires_at.map_or(true, |at| now < at);
        let refresh_allowed = now.duration_since(self.fetched_at) >= min_refresh;
        fresh && !(force_refresh && refresh_allowed)
    }
}

/// RS256 verifier backed by a cached copy of Google's key set.
pub struct GoogleIdTokenVerifier {
    source: KeySource,
    cache: RwLock<Option<CachedKeys>>,
    min_refresh: Duration,
}

impl GoogleIdTokenVerifier {
    pub fn new(http: reqwest::Client, certs_url: impl Into<String>) -> Self {
        Self {
            source: KeySource::Remote {
                http,
                url: certs_url.into(),
            },
            cache: RwLock::new(None),
            min_refresh: MIN_FORCED_REFRESH_INTERVAL,
        }
    }

    /// Verifier pinned to a fixed key set; never fetches.
    pub fn with_keys(keys: JwkSet) -> Self {
        Self {
            source: KeySource::Static,
            cache: RwLock::new(Some(CachedKeys {
                keys,
                fetched_at: Instant::now(),
                expires_at: None,
            })),
            min_refresh: MIN_FORCED_REFRESH_INTERVAL,
        }
    }

    #[cfg(test)]
    fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh = interval;
        self
    }

    async fn keys(&self, force_refresh: bool) -> Result<JwkSet, VerifyError> {
        // Check cache first (read lock)
        {
            let cached = self.cache.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.usable(Instant::now(), force_refresh, self.min_refresh) {
                    return Ok(entry.keys.clone());
                }
            }
        }

        let (http, url) = match &self.source {
            KeySource::Remote { http, url } => (http, url),
            KeySource::Static => {
                let cached = self.cache.read().await;
                return Ok(cached
                    .as_ref()
                    .map(|entry| entry.keys.clone())
                    .unwrap_or(JwkSet { keys: Vec::new() }));
            }
        };

        // The write lock is held across the fetch so concurrent misses share one request
        let mut cached = self.cache.write().await;
        if let Some(entry) = cached.as_ref() {
            if entry.usable(Instant::now(), force_refresh, self.min_refresh) {
                return Ok(entry.keys.clone());
            }
        }

        let (keys, ttl) = fetch_jwks(http, url).await?;
        tracing::debug!(keys = keys.keys.len(), ttl_secs = ttl.as_secs(), "Fetched Google JWKS");

        let now = Instant::now();
        *cached = Some(CachedKeys {
            keys: keys.clone(),
            fetched_at: now,
            expires_at: Some(now + ttl),
        });

        Ok(keys)
    }
}

async fn fetch_jwks(http: &reqwest::Client, url: &str) -> Result<(JwkSet, Duration), VerifyError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| VerifyError::KeySetUnavailable(format!("Failed to fetch JWKS: {}", e)))?;

    if !response.status().is_success() {
        return Err(VerifyError::KeySetUnavailable(format!(
            "JWKS endpoint returned {}",
            response.status()
        )));
    }

    let ttl = response
        .headers()
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(max_age)
        .unwrap_or(DEFAULT_JWKS_TTL);

    let keys = response
        .json::<JwkSet>()
        .await
        .map_err(|e| VerifyError::KeySetUnavailable(format!("Failed to parse JWKS: {}", e)))?;

    Ok((keys, ttl))
}

fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.parse().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl IdTokenVerifier for GoogleIdTokenVerifier {
    async fn verify(
        &self,
        id_token: &str,
        expected_audience: &str,
    ) -> Result<IdTokenClaims, VerifyError> {
        let header = decode_header(id_token)
            .map_err(|e| VerifyError::Invalid(format!("Failed to decode header: {}", e)))?;

        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::Invalid(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| VerifyError::Invalid("token header has no kid".to_string()))?;

        let mut keys = self.keys(false).await?;
        if keys.find(&kid).is_none() {
            // Google rotates keys; refresh once before giving up
            keys = self.keys(true).await?;
        }
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| VerifyError::Invalid(format!("unknown signing key {}", kid)))?;

        let decoding_key = DecodingKey::from_jwk(jwk)
            .map_err(|e| VerifyError::Invalid(format!("Invalid RSA key: {}", e)))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_audience(&[expected_audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = 60;

        let token_data = decode::<IdTokenClaims>(id_token, &decoding_key, &validation)
            .map_err(|e| VerifyError::Invalid(format!("JWT validation failed: {}", e)))?;

        Ok(token_data.claims)
    }
}
