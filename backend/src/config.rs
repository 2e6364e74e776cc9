use anyhow::{bail, Context, Result};
use std::time::Duration;

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Upper bound on any single call to Google.
const MAX_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub google: GoogleConfig,
    pub http_timeout: Duration,
    pub require_verified_email: bool,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub mail: Option<MailConfig>,
}

/// Statically configured OAuth client registration.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_url: String,
    pub certs_url: String,
}

/// Sender account used for outbound invitation mail.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub sender_address: String,
    pub sender_refresh_token: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{} must be set", key))
        };

        let http_timeout_secs: u64 = lookup("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|| MAX_HTTP_TIMEOUT_SECS.to_string())
            .parse()
            .context("HTTP_TIMEOUT_SECS must be a valid number")?;
        if http_timeout_secs == 0 || http_timeout_secs > MAX_HTTP_TIMEOUT_SECS {
            bail!(
                "HTTP_TIMEOUT_SECS must be between 1 and {}",
                MAX_HTTP_TIMEOUT_SECS
            );
        }

        let require_verified_email = match lookup("REQUIRE_VERIFIED_EMAIL") {
            Some(v) => parse_bool(&v).context("REQUIRE_VERIFIED_EMAIL must be true or false")?,
            None => true,
        };

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        });

        let mail = match (
            lookup("MAIL_SENDER_ADDRESS"),
            lookup("MAIL_SENDER_REFRESH_TOKEN"),
        ) {
            (Some(sender_address), Some(sender_refresh_token)) => Some(MailConfig {
                sender_address,
                sender_refresh_token,
            }),
            (None, None) => None,
            _ => bail!("MAIL_SENDER_ADDRESS and MAIL_SENDER_REFRESH_TOKEN must be set together"),
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            google: GoogleConfig {
                client_id: required("GOOGLE_CLIENT_ID")?,
                client_secret: required("GOOGLE_CLIENT_SECRET")?,
                redirect_uri: required("GOOGLE_REDIRECT_URI")?,
                token_url: lookup("GOOGLE_TOKEN_URL")
                    .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
                certs_url: lookup("GOOGLE_CERTS_URL")
                    .unwrap_or_else(|| DEFAULT_CERTS_URL.to_string()),
            },
            http_timeout: Duration::from_secs(http_timeout_secs),
            require_verified_email,
            cors_allowed_origins,
            mail,
        })
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("invalid boolean: {}", other),
    }
}
