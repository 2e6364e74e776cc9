//! Auth-related types.

use serde::{Deserialize, Deserializer, Serialize};

/// Tokens returned by a successful authorization-code exchange.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub id_token: String,
    pub access_token: String,
    /// Google only returns this on the first consent or with `prompt=consent`.
    pub refresh_token: Option<String>,
}

/// Verified claims from a Google identity token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer
    pub iss: String,
    /// Stable Google account id
    pub sub: String,
    /// OAuth client the token was minted for
    pub aud: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,
    pub email: String,
    #[serde(default, deserialize_with = "bool_or_string")]
    pub email_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Caller identity established from a bearer identity token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub external_id: String,
    pub email: String,
}

// Older Google tokens encode email_verified as the string "true".
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.eq_ignore_ascii_case("true"),
    })
}
