mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod mail;
mod models;
mod repository;
mod routes;
mod schema;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::{GoogleIdTokenVerifier, GoogleTokenClient, IdTokenVerifier, TokenExchanger};
use crate::config::AppConfig;
use crate::mail::{GmailMailer, LogMailer, Mailer};
use crate::repository::{PgUserStore, UserStore};
use crate::routes::api_routes;

/// Shared handles for every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn UserStore>,
    pub exchanger: Arc<dyn TokenExchanger>,
    pub verifier: Arc<dyn IdTokenVerifier>,
    pub mailer: Arc<dyn Mailer>,
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider().install_default().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    tracing::info!("Starting sign-in backend");

    // Initialize database pool
    let pool = db::establish_connection_pool(&config.database_url)?;
    tracing::info!("Database connection pool initialized");

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let token_client = GoogleTokenClient::new(http.clone(), config.google.clone());
    let verifier = GoogleIdTokenVerifier::new(http, config.google.certs_url.clone());

    let mailer: Arc<dyn Mailer> = match &config.mail {
        Some(mail) => {
            tracing::info!("Invitation mail will be sent as {}", mail.sender_address);
            Arc::new(GmailMailer::connect(&config.google, mail).await?)
        }
        None => {
            tracing::warn!("MAIL_SENDER_ADDRESS not set, invitation mail will only be logged");
            Arc::new(LogMailer)
        }
    };

    let port = config.port;
    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(PgUserStore::new(pool)),
        exchanger: Arc::new(token_client),
        verifier: Arc::new(verifier),
        mailer,
    };

    let app = create_app(state);

    // Run server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let cors = build_cors_layer(state.config.cors_allowed_origins.as_deref());

    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build CORS layer from the configured origins.
///
/// Without an allow-list the layer is permissive, which is only suitable for
/// local development.
fn build_cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .unwrap_or_default()
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!(
            "CORS_ALLOWED_ORIGINS not set, using permissive CORS (not recommended for production)"
        );
        return CorsLayer::permissive();
    }

    tracing::info!("CORS configured for origins: {:?}", origins);
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
