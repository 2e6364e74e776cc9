use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::auth;
use crate::handlers::{health, managers};
use crate::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Sign-in
        .route("/auth/google/exchange", post(auth::google_exchange))

        // Manager routes
        .route("/managers", get(managers::list_managers))
        .route("/managers", post(managers::create_manager))
        .route("/managers/:id", get(managers::get_manager))
        .route("/managers/:id", put(managers::update_manager))
        .route("/managers/:id", delete(managers::delete_manager))
}
