//! Amoura storefront backend
//!
//! HTTP API for the Amoura cake shop: product catalog, customer carts,
//! checkout and orders, plus an admin dashboard. Identity, Postgres and file
//! storage are provided by Supabase.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod error;
pub mod external;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;

use external::{EmailClient, StorageClient};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    /// Present only when the service role key is configured
    pub storage: Option<StorageClient>,
    /// Present only when SMTP is fully configured
    pub email: Option<EmailClient>,
}

impl AppState {
    /// Build the state, wiring optional integrations from configuration
    pub fn new(db: sqlx::PgPool, config: Config) -> Self {
        let storage = match StorageClient::from_config(&config.supabase) {
            Some(client) => Some(client),
            None => {
                tracing::warn!("SUPABASE_SERVICE_ROLE_KEY is not set; image uploads are disabled");
                None
            }
        };

        let email = match EmailClient::from_config(&config.smtp) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("SMTP configuration rejected, email is disabled: {}", e);
                None
            }
        };

        Self {
            db,
            config: Arc::new(config),
            storage,
            email,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_prefix = state.config.api_v1_str.clone();

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(handlers::openapi_json))
        .route("/docs", get(handlers::swagger_ui))
        .route("/redoc", get(handlers::redoc))
        .nest(&api_prefix, routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
