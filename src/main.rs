//! Warrantree Backend
//!
//! REST backend for tracking product warranties across shared vaults, with
//! SQLite persistence and warranty status derived at read time.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod warranty;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use warranty::{Clock, StatusDeriver, SystemClock};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
    pub deriver: StatusDeriver,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(repo: Repository, config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo: Arc::new(repo),
            deriver: StatusDeriver::new(config.expiry_window_days),
            config: Arc::new(config),
            clock,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Warrantree Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Expiring-soon window: {} days", config.expiry_window_days);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Repository::new(pool);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let purged = repo.purge_expired_sessions(clock.now()).await?;
    if purged > 0 {
        tracing::info!("Purged {} expired sessions", purged);
    }

    if config.seed_demo {
        let hash = auth::hash_password(db::DEMO_PASSWORD)?;
        if let Some(user) = db::seed_demo_data(&repo, &hash, clock.now().date_naive()).await? {
            tracing::info!("Demo account ready: {} ({})", user.email, user.id);
        }
    }

    let bind_addr = config.bind_addr;
    let state = AppState::new(repo, config, clock);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes that require a session
    let protected_routes = Router::new()
        // Auth
        .route("/auth/logout", post(api::logout))
        .route("/auth/validate", get(api::validate_token))
        .route("/auth/me", get(api::me))
        .route("/auth/profile", put(api::update_profile))
        .route("/auth/password", put(api::change_password))
        // Vaults
        .route("/vaults", get(api::list_vaults).post(api::create_vault))
        .route(
            "/vaults/{id}",
            get(api::get_vault)
                .put(api::update_vault)
                .delete(api::delete_vault),
        )
        .route("/vaults/{id}/members", post(api::add_member))
        .route("/vaults/{id}/members/{user_id}", delete(api::remove_member))
        // Items
        .route("/items", get(api::list_items).post(api::create_item))
        .route("/items/expiring", get(api::list_expiring_items))
        .route(
            "/items/{id}",
            get(api::get_item)
                .put(api::update_item)
                .delete(api::delete_item),
        )
        .route("/items/{id}/attachments", post(api::add_attachment))
        .route(
            "/items/{id}/attachments/{attachment_id}",
            delete(api::delete_attachment),
        )
        // Categories
        .route("/categories/with-items", get(api::list_categories_with_items))
        // Statistics
        .route("/stats", get(api::get_stats))
        .route("/dashboard", get(api::get_dashboard))
        .route("/revision", get(api::get_revision))
        // Apply session auth middleware
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session_auth_layer,
        ));

    // Routes available without a session
    let public_routes = Router::new()
        .route("/auth/register", post(api::register))
        .route("/auth/login", post(api::login))
        .route("/categories", get(api::list_categories));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", protected_routes.merge(public_routes))
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
