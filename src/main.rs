use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use washbook::config::AppConfig;
use washbook::db;
use washbook::handlers;
use washbook::services::catalog::{HttpCatalog, ServiceCatalog, StaticCatalog};
use washbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let catalog: Box<dyn ServiceCatalog> = if config.catalog_url.is_empty() {
        tracing::info!("using built-in service catalog");
        Box::new(StaticCatalog::with_defaults())
    } else {
        tracing::info!("using HTTP service catalog (url: {})", config.catalog_url);
        Box::new(HttpCatalog::new(config.catalog_url.clone()))
    };

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        catalog,
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::get_bookings),
        )
        .route(
            "/api/bookings/:id",
            patch(handlers::bookings::update_booking).delete(handlers::bookings::delete_booking),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/notifications",
            get(handlers::notifications::get_notifications)
                .post(handlers::notifications::create_notification)
                .delete(handlers::notifications::delete_all_notifications),
        )
        .route(
            "/api/notifications/read-all",
            post(handlers::notifications::mark_all_notifications_read),
        )
        .route(
            "/api/notifications/:id/read",
            post(handlers::notifications::mark_notification_read),
        )
        .route(
            "/api/notifications/:id",
            delete(handlers::notifications::delete_notification),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
