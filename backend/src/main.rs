use axum::{http::Method, routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod database;
mod error;
mod handlers;
mod jobs;
mod services;

pub use error::{ApiError, ApiResult, AppError};

#[cfg(test)]
mod tests;

pub struct AppState {
    pub db_pool: sqlx::PgPool,
    pub config: config::Config,
    pub mailer: Arc<dyn services::ReminderMailer>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "LedgerDesk CRM API v0.1.0" }))
        .route("/health", get(handlers::health_check))
        .nest("/api/cron", handlers::cron_routes())
        .nest("/api/v1/customers", handlers::customer_routes())
        .nest("/api/v1/projects", handlers::project_routes())
        .nest("/api/v1/invoices", handlers::invoice_routes())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env()?;
    let db_pool = database::create_pool(&config.database_url).await?;

    database::migrate(&db_pool).await?;

    if !config.smtp.is_configured() {
        tracing::warn!("SMTP is not fully configured; reminder emails will fail to send");
    }

    let email_service = services::EmailService::new(&config.smtp, &config.app_base_url).await?;
    let server_addr = config.server_addr.clone();
    let state = Arc::new(AppState {
        db_pool,
        config,
        mailer: Arc::new(email_service),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any);

    let app = build_router(state).layer(ServiceBuilder::new().layer(cors));

    let listener = tokio::net::TcpListener::bind(&server_addr).await?;
    tracing::info!("Server running on {}", server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
