use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod matching;
mod models;
mod routes;
mod schema;
mod services;

use config::AppConfig;
use ember_shared::clients::db::{self, DbPool};
use ember_shared::clients::rabbitmq::RabbitMQClient;
use ember_shared::clients::user_service::UserServiceClient;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub users: UserServiceClient,
    pub metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ember_shared::middleware::init_tracing("ember-matching");
    let metrics_handle = ember_shared::middleware::init_metrics()?;

    let config = AppConfig::load()?;
    let port = config.port;

    // Database pool
    let db = db::create_pool(&config.database_url, config.db_pool_size)?;

    // Infrastructure clients
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let users = UserServiceClient::new(&config.user_service_url)?;

    let state = Arc::new(AppState {
        db,
        config,
        rabbitmq,
        users,
        metrics_handle,
    });

    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_profile_deleted(sub_state).await {
            tracing::error!(error = %e, "profile.deleted subscriber failed");
        }
    });

    let app = Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // Discovery and swiping
        .route("/discover", get(routes::discover::discover))
        .route("/swipes", post(routes::swipes::swipe))
        // Matches
        .route("/matches", get(routes::matches::list_matches))
        .route("/matches/:user_id", delete(routes::matches::unmatch))
        .route("/likes/received", get(routes::matches::likes_received))
        // Streaks
        .route("/streak", get(routes::streak::get_streak))
        .route("/streak/check-in", post(routes::streak::check_in))
        .layer(axum::middleware::from_fn(ember_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "ember-matching starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
