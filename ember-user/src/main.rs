use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod models;
mod routes;
mod schema;
mod services;

use config::AppConfig;
use ember_shared::clients::db::{self, DbPool};
use ember_shared::clients::rabbitmq::RabbitMQClient;
use ember_shared::clients::redis::RedisClient;
use ember_shared::clients::storage::StorageClient;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub redis: RedisClient,
    pub storage: StorageClient,
    pub metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ember_shared::middleware::init_tracing("ember-user");
    let metrics_handle = ember_shared::middleware::init_metrics()?;

    let config = AppConfig::load()?;
    let port = config.port;

    let db = db::create_pool(&config.database_url, config.db_pool_size)?;
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let redis = RedisClient::connect(&config.redis_url).await?;
    let storage = StorageClient::new(
        &config.storage_endpoint,
        &config.storage_access_key,
        &config.storage_secret_key,
        &config.storage_bucket,
        &config.storage_public_url,
    )
    .await;

    // Multipart framing on top of the photo itself.
    let photo_body_limit = config.max_photo_bytes + 64 * 1024;

    let state = Arc::new(AppState { db, config, rabbitmq, redis, storage, metrics_handle });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route(
            "/me",
            get(routes::profile::get_profile)
                .patch(routes::profile::update_profile)
                .delete(routes::profile::delete_profile),
        )
        .route("/me/completeness", get(routes::profile::get_completeness))
        .route("/onboarding", post(routes::profile::complete_onboarding))
        .route("/location", put(routes::profile::update_location))
        .route("/profiles/:user_id", get(routes::profile::get_public_profile))
        .route(
            "/photos",
            post(routes::photo::upload_photo).layer(DefaultBodyLimit::max(photo_body_limit)),
        )
        .route("/photos/order", put(routes::photo::reorder_photos))
        .route("/photos/:index", delete(routes::photo::delete_photo))
        // Internal service-to-service endpoints (no auth)
        .route("/internal/profiles/batch", post(routes::internal::batch_profiles))
        .route("/internal/candidates", post(routes::internal::candidates))
        .route("/internal/premium", put(routes::internal::update_premium))
        .layer(axum::middleware::from_fn(ember_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "ember-user starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
