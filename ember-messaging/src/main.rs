use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use socketioxide::SocketIo;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod models;
mod routes;
mod rules;
mod schema;
mod services;
mod socket;

use config::AppConfig;
use ember_shared::clients::db::{self, DbPool};
use ember_shared::clients::rabbitmq::RabbitMQClient;
use ember_shared::clients::redis::RedisClient;
use ember_shared::clients::storage::StorageClient;
use ember_shared::clients::user_service::UserServiceClient;
use socket::presence::ConnectionRegistry;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub redis: RedisClient,
    pub storage: StorageClient,
    pub users: UserServiceClient,
    pub io: SocketIo,
    pub connections: ConnectionRegistry,
    pub metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ember_shared::middleware::init_tracing("ember-messaging");
    let metrics_handle = ember_shared::middleware::init_metrics()?;

    let config = AppConfig::load()?;
    let port = config.port;
    let upload_limit = config.max_media_bytes + 1024 * 1024;

    // Database pool
    let db = db::create_pool(&config.database_url, config.db_pool_size)?;

    // Infrastructure clients
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let redis = RedisClient::connect(&config.redis_url).await?;
    let users = UserServiceClient::new(&config.user_service_url)?;
    let storage = StorageClient::new(
        &config.storage_endpoint,
        &config.storage_access_key,
        &config.storage_secret_key,
        &config.storage_bucket,
        &config.storage_public_url,
    )
    .await;

    // REST handlers emit through `io`, so it lives in the state
    let (sio_layer, io) = SocketIo::builder().build_layer();

    let state = Arc::new(AppState {
        db,
        config,
        rabbitmq,
        redis,
        storage,
        users,
        io: io.clone(),
        connections: ConnectionRegistry::default(),
        metrics_handle,
    });

    io.ns("/", {
        let state = state.clone();
        move |socket: socketioxide::extract::SocketRef| {
            let state = state.clone();
            async move {
                socket::handlers::on_connect(socket, state).await;
            }
        }
    });

    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_match_created(sub_state).await {
            tracing::error!(error = %e, "match.created subscriber failed");
        }
    });

    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_match_ended(sub_state).await {
            tracing::error!(error = %e, "match.ended subscriber failed");
        }
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
        // Conversations
        .route("/conversations", get(routes::conversations::list_conversations))
        .route("/conversations/:id", get(routes::conversations::get_conversation))
        .route("/conversations/:id/read", post(routes::conversations::mark_as_read))
        .route("/unread-count", get(routes::conversations::get_unread_count))
        // Messages
        .route(
            "/conversations/:id/messages",
            get(routes::messages::list_messages).post(routes::messages::send_message),
        )
        .route(
            "/conversations/:id/media",
            post(routes::messages::send_media).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/messages/:id",
            patch(routes::messages::edit_message).delete(routes::messages::delete_message),
        )
        .route("/messages/:id/reactions", post(routes::messages::react))
        .layer(sio_layer)
        .layer(axum::middleware::from_fn(ember_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "ember-messaging starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
