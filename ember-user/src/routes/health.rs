use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use ember_shared::clients::db;
use ember_shared::types::api::{HealthCheck, HealthResponse};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let checks = vec![
        HealthCheck::from_result("database", db::ping(&state.db)),
        HealthCheck::from_result("redis", state.redis.ping().await),
    ];
    Json(HealthResponse::healthy("ember-user", env!("CARGO_PKG_VERSION")).with_checks(checks))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics_handle.render()
}
