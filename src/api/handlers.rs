use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::core::metrics;
use crate::core::redis::RedisHealth;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::{HealthResponse, RootResponse};

const SERVICE_NAME: &str = "examhall-api";

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let api = state.settings().api();
    Json(RootResponse {
        message: api.project_name.clone(),
        version: api.version.clone(),
        docs_url: format!("{}/docs", api.api_v1_str),
    })
}

/// Redis only backs login throttling, so losing it degrades the service but
/// does not take it down. A broken database does.
pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut components = HashMap::new();
    let mut status = "healthy";

    let redis_status = match state.redis().health().await {
        RedisHealth::Healthy => "healthy".to_string(),
        RedisHealth::Disconnected => {
            status = "degraded";
            "disconnected".to_string()
        }
        RedisHealth::Unhealthy(error) => {
            status = "degraded";
            format!("unhealthy: {error}")
        }
    };
    components.insert("redis".to_string(), redis_status);

    let schema_version = match repositories::health::schema_version(state.db()).await {
        Ok(version) => {
            components.insert("database".to_string(), "healthy".to_string());
            version
        }
        Err(err) => {
            tracing::warn!(error = %err, "Database health check failed");
            components.insert("database".to_string(), format!("unhealthy: {err}"));
            status = "unhealthy";
            None
        }
    };

    Json(HealthResponse {
        service: SERVICE_NAME.to_string(),
        status: status.to_string(),
        schema_version,
        components,
    })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
