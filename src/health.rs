// Liveness endpoint with a storage round trip

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::Probe;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DatabaseStatus {
    pub connected: bool,
    #[schema(example = "Database is connected")]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    /// RFC 3339
    pub timestamp: String,
    pub database: DatabaseStatus,
}

/// Handler for GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service and database are up", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(
    State(probe): State<Arc<dyn Probe>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (status, database) = match probe.ping().await {
        Ok(()) => (
            StatusCode::OK,
            DatabaseStatus {
                connected: true,
                message: "Database is connected".to_string(),
            },
        ),
        Err(e) => {
            tracing::error!("Health check failed: {:?}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                DatabaseStatus {
                    connected: false,
                    message: "Database connection failed".to_string(),
                },
            )
        }
    };

    let body = HealthResponse {
        status: if status == StatusCode::OK { "ok" } else { "error" }.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        database,
    };
    (status, Json(body))
}
