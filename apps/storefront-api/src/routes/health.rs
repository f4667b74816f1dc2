//! Health check for monitoring and load balancers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `OK` or `DEGRADED`
    pub status: &'static str,
    pub database: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations: Option<MigrationReport>,
    pub processor: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MigrationReport {
    pub applied: usize,
    pub total: usize,
}

/// `GET /health`. 503 when the database cannot run a query or the schema
/// is behind the embedded migrations.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    if !database {
        warn!("Health check: database unavailable");
    }

    let migrations = match state.db.migration_status().await {
        Ok((total, applied)) => Some(MigrationReport { applied, total }),
        Err(e) => {
            warn!(error = %e, "Health check: migration status unavailable");
            None
        }
    };
    let schema_current = migrations.is_some_and(|m| m.applied >= m.total);

    let (code, status) = if database && schema_current {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "DEGRADED")
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            migrations,
            processor: state.engine.processor_name(),
            timestamp: Utc::now(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get, json_body, send, test_app};

    #[tokio::test]
    async fn test_health_reports_database() {
        let app = test_app().await;

        let response = send(&app.router, get("/health", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "OK");
        assert_eq!(body["database"], true);
        assert_eq!(body["processor"], "memory");
        assert!(body["migrations"]["total"].as_u64().unwrap() >= 1);
        assert_eq!(body["migrations"]["applied"], body["migrations"]["total"]);

        app.db.close().await;
        let response = send(&app.router, get("/health", None)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["status"], "DEGRADED");
        assert!(body.get("migrations").is_none());
    }
}
