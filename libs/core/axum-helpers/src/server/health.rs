//! Liveness (`/health`) and readiness reporting.
//!
//! Liveness only says the process is serving. Readiness runs one check per
//! downstream dependency, each bounded by [`CHECK_TIMEOUT`], and answers 503
//! when any of them is down.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use core_config::AppInfo;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::warn;

/// Upper bound for a single readiness check.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

/// A boxed future for health checks with a string error
pub type HealthCheckFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize)]
pub struct DependencyCheck {
    pub status: DependencyStatus,
    #[serde(rename = "latencyMs")]
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `/ready`: `{"status": "ready" | "not ready", "checks": {name: ...}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    pub status: &'static str,
    pub checks: BTreeMap<String, DependencyCheck>,
}

impl ReadinessReport {
    pub fn is_ready(&self) -> bool {
        self.checks
            .values()
            .all(|c| c.status == DependencyStatus::Up)
    }
}

impl IntoResponse for ReadinessReport {
    fn into_response(self) -> Response {
        let status = if self.is_ready() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (status, Json(self)).into_response()
    }
}

async fn timed(name: &str, check: HealthCheckFuture<'_>, limit: Duration) -> DependencyCheck {
    let started = Instant::now();
    let result = match tokio::time::timeout(limit, check).await {
        Ok(result) => result,
        Err(_) => Err(format!("timed out after {}ms", limit.as_millis())),
    };
    let latency_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(()) => DependencyCheck {
            status: DependencyStatus::Up,
            latency_ms,
            error: None,
        },
        Err(e) => {
            warn!(check = name, error = %e, latency_ms, "Readiness check failed");
            DependencyCheck {
                status: DependencyStatus::Down,
                latency_ms,
                error: Some(e),
            }
        }
    }
}

/// Run the named checks concurrently and collect them into one report.
///
/// ```ignore
/// let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![(
///     "database",
///     Box::pin(async { check_health(&db).await.map_err(|e| e.to_string()) }),
/// )];
/// run_health_checks(checks).await
/// ```
pub async fn run_health_checks(checks: Vec<(&str, HealthCheckFuture<'_>)>) -> ReadinessReport {
    run_health_checks_within(checks, CHECK_TIMEOUT).await
}

/// [`run_health_checks`] with a custom per-check limit.
pub async fn run_health_checks_within(
    checks: Vec<(&str, HealthCheckFuture<'_>)>,
    limit: Duration,
) -> ReadinessReport {
    let results = join_all(checks.into_iter().map(|(name, check)| async move {
        (name.to_string(), timed(name, check, limit).await)
    }))
    .await;

    let checks: BTreeMap<_, _> = results.into_iter().collect();
    let ready = checks.values().all(|c| c.status == DependencyStatus::Up);
    ReadinessReport {
        status: if ready { "ready" } else { "not ready" },
        checks,
    }
}

pub async fn health_handler(State(app): State<AppInfo>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        name: app.name,
        version: app.version,
    })
}

/// `GET /health` reporting the service name and version.
pub fn health_router(app_info: AppInfo) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(app_info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_app_info() {
        let app = health_router(AppInfo {
            name: "notification-service",
            version: "0.1.0",
        });

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["name"], "notification-service");
    }

    #[tokio::test]
    async fn test_all_checks_up_is_ready() {
        let checks: Vec<(&str, HealthCheckFuture<'_>)> =
            vec![("database", Box::pin(async { Ok(()) }))];

        let report = run_health_checks(checks).await;
        assert!(report.is_ready());
        assert_eq!(report.status, "ready");
        assert_eq!(report.checks["database"].status, DependencyStatus::Up);
        assert_eq!(report.into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_failed_check_is_reported_with_its_error() {
        let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![
            ("database", Box::pin(async { Ok(()) })),
            ("kafka", Box::pin(async { Err("broker down".to_string()) })),
        ];

        let report = run_health_checks(checks).await;
        assert!(!report.is_ready());
        assert_eq!(report.status, "not ready");
        assert_eq!(report.checks["kafka"].error.as_deref(), Some("broker down"));

        let response = report.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["checks"]["kafka"]["status"], "down");
        assert_eq!(body["checks"]["database"]["status"], "up");
        assert!(body["checks"]["database"].get("error").is_none());
    }

    #[tokio::test]
    async fn test_hanging_check_times_out() {
        let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![(
            "database",
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }),
        )];

        let report = run_health_checks_within(checks, Duration::from_millis(20)).await;
        let check = &report.checks["database"];
        assert_eq!(check.status, DependencyStatus::Down);
        assert!(check.error.as_deref().unwrap().contains("timed out"));
    }
}
