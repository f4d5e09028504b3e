use axum::{
    extract::{Path, State},
    Json,
};
use engine::RunOptions;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::AppState;
use crate::ApiError;

/// Optional trigger body.
#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    pub brand_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub status: &'static str,
    pub message: String,
    pub record_count: usize,
    pub output_file: String,
    pub webhook_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_filter: Option<String>,
}

pub async fn trigger(
    Path(name): Path<String>,
    State(state): State<AppState>,
    body: Option<Json<ExportRequest>>,
) -> Result<Json<ExportResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let profile = state.profiles.get(&name)?;
    info!("{} export triggered via HTTP", profile.name);

    let options = RunOptions {
        brand_filter: request.brand_name.filter(|b| !b.trim().is_empty()),
    };

    match state.orchestrator.run(profile, &state.config, &options).await {
        Ok(report) => Ok(Json(ExportResponse {
            status: "success",
            message: format!("{} export completed successfully", report.profile),
            record_count: report.outcome.record_count,
            output_file: report.outcome.file_path.display().to_string(),
            webhook_sent: report.outcome.webhook_succeeded,
            brand_filter: report.brand_filter,
        })),
        Err(e) => {
            error!("{} export failed: {}", profile.name, e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use db::mock::MockDriver;
    use db::{ResultSet, ScalarValue};
    use engine::{AppConfig, ExportOrchestrator, ExportProfile, ExportSink, ProfileRegistry, TransformSpec, WebhookPolicy};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{router, AppState};

    const QUERY: &str = "SELECT id, brand_name FROM customer_journey";

    fn app(driver: &MockDriver, dir: &std::path::Path) -> Router {
        let mut profiles = ProfileRegistry::empty();
        profiles
            .insert(ExportProfile {
                name: "birdeye".into(),
                query: QUERY.into(),
                params: Vec::new(),
                transform: TransformSpec::Passthrough,
                output_path: dir.join("birdeye_export.json"),
                webhook: WebhookPolicy::None,
                brand_column: Some("brand_name".into()),
            })
            .unwrap();
        let config = AppConfig::from_vars([
            ("DB_SERVER", "warehouse"),
            ("DB_DATABASE", "crm"),
            ("DB_USERNAME", "etl"),
            ("DB_PASSWORD", "hunter2"),
        ])
        .unwrap();
        let orchestrator = ExportOrchestrator::new(Arc::new(driver.clone()), ExportSink::new().unwrap());
        router(AppState::new(orchestrator, config, profiles))
    }

    fn rows() -> ResultSet {
        let mut rs = ResultSet::new(vec!["id".into(), "brand_name".into()]);
        for (id, brand) in [(1, "acme"), (2, "globex"), (3, "acme")] {
            rs.push_values(vec![ScalarValue::Int(id), brand.into()]).unwrap();
        }
        rs
    }

    fn post(uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method("POST").uri(uri);
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_service_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(&MockDriver::new(), dir.path())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "databridge-api");
        assert!(body["version"].is_string());
    }

    #[tokio::test]
    async fn export_without_body_runs_the_profile() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MockDriver::returning(QUERY, rows());
        let response = app(&driver, dir.path())
            .oneshot(post("/api/birdeye/export", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["record_count"], 3);
        assert_eq!(body["webhook_sent"], false);
        assert!(body.get("brand_filter").is_none());
        assert!(body["output_file"].as_str().unwrap().ends_with("birdeye_export.json"));
        assert_eq!(driver.close_count(), 1);
    }

    #[tokio::test]
    async fn brand_name_filters_and_is_echoed() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MockDriver::returning(QUERY, rows());
        let response = app(&driver, dir.path())
            .oneshot(post("/api/birdeye/export", Some(json!({ "brand_name": "acme" }))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["record_count"], 2);
        assert_eq!(body["brand_filter"], "acme");
    }

    #[tokio::test]
    async fn unknown_profile_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MockDriver::new();
        let response = app(&driver, dir.path())
            .oneshot(post("/api/podium/export", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["status"], "error");
        assert_eq!(driver.connect_count(), 0);
    }

    #[tokio::test]
    async fn failed_run_is_a_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MockDriver::refusing_connect("Access denied for user 'etl'");
        let response = app(&driver, dir.path())
            .oneshot(post("/api/birdeye/export", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
        assert!(!body["message"].as_str().unwrap().contains("hunter2"));
    }
}
