//! HTTP surface over the stored test runs: trigger a run, list cases,
//! fetch logs, reset everything, download a CSV report. Thin wrappers
//! around the store, the runner and the reporter.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::json;
use tracing::{error, info, warn};

use crate::agent::E2eTestAgent;
use crate::llm::LanguageModel;
use crate::report;
use crate::runner;
use crate::store::TestStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TestStore>,
    pub agent: Arc<E2eTestAgent>,
    pub llm: Arc<dyn LanguageModel>,
    pub reports_dir: PathBuf,
}

/// Any handler failure maps to a 500 with a JSON detail, logged here.
struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        error!("request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/trigger-tests/{test_id}", get(trigger_tests))
        .route("/test-cases", get(get_test_cases))
        .route("/test-logs/{test_id}", get(get_test_logs))
        .route("/test-reset-all", get(reset_all_tests))
        .route("/download-test-report/{test_id}", get(download_test_report))
        .with_state(state)
}

/// Bind and serve until the process is torn down.
pub async fn serve(state: AppState, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP surface listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn trigger_tests(
    State(state): State<AppState>,
    Path(test_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Fail fast on unknown ids; the run itself is fire-and-forget.
    state.store.fetch_case(test_id)?;

    let store = state.store.clone();
    let agent = state.agent.clone();
    let reports_dir = state.reports_dir.clone();
    tokio::spawn(async move {
        if let Err(e) = runner::run_test(store, agent, reports_dir, test_id).await {
            error!("test run {test_id} failed: {e:#}");
        }
    });

    Ok(Json(json!({
        "message": format!("Test suite with test_id {test_id} initiated")
    })))
}

async fn get_test_cases(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cases = state.store.fetch_cases()?;
    Ok(Json(json!({ "data": cases })))
}

async fn get_test_logs(
    State(state): State<AppState>,
    Path(test_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let logs = state.store.fetch_logs(test_id)?;
    Ok(Json(json!({ "data": logs })))
}

async fn reset_all_tests(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.reset_all()?;
    clear_reports_dir(&state.reports_dir);
    Ok(Json(json!({ "message": "success" })))
}

async fn download_test_report(
    State(state): State<AppState>,
    Path(test_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let case = state.store.fetch_case(test_id)?;
    let path =
        report::generate_csv_report(state.llm.as_ref(), &state.reports_dir, &case.name).await?;
    let body = tokio::fs::read(&path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.csv\"", case.name),
            ),
        ],
        body,
    ))
}

/// Drop generated artifacts and reports. Best-effort: a file we cannot
/// remove is logged and skipped.
fn clear_reports_dir(reports_dir: &std::path::Path) {
    let entries = match std::fs::read_dir(reports_dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(e) = result {
            warn!("failed to delete {}: {e}", path.display());
        }
    }
}
