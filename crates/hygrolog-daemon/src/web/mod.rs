//! Web UI module.

use askama::Template;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Local;
use hygrolog_core::LogEntry;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

/// One row of the history table.
struct HistoryRow {
    time: String,
    temperature: String,
    humidity: String,
}

impl From<&LogEntry> for HistoryRow {
    fn from(entry: &LogEntry) -> Self {
        Self {
            time: entry
                .timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            temperature: format!("{:.1}", entry.temperature),
            humidity: format!("{:.1}", entry.humidity),
        }
    }
}

/// Main index page template.
#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    /// Rendered current reading, or `None` before the first sample
    current: Option<String>,
    updated: String,
    window_hours: u64,
    history: Vec<HistoryRow>,
}

/// Creates the web router with all routes.
pub fn create_router(state: Arc<AppState>, public_dir: &Path) -> Router {
    Router::new()
        // Main page
        .route("/", get(index))
        // Current reading as plain text
        .route("/raw.txt", get(raw_txt))
        // History window as JSON
        .route("/history.json", get(history_json))
        // Static assets
        .nest_service("/public", ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

/// GET / - Current reading and recent history, newest first
async fn index(State(state): State<Arc<AppState>>) -> Response {
    let history = load_history(&state).await;
    let (reading, updated_at) = (state.latest(), state.last_updated());

    let template = IndexTemplate {
        current: updated_at.map(|_| reading.to_string()),
        updated: updated_at
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string()),
        window_hours: state.history_window().as_secs() / 3600,
        history: history.iter().rev().map(HistoryRow::from).collect(),
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render page: {}", e),
        )
            .into_response(),
    }
}

/// GET /raw.txt - Current reading as text
async fn raw_txt(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain")],
        state.latest().to_string(),
    )
}

/// GET /history.json - History window, oldest first
async fn history_json(State(state): State<Arc<AppState>>) -> Response {
    match state.recent_history(state.history_window()).await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to read history: {}", e),
        )
            .into_response(),
    }
}

/// Reads the history window, treating a read failure as an empty history.
async fn load_history(state: &AppState) -> Vec<LogEntry> {
    match state.recent_history(state.history_window()).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to load history: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::state_with_sensor;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use hygrolog_core::Reading;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_raw_txt() {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(state_with_sensor(&dir, "echo 21.5,48.2"));

        let (status, body) = get(create_router(state.clone(), dir.path()), "/raw.txt").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "T = 0*C, H = 0%");

        state.poll_once().await.unwrap();
        let (_, body) = get(create_router(state, dir.path()), "/raw.txt").await;
        assert_eq!(body, "T = 21.5*C, H = 48.2%");
    }

    #[tokio::test]
    async fn test_index_without_data() {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(state_with_sensor(&dir, "echo 21.5,48.2"));

        let (status, body) = get(create_router(state, dir.path()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No data yet"));
    }

    #[tokio::test]
    async fn test_index_shows_sub_zero_reading() {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(state_with_sensor(&dir, "echo -3,97"));
        state.poll_once().await.unwrap();

        let (status, body) = get(create_router(state, dir.path()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("T = -3*C, H = 97%"));
        assert!(!body.contains("No data yet"));
    }

    #[tokio::test]
    async fn test_index_newest_first() {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(state_with_sensor(&dir, "echo 21.5,48.2"));
        state.poll_once().await.unwrap();

        let log = hygrolog_core::HistoryLog::new(dir.path().join("temperature.log"));
        let now = Utc::now();
        log.append(&LogEntry::new(now - Duration::hours(2), Reading::new(19.2, 40.0)))
            .await
            .unwrap();
        log.append(&LogEntry::new(now - Duration::hours(1), Reading::new(23.7, 45.0)))
            .await
            .unwrap();

        let (_, body) = get(create_router(state, dir.path()), "/").await;
        assert!(body.contains("T = 21.5*C, H = 48.2%"));
        let newer = body.find("23.7").unwrap();
        let older = body.find("19.2").unwrap();
        assert!(newer < older);
    }

    #[tokio::test]
    async fn test_history_json() {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(state_with_sensor(&dir, "echo 21.5,48.2"));
        state.poll_once().await.unwrap();
        state.flush_once().await;

        let (status, body) = get(create_router(state, dir.path()), "/history.json").await;
        assert_eq!(status, StatusCode::OK);
        let entries: Vec<LogEntry> = serde_json::from_str(&body).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reading(), Reading::new(21.5, 48.2));
    }

    #[tokio::test]
    async fn test_public_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("style.css"), "body {}").unwrap();
        let state = Arc::new(state_with_sensor(&dir, "echo 21.5,48.2"));

        let (status, body) = get(create_router(state, dir.path()), "/public/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body {}");
    }
}
