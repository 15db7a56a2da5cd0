//! HTTP front end.
//!
//! `POST /api/analyze/` runs one analysis, `GET /api/health/` answers
//! monitors and `GET /api/` describes the API.

use crate::analyze::Analyzer;
use crate::github::{normalize_url, parse_repository_url};
use crate::llm::AnalysisResult;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const SERVICE_NAME: &str = "RepoRecon Backend";
const GENERIC_FAILURE: &str = "An unexpected error occurred during analysis";

pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    /// Upper bound on one analysis, retries included.
    pub request_timeout: Duration,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    github_url: Option<String>,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn success(data: AnalysisResult) -> Response {
    let body = AnalyzeResponse {
        success: true,
        data: Some(data),
        error: None,
    };
    (StatusCode::OK, Json(body)).into_response()
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body = AnalyzeResponse {
        success: false,
        data: None,
        error: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/", get(http_root))
        .route("/api/health/", get(http_health))
        .route("/api/analyze/", post(http_analyze))
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(bind: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("Serving RepoRecon API on http://{}/api/", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}

async fn http_analyze(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: AnalyzeRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => return failure(StatusCode::BAD_REQUEST, "Request body must be a JSON object"),
    };

    let raw_url = request.github_url.unwrap_or_default();
    let raw_url = raw_url.trim();
    if raw_url.is_empty() {
        log::warn!("Analysis request received without github_url");
        return failure(StatusCode::BAD_REQUEST, "github_url is required");
    }
    let url = normalize_url(raw_url);
    if parse_repository_url(&url).is_none() {
        log::warn!("Invalid GitHub URL provided: {}", url);
        return failure(
            StatusCode::BAD_REQUEST,
            "URL must be a valid GitHub repository URL",
        );
    }

    match tokio::time::timeout(state.request_timeout, state.analyzer.analyze(&url)).await {
        Ok(Ok(result)) => success(result),
        Ok(Err(err)) if err.is_client_error() => failure(StatusCode::BAD_REQUEST, err.to_string()),
        Ok(Err(err)) => {
            log::error!("Unexpected server error for {}: {}", url, err);
            failure(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
        }
        Err(_) => {
            log::error!(
                "Analysis of {} timed out after {}s",
                url,
                state.request_timeout.as_secs()
            );
            failure(StatusCode::GATEWAY_TIMEOUT, "Analysis timed out. Please try again later.")
        }
    }
}

async fn http_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
    }))
}

async fn http_root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to RepoRecon API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/api/health/",
            "analyze": "/api/analyze/ (POST)",
        },
        "documentation": {
            "analyze_description": "Architectural analysis of a GitHub repository from its README, using Gemini",
            "analyze_body": {"github_url": "https://github.com/owner/repo"},
            "analyze_response": {
                "success": true,
                "data": {
                    "summary": "Architecture summary",
                    "mermaid_code": "sequenceDiagram...",
                    "detected_issues": ["issue1", "issue2"],
                    "fix_recommendations": ["recommendation1"],
                },
            },
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalysisError, BackendError};
    use crate::github::ReadmeSource;
    use crate::llm::{GenerationRequest, LlmBackend, LlmResponse, ModelHandle};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    enum Readme {
        Text(&'static str),
        Missing,
        Hang,
    }

    #[async_trait]
    impl ReadmeSource for Readme {
        async fn fetch_readme(&self, url: &str) -> crate::error::Result<String> {
            match self {
                Readme::Text(text) => Ok(text.to_string()),
                Readme::Missing => Err(AnalysisError::Fetch(format!(
                    "Could not fetch README from {url}."
                ))),
                Readme::Hang => std::future::pending().await,
            }
        }
    }

    struct Model(std::result::Result<&'static str, BackendError>);

    #[async_trait]
    impl LlmBackend for Model {
        async fn list_models(&self) -> std::result::Result<Vec<String>, BackendError> {
            Ok(Vec::new())
        }

        async fn construct(&self, id: &str) -> std::result::Result<ModelHandle, BackendError> {
            Ok(ModelHandle::new(id))
        }

        async fn generate(
            &self,
            _model: &ModelHandle,
            _request: &GenerationRequest,
        ) -> std::result::Result<LlmResponse, BackendError> {
            self.0.clone().map(|content| LlmResponse {
                content: content.to_string(),
                usage: None,
            })
        }
    }

    fn app(readme: Readme, model: Model) -> Router {
        let analyzer = Analyzer::new(Arc::new(model), Arc::new(readme));
        router(Arc::new(AppState {
            analyzer: Arc::new(analyzer),
            request_timeout: Duration::from_secs(5),
        }))
    }

    fn ok_model() -> Model {
        Model(Ok(r#"{"summary": "Small app.", "mermaid_code": "sequenceDiagram\n    A->>B: hi", "detected_issues": [], "fix_recommendations": ["Add docs"]}"#))
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn analyze_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/analyze/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/api/health/").body(Body::empty()).unwrap();
        let (status, body) = call(app(Readme::Text("# A"), ok_model()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "service": "RepoRecon Backend"}));
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let request = Request::builder().uri("/api/").body(Body::empty()).unwrap();
        let (status, body) = call(app(Readme::Text("# A"), ok_model()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["endpoints"]["analyze"], "/api/analyze/ (POST)");
    }

    #[tokio::test]
    async fn test_analyze_success_adds_missing_scheme() {
        let (status, body) = call(
            app(Readme::Text("# A\n\nAn app."), ok_model()),
            analyze_request(r#"{"github_url": "github.com/acme/app"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["summary"], "Small app.");
        assert_eq!(body["data"]["fix_recommendations"], json!(["Add docs"]));
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_analyze_requires_url() {
        for payload in [r#"{}"#, r#"{"github_url": "   "}"#] {
            let (status, body) = call(
                app(Readme::Text("# A"), ok_model()),
                analyze_request(payload),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({"success": false, "error": "github_url is required"}));
        }
    }

    #[tokio::test]
    async fn test_analyze_rejects_non_github_url() {
        let (status, body) = call(
            app(Readme::Text("# A"), ok_model()),
            analyze_request(r#"{"github_url": "https://gitlab.com/a/b"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "URL must be a valid GitHub repository URL");
    }

    #[tokio::test]
    async fn test_analyze_rejects_malformed_body() {
        let (status, body) = call(app(Readme::Text("# A"), ok_model()), analyze_request("github_url=x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_classified_errors_are_400_with_message() {
        let (status, body) = call(
            app(Readme::Missing, ok_model()),
            analyze_request(r#"{"github_url": "https://github.com/acme/gone"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Could not fetch README"));
    }

    #[tokio::test]
    async fn test_backend_errors_are_500_and_generic() {
        let model = Model(Err(BackendError::new(Some(500), "internal detail with key=abc")));
        let (status, body) = call(
            app(Readme::Text("# A"), model),
            analyze_request(r#"{"github_url": "https://github.com/acme/app"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], GENERIC_FAILURE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_analysis_times_out() {
        let (status, body) = call(
            app(Readme::Hang, ok_model()),
            analyze_request(r#"{"github_url": "https://github.com/acme/slow"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["success"], false);
    }
}
