use crate::error::ApiError;
use axum::{
    extract::State,
    http::{header, Method},
    routing::{get, post},
    Json, Router,
};
use lectern_agent::RagSystem;
use lectern_core::SessionId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

/// Shared application state.
pub struct AppState {
    pub rag: Arc<RagSystem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoursesResponse {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// The HTTP gateway.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the API routes without a static frontend.
    pub fn build(rag: Arc<RagSystem>) -> Router {
        Self::build_with_frontend(rag, None)
    }

    /// Build the API routes; when `frontend_dir` is set, any other path is
    /// served from that directory.
    pub fn build_with_frontend(rag: Arc<RagSystem>, frontend_dir: Option<&Path>) -> Router {
        let state = Arc::new(AppState { rag });

        let app = Router::new()
            .route("/api/query", post(query_handler))
            .route("/api/courses", get(courses_handler))
            .route("/health", get(health_handler))
            .with_state(state);

        let app = match frontend_dir {
            Some(dir) => {
                info!(path = %dir.display(), "Serving static frontend");
                app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
            }
            None => app,
        };

        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        )
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "service": "lectern"}))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }
    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .map(SessionId::from);

    let outcome = state.rag.query(query, session_id).await?;
    Ok(Json(QueryResponse {
        answer: outcome.answer,
        sources: outcome.sources,
        session_id: outcome.session_id.to_string(),
    }))
}

async fn courses_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CoursesResponse>, ApiError> {
    let analytics = state.rag.course_analytics().await?;
    Ok(Json(CoursesResponse {
        total_courses: analytics.total_courses,
        course_titles: analytics.course_titles,
    }))
}
