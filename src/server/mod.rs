//! Local web server: upload documents and browse generated questions.
//!
//! ```text
//! GET  /health                 liveness
//! POST /upload                 multipart `file` → pipeline runs inline
//! GET  /questions/:upload_id   upload status + questions
//! GET  /uploads?limit=N        newest uploads first (default 50)
//! *                            static files, when a directory is configured
//! ```

pub mod error;
pub mod routes;

use crate::driver::Pipeline;
use crate::objects::ObjectStore;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

/// Bucket name used for uploads stored by the local server.
pub const LOCAL_BUCKET: &str = "uploads";

/// Largest accepted request body (25 MB).
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub objects: Arc<dyn ObjectStore>,
    pub bucket: String,
}

impl AppState {
    pub fn new(pipeline: Pipeline, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            pipeline,
            objects,
            bucket: LOCAL_BUCKET.to_string(),
        }
    }
}

/// Build the application router.
///
/// NOTE: Path params use `:param` syntax (axum 0.7).
pub fn router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/health", get(routes::health))
        .route("/upload", post(routes::upload))
        .route("/questions/:upload_id", get(routes::questions))
        .route("/uploads", get(routes::uploads))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive());

    match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    }
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Quizify server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuizConfig;
    use crate::generate::QuestionGenerator;
    use crate::objects::LocalObjectStore;
    use crate::pipeline::llm::UnconfiguredBackend;
    use crate::store::{MemoryStore, QuestionStore};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_state(dir: &std::path::Path) -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let generator = QuestionGenerator::new(
            Arc::new(UnconfiguredBackend::new("none", "no provider in tests")),
            QuizConfig::default(),
        );
        let pipeline = Pipeline::new(generator, store.clone());
        let objects = Arc::new(LocalObjectStore::new(dir));
        (AppState::new(pipeline, objects), store)
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(dir.path());
        let response = router(state, None)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn unknown_upload_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(dir.path());
        let response = router(state, None)
            .oneshot(Request::get("/questions/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn uploads_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let (state, store) = test_state(dir.path());
        for i in 0..3 {
            store.save_upload(&format!("u{i}"), "a.txt", None).unwrap();
        }
        let response = router(state, None)
            .oneshot(Request::get("/uploads?limit=2").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["count"], 2);
        assert_eq!(json["uploads"][0]["upload_id"], "u2");
    }

    #[tokio::test]
    async fn static_dir_is_served_as_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = dir.path().join("static");
        std::fs::create_dir_all(&static_dir).unwrap();
        std::fs::write(static_dir.join("index.html"), "<h1>quizify</h1>").unwrap();
        let (state, _) = test_state(dir.path());
        let response = router(state, Some(static_dir))
            .oneshot(Request::get("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
