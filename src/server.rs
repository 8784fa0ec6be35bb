//! HTTP API for asking questions over the indexed documents.
//!
//! Each caller gets a conversation session; the ID is returned with every
//! answer and can be sent back to continue the conversation.

use crate::conversation::SessionStore;
use crate::error::{DocketError, Result};
use crate::export::{export_filename_now, render_export, ExportMessage};
use crate::rag::{RagEngine, RetrievedSource};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state.
pub struct AppState {
    pub engine: RagEngine,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(engine: RagEngine, sessions: SessionStore) -> Self {
        Self { engine, sessions }
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/ask", post(ask))
        .route("/api/clear", post(clear))
        .route("/api/end", post(end_session))
        .route("/api/export", post(export))
        .route("/api/sources", get(list_sources))
        .layer(cors)
        .with_state(state)
}

/// Bind `host:port` and serve until the process is stopped.
pub async fn serve(host: &str, port: u16, state: Arc<AppState>) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct AskResponse {
    response: String,
    sources: Vec<RetrievedSource>,
    session_id: String,
    timestamp: String,
}

#[derive(Deserialize)]
struct SessionRequest {
    session_id: String,
}

#[derive(Deserialize)]
struct ExportRequest {
    #[serde(default)]
    conversation: Vec<ExportMessage>,
}

#[derive(Serialize)]
struct SourceInfo {
    source: String,
    chunk_count: u32,
    indexed_at: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> Response {
    let question = req.question.trim();
    if question.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Question is required");
    }

    let (session_id, session) = state.sessions.get_or_create(req.session_id.as_deref()).await;
    let mut history = session.lock().await;
    let answer = state.engine.ask(&mut history, question).await;

    Json(AskResponse {
        response: answer.answer,
        sources: answer.sources,
        session_id,
        timestamp: chrono::Local::now().to_rfc3339(),
    })
    .into_response()
}

async fn clear(State(state): State<Arc<AppState>>, Json(req): Json<SessionRequest>) -> Response {
    match state.sessions.clear(&req.session_id).await {
        Ok(()) => Json(serde_json::json!({ "success": true })).into_response(),
        Err(e @ DocketError::SessionNotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn end_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Response {
    if state.sessions.remove(&req.session_id).await {
        Json(serde_json::json!({ "success": true })).into_response()
    } else {
        error_response(
            StatusCode::NOT_FOUND,
            DocketError::SessionNotFound(req.session_id).to_string(),
        )
    }
}

async fn export(Json(req): Json<ExportRequest>) -> Response {
    let body = render_export(&req.conversation);
    let disposition = format!("attachment; filename=\"{}\"", export_filename_now());

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

async fn list_sources(State(state): State<Arc<AppState>>) -> Response {
    match state.engine.vector_store().list_sources().await {
        Ok(sources) => Json(
            sources
                .into_iter()
                .map(|s| SourceInfo {
                    source: s.source,
                    chunk_count: s.chunk_count,
                    indexed_at: s.indexed_at.to_rfc3339(),
                })
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => {
            warn!("Failed to list sources: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::Embedder;
    use crate::generation::{Generator, TokenCounter};
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    /// Answers differently once the prompt carries conversation history.
    struct EchoGenerator;

    impl TokenCounter for EchoGenerator {}

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
            if prompt.contains("Previous Conversation:") {
                Ok("Follow-up answer.".to_string())
            } else {
                Ok("First answer.".to_string())
            }
        }
    }

    fn state() -> Arc<AppState> {
        let engine = RagEngine::new(
            Arc::new(FixedEmbedder),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(EchoGenerator),
        );
        Arc::new(AppState::new(engine, SessionStore::new(1000)))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn ask_request(question: &str, session_id: Option<&str>) -> Json<AskRequest> {
        Json(AskRequest {
            question: question.to_string(),
            session_id: session_id.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_ask_requires_question() {
        let response = ask(State(state()), ask_request("   ", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Question is required");
    }

    #[tokio::test]
    async fn test_sessions_keep_history() {
        let state = state();

        let first = body_json(ask(State(state.clone()), ask_request("What is a hive?", None)).await).await;
        assert_eq!(first["response"], "First answer.");
        let session_id = first["session_id"].as_str().unwrap().to_string();

        let second = body_json(
            ask(State(state.clone()), ask_request("And its path?", Some(&session_id))).await,
        )
        .await;
        assert_eq!(second["response"], "Follow-up answer.");
        assert_eq!(second["session_id"], session_id.as_str());

        let other = body_json(ask(State(state.clone()), ask_request("Unrelated?", None)).await).await;
        assert_eq!(other["response"], "First answer.");
        assert_ne!(other["session_id"], session_id.as_str());
    }

    #[tokio::test]
    async fn test_clear_session() {
        let state = state();
        let first = body_json(ask(State(state.clone()), ask_request("q1", Some("case-42"))).await).await;
        assert_eq!(first["session_id"], "case-42");

        let cleared = clear(
            State(state.clone()),
            Json(SessionRequest {
                session_id: "case-42".to_string(),
            }),
        )
        .await;
        assert_eq!(cleared.status(), StatusCode::OK);

        let after = body_json(ask(State(state.clone()), ask_request("q2", Some("case-42"))).await).await;
        assert_eq!(after["response"], "First answer.");

        let missing = clear(
            State(state),
            Json(SessionRequest {
                session_id: "nope".to_string(),
            }),
        )
        .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_end_session() {
        let state = state();
        let first = body_json(ask(State(state.clone()), ask_request("q1", Some("case-7"))).await).await;
        assert_eq!(first["session_id"], "case-7");
        assert_eq!(state.sessions.len().await, 1);

        let ended = end_session(
            State(state.clone()),
            Json(SessionRequest {
                session_id: "case-7".to_string(),
            }),
        )
        .await;
        assert_eq!(ended.status(), StatusCode::OK);
        assert!(state.sessions.is_empty().await);

        let again = end_session(
            State(state),
            Json(SessionRequest {
                session_id: "case-7".to_string(),
            }),
        )
        .await;
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_anonymous_asks_are_bounded() {
        let engine = RagEngine::new(
            Arc::new(FixedEmbedder),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(EchoGenerator),
        );
        let sessions = SessionStore::new(1000).with_limits(5, std::time::Duration::from_secs(3600));
        let state = Arc::new(AppState::new(engine, sessions));

        for i in 0..20 {
            let response = ask(State(state.clone()), ask_request(&format!("q{}", i), None)).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert_eq!(state.sessions.len().await, 5);
    }

    #[tokio::test]
    async fn test_export() {
        let response = export(Json(ExportRequest {
            conversation: vec![ExportMessage::new("user", "hello")],
        }))
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename=\"forensics_export_"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("USER: hello\nTimestamp: N/A\n"));
    }

    #[tokio::test]
    async fn test_list_sources_empty() {
        let response = list_sources(State(state())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }
}
