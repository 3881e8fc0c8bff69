//! Route handlers

use super::error::ApiError;
use super::AppState;
use crate::session::DEFAULT_SESSION;
use crate::turn::{with_instruction, Turn, FAREWELL, HTTP_INSTRUCTION};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

/// Header that selects a conversation
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Include the retrieved sources in the response
    #[serde(default)]
    pub include_sources: bool,
}

#[derive(Debug, Serialize)]
pub struct SourceRef {
    pub file_path: String,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRef>>,
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

pub async fn chatbot(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> std::result::Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    let session_id = session_id(&headers, request.session_id.as_deref());

    match Turn::classify(&request.query) {
        Turn::End => {
            debug!(session = %session_id, "Ending conversation");
            state.sessions.end(&session_id).await;
            Ok(Json(ChatResponse {
                response: FAREWELL.to_string(),
                sources: None,
            }))
        }
        Turn::Ask(query) => {
            let history = state.sessions.get_or_create(&session_id).await;
            let mut history = history.lock().await;

            let message = with_instruction(&query, HTTP_INSTRUCTION);
            let reply = state
                .engine
                .chat(&mut history, &message)
                .await
                .map_err(|e| ApiError::from_chat_error(&e))?;

            info!(
                session = %session_id,
                sources = reply.sources.len(),
                "Answered query"
            );

            let sources = request.include_sources.then(|| {
                reply
                    .sources
                    .iter()
                    .map(|s| SourceRef {
                        file_path: s.node.doc_path.clone(),
                        score: s.score,
                    })
                    .collect()
            });

            Ok(Json(ChatResponse {
                response: reply.response,
                sources,
            }))
        }
    }
}

/// Header first, then body field, then the shared default session
fn session_id(headers: &HeaderMap, body: Option<&str>) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or(body.map(str::trim).filter(|s| !s.is_empty()))
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_id_precedence() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_id(&headers, None), "default");
        assert_eq!(session_id(&headers, Some("body")), "body");
        assert_eq!(session_id(&headers, Some("  ")), "default");

        headers.insert(SESSION_HEADER, HeaderValue::from_static("header"));
        assert_eq!(session_id(&headers, Some("body")), "header");
    }
}
