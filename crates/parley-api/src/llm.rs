use std::time::Duration;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use crate::auth::AppState;
use crate::error::ApiError;

/// Stateless pass-through to a locally running inference service.
///
/// Holds no retry logic and no state of its own: each call forwards the
/// payload verbatim and relays the answer. Connection-refused, timeout, and
/// other transport failures surface as distinct errors so an operator can
/// tell "not running" from "stuck" from "broken".
pub struct LlmProxy {
    client: Client,
    base_url: String,
    chat_timeout: Duration,
    models_timeout: Duration,
}

impl LlmProxy {
    pub fn new(base_url: String, chat_timeout: Duration, models_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_timeout,
            models_timeout,
        }
    }

    /// Forward a chat-completion payload. Completions can legitimately take
    /// minutes on slow hardware, hence the long per-call timeout.
    pub async fn chat(&self, payload: Value) -> Result<Value, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(self.chat_timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        relay(response).await
    }

    /// List the models the backend has available. Listing is cheap, so a
    /// stalled backend is reported after a short wait.
    pub async fn models(&self) -> Result<Value, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.models_timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        relay(response).await
    }

    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::UpstreamTimeout
        } else if e.is_connect() {
            ApiError::UpstreamUnavailable(format!(
                "language model backend is not running; start the inference service at {} and try again",
                self.base_url
            ))
        } else {
            ApiError::Upstream(
                StatusCode::BAD_GATEWAY,
                format!("language model request failed: {e}"),
            )
        }
    }
}

/// Relay the backend's answer: 2xx bodies pass through as JSON, anything
/// else keeps its status with the backend's text wrapped in our error shape.
async fn relay(response: reqwest::Response) -> Result<Value, ApiError> {
    let status = response.status();

    if status.is_success() {
        response.json().await.map_err(|e| {
            ApiError::Upstream(
                StatusCode::BAD_GATEWAY,
                format!("language model backend returned an unreadable response: {e}"),
            )
        })
    } else {
        let body = response.text().await.unwrap_or_default();
        warn!("LLM backend answered {}: {}", status, body);
        Err(ApiError::Upstream(
            StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            format!("language model backend error: {body}"),
        ))
    }
}

pub async fn chat_completion(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.llm.chat(payload).await?))
}

pub async fn list_models(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.llm.models().await?))
}
