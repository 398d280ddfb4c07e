use axum::{Json, extract::State};
use chrono::Utc;

use parley_types::api::HealthResponse;

use crate::auth::AppState;
use crate::error::ApiError;

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "online",
        timestamp: Utc::now(),
        users_count: state.users.count().await?,
        messages_count: state.messages.count().await?,
    }))
}
