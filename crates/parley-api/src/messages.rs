use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use parley_types::api::{SendMessageRequest, StatusResponse};
use parley_types::models::Message;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::identity::Identity;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub limit: Option<i64>,
}

/// Public tail-N listing; anonymous readers poll this.
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(state.messages.list(query.limit).await?))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = identity.require()?;

    // The author record supplies the avatar snapshot; a token whose account
    // vanished is a 404, not an anonymous write.
    let author = state
        .users
        .find_by_username(username)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let message = state.messages.append(&author, &req.content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let username = identity.require()?;

    // Ids are uuids; anything else can't name a stored message.
    let message_id =
        Uuid::parse_str(&message_id).map_err(|_| ApiError::NotFound("message"))?;

    state.messages.delete(message_id, username).await?;

    Ok(Json(StatusResponse {
        message: "message deleted".into(),
    }))
}
