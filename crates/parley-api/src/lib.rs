pub mod auth;
pub mod error;
pub mod health;
pub mod identity;
pub mod llm;
pub mod messages;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::auth::AppState;

/// Assemble the `/api` route tree over the shared state.
///
/// Every route passes through the identity resolver, so handlers only have
/// to look at the attached [`identity::Identity`] extension. CORS and trace
/// layers are applied by the binary, which owns their configuration.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/user", get(auth::current_user))
        .route(
            "/api/chat/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/api/chat/messages/{message_id}", delete(messages::delete_message))
        .route("/api/health", get(health::health))
        .route("/api/llm/chat", post(llm::chat_completion))
        .route("/api/llm/models", get(llm::list_models))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity::resolve_identity,
        ))
        .with_state(state)
}
