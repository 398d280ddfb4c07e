use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};

use parley_store::messages::MessageLog;
use parley_store::users::UserStore;
use parley_types::api::{AuthResponse, LoginRequest, RegisterRequest, SessionClaims, StatusResponse};
use parley_types::models::UserRecord;

use crate::error::ApiError;
use crate::identity::{Identity, bearer_token};
use crate::llm::LlmProxy;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub users: UserStore,
    pub messages: MessageLog,
    pub session_secret: String,
    pub llm: LlmProxy,
}

/// Name of the cookie carrying the signed session claims.
pub const SESSION_COOKIE: &str = "parley_session";

/// Browser sessions stay valid for a week; the next login replaces the
/// cookie wholesale.
const SESSION_TTL_DAYS: i64 = 7;

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .users
        .register(&req.username, &req.password, &req.email)
        .await?;

    // A fresh account is logged in straight away: cookie session for the
    // browser, bearer token in the response body for everyone else.
    let jar = jar.add(session_cookie(&state.session_secret, &user)?);

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            message: "user registered successfully".into(),
            user: user.profile(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.login(&req.username, &req.password).await?;

    let jar = jar.add(session_cookie(&state.session_secret, &user)?);

    Ok((
        jar,
        Json(AuthResponse {
            message: "login successful".into(),
            user: user.profile(),
        }),
    ))
}

/// Revokes the presented bearer token (if any matches) and drops the session
/// cookie. Idempotent: stale tokens and anonymous callers get a 200 too.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = bearer_token(&headers) {
        state.users.logout(token).await?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());

    Ok((
        jar,
        Json(StatusResponse {
            message: "logged out".into(),
        }),
    ))
}

pub async fn current_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let username = identity.require()?;
    let user = state
        .users
        .find_by_username(username)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(user.profile()))
}

/// Build the signed session cookie for a freshly authenticated user.
fn session_cookie(secret: &str, user: &UserRecord) -> Result<Cookie<'static>, ApiError> {
    let claims = SessionClaims {
        sub: user.id,
        username: user.username.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_TTL_DAYS)).timestamp() as usize,
    };

    let value = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("session token encoding failed: {e}")))?;

    // No max-age: the embedded `exp` claim bounds the session's lifetime,
    // so an old cookie simply stops validating.
    Ok(Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build())
}
