use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};

use parley_types::api::SessionClaims;

use crate::auth::{AppState, SESSION_COOKIE};
use crate::error::ApiError;

/// The acting identity of a request, attached as an extension by
/// [`resolve_identity`]. `None` means anonymous.
#[derive(Debug, Clone, Default)]
pub struct Identity(pub Option<String>);

impl Identity {
    pub fn require(&self) -> Result<&str, ApiError> {
        self.0.as_deref().ok_or(ApiError::Unauthenticated)
    }
}

/// Resolve the acting identity of a request. Strategies run in order: a
/// valid session cookie wins, otherwise a bearer token is matched against
/// the user directory. Pure read; no store state changes here.
pub async fn resolve_identity(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = match session_identity(&jar, &state.session_secret) {
        Some(username) => Some(username),
        None => token_identity(req.headers(), &state).await?,
    };

    req.extensions_mut().insert(Identity(identity));
    Ok(next.run(req).await)
}

/// Strategy 1: the signed session cookie issued at register/login. An
/// expired or tampered cookie is treated as absent.
pub fn session_identity(jar: &CookieJar, secret: &str) -> Option<String> {
    let cookie = jar.get(SESSION_COOKIE)?;
    let data = decode::<SessionClaims>(
        cookie.value(),
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    Some(data.claims.username)
}

/// Strategy 2: `Authorization: Bearer <token>`, exact-matched against the
/// full current token of each user record.
pub async fn token_identity(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Option<String>, ApiError> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };
    Ok(state
        .users
        .find_by_token(token)
        .await?
        .map(|user| user.username))
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
