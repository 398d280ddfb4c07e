use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One account in the user directory, as persisted in `users.json`.
/// `password_hash` is the PHC string produced by Argon2id and never leaves
/// the server; API responses carry a [`UserProfile`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    /// Uppercased first character of the username, fixed at creation.
    pub avatar: String,
    /// Current bearer token. Rotated on every login, cleared on logout, so
    /// at most one token is live per user.
    pub token: Option<String>,
}

impl UserRecord {
    /// The public view of this account: everything except the password hash.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
            token: self.token.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub token: Option<String>,
}

/// One entry in the global chat log, as persisted in `messages.json`.
/// The avatar is a snapshot taken at send time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub username: String,
    pub avatar: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}
