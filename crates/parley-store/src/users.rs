use std::collections::BTreeMap;
use std::path::PathBuf;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use parley_types::models::UserRecord;

use crate::error::StoreError;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

/// The on-disk document: username -> record, rewritten in full on every
/// mutation. BTreeMap keeps the serialized document stable across rewrites.
type UserMap = BTreeMap<String, UserRecord>;

/// File-backed user directory.
///
/// Every mutation holds `write_lock` across its whole load+mutate+persist
/// cycle so two concurrent writers cannot drop each other's full-document
/// rewrite. Lookups read the last persisted snapshot without the lock.
pub struct UserStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl UserStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Create an account. Fields are trimmed first; empty fields, a short
    /// username or password, and a taken username (exact, case-sensitive
    /// match) are all rejected. The new record carries a fresh bearer token.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<UserRecord, StoreError> {
        let username = username.trim();
        let password = password.trim();
        let email = email.trim();

        if username.is_empty() || password.is_empty() || email.is_empty() {
            return Err(StoreError::Validation("all fields are required".into()));
        }
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(StoreError::Validation(format!(
                "username must be at least {MIN_USERNAME_LEN} characters"
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(StoreError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;

        if users.contains_key(username) {
            return Err(StoreError::DuplicateUser);
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
            avatar: avatar_for(username),
            token: Some(generate_token()),
        };

        users.insert(username.to_string(), record.clone());
        crate::persist_json(&self.path, &users).await?;

        info!("Registered user {}", username);
        Ok(record)
    }

    /// Verify the password and rotate the bearer token. The previous token
    /// stops resolving as soon as the rewrite lands.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserRecord, StoreError> {
        let username = username.trim();
        let password = password.trim();

        if username.is_empty() || password.is_empty() {
            return Err(StoreError::Validation(
                "username and password are required".into(),
            ));
        }

        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;

        let record = users
            .get_mut(username)
            .ok_or(StoreError::InvalidCredentials)?;
        if !verify_password(&record.password_hash, password)? {
            return Err(StoreError::InvalidCredentials);
        }

        record.token = Some(generate_token());
        let record = record.clone();
        crate::persist_json(&self.path, &users).await?;

        info!("User {} logged in", username);
        Ok(record)
    }

    /// Clear whichever record currently holds `token`. An unknown or stale
    /// token is a no-op; logout never fails.
    pub async fn logout(&self, token: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut users = self.load().await?;

        let mut cleared = false;
        for record in users.values_mut() {
            if record.token.as_deref() == Some(token) {
                record.token = None;
                cleared = true;
            }
        }

        if cleared {
            crate::persist_json(&self.path, &users).await?;
        }
        Ok(())
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.load().await?.remove(username))
    }

    /// Exact match against each record's current token.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .load()
            .await?
            .into_values()
            .find(|u| u.token.as_deref() == Some(token)))
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.load().await?.len())
    }

    async fn load(&self) -> Result<UserMap, StoreError> {
        crate::load_json(&self.path, UserMap::new).await
    }
}

fn generate_token() -> String {
    Uuid::new_v4().to_string()
}

/// Uppercased first character of the username.
fn avatar_for(username: &str) -> String {
    username
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_default()
}

fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::PasswordHash(e.to_string()))
}

/// Distinguishes a mismatch (Ok(false)) from a hash that cannot be parsed
/// or verified at all (Err). Any PHC-encoded hash already on disk keeps
/// verifying even if the default parameters change later.
fn verify_password(phc: &str, password: &str) -> Result<bool, StoreError> {
    let parsed = PasswordHash::new(phc).map_err(|e| StoreError::PasswordHash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(StoreError::PasswordHash(e.to_string())),
    }
}
