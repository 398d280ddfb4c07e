use std::path::PathBuf;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use parley_types::models::{Message, UserRecord};

use crate::error::StoreError;

pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// File-backed global chat log, persisted as a JSON array in append order.
///
/// Same write discipline as the user store: mutations hold `write_lock`
/// across load+mutate+persist, reads go straight to the last snapshot.
pub struct MessageLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl MessageLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Append a message authored by `author`. The author's avatar is copied
    /// into the message and stays fixed even if the account changes later.
    /// Callers resolve the author record first, so an unknown identity never
    /// reaches this point.
    pub async fn append(&self, author: &UserRecord, content: &str) -> Result<Message, StoreError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(StoreError::Validation("message cannot be empty".into()));
        }

        let message = Message {
            id: Uuid::new_v4(),
            username: author.username.clone(),
            avatar: author.avatar.clone(),
            content: content.to_string(),
            timestamp: Utc::now(),
        };

        let _guard = self.write_lock.lock().await;
        let mut log = self.load().await?;
        log.push(message.clone());
        crate::persist_json(&self.path, &log).await?;

        Ok(message)
    }

    /// Tail-N retrieval: the last `limit` messages, still oldest-first.
    /// `None` means the default of 50; values outside `0..=len` clamp to
    /// the available range.
    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<Message>, StoreError> {
        let mut log = self.load().await?;
        let take = limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(0, log.len() as i64) as usize;
        Ok(log.split_off(log.len() - take))
    }

    /// Remove one message. Only its author may delete it; the entry is
    /// physically dropped from the log, no tombstone.
    pub async fn delete(&self, message_id: Uuid, acting_username: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut log = self.load().await?;

        let index = log
            .iter()
            .position(|m| m.id == message_id)
            .ok_or(StoreError::NotFound("message"))?;
        if log[index].username != acting_username {
            return Err(StoreError::Forbidden);
        }

        log.remove(index);
        crate::persist_json(&self.path, &log).await?;

        info!("Deleted message {} by {}", message_id, acting_username);
        Ok(())
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.load().await?.len())
    }

    async fn load(&self) -> Result<Vec<Message>, StoreError> {
        crate::load_json(&self.path, Vec::new).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn log() -> MessageLog {
        let dir = std::env::temp_dir().join(format!("parley_messages_test_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        MessageLog::new(dir.join("messages.json"))
    }

    fn author(username: &str) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "$argon2id$test".into(),
            created_at: Utc::now(),
            avatar: username[..1].to_uppercase(),
            token: None,
        }
    }

    #[tokio::test]
    async fn append_and_tail_listing() {
        let log = log();
        let alice = author("alice");

        for i in 0..5 {
            log.append(&alice, &format!("message {i}")).await.unwrap();
        }

        // Default limit returns everything when the log is small.
        let all = log.list(None).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].content, "message 0");
        assert_eq!(all[4].content, "message 4");

        // Tail of 2, oldest-first.
        let tail = log.list(Some(2)).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content, "message 3");
        assert_eq!(tail[1].content, "message 4");

        // Out-of-range limits clamp to the available range.
        assert_eq!(log.list(Some(100)).await.unwrap().len(), 5);
        assert!(log.list(Some(0)).await.unwrap().is_empty());
        assert!(log.list(Some(-3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn content_is_trimmed_and_must_be_nonempty() {
        let log = log();
        let alice = author("alice");

        let message = log.append(&alice, "  hello  ").await.unwrap();
        assert_eq!(message.content, "hello");
        assert_eq!(message.avatar, "A");

        assert!(matches!(
            log.append(&alice, "   ").await,
            Err(StoreError::Validation(_))
        ));
        assert_eq!(log.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_enforces_ownership() {
        let log = log();
        let alice = author("alice");
        let message = log.append(&alice, "hi").await.unwrap();

        // A different identity cannot delete it, and the log is unchanged.
        let denied = log.delete(message.id, "bob").await;
        assert!(matches!(denied, Err(StoreError::Forbidden)));
        assert_eq!(log.count().await.unwrap(), 1);

        // Unknown ids are not found.
        let missing = log.delete(Uuid::new_v4(), "alice").await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));

        // The author can, and exactly one entry disappears.
        log.delete(message.id, "alice").await.unwrap();
        assert_eq!(log.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let log = Arc::new(log());

        let mut handles = Vec::new();
        for i in 0..10 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                let user = author(&format!("user{i}"));
                log.append(&user, &format!("from user{i}")).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Every writer's full-file rewrite must have landed.
        let all = log.list(Some(100)).await.unwrap();
        assert_eq!(all.len(), 10);
        for i in 0..10 {
            assert!(all.iter().any(|m| m.content == format!("from user{i}")));
        }
    }

    #[tokio::test]
    async fn reload_sees_persisted_log() {
        let dir = std::env::temp_dir().join(format!("parley_messages_test_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("messages.json");

        {
            let log = MessageLog::new(path.clone());
            log.append(&author("alice"), "persisted").await.unwrap();
        }

        let log = MessageLog::new(path);
        let all = log.list(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].content, "persisted");
    }
}
