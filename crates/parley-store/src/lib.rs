pub mod error;
pub mod messages;
pub mod users;

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::debug;

use crate::error::StoreError;

/// Load a JSON document from disk. A file that does not exist yet reads as
/// `default`; an unreadable or unparseable file is an error, never an empty
/// store.
async fn load_json<T, F>(path: &Path, default: F) -> Result<T, StoreError>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(default()),
        Err(e) => Err(e.into()),
    }
}

/// Replace `path` with the serialized document atomically: write a sibling
/// temp file, then rename it over the target. An interrupted write leaves
/// the previous snapshot intact.
async fn persist_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes).await?;
    fs::rename(&tmp, path).await?;
    debug!("Persisted {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
