use std::path::Path;

use tokio::{fs, io::AsyncWriteExt};

use crate::error::{MirrorError, Result};

/// Creates `path` and any missing parents. Succeeds if the directory already
/// exists, including when another task creates it concurrently.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| MirrorError::filesystem(path, e))
}

/// Writes `content` to `path`, replacing anything already there, and syncs it to
/// disk before returning. The file handle is closed on every return path when it
/// goes out of scope.
pub async fn save_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| MirrorError::filesystem(path, e))?;

    file.write_all(content)
        .await
        .map_err(|e| MirrorError::filesystem(path, e))?;
    file.flush()
        .await
        .map_err(|e| MirrorError::filesystem(path, e))?;
    file.sync_all()
        .await
        .map_err(|e| MirrorError::filesystem(path, e))?;

    Ok(())
}
