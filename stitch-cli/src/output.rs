use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::Result;

/// Writes `bytes` to `<dir>/<file_name>` through a `.part` file renamed on success.
pub async fn write_media(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let target = dir.join(file_name);
    let partial = dir.join(format!("{file_name}.part"));

    let written = async {
        let mut file = fs::File::create(&partial).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        fs::rename(&partial, &target).await
    }
    .await;

    if let Err(err) = written {
        // Best effort cleanup.
        let _ = fs::remove_file(&partial).await;
        return Err(err.into());
    }

    debug!(path = %target.display(), bytes = bytes.len(), "Output written");
    Ok(target)
}
