use crate::ServiceResult;
use paxalloc_engine::OperationalData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Write a snapshot next to `path` and rename it into place, so readers
/// never observe a half-written file.
pub async fn write_snapshot(path: &Path, snapshot: &OperationalData) -> ServiceResult<()> {
    let json = serde_json::to_vec_pretty(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Persist every published snapshot until the actor shuts down. Lagging
/// behind only skips intermediate snapshots; the next one is complete.
pub fn spawn_snapshot_writer(
    mut snapshots: broadcast::Receiver<Arc<OperationalData>>,
    path: PathBuf,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match snapshots.recv().await {
                Ok(snapshot) => {
                    if let Err(e) = write_snapshot(&path, &snapshot).await {
                        tracing::error!(path = %path.display(), "Failed to write snapshot: {}", e);
                    } else {
                        tracing::debug!(path = %path.display(), "Snapshot written");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Snapshot writer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
