//! Temp File Cleanup Task
//!
//! Removes regular files older than a maximum age from one directory.

use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::{bail, Context};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::scheduler::TaskScope;

/// Registered name of the temp cleanup task.
pub const TEMP_CLEANUP_TASK: &str = "temp-file-cleanup";

/// Removes files in `dir` whose modification time is at least `max_age` ago.
///
/// Subdirectories are left alone and a missing directory counts as clean.
/// Keeps going past files that cannot be removed and fails afterwards with a
/// summary. Stops early, with an error, once `scope` is cancelled.
///
/// # Returns
/// The number of files removed.
pub async fn cleanup_stale_files(
    dir: &Path,
    max_age: Duration,
    scope: &TaskScope,
) -> anyhow::Result<usize> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Temp directory missing, nothing to clean");
            return Ok(0);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", dir.display()));
        }
    };

    let now = SystemTime::now();
    let mut removed = 0usize;
    let mut failures = Vec::new();

    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("failed to list {}", dir.display()))?
    {
        if scope.is_cancelled() {
            bail!("cancelled after removing {removed} stale files");
        }

        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(err) => {
                failures.push(format!("{}: {err}", path.display()));
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or(Duration::ZERO);
        if age < max_age {
            continue;
        }

        match fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to remove stale temp file");
                failures.push(format!("{}: {err}", path.display()));
            }
        }
    }

    if removed > 0 {
        info!(dir = %dir.display(), removed, "Temp cleanup removed stale files");
    } else {
        debug!(dir = %dir.display(), "Temp cleanup found no stale files");
    }

    if !failures.is_empty() {
        bail!(
            "failed to clean {} of {} stale entries: {}",
            failures.len(),
            failures.len() + removed,
            failures.join("; ")
        );
    }
    Ok(removed)
}
