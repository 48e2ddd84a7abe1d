//! Time-based retention cleanup for rotated log files, adapted from the
//! teacher's `infrastructure::logging::rotation::LogRotator`.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use tracing::{info, warn};

/// Deletes rotated log files older than a retention window.
#[derive(Debug, Clone, Copy)]
pub struct LogRotator {
    retention_days: u32,
}

impl LogRotator {
    #[must_use]
    pub const fn new(retention_days: u32) -> Self {
        Self { retention_days }
    }

    /// Delete `.log*` files in `log_dir` whose modification time is older
    /// than the retention window. Returns the number of files deleted.
    pub async fn cleanup_old_logs(&self, log_dir: impl AsRef<Path>) -> Result<usize> {
        let log_dir = log_dir.as_ref();

        if !log_dir.exists() {
            warn!(path = %log_dir.display(), "log directory does not exist");
            return Ok(0);
        }

        let cutoff = Utc::now() - Duration::days(i64::from(self.retention_days));
        let mut deleted_count = 0;

        let mut entries = tokio::fs::read_dir(log_dir).await.context("failed to read log directory")?;

        while let Some(entry) = entries.next_entry().await.context("failed to read directory entry")? {
            let path = entry.path();

            let is_log_file = path.extension().and_then(|s| s.to_str()).is_some_and(|ext| ext.starts_with("log"));
            if !is_log_file {
                continue;
            }

            let metadata = tokio::fs::metadata(&path).await.context("failed to get file metadata")?;
            let modified: DateTime<Utc> = metadata.modified().context("failed to get file modification time")?.into();

            if modified < cutoff {
                tokio::fs::remove_file(&path).await.context("failed to delete old log file")?;
                info!(path = %path.display(), "deleted old log file");
                deleted_count += 1;
            }
        }

        if deleted_count > 0 {
            info!(count = deleted_count, "cleaned up old log files");
        }

        Ok(deleted_count)
    }
}
