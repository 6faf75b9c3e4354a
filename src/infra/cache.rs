//! On-disk snapshot of the last downloaded feed, with TTL tracking.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::infra::feed::FeedDocument;

const SNAPSHOT_FILENAME: &str = "feed_cache.json";
const APP_DIR: &str = "server-value-scanner";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Cached feed document tagged with its source URL and creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub url: String,
    /// Unix timestamp (seconds) when this snapshot was created.
    pub cached_at: u64,
    pub document: FeedDocument,
}

impl FeedSnapshot {
    pub fn new(url: String, document: FeedDocument) -> Self {
        let cached_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            url,
            cached_at,
            document,
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }

    pub fn age(&self) -> Duration {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Duration::from_secs(now.saturating_sub(self.cached_at))
    }

    pub fn fetched_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.cached_at)
    }

    /// Human-readable age string.
    pub fn age_string(&self) -> String {
        let secs = self.age().as_secs();
        if secs < 60 {
            format!("{secs}s")
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else if secs < 86400 {
            format!("{}h", secs / 3600)
        } else {
            format!("{}d", secs / 86400)
        }
    }
}

/// Snapshot location in the local data directory, if the platform has one.
pub fn default_snapshot_path() -> Option<PathBuf> {
    static PATH: OnceLock<Option<PathBuf>> = OnceLock::new();
    PATH.get_or_init(|| {
        dirs::data_local_dir().map(|base| base.join(APP_DIR).join(SNAPSHOT_FILENAME))
    })
    .clone()
}

pub fn load_snapshot(path: &Path) -> Option<FeedSnapshot> {
    if !path.exists() {
        debug!(path = %path.display(), "no feed snapshot found");
        return None;
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<FeedSnapshot>(&content) {
            Ok(snapshot) => {
                debug!(
                    path = %path.display(),
                    servers = snapshot.document.server.len(),
                    age = %snapshot.age_string(),
                    "loaded feed snapshot"
                );
                Some(snapshot)
            }
            Err(error) => {
                debug!(%error, "failed to parse feed snapshot");
                None
            }
        },
        Err(error) => {
            debug!(%error, "failed to read feed snapshot");
            None
        }
    }
}

pub fn save_snapshot(path: &Path, snapshot: &FeedSnapshot) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    // compact, the feed runs to several MB
    let content = serde_json::to_string(snapshot)?;
    fs::write(path, content)?;
    debug!(
        path = %path.display(),
        servers = snapshot.document.server.len(),
        "saved feed snapshot"
    );
    Ok(())
}
