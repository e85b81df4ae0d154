//! Whole-store snapshots for the in-memory backend.

use super::memory::Tables;
use crate::core::{CustodyError, Result};
use crate::identity::StaffUser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub live_items: usize,
    pub history_rows: usize,
    pub staff_accounts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodySnapshot {
    pub version: u32,
    pub tables: Tables,
    pub users: Vec<StaffUser>,
    pub metadata: SnapshotMetadata,
}

impl CustodySnapshot {
    pub fn new(tables: Tables, users: Vec<StaffUser>) -> Self {
        let metadata = SnapshotMetadata {
            created_at: Utc::now(),
            live_items: tables.items.len(),
            history_rows: tables.history.len(),
            staff_accounts: users.len(),
        };
        Self {
            version: SNAPSHOT_VERSION,
            tables,
            users,
            metadata,
        }
    }

    /// Writes the snapshot next to `path` and renames it into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|err| {
            CustodyError::storage(format!(
                "Failed to create parent directory '{}': {}",
                parent.display(),
                err
            ))
        })?;

        let bytes = serde_json::to_vec_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|err| {
            CustodyError::storage(format!("Failed to create temp file in '{}': {}", parent.display(), err))
        })?;
        tmp.write_all(&bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|err| CustodyError::storage(format!("Failed to write snapshot: {}", err)))?;
        tmp.persist(path).map_err(|err| {
            CustodyError::storage(format!("Failed to move snapshot to '{}': {}", path.display(), err))
        })?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|err| {
            CustodyError::storage(format!("Failed to read snapshot '{}': {}", path.display(), err))
        })?;
        let snapshot: Self = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CustodyError::storage(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(snapshot)
    }
}
