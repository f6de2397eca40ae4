//! On-disk snapshot format for task trees.
//!
//! A snapshot file holds a single nested tree. Connection data is kept in
//! the canonical `id -> [tags]` form so files diff cleanly.

use serde::{Deserialize, Serialize};

use crate::connections::ConnectionsSnapshot;
use crate::status::TaskStatus;
use crate::{Error, Result};

/// Version written into every snapshot file.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Top-level snapshot document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub version: u32,
    pub root: TaskRecord,
}

impl SnapshotFile {
    pub fn new(root: TaskRecord) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            root,
        }
    }

    /// Reject snapshots written by an unknown format version.
    pub fn validate(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(Error::SnapshotVersion(self.version));
        }
        Ok(())
    }
}

/// One task and its subtree, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "ConnectionsSnapshot::is_empty")]
    pub connections: ConnectionsSnapshot,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TaskRecord>,
}

impl TaskRecord {
    /// Number of records in this subtree, including itself.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TaskRecord::count).sum::<usize>()
    }
}
