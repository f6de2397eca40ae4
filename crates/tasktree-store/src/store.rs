//! Store boundary for task trees.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tasktree_core::{Error, IdentifierPolicy, Result, SnapshotFile, TaskTree};
use tracing::{debug, info, instrument};

use crate::snapshot_io::{read_snapshot, write_snapshot};

/// Persistence for whole task trees.
///
/// Implementations must round-trip ids, names, statuses and every
/// connection with its full tag set.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Load the stored tree, or the subtree rooted at `root_id`.
    async fn get_tree(&self, root_id: Option<&str>) -> Result<TaskTree>;

    /// Replace the stored tree with `tree`.
    async fn save_tree(&mut self, tree: &TaskTree) -> Result<()>;

    /// Release the store. Later calls fail with [`Error::StoreClosed`].
    async fn close(&mut self) -> Result<()>;
}

/// Store keeping one tree in a JSON snapshot file.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
    policy: IdentifierPolicy,
    open: bool,
}

impl JsonStore {
    /// Open a store at `path` using the default identifier policy.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_policy(path, IdentifierPolicy::default()).await
    }

    /// Open a store at `path`, validating loaded ids with `policy`.
    ///
    /// The file itself is only created by the first save.
    pub async fn open_with_policy(path: impl Into<PathBuf>, policy: IdentifierPolicy) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!("Opened snapshot store at {}", path.display());
        Ok(Self {
            path,
            policy,
            open: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::StoreClosed(self.path.display().to_string()))
        }
    }
}

#[async_trait]
impl TreeStore for JsonStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn get_tree(&self, root_id: Option<&str>) -> Result<TaskTree> {
        self.ensure_open()?;

        let snapshot = read_snapshot(&self.path)
            .await?
            .ok_or_else(|| Error::TreeNotFound(self.path.display().to_string()))?;
        let tree = TaskTree::from_record(&snapshot.root, self.policy)?;

        match root_id {
            None => Ok(tree),
            Some(id) => tree
                .subtree(id)
                .ok_or_else(|| Error::TaskNotFound(id.to_string())),
        }
    }

    #[instrument(skip(self, tree), fields(path = %self.path.display()))]
    async fn save_tree(&mut self, tree: &TaskTree) -> Result<()> {
        self.ensure_open()?;

        let snapshot = SnapshotFile::new(tree.to_record());
        write_snapshot(&self.path, &snapshot).await?;
        info!("Saved {} tasks", tree.len());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.open = false;
        debug!("Closed snapshot store at {}", self.path.display());
        Ok(())
    }
}
