//! Snapshot file I/O.
//!
//! Async helpers for reading and writing a [`SnapshotFile`] as pretty JSON.
//! Writes go through a temporary sibling file that is renamed over the
//! target, so a crash mid-write never leaves a truncated snapshot behind.

use std::path::{Path, PathBuf};

use tasktree_core::{Result, SnapshotFile};
use tokio::fs;
use tracing::debug;

/// Read and validate a snapshot file.
///
/// # Returns
/// * `Ok(Some(snapshot))` - File parsed and has a known version
/// * `Ok(None)` - File does not exist or is empty (nothing stored yet)
/// * `Err(Error)` - I/O error, JSON parse error or unknown version
pub async fn read_snapshot(path: &Path) -> Result<Option<SnapshotFile>> {
    debug!("Reading snapshot file: {}", path.display());

    let data = match fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Snapshot file does not exist yet");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    if data.iter().all(u8::is_ascii_whitespace) {
        debug!("Snapshot file is empty");
        return Ok(None);
    }

    let snapshot: SnapshotFile = serde_json::from_slice(&data)?;
    snapshot.validate()?;

    debug!("Read snapshot with {} tasks", snapshot.root.count());
    Ok(Some(snapshot))
}

/// Write a snapshot file as pretty-printed JSON.
///
/// Creates the parent directory if it doesn't exist.
pub async fn write_snapshot(path: &Path, snapshot: &SnapshotFile) -> Result<()> {
    snapshot.validate()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let data = serde_json::to_vec_pretty(snapshot)?;

    let tmp = temp_path(path);
    debug!("Writing snapshot file: {}", path.display());
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;

    Ok(())
}

/// Delete a snapshot file. Missing files are not an error.
pub async fn delete_snapshot(path: &Path) -> Result<()> {
    debug!("Deleting snapshot file: {}", path.display());

    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
