//! Destination and staging paths.
//!
//! - Stash mode: `{toolstash_home}/bin/` (e.g. `~/.toolstash/bin/kubectl`)
//! - Temp mode: `{temp}/toolstash-XXXXXX/`, created once per process with
//!   owner-only permissions
//!
//! Downloads never write the final name directly; they stage beside it under
//! a hidden, uuid-suffixed name and rename into place.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

use super::types::DestinationMode;

/// Prefix of the per-process directory under the OS temp folder.
const TEMP_DIR_PREFIX: &str = "toolstash-";

static SESSION_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Returns this process's directory under the OS temp folder, creating it on
/// first use.
///
/// The name is random and the directory is created exclusively, so a
/// directory planted by another user is never reused. It outlives the
/// process; the user installs from it afterwards.
pub fn session_temp_dir() -> io::Result<PathBuf> {
    let mut slot = SESSION_DIR.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(dir) = slot.as_ref() {
        return Ok(dir.clone());
    }

    let dir = tempfile::Builder::new()
        .prefix(TEMP_DIR_PREFIX)
        .tempdir()?
        .keep();
    *slot = Some(dir.clone());
    Ok(dir)
}

/// Chooses the directory a tool is installed into.
pub fn destination_dir(mode: DestinationMode, stash_dir: &Path) -> io::Result<PathBuf> {
    match mode {
        DestinationMode::StashDirectory => Ok(stash_dir.to_path_buf()),
        DestinationMode::TemporaryDirectory => session_temp_dir(),
    }
}

/// Creates `dir` and any missing parents.
pub async fn ensure_dir(dir: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await
}

/// Unique scratch paths used while fetching one tool.
#[derive(Debug, Clone)]
pub struct StagingPaths {
    /// Receives the executable before the final rename.
    pub staged: PathBuf,
    /// Receives the raw archive, when the asset is one.
    pub archive: PathBuf,
}

impl StagingPaths {
    pub fn new(dir: &Path, final_name: &str) -> Self {
        let id = Uuid::new_v4().simple();
        Self {
            staged: dir.join(format!(".{}.{}.part", final_name, id)),
            archive: dir.join(format!(".{}.{}.archive", final_name, id)),
        }
    }
}
