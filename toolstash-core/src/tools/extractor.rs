//! Archive extraction for downloaded tool packages.
//!
//! Only the single executable a tool needs is pulled out of an archive; the
//! rest is never written to disk. Links and entries with absolute or `..`
//! paths are never selected.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::types::ArchiveFormat;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to open archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt {format:?} archive: {reason}")]
    Corrupt {
        format: ArchiveFormat,
        reason: String,
    },

    #[error("{member} not found in archive")]
    MemberNotFound { member: String },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Which archive entry holds the executable.
#[derive(Debug, Clone, Copy)]
pub enum MemberSelector<'a> {
    /// Exact relative path inside the archive (a leading `./` is ignored).
    Path(&'a str),
    /// First regular file, at any depth, with this file name.
    FileName(&'a str),
}

impl MemberSelector<'_> {
    fn matches(&self, entry: &Path) -> bool {
        match self {
            Self::Path(member) => strip_dot(entry) == strip_dot(Path::new(member)),
            Self::FileName(name) => entry.file_name().is_some_and(|f| f == *name),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Path(p) | Self::FileName(p) => p.to_string(),
        }
    }
}

fn strip_dot(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn is_safe(path: &Path) -> bool {
    !path.is_absolute() && !path.components().any(|c| c == Component::ParentDir)
}

// ============================================================================
// Archive Extraction
// ============================================================================

/// Copies the selected member of `archive_path` into `dest`.
///
/// Blocking; run it on a blocking thread from async code.
pub fn extract_member(
    archive_path: &Path,
    format: ArchiveFormat,
    member: MemberSelector<'_>,
    dest: &Path,
) -> Result<(), ExtractionError> {
    info!(
        "Extracting {} from {:?} archive {}",
        member.describe(),
        format,
        archive_path.display()
    );

    let file = File::open(archive_path).map_err(|source| ExtractionError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    match format {
        ArchiveFormat::Zip => extract_zip(reader, member, dest),
        ArchiveFormat::TarGz => {
            extract_tar(flate2::read::GzDecoder::new(reader), format, member, dest)
        }
        ArchiveFormat::TarXz => {
            extract_tar(xz2::read::XzDecoder::new(reader), format, member, dest)
        }
    }
}

fn copy_to(reader: &mut impl Read, dest: &Path) -> Result<u64, ExtractionError> {
    let write_err = |source| ExtractionError::Write {
        path: dest.to_path_buf(),
        source,
    };
    let mut out = File::create(dest).map_err(write_err)?;
    let written = io::copy(reader, &mut out).map_err(write_err)?;
    out.flush().map_err(write_err)?;
    Ok(written)
}

// ============================================================================
// ZIP Extraction
// ============================================================================

fn extract_zip(
    reader: BufReader<File>,
    member: MemberSelector<'_>,
    dest: &Path,
) -> Result<(), ExtractionError> {
    let corrupt = |e: zip::result::ZipError| ExtractionError::Corrupt {
        format: ArchiveFormat::Zip,
        reason: e.to_string(),
    };
    let mut archive = zip::ZipArchive::new(reader).map_err(corrupt)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(corrupt)?;
        if entry.is_dir() {
            continue;
        }
        let Some(path) = entry.enclosed_name() else {
            debug!("Skipping unsafe path in zip");
            continue;
        };
        if !member.matches(&path) {
            continue;
        }

        let written = copy_to(&mut entry, dest)?;
        debug!(path = %path.display(), written, "Extracted zip member");
        return Ok(());
    }

    Err(ExtractionError::MemberNotFound {
        member: member.describe(),
    })
}

// ============================================================================
// TAR Extraction
// ============================================================================

fn extract_tar<R: Read>(
    reader: R,
    format: ArchiveFormat,
    member: MemberSelector<'_>,
    dest: &Path,
) -> Result<(), ExtractionError> {
    let corrupt = |e: io::Error| ExtractionError::Corrupt {
        format,
        reason: e.to_string(),
    };
    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        let entry_type = entry.header().entry_type();

        if entry_type.is_symlink() || entry_type.is_hard_link() {
            debug!("Skipping link in tar archive");
            continue;
        }
        if !entry_type.is_file() {
            continue;
        }

        let path = entry.path().map_err(corrupt)?.into_owned();
        if !is_safe(&path) {
            warn!("Skipping unsafe path in tar: {:?}", path);
            continue;
        }
        if !member.matches(&path) {
            continue;
        }

        let written = copy_to(&mut entry, dest)?;
        debug!(path = %path.display(), written, "Extracted tar member");
        return Ok(());
    }

    Err(ExtractionError::MemberNotFound {
        member: member.describe(),
    })
}

// ============================================================================
// Permissions
// ============================================================================

/// Adds the executable bits (`0o755`). No-op on Windows.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        fs::set_permissions(path, permissions)?;

        debug!("Set executable permission on {}", path.display());
    }

    Ok(())
}
