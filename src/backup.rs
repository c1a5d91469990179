use crate::paths;
use crate::request::WriteOutcome;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("failed to stat {path}: {source}")]
    Stat { path: String, source: io::Error },
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to back up {path} to {backup}: {source}")]
    Backup {
        path: String,
        backup: String,
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write { path: String, source: io::Error },
}

#[derive(Debug)]
pub struct Written {
    pub path: PathBuf,
    pub outcome: WriteOutcome,
}

/// Sibling backup name: `<path>.<17-digit local timestamp>`. Millisecond
/// resolution keeps names unique and sortable within one process's lifetime.
pub fn backup_path(path: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%3f");
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{stamp}"));
    PathBuf::from(name)
}

/// Writes `content` to `path` (home-expanded), moving any differing existing
/// file to a timestamped backup first. Identical existing content
/// short-circuits without touching the disk, which is what makes re-applying
/// a request safe.
pub fn write_content(path: &str, content: &str) -> Result<Written, FileError> {
    write_resolved(&paths::resolve(path), content)
}

pub fn write_resolved(path: &Path, content: &str) -> Result<Written, FileError> {
    let meta = match fs::metadata(path) {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            return Err(FileError::Stat {
                path: path.display().to_string(),
                source: e,
            });
        }
    };

    let Some(meta) = meta else {
        fs::write(path, content).map_err(|e| FileError::Write {
            path: path.display().to_string(),
            source: e,
        })?;
        return Ok(Written {
            path: path.to_path_buf(),
            outcome: WriteOutcome::Created,
        });
    };

    let current = fs::read(path).map_err(|e| FileError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    if current == content.as_bytes() {
        return Ok(Written {
            path: path.to_path_buf(),
            outcome: WriteOutcome::Unchanged,
        });
    }

    let backup = backup_path(path);
    fs::rename(path, &backup).map_err(|e| FileError::Backup {
        path: path.display().to_string(),
        backup: backup.display().to_string(),
        source: e,
    })?;
    debug!("backed up {} to {}", path.display(), backup.display());

    let write_err = |e| FileError::Write {
        path: path.display().to_string(),
        source: e,
    };
    fs::write(path, content).map_err(write_err)?;
    // Carry over the old file's mode; fresh files keep the platform default.
    fs::set_permissions(path, meta.permissions()).map_err(write_err)?;

    Ok(Written {
        path: path.to_path_buf(),
        outcome: WriteOutcome::Replaced {
            backup: backup.display().to_string(),
        },
    })
}
