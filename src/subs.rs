use crate::backup::{self, FileError};
use crate::paths;
use crate::request::{StageOutcome, SubMode};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("unknown sub mode `{0}`")]
    UnknownMode(String),
    #[error("{path} exists and is not a directory")]
    NotADirectory { path: String },
    #[error("failed to create {path}: {source}")]
    CreateDir { path: String, source: io::Error },
    #[error("failed to walk {dir}: {source}")]
    Walk { dir: String, source: walkdir::Error },
    #[error(transparent)]
    File(#[from] FileError),
}

/// Brings the files under `dir` in line with `subs`. `direct` mode touches
/// only the named files; `overwrite` mode first relocates every existing file
/// in the tree to a timestamped backup, so stale sub-configs cannot stay
/// active under their old names.
pub fn reconcile(
    dir: &str,
    subs: &BTreeMap<String, String>,
    mode: &str,
) -> Result<Vec<StageOutcome>, ReconcileError> {
    if dir.is_empty() || subs.is_empty() {
        return Ok(Vec::new());
    }

    // Reject a bad mode before anything touches the filesystem
    let Some(mode) = SubMode::parse(mode) else {
        return Err(ReconcileError::UnknownMode(mode.to_string()));
    };

    let dir = paths::resolve(dir);
    match fs::metadata(&dir) {
        Ok(meta) if !meta.is_dir() => {
            return Err(ReconcileError::NotADirectory {
                path: dir.display().to_string(),
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(&dir).map_err(|e| ReconcileError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Err(e) => {
            return Err(FileError::Stat {
                path: dir.display().to_string(),
                source: e,
            }
            .into());
        }
    }

    match mode {
        SubMode::Direct => reconcile_direct(&dir, subs),
        SubMode::Overwrite => reconcile_overwrite(&dir, subs),
    }
}

fn reconcile_direct(
    dir: &Path,
    subs: &BTreeMap<String, String>,
) -> Result<Vec<StageOutcome>, ReconcileError> {
    let mut results = Vec::with_capacity(subs.len());
    for (name, content) in subs {
        let written = backup::write_resolved(&dir.join(name), content)?;
        results.push(StageOutcome::Sub {
            file: written.path.display().to_string(),
            outcome: written.outcome,
        });
    }
    Ok(results)
}

fn reconcile_overwrite(
    dir: &Path,
    subs: &BTreeMap<String, String>,
) -> Result<Vec<StageOutcome>, ReconcileError> {
    // Collect before renaming so fresh backups don't get walked themselves
    let mut existing: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| ReconcileError::Walk {
            dir: dir.display().to_string(),
            source: e,
        })?;
        if entry.file_type().is_file() {
            existing.push(entry.into_path());
        }
    }

    for path in &existing {
        let backup = backup::backup_path(path);
        fs::rename(path, &backup).map_err(|e| FileError::Backup {
            path: path.display().to_string(),
            backup: backup.display().to_string(),
            source: e,
        })?;
    }
    debug!("relocated {} existing files under {}", existing.len(), dir.display());

    let mut results = Vec::with_capacity(subs.len() + 1);
    results.push(StageOutcome::SubsCleared {
        dir: dir.display().to_string(),
        backed_up: existing.len(),
    });

    // Originals are gone, so these are plain fresh writes
    for (name, content) in subs {
        let written = backup::write_resolved(&dir.join(name), content)?;
        results.push(StageOutcome::Sub {
            file: written.path.display().to_string(),
            outcome: written.outcome,
        });
    }
    Ok(results)
}
