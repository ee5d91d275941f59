//! Backup manager
//!
//! Before any stage runs, the user's input is moved aside to
//! `<stem>.bak<ext>`. The backup is the durable original: stages and the
//! post-processing algorithms read from it, and on failure it is moved back
//! so the user's file is never left missing.

use crate::error::{FogStripperError, Result};
use crate::utils::move_file;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Reserved suffix inserted between stem and extension
pub const BACKUP_SUFFIX: &str = ".bak";

/// Stem with a trailing backup suffix removed (`cat.bak` -> `cat`)
#[must_use]
pub fn strip_backup_suffix(stem: &str) -> &str {
    stem.strip_suffix(BACKUP_SUFFIX).unwrap_or(stem)
}

/// Whether the file stem already carries the backup suffix
#[must_use]
pub fn is_backup_path(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.ends_with(BACKUP_SUFFIX))
}

/// Canonical backup path for an original (`dir/cat.png` -> `dir/cat.bak.png`)
#[must_use]
pub fn backup_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = extension_with_dot(path);
    path.with_file_name(format!("{}{}{}", strip_backup_suffix(&stem), BACKUP_SUFFIX, ext))
}

/// Original path a backup belongs to (`dir/cat.bak.png` -> `dir/cat.png`)
#[must_use]
pub fn original_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = extension_with_dot(path);
    path.with_file_name(format!("{}{}", strip_backup_suffix(&stem), ext))
}

fn extension_with_dot(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// Where the user's real file lives for the duration of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// Visible path the user handed in (without the backup suffix)
    pub original_path: PathBuf,
    /// Path holding the true source
    pub backup_path: PathBuf,
    /// Whether this run moved the original to `backup_path`
    pub created: bool,
}

impl BackupRecord {
    /// Path the pipeline reads its source pixels from
    #[must_use]
    pub fn working_path(&self) -> &Path {
        &self.backup_path
    }
}

/// Moves inputs aside before processing and restores them on failure
#[derive(Debug, Default, Clone, Copy)]
pub struct BackupManager;

impl BackupManager {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Protect the input and return the record of where it now lives
    ///
    /// - `cat.bak.png` is already a backup and is used as is.
    /// - `cat.png` with an existing `cat.bak.png` reuses that backup as the
    ///   source and leaves `cat.png` in place.
    /// - Otherwise `cat.png` is moved to `cat.bak.png`.
    ///
    /// # Errors
    /// - The input does not exist
    /// - The move fails
    pub fn protect(&self, input_path: &Path) -> Result<BackupRecord> {
        if !input_path.is_file() {
            return Err(FogStripperError::backup(format!(
                "Input '{}' does not exist",
                input_path.display()
            )));
        }

        if is_backup_path(input_path) {
            info!(path = %input_path.display(), "Input is already a backup");
            return Ok(BackupRecord {
                original_path: original_path_for(input_path),
                backup_path: input_path.to_path_buf(),
                created: false,
            });
        }

        let backup_path = backup_path_for(input_path);
        if backup_path.exists() {
            warn!(
                backup = %backup_path.display(),
                "Backup already exists, using it as the source"
            );
            return Ok(BackupRecord {
                original_path: input_path.to_path_buf(),
                backup_path,
                created: false,
            });
        }

        move_file(input_path, &backup_path).map_err(|e| {
            FogStripperError::backup(format!(
                "Failed to move '{}' to '{}': {}",
                input_path.display(),
                backup_path.display(),
                e
            ))
        })?;
        info!(backup = %backup_path.display(), "Backup created");

        Ok(BackupRecord {
            original_path: input_path.to_path_buf(),
            backup_path,
            created: true,
        })
    }

    /// Move a backup created this run back to `input_path`
    ///
    /// Returns whether a file was moved.
    ///
    /// # Errors
    /// - The move back fails
    pub fn restore_on_failure(&self, record: &BackupRecord, input_path: &Path) -> Result<bool> {
        if !record.created || !record.backup_path.exists() {
            return Ok(false);
        }

        move_file(&record.backup_path, input_path).map_err(|e| {
            FogStripperError::backup(format!(
                "Failed to restore '{}' from '{}': {}",
                input_path.display(),
                record.backup_path.display(),
                e
            ))
        })?;
        info!(path = %input_path.display(), "Original restored from backup");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(backup_path_for(Path::new("/a/cat.png")), Path::new("/a/cat.bak.png"));
        assert_eq!(backup_path_for(Path::new("/a/cat.bak.png")), Path::new("/a/cat.bak.png"));
        assert_eq!(original_path_for(Path::new("/a/cat.bak.png")), Path::new("/a/cat.png"));
        assert_eq!(backup_path_for(Path::new("/a/noext")), Path::new("/a/noext.bak"));
        assert!(is_backup_path(Path::new("cat.bak.gif")));
        assert!(!is_backup_path(Path::new("cat.gif")));
        assert!(!is_backup_path(Path::new("bakery.png")));
    }

    #[test]
    fn test_protect_moves_original() {
        let dir = TempDir::new().unwrap();
        let input = write(&dir, "cat.png", b"original");

        let record = BackupManager::new().protect(&input).unwrap();
        assert!(record.created);
        assert!(!input.exists());
        assert_eq!(record.working_path(), dir.path().join("cat.bak.png"));
        assert_eq!(std::fs::read(record.working_path()).unwrap(), b"original");
    }

    #[test]
    fn test_protect_existing_backup_input() {
        let dir = TempDir::new().unwrap();
        let input = write(&dir, "cat.bak.png", b"original");

        let record = BackupManager::new().protect(&input).unwrap();
        assert!(!record.created);
        assert_eq!(record.backup_path, input);
        assert_eq!(record.original_path, dir.path().join("cat.png"));
        assert!(input.exists());
    }

    #[test]
    fn test_protect_reuses_colliding_backup() {
        let dir = TempDir::new().unwrap();
        let input = write(&dir, "cat.png", b"previous output");
        let backup = write(&dir, "cat.bak.png", b"true original");

        let record = BackupManager::new().protect(&input).unwrap();
        assert!(!record.created);
        assert_eq!(record.backup_path, backup);
        assert_eq!(std::fs::read(&input).unwrap(), b"previous output");
        assert_eq!(std::fs::read(&backup).unwrap(), b"true original");
    }

    #[test]
    fn test_protect_missing_input_fails() {
        let dir = TempDir::new().unwrap();
        let err = BackupManager::new()
            .protect(&dir.path().join("missing.png"))
            .unwrap_err();
        assert!(matches!(err, FogStripperError::Backup(_)));
    }

    #[test]
    fn test_restore_on_failure() {
        let dir = TempDir::new().unwrap();
        let input = write(&dir, "cat.png", b"original");
        let manager = BackupManager::new();

        let record = manager.protect(&input).unwrap();
        assert!(!input.exists());
        assert!(manager.restore_on_failure(&record, &input).unwrap());
        assert_eq!(std::fs::read(&input).unwrap(), b"original");
        assert!(!record.backup_path.exists());

        // A second restore finds nothing left to move
        assert!(!manager.restore_on_failure(&record, &input).unwrap());
    }

    #[test]
    fn test_restore_skips_backups_not_created_this_run() {
        let dir = TempDir::new().unwrap();
        let input = write(&dir, "cat.bak.png", b"original");
        let manager = BackupManager::new();

        let record = manager.protect(&input).unwrap();
        assert!(!manager
            .restore_on_failure(&record, &record.original_path)
            .unwrap());
        assert!(input.exists());
        assert!(!record.original_path.exists());
    }
}
