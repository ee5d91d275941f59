//! Filesystem helpers

use crate::error::{FogStripperError, Result};
use std::path::Path;

/// Move a file, falling back to copy + remove across filesystems
///
/// The job temp directory usually lives on a different mount than the
/// user's files, where `rename` fails with `EXDEV`.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }

    std::fs::copy(from, to).map_err(|e| {
        FogStripperError::file_io_error(
            "copy",
            format!("{} -> {}", from.display(), to.display()),
            &e,
        )
    })?;
    std::fs::remove_file(from).map_err(|e| FogStripperError::file_io_error("remove", from, &e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_file() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.png");
        let to = dir.path().join("b.png");
        std::fs::write(&from, b"data").unwrap();

        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"data");
    }

    #[test]
    fn test_move_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(move_file(&dir.path().join("missing"), &dir.path().join("x")).is_err());
    }
}
