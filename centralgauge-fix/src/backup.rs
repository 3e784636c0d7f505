//! Side-file backups taken before a fix is applied, per §4.8.

use std::path::{Path, PathBuf};

use centralgauge_core::FixError;
use chrono::Utc;

/// Copies `path` to `<path>.bak.<timestamp>` and returns the backup's
/// path.
pub fn create_backup(path: &Path) -> Result<PathBuf, FixError> {
    let backup_path = backup_path_for(path, Utc::now().timestamp());
    std::fs::copy(path, &backup_path)
        .map_err(|source| FixError::Backup { path: path.to_path_buf(), source })?;
    Ok(backup_path)
}

/// Restores `path` from `backup_path`, overwriting the current content.
pub fn restore_backup(path: &Path, backup_path: &Path) -> Result<(), FixError> {
    std::fs::copy(backup_path, path)
        .map_err(|source| FixError::Write { path: path.to_path_buf(), source })?;
    Ok(())
}

fn backup_path_for(path: &Path, timestamp: i64) -> PathBuf {
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!("{file_name}.bak.{timestamp}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_and_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Codeunit1.al");
        std::fs::write(&path, "original content").unwrap();

        let backup_path = create_backup(&path).unwrap();
        assert!(backup_path.to_string_lossy().contains(".bak."));
        assert_eq!(std::fs::read_to_string(&backup_path).unwrap(), "original content");

        std::fs::write(&path, "mutated content").unwrap();
        restore_backup(&path, &backup_path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original content");
    }
}
