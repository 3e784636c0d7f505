//! Per-execution working-directory discipline for the sandbox path.
//! Mirrors the local executor's `baseDir/.tasks/<taskId>-<executionId>`
//! convention (duplicated rather than shared to keep this crate free of
//! a dependency on `centralgauge-agent`, which depends on this crate).

use std::path::{Path, PathBuf};

use centralgauge_core::{ExecutionId, TaskId};

const AMBIENT_FILE: &str = "CLAUDE.md";
const AMBIENT_DIR: &str = ".claude";

pub fn prepare_execution_dir(
    base_dir: &Path,
    task_id: &TaskId,
    execution_id: ExecutionId,
) -> std::io::Result<PathBuf> {
    let exec_dir = base_dir.join(".tasks").join(format!("{task_id}-{execution_id}"));
    std::fs::create_dir_all(&exec_dir)?;

    let ambient_file = base_dir.join(AMBIENT_FILE);
    if ambient_file.is_file() {
        std::fs::copy(&ambient_file, exec_dir.join(AMBIENT_FILE))?;
    }

    let ambient_dir = base_dir.join(AMBIENT_DIR);
    if ambient_dir.is_dir() {
        copy_dir_recursive(&ambient_dir, &exec_dir.join(AMBIENT_DIR))?;
    }

    Ok(exec_dir)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry.path().strip_prefix(src).map_err(std::io::Error::other)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
