//! Per-execution working-directory discipline: a fresh, isolated
//! directory per `(task, execution)` pair, seeded with whatever ambient
//! agent context lives at the base directory.

use std::path::{Path, PathBuf};

use centralgauge_core::{ExecutionId, TaskId};
use walkdir::WalkDir;

const AMBIENT_FILE: &str = "CLAUDE.md";
const AMBIENT_DIR: &str = ".claude";

/// Create `baseDir/.tasks/<taskId>-<executionId>` and recursively copy any
/// ambient `CLAUDE.md` file or `.claude/` directory from `base_dir` into
/// it, so the agent sees its configuration but writes only in isolation.
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
    for entry in WalkDir::new(src).min_depth(1) {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_ambient_claude_md_and_dot_claude_dir_into_isolated_execution_dir() {
        let base = tempfile::tempdir().unwrap();
        std::fs::write(base.path().join("CLAUDE.md"), "be concise").unwrap();
        std::fs::create_dir_all(base.path().join(".claude/commands")).unwrap();
        std::fs::write(base.path().join(".claude/commands/deploy.md"), "deploy steps").unwrap();

        let task_id = TaskId::parse("CG-AL-E008").unwrap();
        let execution_id = ExecutionId::new();
        let exec_dir = prepare_execution_dir(base.path(), &task_id, execution_id).unwrap();

        assert!(exec_dir.join("CLAUDE.md").is_file());
        assert!(exec_dir.join(".claude/commands/deploy.md").is_file());
        assert_eq!(
            std::fs::read_to_string(exec_dir.join("CLAUDE.md")).unwrap(),
            "be concise"
        );
    }

    #[test]
    fn execution_dir_is_isolated_when_no_ambient_context_exists() {
        let base = tempfile::tempdir().unwrap();
        let task_id = TaskId::parse("CG-AL-E008").unwrap();
        let execution_id = ExecutionId::new();
        let exec_dir = prepare_execution_dir(base.path(), &task_id, execution_id).unwrap();
        assert!(exec_dir.is_dir());
        assert!(!exec_dir.join("CLAUDE.md").exists());
    }
}
