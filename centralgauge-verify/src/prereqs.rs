//! Prerequisite-app resolution: walks `tests/al/dependencies/<taskId>/app.json`
//! files, following `dependencies[].id` to other prereqs in the same
//! directory, and returns them in dependency-first (topological) order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use centralgauge_core::VerifyError;
use serde_json::Value;

/// One resolved prerequisite app: its own directory and its parsed
/// `app.json`.
#[derive(Debug, Clone)]
pub struct PrereqApp {
    pub task_id: String,
    pub dir: PathBuf,
    pub app_json: Value,
}

fn dependencies_dir(repo_root: &Path, task_id: &str) -> PathBuf {
    repo_root.join("tests").join("al").join("dependencies").join(task_id)
}

fn load_app_json(dir: &Path) -> Result<Value, VerifyError> {
    let path = dir.join("app.json");
    let raw = std::fs::read_to_string(&path)
        .map_err(|source| VerifyError::AppJsonRead { path: path.clone(), source })?;
    serde_json::from_str(&raw).map_err(|source| VerifyError::AppJsonParse { path, source })
}

fn dependency_ids(app_json: &Value) -> Vec<String> {
    app_json
        .get("dependencies")
        .and_then(Value::as_array)
        .map(|deps| {
            deps.iter()
                .filter_map(|dep| dep.get("id").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Resolves `taskId`'s prerequisite chain, in dependency-first order,
/// following `dependencies[].id` from one prereq's `app.json` to the next
/// prereq directory bearing the same id as its own declared `id` field.
/// A prereq directory is matched by id, not name, against
/// `tests/al/dependencies/*/app.json`; directories are scanned once and
/// memoized by id to avoid re-reading.
pub fn resolve_prereqs(repo_root: &Path, task_id: &str) -> Result<Vec<PrereqApp>, VerifyError> {
    let deps_root = repo_root.join("tests").join("al").join("dependencies");
    let by_id = index_by_id(&deps_root)?;

    let own_dir = dependencies_dir(repo_root, task_id);
    if !own_dir.join("app.json").exists() {
        return Ok(Vec::new());
    }
    let own_app_json = load_app_json(&own_dir)?;

    let mut order = Vec::new();
    let mut visiting = HashSet::new();
    let mut visited = HashSet::new();
    for dep_id in dependency_ids(&own_app_json) {
        visit(&dep_id, &by_id, &mut order, &mut visiting, &mut visited)?;
    }
    Ok(order)
}

fn visit(
    id: &str,
    by_id: &std::collections::HashMap<String, PathBuf>,
    order: &mut Vec<PrereqApp>,
    visiting: &mut HashSet<String>,
    visited: &mut HashSet<String>,
) -> Result<(), VerifyError> {
    if visited.contains(id) {
        return Ok(());
    }
    let Some(dir) = by_id.get(id) else {
        // Not every dependency is a local prereq (e.g. system apps); skip.
        return Ok(());
    };
    if !visiting.insert(id.to_string()) {
        return Err(VerifyError::CircularPrerequisite { task_id: id.to_string() });
    }

    let app_json = load_app_json(dir)?;
    for dep_id in dependency_ids(&app_json) {
        visit(&dep_id, by_id, order, visiting, visited)?;
    }

    visiting.remove(id);
    visited.insert(id.to_string());
    order.push(PrereqApp {
        task_id: dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
        dir: dir.clone(),
        app_json,
    });
    Ok(())
}

fn index_by_id(deps_root: &Path) -> Result<std::collections::HashMap<String, PathBuf>, VerifyError> {
    let mut index = std::collections::HashMap::new();
    let entries = match std::fs::read_dir(deps_root) {
        Ok(entries) => entries,
        Err(_) => return Ok(index),
    };
    for entry in entries {
        let entry = entry.map_err(|source| VerifyError::Io { path: deps_root.to_path_buf(), source })?;
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let app_json_path = dir.join("app.json");
        if !app_json_path.exists() {
            continue;
        }
        if let Ok(app_json) = load_app_json(&dir) {
            if let Some(id) = app_json.get("id").and_then(Value::as_str) {
                index.insert(id.to_string(), dir);
            }
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_app_json(dir: &Path, id: &str, deps: &[&str]) {
        std::fs::create_dir_all(dir).unwrap();
        let deps_json: Vec<Value> = deps.iter().map(|d| serde_json::json!({ "id": d })).collect();
        std::fs::write(
            dir.join("app.json"),
            serde_json::to_string(&serde_json::json!({ "id": id, "dependencies": deps_json })).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn returns_empty_when_task_has_no_dependency_entry() {
        let root = tempfile::tempdir().unwrap();
        let result = resolve_prereqs(root.path(), "CG-AL-E008").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn resolves_single_level_prereq() {
        let root = tempfile::tempdir().unwrap();
        let deps_root = root.path().join("tests/al/dependencies");
        write_app_json(&deps_root.join("CG-AL-E008"), "task-id", &["lib-id"]);
        write_app_json(&deps_root.join("shared-lib"), "lib-id", &[]);

        let result = resolve_prereqs(root.path(), "CG-AL-E008").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].task_id, "shared-lib");
    }

    #[test]
    fn orders_transitive_prereqs_dependency_first() {
        let root = tempfile::tempdir().unwrap();
        let deps_root = root.path().join("tests/al/dependencies");
        write_app_json(&deps_root.join("CG-AL-E010"), "task-id", &["mid-id"]);
        write_app_json(&deps_root.join("mid"), "mid-id", &["base-id"]);
        write_app_json(&deps_root.join("base"), "base-id", &[]);

        let result = resolve_prereqs(root.path(), "CG-AL-E010").unwrap();
        let names: Vec<_> = result.iter().map(|p| p.task_id.as_str()).collect();
        assert_eq!(names, vec!["base", "mid"]);
    }

    #[test]
    fn detects_circular_prerequisite_chains() {
        let root = tempfile::tempdir().unwrap();
        let deps_root = root.path().join("tests/al/dependencies");
        write_app_json(&deps_root.join("CG-AL-E011"), "task-id", &["a-id"]);
        write_app_json(&deps_root.join("a"), "a-id", &["b-id"]);
        write_app_json(&deps_root.join("b"), "b-id", &["a-id"]);

        let result = resolve_prereqs(root.path(), "CG-AL-E011");
        assert!(matches!(result, Err(VerifyError::CircularPrerequisite { .. })));
    }
}
