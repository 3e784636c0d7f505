//! Per-model shortcomings catalog: one JSON file per model, deduplicated
//! by `alConcept`, persisted so an interruption never loses data, per
//! §4.9.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use centralgauge_commons::sanitize_filename_component;
use centralgauge_core::{ShortcomingEntry, ShortcomingsFile};
use chrono::Utc;
use parking_lot::RwLock;

struct CachedFile {
    file: ShortcomingsFile,
    dirty: bool,
}

/// Holds every model's shortcomings file loaded so far, behind a single
/// lock — only ever touched from the orchestrator's single analysis
/// pipeline, so contention is not a design concern here.
pub struct ShortcomingsTracker {
    dir: PathBuf,
    cache: RwLock<HashMap<String, CachedFile>>,
}

impl ShortcomingsTracker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), cache: RwLock::new(HashMap::new()) }
    }

    fn path_for(&self, model: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_filename_component(model)))
    }

    fn load(&self, model: &str) -> ShortcomingsFile {
        let path = self.path_for(model);
        std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_else(|| ShortcomingsFile::new(model))
    }

    /// Merges one newly-observed shortcoming into `model`'s catalog.
    /// Updates an existing entry by `alConcept` (appending `taskId` and
    /// `errorCode` if new, incrementing `occurrences` iff the task was
    /// new) or creates a fresh one.
    pub fn add(
        &self,
        model: &str,
        al_concept: &str,
        concept: &str,
        description: &str,
        incorrect_pattern: &str,
        correct_pattern: &str,
        error_code: Option<&str>,
        task_id: &str,
    ) {
        let mut cache = self.cache.write();
        let entry = cache
            .entry(model.to_string())
            .or_insert_with(|| CachedFile { file: self.load(model), dirty: false });

        let now = Utc::now();
        match entry.file.shortcomings.iter_mut().find(|s| s.al_concept == al_concept) {
            Some(existing) => {
                let task_is_new = !existing.affected_tasks.iter().any(|t| t == task_id);
                if task_is_new {
                    existing.affected_tasks.push(task_id.to_string());
                    existing.occurrences += 1;
                }
                if let Some(code) = error_code {
                    if !existing.error_codes.iter().any(|c| c == code) {
                        existing.error_codes.push(code.to_string());
                    }
                }
            }
            None => {
                entry.file.shortcomings.push(ShortcomingEntry {
                    concept: concept.to_string(),
                    al_concept: al_concept.to_string(),
                    description: description.to_string(),
                    correct_pattern: correct_pattern.to_string(),
                    incorrect_pattern: incorrect_pattern.to_string(),
                    error_codes: error_code.map(|c| vec![c.to_string()]).unwrap_or_default(),
                    affected_tasks: vec![task_id.to_string()],
                    first_seen: now,
                    occurrences: 1,
                });
            }
        }
        entry.file.last_updated = now;
        entry.dirty = true;
    }

    /// Flushes one model's file if dirty. Used by the orchestrator after
    /// every recorded shortcoming so the pipeline is crash-safe.
    pub fn save_model(&self, model: &str) -> std::io::Result<()> {
        let mut cache = self.cache.write();
        let Some(entry) = cache.get_mut(model) else { return Ok(()) };
        if !entry.dirty {
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(model), serde_json::to_string_pretty(&entry.file)?)?;
        entry.dirty = false;
        Ok(())
    }

    /// Flushes every dirty model's file.
    pub fn save(&self) -> std::io::Result<()> {
        let models: Vec<String> = self.cache.read().keys().cloned().collect();
        for model in models {
            self.save_model(&model)?;
        }
        Ok(())
    }

    /// Returns a snapshot of `model`'s current catalog without persisting.
    pub fn snapshot(&self, model: &str) -> ShortcomingsFile {
        let mut cache = self.cache.write();
        cache.entry(model.to_string()).or_insert_with(|| CachedFile { file: self.load(model), dirty: false });
        cache.get(model).expect("just inserted").file.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_a_new_entry_on_first_sighting() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ShortcomingsTracker::new(dir.path());
        tracker.add("claude", "FlowField", "flowfields", "desc", "wrong", "right", Some("AL0118"), "CG-AL-E008");

        let snapshot = tracker.snapshot("claude");
        assert_eq!(snapshot.shortcomings.len(), 1);
        assert_eq!(snapshot.shortcomings[0].occurrences, 1);
        assert_eq!(snapshot.shortcomings[0].affected_tasks, vec!["CG-AL-E008"]);
    }

    #[test]
    fn dedups_by_al_concept_and_increments_occurrences_for_new_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ShortcomingsTracker::new(dir.path());
        tracker.add("claude", "FlowField", "flowfields", "desc", "wrong", "right", Some("AL0118"), "CG-AL-E008");
        tracker.add("claude", "FlowField", "flowfields", "desc", "wrong", "right", Some("AL0119"), "CG-AL-E009");

        let snapshot = tracker.snapshot("claude");
        assert_eq!(snapshot.shortcomings.len(), 1);
        assert_eq!(snapshot.shortcomings[0].occurrences, 2);
        assert_eq!(snapshot.shortcomings[0].error_codes, vec!["AL0118", "AL0119"]);
    }

    #[test]
    fn does_not_increment_occurrences_when_task_repeats() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ShortcomingsTracker::new(dir.path());
        tracker.add("claude", "FlowField", "flowfields", "desc", "wrong", "right", None, "CG-AL-E008");
        tracker.add("claude", "FlowField", "flowfields", "desc", "wrong", "right", None, "CG-AL-E008");

        let snapshot = tracker.snapshot("claude");
        assert_eq!(snapshot.shortcomings[0].occurrences, 1);
    }

    #[test]
    fn save_model_only_writes_when_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ShortcomingsTracker::new(dir.path());
        tracker.add("claude", "FlowField", "flowfields", "desc", "wrong", "right", None, "CG-AL-E008");
        tracker.save_model("claude").unwrap();

        let path = dir.path().join("claude.json");
        assert!(path.exists());
    }

    #[test]
    fn sanitizes_model_name_for_the_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ShortcomingsTracker::new(dir.path());
        tracker.add("claude-3.5/sonnet", "FlowField", "flowfields", "desc", "wrong", "right", None, "CG-AL-E008");
        tracker.save_model("claude-3.5/sonnet").unwrap();

        assert!(dir.path().join("claude-3.5_sonnet.json").exists());
    }
}
