//! Loads agent YAML documents from a directory and caches their resolved
//! form by id.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use centralgauge_core::{AgentConfig, ConfigError};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::raw::RawAgentConfig;
use crate::resolve;

/// Holds every raw agent document discovered under a config directory and
/// memoizes resolved configs by id, mirroring the lifecycle described for
/// `AgentConfig`: loaded once, resolved through inheritance, cached.
pub struct AgentConfigStore {
    raw: HashMap<String, RawAgentConfig>,
    resolved: RwLock<HashMap<String, Arc<AgentConfig>>>,
}

impl AgentConfigStore {
    pub fn from_table(raw: HashMap<String, RawAgentConfig>) -> Self {
        Self { raw, resolved: RwLock::new(HashMap::new()) }
    }

    /// Scan `dir` for `*.yml`/`*.yaml` files, parsing each as a
    /// `RawAgentConfig`. A document's key is its `id` field if present,
    /// otherwise the file stem.
    pub fn load_dir(dir: &Path) -> Result<Self, ConfigError> {
        let mut raw = HashMap::new();
        for entry in WalkDir::new(dir).into_iter().filter_map(|entry| entry.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let is_yaml = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));
            if !is_yaml {
                continue;
            }
            let contents = std::fs::read_to_string(entry.path())
                .map_err(|source| ConfigError::Io { path: entry.path().to_path_buf(), source })?;
            let parsed: RawAgentConfig = serde_yaml::from_str(&contents).map_err(|source| {
                ConfigError::Parse { path: entry.path().to_path_buf(), source }
            })?;
            let key = parsed
                .id
                .clone()
                .or_else(|| entry.path().file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_else(|| entry.path().to_string_lossy().into_owned());
            if raw.insert(key.clone(), parsed).is_some() {
                warn!(id = %key, path = %entry.path().display(), "duplicate agent config id; last one wins");
            } else {
                debug!(id = %key, path = %entry.path().display(), "loaded agent config document");
            }
        }
        Ok(Self::from_table(raw))
    }

    /// Resolve `id` through its `extends` chain, returning a cached
    /// `Arc<AgentConfig>` on repeat calls.
    pub async fn resolve(&self, id: &str) -> Result<Arc<AgentConfig>, ConfigError> {
        if let Some(cached) = self.resolved.read().await.get(id) {
            return Ok(cached.clone());
        }
        let resolved = Arc::new(resolve::resolve(id, &self.raw)?);
        self.resolved.write().await.insert(id.to_string(), resolved.clone());
        Ok(resolved)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.raw.keys().map(String::as_str)
    }
}
