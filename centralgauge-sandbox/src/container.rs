//! The abstract container-provider interface the sandbox executor drives.
//! Concrete provider drivers (Windows containers, Docker, etc.) are
//! collaborators outside this spec's core — only the trait and the
//! request/output shapes the executor builds are defined here.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

/// One container the sandbox executor asks a provider to create.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub bind_mounts: Vec<BindMount>,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct BindMount {
    pub host_path: PathBuf,
    pub container_path: String,
}

/// The combined stdout+stderr text and exit status of a completed
/// container run.
#[derive(Debug, Clone, Default)]
pub struct ContainerOutput {
    pub combined_output: String,
    pub exit_code: Option<i32>,
}

/// A running container handle, destroyed exactly once on every exit path.
#[async_trait]
pub trait ContainerHandle: Send + Sync {
    /// Stream stdout/stderr until the entrypoint exits or `timeout`
    /// elapses, whichever is first. Returns `None` on timeout.
    async fn wait_with_timeout(&mut self, timeout: std::time::Duration) -> Option<ContainerOutput>;

    /// Destroy the container. Best-effort; swallows its own errors.
    async fn destroy(&mut self);
}

/// Abstract container runtime. A concrete driver (e.g. Windows-container
/// mode) implements this; this spec only defines the interface the
/// sandbox executor needs.
#[async_trait]
pub trait ContainerProvider: Send + Sync {
    /// Whether this provider's platform is available on the current host.
    async fn is_available(&self) -> bool;

    /// Best-effort pruning of stale containers left over from prior
    /// interrupted runs. Swallows its own errors.
    async fn prune_stale(&self);

    /// Create and start a container from `spec`.
    async fn create(&self, spec: ContainerSpec) -> Result<Box<dyn ContainerHandle>, String>;
}
