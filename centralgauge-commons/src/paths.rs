//! Path helpers shared by the sandbox, verification, and fix crates.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving `.` and `..` components lexically, without
/// touching the filesystem. Used for the verify engine's `../verify-<ts>-<r>`
/// directory naming and for forward-slash-normalizing generated project paths.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Render a path using forward slashes regardless of platform, matching the
/// convention the verify orchestrator uses for `generatedCodePath`.
pub fn to_forward_slash(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Replace filesystem-reserved characters with `_`, used by the shortcomings
/// tracker to derive a per-model file name.
pub fn sanitize_filename_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
