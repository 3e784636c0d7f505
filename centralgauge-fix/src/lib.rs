//! Applies a benchmark-side fix (an exact `codeBefore`/`codeAfter` pair)
//! to a file robustly, with a colorized preview, pre-apply diagnostics,
//! and timestamped backups, per §4.8.

pub mod apply;
pub mod backup;
pub mod diff;
pub mod validate;

pub use apply::apply_fix;
pub use backup::{create_backup, restore_backup};
pub use diff::{generate_diff_preview, DiffColorLevel, DiffLine, DiffTheme};
pub use validate::{validate_fix, FixDiagnostic};
