//! Shared helpers reused across the CentralGauge component crates.
//!
//! Kept deliberately small: each extracted crate (`centralgauge-agent`,
//! `centralgauge-sandbox`, `centralgauge-verify`, `centralgauge-analysis`,
//! `centralgauge-fix`) depends on this crate for path handling, id
//! generation, and a generic telemetry sink, but never on each other's
//! internals.

pub mod paths;
pub mod slug;
pub mod telemetry;

pub use paths::{normalize_path, sanitize_filename_component, to_forward_slash};
pub use slug::{random_base36, to_base36};
pub use telemetry::{NoopTelemetry, RecordingTelemetry, TelemetrySink};
