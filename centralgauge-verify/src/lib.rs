//! Compiles an AL project, stages its prerequisite apps, injects
//! Test-Toolkit dependencies, and runs its tests against a provisioned
//! Business Central container, returning a structured outcome. The
//! actual compiler/container invocation is a collaborator
//! (`CompilerBackend`) this crate never implements.

pub mod app_json;
pub mod engine;
pub mod prereqs;

pub use app_json::{prepare_app_json_for_tests, test_toolkit_dependencies, Dependency};
pub use engine::{
    task_id_from_test_file_name, CompileError, CompileOutcome, CompilerBackend, TestFailure,
    TestOutcome, VerificationEngine, VerifyOutcome,
};
pub use prereqs::{resolve_prereqs, PrereqApp};
