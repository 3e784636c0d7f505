//! `VerificationEngine`: compiles an AL project, stages its prerequisite
//! apps and Test-Toolkit dependencies, and runs its tests against a
//! provisioned Business Central container, per §4.3.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use async_trait::async_trait;
use centralgauge_commons::{random_base36, to_base36};
use centralgauge_core::VerifyError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app_json::{prepare_app_json_for_tests, Dependency};
use crate::prereqs::{resolve_prereqs, PrereqApp};

/// One AL compiler diagnostic, verbatim from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileError {
    pub code: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// One failing test, as reported by the backend's test runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFailure {
    pub name: String,
    pub error: String,
}

/// The outcome of compiling one project: either a published `.app` file
/// or a list of verbatim compiler errors.
#[derive(Debug, Clone)]
pub enum CompileOutcome {
    Success { app_path: PathBuf },
    Failure { errors: Vec<CompileError> },
}

/// The outcome of running a combined project's tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Pass { passed_tests: u32, total_tests: u32 },
    Fail { failures: Vec<TestFailure> },
}

/// The final, structured result of one verification request.
#[derive(Debug)]
pub enum VerifyOutcome {
    /// A prereq in the chain failed to compile; verification never reached
    /// the target project.
    PrereqCompileFailed { task_id: String, errors: Vec<CompileError> },
    /// The combined project itself failed to compile.
    CompileFailed { errors: Vec<CompileError> },
    Tested(TestOutcome),
}

/// Collaborator abstracting the actual AL compiler / test runner
/// container invocation, out of this crate's core per the spec's
/// container-provider boundary.
#[async_trait]
pub trait CompilerBackend: Send + Sync {
    async fn compile(&self, project_dir: &Path) -> Result<CompileOutcome, VerifyError>;
    async fn publish(&self, app_path: &Path) -> Result<(), VerifyError>;
    async fn run_tests(
        &self,
        project_dir: &Path,
        codeunit_id: Option<u32>,
    ) -> Result<TestOutcome, VerifyError>;
}

fn task_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(CG-AL-[A-Z]\d+)").expect("valid regex"))
}

/// Extract the `taskId` from a test-file name per the `^(CG-AL-[A-Z]\d+)`
/// pattern.
pub fn task_id_from_test_file_name(test_file: &Path) -> Result<String, VerifyError> {
    let name = test_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    task_id_re()
        .captures(&name)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| VerifyError::UnrecognizedTestFileName(test_file.to_path_buf()))
}

pub struct VerificationEngine<'a> {
    backend: &'a dyn CompilerBackend,
}

impl<'a> VerificationEngine<'a> {
    pub fn new(backend: &'a dyn CompilerBackend) -> Self {
        Self { backend }
    }

    /// Runs the full workflow in §4.3: resolve prereqs, compile them in
    /// order, stage an isolated verify directory with the merged
    /// `app.json` and source/test files, compile the combined project,
    /// publish prereqs, and run tests.
    pub async fn verify(
        &self,
        project_dir: &Path,
        test_file: &Path,
        repo_root: &Path,
        codeunit_id: Option<u32>,
    ) -> Result<VerifyOutcome, VerifyError> {
        let task_id = task_id_from_test_file_name(test_file)?;
        info!(task_id = %task_id, "resolving verification prerequisites");

        let prereqs = resolve_prereqs(repo_root, &task_id)?;

        let mut compiled_prereqs = Vec::with_capacity(prereqs.len());
        for prereq in &prereqs {
            match self.backend.compile(&prereq.dir).await? {
                CompileOutcome::Success { app_path } => compiled_prereqs.push(app_path),
                CompileOutcome::Failure { errors } => {
                    warn!(task_id = %prereq.task_id, "prerequisite failed to compile");
                    return Ok(VerifyOutcome::PrereqCompileFailed {
                        task_id: prereq.task_id.clone(),
                        errors,
                    });
                }
            }
        }

        let verify_dir = self.stage_verify_dir(project_dir, test_file, prereqs.last())?;

        let outcome = match self.backend.compile(&verify_dir).await? {
            CompileOutcome::Success { .. } => {
                for app_path in &compiled_prereqs {
                    self.backend.publish(app_path).await?;
                }
                VerifyOutcome::Tested(self.backend.run_tests(&verify_dir, codeunit_id).await?)
            }
            CompileOutcome::Failure { errors } => VerifyOutcome::CompileFailed { errors },
        };

        Ok(outcome)
    }

    fn stage_verify_dir(
        &self,
        project_dir: &Path,
        test_file: &Path,
        last_prereq: Option<&PrereqApp>,
    ) -> Result<PathBuf, VerifyError> {
        let verify_dir = fresh_verify_dir(project_dir);
        std::fs::create_dir_all(&verify_dir)
            .map_err(|source| VerifyError::Io { path: verify_dir.clone(), source })?;

        let app_json_path = project_dir.join("app.json");
        let raw = std::fs::read_to_string(&app_json_path)
            .map_err(|source| VerifyError::AppJsonRead { path: app_json_path.clone(), source })?;
        let mut app_json: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|source| VerifyError::AppJsonParse { path: app_json_path, source })?;

        let prereq_dependency = last_prereq.and_then(|prereq| {
            let id = prereq.app_json.get("id")?.as_str()?;
            Some(Dependency {
                id: uuid::Uuid::parse_str(id).ok()?,
                name: prereq
                    .app_json
                    .get("name")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or(&prereq.task_id)
                    .to_string(),
                publisher: prereq
                    .app_json
                    .get("publisher")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("CentralGauge")
                    .to_string(),
                version: prereq
                    .app_json
                    .get("version")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("1.0.0.0")
                    .to_string(),
            })
        });
        prepare_app_json_for_tests(&mut app_json, prereq_dependency.as_ref());

        let merged = serde_json::to_string_pretty(&app_json).unwrap_or(raw);
        std::fs::write(verify_dir.join("app.json"), merged)
            .map_err(|source| VerifyError::Io { path: verify_dir.clone(), source })?;

        for entry in std::fs::read_dir(project_dir)
            .map_err(|source| VerifyError::Io { path: project_dir.to_path_buf(), source })?
        {
            let entry = entry.map_err(|source| VerifyError::Io { path: project_dir.to_path_buf(), source })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("al") {
                let dest = verify_dir.join(path.file_name().expect("al file has a name"));
                std::fs::copy(&path, &dest).map_err(|source| VerifyError::Io { path: dest, source })?;
            }
        }

        let test_dest = verify_dir.join(test_file.file_name().expect("test file has a name"));
        std::fs::copy(test_file, &test_dest)
            .map_err(|source| VerifyError::Io { path: test_dest, source })?;

        Ok(verify_dir)
    }
}

fn fresh_verify_dir(project_dir: &Path) -> PathBuf {
    let parent = project_dir.parent().unwrap_or(project_dir);
    let ts36 = to_base36(
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0),
    );
    let r36 = random_base36(6);
    centralgauge_commons::normalize_path(&parent.join(format!("verify-{ts36}-{r36}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn task_id_from_test_file_name_extracts_the_prefix() {
        let path = Path::new("tests/al/easy/CG-AL-E008.Test.al");
        assert_eq!(task_id_from_test_file_name(path).unwrap(), "CG-AL-E008");
    }

    #[test]
    fn task_id_from_test_file_name_rejects_unrecognized_names() {
        let path = Path::new("tests/al/easy/SomeOtherFile.al");
        assert!(task_id_from_test_file_name(path).is_err());
    }

    struct RecordingBackend {
        compile_calls: Mutex<u32>,
        compile_result: CompileOutcome,
        test_result: Mutex<Option<TestOutcome>>,
    }

    #[async_trait]
    impl CompilerBackend for RecordingBackend {
        async fn compile(&self, _project_dir: &Path) -> Result<CompileOutcome, VerifyError> {
            *self.compile_calls.lock().unwrap() += 1;
            Ok(match &self.compile_result {
                CompileOutcome::Success { app_path } => {
                    CompileOutcome::Success { app_path: app_path.clone() }
                }
                CompileOutcome::Failure { errors } => CompileOutcome::Failure { errors: errors.clone() },
            })
        }

        async fn publish(&self, _app_path: &Path) -> Result<(), VerifyError> {
            Ok(())
        }

        async fn run_tests(
            &self,
            _project_dir: &Path,
            _codeunit_id: Option<u32>,
        ) -> Result<TestOutcome, VerifyError> {
            Ok(self.test_result.lock().unwrap().take().unwrap_or(TestOutcome::Pass {
                passed_tests: 1,
                total_tests: 1,
            }))
        }
    }

    fn write_project(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join("app.json"),
            serde_json::to_string(&serde_json::json!({
                "id": "11111111-1111-1111-1111-111111111111",
                "name": "Sample",
                "publisher": "Acme",
                "version": "1.0.0.0",
                "dependencies": [],
            }))
            .unwrap(),
        )
        .unwrap();
        std::fs::write(dir.join("Codeunit1.al"), "codeunit 50100 Thing { }").unwrap();
    }

    #[tokio::test]
    async fn verify_stages_and_compiles_when_no_prereqs_exist() {
        let root = tempfile::tempdir().unwrap();
        let project_dir = root.path().join("project");
        write_project(&project_dir);
        let test_file = root.path().join("CG-AL-E008.Test.al");
        std::fs::write(&test_file, "codeunit 50101 \"CG-AL-E008 Test\" { }").unwrap();

        let backend = RecordingBackend {
            compile_calls: Mutex::new(0),
            compile_result: CompileOutcome::Success { app_path: root.path().join("out.app") },
            test_result: Mutex::new(Some(TestOutcome::Pass { passed_tests: 3, total_tests: 3 })),
        };
        let engine = VerificationEngine::new(&backend);
        let outcome = engine.verify(&project_dir, &test_file, root.path(), None).await.unwrap();

        assert!(matches!(outcome, VerifyOutcome::Tested(TestOutcome::Pass { passed_tests: 3, total_tests: 3 })));
        assert_eq!(*backend.compile_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn verify_returns_compile_failure_without_running_tests() {
        let root = tempfile::tempdir().unwrap();
        let project_dir = root.path().join("project");
        write_project(&project_dir);
        let test_file = root.path().join("CG-AL-E009.Test.al");
        std::fs::write(&test_file, "codeunit 50102 \"CG-AL-E009 Test\" { }").unwrap();

        let errors = vec![CompileError {
            code: "AL0118".to_string(),
            file: "Codeunit1.al".to_string(),
            line: 3,
            column: 5,
            message: "unknown identifier".to_string(),
        }];
        let backend = RecordingBackend {
            compile_calls: Mutex::new(0),
            compile_result: CompileOutcome::Failure { errors: errors.clone() },
            test_result: Mutex::new(None),
        };
        let engine = VerificationEngine::new(&backend);
        let outcome = engine.verify(&project_dir, &test_file, root.path(), None).await.unwrap();

        match outcome {
            VerifyOutcome::CompileFailed { errors: got } => assert_eq!(got, errors),
            other => panic!("expected CompileFailed, got {other:?}"),
        }
    }
}
