use crate::backup::{self, FileError};
use crate::pid;
use crate::request::{ApplyRequest, StageOutcome};
use crate::shell::{self, CommandRunner, ShellRunner};
use crate::subs::{self, ReconcileError};
use crate::vars;
use std::collections::HashMap;

pub const PID_VAR: &str = "pid";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error(transparent)]
    File(#[from] FileError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error("reload command `{command}` failed: {detail}")]
    Reload { command: String, detail: String },
}

impl ApplyError {
    /// Configuration errors are the caller's fault; everything else is the
    /// environment's.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ApplyError::Reconcile(ReconcileError::UnknownMode(_))
        )
    }
}

/// A failed apply: the error plus every stage outcome that completed before
/// it. Files written by completed stages stay written; there is no rollback.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ApplyFailure {
    pub completed: Vec<StageOutcome>,
    pub error: ApplyError,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine<R = ShellRunner> {
    runner: R,
}

impl Engine<ShellRunner> {
    pub fn new() -> Self {
        Self { runner: ShellRunner }
    }
}

impl Default for Engine<ShellRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> Engine<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    /// Runs the request through primary write, sub-config reconciliation, and
    /// reload, in that order. Stages with empty inputs are skipped outright;
    /// the first fatal error stops the pipeline.
    pub async fn apply(&self, request: &ApplyRequest) -> Result<Vec<StageOutcome>, ApplyFailure> {
        let mut completed = Vec::new();
        match self.run_stages(request, &mut completed).await {
            Ok(()) => Ok(completed),
            Err(error) => Err(ApplyFailure { completed, error }),
        }
    }

    async fn run_stages(
        &self,
        request: &ApplyRequest,
        results: &mut Vec<StageOutcome>,
    ) -> Result<(), ApplyError> {
        if !request.path.is_empty() {
            let written = backup::write_content(&request.path, &request.content)?;
            results.push(StageOutcome::Primary {
                path: written.path.display().to_string(),
                outcome: written.outcome,
            });
        }

        if !request.sub_dir.is_empty() && !request.subs.is_empty() {
            results.extend(subs::reconcile(
                &request.sub_dir,
                &request.subs,
                &request.sub_mode,
            )?);
        }

        if !request.reload_cmd.is_empty() {
            results.push(self.reload(request).await?);
        }

        Ok(())
    }

    async fn reload(&self, request: &ApplyRequest) -> Result<StageOutcome, ApplyError> {
        let mut variables = HashMap::new();
        // The pid spec is only consulted when the command asks for it
        if vars::references(&request.reload_cmd, PID_VAR) {
            let pid = pid::find_pid(&request.pid, &self.runner).await;
            variables.insert(PID_VAR.to_string(), pid);
        }

        let command = vars::substitute(&request.reload_cmd, &variables);
        let result = self.runner.run(&command, shell::command_timeout()).await;
        // Anything short of a clean zero exit fails the request
        if !result.succeeded() {
            return Err(ApplyError::Reload {
                command,
                detail: result.failure_detail(),
            });
        }

        Ok(StageOutcome::Reload {
            command,
            output: result.stdout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::WriteOutcome;
    use crate::shell::RunResult;
    use std::collections::BTreeMap;
    use std::fs;
    use std::future::{Future, ready};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeRunner {
        calls: Mutex<Vec<String>>,
        results: Mutex<Vec<RunResult>>,
    }

    impl FakeRunner {
        fn ok() -> Self {
            Self::with_results(vec![])
        }

        fn with_results(results: Vec<RunResult>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                results: Mutex::new(results),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, command: &str, _timeout: Duration) -> impl Future<Output = RunResult> + Send {
            self.calls.lock().unwrap().push(command.to_string());
            let mut results = self.results.lock().unwrap();
            let result = if results.is_empty() {
                RunResult {
                    exit_code: Some(0),
                    ..RunResult::default()
                }
            } else {
                results.remove(0)
            };
            ready(result)
        }
    }

    fn subs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_empty_request_does_nothing() {
        let runner = FakeRunner::ok();
        let engine = Engine::with_runner(runner);

        let results = engine.apply(&ApplyRequest::default()).await.unwrap();

        assert!(results.is_empty());
        assert!(engine.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_primary_write_only() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("app.conf");
        let engine = Engine::with_runner(FakeRunner::ok());

        let request = ApplyRequest {
            path: target.to_string_lossy().into_owned(),
            content: "listen 80;\n".to_string(),
            ..ApplyRequest::default()
        };
        let results = engine.apply(&request).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0],
            StageOutcome::Primary {
                path: target.display().to_string(),
                outcome: WriteOutcome::Created,
            }
        );
        assert_eq!(fs::read_to_string(&target).unwrap(), "listen 80;\n");
    }

    #[tokio::test]
    async fn test_empty_content_with_path_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("app.conf");
        fs::write(&target, "old").unwrap();
        let engine = Engine::with_runner(FakeRunner::ok());

        let request = ApplyRequest {
            path: target.to_string_lossy().into_owned(),
            ..ApplyRequest::default()
        };
        engine.apply(&request).await.unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "");
    }

    #[tokio::test]
    async fn test_subs_skipped_without_dir() {
        let engine = Engine::with_runner(FakeRunner::ok());
        let request = ApplyRequest {
            subs: subs(&[("a.conf", "x")]),
            ..ApplyRequest::default()
        };

        let results = engine.apply(&request).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_subs_skipped_without_entries() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("conf.d");
        let engine = Engine::with_runner(FakeRunner::ok());

        let request = ApplyRequest {
            sub_dir: target.to_string_lossy().into_owned(),
            ..ApplyRequest::default()
        };
        let results = engine.apply(&request).await.unwrap();

        assert!(results.is_empty());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_full_pipeline_order() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::with_runner(FakeRunner::ok());

        let request = ApplyRequest {
            path: dir.path().join("app.conf").to_string_lossy().into_owned(),
            content: "include conf.d/*.conf;\n".to_string(),
            sub_dir: dir.path().join("conf.d").to_string_lossy().into_owned(),
            subs: subs(&[("a.conf", "alpha")]),
            reload_cmd: "kill -s HUP ${pid}".to_string(),
            pid: "42".to_string(),
            ..ApplyRequest::default()
        };
        let results = engine.apply(&request).await.unwrap();

        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], StageOutcome::Primary { .. }));
        assert!(matches!(results[1], StageOutcome::Sub { .. }));
        assert_eq!(
            results[2],
            StageOutcome::Reload {
                command: "kill -s HUP 42".to_string(),
                output: vec![],
            }
        );
        assert_eq!(engine.runner.calls(), vec!["kill -s HUP 42"]);
    }

    #[tokio::test]
    async fn test_pid_not_resolved_without_placeholder() {
        let engine = Engine::with_runner(FakeRunner::ok());

        let request = ApplyRequest {
            reload_cmd: "nginx -s reload".to_string(),
            pid: "pgrep nginx".to_string(),
            ..ApplyRequest::default()
        };
        engine.apply(&request).await.unwrap();

        // One call for the reload itself, none for the pid probe
        assert_eq!(engine.runner.calls(), vec!["nginx -s reload"]);
    }

    #[tokio::test]
    async fn test_unknown_mode_keeps_primary_result() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::with_runner(FakeRunner::ok());

        let request = ApplyRequest {
            path: dir.path().join("app.conf").to_string_lossy().into_owned(),
            content: "x".to_string(),
            sub_dir: dir.path().join("conf.d").to_string_lossy().into_owned(),
            sub_mode: "merge".to_string(),
            subs: subs(&[("a.conf", "alpha")]),
            reload_cmd: "nginx -s reload".to_string(),
            ..ApplyRequest::default()
        };
        let failure = engine.apply(&request).await.unwrap_err();

        assert_eq!(failure.completed.len(), 1);
        assert!(matches!(failure.completed[0], StageOutcome::Primary { .. }));
        assert!(failure.error.is_client_error());
        // Reload never ran
        assert!(engine.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_primary_failure_aborts_subs() {
        let dir = tempfile::tempdir().unwrap();
        let sub_dir = dir.path().join("conf.d");
        let engine = Engine::with_runner(FakeRunner::ok());

        let request = ApplyRequest {
            path: dir.path().join("missing").join("app.conf").to_string_lossy().into_owned(),
            content: "x".to_string(),
            sub_dir: sub_dir.to_string_lossy().into_owned(),
            subs: subs(&[("a.conf", "alpha")]),
            ..ApplyRequest::default()
        };
        let failure = engine.apply(&request).await.unwrap_err();

        assert!(failure.completed.is_empty());
        assert!(!failure.error.is_client_error());
        assert!(!sub_dir.exists());
    }

    #[tokio::test]
    async fn test_reload_nonzero_exit_fails() {
        let engine = Engine::with_runner(FakeRunner::with_results(vec![RunResult {
            exit_code: Some(1),
            stderr: vec!["reload failed".to_string()],
            ..RunResult::default()
        }]));

        let request = ApplyRequest {
            reload_cmd: "nginx -s reload".to_string(),
            ..ApplyRequest::default()
        };
        let failure = engine.apply(&request).await.unwrap_err();

        let ApplyError::Reload { command, detail } = &failure.error else {
            panic!("expected Reload error, got {:?}", failure.error);
        };
        assert_eq!(command, "nginx -s reload");
        assert!(detail.contains("exit code 1"));
        assert!(detail.contains("reload failed"));
    }

    #[tokio::test]
    async fn test_reload_execution_error_fails() {
        let engine = Engine::with_runner(FakeRunner::with_results(vec![RunResult {
            error: Some("timed out after 10000ms".to_string()),
            ..RunResult::default()
        }]));

        let request = ApplyRequest {
            reload_cmd: "nginx -s reload".to_string(),
            ..ApplyRequest::default()
        };
        let failure = engine.apply(&request).await.unwrap_err();

        assert!(failure.error.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_reload_output_captured() {
        let engine = Engine::with_runner(FakeRunner::with_results(vec![RunResult {
            exit_code: Some(0),
            stdout: vec!["reloaded".to_string()],
            ..RunResult::default()
        }]));

        let request = ApplyRequest {
            reload_cmd: "systemctl reload app".to_string(),
            ..ApplyRequest::default()
        };
        let results = engine.apply(&request).await.unwrap();

        assert_eq!(
            results[0],
            StageOutcome::Reload {
                command: "systemctl reload app".to_string(),
                output: vec!["reloaded".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn test_pid_probe_feeds_reload_command() {
        let engine = Engine::with_runner(FakeRunner::with_results(vec![
            // First call: the pid probe
            RunResult {
                exit_code: Some(0),
                stdout: vec!["4242".to_string()],
                ..RunResult::default()
            },
            // Second call: the reload itself
            RunResult {
                exit_code: Some(0),
                ..RunResult::default()
            },
        ]));

        let request = ApplyRequest {
            reload_cmd: "kill -s HUP ${pid}".to_string(),
            pid: "pgrep nginx".to_string(),
            ..ApplyRequest::default()
        };
        engine.apply(&request).await.unwrap();

        assert_eq!(
            engine.runner.calls(),
            vec!["pgrep nginx", "kill -s HUP 4242"]
        );
    }
}
