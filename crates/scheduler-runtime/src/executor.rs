//! `Executor` (spec.md §4.6): soft (in-thread, cooperative timeout) and hard
//! (isolated subprocess, forced kill) execution modes.
//!
//! Hard mode is grounded on
//! `atomize-hq-codex-wrapper/crates/codex/src/process.rs`'s `tokio::process`
//! usage: spawn, stream/collect output concurrently, then race `child.wait()`
//! against `tokio::time::timeout` and `Child::kill` on elapsed. Since a
//! handler here is a `handler_id` looked up through [`HandlerRegistry`]
//! rather than an arbitrary binary, hard mode re-execs the current binary
//! with `--run-handler <id>` and feeds it `{args, kwargs}` as JSON on stdin
//! (see [`run_handler_subprocess_entrypoint`] for the child-side half of
//! this contract).

use std::path::PathBuf;
use std::time::Duration;

use scheduler_shared::domain::Task;
use scheduler_shared::error::ExecutorError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::warn;

use crate::handler_registry::HandlerRegistry;

/// Outcome of one execution attempt (spec.md §4.6's reply contract: exactly
/// one terminal outcome per task).
#[derive(Debug)]
pub enum ExecutionOutcome {
    Completed(serde_json::Value),
    Timeout,
    Failed(String),
}

pub struct ExecutorConfig {
    /// Path to the binary hard mode re-execs. Defaults to the current
    /// executable; overridable in tests.
    pub exe_path: PathBuf,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            exe_path: std::env::current_exe().unwrap_or_else(|_| PathBuf::from("schedulergodx-service")),
        }
    }
}

pub struct Executor {
    registry: HandlerRegistry,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(registry: HandlerRegistry, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    /// Runs `task`'s handler in a worker within this process. The worker
    /// may continue running past `lifetime` even after a timeout is
    /// reported — the documented weakness of soft mode (spec.md §4.6) that
    /// hard mode exists to avoid.
    pub async fn run_soft(&self, task: &Task) -> Result<ExecutionOutcome, ExecutorError> {
        let handler = self.registry.get(&task.handler_id)?;
        let args = task.args.clone();
        let kwargs = task.kwargs.clone();
        let lifetime = Duration::from_secs(task.lifetime_secs.max(0) as u64);

        let join = tokio::task::spawn_blocking(move || handler(args, kwargs));

        match tokio::time::timeout(lifetime, join).await {
            Ok(Ok(Ok(value))) => Ok(ExecutionOutcome::Completed(value)),
            Ok(Ok(Err(message))) => Ok(ExecutionOutcome::Failed(message)),
            Ok(Err(join_err)) => Ok(ExecutionOutcome::Failed(join_err.to_string())),
            Err(_elapsed) => {
                warn!(
                    task_id = %task.id,
                    "soft-mode handler exceeded lifetime; worker may still be running"
                );
                Ok(ExecutionOutcome::Timeout)
            }
        }
    }

    /// Runs `task`'s handler in a subprocess, forcibly killed on timeout.
    pub async fn run_hard(&self, task: &Task) -> Result<ExecutionOutcome, ExecutorError> {
        if !self.registry.contains(&task.handler_id) {
            return Err(ExecutorError::UnknownHandler(task.handler_id.clone()));
        }

        let payload = serde_json::to_vec(&serde_json::json!({
            "args": task.args,
            "kwargs": task.kwargs,
        }))
        .map_err(|e| ExecutorError::Subprocess(e.to_string()))?;

        let mut child = Command::new(&self.config.exe_path)
            .arg("--run-handler")
            .arg(&task.handler_id)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| ExecutorError::Subprocess(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| ExecutorError::Subprocess(e.to_string()))?;
        }

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();
        let stdout_reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(stdout) = stdout_handle.as_mut() {
                let _ = stdout.read_to_end(&mut buf).await;
            }
            buf
        });
        let stderr_reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(stderr) = stderr_handle.as_mut() {
                let _ = stderr.read_to_end(&mut buf).await;
            }
            buf
        });

        let lifetime = Duration::from_secs(task.lifetime_secs.max(0) as u64);
        let status = match tokio::time::timeout(lifetime, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(ExecutorError::Subprocess(e.to_string())),
            Err(_elapsed) => {
                let _ = child.kill().await;
                warn!(task_id = %task.id, "hard-mode subprocess forcibly killed on timeout");
                return Ok(ExecutionOutcome::Timeout);
            }
        };

        let stdout_bytes = stdout_reader.await.unwrap_or_default();
        let stderr_bytes = stderr_reader.await.unwrap_or_default();

        if status.success() {
            let value = serde_json::from_slice(&stdout_bytes)
                .map_err(|e| ExecutorError::Subprocess(e.to_string()))?;
            Ok(ExecutionOutcome::Completed(value))
        } else {
            Ok(ExecutionOutcome::Failed(
                String::from_utf8_lossy(&stderr_bytes).into_owned(),
            ))
        }
    }
}

/// Child-side half of hard mode: reads `{args, kwargs}` JSON from `stdin`,
/// invokes `handler_id` through `registry`, and writes the result JSON to
/// `stdout`. Returns the process exit code the caller should `exit` with.
pub fn run_handler_subprocess_entrypoint(
    registry: &HandlerRegistry,
    handler_id: &str,
    stdin: impl std::io::Read,
    mut stdout: impl std::io::Write,
) -> i32 {
    let input: serde_json::Value = match serde_json::from_reader(stdin) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("malformed subprocess input: {e}");
            return 1;
        }
    };
    let args = input.get("args").cloned().unwrap_or(serde_json::Value::Null);
    let kwargs = input.get("kwargs").cloned().unwrap_or(serde_json::Value::Null);

    let handler = match registry.get(handler_id) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    match handler(args, kwargs) {
        Ok(value) => {
            if serde_json::to_writer(&mut stdout, &value).is_err() {
                return 1;
            }
            0
        }
        Err(message) => {
            eprintln!("{message}");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_registry::HandlerRegistryBuilder;
    use scheduler_shared::domain::TaskStatusWire;
    use scheduler_shared::TaskStatus;

    fn sample_task(lifetime_secs: i64) -> Task {
        Task {
            id: "t1".to_string(),
            client: "c1".to_string(),
            handler_id: "echo".to_string(),
            args: serde_json::json!("hi"),
            kwargs: serde_json::json!({}),
            time_to_start: chrono::Utc::now(),
            lifetime_secs,
            hard: false,
            status: TaskStatusWire(TaskStatus::Waiting),
        }
    }

    #[tokio::test]
    async fn soft_mode_completes_within_lifetime() {
        let registry = HandlerRegistryBuilder::new()
            .register("echo", |args, _| Ok(args))
            .build();
        let executor = Executor::new(registry, ExecutorConfig::default());

        let outcome = executor.run_soft(&sample_task(5)).await.unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Completed(v) if v == serde_json::json!("hi")));
    }

    #[tokio::test]
    async fn soft_mode_times_out_on_slow_handler() {
        let registry = HandlerRegistryBuilder::new()
            .register("slow", |_, _| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(serde_json::json!("done"))
            })
            .build();
        let executor = Executor::new(registry, ExecutorConfig::default());
        let mut task = sample_task(0);
        task.handler_id = "slow".to_string();

        let outcome = executor.run_soft(&task).await.unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Timeout));
    }

    #[test]
    fn subprocess_entrypoint_writes_handler_result() {
        let registry = HandlerRegistryBuilder::new()
            .register("echo", |args, _| Ok(args))
            .build();

        let input = serde_json::json!({"args": "payload", "kwargs": {}}).to_string();
        let mut output = Vec::new();
        let code = run_handler_subprocess_entrypoint(
            &registry,
            "echo",
            input.as_bytes(),
            &mut output,
        );

        assert_eq!(code, 0);
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value, serde_json::json!("payload"));
    }
}
