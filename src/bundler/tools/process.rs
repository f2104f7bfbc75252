//! Run-scoped registry of spawned external processes.

use crate::bundler::error::{Error, Result};
use std::{
    collections::BTreeMap,
    ffi::OsStr,
    process::Output,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

/// Tracks in-flight subprocesses and terminates them on cancellation.
///
/// Every spawned tool races against the run's [`CancellationToken`]; when the
/// token fires the child is killed and reaped before the task returns
/// [`Error::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct ProcessRegistry {
    token: CancellationToken,
    in_flight: Arc<Mutex<BTreeMap<u64, String>>>,
    next_id: Arc<AtomicU64>,
}

impl ProcessRegistry {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            ..Default::default()
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Requests termination of every running and future subprocess.
    pub fn cancel(&self) {
        let running = self.running();
        if !running.is_empty() {
            log::warn!("Terminating {} running tool(s)", running.len());
            for command in running {
                log::debug!("  - {command}");
            }
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Command lines currently executing.
    pub fn running(&self) -> Vec<String> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Runs `program` to completion and returns its output.
    ///
    /// A non-zero exit status is returned as [`Error::ToolFailed`].
    pub async fn run<I, S>(&self, program: &str, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.as_ref().to_string_lossy().into_owned())
            .collect();
        let rendered = args.join(" ");

        let mut command = Command::new(program);
        command
            .args(&args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        log::debug!("Running {program} {rendered}");
        let child = command.spawn().map_err(|error| Error::CommandFailed {
            command: format!("{program} {rendered}"),
            error,
        })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.register(id, format!("{program} {rendered}"));
        let result = self.wait(child).await;
        self.unregister(id);

        let output = result.map_err(|error| match error {
            WaitError::Cancelled => Error::Cancelled,
            WaitError::Io(error) => Error::CommandFailed {
                command: format!("{program} {rendered}"),
                error,
            },
        })?;

        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool: program.to_string(),
                args: rendered,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    async fn wait(&self, mut child: Child) -> std::result::Result<Output, WaitError> {
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = {
            let collect = async {
                let (out, err, status) =
                    tokio::join!(read_all(stdout), read_all(stderr), child.wait());
                Ok::<_, std::io::Error>(Output {
                    status: status?,
                    stdout: out?,
                    stderr: err?,
                })
            };
            tokio::select! {
                output = collect => Some(output),
                _ = self.token.cancelled() => None,
            }
        };

        match outcome {
            Some(output) => output.map_err(WaitError::Io),
            None => {
                if let Err(e) = child.kill().await {
                    log::warn!("Failed to terminate tool process: {e}");
                }
                Err(WaitError::Cancelled)
            }
        }
    }

    fn register(&self, id: u64, command: String) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, command);
    }

    fn unregister(&self, id: u64) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

enum WaitError {
    Cancelled,
    Io(std::io::Error),
}

async fn read_all<R>(reader: Option<R>) -> std::io::Result<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    use tokio::io::AsyncReadExt;
    let mut buffer = Vec::new();
    if let Some(mut reader) = reader {
        reader.read_to_end(&mut buffer).await?;
    }
    Ok(buffer)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn captures_output_of_successful_tools() {
        let registry = ProcessRegistry::default();
        let output = registry.run("sh", ["-c", "echo linked"]).await.unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "linked");
        assert!(registry.running().is_empty());
    }

    #[test]
    fn poisoned_registry_keeps_tracking() {
        let registry = ProcessRegistry::default();
        let in_flight = registry.in_flight.clone();
        let _ = std::thread::spawn(move || {
            let _guard = in_flight.lock().unwrap();
            panic!("tool thread died");
        })
        .join();
        assert!(registry.in_flight.is_poisoned());

        registry.register(7, "codesign --force".into());
        assert_eq!(registry.running(), vec!["codesign --force".to_string()]);
        registry.unregister(7);
        assert!(registry.running().is_empty());
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_tool_failure() {
        let registry = ProcessRegistry::default();
        let err = registry
            .run("sh", ["-c", "echo broken >&2; exit 3"])
            .await
            .unwrap_err();
        match err {
            Error::ToolFailed { tool, stderr, .. } => {
                assert_eq!(tool, "sh");
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unknown_program_cannot_be_spawned() {
        let registry = ProcessRegistry::default();
        let err = registry
            .run("definitely-not-a-real-tool", ["--version"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn cancellation_terminates_running_tools() {
        let registry = ProcessRegistry::default();
        let runner = registry.clone();
        let task = tokio::spawn(async move { runner.run("sleep", ["30"]).await });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(registry.running().len(), 1);
        registry.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("tool was not terminated")
            .unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(registry.running().is_empty());

        // Nothing new starts after cancellation.
        assert!(matches!(
            registry.run("true", Vec::<String>::new()).await,
            Err(Error::Cancelled)
        ));
    }
}
