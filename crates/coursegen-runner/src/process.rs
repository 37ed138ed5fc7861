//! The process-backed [`ProcessExecutor`].

use crate::command_spec::CommandSpec;
use async_trait::async_trait;
use coursegen_config::{Config, PhaseCommand};
use coursegen_model::PlanId;
use coursegen_phase_api::{AbortSignal, ExecutorError, LogSink, PhaseExecutor, PhaseId};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Child;
use tracing::{debug, warn};

/// Maximum bytes of child stderr retained for failure details.
const STDERR_TAIL_BYTES: usize = 2048;

/// Phase executor that runs one external command per phase.
///
/// The command table comes from configuration (`[phases.<id>]`). Child
/// stdout is streamed to the log sink line by line; on abort the child is
/// killed; on non-zero exit the retained stderr tail becomes the failure
/// detail.
pub struct ProcessExecutor {
    commands: HashMap<PhaseId, PhaseCommand>,
}

impl ProcessExecutor {
    /// Build an executor from configured phase command templates.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let commands = PhaseId::ALL
            .into_iter()
            .filter_map(|phase| {
                config
                    .phase_command(phase)
                    .map(|template| (phase, template.clone()))
            })
            .collect();
        Self { commands }
    }

    /// Build an executor from an explicit command table.
    #[must_use]
    pub fn new(commands: HashMap<PhaseId, PhaseCommand>) -> Self {
        Self { commands }
    }

    fn spawn_child(&self, spec: &CommandSpec, phase: PhaseId) -> Result<Child, ExecutorError> {
        let mut cmd = spec.to_tokio_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd.spawn().map_err(|e| ExecutorError::Spawn {
            phase,
            reason: format!("failed to spawn '{}': {e}", spec.program.to_string_lossy()),
        })
    }
}

/// Keep at most the trailing `STDERR_TAIL_BYTES` of the child's stderr.
fn truncate_tail(buf: &str) -> String {
    if buf.len() <= STDERR_TAIL_BYTES {
        return buf.trim_end().to_string();
    }
    let start = buf.len() - STDERR_TAIL_BYTES;
    // Back off to a char boundary.
    let start = (start..buf.len())
        .find(|i| buf.is_char_boundary(*i))
        .unwrap_or(buf.len());
    buf[start..].trim_end().to_string()
}

#[async_trait]
impl PhaseExecutor for ProcessExecutor {
    async fn execute(
        &self,
        plan_id: &PlanId,
        phase: PhaseId,
        log: &dyn LogSink,
        abort: &AbortSignal,
    ) -> Result<(), ExecutorError> {
        let template = self.commands.get(&phase).ok_or_else(|| ExecutorError::Spawn {
            phase,
            reason: format!("no executor command configured for phase '{phase}'"),
        })?;

        let spec = CommandSpec::from_template(template, plan_id, phase);
        debug!(plan = %plan_id, %phase, program = %spec.program.to_string_lossy(), "spawning phase executor");

        let mut child = self.spawn_child(&spec, phase)?;

        let stdout = child.stdout.take().ok_or_else(|| ExecutorError::Spawn {
            phase,
            reason: "child stdout was not captured".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| ExecutorError::Spawn {
            phase,
            reason: "child stderr was not captured".to_string(),
        })?;

        // Drain stderr concurrently so a chatty child cannot deadlock on a
        // full pipe while we read stdout.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let mut reader = BufReader::new(stderr);
            let _ = reader.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => log.append(&line),
                    Ok(None) => break,
                    Err(e) => {
                        warn!(plan = %plan_id, %phase, error = %e, "stdout stream error");
                        break;
                    }
                },
                () = abort.aborted() => {
                    let _ = child.kill().await;
                    stderr_task.abort();
                    return Err(ExecutorError::Aborted { phase });
                }
            }
        }

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            () = abort.aborted() => None,
        };
        let status = match waited {
            Some(status) => status.map_err(|e| ExecutorError::Spawn {
                phase,
                reason: format!("failed to reap child: {e}"),
            })?,
            None => {
                let _ = child.kill().await;
                stderr_task.abort();
                return Err(ExecutorError::Aborted { phase });
            }
        };

        let stderr_tail = truncate_tail(&stderr_task.await.unwrap_or_default());

        if status.success() {
            Ok(())
        } else {
            let code = status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            let detail = if stderr_tail.is_empty() {
                format!("exit status {code}")
            } else {
                format!("exit status {code}: {stderr_tail}")
            };
            Err(ExecutorError::Failed { phase, detail })
        }
    }
}
