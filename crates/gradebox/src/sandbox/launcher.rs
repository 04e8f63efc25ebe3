//! Sandbox process supervision
//!
//! Runs one execution request to completion inside a fresh container:
//! admission, launch, payload hand-off, deadline enforcement, teardown,
//! and output parsing. The calling task blocks for the duration of the
//! sandbox run.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::pool::SlotPool;
use crate::sandbox::{DockerCommand, SandboxError};
use crate::types::{CaseResult, ExecutionRequest, ResultBatch};

/// Execute one request in a fresh sandbox and return its result batch.
///
/// Blocks until a concurrency slot is free, then runs the whole batch
/// inside a single container invocation. The slot is released on every
/// exit path; on timeout the container is force-destroyed by name.
#[instrument(skip_all, fields(cases = request.test_cases.len()))]
pub async fn run_batch(
    config: &Config,
    pool: &SlotPool,
    request: &ExecutionRequest,
) -> Result<Vec<CaseResult>, SandboxError> {
    let payload = serde_json::to_vec(request)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;

    let slot = pool.acquire().await?;
    let name = container_name(config, slot.id());

    debug!(%name, "sandbox slot acquired");
    let result = supervise(config, &name, &payload).await;
    debug!(%name, ok = result.is_ok(), "sandbox run finished");

    // `slot` drops here, returning the id to the pool on every path
    result
}

/// Derive the container name for a slot id
pub(crate) fn container_name(config: &Config, slot_id: u32) -> String {
    format!("{}{}", config.container_prefix, slot_id)
}

/// Launch the container, feed it the payload, and wait for its exit
/// under the configured deadline.
async fn supervise(
    config: &Config,
    name: &str,
    payload: &[u8],
) -> Result<Vec<CaseResult>, SandboxError> {
    let args = DockerCommand::new(config.docker_binary(), name, &config.image)
        .user(&config.sandbox_user)
        .limits(config.default_limits.clone())
        .engine_command(config.engine_command.iter().cloned())
        .build();

    debug!(?args, "launching sandbox");

    let mut child = Command::new(&args[0])
        .args(&args[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                SandboxError::LaunchFailure(err)
            } else {
                SandboxError::Io(err)
            }
        })?;

    // The submission travels only through stdin, never as an argument.
    // Closing the handle signals end-of-input to the engine.
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(err) = stdin.write_all(payload).await {
            warn!(%name, error = %err, "failed to write payload to sandbox");
            force_remove(config, name).await;
            return Err(SandboxError::Io(err));
        }
        drop(stdin);
    }

    let output = match tokio::time::timeout(config.timeout(), child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            force_remove(config, name).await;
            return Err(SandboxError::Io(err));
        }
        Err(_elapsed) => {
            warn!(%name, secs = config.timeout_secs, "sandbox timed out, forcing removal");
            force_remove(config, name).await;
            return Err(SandboxError::Timeout {
                secs: config.timeout_secs,
            });
        }
    };

    // Killed by a signal: the container state is indeterminate, so
    // destroy by name before interpreting anything.
    if output.status.code().is_none() {
        force_remove(config, name).await;
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(SandboxError::AbnormalExit {
            code: output.status.code().unwrap_or(-1),
            stderr: if stderr.is_empty() {
                "no stderr".to_string()
            } else {
                stderr
            },
        });
    }

    parse_result_batch(&output.stdout)
}

/// Parse the sandbox's stdout as a result batch.
///
/// Malformed JSON and well-formed-but-wrong-shape payloads are
/// distinguished so callers can tell a crashed engine from a broken one.
fn parse_result_batch(stdout: &[u8]) -> Result<Vec<CaseResult>, SandboxError> {
    let value: serde_json::Value =
        serde_json::from_slice(stdout).map_err(SandboxError::InvalidOutput)?;
    let batch: ResultBatch =
        serde_json::from_value(value).map_err(|_| SandboxError::UnexpectedPayload)?;
    Ok(batch.results)
}

/// Force-destroy a container by name.
///
/// Used when a sandbox hangs or is left in an indeterminate state.
/// Failure to remove is logged, not propagated: the container may
/// already be gone (`--rm` races with us), and the caller's error is
/// the one worth keeping.
pub async fn force_remove(config: &Config, name: &str) {
    let args = DockerCommand::remove_args(config.docker_binary(), name);
    match Command::new(&args[0]).args(&args[1..]).output().await {
        Ok(output) if output.status.success() => {
            debug!(%name, "container removed");
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(%name, stderr = %stderr, "container removal reported failure");
        }
        Err(err) => {
            warn!(%name, error = %err, "failed to spawn container removal");
        }
    }
}
