//! Docker sandbox launcher
//!
//! Launches one isolated container per execution request, streams the
//! serialized batch through the container's stdin, enforces the
//! wall-clock budget, and forcibly tears the container down on timeout
//! or an indeterminate exit.

use thiserror::Error;

pub use crate::sandbox::command::DockerCommand;
pub use crate::sandbox::launcher::{force_remove, run_batch};

mod command;
mod launcher;

/// Errors from launching or supervising a sandbox.
///
/// Every variant is terminal for its request — there is no automatic
/// retry. The aggregation layer converts each one into a single failing
/// synthetic result, so a bad submission never aborts the caller's
/// batch handling.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The container runtime binary could not be spawned
    #[error("container runtime not found: {0}")]
    LaunchFailure(#[source] std::io::Error),

    /// The sandbox exceeded its wall-clock budget and was destroyed
    #[error("sandbox execution exceeded timeout ({secs}s)")]
    Timeout { secs: u64 },

    /// The sandbox exited with a non-zero code
    #[error("sandbox exited with code {code}: {stderr}")]
    AbnormalExit { code: i32, stderr: String },

    /// The sandbox's output stream was not well-formed JSON
    #[error("invalid JSON from sandbox: {0}")]
    InvalidOutput(#[source] serde_json::Error),

    /// The output parsed as JSON but was not a result batch
    #[error("sandbox returned unexpected payload")]
    UnexpectedPayload,

    /// The slot pool was closed while waiting for admission
    #[error(transparent)]
    PoolClosed(#[from] crate::pool::PoolClosed),

    /// I/O failure talking to the sandbox process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
