//! A library for executing and grading untrusted code in Docker sandboxes.
//!
//! Gradebox runs user-submitted Python source against a batch of test
//! cases inside an isolated, resource-capped container and reports one
//! pass/fail result per case with captured output.
//!
//! # Architecture
//!
//! - **Slot pool** ([`pool`]) — bounded admission control; the pool
//!   size is the hard ceiling on simultaneous sandboxes, and saturated
//!   requests block rather than fail.
//! - **Sandbox launcher** ([`sandbox`]) — one container per request,
//!   locked-down isolation flags, payload over stdin, wall-clock
//!   deadline with forced teardown.
//! - **Execution engine** ([`engine`]) — the in-sandbox half: compiles
//!   the submission once, runs each test case in a fresh namespace,
//!   binds entry-point arguments from annotations, captures and
//!   normalizes output, and compares per the case's input mode. Ships
//!   as the `gradebox-engine` binary baked into the runtime image.
//! - **Aggregation** ([`aggregate`]) — mode interpretation and the
//!   caller-facing summary; launcher failures become a single failing
//!   result, never a raw error.
//! - **Task provider** ([`tasks`]) — the collaborator seam for task
//!   lookup and test-case visibility.

pub use aggregate::{Executor, RUN_SUCCESS_PLACEHOLDER, summarize};
pub use config::{Config, ConfigError, EXAMPLE_CONFIG};
pub use engine::{OUTPUT_LIMIT, run_request};
pub use pool::{PoolClosed, SlotGuard, SlotPool};
pub use sandbox::{DockerCommand, SandboxError};
pub use tasks::{InMemoryTaskProvider, TaskError, TaskProvider, TaskSpec};
pub use types::{
    CaseResult, ExecutionMode, ExecutionRequest, ExecutionSummary, ResultBatch, SandboxLimits,
    TestCase,
};

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod pool;
pub mod sandbox;
pub mod tasks;
pub mod types;
