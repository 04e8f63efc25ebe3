//! Integration tests for gradebox
//!
//! These tests require a Docker daemon and the pinned runtime image
//! (an image containing the gradebox-engine binary at the configured
//! engine command path).
//!
//! Run with: cargo test -p gradebox --features integration-tests

#![cfg(feature = "integration-tests")]

use gradebox::{Config, ExecutionMode, Executor, TaskSpec, TestCase};
use serde_json::Value;

mod concurrency;
mod execution;
mod isolation;
mod timeout;

/// Config for the local docker daemon and test image
pub(crate) fn test_config() -> Config {
    Config::default()
}

/// Build a one-case structured task
pub(crate) fn data_task(
    entry_point: Option<&str>,
    pairs: &[(&str, Value)],
    expected: Value,
) -> TaskSpec {
    let mut map = serde_json::Map::new();
    for (key, value) in pairs {
        map.insert((*key).to_string(), value.clone());
    }
    TaskSpec {
        entry_point: entry_point.map(String::from),
        test_cases: vec![TestCase::with_data(map, expected)],
    }
}

/// Run a single submission to completion under `completeTask`
pub(crate) async fn run_complete(
    executor: &Executor,
    source: &str,
    task: &TaskSpec,
) -> Vec<gradebox::CaseResult> {
    executor
        .execute(source, task, ExecutionMode::CompleteTask)
        .await
}
