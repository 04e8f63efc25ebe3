use gradebox::{ExecutionMode, Executor, TaskSpec};
use serde_json::json;

use super::{data_task, run_complete, test_config};

#[tokio::test]
async fn transform_passes_in_the_sandbox() {
    let executor = Executor::new(test_config());
    let task = data_task(
        Some("transform"),
        &[("numbers", json!([1, 2, 3]))],
        json!([2, 4, 6]),
    );

    let results = run_complete(
        &executor,
        "def transform(numbers): return [n*2 for n in numbers]",
        &task,
    )
    .await;

    assert_eq!(results.len(), 1);
    assert!(results[0].passed, "error: {:?}", results[0].error);
    assert_eq!(results[0].actual, json!([2, 4, 6]));
}

#[tokio::test]
async fn raised_exception_is_reported_per_case() {
    let executor = Executor::new(test_config());
    let task = data_task(Some("transform"), &[("numbers", json!([1]))], json!([2]));

    let results = run_complete(
        &executor,
        "def transform(numbers):\n    raise ValueError('boom')",
        &task,
    )
    .await;

    assert!(!results[0].passed);
    let error = results[0].error.as_deref().expect("error should be set");
    assert!(error.contains("ValueError: boom"), "got: {error}");
}

#[tokio::test]
async fn run_code_reports_the_result_binding() {
    let executor = Executor::new(test_config());

    let results = executor
        .execute(
            "print('hello from the sandbox')\nresult = 7",
            &TaskSpec::empty(),
            ExecutionMode::RunCode,
        )
        .await;

    assert_eq!(results.len(), 1);
    assert!(results[0].passed);
    assert_eq!(results[0].actual, json!(7));
    assert!(results[0].stdout.contains("hello from the sandbox"));
}

#[tokio::test]
async fn run_code_without_result_gets_the_placeholder() {
    let executor = Executor::new(test_config());

    let results = executor
        .execute(
            "print('side effects only')",
            &TaskSpec::empty(),
            ExecutionMode::RunCode,
        )
        .await;

    assert!(results[0].passed);
    assert_eq!(results[0].actual, json!("Code executed successfully"));
}

#[tokio::test]
async fn stdin_case_feeds_the_program() {
    let executor = Executor::new(test_config());
    let task = TaskSpec {
        entry_point: None,
        test_cases: vec![gradebox::TestCase::with_stdin(
            "world",
            json!("hello world"),
        )],
    };

    let results = run_complete(
        &executor,
        "name = input()\nprint('hello ' + name)",
        &task,
    )
    .await;

    assert!(results[0].passed, "actual: {:?}", results[0].actual);
}
