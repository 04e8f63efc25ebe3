use gradebox::{Config, Executor};
use serde_json::json;

use super::{data_task, run_complete};

fn short_timeout_config() -> Config {
    Config {
        timeout_secs: 3,
        ..Config::default()
    }
}

#[tokio::test]
async fn infinite_loop_times_out_and_releases_the_slot() {
    let executor = Executor::new(short_timeout_config());
    let task = data_task(None, &[], json!(null));

    let results = run_complete(&executor, "while True:\n    pass", &task).await;

    // One synthetic failing result, never a raw error
    assert_eq!(results.len(), 1);
    assert!(!results[0].passed);
    let actual = results[0].actual.as_str().unwrap();
    assert!(actual.starts_with("Execution error: "), "got: {actual}");
    assert!(actual.contains("timeout"), "got: {actual}");

    // The slot must be back in the pool
    assert_eq!(executor.pool().available(), executor.pool().capacity() as usize);
}

#[tokio::test]
async fn pool_stays_full_after_mixed_outcomes() {
    let executor = Executor::new(short_timeout_config());

    for source in [
        "result = 1",
        "while True:\n    pass",
        "raise RuntimeError('crash at import')",
        "result = 2",
    ] {
        let task = data_task(None, &[], json!(null));
        let _ = run_complete(&executor, source, &task).await;
    }

    assert_eq!(executor.pool().available(), executor.pool().capacity() as usize);
}
