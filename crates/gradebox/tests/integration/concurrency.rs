use std::sync::Arc;

use gradebox::Executor;
use serde_json::json;

use super::{data_task, run_complete, test_config};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn one_more_submission_than_slots_all_complete() {
    let executor = Arc::new(Executor::new(test_config()));
    let capacity = executor.pool().capacity() as usize;

    let mut handles = Vec::new();
    for n in 0..capacity + 1 {
        let executor = Arc::clone(&executor);
        handles.push(tokio::spawn(async move {
            let task = data_task(None, &[("n", json!(n))], json!(n));
            run_complete(&executor, "result = n", &task).await
        }));
    }

    for handle in handles {
        let results = handle.await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].passed, "error: {:?}", results[0].error);
    }

    // Everything admitted, everything released
    assert_eq!(executor.pool().available(), capacity);
}
