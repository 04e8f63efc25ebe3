use gradebox::Executor;
use serde_json::json;

use super::{data_task, run_complete, test_config};

#[tokio::test]
async fn network_access_is_denied() {
    let executor = Executor::new(test_config());
    let task = data_task(None, &[], json!("blocked"));

    let source = r#"
import socket
try:
    socket.create_connection(("1.1.1.1", 80), timeout=2)
    result = "connected"
except Exception:
    result = "blocked"
"#;

    let results = run_complete(&executor, source, &task).await;
    assert!(results[0].passed, "actual: {:?}", results[0].actual);
}

#[tokio::test]
async fn root_filesystem_is_read_only() {
    let executor = Executor::new(test_config());
    let task = data_task(None, &[], json!("readonly"));

    let source = r#"
try:
    open("/probe", "w")
    result = "writable"
except OSError:
    result = "readonly"
"#;

    let results = run_complete(&executor, source, &task).await;
    assert!(results[0].passed, "actual: {:?}", results[0].actual);
}

#[tokio::test]
async fn tmp_is_writable() {
    let executor = Executor::new(test_config());
    let task = data_task(None, &[], json!("ok"));

    let source = r#"
with open("/tmp/probe.txt", "w") as fh:
    fh.write("ok")
with open("/tmp/probe.txt") as fh:
    result = fh.read()
"#;

    let results = run_complete(&executor, source, &task).await;
    assert!(results[0].passed, "actual: {:?}", results[0].actual);
}
