//! gradebox-engine: the in-sandbox entry script
//!
//! This binary is baked into the pinned runtime image and is the only
//! process the launcher ever starts in a sandbox. It reads one JSON
//! execution request from stdin — the entire input, before producing
//! any output — runs the batch, and writes one JSON result batch to
//! stdout. A malformed request exits non-zero, which the launcher
//! reports as an abnormal exit.

use std::io::{Read, Write};

use anyhow::Context;
use gradebox::types::ExecutionRequest;

fn main() -> anyhow::Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read request from stdin")?;

    let request: ExecutionRequest =
        serde_json::from_str(&input).context("malformed execution request")?;

    let batch = gradebox::engine::run_request(&request);

    let payload = serde_json::to_string(&batch).context("failed to serialize result batch")?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(payload.as_bytes())
        .context("failed to write result batch")?;
    stdout.flush().context("failed to flush result batch")?;

    Ok(())
}
