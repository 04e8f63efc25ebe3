use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One test case for a submission.
///
/// Exactly one of `data` / `stdin` drives execution. A structured case
/// seeds the user namespace with the `data` mapping before the source
/// runs; a stdin case feeds raw text to the program (or to the entry
/// point as text/tokens) and switches comparison to normalized text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Keyword data seeded into the execution namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Map<String, Value>>,

    /// Raw standard-input text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,

    /// Expected value (structured or text, depending on input mode)
    #[serde(default)]
    pub expected: Value,
}

impl TestCase {
    /// Create a structured (keyword-data) test case
    pub fn with_data(data: serde_json::Map<String, Value>, expected: Value) -> Self {
        Self {
            data: Some(data),
            stdin: None,
            expected,
        }
    }

    /// Create a stdin-mode test case
    pub fn with_stdin(stdin: impl Into<String>, expected: Value) -> Self {
        Self {
            data: None,
            stdin: Some(stdin.into()),
            expected,
        }
    }

    /// Whether this case compares normalized text (stdin mode) rather
    /// than structured values
    pub fn is_stdin_mode(&self) -> bool {
        self.stdin.is_some()
    }
}

/// One serialized sandbox invocation: the submission plus the whole
/// batch of test cases it is graded against.
///
/// All cases for a request run inside a single sandbox process; the
/// request is written to the sandbox's stdin as one JSON payload and is
/// never passed on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// User-submitted source code
    pub source: String,

    /// Name of the callable to invoke, if any. With no entry point the
    /// source runs as the program itself.
    #[serde(default)]
    pub entry_point: Option<String>,

    /// Ordered test cases; results preserve this order
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// Result of one test case, produced inside the sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    /// The expected value, echoed back from the test case
    pub expected: Value,

    /// What the submission produced (structured value or normalized text)
    pub actual: Value,

    /// Whether actual matched expected under this case's comparison mode
    pub passed: bool,

    /// Captured standard output, normalized and truncated
    #[serde(default)]
    pub stdout: String,

    /// Captured standard error, normalized and truncated
    #[serde(default)]
    pub stderr: String,

    /// Compilation or runtime error for this case, if any
    #[serde(default)]
    pub error: Option<String>,
}

/// The result batch as written by the engine on its output stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultBatch {
    pub results: Vec<CaseResult>,
}

/// Which test cases a request sees and how its results are summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Public test cases only (the visible prefix window)
    #[serde(rename = "fullTest")]
    FullTest,

    /// All test cases, summarized as an overall pass flag + count
    #[serde(rename = "completeTask")]
    CompleteTask,

    /// No test cases: one synthetic case with no expectation
    #[serde(rename = "runCode")]
    RunCode,
}

impl ExecutionMode {
    /// Wire spelling of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::FullTest => "fullTest",
            ExecutionMode::CompleteTask => "completeTask",
            ExecutionMode::RunCode => "runCode",
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fullTest" | "full-test" => Ok(ExecutionMode::FullTest),
            "completeTask" | "complete-task" => Ok(ExecutionMode::CompleteTask),
            "runCode" | "run-code" => Ok(ExecutionMode::RunCode),
            other => Err(format!("unknown execution mode '{other}'")),
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing aggregate for one request.
///
/// `fullTest` and `runCode` return the per-case results; `completeTask`
/// returns only the overall pass flag and passed count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub mode: ExecutionMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<CaseResult>>,

    #[serde(
        default,
        rename = "isTaskPassed",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_task_passed: Option<bool>,

    #[serde(
        default,
        rename = "passedCount",
        skip_serializing_if = "Option::is_none"
    )]
    pub passed_count: Option<usize>,
}

/// Resource caps applied to one sandbox process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxLimits {
    /// Memory ceiling in megabytes. Swap is capped to the same value,
    /// so the submission gets no swap headroom.
    #[serde(default)]
    pub memory_mb: Option<u64>,

    /// CPU share ceiling (fractional cpus)
    #[serde(default)]
    pub cpus: Option<f64>,

    /// Maximum number of processes/threads
    #[serde(default)]
    pub pids_limit: Option<u32>,

    /// Size of the writable, non-executable tmpfs in megabytes
    #[serde(default)]
    pub tmpfs_mb: Option<u64>,

    /// Maximum open file descriptors
    #[serde(default)]
    pub open_files: Option<u32>,
}

impl SandboxLimits {
    /// Create new limits with all fields unset
    pub fn new() -> Self {
        Self {
            memory_mb: None,
            cpus: None,
            pids_limit: None,
            tmpfs_mb: None,
            open_files: None,
        }
    }

    /// Set the memory ceiling in megabytes
    pub fn with_memory_mb(mut self, mb: u64) -> Self {
        self.memory_mb = Some(mb);
        self
    }

    /// Set the CPU share ceiling
    pub fn with_cpus(mut self, cpus: f64) -> Self {
        self.cpus = Some(cpus);
        self
    }

    /// Set the process/thread ceiling
    pub fn with_pids_limit(mut self, pids: u32) -> Self {
        self.pids_limit = Some(pids);
        self
    }

    /// Set the tmpfs size in megabytes
    pub fn with_tmpfs_mb(mut self, mb: u64) -> Self {
        self.tmpfs_mb = Some(mb);
        self
    }

    /// Set the open-file-descriptor ceiling
    pub fn with_open_files(mut self, count: u32) -> Self {
        self.open_files = Some(count);
        self
    }

    /// Apply overrides from another SandboxLimits, preferring values
    /// from `overrides` when both are present.
    pub fn with_overrides(&self, overrides: &SandboxLimits) -> SandboxLimits {
        SandboxLimits {
            memory_mb: overrides.memory_mb.or(self.memory_mb),
            cpus: overrides.cpus.or(self.cpus),
            pids_limit: overrides.pids_limit.or(self.pids_limit),
            tmpfs_mb: overrides.tmpfs_mb.or(self.tmpfs_mb),
            open_files: overrides.open_files.or(self.open_files),
        }
    }
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            memory_mb: Some(256),
            cpus: Some(1.0),
            pids_limit: Some(128),
            tmpfs_mb: Some(64),
            open_files: Some(256),
        }
    }
}
