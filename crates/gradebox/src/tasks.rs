//! Task provider collaborator interface
//!
//! The core treats task lookup as an opaque synchronous call: given a
//! task identifier and a visibility mode, a provider returns the entry
//! point and the ordered test cases, or nothing. No retry, no cache —
//! persistence lives behind this seam.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ExecutionMode, TestCase};

/// Number of test cases visible to a `fullTest` request
pub const PUBLIC_CASE_WINDOW: usize = 3;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task storage unavailable: {0}")]
    Unavailable(String),

    #[error("malformed task definition: {0}")]
    Malformed(String),
}

/// One task as the executor consumes it: an optional entry point plus
/// ordered test cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(default)]
    pub entry_point: Option<String>,

    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl TaskSpec {
    /// A task with no cases, used for ad-hoc execution
    pub fn empty() -> Self {
        Self {
            entry_point: None,
            test_cases: Vec::new(),
        }
    }

    /// Restrict the cases to what a mode may see. `fullTest` sees only
    /// the public prefix window; other modes see everything.
    pub fn visible_for(&self, mode: ExecutionMode) -> TaskSpec {
        match mode {
            ExecutionMode::FullTest => TaskSpec {
                entry_point: self.entry_point.clone(),
                test_cases: self
                    .test_cases
                    .iter()
                    .take(PUBLIC_CASE_WINDOW)
                    .cloned()
                    .collect(),
            },
            _ => self.clone(),
        }
    }

    /// Parse a task definition from JSON text
    pub fn from_json(text: &str) -> Result<TaskSpec, TaskError> {
        serde_json::from_str(text).map_err(|err| TaskError::Malformed(err.to_string()))
    }
}

/// Synchronous, opaque task lookup
pub trait TaskProvider {
    /// Return the task, already restricted to the mode's visibility,
    /// or `None` if the id is unknown.
    fn load(&self, task_id: &str, mode: ExecutionMode) -> Result<Option<TaskSpec>, TaskError>;
}

/// In-memory provider, used by tests and fixtures
#[derive(Debug, Default)]
pub struct InMemoryTaskProvider {
    tasks: HashMap<String, TaskSpec>,
}

impl InMemoryTaskProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task_id: impl Into<String>, spec: TaskSpec) {
        self.tasks.insert(task_id.into(), spec);
    }
}

impl TaskProvider for InMemoryTaskProvider {
    fn load(&self, task_id: &str, mode: ExecutionMode) -> Result<Option<TaskSpec>, TaskError> {
        Ok(self.tasks.get(task_id).map(|spec| spec.visible_for(mode)))
    }
}
