use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::types::SandboxLimits;

mod loader;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../gradebox.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for gradebox
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the docker binary (uses PATH if not specified).
    #[serde(default)]
    pub docker_path: Option<PathBuf>,

    /// Pinned runtime image containing the in-sandbox engine.
    #[serde(default = "default_image")]
    pub image: String,

    /// Entry command executed inside the image. The submission never
    /// appears here; it travels only through the stdin payload.
    #[serde(default = "default_engine_command")]
    pub engine_command: Vec<String>,

    /// Prefix for derived container names; the slot id is appended.
    #[serde(default = "default_container_prefix")]
    pub container_prefix: String,

    /// Hard ceiling on simultaneously running sandboxes.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Wall-clock budget per sandbox invocation, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Unprivileged identity (uid:gid) the sandbox runs as.
    #[serde(default = "default_sandbox_user")]
    pub sandbox_user: String,

    /// Default resource limits applied to all sandboxes.
    /// Per-request limits override these where set.
    #[serde(default)]
    pub default_limits: SandboxLimits,
}

impl Config {
    /// Create a new config from the embedded defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the path to the docker binary
    pub fn docker_binary(&self) -> PathBuf {
        self.docker_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("docker"))
    }

    /// The wall-clock budget for one sandbox invocation
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Merge resource limits with defaults
    pub fn effective_limits(&self, overrides: Option<&SandboxLimits>) -> SandboxLimits {
        match overrides {
            Some(limits) => self.default_limits.with_overrides(limits),
            None => self.default_limits.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

fn default_image() -> String {
    "gradebox-engine:0.1".to_string()
}

fn default_engine_command() -> Vec<String> {
    vec!["/usr/local/bin/gradebox-engine".to_string()]
}

fn default_container_prefix() -> String {
    "gradebox_".to_string()
}

fn default_pool_size() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_sandbox_user() -> String {
    "65534:65534".to_string()
}
