//! Command builder for the Docker CLI
//!
//! Builds the `docker run` argument vector for one sandbox invocation.
//! The isolation flags are not configurable: no network, read-only root
//! filesystem, dropped capabilities, no privilege escalation, no shared
//! IPC namespace, and an unprivileged user always apply. Only the
//! resource ceilings come from [`SandboxLimits`].

use std::path::{Path, PathBuf};

use crate::types::SandboxLimits;

/// Builder for the `docker run` invocation of one sandbox
#[derive(Debug)]
pub struct DockerCommand {
    /// Path to the docker binary
    docker_path: PathBuf,
    /// --name
    name: String,
    /// Pinned runtime image
    image: String,
    /// --user (uid:gid, never root)
    user: String,
    /// Resource ceilings
    limits: SandboxLimits,
    /// Entry command inside the image (the in-sandbox engine)
    engine_command: Vec<String>,
}

impl DockerCommand {
    /// Create a new command builder
    pub fn new(
        docker_path: impl Into<PathBuf>,
        name: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            docker_path: docker_path.into(),
            name: name.into(),
            image: image.into(),
            user: "65534:65534".to_string(),
            limits: SandboxLimits::default(),
            engine_command: Vec::new(),
        }
    }

    /// Set the unprivileged identity the sandbox runs as
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set resource limits
    pub fn limits(mut self, limits: SandboxLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the engine command executed inside the image
    pub fn engine_command(mut self, cmd: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.engine_command = cmd.into_iter().map(Into::into).collect();
        self
    }

    /// Build the `docker run` argument vector.
    ///
    /// Consumes self to avoid cloning the command vector.
    pub fn build(self) -> Vec<String> {
        let mut args = vec![
            self.docker_path.to_string_lossy().into_owned(),
            "run".to_string(),
            "--rm".to_string(),
            "-i".to_string(),
        ];

        // Unprivileged identity
        args.push("--user".to_string());
        args.push(self.user);

        // No network access
        args.push("--network".to_string());
        args.push("none".to_string());

        // Memory ceiling with matching swap ceiling (no swap headroom)
        if let Some(memory) = self.limits.memory_mb {
            args.push("--memory".to_string());
            args.push(format!("{memory}m"));
            args.push("--memory-swap".to_string());
            args.push(format!("{memory}m"));
        }

        // CPU share ceiling
        if let Some(cpus) = self.limits.cpus {
            args.push("--cpus".to_string());
            args.push(format!("{cpus}"));
        }

        // Process/thread ceiling
        if let Some(pids) = self.limits.pids_limit {
            args.push("--pids-limit".to_string());
            args.push(pids.to_string());
        }

        // Read-only root with one writable, non-executable, capped tmpfs
        args.push("--read-only".to_string());
        if let Some(tmpfs) = self.limits.tmpfs_mb {
            args.push("--tmpfs".to_string());
            args.push(format!("/tmp:rw,noexec,nosuid,size={tmpfs}m"));
        }

        // No IPC namespace sharing
        args.push("--ipc".to_string());
        args.push("none".to_string());

        // Drop all capabilities, forbid privilege escalation
        args.push("--cap-drop".to_string());
        args.push("ALL".to_string());
        args.push("--security-opt".to_string());
        args.push("no-new-privileges".to_string());

        // Open-file-descriptor ceiling
        if let Some(nofile) = self.limits.open_files {
            args.push("--ulimit".to_string());
            args.push(format!("nofile={nofile}:{nofile}"));
        }

        args.push("--name".to_string());
        args.push(self.name);

        args.push(self.image);
        args.extend(self.engine_command);

        args
    }

    /// Build the `docker rm -f` argument vector used to force-destroy a
    /// sandbox by name, independent of its reported state.
    pub fn remove_args(docker_path: impl AsRef<Path>, name: &str) -> Vec<String> {
        vec![
            docker_path.as_ref().to_string_lossy().into_owned(),
            "rm".to_string(),
            "-f".to_string(),
            name.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_default() -> Vec<String> {
        DockerCommand::new("docker", "gradebox_1", "gradebox-engine:0.1")
            .engine_command(vec!["/usr/local/bin/gradebox-engine"])
            .build()
    }

    fn flag_value(args: &[String], flag: &str) -> Option<String> {
        let pos = args.iter().position(|a| a == flag)?;
        args.get(pos + 1).cloned()
    }

    #[test]
    fn test_isolation_flags_always_present() {
        let args = DockerCommand::new("docker", "box", "img")
            .limits(SandboxLimits::new())
            .build();

        // The non-negotiable posture holds even with no limits set
        assert!(args.contains(&"--rm".to_string()));
        assert!(args.contains(&"-i".to_string()));
        assert_eq!(flag_value(&args, "--network").as_deref(), Some("none"));
        assert!(args.contains(&"--read-only".to_string()));
        assert_eq!(flag_value(&args, "--ipc").as_deref(), Some("none"));
        assert_eq!(flag_value(&args, "--cap-drop").as_deref(), Some("ALL"));
        assert_eq!(
            flag_value(&args, "--security-opt").as_deref(),
            Some("no-new-privileges")
        );
        assert_eq!(flag_value(&args, "--user").as_deref(), Some("65534:65534"));
    }

    #[test]
    fn test_memory_caps_swap_to_same_value() {
        let args = build_default();
        assert_eq!(flag_value(&args, "--memory").as_deref(), Some("256m"));
        assert_eq!(flag_value(&args, "--memory-swap").as_deref(), Some("256m"));
    }

    #[test]
    fn test_default_resource_flags() {
        let args = build_default();
        assert_eq!(flag_value(&args, "--cpus").as_deref(), Some("1"));
        assert_eq!(flag_value(&args, "--pids-limit").as_deref(), Some("128"));
        assert_eq!(
            flag_value(&args, "--tmpfs").as_deref(),
            Some("/tmp:rw,noexec,nosuid,size=64m")
        );
        assert_eq!(
            flag_value(&args, "--ulimit").as_deref(),
            Some("nofile=256:256")
        );
    }

    #[test]
    fn test_unset_limits_omit_flags() {
        let args = DockerCommand::new("docker", "box", "img")
            .limits(SandboxLimits::new())
            .build();

        assert!(!args.iter().any(|a| a == "--memory"));
        assert!(!args.iter().any(|a| a == "--memory-swap"));
        assert!(!args.iter().any(|a| a == "--cpus"));
        assert!(!args.iter().any(|a| a == "--pids-limit"));
        assert!(!args.iter().any(|a| a == "--tmpfs"));
        assert!(!args.iter().any(|a| a == "--ulimit"));
    }

    #[test]
    fn test_custom_user() {
        let args = DockerCommand::new("docker", "box", "img")
            .user("1000:1000")
            .build();
        assert_eq!(flag_value(&args, "--user").as_deref(), Some("1000:1000"));
    }

    #[test]
    fn test_engine_command_follows_image() {
        let args = build_default();
        let image_pos = args
            .iter()
            .position(|a| a == "gradebox-engine:0.1")
            .unwrap();
        assert_eq!(args[image_pos + 1], "/usr/local/bin/gradebox-engine");
        assert_eq!(image_pos + 2, args.len());
    }

    #[test]
    fn test_name_precedes_image() {
        let args = build_default();
        let name_pos = args.iter().position(|a| a == "--name").unwrap();
        assert_eq!(args[name_pos + 1], "gradebox_1");
        let image_pos = args
            .iter()
            .position(|a| a == "gradebox-engine:0.1")
            .unwrap();
        assert!(name_pos < image_pos);
    }

    #[test]
    fn test_no_user_source_on_command_line() {
        // The argv is fully determined by config-owned values; there is
        // no builder method that could splice submission text in.
        let args = build_default();
        assert!(args.iter().all(|a| !a.contains("def ")));
    }

    #[test]
    fn test_fractional_cpus() {
        let args = DockerCommand::new("docker", "box", "img")
            .limits(SandboxLimits::new().with_cpus(0.5))
            .build();
        assert_eq!(flag_value(&args, "--cpus").as_deref(), Some("0.5"));
    }

    #[test]
    fn test_remove_args() {
        let args = DockerCommand::remove_args("docker", "gradebox_3");
        assert_eq!(args, vec!["docker", "rm", "-f", "gradebox_3"]);
    }

    #[test]
    fn test_custom_docker_path() {
        let args = DockerCommand::new("/usr/local/bin/docker", "box", "img").build();
        assert_eq!(args[0], "/usr/local/bin/docker");
    }
}
