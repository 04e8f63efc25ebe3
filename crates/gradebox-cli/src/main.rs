//! Gradebox CLI
//!
//! A command-line tool for executing and grading untrusted code in
//! Docker sandboxes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gradebox::{Config, EXAMPLE_CONFIG, ExecutionMode, ExecutionSummary, Executor, TaskSpec};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gradebox")]
#[command(about = "A tool for executing and grading untrusted code in Docker sandboxes")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: gradebox.toml)
        #[arg(short, long, default_value = "gradebox.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run a submission against a task definition
    Run {
        /// Source file with the submission
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Task definition file (JSON: entry_point + test_cases)
        #[arg(short, long)]
        task: PathBuf,

        /// Execution mode: fullTest, completeTask or runCode
        #[arg(short, long, default_value = "completeTask")]
        mode: String,
    },

    /// Run a submission ad-hoc, with no test cases
    Exec {
        /// Source file with the submission
        #[arg(value_name = "FILE")]
        source: PathBuf,
    },

    /// Show effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Run { source, task, mode } => {
            let mode = mode
                .parse::<ExecutionMode>()
                .map_err(anyhow::Error::msg)?;
            run_task(&config, &source, &task, mode).await
        }
        Commands::Exec { source } => run_adhoc(&config, &source).await,
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_task(
    config: &Config,
    source_path: &PathBuf,
    task_path: &PathBuf,
    mode: ExecutionMode,
) -> Result<()> {
    let source = tokio::fs::read_to_string(source_path)
        .await
        .context("failed to read source file")?;
    let task_text = tokio::fs::read_to_string(task_path)
        .await
        .context("failed to read task file")?;
    let task = TaskSpec::from_json(&task_text).context("failed to parse task definition")?;
    let task = task.visible_for(mode);

    info!(cases = task.test_cases.len(), %mode, "executing submission");

    let executor = Executor::new(config.clone());
    let summary = executor.execute_summary(&source, &task, mode).await;

    print_summary(&summary)?;

    if !summary_passed(&summary) {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_adhoc(config: &Config, source_path: &PathBuf) -> Result<()> {
    let source = tokio::fs::read_to_string(source_path)
        .await
        .context("failed to read source file")?;

    info!("executing submission ad-hoc");

    let executor = Executor::new(config.clone());
    let summary = executor
        .execute_summary(&source, &TaskSpec::empty(), ExecutionMode::RunCode)
        .await;

    print_summary(&summary)?;

    if !summary_passed(&summary) {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(summary: &ExecutionSummary) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(summary).context("failed to render summary")?;
    println!("{rendered}");
    Ok(())
}

fn summary_passed(summary: &ExecutionSummary) -> bool {
    match (&summary.is_task_passed, &summary.results) {
        (Some(passed), _) => *passed,
        (None, Some(results)) => results.iter().all(|result| result.passed),
        _ => true,
    }
}

fn show_config(config: &Config) {
    println!("Docker binary: {}", config.docker_binary().display());
    println!("Runtime image: {}", config.image);
    println!("Engine command: {:?}", config.engine_command);
    println!("Container prefix: {}", config.container_prefix);
    println!("Pool size: {}", config.pool_size);
    println!("Timeout: {}s", config.timeout_secs);
    println!("Sandbox user: {}", config.sandbox_user);
    println!();
    println!("Default limits:");
    println!("  Memory: {:?} MB", config.default_limits.memory_mb);
    println!("  CPUs: {:?}", config.default_limits.cpus);
    println!("  Pids limit: {:?}", config.default_limits.pids_limit);
    println!("  Tmpfs: {:?} MB", config.default_limits.tmpfs_mb);
    println!("  Open files: {:?}", config.default_limits.open_files);
}

async fn init_config(output: &PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
