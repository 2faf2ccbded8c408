mod backends;
mod config;
mod invocation;
mod job;
mod logging;
mod resources;

#[cfg(test)]
mod config_test;
#[cfg(test)]
mod resources_test;

use backends::{BackendError, Backends, ContainerBackend};
use clap::Parser;
use config::{ConfigErrors, RunnerConfig};
use job::{JobIdentity, TaskAttempt};
use resources::{RuntimeValues, RUNTIME_CPU, RUNTIME_MEMORY, RUNTIME_TIME_MINUTES};
use std::{
    fs,
    path::PathBuf,
    process::{exit, Command},
};
use thiserror::Error;
use tracing::{debug, info};

/// Run a containerized task as a blocking LSF job
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// container backend, `lsf_singularity` or `singularity`
    #[arg(long)]
    pub backend: Option<String>,
    /// job name, also used to label the LSF job
    #[arg(long)]
    pub run_id: String,
    /// attempt number of the task, starting at 1
    #[arg(long = "try", default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub try_counter: u32,
    /// directory receiving logs and the task working directory
    #[arg(long)]
    pub host_dir: PathBuf,
    #[arg(long)]
    pub cpu: Option<u64>,
    /// memory as bytes or size, e.g. "8 GB"
    #[arg(long)]
    pub memory: Option<String>,
    #[arg(long)]
    pub time_minutes: Option<u64>,
    /// divide the memory by the cpu count before submission
    #[arg(long)]
    pub memory_per_job: bool,
    /// extra flags appended to bsub
    #[arg(long, allow_hyphen_values = true)]
    pub extra_args: Option<String>,
    #[arg(long)]
    pub image_cache: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// print the invocation instead of executing it
    #[arg(long)]
    pub dry_run: bool,
    /// container image, e.g. `ubuntu:22.04`
    pub image: String,
    /// command executed inside the container
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigErrors),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

impl Cli {
    /// load the configuration file if given and apply the command line overrides
    pub fn resolve_config(&self) -> Result<RunnerConfig, ConfigErrors> {
        let mut config = match &self.config {
            Some(path) => RunnerConfig::load(path)?,
            None => RunnerConfig::default(),
        };

        if let Some(backend) = &self.backend {
            config.backend = backend.clone();
        }
        if self.memory_per_job {
            config.lsf.memory_per_job = true;
        }
        if let Some(extra_args) = &self.extra_args {
            config.lsf.extra_args = Some(extra_args.clone());
        }
        if let Some(image_cache) = &self.image_cache {
            config.singularity.image_cache = Some(image_cache.clone());
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }

        Ok(config)
    }

    /// runtime values as a workflow engine would evaluate them
    pub fn runtime_values(&self) -> RuntimeValues {
        let mut runtime = RuntimeValues::new();

        if let Some(cpu) = self.cpu {
            runtime.insert(RUNTIME_CPU.to_string(), cpu.into());
        }
        if let Some(memory) = &self.memory {
            runtime.insert(RUNTIME_MEMORY.to_string(), memory.clone().into());
        }
        if let Some(time_minutes) = self.time_minutes {
            runtime.insert(RUNTIME_TIME_MINUTES.to_string(), time_minutes.into());
        }

        runtime
    }

    pub fn identity(&self) -> JobIdentity {
        JobIdentity {
            run_id: self.run_id.clone(),
            try_counter: self.try_counter,
            host_dir: self.host_dir.clone(),
        }
    }
}

/// build the invocation for the task described by `cli`
pub fn prepare(cli: &Cli, config: &mut RunnerConfig) -> Result<Vec<String>, RunnerError> {
    let backend = Backends::load(&config.backend)?;
    let limits = backend.global_init(config)?;

    debug!(backend = backend.cli_name(), limits = ?limits, "Backend initialized");

    let resources = backend.process_runtime(&cli.runtime_values(), limits)?;
    let attempt = TaskAttempt {
        identity: cli.identity(),
        resources,
        image: cli.image.clone(),
        command: cli.command.clone(),
    };

    Ok(backend.build_run_invocation(&attempt, config)?)
}

fn execute(cli: &Cli, invocation: &[String]) -> Result<i32, RunnerError> {
    let work_dir = cli.identity().work_dir();
    fs::create_dir_all(&work_dir).map_err(|source| BackendError::Io {
        path: work_dir.to_string_lossy().into_owned(),
        source,
    })?;

    let (program, args) = match invocation.split_first() {
        Some(split) => split,
        None => return Err(BackendError::EmptyCommand.into()),
    };

    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| RunnerError::Spawn {
            program: program.clone(),
            source,
        })?;

    info!(status = ?status, "Task finished");

    // a signal has no exit code, report it as a generic failure
    Ok(status.code().unwrap_or(1))
}

fn run(cli: Cli) -> Result<i32, RunnerError> {
    let mut config = cli.resolve_config()?;
    logging::init(&config.logging)?;

    let invocation = prepare(&cli, &mut config)?;

    if cli.dry_run {
        println!("{}", invocation::shell_join(&invocation));
        Ok(0)
    } else {
        execute(&cli, &invocation)
    }
}

fn main() {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => exit(code),
        Err(e) => {
            eprintln!("lsf-runner: {e}");
            exit(1)
        }
    }
}
