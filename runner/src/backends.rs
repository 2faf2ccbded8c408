pub mod lsf;
pub mod singularity;


use crate::{
    config::{ConfigErrors, RunnerConfig},
    job::TaskAttempt,
    resources::{ResourceLimits, ResourceRequest, RuntimeValueError, RuntimeValues},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigErrors),
    #[error("Invalid runtime value: {0}")]
    InvalidRuntimeValue(#[from] RuntimeValueError),
    #[error("Task command is empty")]
    EmptyCommand,
    #[error("Failed to prepare {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Capability of turning a task attempt into a command line that runs it in a container
pub trait ContainerBackend {
    /// name used to select the backend in the configuration
    fn cli_name(&self) -> &'static str;

    /// one time process setup, returns the process wide resource limits
    fn global_init(&self, config: &mut RunnerConfig)
        -> Result<&'static ResourceLimits, BackendError>;

    fn detect_resource_limits(&self) -> ResourceLimits;

    /// resolve the evaluated runtime section of a task into concrete resources
    fn process_runtime(
        &self,
        runtime: &RuntimeValues,
        limits: &ResourceLimits,
    ) -> Result<ResourceRequest, BackendError>;

    fn build_run_invocation(
        &self,
        attempt: &TaskAttempt,
        config: &RunnerConfig,
    ) -> Result<Vec<String>, BackendError>;
}

#[derive(Clone, Debug)]
pub enum Backends {
    Singularity(singularity::SingularityBackend),
    LsfSingularity(lsf::LsfBackend<singularity::SingularityBackend>),
}

impl Backends {
    pub fn load(name: &str) -> Result<Self, ConfigErrors> {
        match name {
            "singularity" => Ok(Self::Singularity(singularity::SingularityBackend)),
            "lsf_singularity" => Ok(Self::LsfSingularity(lsf::LsfBackend::new(
                singularity::SingularityBackend,
            ))),
            _ => Err(ConfigErrors::UnsupportedBackend(name.to_string())),
        }
    }

    fn inner(&self) -> &dyn ContainerBackend {
        match self {
            Self::Singularity(backend) => backend,
            Self::LsfSingularity(backend) => backend,
        }
    }
}

impl ContainerBackend for Backends {
    fn cli_name(&self) -> &'static str {
        self.inner().cli_name()
    }

    fn global_init(
        &self,
        config: &mut RunnerConfig,
    ) -> Result<&'static ResourceLimits, BackendError> {
        self.inner().global_init(config)
    }

    fn detect_resource_limits(&self) -> ResourceLimits {
        self.inner().detect_resource_limits()
    }

    fn process_runtime(
        &self,
        runtime: &RuntimeValues,
        limits: &ResourceLimits,
    ) -> Result<ResourceRequest, BackendError> {
        self.inner().process_runtime(runtime, limits)
    }

    fn build_run_invocation(
        &self,
        attempt: &TaskAttempt,
        config: &RunnerConfig,
    ) -> Result<Vec<String>, BackendError> {
        self.inner().build_run_invocation(attempt, config)
    }
}
