//! LSF wrapper around a container backend
//!
//! Every container invocation of the wrapped backend is submitted as a blocking `bsub` job, so
//! the container runs on a cluster node instead of the submitting host.

use super::{BackendError, ContainerBackend};
use crate::{
    config::RunnerConfig,
    invocation::{build_final_invocation, build_scheduler_prefix, shell_join},
    job::TaskAttempt,
    resources::{
        positive_integer, ResourceLimits, ResourceRequest, RuntimeValues, RUNTIME_TIME_MINUTES,
    },
};
use std::{env, path::PathBuf};
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct LsfBackend<B> {
    inner: B,
}

impl<B: ContainerBackend> LsfBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

impl<B: ContainerBackend> ContainerBackend for LsfBackend<B> {
    fn cli_name(&self) -> &'static str {
        "lsf_singularity"
    }

    fn global_init(
        &self,
        config: &mut RunnerConfig,
    ) -> Result<&'static ResourceLimits, BackendError> {
        // must be installed before the wrapped backend installs the host limits
        let limits = ResourceLimits::install(self.detect_resource_limits());

        // images live on shared storage, node local caches corrupt on concurrent pulls
        let cwd = env::current_dir().unwrap_or_else(|error| {
            warn!(error = ?error, "Failed to determine the working directory");
            PathBuf::from(".")
        });
        config.singularity.default_image_cache(&cwd);

        self.inner.global_init(config)?;

        Ok(limits)
    }

    fn detect_resource_limits(&self) -> ResourceLimits {
        ResourceLimits::UNLIMITED
    }

    fn process_runtime(
        &self,
        runtime: &RuntimeValues,
        limits: &ResourceLimits,
    ) -> Result<ResourceRequest, BackendError> {
        let mut resources = self.inner.process_runtime(runtime, limits)?;

        // TODO: submit with `-W` once the run limit format for the cluster queues is settled
        if let Some(value) = runtime.get(RUNTIME_TIME_MINUTES) {
            resources.time_minutes = Some(positive_integer(RUNTIME_TIME_MINUTES, value)?);
            debug!(
                time_minutes = resources.time_minutes,
                "Recorded time limit"
            );
        }

        Ok(resources)
    }

    fn build_run_invocation(
        &self,
        attempt: &TaskAttempt,
        config: &RunnerConfig,
    ) -> Result<Vec<String>, BackendError> {
        let container_command = self.inner.build_run_invocation(attempt, config)?;
        let scheduler = config.lsf.scheduler_config()?;

        let prefix = build_scheduler_prefix(&attempt.identity, &attempt.resources, &scheduler);
        let invocation = build_final_invocation(prefix, container_command);

        info!(
            run_id = attempt.identity.run_id.as_str(),
            try_counter = attempt.identity.try_counter,
            "LSF invocation: {}",
            shell_join(&invocation)
        );

        Ok(invocation)
    }
}
