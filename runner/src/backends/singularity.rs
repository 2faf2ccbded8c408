use super::{BackendError, ContainerBackend};
use crate::{
    config::RunnerConfig,
    job::TaskAttempt,
    resources::{
        byte_size, clamp, positive_integer, ResourceLimits, ResourceRequest, RuntimeValues,
        RUNTIME_CPU, RUNTIME_MEMORY,
    },
};
use std::{fs, path::Path};
use tracing::{debug, info, instrument};

/// working directory of the task inside the container
pub const CONTAINER_WORK_DIR: &str = "/mnt/task/work";

/// Runs a task as a local `singularity exec` process
#[derive(Clone, Copy, Debug, Default)]
pub struct SingularityBackend;

impl ContainerBackend for SingularityBackend {
    fn cli_name(&self) -> &'static str {
        "singularity"
    }

    fn global_init(
        &self,
        config: &mut RunnerConfig,
    ) -> Result<&'static ResourceLimits, BackendError> {
        let limits = ResourceLimits::install(self.detect_resource_limits());

        if let Some(cache) = config
            .singularity
            .image_cache
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty())
        {
            fs::create_dir_all(cache).map_err(|source| BackendError::Io {
                path: cache.to_string_lossy().into_owned(),
                source,
            })?;

            info!(image_cache = ?cache, "Using singularity image cache");
        }

        Ok(limits)
    }

    /// limits of the current host, time is not limited locally
    fn detect_resource_limits(&self) -> ResourceLimits {
        ResourceLimits {
            cpu: num_cpus::get() as u64,
            mem_bytes: host_memory(),
            time: u64::MAX,
        }
    }

    #[instrument(skip(self), level = "debug")]
    fn process_runtime(
        &self,
        runtime: &RuntimeValues,
        limits: &ResourceLimits,
    ) -> Result<ResourceRequest, BackendError> {
        let mut resources = ResourceRequest::default();

        if let Some(value) = runtime.get(RUNTIME_CPU) {
            let cpu = positive_integer(RUNTIME_CPU, value)?;
            resources.cpu = Some(clamp(RUNTIME_CPU, cpu, limits.cpu));
        }

        if let Some(value) = runtime.get(RUNTIME_MEMORY) {
            let memory = byte_size(RUNTIME_MEMORY, value)?;
            resources.memory_bytes = Some(clamp(RUNTIME_MEMORY, memory, limits.mem_bytes));
        }

        debug!(resources = ?resources, "Resolved runtime values");

        Ok(resources)
    }

    fn build_run_invocation(
        &self,
        attempt: &TaskAttempt,
        config: &RunnerConfig,
    ) -> Result<Vec<String>, BackendError> {
        if attempt.command.is_empty() {
            return Err(BackendError::EmptyCommand);
        }

        let singularity = &config.singularity;
        let bind = format!(
            "{}:{CONTAINER_WORK_DIR}",
            attempt.identity.work_dir().to_string_lossy()
        );

        let mut args = singularity.exe.clone();
        args.push("exec".to_string());
        args.extend(singularity.run_options.iter().cloned());
        args.extend([
            "--pwd".to_string(),
            CONTAINER_WORK_DIR.to_string(),
            "--bind".to_string(),
            bind,
            image_uri(&attempt.image, singularity.image_cache.as_deref()),
        ]);
        args.extend(attempt.command.iter().cloned());

        Ok(args)
    }
}

/// file name an image is stored under in the shared cache
pub fn cached_image_name(image: &str) -> String {
    let sanitized: String = image
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!("{sanitized}.sif")
}

/// prefer a previously pulled image from the cache, otherwise let singularity fetch it
pub fn image_uri(image: &str, cache: Option<&Path>) -> String {
    if let Some(cached) = cache
        .map(|cache| cache.join(cached_image_name(image)))
        .filter(|path| path.is_file())
    {
        debug!(image = image, cached = ?cached, "Using cached image");

        return cached.to_string_lossy().into_owned();
    }

    if image.contains("://") {
        image.to_string()
    } else {
        format!("docker://{image}")
    }
}

#[cfg(target_os = "linux")]
fn host_memory() -> u64 {
    match nix::sys::sysinfo::sysinfo() {
        Ok(info) => info.ram_total(),
        Err(error) => {
            tracing::warn!(error = ?error, "Failed to determine host memory, assuming no limit");
            u64::MAX
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn host_memory() -> u64 {
    u64::MAX
}
