use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::Error,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};

/// Directory name used for the shared image cache when none is configured
pub const DEFAULT_IMAGE_CACHE_DIR: &str = "singularity_image_cache";

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Backend not supported: {0}")]
    UnsupportedBackend(String),
    #[error("Failed to read config file")]
    FileNotReadable(#[from] Error),
    #[error("Failed to parse config file: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
    #[error("lsf.extra_args is not valid shell syntax: {0}")]
    MalformedExtraArgs(String),
    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("Logger already initialized")]
    LoggerAlreadyInitialized,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    // Name of the selected backend, see Backends::load for the selection process
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub lsf: LsfConfig,
    #[serde(default)]
    pub singularity: SingularityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct LsfConfig {
    // LSF reserves memory per core, set this if tasks declare memory per job
    #[serde(default)]
    pub memory_per_job: bool,
    // raw flags appended to every bsub call, split like a shell would
    #[serde(default)]
    pub extra_args: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct SingularityConfig {
    #[serde(default = "default_singularity_exe")]
    pub exe: Vec<String>,
    #[serde(default = "default_run_options")]
    pub run_options: Vec<String>,
    #[serde(default)]
    pub image_cache: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Scheduler options in the shape the invocation builder consumes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub memory_per_job: bool,
    pub extra_args: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            lsf: LsfConfig::default(),
            singularity: SingularityConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SingularityConfig {
    fn default() -> Self {
        Self {
            exe: default_singularity_exe(),
            run_options: default_run_options(),
            image_cache: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl RunnerConfig {
    /// load the config from a yaml file
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        debug!(path = ?path, "Loading config");

        let config: Self = serde_yaml::from_reader(File::open(path)?)?;

        Ok(config)
    }

    pub fn from_yaml(input: &str) -> Result<Self, ConfigErrors> {
        Ok(serde_yaml::from_str(input)?)
    }
}

impl LsfConfig {
    /// split `extra_args` into tokens, an absent or empty string yields no tokens
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, ConfigErrors> {
        let extra_args = match self.extra_args.as_deref() {
            Some(raw) => shlex::split(raw)
                .ok_or_else(|| ConfigErrors::MalformedExtraArgs(raw.to_string()))?,
            None => Vec::new(),
        };

        Ok(SchedulerConfig {
            memory_per_job: self.memory_per_job,
            extra_args,
        })
    }
}

impl SingularityConfig {
    /// default the image cache to a directory below `cwd` if it is unset or empty
    pub fn default_image_cache(&mut self, cwd: &Path) {
        let is_unset = self
            .image_cache
            .as_ref()
            .map_or(true, |path| path.as_os_str().is_empty());

        if is_unset {
            let cache = cwd.join(DEFAULT_IMAGE_CACHE_DIR);
            warn!(
                image_cache = ?cache,
                "No singularity.image_cache configured, using a directory in the working directory"
            );
            self.image_cache = Some(cache);
        }
    }
}

fn default_backend() -> String {
    "lsf_singularity".to_string()
}

fn default_singularity_exe() -> Vec<String> {
    vec!["singularity".to_string()]
}

fn default_run_options() -> Vec<String> {
    ["--containall", "--no-mount", "hostfs"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}
