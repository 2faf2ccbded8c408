use bytesize::ByteSize;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

/// evaluated runtime section of a task, keyed by runtime variable name
pub type RuntimeValues = BTreeMap<String, serde_yaml::Value>;

pub const RUNTIME_CPU: &str = "cpu";
pub const RUNTIME_MEMORY: &str = "memory";
pub const RUNTIME_TIME_MINUTES: &str = "time_minutes";

static INSTALLED_LIMITS: OnceCell<ResourceLimits> = OnceCell::new();

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeValueError {
    #[error("runtime.{key} must be an integer, got {value}")]
    NotAnInteger { key: String, value: String },
    #[error("runtime.{key} must be at least 1, got {value}")]
    NotPositive { key: String, value: i64 },
    #[error("runtime.{key} is not a valid byte size: {value}")]
    InvalidByteSize { key: String, value: String },
}

/// Concrete resources of a single task attempt, resolved from its runtime values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceRequest {
    pub cpu: Option<u64>,
    pub memory_bytes: Option<u64>,
    pub time_minutes: Option<u64>,
}

/// Upper bounds the runtime values of a task are clamped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub cpu: u64,
    pub mem_bytes: u64,
    pub time: u64,
}

impl ResourceLimits {
    /// no effective ceiling, used when the limits belong to a cluster and not this host
    pub const UNLIMITED: Self = Self {
        cpu: u64::MAX,
        mem_bytes: u64::MAX,
        time: u64::MAX,
    };

    /// install the process wide limits, the first installation wins
    pub fn install(limits: ResourceLimits) -> &'static ResourceLimits {
        let installed = INSTALLED_LIMITS.get_or_init(|| {
            debug!(limits = ?limits, "Installing resource limits");
            limits
        });

        if *installed != limits {
            debug!(
                installed = ?installed,
                ignored = ?limits,
                "Resource limits already installed, keeping the first"
            );
        }

        installed
    }

    /// the process wide limits, if `install` was called before
    pub fn installed() -> Option<&'static ResourceLimits> {
        INSTALLED_LIMITS.get()
    }
}

/// coerce a runtime value to a positive integer, strings holding integers are accepted
pub fn positive_integer(key: &str, value: &serde_yaml::Value) -> Result<u64, RuntimeValueError> {
    let number = match value {
        serde_yaml::Value::Number(number) => number.as_i64(),
        serde_yaml::Value::String(string) => string.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| RuntimeValueError::NotAnInteger {
        key: key.to_string(),
        value: describe(value),
    })?;

    u64::try_from(number)
        .ok()
        .filter(|number| *number >= 1)
        .ok_or(RuntimeValueError::NotPositive {
            key: key.to_string(),
            value: number,
        })
}

/// coerce a runtime value to bytes, either a plain integer or a size like "4 GiB"
pub fn byte_size(key: &str, value: &serde_yaml::Value) -> Result<u64, RuntimeValueError> {
    let invalid = || RuntimeValueError::InvalidByteSize {
        key: key.to_string(),
        value: describe(value),
    };

    match value {
        serde_yaml::Value::Number(number) => number.as_u64().ok_or_else(invalid),
        serde_yaml::Value::String(string) => string
            .trim()
            .parse::<ByteSize>()
            .map(|size| size.as_u64())
            .map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// clamp `value` to `limit`, warning when the request is reduced
pub fn clamp(key: &str, value: u64, limit: u64) -> u64 {
    if value > limit {
        warn!(
            requested = value,
            limit = limit,
            "runtime.{key} exceeds the available resources, reducing request"
        );

        limit
    } else {
        value
    }
}

fn describe(value: &serde_yaml::Value) -> String {
    serde_yaml::to_string(value)
        .map(|rendered| rendered.trim_end().to_string())
        .unwrap_or_else(|_| format!("{value:?}"))
}
