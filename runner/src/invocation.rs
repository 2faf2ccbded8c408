//! Translation of task resources into a `bsub` submission prefix
//!
//! The functions here only assemble tokens, they neither log nor execute anything.

use crate::{config::SchedulerConfig, job::JobIdentity, resources::ResourceRequest};
use itertools::Itertools;

pub const BSUB: &str = "bsub";
// every core on one host, the container is a single machine process tree
pub const SINGLE_HOST_SPAN: &str = "span[hosts=1]";
pub const LOG_EXTENSION: &str = "log";

const BYTES_PER_MEGABYTE: u128 = 1_000_000;

/// build the `bsub` tokens that submit a job for `identity` with `resources`
pub fn build_scheduler_prefix(
    identity: &JobIdentity,
    resources: &ResourceRequest,
    config: &SchedulerConfig,
) -> Vec<String> {
    // -K blocks until the job finished and returns its exit status
    let mut args = vec![
        BSUB.to_string(),
        "-K".to_string(),
        "-J".to_string(),
        identity.run_id.clone(),
    ];

    let suffix = identity.try_suffix();
    for (flag, stream) in [("-o", "stdout"), ("-e", "stderr")] {
        let file_name = format!("{stream}{suffix}.{LOG_EXTENSION}");

        args.push(flag.to_string());
        args.push(identity.host_dir.join(file_name).to_string_lossy().into_owned());
    }

    if let Some(cpu) = resources.cpu {
        args.extend([
            "-n".to_string(),
            cpu.to_string(),
            "-R".to_string(),
            SINGLE_HOST_SPAN.to_string(),
        ]);
    }

    if let Some(memory) = resources.memory_bytes {
        let divisor = match resources.cpu {
            Some(cpu) if config.memory_per_job => cpu,
            _ => 1,
        };

        args.push("-M".to_string());
        args.push(format!("{}M", memory_megabytes(memory, divisor)));
    }

    args.extend(config.extra_args.iter().cloned());

    args
}

/// LSF reserves memory per core, `divisor` converts a per job figure to it
///
/// Rounds half up to the nearest megabyte (10^6 bytes).
pub fn memory_megabytes(memory_bytes: u64, divisor: u64) -> u64 {
    let denominator = BYTES_PER_MEGABYTE * u128::from(divisor.max(1));
    let rounded = (u128::from(memory_bytes) * 2 + denominator) / (denominator * 2);

    // the quotient is at most memory_bytes / 10^6, which always fits
    rounded as u64
}

/// prepend the submission prefix to the command run inside the job
pub fn build_final_invocation(prefix: Vec<String>, container_command: Vec<String>) -> Vec<String> {
    prefix.into_iter().chain(container_command).collect_vec()
}

/// shell escaped rendering of an invocation, for logging
pub fn shell_join(invocation: &[String]) -> String {
    invocation
        .iter()
        .map(|part| match shlex::try_quote(part) {
            Ok(quoted) => quoted.into_owned(),
            Err(_) => format!("{part:?}"),
        })
        .join(" ")
}
