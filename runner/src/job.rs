use crate::resources::ResourceRequest;
use std::path::PathBuf;

/// Identifies a single attempt of a task, used for job labels and log file names
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobIdentity {
    pub run_id: String,
    // starts at 1, increases with every retry of the same task
    pub try_counter: u32,
    pub host_dir: PathBuf,
}

impl JobIdentity {
    /// suffix disambiguating the log files of retries, empty for the first try
    pub fn try_suffix(&self) -> String {
        if self.try_counter > 1 {
            self.try_counter.to_string()
        } else {
            String::new()
        }
    }

    /// host side working directory mounted into the container
    pub fn work_dir(&self) -> PathBuf {
        self.host_dir.join("work")
    }
}

/// Everything needed to build the invocation of one task attempt
#[derive(Clone, Debug)]
pub struct TaskAttempt {
    pub identity: JobIdentity,
    pub resources: ResourceRequest,
    pub image: String,
    pub command: Vec<String>,
}
