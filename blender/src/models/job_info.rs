use super::key_value;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use thiserror::Error;

pub const PLUGIN_NAME: &str = "Blender";
pub const MAXIMUM_PRIORITY: u8 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown on job complete action \"{0}\", expected Nothing, Archive or Delete")]
pub struct OnJobCompleteError(String);

/// What Deadline does with the job once every task is done.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnJobComplete {
    #[default]
    Nothing,
    Archive,
    Delete,
}

impl Display for OnJobComplete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            OnJobComplete::Nothing => "Nothing",
            OnJobComplete::Archive => "Archive",
            OnJobComplete::Delete => "Delete",
        };
        write!(f, "{value}")
    }
}

impl FromStr for OnJobComplete {
    type Err = OnJobCompleteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nothing" => Ok(OnJobComplete::Nothing),
            "archive" => Ok(OnJobComplete::Archive),
            "delete" => Ok(OnJobComplete::Delete),
            _ => Err(OnJobCompleteError(s.to_owned())),
        }
    }
}

/// Either avoid the listed machines, or only render on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineList {
    Blacklist(String),
    Whitelist(String),
}

impl Default for MachineList {
    fn default() -> Self {
        MachineList::Whitelist(String::new())
    }
}

// python spelling, deadline is fine with it.
fn flag(value: bool) -> String {
    let value = if value { "True" } else { "False" };
    value.to_owned()
}

/// Job info file content, describe how Deadline should schedule the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    pub name: String,
    pub comment: String,
    pub department: String,
    pub pool: String,
    pub secondary_pool: String,
    pub group: String,
    pub priority: u8,
    /// 0 for no limit
    pub task_timeout_minutes: u32,
    pub enable_auto_timeout: bool,
    pub concurrent_tasks: u8,
    pub limit_concurrent_tasks_to_number_of_cpus: bool,
    /// 0 for no limit
    pub machine_limit: u32,
    pub machine_list: MachineList,
    pub limit_groups: String,
    pub job_dependencies: String,
    pub on_job_complete: OnJobComplete,
    pub submit_suspended: bool,
    pub frames: String,
    pub chunk_size: u32,
    /// Output path with a `#` placeholder for the frame number
    pub output_filename: Option<String>,
}

impl Default for JobInfo {
    fn default() -> Self {
        Self {
            name: "Untitled".to_owned(),
            comment: String::new(),
            department: String::new(),
            pool: "none".to_owned(),
            secondary_pool: String::new(),
            group: "none".to_owned(),
            priority: MAXIMUM_PRIORITY / 2,
            task_timeout_minutes: 0,
            enable_auto_timeout: false,
            concurrent_tasks: 1,
            limit_concurrent_tasks_to_number_of_cpus: true,
            machine_limit: 0,
            machine_list: MachineList::default(),
            limit_groups: String::new(),
            job_dependencies: String::new(),
            on_job_complete: OnJobComplete::default(),
            submit_suspended: false,
            frames: String::new(),
            chunk_size: 1,
            output_filename: None,
        }
    }
}

impl JobInfo {
    pub fn to_entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            ("Plugin", PLUGIN_NAME.to_owned()),
            ("Name", self.name.clone()),
            ("Comment", self.comment.clone()),
            ("Department", self.department.clone()),
            ("Pool", self.pool.clone()),
            ("SecondaryPool", self.secondary_pool.clone()),
            ("Group", self.group.clone()),
            ("Priority", self.priority.min(MAXIMUM_PRIORITY).to_string()),
            ("TaskTimeoutMinutes", self.task_timeout_minutes.to_string()),
            ("EnableAutoTimeout", flag(self.enable_auto_timeout)),
            ("ConcurrentTasks", self.concurrent_tasks.to_string()),
            (
                "LimitConcurrentTasksToNumberOfCpus",
                flag(self.limit_concurrent_tasks_to_number_of_cpus),
            ),
            ("MachineLimit", self.machine_limit.to_string()),
        ];

        entries.push(match &self.machine_list {
            MachineList::Blacklist(machines) => ("Blacklist", machines.clone()),
            MachineList::Whitelist(machines) => ("Whitelist", machines.clone()),
        });

        entries.push(("LimitGroups", self.limit_groups.clone()));
        entries.push(("JobDependencies", self.job_dependencies.clone()));
        entries.push(("OnJobComplete", self.on_job_complete.to_string()));

        if self.submit_suspended {
            entries.push(("InitialStatus", "Suspended".to_owned()));
        }

        entries.push(("Frames", self.frames.clone()));
        entries.push(("ChunkSize", self.chunk_size.to_string()));

        if let Some(output) = &self.output_filename {
            entries.push(("OutputFilename0", output.clone()));
        }

        entries
    }
}

impl Display for JobInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", key_value::to_lines(&self.to_entries()))
    }
}
