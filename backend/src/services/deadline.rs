use blender::submission::SubmissionFiles;
use std::path::{Path, PathBuf};
use std::{env, fs, io};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

// On MacOS the installer leaves the deadline bin folder here instead of an environment variable
const MACOS_DEADLINE_PATH_FILE: &str = "/Users/Shared/Thinkbox/DEADLINE_PATH";

#[cfg(target_os = "windows")]
const DEADLINE_COMMAND: &str = "deadlinecommand.exe";
#[cfg(not(target_os = "windows"))]
const DEADLINE_COMMAND: &str = "deadlinecommand";

#[derive(Debug, Error)]
pub enum DeadlineError {
    #[error("Unable to run {path:?}: {source}")]
    Command {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Deadline rejected the submission (exit code {code:?}):\n{output}")]
    Rejected { code: Option<i32>, output: String },
}

/// Locate deadlinecommand from the DEADLINE_PATH value, or the MacOS DEADLINE_PATH file.
/// Otherwise hope it's on PATH.
pub fn deadline_command_from(env_path: Option<String>, file_path: Option<String>) -> PathBuf {
    let bin = env_path
        .or(file_path)
        .map(|p| p.trim().to_owned())
        .filter(|p| !p.is_empty());
    match bin {
        Some(dir) => Path::new(&dir).join(DEADLINE_COMMAND),
        None => PathBuf::from(DEADLINE_COMMAND),
    }
}

pub fn find_deadline_command(configured: Option<&Path>) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }
    let env_path = env::var("DEADLINE_PATH").ok();
    let file_path = fs::read_to_string(MACOS_DEADLINE_PATH_FILE).ok();
    deadline_command_from(env_path, file_path)
}

/// Hand the job files over to deadline and return what it said.
pub async fn submit(command: &Path, files: &SubmissionFiles) -> Result<String, DeadlineError> {
    let args = files.arguments();
    debug!("Running {command:?} {args:?}");

    let output = Command::new(command)
        .args(&args)
        .output()
        .await
        .map_err(|source| DeadlineError::Command {
            path: command.to_path_buf(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if output.status.success() {
        Ok(stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(DeadlineError::Rejected {
            code: output.status.code(),
            output: format!("{stdout}\n{}", stderr.trim()).trim().to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_variable_comes_first() {
        let path = deadline_command_from(
            Some("/opt/Thinkbox/Deadline10/bin".to_owned()),
            Some("/Applications/Thinkbox/Deadline10/Resources".to_owned()),
        );
        assert_eq!(
            path,
            Path::new("/opt/Thinkbox/Deadline10/bin").join(DEADLINE_COMMAND)
        );
    }

    #[test]
    fn macos_file_is_trimmed() {
        let path = deadline_command_from(
            None,
            Some("/Applications/Thinkbox/Deadline10/Resources\n".to_owned()),
        );
        assert_eq!(
            path,
            Path::new("/Applications/Thinkbox/Deadline10/Resources").join(DEADLINE_COMMAND)
        );
    }

    #[test]
    fn fall_back_to_path() {
        assert_eq!(
            deadline_command_from(Some("  ".to_owned()), None),
            PathBuf::from(DEADLINE_COMMAND)
        );
    }

    #[test]
    fn configured_command_wins() {
        let configured = PathBuf::from("/custom/deadlinecommand");
        assert_eq!(find_deadline_command(Some(&configured)), configured);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn submit_passes_files_in_order() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let command = dir.path().join("deadlinecommand");
        fs::write(&command, "#!/bin/sh\necho \"Result=Success\"\necho \"$@\"\n").unwrap();
        fs::set_permissions(&command, fs::Permissions::from_mode(0o755)).unwrap();

        let files = SubmissionFiles {
            job_info: PathBuf::from("job.job"),
            plugin_info: PathBuf::from("plugin.job"),
            scene_file: Some(PathBuf::from("scene.blend")),
        };
        let output = submit(&command, &files).await.unwrap();
        assert_eq!(output, "Result=Success\njob.job plugin.job scene.blend");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_submission_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let command = dir.path().join("deadlinecommand");
        fs::write(&command, "#!/bin/sh\necho \"Error: no repository\" >&2\nexit 1\n").unwrap();
        fs::set_permissions(&command, fs::Permissions::from_mode(0o755)).unwrap();

        let files = SubmissionFiles {
            job_info: PathBuf::from("job.job"),
            plugin_info: PathBuf::from("plugin.job"),
            scene_file: None,
        };
        let err = submit(&command, &files).await.unwrap_err();
        assert!(matches!(
            err,
            DeadlineError::Rejected { code: Some(1), ref output } if output == "Error: no repository"
        ));
    }
}
