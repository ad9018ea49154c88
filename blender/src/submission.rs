/*
    Developer blog:
    - A submission is two files handed to deadlinecommand: the job info (how Deadline schedules
    the job) and the plugin info (how the render node runs blender). The scene file is passed
    as a third argument when the artist wants it copied along with the job.
    - Validation mirrors what Deadline's own submitter checks before writing anything.
*/
use crate::models::{
    build::Build,
    frame_list::{FrameList, FrameListError},
    job_info::JobInfo,
    key_value, output_path,
    plugin_info::PluginInfo,
};
use std::fmt::{self, Display};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const JOB_INFO_FILE_NAME: &str = "blender_job_info.job";
pub const PLUGIN_INFO_FILE_NAME: &str = "blender_plugin_info.job";

// where network shares are usually mounted outside of windows
const NETWORK_MOUNTS: &[&str] = &["/Volumes/", "/mnt/", "/net/"];

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("The Blender file {0:?} does not exist")]
    SceneNotFound(PathBuf),
    #[error("The directory of the output file {0} does not exist.")]
    OutputDirectoryNotFound(String),
    #[error(transparent)]
    InvalidFrames(#[from] FrameListError),
    #[error("Unable to write submission files: {0}")]
    Io(#[from] io::Error),
}

/// Things that don't stop the submission, but the artist should know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitWarning {
    LocalScene(PathBuf),
    LocalOutput(String),
}

impl Display for SubmitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitWarning::LocalScene(scene) => write!(
                f,
                "The Blender file {scene:?} is local, render nodes may not be able to reach it."
            ),
            SubmitWarning::LocalOutput(output) => write!(
                f,
                "The output file {output} is local, render nodes may not be able to reach it."
            ),
        }
    }
}

/// Best guess whether a path lives on this machine rather than on a network share.
pub fn is_path_local(path: &str) -> bool {
    let path = path.replace('\\', "/");
    if path.starts_with("//") {
        return false;
    }
    !NETWORK_MOUNTS.iter().any(|mount| path.starts_with(mount))
}

/// Job and plugin info files written to disk, ready for deadlinecommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionFiles {
    pub job_info: PathBuf,
    pub plugin_info: PathBuf,
    /// Present when the scene is submitted along with the job
    pub scene_file: Option<PathBuf>,
}

impl SubmissionFiles {
    /// Arguments to give to deadlinecommand, in order.
    pub fn arguments(&self) -> Vec<PathBuf> {
        let mut args = vec![self.job_info.clone(), self.plugin_info.clone()];
        if let Some(scene) = &self.scene_file {
            args.push(scene.clone());
        }
        args
    }
}

/// Everything the artist filled in to submit a blender job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSubmission {
    pub scene_file: PathBuf,
    /// Copy the scene along with the job instead of reading it from its current location
    pub submit_scene: bool,
    /// Blank keeps the output path saved in the scene
    pub output: String,
    pub threads: u32,
    pub build: Build,
    pub version: Option<String>,
    pub job: JobInfo,
}

impl JobSubmission {
    /// Job name falls back to the scene's file name.
    pub fn default_name(scene_file: &Path) -> String {
        scene_file
            .file_stem()
            .map(|name| name.to_string_lossy().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| JobInfo::default().name)
    }

    fn output_template(&self) -> Option<String> {
        match self.output.trim() {
            "" => None,
            output => Some(output_path::ensure_placeholder(output)),
        }
    }

    /// Check the submission can render. Returns warnings the artist should confirm.
    pub fn validate(&self) -> Result<Vec<SubmitWarning>, SubmitError> {
        let mut warnings = Vec::new();

        if !self.scene_file.is_file() {
            return Err(SubmitError::SceneNotFound(self.scene_file.clone()));
        }
        if !self.submit_scene && is_path_local(&self.scene_file.to_string_lossy()) {
            warnings.push(SubmitWarning::LocalScene(self.scene_file.clone()));
        }

        let output = self.output.trim();
        if !output.is_empty() {
            let directory = output_path::directory(output);
            if !Path::new(directory).is_dir() {
                return Err(SubmitError::OutputDirectoryNotFound(directory.to_owned()));
            }
            if is_path_local(output) {
                warnings.push(SubmitWarning::LocalOutput(output.to_owned()));
            }
        }

        FrameList::parse(&self.job.frames)?;
        Ok(warnings)
    }

    pub fn job_info(&self) -> JobInfo {
        JobInfo {
            output_filename: self.output_template(),
            ..self.job.clone()
        }
    }

    pub fn plugin_info(&self) -> PluginInfo {
        PluginInfo {
            scene_file: (!self.submit_scene).then(|| self.scene_file.to_string_lossy().to_string()),
            output_file: self.output_template(),
            threads: self.threads,
            build: self.build,
            version: self.version.clone(),
            ..Default::default()
        }
    }

    /// Write job and plugin info into the directory.
    pub fn write(&self, directory: impl AsRef<Path>) -> Result<SubmissionFiles, SubmitError> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory)?;

        let job_info = directory.join(JOB_INFO_FILE_NAME);
        key_value::write(&job_info, &self.job_info().to_entries())?;

        let plugin_info = directory.join(PLUGIN_INFO_FILE_NAME);
        key_value::write(&plugin_info, &self.plugin_info().to_entries())?;

        Ok(SubmissionFiles {
            job_info,
            plugin_info,
            scene_file: self.submit_scene.then(|| self.scene_file.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn submission(dir: &TempDir) -> JobSubmission {
        let scene_file = dir.path().join("shot_010.blend");
        fs::write(&scene_file, b"BLENDER").unwrap();
        JobSubmission {
            scene_file,
            submit_scene: true,
            output: String::new(),
            threads: 0,
            build: Build::None,
            version: None,
            job: JobInfo {
                frames: "1-100".to_owned(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn default_name_is_scene_stem() {
        assert_eq!(
            JobSubmission::default_name(Path::new("/projects/shot_010.blend")),
            "shot_010"
        );
        assert_eq!(JobSubmission::default_name(Path::new("")), "Untitled");
    }

    #[test]
    fn missing_scene_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut submission = submission(&dir);
        submission.scene_file = dir.path().join("missing.blend");
        assert!(matches!(
            submission.validate(),
            Err(SubmitError::SceneNotFound(_))
        ));
    }

    #[test]
    fn invalid_frames_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut submission = submission(&dir);
        submission.job.frames = "1-".to_owned();
        assert!(matches!(
            submission.validate(),
            Err(SubmitError::InvalidFrames(_))
        ));
    }

    #[test]
    fn missing_output_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut submission = submission(&dir);
        submission.output = dir
            .path()
            .join("missing/shot_####.png")
            .to_string_lossy()
            .to_string();
        assert!(matches!(
            submission.validate(),
            Err(SubmitError::OutputDirectoryNotFound(_))
        ));
    }

    #[test]
    fn local_paths_are_warned_about() {
        let dir = tempfile::tempdir().unwrap();
        let mut submission = submission(&dir);
        submission.submit_scene = false;
        submission.output = dir.path().join("shot_.png").to_string_lossy().to_string();

        let warnings = submission.validate().unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(matches!(warnings[0], SubmitWarning::LocalScene(_)));
        assert!(matches!(warnings[1], SubmitWarning::LocalOutput(_)));
    }

    #[test]
    fn network_paths_are_not_local() {
        assert!(!is_path_local("\\\\server\\share\\scene.blend"));
        assert!(!is_path_local("/Volumes/projects/scene.blend"));
        assert!(!is_path_local("/mnt/projects/scene.blend"));
        assert!(is_path_local("/home/artist/scene.blend"));
        assert!(is_path_local("C:\\projects\\scene.blend"));
    }

    #[test]
    fn output_gets_a_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let mut submission = submission(&dir);
        submission.output = "/renders/shot_.png".to_owned();
        assert_eq!(
            submission.job_info().output_filename.as_deref(),
            Some("/renders/shot_####.png")
        );
        assert_eq!(
            submission.plugin_info().output_file.as_deref(),
            Some("/renders/shot_####.png")
        );
    }

    #[test]
    fn bundled_scene_goes_on_the_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let submission = submission(&dir);
        let files = submission.write(dir.path().join("temp")).unwrap();

        assert_eq!(submission.plugin_info().scene_file, None);
        assert_eq!(
            files.arguments(),
            vec![
                files.job_info.clone(),
                files.plugin_info.clone(),
                submission.scene_file.clone()
            ]
        );

        let job = key_value::read(&files.job_info).unwrap();
        assert_eq!(job["Plugin"], "Blender");
        assert_eq!(job["Frames"], "1-100");
        let plugin = key_value::read(&files.plugin_info).unwrap();
        assert!(!plugin.contains_key("SceneFile"));
        assert_eq!(plugin["Build"], "None");
    }

    #[test]
    fn shared_scene_is_referenced_in_plugin_info() {
        let dir = tempfile::tempdir().unwrap();
        let mut submission = submission(&dir);
        submission.submit_scene = false;
        let files = submission.write(dir.path()).unwrap();

        assert_eq!(files.arguments().len(), 2);
        let plugin = key_value::read(&files.plugin_info).unwrap();
        assert_eq!(
            plugin["SceneFile"],
            submission.scene_file.to_string_lossy().to_string()
        );
    }
}
