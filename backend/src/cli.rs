use blender::models::{build::Build, job_info::OnJobComplete};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blendfarm-deadline")]
#[command(version = "0.1.0")]
#[command(
    about = "Submit Blender jobs to Deadline and run them on render nodes with progress reporting."
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the plugin config and sticky submission settings
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the frames of one task and report progress
    Render(RenderArgs),
    /// Submit a Blender job to Deadline
    Submit(SubmitArgs),
    /// Show the plugin config, create it if missing
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Plugin info file of the job
    #[arg(long)]
    pub plugin_info: PathBuf,
    /// First frame of the task
    #[arg(long, allow_hyphen_values = true)]
    pub start: i32,
    /// Last frame of the task (inclusive)
    #[arg(long, allow_hyphen_values = true)]
    pub end: i32,
    /// Scene file submitted along with the job, used when the plugin info has no SceneFile
    #[arg(long)]
    pub data_file: Option<PathBuf>,
}

// Options are remembered between submissions, anything left out comes from the last submission.
#[derive(Args, Debug, Clone, Default)]
pub struct SubmitArgs {
    /// Blender file to render
    pub scene: Option<PathBuf>,
    /// Frames to render, e.g. 1-100 or 1,5,10-20x2
    #[arg(long, allow_hyphen_values = true)]
    pub frames: Option<String>,
    /// Override the output path saved in the scene
    #[arg(long, conflicts_with = "rendered_output")]
    pub output: Option<String>,
    /// Output path blender resolved for the first frame, digits are turned back into `#`
    #[arg(long)]
    pub rendered_output: Option<String>,
    /// Number of threads to render with, 0 lets blender decide
    #[arg(long)]
    pub threads: Option<u32>,
    /// Force a 32bit or 64bit build of blender
    #[arg(long, conflicts_with = "platform")]
    pub build: Option<Build>,
    /// Blender build platform, e.g. Windows64, used to pick the build
    #[arg(long)]
    pub platform: Option<String>,
    /// Blender version, selects the executable list on the render node
    #[arg(long = "blender-version")]
    pub blender_version: Option<String>,

    /// Job name, defaults to the scene file name
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub comment: Option<String>,
    #[arg(long)]
    pub department: Option<String>,
    #[arg(long)]
    pub pool: Option<String>,
    #[arg(long)]
    pub secondary_pool: Option<String>,
    #[arg(long)]
    pub group: Option<String>,
    /// 0 to 100
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub priority: Option<u8>,
    /// Minutes before a task is requeued, 0 for no limit
    #[arg(long)]
    pub task_timeout: Option<u32>,
    #[arg(long)]
    pub auto_timeout: bool,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub concurrent_tasks: Option<u8>,
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub limit_concurrent_tasks: Option<bool>,
    /// 0 for no limit
    #[arg(long)]
    pub machine_limit: Option<u32>,
    /// Machine list is a deny list instead of an allow list
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub blacklist: Option<bool>,
    #[arg(long)]
    pub machine_list: Option<String>,
    #[arg(long)]
    pub limit_groups: Option<String>,
    /// Job ids this job waits for
    #[arg(long)]
    pub dependencies: Option<String>,
    #[arg(long)]
    pub on_job_complete: Option<OnJobComplete>,
    #[arg(long)]
    pub suspended: bool,
    /// Frames per task
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub chunk_size: Option<u32>,
    /// Copy the scene along with the job
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub submit_scene: Option<bool>,

    /// Submit even if scene or output are local paths
    #[arg(short, long)]
    pub yes: bool,
    /// Write the job files and print them without submitting
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_render_task() {
        let cli = Cli::try_parse_from([
            "blendfarm-deadline",
            "render",
            "--plugin-info",
            "/jobs/plugin_info.job",
            "--start",
            "-5",
            "--end",
            "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.start, -5);
                assert_eq!(args.end, 10);
                assert_eq!(args.data_file, None);
            }
            _ => panic!("expected render command"),
        }
    }

    #[test]
    fn parse_submission() {
        let cli = Cli::try_parse_from([
            "blendfarm-deadline",
            "submit",
            "/projects/shot.blend",
            "--frames",
            "1-100",
            "--build",
            "64bit",
            "--submit-scene",
            "--blacklist",
            "false",
            "--on-job-complete",
            "archive",
        ])
        .unwrap();
        match cli.command {
            Commands::Submit(args) => {
                assert_eq!(args.scene, Some(PathBuf::from("/projects/shot.blend")));
                assert_eq!(args.build, Some(Build::Bit64));
                assert_eq!(args.submit_scene, Some(true));
                assert_eq!(args.blacklist, Some(false));
                assert_eq!(args.on_job_complete, Some(OnJobComplete::Archive));
                assert!(!args.dry_run);
            }
            _ => panic!("expected submit command"),
        }
    }

    #[test]
    fn priority_is_bounded() {
        let result = Cli::try_parse_from(["blendfarm-deadline", "submit", "--priority", "101"]);
        assert!(result.is_err());
    }

    #[test]
    fn output_conflicts_with_rendered_output() {
        let result = Cli::try_parse_from([
            "blendfarm-deadline",
            "submit",
            "--output",
            "/renders/a_####.png",
            "--rendered-output",
            "/renders/a_0001.png",
        ]);
        assert!(result.is_err());
    }
}
