/*
    Developer blog:
    - Deadline hands each render node a task: the plugin info of the job and the frame range to render.
    Everything blender needs is resolved here, on the node, because path mappings and executable
    locations are node specific.
    - Progress is reported as blender prints it. A fatal line ends the task right away, we don't wait for blender
    to notice it can't continue.
*/
use crate::cli::RenderArgs;
use anyhow::{Context, Result};
use blender::blender::{Blender, BlenderError};
use blender::models::{
    args::Args, platform::Platform, plugin_config::PluginConfig, plugin_info::PluginInfo,
    status::Status,
};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RenderTaskError {
    #[error("No scene file in the plugin info and no scene was submitted with the job")]
    NoSceneFile,
    #[error("Blender stopped reporting before the task finished")]
    Interrupted,
}

/// One task of a blender job, ready to run on this render node.
#[derive(Debug, Clone)]
pub struct RenderTask {
    blender: Blender,
    args: Args,
}

impl RenderTask {
    pub fn new(
        config: &PluginConfig,
        info: &PluginInfo,
        task: &RenderArgs,
        platform: Platform,
    ) -> Result<Self> {
        let scene = info
            .scene_file
            .clone()
            .or_else(|| {
                task.data_file
                    .as_ref()
                    .map(|f| f.to_string_lossy().to_string())
            })
            .ok_or(RenderTaskError::NoSceneFile)?;
        let scene = config.map_path(&scene, platform);

        let output = info
            .output_file
            .as_deref()
            .map(|output| config.map_path(output, platform))
            .unwrap_or_default();

        let args = Args::new(&scene, task.start, task.end, platform)
            .with_threads(info.threads)
            .with_output(&output, platform);

        let executable = config.resolve_executable(info.version.as_deref(), info.build, platform)?;
        let blender = Blender::new(executable).with_suppressed_output(info.suppress_output);

        Ok(Self { blender, args })
    }

    pub fn load(config: &PluginConfig, task: &RenderArgs) -> Result<Self> {
        let info = PluginInfo::load(&task.plugin_info)
            .with_context(|| format!("Unable to load plugin info {:?}", task.plugin_info))?;
        Self::new(config, &info, task, Platform::current())
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    pub fn blender(&self) -> &Blender {
        &self.blender
    }

    /// Render the task and wait for blender to finish.
    pub async fn run(&self) -> Result<()> {
        info!("Blender job starting...");
        let mut receiver = self.blender.render(&self.args).await?;

        while let Some(status) = receiver.recv().await {
            match status {
                Status::Running { progress, status } => info!("[Running] {progress:.1}% {status}"),
                // already logged by the monitor
                Status::Log { .. } | Status::Warning { .. } => {}
                Status::Completed { frame, result } => match result {
                    Some(path) => info!("[Completed] frame {frame} saved to {path:?}"),
                    None => warn!("[Completed] frame {frame}, unable to read where it was saved"),
                },
                Status::Error(e) => return Err(e.into()),
                Status::Exit => {
                    info!("Blender job finished.");
                    return Ok(());
                }
            }
        }

        Err(RenderTaskError::Interrupted.into())
    }
}

/// The monitor already logged the line blender failed on.
pub fn is_logged_render_failure(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<BlenderError>(),
        Some(BlenderError::RenderFailed(_))
    )
}

/// Whether the failure came from blender itself rather than from setting up the task.
pub fn is_render_failure(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<BlenderError>(),
        Some(BlenderError::RenderFailed(_) | BlenderError::ProcessExited(_))
    )
}
