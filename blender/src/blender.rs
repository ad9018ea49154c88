use crate::models::{args::Args, status::Status};
use crate::render_progress::{Classifier, Outcome, ProgressReport, ProgressState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, error, info, warn};

// how many status can pile up before blender stdout is no longer read
const STATUS_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum BlenderError {
    // The line blender printed is the whole reason.
    #[error("{0}")]
    RenderFailed(String),
    #[error("Blender render executable was not found in the semicolon separated list \"{0}\". The path to the render executable can be configured in the plugin config.")]
    ExecutableNotFound(String),
    #[error("Unable to run blender: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blender exited with code {0:?}")]
    ProcessExited(Option<i32>),
    #[error("Invalid output pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Blender stdout is not available")]
    NoStdout,
}

/// Blender structure to hold path to executable and how to run it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blender {
    /// Path to blender executable on the system.
    executable: PathBuf,
    /// Keep the lines used for progress out of the log
    suppress_output: bool,
}

impl Blender {
    /// Create a new blender struct with provided path. Note this is not checked and enforced!
    ///
    /// # Examples
    /// ```
    /// use blender::blender::Blender;
    /// let blender = Blender::new("path/to/blender");
    /// ```
    pub fn new(executable: impl AsRef<Path>) -> Self {
        Self {
            executable: executable.as_ref().to_path_buf(),
            suppress_output: true,
        }
    }

    pub fn with_suppressed_output(mut self, suppress_output: bool) -> Self {
        self.suppress_output = suppress_output;
        self
    }

    pub fn get_executable(&self) -> &Path {
        &self.executable
    }

    /// Render the frames of one task.
    /// Status are sent back as blender prints them. The channel ends with either [`Status::Exit`] or [`Status::Error`].
    /// Dropping the receiver kills blender.
    pub async fn render(&self, args: &Args) -> Result<Receiver<Status>, BlenderError> {
        let classifier = Classifier::new()?;
        info!("Running {:?} {}", self.executable, args);

        let mut child = Command::new(&self.executable)
            .args(args.create_arg_list())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        let stdout = child.stdout.take().ok_or(BlenderError::NoStdout)?;

        let (sender, receiver) = mpsc::channel(STATUS_BUFFER);
        let monitor = RenderMonitor::new(
            classifier,
            ProgressState::from_frames(args.start(), args.end()),
            args.start(),
            self.suppress_output,
        );

        tokio::spawn(async move {
            let watch = match monitor.watch(BufReader::new(stdout), &sender).await {
                Ok(watch) => watch,
                Err(e) => {
                    let _ = child.kill().await;
                    let _ = sender.send(Status::Error(e.into())).await;
                    return;
                }
            };

            match watch {
                Watch::Failed | Watch::Abandoned => {
                    if let Err(e) = child.kill().await {
                        warn!("Unable to stop blender: {e}");
                    }
                }
                Watch::EndOfStream => {
                    let status = match child.wait().await {
                        Ok(code) if code.success() => Status::Exit,
                        Ok(code) => Status::Error(BlenderError::ProcessExited(code.code())),
                        Err(e) => Status::Error(e.into()),
                    };
                    let _ = sender.send(status).await;
                }
            }
        });

        Ok(receiver)
    }
}

/// How watching blender's output ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Watch {
    /// Blender closed stdout, it's either done or about to exit.
    EndOfStream,
    /// Blender printed something we can't recover from.
    Failed,
    /// Nobody is listening for status anymore.
    Abandoned,
}

/// Reads blender output line by line and turns it into [`Status`] for one task.
pub struct RenderMonitor {
    classifier: Classifier,
    state: ProgressState,
    start_frame: i32,
    suppress_output: bool,
}

impl RenderMonitor {
    pub fn new(
        classifier: Classifier,
        state: ProgressState,
        start_frame: i32,
        suppress_output: bool,
    ) -> Self {
        Self {
            classifier,
            state,
            start_frame,
            suppress_output,
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    fn running(report: ProgressReport) -> Status {
        Status::Running {
            progress: report.percent(),
            status: report.message,
        }
    }

    fn log_matched(&self, line: &str) {
        if self.suppress_output {
            debug!("{line}");
        } else {
            info!("{line}");
        }
    }

    /// Read until the end of the stream, or until blender prints a fatal error.
    pub async fn watch<R>(
        mut self,
        mut reader: R,
        sender: &Sender<Status>,
    ) -> std::io::Result<Watch>
    where
        R: AsyncBufRead + Unpin,
    {
        // before the first line, so the task doesn't sit on an empty status
        if sender.send(Self::running(self.state.report())).await.is_err() {
            return Ok(Watch::Abandoned);
        }

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            // file and object names come out in whatever encoding the OS handed blender
            let line = String::from_utf8_lossy(&buf)
                .trim_end_matches(['\r', '\n'])
                .to_owned();

            let mut statuses = Vec::with_capacity(2);
            match self.classifier.classify(&mut self.state, &line) {
                Some(Outcome::Progress(report)) => {
                    self.log_matched(&line);
                    statuses.push(Self::running(report));
                }
                Some(Outcome::FrameSaved { report, output }) => {
                    self.log_matched(&line);
                    let finished = self.state.finished_frames() as i32;
                    statuses.push(Status::Completed {
                        frame: self.start_frame.saturating_add(finished - 1),
                        result: output,
                    });
                    statuses.push(Self::running(report));
                }
                Some(Outcome::Fail(reason)) => {
                    error!("{reason}");
                    let _ = sender
                        .send(Status::Error(BlenderError::RenderFailed(reason)))
                        .await;
                    return Ok(Watch::Failed);
                }
                None if line.contains("Warning:") => {
                    warn!("{line}");
                    statuses.push(Status::Warning { message: line });
                }
                None => {
                    info!("{line}");
                    statuses.push(Status::Log { status: line });
                }
            }

            for status in statuses {
                if sender.send(status).await.is_err() {
                    return Ok(Watch::Abandoned);
                }
            }
        }

        Ok(Watch::EndOfStream)
    }
}
