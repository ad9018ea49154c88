use crate::blender::BlenderError;
use std::path::PathBuf;

/// Event sent back by a running render task, in the order blender printed them.
#[derive(Debug)]
pub enum Status {
    /// Task progress changed. Progress goes from 0 to 100.
    Running { progress: f32, status: String },
    /// Blender output that wasn't used for progress.
    Log { status: String },
    Warning { message: String },
    /// The task failed, nothing else will be sent after this.
    Error(BlenderError),
    /// Blender saved a frame. The path is None if we couldn't read it from the output.
    Completed { frame: i32, result: Option<PathBuf> },
    /// Blender exited successfully.
    Exit,
}
