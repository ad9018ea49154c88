/*
    Developer blog:
    - This crate used to be the place to download, install and invoke blender for the farm.
    Now the farm itself (scheduling, dispatch, retries) belongs to Deadline, so what's left
    here is everything a worker needs to run one task: find the executable, build the
    command line, watch stdout and turn it into progress Deadline can display.
    - The submission side lives here too (job and plugin descriptor files), so the
    backend only has to glue the cli to it.
*/

// container for blender installation and the process host running a task
pub mod blender;

// data structures shared between the worker and the submitter
pub mod models;

// Turn blender stdout into a task progress percentage and status message
pub mod render_progress;

// validate and write job submissions
pub mod submission;
