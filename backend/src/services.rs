pub mod deadline;
pub mod render_task;
pub mod submitter;
