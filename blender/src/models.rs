pub mod args;
pub mod build;
pub mod frame_list;
pub mod job_info;
pub mod key_value;
pub mod output_path;
pub mod platform;
pub mod plugin_config;
pub mod plugin_info;
pub mod status;
