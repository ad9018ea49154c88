pub mod submission_setting;
