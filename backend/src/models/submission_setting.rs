use crate::cli::SubmitArgs;
use blender::models::build::Build;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{fs, io};
use tracing::warn;

const SETTINGS_FILE_NAME: &str = "BlenderSettings.json";

/// Submission options remembered between two submissions, so the artist only types what changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SubmissionSetting {
    pub department: String,
    pub pool: String,
    pub secondary_pool: String,
    pub group: String,
    pub priority: u8,
    pub machine_limit: u32,
    pub is_blacklist: bool,
    pub machine_list: String,
    pub limit_groups: String,
    pub scene: Option<PathBuf>,
    pub frames: String,
    pub chunk_size: u32,
    pub output: String,
    pub threads: u32,
    pub build: Build,
    pub submit_scene: bool,
}

impl Default for SubmissionSetting {
    fn default() -> Self {
        Self {
            department: String::new(),
            pool: "none".to_owned(),
            secondary_pool: String::new(),
            group: "none".to_owned(),
            priority: 50,
            machine_limit: 0,
            is_blacklist: false,
            machine_list: String::new(),
            limit_groups: String::new(),
            scene: None,
            frames: String::new(),
            chunk_size: 1,
            output: String::new(),
            threads: 0,
            build: Build::None,
            submit_scene: false,
        }
    }
}

impl SubmissionSetting {
    pub fn get_settings_path(config_dir: &Path) -> PathBuf {
        config_dir.join(SETTINGS_FILE_NAME)
    }

    /// Load the last submission settings. A missing or unreadable file gives the defaults, it's only a convenience.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                warn!("Unable to parse submission settings {path:?}, using defaults: {e}");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let data = serde_json::to_string_pretty(&self).map_err(io::Error::other)?;
        fs::write(path, data)
    }

    /// Remember whatever was given on the command line.
    pub fn apply(&mut self, args: &SubmitArgs) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut self.department, &args.department);
        set(&mut self.pool, &args.pool);
        set(&mut self.secondary_pool, &args.secondary_pool);
        set(&mut self.group, &args.group);
        set(&mut self.priority, &args.priority);
        set(&mut self.machine_limit, &args.machine_limit);
        set(&mut self.is_blacklist, &args.blacklist);
        set(&mut self.machine_list, &args.machine_list);
        set(&mut self.limit_groups, &args.limit_groups);
        set(&mut self.frames, &args.frames);
        set(&mut self.chunk_size, &args.chunk_size);
        set(&mut self.output, &args.output);
        set(&mut self.threads, &args.threads);
        set(&mut self.build, &args.build);
        set(&mut self.submit_scene, &args.submit_scene);

        if let Some(scene) = &args.scene {
            self.scene = Some(scene.clone());
        }
        if let Some(platform) = &args.platform {
            self.build = Build::from_platform(platform);
        }
        if let Some(rendered) = &args.rendered_output {
            self.output = blender::models::output_path::to_placeholder(rendered);
        }
    }
}
