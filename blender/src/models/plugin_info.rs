use super::build::Build;
use super::key_value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::path::Path;
use thiserror::Error;

// Deadline's own spelling, keep the typo.
const SUPPRESS_OUTPUT_KEY: &str = "SupressOutput";

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Unable to read plugin info: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid value \"{value}\" for {key}")]
    InvalidValue { key: String, value: String },
}

/// Plugin info file content, describe how the render node should run blender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// None when the scene is submitted along the job, the render node then use its local copy.
    pub scene_file: Option<String>,
    pub output_file: Option<String>,
    /// 0 lets blender decide
    pub threads: u32,
    pub build: Build,
    /// Select the `Blender_<version>_RenderExecutable` list from the plugin config
    pub version: Option<String>,
    /// Hide the lines used for progress from the task log
    pub suppress_output: bool,
}

impl Default for PluginInfo {
    fn default() -> Self {
        Self {
            scene_file: None,
            output_file: None,
            threads: 0,
            build: Build::None,
            version: None,
            suppress_output: true,
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

impl PluginInfo {
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, DescriptorError> {
        let invalid = |key: &str, value: &str| DescriptorError::InvalidValue {
            key: key.to_owned(),
            value: value.to_owned(),
        };

        let threads = match non_blank(map.get("Threads")) {
            Some(value) => value.parse::<u32>().map_err(|_| invalid("Threads", &value))?,
            None => 0,
        };

        let build = match map.get("Build") {
            Some(value) => value.parse::<Build>().map_err(|_| invalid("Build", value))?,
            None => Build::None,
        };

        let suppress_output = match non_blank(map.get(SUPPRESS_OUTPUT_KEY)) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => return Err(invalid(SUPPRESS_OUTPUT_KEY, &value)),
            },
            None => true,
        };

        Ok(Self {
            scene_file: non_blank(map.get("SceneFile")),
            output_file: non_blank(map.get("OutputFile")),
            threads,
            build,
            version: non_blank(map.get("Version")),
            suppress_output,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DescriptorError> {
        let map = key_value::read(path)?;
        Self::from_map(&map)
    }

    pub fn to_entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();
        if let Some(scene) = &self.scene_file {
            entries.push(("SceneFile", scene.clone()));
        }
        if let Some(output) = &self.output_file {
            entries.push(("OutputFile", output.clone()));
        }
        entries.push(("Threads", self.threads.to_string()));
        entries.push(("Build", self.build.to_string()));
        if let Some(version) = &self.version {
            entries.push(("Version", version.clone()));
        }
        if !self.suppress_output {
            entries.push((SUPPRESS_OUTPUT_KEY, "False".to_owned()));
        }
        entries
    }
}

impl Display for PluginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", key_value::to_lines(&self.to_entries()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_scene_is_not_written() {
        let info = PluginInfo {
            output_file: Some("/renders/shot_####.png".to_owned()),
            threads: 8,
            build: Build::Bit64,
            ..Default::default()
        };
        assert_eq!(
            info.to_string(),
            "OutputFile=/renders/shot_####.png\nThreads=8\nBuild=64bit\n"
        );
    }

    #[test]
    fn read_plugin_info_written_by_submitter() {
        let content = "SceneFile=//server/projects/scene.blend\nThreads=4\nBuild=32bit\nVersion=4.1\n";
        let info = PluginInfo::from_map(&key_value::parse(content)).unwrap();
        assert_eq!(info.scene_file.as_deref(), Some("//server/projects/scene.blend"));
        assert_eq!(info.output_file, None);
        assert_eq!(info.threads, 4);
        assert_eq!(info.build, Build::Bit32);
        assert_eq!(info.version.as_deref(), Some("4.1"));
        assert!(info.suppress_output);
    }

    #[test]
    fn missing_entries_use_defaults() {
        let info = PluginInfo::from_map(&HashMap::new()).unwrap();
        assert_eq!(info, PluginInfo::default());
    }

    #[test]
    fn invalid_threads_is_an_error() {
        let map = key_value::parse("Threads=lots\n");
        assert!(matches!(
            PluginInfo::from_map(&map),
            Err(DescriptorError::InvalidValue { key, .. }) if key == "Threads"
        ));
    }

    #[test]
    fn output_suppression_can_be_turned_off() {
        let map = key_value::parse("SupressOutput=false\n");
        let info = PluginInfo::from_map(&map).unwrap();
        assert!(!info.suppress_output);
        assert!(info.to_string().contains("SupressOutput=False"));
    }
}
