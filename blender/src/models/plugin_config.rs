/*
    Developer blog:
    - Deadline keeps the list of blender executables in the plugin configuration, one
    semicolon separated list per version. The render node takes the first one that exists.
    - On Windows the artist can force a 32 or 64 bit build. We can't trust the file name for
    that, so we read the machine type out of the PE header instead.
*/
use super::{build::Build, platform::Platform};
use crate::blender::BlenderError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const SETTINGS_PATH: &str = "BlendFarm";
pub const SETTINGS_FILE_NAME: &str = "DeadlineBlender.json";

const DEFAULT_RENDER_EXECUTABLE: &str = "C:\\Program Files\\Blender Foundation\\Blender\\blender.exe;\
C:\\Program Files (x86)\\Blender Foundation\\Blender\\blender.exe;\
/usr/bin/blender;\
/usr/local/blender/blender;\
/Applications/Blender.app/Contents/MacOS/Blender";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to find config directory!")]
    NoConfigDir,
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("Unable to parse plugin config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Replace a path prefix with another, e.g. a Windows share with its Linux mount point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapping {
    pub from: String,
    pub to: String,
}

/// Render node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Semicolon separated list of executables to try, used when no version specific list exist.
    pub render_executable: String,
    /// Version to semicolon separated list of executables.
    #[serde(default)]
    pub version_executables: HashMap<String, String>,
    /// Applied in order, first match wins.
    #[serde(default)]
    pub path_mappings: Vec<PathMapping>,
    /// Where the submitter writes job and plugin info files before handing them to deadline.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    /// Path to deadlinecommand, otherwise found with DEADLINE_PATH.
    #[serde(default)]
    pub deadline_command: Option<PathBuf>,
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join(SETTINGS_PATH)
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            render_executable: DEFAULT_RENDER_EXECUTABLE.to_owned(),
            version_executables: HashMap::new(),
            path_mappings: Vec::new(),
            temp_dir: default_temp_dir(),
            deadline_command: None,
        }
    }
}

impl PluginConfig {
    // this path should always be fixed and stored under machine specific.
    pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
        let path = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join(SETTINGS_PATH);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::get_config_dir()?.join(SETTINGS_FILE_NAME))
    }

    /// Load the config file, if the file does not exist a default one is created and saved.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Plugin config not found, creating a new one at {path:?}");
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::get_config_path()?)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(&self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Executable list for the requested version, fall back to the generic list.
    pub fn executables_for(&self, version: Option<&str>) -> &str {
        version
            .map(|v| v.trim().to_lowercase())
            .and_then(|v| self.version_executables.get(&v))
            .unwrap_or(&self.render_executable)
    }

    /// Apply the first matching path mapping to the path.
    pub fn map_path(&self, path: &str, platform: Platform) -> String {
        let normalized = path.replace('\\', "/");
        for mapping in &self.path_mappings {
            let from = mapping.from.replace('\\', "/");
            let Some(head) = normalized.get(..from.len()).filter(|_| !from.is_empty()) else {
                continue;
            };
            let rest = &normalized[from.len()..];
            let matched = if platform.is_windows() {
                head.eq_ignore_ascii_case(&from)
            } else {
                head == from
            };
            if matched {
                return format!("{}{}", mapping.to, rest);
            }
        }
        path.to_owned()
    }

    /// Find the blender executable to run for this version and build.
    pub fn resolve_executable(
        &self,
        version: Option<&str>,
        build: Build,
        platform: Platform,
    ) -> Result<PathBuf, BlenderError> {
        search_executable(self.executables_for(version), build, platform)
    }
}

fn candidates(list: &str) -> impl Iterator<Item = PathBuf> + '_ {
    list.split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .filter(|p| p.is_file())
}

/// Search a semicolon separated list of executables for the first one that exists.
/// The build is only enforced on Windows, if nothing of that build exist we take anything we can find.
pub fn search_executable(
    list: &str,
    build: Build,
    platform: Platform,
) -> Result<PathBuf, BlenderError> {
    if platform.is_windows() && build != Build::None {
        info!("Enforcing {build} build of Blender");
        if let Some(exe) = candidates(list).find(|p| executable_build(p) == Some(build)) {
            return Ok(exe);
        }
        warn!(
            "{build} Blender render executable was not found in the semicolon separated list \"{list}\". Checking for any executable that exists instead."
        );
    }

    info!("Not enforcing a build of Blender");
    candidates(list)
        .next()
        .ok_or_else(|| BlenderError::ExecutableNotFound(list.to_owned()))
}

/// Read the machine type of a windows executable. None if it's not a PE file, or an unknown machine.
pub fn executable_build(path: impl AsRef<Path>) -> Option<Build> {
    let mut file = File::open(path).ok()?;
    let mut dos_header = [0u8; 0x40];
    file.read_exact(&mut dos_header).ok()?;
    if &dos_header[..2] != b"MZ" {
        return None;
    }

    let pe_offset = u32::from_le_bytes([
        dos_header[0x3C],
        dos_header[0x3D],
        dos_header[0x3E],
        dos_header[0x3F],
    ]);
    file.seek(SeekFrom::Start(u64::from(pe_offset))).ok()?;

    let mut pe_header = [0u8; 6];
    file.read_exact(&mut pe_header).ok()?;
    if &pe_header[..4] != b"PE\0\0" {
        return None;
    }

    match u16::from_le_bytes([pe_header[4], pe_header[5]]) {
        0x014C => Some(Build::Bit32),       // i386
        0x8664 | 0xAA64 => Some(Build::Bit64), // amd64, arm64
        _ => None,
    }
}
