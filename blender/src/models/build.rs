use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown build \"{0}\", expected None, 32bit or 64bit")]
pub struct BuildError(String);

/// Force a 32 or 64 bit blender executable. Only enforced on Windows.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Build {
    #[default]
    None,
    #[serde(rename = "32bit")]
    Bit32,
    #[serde(rename = "64bit")]
    Bit64,
}

impl Build {
    /// Guess the build from blender's `bpy.app.build_platform`, e.g. "Windows64" or "Linux-x86"
    pub fn from_platform(platform: &str) -> Self {
        if platform.contains("64") {
            Build::Bit64
        } else if platform.contains("32") || platform.contains("86") {
            Build::Bit32
        } else {
            Build::None
        }
    }
}

impl Display for Build {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Build::None => "None",
            Build::Bit32 => "32bit",
            Build::Bit64 => "64bit",
        };
        write!(f, "{value}")
    }
}

impl FromStr for Build {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Build::None),
            "32bit" => Ok(Build::Bit32),
            "64bit" => Ok(Build::Bit64),
            _ => Err(BuildError(s.to_owned())),
        }
    }
}
