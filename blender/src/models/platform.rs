use serde::{Deserialize, Serialize};
use std::env::consts;

/// Operating system family the render node runs on. Only matters for how paths are written.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        match consts::OS {
            "windows" => Platform::Windows,
            _ => Platform::Unix,
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::Windows)
    }

    /// Rewrite path separators for this platform.
    /// On Windows, a path starting with a single backslash gets a second one so it's read as a UNC path.
    pub fn normalize_path(&self, path: &str) -> String {
        match self {
            Platform::Windows => {
                let path = path.replace('/', "\\");
                if path.starts_with('\\') && !path.starts_with("\\\\") {
                    format!("\\{path}")
                } else {
                    path
                }
            }
            Platform::Unix => path.replace('\\', "/"),
        }
    }
}
