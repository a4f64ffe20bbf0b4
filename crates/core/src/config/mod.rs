use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory scanned for sound files.
    pub sounds_dir: PathBuf,
    /// Default location for the project file.
    pub project_file: PathBuf,
    /// Master volume applied to new sessions, in `[0, 1]`.
    pub master_volume: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sounds_dir: PathBuf::from("sounds"),
            project_file: PathBuf::from("soundboard_project.json"),
            master_volume: 1.0,
        }
    }
}

impl AppConfig {
    pub fn with_sounds_dir(sounds_dir: impl Into<PathBuf>) -> Self {
        Self {
            sounds_dir: sounds_dir.into(),
            ..Self::default()
        }
    }
}
