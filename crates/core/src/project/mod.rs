use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, SoundboardError};

fn default_volume() -> f32 {
    1.0
}

fn default_version() -> u32 {
    1
}

/// Whether a persisted cue still holds a document position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueStatus {
    #[default]
    Active,
    Detached,
}

/// One cue as written to the project file. Assets are referenced by their
/// sounds-directory-relative filename so a project survives the sounds
/// folder moving to a different absolute path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueRecord {
    pub cue_id: u64,
    pub asset: String,
    /// Absent for detached cues.
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default = "default_volume")]
    pub per_cue_volume: f32,
    #[serde(default)]
    pub status: CueStatus,
}

/// Catalog snapshot entry: enough to re-resolve or placeholder the asset on
/// load, and to keep user-chosen display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRecord {
    pub path: String,
    pub display_name: String,
}

/// The persisted aggregate: everything needed to restore a narration
/// session. Loading replaces the live state entirely or not at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(default = "default_version")]
    pub version: u32,
    pub text: String,
    pub master_volume: f32,
    #[serde(default)]
    pub cues: Vec<CueRecord>,
    #[serde(default)]
    pub assets: Vec<AssetRecord>,
}

/// Parses project bytes. Any structural mismatch maps to `CorruptFile`;
/// callers must not have touched live state before this succeeds.
pub fn parse_project(bytes: &[u8]) -> Result<ProjectFile> {
    serde_json::from_slice(bytes).map_err(|e| SoundboardError::CorruptFile(e.to_string()))
}

pub fn load_project(path: &Path) -> Result<ProjectFile> {
    let bytes = fs::read(path)?;
    parse_project(&bytes)
}

/// Writes the project as pretty-printed JSON. A bounded synchronous write;
/// hosts with a single-threaded UI should call this off the interactive
/// path.
pub fn save_project(project: &ProjectFile, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(project)
        .map_err(|e| SoundboardError::CorruptFile(e.to_string()))?;
    fs::write(path, json)?;
    tracing::info!(path = %path.display(), cues = project.cues.len(), "project saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProjectFile {
        ProjectFile {
            version: 1,
            text: "The door creaks open".to_string(),
            master_volume: 0.7,
            cues: vec![
                CueRecord {
                    cue_id: 0,
                    asset: "creak.wav".to_string(),
                    offset: Some(4),
                    per_cue_volume: 0.8,
                    status: CueStatus::Active,
                },
                CueRecord {
                    cue_id: 1,
                    asset: "thunder.mp3".to_string(),
                    offset: None,
                    per_cue_volume: 1.0,
                    status: CueStatus::Detached,
                },
            ],
            assets: vec![AssetRecord {
                path: "creak.wav".to_string(),
                display_name: "creak".to_string(),
            }],
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.json");

        let original = sample();
        save_project(&original, &path).unwrap();
        let loaded = load_project(&path).unwrap();

        assert_eq!(loaded.text, original.text);
        assert_eq!(loaded.master_volume, original.master_volume);
        assert_eq!(loaded.cues.len(), 2);
        assert_eq!(loaded.cues[1].status, CueStatus::Detached);
        assert_eq!(loaded.cues[1].offset, None);
        assert_eq!(loaded.assets[0].display_name, "creak");
    }

    #[test]
    fn missing_optional_fields_fall_back_to_defaults() {
        let json = br#"{
            "text": "hello",
            "master_volume": 0.5,
            "cues": [{"cue_id": 3, "asset": "creak.wav", "offset": 2}]
        }"#;

        let project = parse_project(json).unwrap();
        assert_eq!(project.version, 1);
        assert_eq!(project.cues[0].per_cue_volume, 1.0);
        assert_eq!(project.cues[0].status, CueStatus::Active);
        assert!(project.assets.is_empty());
    }

    #[test]
    fn structural_garbage_is_a_corrupt_file() {
        let err = parse_project(b"{not json").unwrap_err();
        assert!(matches!(err, SoundboardError::CorruptFile(_)));

        let err = parse_project(br#"{"text": 12}"#).unwrap_err();
        assert!(matches!(err, SoundboardError::CorruptFile(_)));
    }
}
