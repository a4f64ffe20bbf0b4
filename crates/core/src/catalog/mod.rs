use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, SoundboardError};

/// Stable identifier for a sound asset: its path relative to the sounds
/// directory, with forward slashes. This is what project files store, so an
/// asset keeps its identity across rescans and across machines as long as
/// the file keeps its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn from_relative_path(path: &Path) -> Self {
        Self(path.to_string_lossy().replace('\\', "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File format tag, derived from the extension. Anything else is not
/// registered by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Ogg,
}

impl AudioFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp3" => Some(Self::Mp3),
            "wav" => Some(Self::Wav),
            "ogg" => Some(Self::Ogg),
            _ => None,
        }
    }
}

/// One registered sound file.
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: AssetId,
    pub display_name: String,
    /// Absolute path used for playback. May no longer exist, in which case
    /// `available` is false and firing yields `MissingAsset`.
    pub path: PathBuf,
    pub format: AudioFormat,
    pub available: bool,
}

/// Registry of known sound assets, in discovery order.
///
/// The external directory scanner feeds this catalog; cue anchors and
/// playback only ever refer to assets through their [`AssetId`]. A file that
/// disappears between scans is marked unavailable rather than dropped, so
/// cues referencing it still resolve for display.
#[derive(Debug, Default)]
pub struct AssetCatalog {
    assets: Vec<Asset>,
    index: HashMap<AssetId, usize>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one audio file. Idempotent: a path already known under the
    /// same relative id returns the existing id and flips it back to
    /// available. Files without a recognized audio extension are rejected.
    pub fn register(&mut self, path: &Path, sounds_root: &Path) -> Result<AssetId> {
        let format = AudioFormat::from_path(path)
            .ok_or_else(|| SoundboardError::UnsupportedFormat(path.display().to_string()))?;
        let relative = path.strip_prefix(sounds_root).unwrap_or(path);
        let id = AssetId::from_relative_path(relative);

        if let Some(&slot) = self.index.get(&id) {
            self.assets[slot].available = true;
            return Ok(id);
        }

        let display_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.as_str().to_string());
        self.index.insert(id.clone(), self.assets.len());
        self.assets.push(Asset {
            id: id.clone(),
            display_name,
            path: path.to_path_buf(),
            format,
            available: true,
        });
        Ok(id)
    }

    pub fn resolve(&self, id: &AssetId) -> Option<&Asset> {
        self.index.get(id).map(|&slot| &self.assets[slot])
    }

    /// All known assets, in the order they were first discovered.
    pub fn list(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Marks an asset whose backing file has vanished. The entry is kept so
    /// existing cue references remain resolvable for display.
    pub fn mark_unavailable(&mut self, id: &AssetId) {
        if let Some(&slot) = self.index.get(id) {
            self.assets[slot].available = false;
        }
    }

    /// Updates the name shown in the grid and in glyph tooltips.
    pub fn rename(&mut self, id: &AssetId, name: impl Into<String>) -> Result<()> {
        let slot = *self
            .index
            .get(id)
            .ok_or_else(|| SoundboardError::MissingAsset(id.clone()))?;
        self.assets[slot].display_name = name.into();
        Ok(())
    }

    /// Used by project load: makes sure `id` resolves to something. Unknown
    /// ids get a placeholder entry marked unavailable, so cues loaded from
    /// a project whose files moved away surface for relinking instead of
    /// being dropped.
    pub fn ensure_loaded(&mut self, id: &AssetId, display_name: &str) {
        if self.index.contains_key(id) {
            return;
        }
        let format = AudioFormat::from_path(Path::new(id.as_str())).unwrap_or(AudioFormat::Wav);
        self.index.insert(id.clone(), self.assets.len());
        self.assets.push(Asset {
            id: id.clone(),
            display_name: display_name.to_string(),
            path: PathBuf::from(id.as_str()),
            format,
            available: false,
        });
    }

    /// Walks the sounds directory recursively and registers every recognized
    /// audio file. Creates the directory when missing. Idempotent across
    /// repeated calls; assets whose files disappeared since the previous
    /// scan are marked unavailable. Returns the number of available assets.
    pub fn rescan(&mut self, sounds_root: &Path) -> Result<usize> {
        if !sounds_root.exists() {
            fs::create_dir_all(sounds_root)?;
        }

        let mut seen = Vec::new();
        let mut stack = vec![sounds_root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    stack.push(path);
                } else if AudioFormat::from_path(&path).is_some() {
                    seen.push(self.register(&path, sounds_root)?);
                }
            }
        }

        for asset in &mut self.assets {
            if !seen.contains(&asset.id) {
                asset.available = false;
            }
        }
        tracing::debug!(found = seen.len(), "sounds directory scanned");
        Ok(seen.len())
    }
}
