use std::path::Path;
use std::time::SystemTime;

use crate::catalog::{AssetCatalog, AssetId};
use crate::config::AppConfig;
use crate::playback::{AudioBackend, FireSource, HandleId, PlaybackCoordinator};
use crate::project::{AssetRecord, CueRecord, CueStatus, ProjectFile};
use crate::registry::{CueAnchor, CueId, CueRegistry, CueState, RegistryEvent};
use crate::{Result, SoundboardError};

/// The live narration session: document text, cue registry, asset catalog
/// and playback, held together as one explicit object instead of ambient
/// globals.
///
/// Every UI event the host consumes maps to one method here. All mutation
/// goes through `&mut self`, so the host's event dispatch gives the engine
/// the strictly serial edit sequence its offset math depends on.
pub struct StorySession {
    config: AppConfig,
    text: String,
    registry: CueRegistry,
    catalog: AssetCatalog,
    playback: PlaybackCoordinator,
}

impl StorySession {
    pub fn new(backend: Box<dyn AudioBackend>, config: AppConfig) -> Self {
        let mut playback = PlaybackCoordinator::new(backend);
        playback.set_master_volume(config.master_volume);
        Self {
            config,
            text: String::new(),
            registry: CueRegistry::new(),
            catalog: AssetCatalog::new(),
            playback,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn document_len(&self) -> usize {
        self.text.len()
    }

    pub fn registry(&self) -> &CueRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn playback(&self) -> &PlaybackCoordinator {
        &self.playback
    }

    /// Rescans the configured sounds directory.
    pub fn scan_sounds(&mut self) -> Result<usize> {
        let root = self.config.sounds_dir.clone();
        self.catalog.rescan(&root)
    }

    /// `onDragDropAsset`: the drop gesture resolved to a document offset.
    pub fn drop_asset(&mut self, asset: AssetId, offset: usize) -> Result<CueId> {
        if self.catalog.resolve(&asset).is_none() {
            return Err(SoundboardError::MissingAsset(asset));
        }
        self.registry.insert_cue(asset, offset, self.text.len())
    }

    /// `onDocumentDelta`: splices the text and rebases every anchor in one
    /// step, so the registry never observes a document it was not rebased
    /// against. Offsets are byte offsets; a delta that would split a UTF-8
    /// code point is rejected as `OutOfRange` before anything mutates.
    pub fn edit(&mut self, edit_start: usize, deleted_len: usize, inserted: &str) -> Result<()> {
        let end = edit_start.checked_add(deleted_len).filter(|&e| e <= self.text.len());
        let Some(end) = end else {
            tracing::warn!(edit_start, deleted_len, "document delta outside bounds");
            return Err(SoundboardError::OutOfRange {
                offset: edit_start.saturating_add(deleted_len),
                len: self.text.len(),
            });
        };
        if !self.text.is_char_boundary(edit_start) || !self.text.is_char_boundary(end) {
            tracing::warn!(edit_start, end, "document delta splits a code point");
            return Err(SoundboardError::OutOfRange {
                offset: edit_start,
                len: self.text.len(),
            });
        }

        self.text.replace_range(edit_start..end, inserted);
        self.registry.rebase(edit_start, deleted_len, inserted.len());
        Ok(())
    }

    /// `onCueClicked`: fires the cue. A missing asset or a stale cue id is
    /// logged and swallowed; mid-narration a dead glyph must stay a no-op,
    /// not a dialog.
    pub fn cue_clicked(&mut self, cue: CueId) -> Option<HandleId> {
        match self
            .playback
            .fire(FireSource::Cue(cue), &self.registry, &self.catalog)
        {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(%cue, %err, "cue fire skipped");
                None
            }
        }
    }

    /// Fires an asset straight from the grid (no cue, per-cue volume 1.0).
    pub fn fire_asset(&mut self, asset: AssetId) -> Option<HandleId> {
        match self
            .playback
            .fire(FireSource::Asset(asset.clone()), &self.registry, &self.catalog)
        {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(%asset, %err, "asset fire skipped");
                None
            }
        }
    }

    /// `onMasterVolumeChanged`.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.playback.set_master_volume(volume);
    }

    pub fn set_cue_volume(&mut self, cue: CueId, volume: f32) -> Result<()> {
        self.registry.set_volume(cue, volume)
    }

    pub fn remove_cue(&mut self, cue: CueId) -> bool {
        self.registry.remove_cue(cue)
    }

    pub fn reattach_cue(&mut self, cue: CueId, offset: usize) -> Result<()> {
        self.registry.reattach(cue, offset, self.text.len())
    }

    pub fn discard_cue(&mut self, cue: CueId) -> bool {
        self.registry.discard(cue)
    }

    pub fn rename_asset(&mut self, asset: &AssetId, name: impl Into<String>) -> Result<()> {
        self.catalog.rename(asset, name)
    }

    pub fn stop_all(&mut self) {
        self.playback.stop_all();
    }

    pub fn reap_finished(&mut self) -> usize {
        self.playback.reap()
    }

    /// Drains pending marker notifications for the document adapter.
    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        self.registry.take_events()
    }

    /// Snapshots the session for persistence. Detached cues are included;
    /// their configuration is user effort worth keeping across sessions.
    pub fn snapshot(&self) -> ProjectFile {
        let mut cues: Vec<CueRecord> = self
            .registry
            .list_active()
            .into_iter()
            .chain(self.registry.list_detached())
            .map(|anchor| CueRecord {
                cue_id: anchor.id.raw(),
                asset: anchor.asset.as_str().to_string(),
                offset: anchor.offset(),
                per_cue_volume: anchor.volume,
                status: if anchor.is_detached() {
                    CueStatus::Detached
                } else {
                    CueStatus::Active
                },
            })
            .collect();
        cues.sort_by_key(|c| c.cue_id);

        ProjectFile {
            version: 1,
            text: self.text.clone(),
            master_volume: self.playback.master_volume(),
            cues,
            assets: self
                .catalog
                .list()
                .map(|asset| AssetRecord {
                    path: asset.id.as_str().to_string(),
                    display_name: asset.display_name.clone(),
                })
                .collect(),
        }
    }

    /// `onSaveRequested`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        crate::project::save_project(&self.snapshot(), path)
    }

    /// `onLoadRequested`: parses first, mutates only on success, so a
    /// corrupt file leaves the previous session intact.
    pub fn load_from(&mut self, path: &Path) -> Result<()> {
        let project = crate::project::load_project(path)?;
        self.apply_project(project);
        Ok(())
    }

    /// Same as [`load_from`], for hosts that already hold the file bytes.
    ///
    /// [`load_from`]: Self::load_from
    pub fn load_from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let project = crate::project::parse_project(bytes)?;
        self.apply_project(project);
        Ok(())
    }

    /// Replaces the live state with a fully parsed project. Infallible by
    /// construction: every record either resolves against the catalog or
    /// degrades to a detached cue over a placeholder asset, never a drop.
    pub fn apply_project(&mut self, project: ProjectFile) {
        for record in &project.assets {
            self.catalog
                .ensure_loaded(&AssetId::from(record.path.as_str()), &record.display_name);
        }

        let mut registry = CueRegistry::new();
        for record in project.cues {
            let asset = AssetId::from(record.asset.as_str());
            if self.catalog.resolve(&asset).is_none() {
                // Asset gone from both catalog and snapshot: keep the cue
                // around a placeholder so the user can relink it.
                let name = Path::new(asset.as_str())
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| asset.as_str().to_string());
                self.catalog.ensure_loaded(&asset, &name);
            }

            let state = match (record.status, record.offset) {
                (CueStatus::Active, Some(offset)) if offset <= project.text.len() => {
                    CueState::Active { offset }
                }
                _ => CueState::Detached,
            };
            registry.restore(CueAnchor {
                id: CueId::from_raw(record.cue_id),
                asset,
                state,
                volume: record.per_cue_volume.clamp(0.0, 1.0),
                created_at: SystemTime::now(),
            });
        }

        self.text = project.text;
        self.registry = registry;
        self.playback.set_master_volume(project.master_volume);
        tracing::info!(
            cues = self.registry.len(),
            text_len = self.text.len(),
            "project applied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::NullBackend;
    use std::fs;

    fn session_with_creak() -> (StorySession, AssetId) {
        let mut session = StorySession::new(
            Box::new(NullBackend::new()),
            AppConfig::with_sounds_dir("sounds"),
        );
        let asset = session
            .catalog
            .register(Path::new("sounds/creak.wav"), Path::new("sounds"))
            .unwrap();
        (session, asset)
    }

    #[test]
    fn typing_before_a_cue_keeps_it_anchored_to_its_word() {
        let (mut session, asset) = session_with_creak();
        session.edit(0, 0, "The door creaks open").unwrap();
        let cue = session.drop_asset(asset, 4).unwrap();

        session.edit(0, 0, "old ").unwrap();
        assert_eq!(session.text(), "old The door creaks open");
        assert_eq!(session.registry().get(cue).unwrap().offset(), Some(8));

        // Deleting "old The d" swallows the anchor.
        session.edit(0, 9, "").unwrap();
        assert!(session.registry().get(cue).unwrap().is_detached());
    }

    #[test]
    fn drop_outside_document_is_rejected() {
        let (mut session, asset) = session_with_creak();
        session.edit(0, 0, "hi").unwrap();
        let err = session.drop_asset(asset, 3).unwrap_err();
        assert!(matches!(err, SoundboardError::OutOfRange { .. }));
    }

    #[test]
    fn drop_of_unknown_asset_is_rejected() {
        let (mut session, _) = session_with_creak();
        let err = session.drop_asset(AssetId::from("ghost.wav"), 0).unwrap_err();
        assert!(matches!(err, SoundboardError::MissingAsset(_)));
    }

    #[test]
    fn edit_rejects_code_point_splits() {
        let (mut session, _) = session_with_creak();
        session.edit(0, 0, "héllo").unwrap();
        // 'é' occupies bytes 1..3; byte 2 is not a boundary.
        let err = session.edit(2, 0, "x").unwrap_err();
        assert!(matches!(err, SoundboardError::OutOfRange { .. }));
        assert_eq!(session.text(), "héllo");
    }

    #[test]
    fn clicking_a_cue_with_a_missing_file_is_a_quiet_no_op() {
        let (mut session, asset) = session_with_creak();
        session.edit(0, 0, "boo").unwrap();
        let cue = session.drop_asset(asset.clone(), 0).unwrap();
        session.catalog.mark_unavailable(&asset);

        assert!(session.cue_clicked(cue).is_none());
        assert!(session.playback().active_handles().is_empty());
    }

    #[test]
    fn save_and_load_round_trips_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.json");

        let (mut session, asset) = session_with_creak();
        session.edit(0, 0, "The door creaks open").unwrap();
        let cue = session.drop_asset(asset.clone(), 4).unwrap();
        session.set_cue_volume(cue, 0.8).unwrap();
        let detached = session.drop_asset(asset, 9).unwrap();
        session.edit(8, 3, "").unwrap();
        assert!(session.registry().get(detached).unwrap().is_detached());
        session.set_master_volume(0.5);
        session.save_to(&path).unwrap();

        let (mut restored, _) = session_with_creak();
        restored.load_from(&path).unwrap();

        assert_eq!(restored.text(), session.text());
        assert_eq!(restored.playback().master_volume(), 0.5);
        assert_eq!(restored.registry().len(), 2);

        let cue = restored.registry().get(cue).unwrap();
        assert_eq!(cue.offset(), Some(4));
        assert_eq!(cue.volume, 0.8);
        assert!(restored.registry().get(detached).unwrap().is_detached());
    }

    #[test]
    fn corrupt_load_leaves_live_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, b"{broken").unwrap();

        let (mut session, asset) = session_with_creak();
        session.edit(0, 0, "safe").unwrap();
        session.drop_asset(asset, 2).unwrap();

        let err = session.load_from(&path).unwrap_err();
        assert!(matches!(err, SoundboardError::CorruptFile(_)));
        assert_eq!(session.text(), "safe");
        assert_eq!(session.registry().len(), 1);
    }

    #[test]
    fn loading_an_unresolvable_asset_keeps_the_cue_detached() {
        let project = ProjectFile {
            version: 1,
            text: "echoes".to_string(),
            master_volume: 1.0,
            cues: vec![CueRecord {
                cue_id: 5,
                asset: "gone/echo.ogg".to_string(),
                offset: Some(3),
                per_cue_volume: 1.0,
                status: CueStatus::Active,
            }],
            assets: Vec::new(),
        };

        let (mut session, _) = session_with_creak();
        session.apply_project(project);

        let asset = AssetId::from("gone/echo.ogg");
        let placeholder = session.catalog().resolve(&asset).unwrap();
        assert!(!placeholder.available);

        // The anchor keeps its position; only firing fails.
        let cue = CueId::from_raw(5);
        assert_eq!(session.registry().get(cue).unwrap().offset(), Some(3));
        assert!(session.cue_clicked(cue).is_none());
    }

    #[test]
    fn loaded_offsets_outside_the_text_degrade_to_detached() {
        let project = ProjectFile {
            version: 1,
            text: "ab".to_string(),
            master_volume: 1.0,
            cues: vec![CueRecord {
                cue_id: 0,
                asset: "creak.wav".to_string(),
                offset: Some(9),
                per_cue_volume: 1.0,
                status: CueStatus::Active,
            }],
            assets: Vec::new(),
        };

        let (mut session, _) = session_with_creak();
        session.apply_project(project);
        assert!(session
            .registry()
            .get(CueId::from_raw(0))
            .unwrap()
            .is_detached());
    }
}
