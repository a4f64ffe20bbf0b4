use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::catalog::{AssetCatalog, AssetId};
use crate::registry::{CueId, CueRegistry};
use crate::{Result, SoundboardError};

/// Opaque token minted by an [`AudioBackend`] for one in-progress voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendVoice(pub u64);

/// Capability interface over the audio output layer.
///
/// The core never assumes a codec or device model; anything that can start a
/// file at a volume and stop it again qualifies. The app crate ships a rodio
/// implementation, tests and headless runs use [`NullBackend`].
pub trait AudioBackend {
    fn play(&mut self, path: &Path, volume: f32) -> Result<BackendVoice>;
    fn stop(&mut self, voice: BackendVoice);
    /// Whether the voice has drained. Unknown voices count as finished.
    fn is_finished(&self, voice: BackendVoice) -> bool;
}

/// Identifier for one live playback instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice-{}", self.0)
    }
}

/// Bookkeeping for one fired sound. Ephemeral: created on fire, dropped when
/// the voice drains or is explicitly stopped.
#[derive(Debug)]
pub struct PlaybackHandle {
    pub id: HandleId,
    /// `None` when the sound was fired straight from the grid rather than
    /// through an inline cue.
    pub cue: Option<CueId>,
    pub asset: AssetId,
    pub effective_volume: f32,
    pub started_at: SystemTime,
    voice: BackendVoice,
}

/// What to fire: an inline cue (per-cue volume applies) or a bare asset.
#[derive(Debug, Clone)]
pub enum FireSource {
    Cue(CueId),
    Asset(AssetId),
}

/// Dispatches cue fires to the audio backend and tracks live handles.
///
/// Firing is fire-and-forget: `fire` returns as soon as the backend accepted
/// the voice. There is deliberately no debouncing; a narrator re-firing the
/// same cue in quick succession wants layered copies, so every fire yields
/// an independent handle. Cue volume and asset path are read once at fire
/// time; a cue deleted a moment later simply lets its sound finish.
pub struct PlaybackCoordinator {
    backend: Box<dyn AudioBackend>,
    master_volume: f32,
    next_handle: u64,
    handles: BTreeMap<HandleId, PlaybackHandle>,
}

impl PlaybackCoordinator {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            master_volume: 1.0,
            next_handle: 0,
            handles: BTreeMap::new(),
        }
    }

    /// Resolves the source and starts playback at
    /// `clamp(master x per-cue, 0, 1)`. Unavailable assets yield
    /// `MissingAsset`; unknown cues yield `CueNotFound`.
    pub fn fire(
        &mut self,
        source: FireSource,
        registry: &CueRegistry,
        catalog: &AssetCatalog,
    ) -> Result<HandleId> {
        let (cue, asset_id, per_cue) = match source {
            FireSource::Cue(id) => {
                let anchor = registry.get(id).ok_or(SoundboardError::CueNotFound(id))?;
                (Some(id), anchor.asset.clone(), anchor.volume)
            }
            FireSource::Asset(id) => (None, id, 1.0),
        };

        let asset = catalog
            .resolve(&asset_id)
            .filter(|a| a.available)
            .ok_or_else(|| SoundboardError::MissingAsset(asset_id.clone()))?;

        let effective_volume = (self.master_volume * per_cue).clamp(0.0, 1.0);
        let voice = self.backend.play(&asset.path, effective_volume)?;

        let id = HandleId(self.next_handle);
        self.next_handle += 1;
        self.handles.insert(
            id,
            PlaybackHandle {
                id,
                cue,
                asset: asset_id.clone(),
                effective_volume,
                started_at: SystemTime::now(),
                voice,
            },
        );
        tracing::debug!(%id, asset = %asset_id, effective_volume, "cue fired");
        Ok(id)
    }

    /// Stops one voice. Idempotent: `false` when the handle was already gone.
    pub fn stop(&mut self, id: HandleId) -> bool {
        match self.handles.remove(&id) {
            Some(handle) => {
                self.backend.stop(handle.voice);
                true
            }
            None => false,
        }
    }

    /// Panic button: stops every live voice.
    pub fn stop_all(&mut self) {
        for (_, handle) in std::mem::take(&mut self.handles) {
            self.backend.stop(handle.voice);
        }
    }

    /// Clamps and stores the master level for future fires. Voices already
    /// playing keep the volume they started with; the backend contract has
    /// no way to adjust them mid-flight and this coordinator does not
    /// pretend otherwise.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Drops handles whose backend voice has drained. Returns how many were
    /// reaped.
    pub fn reap(&mut self) -> usize {
        let finished: Vec<_> = self
            .handles
            .values()
            .filter(|h| self.backend.is_finished(h.voice))
            .map(|h| h.id)
            .collect();
        for id in &finished {
            self.handles.remove(id);
        }
        finished.len()
    }

    pub fn active_handles(&self) -> Vec<&PlaybackHandle> {
        self.handles.values().collect()
    }
}

impl fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("master_volume", &self.master_volume)
            .field("active", &self.handles.len())
            .finish()
    }
}

/// Backend that accepts every play and produces no sound. Used by tests and
/// by headless commands that only need the bookkeeping.
#[derive(Debug, Default)]
pub struct NullBackend {
    plays: Vec<(PathBuf, f32)>,
    stopped: Vec<BackendVoice>,
    finished: Vec<BackendVoice>,
    next_voice: u64,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths and volumes of every `play` call, in order.
    pub fn plays(&self) -> &[(PathBuf, f32)] {
        &self.plays
    }

    pub fn stopped(&self) -> &[BackendVoice] {
        &self.stopped
    }

    /// Test hook: pretend the voice drained on its own.
    pub fn finish(&mut self, voice: BackendVoice) {
        self.finished.push(voice);
    }
}

impl AudioBackend for NullBackend {
    fn play(&mut self, path: &Path, volume: f32) -> Result<BackendVoice> {
        let voice = BackendVoice(self.next_voice);
        self.next_voice += 1;
        self.plays.push((path.to_path_buf(), volume));
        Ok(voice)
    }

    fn stop(&mut self, voice: BackendVoice) {
        self.stopped.push(voice);
        self.finished.push(voice);
    }

    fn is_finished(&self, voice: BackendVoice) -> bool {
        self.finished.contains(&voice)
    }
}
