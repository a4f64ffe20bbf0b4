use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::catalog::AssetId;
use crate::{Result, SoundboardError};

/// Identifier for one placed cue. Allocated from a per-registry counter and
/// kept stable across save/load.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CueId(u64);

impl CueId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position state of a cue anchor.
///
/// `Active` anchors hold a valid in-bounds offset. An anchor whose offset
/// fell inside a deleted span becomes `Detached`: it loses its place in the
/// document but keeps its asset binding and volume, so the user can re-place
/// it instead of silently losing configured work. Removal is terminal and
/// modeled by dropping the anchor from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueState {
    Active { offset: usize },
    Detached,
}

/// One inline sound trigger bound to a position in the narration document.
#[derive(Debug, Clone)]
pub struct CueAnchor {
    pub id: CueId,
    pub asset: AssetId,
    pub state: CueState,
    /// Per-cue volume multiplier in `[0, 1]`, applied on top of the master
    /// level at fire time.
    pub volume: f32,
    pub created_at: SystemTime,
}

impl CueAnchor {
    /// Current document offset, or `None` while detached.
    pub fn offset(&self) -> Option<usize> {
        match self.state {
            CueState::Active { offset } => Some(offset),
            CueState::Detached => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self.state, CueState::Detached)
    }
}

/// Notification for the document adapter, which owns the inline glyph
/// rendering. The registry never touches widgets; it only reports which cue
/// ids gained or lost a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    MarkerInserted { cue: CueId, offset: usize },
    MarkerRemoved { cue: CueId },
    CueDetached { cue: CueId },
}

/// Maps cue ids to document offsets and keeps that mapping valid as the
/// document mutates.
///
/// All mutation goes through `&mut self`, which enforces the engine's
/// sequencing invariant: no two `rebase`/`insert_cue`/`remove_cue` calls can
/// interleave, so the offset arithmetic always sees a consistent snapshot.
#[derive(Debug, Default)]
pub struct CueRegistry {
    cues: BTreeMap<CueId, CueAnchor>,
    next_id: u64,
    events: Vec<RegistryEvent>,
}

impl CueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a new cue at `offset`. Fails with `OutOfRange` when the offset
    /// lies outside `[0, doc_len]`. Placing the same asset at an offset it
    /// already occupies is idempotent and returns the existing cue id, so a
    /// double-delivered drop gesture cannot stack duplicate markers.
    pub fn insert_cue(&mut self, asset: AssetId, offset: usize, doc_len: usize) -> Result<CueId> {
        if offset > doc_len {
            tracing::warn!(offset, doc_len, "cue insertion outside document bounds");
            return Err(SoundboardError::OutOfRange {
                offset,
                len: doc_len,
            });
        }

        if let Some(existing) = self
            .cues
            .values()
            .find(|c| c.asset == asset && c.offset() == Some(offset))
        {
            return Ok(existing.id);
        }

        let id = CueId(self.next_id);
        self.next_id += 1;
        self.cues.insert(
            id,
            CueAnchor {
                id,
                asset,
                state: CueState::Active { offset },
                volume: 1.0,
                created_at: SystemTime::now(),
            },
        );
        self.events.push(RegistryEvent::MarkerInserted { cue: id, offset });
        Ok(id)
    }

    /// Removes a cue outright. Idempotent: returns `false` when the cue was
    /// already gone, which is never an error.
    pub fn remove_cue(&mut self, id: CueId) -> bool {
        if self.cues.remove(&id).is_some() {
            self.events.push(RegistryEvent::MarkerRemoved { cue: id });
            true
        } else {
            false
        }
    }

    /// Rebases every anchor after one document text delta: `deleted_len`
    /// characters removed at `edit_start`, `inserted_len` characters put in
    /// their place. Anchors before the edit are untouched; anchors past the
    /// deleted span shift by the length difference; anchors strictly inside
    /// the deleted span are detached, never removed.
    ///
    /// Tie-break: on a pure insertion, an anchor sitting exactly at
    /// `edit_start` stays put. New text is considered inserted after the
    /// anchor, so typing immediately before a glyph does not push it along.
    pub fn rebase(&mut self, edit_start: usize, deleted_len: usize, inserted_len: usize) {
        for anchor in self.cues.values_mut() {
            let CueState::Active { offset } = anchor.state else {
                continue;
            };
            if offset < edit_start {
                continue;
            }
            if deleted_len == 0 && offset == edit_start {
                continue;
            }
            if offset >= edit_start + deleted_len {
                anchor.state = CueState::Active {
                    offset: offset - deleted_len + inserted_len,
                };
            } else {
                anchor.state = CueState::Detached;
                self.events.push(RegistryEvent::CueDetached { cue: anchor.id });
            }
        }
    }

    /// Anchors currently placed in the document, ordered by offset (ties by
    /// cue id, for deterministic render order).
    pub fn list_active(&self) -> Vec<&CueAnchor> {
        let mut active: Vec<_> = self.cues.values().filter(|c| !c.is_detached()).collect();
        active.sort_by_key(|c| (c.offset(), c.id));
        active
    }

    /// Cues whose position was destroyed by an edit, awaiting re-placement
    /// or discard. Ordered by cue id.
    pub fn list_detached(&self) -> Vec<&CueAnchor> {
        self.cues.values().filter(|c| c.is_detached()).collect()
    }

    pub fn get(&self, id: CueId) -> Option<&CueAnchor> {
        self.cues.get(&id)
    }

    /// Sets the per-cue volume multiplier, clamped into `[0, 1]`.
    pub fn set_volume(&mut self, id: CueId, volume: f32) -> Result<()> {
        let anchor = self
            .cues
            .get_mut(&id)
            .ok_or(SoundboardError::CueNotFound(id))?;
        anchor.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    /// Re-places a detached cue at a new offset (Detached -> Active).
    pub fn reattach(&mut self, id: CueId, offset: usize, doc_len: usize) -> Result<()> {
        if offset > doc_len {
            return Err(SoundboardError::OutOfRange {
                offset,
                len: doc_len,
            });
        }
        let anchor = self
            .cues
            .get_mut(&id)
            .ok_or(SoundboardError::CueNotFound(id))?;
        anchor.state = CueState::Active { offset };
        self.events.push(RegistryEvent::MarkerInserted { cue: id, offset });
        Ok(())
    }

    /// Discards a detached cue for good. Same idempotence as [`remove_cue`].
    ///
    /// [`remove_cue`]: Self::remove_cue
    pub fn discard(&mut self, id: CueId) -> bool {
        self.remove_cue(id)
    }

    /// Drains pending marker notifications for the document adapter.
    pub fn take_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Reinserts an anchor rehydrated from a project file, keeping the id
    /// counter ahead of every loaded id.
    pub fn restore(&mut self, anchor: CueAnchor) {
        self.next_id = self.next_id.max(anchor.id.raw() + 1);
        self.cues.insert(anchor.id, anchor);
    }
}
