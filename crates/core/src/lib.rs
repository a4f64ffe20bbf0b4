//! Core engine for the Story Soundboard application.
//!
//! The crate implements the inline cue embedding and playback machinery: the
//! asset catalog fed by the external directory scanner, the cue anchor
//! registry that keeps sound bindings attached to positions in an editable
//! document, the playback coordinator that dispatches possibly-overlapping
//! fires to an audio backend, and the persistence layer for project files.
//! The hosting UI (text widget, drag gestures, window chrome) stays outside;
//! this crate only ever deals in offsets, ids and file paths.

pub mod catalog;
pub mod config;
pub mod error;
pub mod playback;
pub mod project;
pub mod registry;
pub mod session;

pub use catalog::{Asset, AssetCatalog, AssetId, AudioFormat};
pub use config::AppConfig;
pub use error::{Result, SoundboardError};
pub use playback::{
    AudioBackend, BackendVoice, FireSource, HandleId, NullBackend, PlaybackCoordinator,
    PlaybackHandle,
};
pub use project::{
    load_project, parse_project, save_project, AssetRecord, CueRecord, CueStatus, ProjectFile,
};
pub use registry::{CueAnchor, CueId, CueRegistry, CueState, RegistryEvent};
pub use session::StorySession;
