use crate::catalog::AssetId;
use crate::registry::CueId;

/// Result alias that carries the custom [`SoundboardError`] type.
pub type Result<T> = std::result::Result<T, SoundboardError>;

/// Common error type for the core crate.
///
/// Registry and playback errors are local and non-fatal: a narration session
/// must never crash because of one bad cue or a missing file. Persistence
/// errors are the exception and propagate to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SoundboardError {
    /// A cue offset fell outside the current document bounds. This is a
    /// caller bug; UI adapters treat it as a no-op after logging.
    #[error("offset {offset} is outside the document (length {len})")]
    OutOfRange { offset: usize, len: usize },
    /// The referenced cue does not exist (or was already removed).
    #[error("unknown cue {0}")]
    CueNotFound(CueId),
    /// The asset's file is gone or was never registered; firing it is
    /// skipped rather than surfaced as a blocking failure.
    #[error("sound asset `{0}` is not available")]
    MissingAsset(AssetId),
    /// The file at the given path is not a recognized audio format.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
    /// A project file failed structural validation. The live session state
    /// is left untouched when this is raised during a load.
    #[error("project file is corrupt: {0}")]
    CorruptFile(String),
    /// The audio output backend reported a failure.
    #[error("audio backend error: {0}")]
    Backend(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
