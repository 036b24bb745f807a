use crate::event::{Token, VOCAB_SIZE};

pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors surfaced to codec callers.
///
/// Recoverable anomalies (clamped pedal releases, orphaned note-offs in the
/// default decode mode, zero-length notes) are counted in reports instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid token {0}: expected a value below {}", VOCAB_SIZE)]
    InvalidToken(Token),

    #[error("Note off for pitch {pitch} at {time:.2}s has no matching note on")]
    OrphanNoteOff { pitch: u8, time: f64 },
}
