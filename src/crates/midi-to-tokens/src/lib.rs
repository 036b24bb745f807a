//! MIDI to performance token converter library
//!
//! Reads Standard MIDI Files into codec instruments, and writes decoded notes
//! and token streams back out.

pub mod midi;
pub mod note;
pub mod output;

use anyhow::{Context, Result};
use perf_codec::{Note, Token};
use std::path::Path;
use tracing_subscriber::EnvFilter;

// Re-export main types for convenience
pub use midi::{MidiData, TrackInstrument};
pub use output::{read_tokens_json, write_midi, write_tokens_json, MidiWriteOptions};

/// Encode every instrument of a MIDI file into one token stream.
pub fn encode_file(path: &Path) -> Result<Vec<Token>> {
    let midi = MidiData::from_file(path)?;
    tracing::debug!(
        path = %path.display(),
        instruments = midi.instruments.len(),
        notes = midi.note_count(),
        "parsed MIDI file"
    );
    Ok(perf_codec::encode_instruments(&midi.codec_instruments()))
}

/// Decode a token stream and render it as MIDI bytes.
pub fn decode_to_midi(
    tokens: &[Token],
    options: &MidiWriteOptions,
) -> Result<(Vec<Note>, Vec<u8>)> {
    let decoded = perf_codec::decode_with_report(tokens).context("Failed to decode tokens")?;
    if decoded.report.orphan_note_offs > 0 {
        tracing::info!(
            orphans = decoded.report.orphan_note_offs,
            "removed note offs without a matching note on"
        );
    }
    let bytes = write_midi(&decoded.notes, options)?;
    Ok((decoded.notes, bytes))
}

/// Install the stderr log subscriber used by the command line tools.
///
/// `RUST_LOG` takes precedence over the quiet flag.
pub fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scale.mid");
        let notes: Vec<Note> = (0..8u32)
            .map(|i| {
                let start = f64::from(i * 25) / 100.0;
                let end = f64::from(i * 25 + 20) / 100.0;
                Note::new(60 + i as u8, 64, start, end)
            })
            .collect();
        std::fs::write(&path, write_midi(&notes, &MidiWriteOptions::default()).unwrap()).unwrap();

        let tokens = encode_file(&path).unwrap();
        let (decoded, bytes) = decode_to_midi(&tokens, &MidiWriteOptions::default()).unwrap();
        assert_eq!(decoded, notes);
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_decode_rejects_invalid_tokens() {
        assert!(decode_to_midi(&[1000], &MidiWriteOptions::default()).is_err());
    }
}
