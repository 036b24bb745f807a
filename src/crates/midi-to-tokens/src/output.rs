// Writers for decoded notes (Standard MIDI File) and token streams (JSON)

use anyhow::{Context, Result};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use perf_codec::{Note, Token};
use std::fs;
use std::path::Path;

/// Options for rendering decoded notes into a MIDI file
#[derive(Debug, Clone)]
pub struct MidiWriteOptions {
    /// Pulses per quarter note
    pub ppq: u16,
    pub bpm: f64,
    /// General MIDI program for the single output instrument
    pub program: u8,
    pub channel: u8,
}

impl Default for MidiWriteOptions {
    fn default() -> Self {
        MidiWriteOptions {
            ppq: 480,
            bpm: 120.0,
            program: 0,
            channel: 0,
        }
    }
}

impl MidiWriteOptions {
    fn ticks_per_second(&self) -> f64 {
        self.ppq as f64 * self.bpm / 60.0
    }
}

/// Render notes as a single-track MIDI file.
pub fn write_midi(notes: &[Note], options: &MidiWriteOptions) -> Result<Vec<u8>> {
    if options.ppq == 0 || options.ppq > 0x7FFF {
        anyhow::bail!("PPQ must be between 1 and 32767, got {}", options.ppq);
    }
    if !(options.bpm > 0.0) {
        anyhow::bail!("Tempo must be positive, got {}", options.bpm);
    }

    let channel = options.channel.min(15);
    let ticks_per_second = options.ticks_per_second();
    let to_tick = |seconds: f64| (seconds.max(0.0) * ticks_per_second).round() as u32;

    // (tick, is_on, kind): releases sort ahead of attacks on the same tick
    let mut events: Vec<(u32, bool, TrackEventKind)> = Vec::with_capacity(notes.len() * 2);
    for note in notes {
        let key = note.pitch.min(127);
        events.push((
            to_tick(note.start),
            true,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOn {
                    key: key.into(),
                    vel: note.velocity.min(127).into(),
                },
            },
        ));
        events.push((
            to_tick(note.end),
            false,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOff {
                    key: key.into(),
                    vel: 0.into(),
                },
            },
        ));
    }
    events.sort_by_key(|(tick, is_on, _)| (*tick, *is_on));

    let us_per_beat = (60_000_000.0 / options.bpm).round() as u32;
    let mut track = vec![
        TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(us_per_beat.into())),
        },
        TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::ProgramChange {
                    program: options.program.min(127).into(),
                },
            },
        },
    ];

    let mut last_tick = 0;
    for (tick, _, kind) in events {
        track.push(TrackEvent {
            delta: (tick - last_tick).into(),
            kind,
        });
        last_tick = tick;
    }
    track.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let smf = Smf {
        header: Header::new(Format::SingleTrack, Timing::Metrical(options.ppq.into())),
        tracks: vec![track],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| anyhow::anyhow!("Failed to write MIDI: {}", e))?;
    Ok(bytes)
}

pub fn write_tokens_json(path: &Path, tokens: &[Token]) -> Result<()> {
    let json = serde_json::to_string(tokens).context("Failed to serialize tokens")?;
    fs::write(path, format!("{}\n", json))
        .with_context(|| format!("Failed to write {}", path.display()))
}

pub fn read_tokens_json(path: &Path) -> Result<Vec<Token>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("{} is not a JSON array of tokens", path.display()))
}
