use anyhow::{Context, Result};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use perf_codec::{ControlEvent, Instrument, Note};
use std::collections::BTreeMap;
use std::path::Path;

/// Controller number of the sustain (damper) pedal.
pub const SUSTAIN_CONTROLLER: u8 = 64;

/// Default tempo: 120 BPM = 500000 microseconds per beat
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Notes and pedal events of one channel within one track.
#[derive(Debug, Clone)]
pub struct TrackInstrument {
    pub track: usize,
    pub channel: u8,
    pub program: Option<u8>,
    pub name: Option<String>,
    pub notes: Vec<Note>,
    pub controls: Vec<ControlEvent>,
}

impl TrackInstrument {
    pub fn to_instrument(&self) -> Instrument {
        Instrument::new(self.notes.clone(), self.controls.clone())
    }
}

pub struct MidiData {
    pub bpm: f64,
    pub instruments: Vec<TrackInstrument>,
}

impl MidiData {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read MIDI file: {}", path.display()))?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let smf = Smf::parse(data).context("Failed to parse MIDI file")?;

        // A single tempo applies to the whole file
        let tempo = Self::extract_tempo(&smf);
        let bpm = 60_000_000.0 / tempo as f64;
        let clock = TickClock::new(smf.header.timing, tempo)?;

        let instruments = smf
            .tracks
            .iter()
            .enumerate()
            .flat_map(|(idx, track)| collect_track(idx, track, clock))
            .collect();

        Ok(MidiData { bpm, instruments })
    }

    fn extract_tempo(smf: &Smf) -> u32 {
        for track in &smf.tracks {
            for event in track {
                if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                    return tempo.as_int();
                }
            }
        }
        DEFAULT_TEMPO
    }

    /// Codec input, one entry per track channel.
    pub fn codec_instruments(&self) -> Vec<Instrument> {
        self.instruments.iter().map(TrackInstrument::to_instrument).collect()
    }

    pub fn note_count(&self) -> usize {
        self.instruments.iter().map(|i| i.notes.len()).sum()
    }
}

/// Converts absolute ticks to seconds for the file's timing mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickClock {
    /// Ticks are fractions of a beat; one tempo for the whole file
    Metrical { ticks_per_beat: u32, tempo: u32 },
    /// SMPTE ticks are absolute: frames per second times ticks per frame
    Timecode { ticks_per_second: f64 },
}

impl TickClock {
    pub fn new(timing: Timing, tempo: u32) -> Result<Self> {
        let clock = match timing {
            Timing::Metrical(tpb) => TickClock::Metrical {
                ticks_per_beat: u32::from(tpb.as_int()),
                tempo,
            },
            Timing::Timecode(fps, subframe) => TickClock::Timecode {
                ticks_per_second: f64::from(fps.as_f32()) * f64::from(subframe),
            },
        };
        match clock {
            TickClock::Metrical { ticks_per_beat: 0, .. } => {
                anyhow::bail!("MIDI header declares zero ticks per beat")
            }
            TickClock::Timecode { ticks_per_second } if ticks_per_second <= 0.0 => {
                anyhow::bail!("MIDI header declares zero ticks per frame")
            }
            _ => Ok(clock),
        }
    }

    pub fn seconds(&self, ticks: u64) -> f64 {
        match *self {
            TickClock::Metrical { ticks_per_beat, tempo } => {
                tick_to_second(ticks, ticks_per_beat, tempo)
            }
            TickClock::Timecode { ticks_per_second } => ticks as f64 / ticks_per_second,
        }
    }
}

/// Per-channel accumulator while walking a track.
#[derive(Default)]
struct ChannelState {
    /// Open notes per key: (start tick, velocity)
    open: BTreeMap<u8, Vec<(u64, u8)>>,
    notes: Vec<(u64, u64, u8, u8)>,
    controls: Vec<(u64, u8)>,
    program: Option<u8>,
}

impl ChannelState {
    fn note_on(&mut self, tick: u64, key: u8, vel: u8) {
        self.open.entry(key).or_default().push((tick, vel));
    }

    /// Close every open note on `key` that started before this tick. Notes
    /// started on the same tick stay open for a later release.
    fn note_off(&mut self, tick: u64, key: u8) {
        let Some(open) = self.open.get_mut(&key) else {
            return;
        };
        let mut still_open = Vec::new();
        for (start, vel) in open.drain(..) {
            if start == tick {
                still_open.push((start, vel));
            } else {
                self.notes.push((start, tick, key, vel));
            }
        }
        *open = still_open;
    }
}

fn collect_track(
    track_idx: usize,
    track: &[midly::TrackEvent],
    clock: TickClock,
) -> Vec<TrackInstrument> {
    let mut tick: u64 = 0;
    let mut channels: BTreeMap<u8, ChannelState> = BTreeMap::new();
    let mut track_name: Option<String> = None;

    for event in track {
        tick += u64::from(event.delta.as_int());

        match event.kind {
            TrackEventKind::Midi { channel, message } => {
                let state = channels.entry(channel.as_int()).or_default();
                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        state.note_on(tick, key.as_int(), vel.as_int());
                    }
                    // Note on with velocity 0 is a note off
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        state.note_off(tick, key.as_int());
                    }
                    MidiMessage::Controller { controller, value }
                        if controller.as_int() == SUSTAIN_CONTROLLER =>
                    {
                        state.controls.push((tick, value.as_int()));
                    }
                    MidiMessage::ProgramChange { program } => {
                        state.program = Some(program.as_int());
                    }
                    _ => {}
                }
            }
            TrackEventKind::Meta(MetaMessage::TrackName(name)) => {
                if let Ok(name_str) = std::str::from_utf8(name) {
                    let cleaned = name_str.trim_end_matches('\0').trim();
                    if !cleaned.is_empty() {
                        track_name = Some(cleaned.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    let seconds = |t: u64| clock.seconds(t);

    channels
        .into_iter()
        .filter(|(_, state)| !state.notes.is_empty())
        .map(|(channel, state)| {
            let dangling: usize = state.open.values().map(Vec::len).sum();
            if dangling > 0 {
                tracing::debug!(
                    track = track_idx,
                    channel,
                    dangling,
                    "dropped notes never released"
                );
            }
            TrackInstrument {
                track: track_idx,
                channel,
                program: state.program,
                name: track_name.clone(),
                notes: state
                    .notes
                    .iter()
                    .map(|&(start, end, key, vel)| {
                        Note::new(key, vel, seconds(start), seconds(end))
                    })
                    .collect(),
                controls: state
                    .controls
                    .iter()
                    .map(|&(t, value)| ControlEvent::new(seconds(t), value))
                    .collect(),
            }
        })
        .collect()
}

pub fn tick_to_second(ticks: u64, ticks_per_beat: u32, tempo: u32) -> f64 {
    (ticks as f64 * tempo as f64) / (1_000_000.0 * ticks_per_beat as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use midly::{Format, Fps, Header, Track, TrackEvent};

    fn event(delta: u32, kind: TrackEventKind<'static>) -> TrackEvent<'static> {
        TrackEvent {
            delta: delta.into(),
            kind,
        }
    }

    fn midi(channel: u8, message: MidiMessage) -> TrackEventKind<'static> {
        TrackEventKind::Midi {
            channel: channel.into(),
            message,
        }
    }

    fn build(track: Track<'static>) -> Vec<u8> {
        build_with_timing(track, Timing::Metrical(480.into()))
    }

    fn build_with_timing(track: Track<'static>, timing: Timing) -> Vec<u8> {
        let smf = Smf {
            header: Header::new(Format::SingleTrack, timing),
            tracks: vec![track],
        };
        let mut bytes = Vec::new();
        smf.write(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_tick_conversion() {
        assert_eq!(tick_to_second(480, 480, 500_000), 0.5);
        assert_eq!(tick_to_second(960, 480, 1_000_000), 2.0);
    }

    #[test]
    fn test_reads_notes_and_pedal() {
        let track = vec![
            event(0, TrackEventKind::Meta(MetaMessage::TrackName(b"Piano"))),
            event(0, midi(0, MidiMessage::ProgramChange { program: 1.into() })),
            event(0, midi(0, MidiMessage::Controller { controller: 64.into(), value: 127.into() })),
            event(0, midi(0, MidiMessage::Controller { controller: 7.into(), value: 100.into() })),
            event(0, midi(0, MidiMessage::NoteOn { key: 60.into(), vel: 80.into() })),
            event(480, midi(0, MidiMessage::NoteOn { key: 60.into(), vel: 0.into() })),
            event(480, midi(0, MidiMessage::Controller { controller: 64.into(), value: 0.into() })),
            event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];
        let data = MidiData::from_bytes(&build(track)).unwrap();

        assert_eq!(data.bpm, 120.0);
        assert_eq!(data.instruments.len(), 1);
        let inst = &data.instruments[0];
        assert_eq!(inst.name.as_deref(), Some("Piano"));
        assert_eq!(inst.program, Some(1));
        assert_eq!(inst.notes, vec![Note::new(60, 80, 0.0, 0.5)]);
        assert_eq!(
            inst.controls,
            vec![ControlEvent::new(0.0, 127), ControlEvent::new(1.0, 0)]
        );
    }

    #[test]
    fn test_channels_become_separate_instruments() {
        let track = vec![
            event(0, midi(0, MidiMessage::NoteOn { key: 60.into(), vel: 80.into() })),
            event(0, midi(1, MidiMessage::NoteOn { key: 48.into(), vel: 80.into() })),
            event(240, midi(0, MidiMessage::NoteOff { key: 60.into(), vel: 0.into() })),
            event(240, midi(1, MidiMessage::NoteOff { key: 48.into(), vel: 0.into() })),
            event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];
        let data = MidiData::from_bytes(&build(track)).unwrap();
        assert_eq!(data.instruments.len(), 2);
        assert_eq!(data.instruments[0].channel, 0);
        assert_eq!(data.instruments[1].notes, vec![Note::new(48, 80, 0.0, 0.5)]);
        assert_eq!(data.note_count(), 2);
    }

    #[test]
    fn test_release_closes_all_earlier_attacks() {
        let mut state = ChannelState::default();
        state.note_on(0, 60, 10);
        state.note_on(10, 60, 20);
        state.note_on(20, 60, 30);
        state.note_off(20, 60);
        assert_eq!(state.notes, vec![(0, 20, 60, 10), (10, 20, 60, 20)]);
        assert_eq!(state.open[&60], vec![(20, 30)]);
    }

    #[test]
    fn test_timecode_ticks_ignore_tempo() {
        let track = vec![
            event(0, midi(0, MidiMessage::NoteOn { key: 60.into(), vel: 80.into() })),
            event(1000, midi(0, MidiMessage::NoteOff { key: 60.into(), vel: 0.into() })),
            event(0, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];
        let bytes = build_with_timing(track, Timing::Timecode(Fps::Fps25, 40));
        let data = MidiData::from_bytes(&bytes).unwrap();
        assert_eq!(data.instruments[0].notes, vec![Note::new(60, 80, 0.0, 1.0)]);
    }

    #[test]
    fn test_tick_clock_modes() {
        let metrical = TickClock::new(Timing::Metrical(480.into()), 500_000).unwrap();
        assert_eq!(metrical.seconds(960), 1.0);
        let timecode = TickClock::new(Timing::Timecode(Fps::Fps24, 80), 250_000).unwrap();
        assert_eq!(timecode.seconds(1920), 1.0);
        assert!(TickClock::new(Timing::Metrical(0.into()), 500_000).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(MidiData::from_bytes(b"not a midi file").is_err());
    }
}
