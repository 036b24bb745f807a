use crate::event::{Event, Token, TIME_SHIFT_RANGE};
use crate::note::{ControlEvent, Instrument, Note};
use crate::sustain::resolve_sustain;
use crate::timeline::{split_notes, PointKind, TimelinePoint};

/// Hundredths of a second covered by one full time-shift token.
const MAX_SHIFT: u32 = TIME_SHIFT_RANGE;

/// Velocity quantization step: 128 levels collapse into 32 buckets.
pub const VELOCITY_STEP: u8 = 4;

/// Largest 7-bit MIDI data value; pitches and velocities above it are clamped.
pub const MAX_DATA_VALUE: u8 = 127;

pub fn velocity_bucket(velocity: u8) -> u8 {
    velocity.min(MAX_DATA_VALUE) / VELOCITY_STEP
}

/// Time-shift events covering `gap` seconds, in steps of 1/100 s.
///
/// Each token advances the clock by `value + 1` hundredths; a zero gap emits
/// nothing. Half hundredths round to even, so 0.025 s is two hundredths.
pub fn time_shift_events(gap: f64) -> Vec<Event> {
    let mut remaining = (gap * 100.0).round_ties_even().max(0.0) as u32;
    let mut events = Vec::with_capacity((remaining / MAX_SHIFT) as usize + 1);

    while remaining >= MAX_SHIFT {
        events.push(Event::TimeShift((MAX_SHIFT - 1) as u8));
        remaining -= MAX_SHIFT;
    }
    if remaining > 0 {
        events.push(Event::TimeShift((remaining - 1) as u8));
    }
    events
}

/// Walks a time-ordered timeline once; state lives for a single call.
#[derive(Debug, Default)]
struct Encoder {
    current_time: f64,
    current_velocity_bucket: u8,
    events: Vec<Event>,
}

impl Encoder {
    fn push(&mut self, point: &TimelinePoint) {
        self.events.extend(time_shift_events(point.time - self.current_time));
        self.current_time = point.time;

        let pitch = point.pitch.min(MAX_DATA_VALUE);

        match point.kind {
            PointKind::On => {
                let bucket = velocity_bucket(point.velocity.unwrap_or(0));
                if bucket != self.current_velocity_bucket {
                    self.events.push(Event::Velocity(bucket));
                    self.current_velocity_bucket = bucket;
                }
                self.events.push(Event::NoteOn(pitch));
            }
            PointKind::Off => self.events.push(Event::NoteOff(pitch)),
        }
    }
}

/// Encode already-resolved notes into events.
pub fn encode_events(notes: &[Note]) -> Vec<Event> {
    let mut encoder = Encoder::default();
    for point in &split_notes(notes) {
        encoder.push(point);
    }
    encoder.events
}

/// Encode one instrument: sustain resolution, then the event walk.
pub fn encode(notes: &[Note], controls: &[ControlEvent]) -> Vec<Token> {
    let resolved = resolve_sustain(notes, controls);
    to_tokens(&encode_events(&resolved))
}

/// Encode several instruments flattened into one stream.
///
/// Sustain is resolved per instrument before the streams are combined.
pub fn encode_instruments(instruments: &[Instrument]) -> Vec<Token> {
    let notes: Vec<Note> = instruments
        .iter()
        .flat_map(|inst| resolve_sustain(&inst.notes, &inst.controls))
        .collect();
    to_tokens(&encode_events(&notes))
}

pub fn to_tokens(events: &[Event]) -> Vec<Token> {
    events.iter().map(Event::to_int).collect()
}
