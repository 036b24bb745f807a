use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Controller values at or above this hold the sustain pedal down
pub const PEDAL_DOWN_THRESHOLD: u8 = 64;

/// A sounding note in absolute time (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: u8,
    pub velocity: u8,
    pub start: f64,
    pub end: f64,
}

impl Note {
    pub fn new(pitch: u8, velocity: u8, start: f64, end: f64) -> Self {
        Note {
            pitch,
            velocity,
            start,
            end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A sustain pedal (controller 64) message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlEvent {
    pub time: f64,
    pub value: u8,
}

impl ControlEvent {
    pub fn new(time: f64, value: u8) -> Self {
        ControlEvent { time, value }
    }

    pub fn is_pedal_down(&self) -> bool {
        self.value >= PEDAL_DOWN_THRESHOLD
    }
}

/// One instrument's notes together with its sustain pedal stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub notes: Vec<Note>,
    pub controls: Vec<ControlEvent>,
}

impl Instrument {
    pub fn new(notes: Vec<Note>, controls: Vec<ControlEvent>) -> Self {
        Instrument { notes, controls }
    }
}

/// Stable sort by start time. NaN-free input is assumed; `total_cmp` keeps the
/// order total regardless.
pub(crate) fn sort_by_start(notes: &mut [Note]) {
    notes.sort_by(|a, b| by_time(a.start, b.start));
}

pub(crate) fn by_time(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}
