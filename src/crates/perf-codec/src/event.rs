//! Token alphabet.
//!
//! Every event maps to one integer in `0..VOCAB_SIZE`. The offset table is
//! fixed: previously stored token streams only decode correctly against it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CodecError, Result};

pub type Token = u32;

pub const NOTE_ON_RANGE: u32 = 128;
pub const NOTE_OFF_RANGE: u32 = 128;
pub const TIME_SHIFT_RANGE: u32 = 100;
pub const VELOCITY_RANGE: u32 = 32;

pub const NOTE_ON_OFFSET: u32 = 0;
pub const NOTE_OFF_OFFSET: u32 = NOTE_ON_OFFSET + NOTE_ON_RANGE;
pub const TIME_SHIFT_OFFSET: u32 = NOTE_OFF_OFFSET + NOTE_OFF_RANGE;
pub const VELOCITY_OFFSET: u32 = TIME_SHIFT_OFFSET + TIME_SHIFT_RANGE;

/// Total number of distinct tokens (388).
pub const VOCAB_SIZE: u32 = VELOCITY_OFFSET + VELOCITY_RANGE;

/// One quantized musical action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Event {
    /// Pitch 0-127 starts sounding.
    NoteOn(u8),
    /// Pitch 0-127 stops sounding.
    NoteOff(u8),
    /// Clock advances by `value + 1` hundredths of a second (0-99).
    TimeShift(u8),
    /// Velocity bucket 0-31 for the following note-ons.
    Velocity(u8),
}

impl Event {
    fn offset_and_range(&self) -> (u32, u32) {
        match self {
            Event::NoteOn(_) => (NOTE_ON_OFFSET, NOTE_ON_RANGE),
            Event::NoteOff(_) => (NOTE_OFF_OFFSET, NOTE_OFF_RANGE),
            Event::TimeShift(_) => (TIME_SHIFT_OFFSET, TIME_SHIFT_RANGE),
            Event::Velocity(_) => (VELOCITY_OFFSET, VELOCITY_RANGE),
        }
    }

    pub fn value(&self) -> u8 {
        match *self {
            Event::NoteOn(v) | Event::NoteOff(v) | Event::TimeShift(v) | Event::Velocity(v) => v,
        }
    }

    /// Whether the carried value lies inside its variant's range
    pub fn is_valid(&self) -> bool {
        let (_, range) = self.offset_and_range();
        u32::from(self.value()) < range
    }

    /// Map the event to its integer token.
    ///
    /// The caller is responsible for range validity; an out-of-range value
    /// would alias into the next variant's block.
    pub fn to_int(&self) -> Token {
        debug_assert!(self.is_valid(), "event out of range: {:?}", self);
        let (offset, _) = self.offset_and_range();
        offset + u32::from(self.value())
    }

    /// Classify an integer token into its event.
    pub fn from_int(token: Token) -> Result<Self> {
        // Every range fits in a u8, so the narrowing casts below are lossless.
        let event = if token < NOTE_OFF_OFFSET {
            Event::NoteOn((token - NOTE_ON_OFFSET) as u8)
        } else if token < TIME_SHIFT_OFFSET {
            Event::NoteOff((token - NOTE_OFF_OFFSET) as u8)
        } else if token < VELOCITY_OFFSET {
            Event::TimeShift((token - TIME_SHIFT_OFFSET) as u8)
        } else if token < VOCAB_SIZE {
            Event::Velocity((token - VELOCITY_OFFSET) as u8)
        } else {
            return Err(CodecError::InvalidToken(token));
        };
        Ok(event)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::NoteOn(pitch) => write!(f, "NoteOn({})", pitch),
            Event::NoteOff(pitch) => write!(f, "NoteOff({})", pitch),
            Event::TimeShift(v) => write!(f, "TimeShift({})", v),
            Event::Velocity(v) => write!(f, "Velocity({})", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_event() -> impl Strategy<Value = Event> {
        prop_oneof![
            (0u8..128).prop_map(Event::NoteOn),
            (0u8..128).prop_map(Event::NoteOff),
            (0u8..100).prop_map(Event::TimeShift),
            (0u8..32).prop_map(Event::Velocity),
        ]
    }

    #[test]
    fn test_offset_table() {
        assert_eq!(VOCAB_SIZE, 388);
        assert_eq!(Event::NoteOn(0).to_int(), 0);
        assert_eq!(Event::NoteOff(0).to_int(), 128);
        assert_eq!(Event::TimeShift(0).to_int(), 256);
        assert_eq!(Event::TimeShift(99).to_int(), 355);
        assert_eq!(Event::Velocity(0).to_int(), 356);
        assert_eq!(Event::Velocity(31).to_int(), 387);
    }

    #[test]
    fn test_range_boundaries() {
        assert_eq!(Event::from_int(127).unwrap(), Event::NoteOn(127));
        assert_eq!(Event::from_int(128).unwrap(), Event::NoteOff(0));
        assert_eq!(Event::from_int(255).unwrap(), Event::NoteOff(127));
        assert_eq!(Event::from_int(256).unwrap(), Event::TimeShift(0));
        assert_eq!(Event::from_int(356).unwrap(), Event::Velocity(0));
        assert_eq!(Event::from_int(388), Err(CodecError::InvalidToken(388)));
    }

    #[test]
    fn test_validity() {
        assert!(Event::TimeShift(99).is_valid());
        assert!(!Event::TimeShift(100).is_valid());
        assert!(!Event::Velocity(32).is_valid());
        assert!(!Event::NoteOn(128).is_valid());
    }

    #[test]
    fn test_every_token_round_trips() {
        for token in 0..VOCAB_SIZE {
            assert_eq!(Event::from_int(token).unwrap().to_int(), token);
        }
    }

    proptest! {
        #[test]
        fn event_round_trips_through_token(event in valid_event()) {
            prop_assert_eq!(Event::from_int(event.to_int()).unwrap(), event);
        }

        #[test]
        fn out_of_range_tokens_are_rejected(token in VOCAB_SIZE..u32::MAX) {
            prop_assert_eq!(Event::from_int(token), Err(CodecError::InvalidToken(token)));
        }
    }
}
