use crate::encoder::VELOCITY_STEP;
use crate::error::{CodecError, Result};
use crate::event::{Event, Token};
use crate::note::Note;
use crate::timeline::{merge_points, MergeReport, TimelinePoint};

/// Notes recovered from a token stream plus what had to be dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub notes: Vec<Note>,
    pub report: MergeReport,
}

/// Running clock and velocity for one decode call.
///
/// The clock counts whole hundredths so long streams do not accumulate
/// floating point drift.
#[derive(Debug, Default)]
struct Decoder {
    hundredths: u64,
    velocity: u8,
    points: Vec<TimelinePoint>,
}

impl Decoder {
    fn clock(&self) -> f64 {
        self.hundredths as f64 / 100.0
    }

    fn push(&mut self, event: Event) {
        match event {
            Event::TimeShift(v) => self.hundredths += u64::from(v) + 1,
            Event::Velocity(v) => self.velocity = v.saturating_mul(VELOCITY_STEP),
            Event::NoteOn(pitch) => {
                self.points.push(TimelinePoint::on(self.clock(), pitch, self.velocity))
            }
            Event::NoteOff(pitch) => self.points.push(TimelinePoint::off(self.clock(), pitch)),
        }
    }
}

pub fn from_tokens(tokens: &[Token]) -> Result<Vec<Event>> {
    tokens.iter().map(|&t| Event::from_int(t)).collect()
}

/// Rebuild timeline points from events.
pub fn decode_events(events: &[Event]) -> Vec<TimelinePoint> {
    let mut decoder = Decoder::default();
    for &event in events {
        decoder.push(event);
    }
    decoder.points
}

/// Decode tokens into notes sorted by start.
///
/// Fails only on tokens outside the alphabet; orphaned note offs and
/// zero-length notes are dropped.
pub fn decode(tokens: &[Token]) -> Result<Vec<Note>> {
    Ok(decode_with_report(tokens)?.notes)
}

pub fn decode_with_report(tokens: &[Token]) -> Result<Decoded> {
    let events = from_tokens(tokens)?;
    let (notes, report) = merge_points(&decode_events(&events));
    Ok(Decoded { notes, report })
}

/// Like [`decode`], but an orphaned note off is an error.
pub fn decode_strict(tokens: &[Token]) -> Result<Vec<Note>> {
    let decoded = decode_with_report(tokens)?;
    if let Some((pitch, time)) = decoded.report.first_orphan {
        return Err(CodecError::OrphanNoteOff { pitch, time });
    }
    Ok(decoded.notes)
}
