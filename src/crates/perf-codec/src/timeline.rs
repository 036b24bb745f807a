//! Conversion between notes and on/off points on a single timeline.

use std::collections::HashMap;

use crate::note::{by_time, sort_by_start, Note};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    On,
    Off,
}

/// Half of a note: its attack or its release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelinePoint {
    pub kind: PointKind,
    pub time: f64,
    pub pitch: u8,
    /// Only set for `On` points
    pub velocity: Option<u8>,
}

impl TimelinePoint {
    pub fn on(time: f64, pitch: u8, velocity: u8) -> Self {
        TimelinePoint {
            kind: PointKind::On,
            time,
            pitch,
            velocity: Some(velocity),
        }
    }

    pub fn off(time: f64, pitch: u8) -> Self {
        TimelinePoint {
            kind: PointKind::Off,
            time,
            pitch,
            velocity: None,
        }
    }
}

/// Recovered anomalies observed while pairing points back into notes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub orphan_note_offs: usize,
    pub zero_length_notes: usize,
    /// Pitch and time of the first orphaned note off, if any
    pub first_orphan: Option<(u8, f64)>,
}

/// Split notes into on/off points ordered by time.
///
/// Ties keep insertion order, so for notes sorted by start a release at `t`
/// comes before a later-inserted attack at `t`.
pub fn split_notes(notes: &[Note]) -> Vec<TimelinePoint> {
    let mut sorted = notes.to_vec();
    sort_by_start(&mut sorted);

    let mut points = Vec::with_capacity(sorted.len() * 2);
    for note in &sorted {
        points.push(TimelinePoint::on(note.start, note.pitch, note.velocity));
        points.push(TimelinePoint::off(note.end, note.pitch));
    }

    points.sort_by(|a, b| by_time(a.time, b.time));
    points
}

/// Pair on/off points back into notes sorted by start.
pub fn merge_points(points: &[TimelinePoint]) -> (Vec<Note>, MergeReport) {
    let mut ordered = points.to_vec();
    ordered.sort_by(|a, b| by_time(a.time, b.time));

    let mut pending: HashMap<u8, TimelinePoint> = HashMap::new();
    let mut notes = Vec::new();
    let mut report = MergeReport::default();

    for point in ordered {
        match point.kind {
            PointKind::On => {
                pending.insert(point.pitch, point);
            }
            PointKind::Off => {
                let Some(on) = pending.remove(&point.pitch) else {
                    report.orphan_note_offs += 1;
                    report.first_orphan.get_or_insert((point.pitch, point.time));
                    continue;
                };
                if point.time - on.time == 0.0 {
                    report.zero_length_notes += 1;
                    continue;
                }
                notes.push(Note::new(
                    point.pitch,
                    on.velocity.unwrap_or(0),
                    on.time,
                    point.time,
                ));
            }
        }
    }

    if report.orphan_note_offs > 0 {
        tracing::debug!(
            count = report.orphan_note_offs,
            "dropped note offs without a matching note on"
        );
    }

    sort_by_start(&mut notes);
    (notes, report)
}
