//! Sustain pedal resolution.
//!
//! While the pedal is down a released key keeps sounding until the pedal comes
//! up or the same key is struck again. The resolver bakes that into note end
//! times so the encoder only ever sees plain notes.

use std::collections::HashMap;

use crate::note::{by_time, sort_by_start, ControlEvent, Note};

/// Counters for the recoveries applied while reading a pedal stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SustainReport {
    /// Closed pedal-down spans that were applied
    pub spans: usize,
    /// Pedal-up messages that arrived with no open span and stretched the previous one
    pub clamped_releases: usize,
    /// Whether the pedal was still down at the end of the stream
    pub unclosed: bool,
}

/// One pedal-down interval and the notes it holds.
#[derive(Debug, Clone)]
struct SustainSpan {
    start: f64,
    end: f64,
    managed: Vec<Note>,
}

impl SustainSpan {
    fn new(start: f64, end: f64) -> Self {
        SustainSpan {
            start,
            end,
            managed: Vec::new(),
        }
    }

    /// Whether the note is sounding at some point while the pedal is down.
    fn holds(&self, note: &Note) -> bool {
        note.start <= self.end && note.end >= self.start
    }

    /// Rewrite end times of every captured note. Walks backwards so each note
    /// can see the next attack of its own pitch.
    fn release(&mut self) {
        let mut next_attack: HashMap<u8, f64> = HashMap::new();
        for note in self.managed.iter_mut().rev() {
            note.end = match next_attack.get(&note.pitch) {
                Some(&start) => start,
                None => note.end.max(self.end),
            };
            next_attack.insert(note.pitch, note.start);
        }
    }
}

/// Build non-overlapping pedal-down spans from controller 64 messages.
///
/// A trailing span that never closes is dropped and reported as `unclosed`.
fn pedal_spans(controls: &[ControlEvent]) -> (Vec<SustainSpan>, SustainReport) {
    let mut ordered = controls.to_vec();
    ordered.sort_by(|a, b| by_time(a.time, b.time));

    let mut spans: Vec<SustainSpan> = Vec::new();
    let mut open: Option<f64> = None;
    let mut report = SustainReport::default();

    for ctrl in &ordered {
        match (ctrl.is_pedal_down(), open) {
            (true, None) => open = Some(ctrl.time),
            (true, Some(_)) => {}
            (false, Some(start)) => {
                spans.push(SustainSpan::new(start, ctrl.time));
                open = None;
            }
            (false, None) => {
                if let Some(last) = spans.last_mut() {
                    last.end = ctrl.time;
                    report.clamped_releases += 1;
                }
            }
        }
    }

    report.spans = spans.len();
    report.unclosed = open.is_some();
    (spans, report)
}

/// Apply sustain pedal physics to one instrument's notes.
///
/// The result is sorted by start time.
pub fn resolve_sustain(notes: &[Note], controls: &[ControlEvent]) -> Vec<Note> {
    resolve_sustain_with_report(notes, controls).0
}

pub fn resolve_sustain_with_report(
    notes: &[Note],
    controls: &[ControlEvent],
) -> (Vec<Note>, SustainReport) {
    let mut pending = notes.to_vec();
    sort_by_start(&mut pending);

    let (mut spans, report) = pedal_spans(controls);
    if report.clamped_releases > 0 || report.unclosed {
        tracing::debug!(
            clamped_releases = report.clamped_releases,
            unclosed = report.unclosed,
            "recovered malformed sustain stream"
        );
    }

    if spans.is_empty() {
        return (pending, report);
    }

    let mut stream = Vec::with_capacity(pending.len());
    let mut remaining = pending.into_iter().peekable();

    for span in spans.iter_mut() {
        while let Some(note) = remaining.next_if(|n| n.start <= span.end) {
            if span.holds(&note) {
                span.managed.push(note);
            } else {
                stream.push(note);
            }
        }
        span.release();
    }

    stream.extend(remaining);
    for span in spans {
        stream.extend(span.managed);
    }

    sort_by_start(&mut stream);
    (stream, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pedal(events: &[(f64, u8)]) -> Vec<ControlEvent> {
        events
            .iter()
            .map(|&(time, value)| ControlEvent::new(time, value))
            .collect()
    }

    #[test]
    fn test_no_pedal_only_sorts() {
        let notes = vec![Note::new(64, 50, 1.0, 2.0), Note::new(60, 50, 0.0, 0.5)];
        let (resolved, report) = resolve_sustain_with_report(&notes, &[]);
        assert_eq!(resolved, vec![notes[1], notes[0]]);
        assert_eq!(report, SustainReport::default());
    }

    #[test]
    fn test_same_pitch_attack_steals_held_note() {
        let a = Note::new(60, 80, 0.0, 0.5);
        let b = Note::new(60, 80, 1.0, 1.5);
        let resolved = resolve_sustain(&[a, b], &pedal(&[(0.2, 127), (1.2, 0)]));
        assert_eq!(resolved, vec![Note::new(60, 80, 0.0, 1.0), b]);
    }

    #[test]
    fn test_held_note_extends_to_pedal_release() {
        let notes = [Note::new(60, 80, 0.5, 0.7), Note::new(64, 80, 0.6, 3.0)];
        let resolved = resolve_sustain(&notes, &pedal(&[(0.4, 100), (2.0, 0)]));
        assert_eq!(resolved[0].end, 2.0);
        // already longer than the pedal
        assert_eq!(resolved[1].end, 3.0);
    }

    #[test]
    fn test_notes_outside_spans_untouched() {
        let before = Note::new(60, 80, 0.0, 0.1);
        let inside = Note::new(62, 80, 0.5, 0.6);
        let after = Note::new(64, 80, 2.0, 2.1);
        let resolved = resolve_sustain(&[after, inside, before], &pedal(&[(0.3, 127), (1.0, 0)]));
        assert_eq!(resolved, vec![before, Note::new(62, 80, 0.5, 1.0), after]);
    }

    #[test]
    fn test_each_span_handled_separately() {
        let notes = [
            Note::new(60, 80, 0.1, 0.2),
            Note::new(60, 80, 1.1, 1.2),
        ];
        let resolved = resolve_sustain(
            &notes,
            &pedal(&[(0.0, 127), (0.5, 0), (1.0, 127), (1.5, 0)]),
        );
        assert_eq!(resolved[0].end, 0.5);
        assert_eq!(resolved[1].end, 1.5);
    }

    #[test]
    fn test_note_spanning_two_pedals_belongs_to_the_first() {
        let notes = [Note::new(60, 80, 0.2, 1.2), Note::new(60, 80, 1.3, 1.4)];
        let resolved = resolve_sustain(
            &notes,
            &pedal(&[(0.0, 127), (0.5, 0), (1.0, 127), (1.5, 0)]),
        );
        // the second span's same-pitch attack does not cut it short
        assert_eq!(resolved[0], Note::new(60, 80, 0.2, 1.2));
        assert_eq!(resolved[1], Note::new(60, 80, 1.3, 1.5));
    }

    #[test]
    fn test_stray_release_stretches_previous_span() {
        let (spans, report) = pedal_spans(&pedal(&[(0.0, 127), (1.0, 0), (1.5, 0)]));
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].end, 1.5);
        assert_eq!(report.clamped_releases, 1);
    }

    #[test]
    fn test_release_before_any_press_is_ignored() {
        let (spans, report) = pedal_spans(&pedal(&[(0.0, 0), (0.5, 127), (1.0, 10)]));
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 0.5);
        assert_eq!(report.clamped_releases, 0);
    }

    #[test]
    fn test_repeated_press_does_not_reopen() {
        let (spans, _) = pedal_spans(&pedal(&[(0.0, 127), (0.3, 90), (1.0, 0)]));
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 0.0);
    }

    #[test]
    fn test_unclosed_span_leaves_notes_alone() {
        let notes = [Note::new(60, 80, 0.5, 0.6), Note::new(62, 80, 1.0, 1.2)];
        let (resolved, report) = resolve_sustain_with_report(&notes, &pedal(&[(0.2, 127)]));
        assert_eq!(resolved, notes.to_vec());
        assert!(report.unclosed);
        assert_eq!(report.spans, 0);
    }

    #[test]
    fn test_controls_are_ordered_by_time() {
        let notes = [Note::new(60, 80, 0.5, 0.6)];
        let resolved = resolve_sustain(&notes, &pedal(&[(1.0, 0), (0.2, 127)]));
        assert_eq!(resolved[0].end, 1.0);
    }
}
