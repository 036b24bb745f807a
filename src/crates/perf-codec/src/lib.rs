//! Performance event codec
//!
//! Turns absolute-time notes into a flat stream of integer tokens for sequence
//! models, and turns such streams back into playable notes.
//!
//! # Examples
//!
//! ```
//! use perf_codec::{decode, encode, Note};
//!
//! let notes = vec![Note::new(60, 80, 0.0, 1.0)];
//! let tokens = encode(&notes, &[]);
//! assert_eq!(decode(&tokens).unwrap(), notes);
//! ```
//!
//! # Pipeline
//!
//! - **sustain**: bakes sustain pedal holds into note end times
//! - **timeline**: splits notes into on/off points and pairs them back up
//! - **encoder**: emits time-shift, velocity and note on/off events
//! - **decoder**: replays events on a clock and rebuilds notes
//! - **event**: the fixed 388-token alphabet

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod event;
pub mod note;
pub mod sustain;
pub mod timeline;


pub use decoder::{decode, decode_strict, decode_with_report, Decoded};
pub use encoder::{encode, encode_instruments, velocity_bucket};
pub use error::{CodecError, Result};
pub use event::{Event, Token, VOCAB_SIZE};
pub use note::{ControlEvent, Instrument, Note};
pub use sustain::{resolve_sustain, SustainReport};
pub use timeline::{merge_points, split_notes, MergeReport, PointKind, TimelinePoint};
