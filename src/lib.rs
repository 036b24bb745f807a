//! Dataset preparation for performance-token sequence models.
//!
//! Walks MIDI corpora, encodes each piece with `perf-codec`, and stores one
//! JSON artifact per piece under `train/`, `val/` and `test/`.

pub mod dataset;
pub mod partition;
pub mod storage;
pub mod vocab;

pub use dataset::{prep_custom, prep_maestro, PreprocessOptions, Split, SplitCounts};
pub use partition::{partition_files, SplitRatios};
pub use storage::SymbolicSequence;
pub use vocab::Vocabulary;

pub use midi_to_tokens::init_tracing;
