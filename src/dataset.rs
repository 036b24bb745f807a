//! Encode a corpus of MIDI files into train/validation/test token artifacts.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage::save_tokens;

/// Manifest shipped with the MAESTRO dataset
pub const MAESTRO_MANIFEST: &str = "maestro-v2.0.0.json";

/// Progress is logged every this many pieces
const PROGRESS_EVERY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Validation, Split::Test];

    /// Output subdirectory name
    pub fn dir_name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "val",
            Split::Test => "test",
        }
    }

    /// Parse the `split` field of a manifest entry.
    pub fn from_manifest(label: &str) -> Result<Self> {
        match label {
            "train" => Ok(Split::Train),
            "validation" => Ok(Split::Validation),
            "test" => Ok(Split::Test),
            other => anyhow::bail!("Unrecognized split type: {}", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub midi_filename: String,
    pub split: String,
}

pub fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Could not find manifest: {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Pieces written per split, plus pieces that failed to encode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SplitCounts {
    pub train: usize,
    pub validation: usize,
    pub test: usize,
    pub failed: usize,
}

impl SplitCounts {
    fn record(&mut self, split: Split) {
        match split {
            Split::Train => self.train += 1,
            Split::Validation => self.validation += 1,
            Split::Test => self.test += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.train + self.validation + self.test
    }
}

#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    pub output_dir: PathBuf,
    /// Probability that a custom piece leaves the training set
    pub valid_p: f64,
    /// Probability that a non-training custom piece goes to test
    pub test_p: f64,
    /// Fixed seed for reproducible custom splits
    pub seed: Option<u64>,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        PreprocessOptions {
            output_dir: PathBuf::from("./dataset/e_piano"),
            valid_p: 0.1,
            test_p: 0.2,
            seed: None,
        }
    }
}

impl PreprocessOptions {
    pub fn split_dir(&self, split: Split) -> PathBuf {
        self.output_dir.join(split.dir_name())
    }

    fn prepare_dirs(&self) -> Result<()> {
        for split in Split::ALL {
            let dir = self.split_dir(split);
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Random train/validation/test assignment for pieces without a manifest.
pub struct RandomSplitter {
    rng: StdRng,
    valid_p: f64,
    test_p: f64,
}

impl RandomSplitter {
    pub fn new(valid_p: f64, test_p: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        RandomSplitter { rng, valid_p, test_p }
    }

    pub fn pick(&mut self) -> Split {
        if self.rng.gen::<f64>() > self.valid_p {
            Split::Train
        } else if self.rng.gen::<f64>() > self.test_p {
            Split::Validation
        } else {
            Split::Test
        }
    }
}

/// Encode one piece into its split directory. Failures are logged and
/// counted; they never stop the run.
fn process_piece(
    source: &Path,
    split: Split,
    options: &PreprocessOptions,
    counts: &mut SplitCounts,
) {
    let result = midi_to_tokens::encode_file(source)
        .and_then(|tokens| save_tokens(&options.split_dir(split), source, &tokens));

    match result {
        Ok(path) => {
            counts.record(split);
            tracing::debug!(source = %source.display(), artifact = %path.display(), "encoded");
        }
        Err(e) => {
            counts.failed += 1;
            tracing::warn!("Skipping {}: {:#}", source.display(), e);
        }
    }
}

fn log_progress(done: usize, total: usize) {
    if done % PROGRESS_EVERY == 0 {
        tracing::info!("{} / {}", done, total);
    }
}

/// Preprocess the MAESTRO layout: `<root>/maestro-v2.0.0.json` decides the
/// split of every listed piece.
pub fn prep_maestro(root: &Path, options: &PreprocessOptions) -> Result<SplitCounts> {
    let entries = load_manifest(&root.join(MAESTRO_MANIFEST))?;
    tracing::info!("Found {} pieces", entries.len());

    // Validate every split label before writing anything
    let pieces = entries
        .iter()
        .map(|entry| -> Result<(PathBuf, Split)> {
            Ok((root.join(&entry.midi_filename), Split::from_manifest(&entry.split)?))
        })
        .collect::<Result<Vec<_>>>()?;

    options.prepare_dirs()?;
    let mut counts = SplitCounts::default();
    for (idx, (source, split)) in pieces.iter().enumerate() {
        process_piece(source, *split, options, &mut counts);
        log_progress(idx + 1, pieces.len());
    }

    log_counts(&counts);
    Ok(counts)
}

/// Preprocess a flat folder of MIDI files with random split assignment.
pub fn prep_custom(root: &Path, options: &PreprocessOptions) -> Result<SplitCounts> {
    let mut pieces = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("Failed to read {}", root.display()))? {
        let path = entry?.path();
        if path.is_file() {
            pieces.push(path);
        }
    }
    pieces.sort();
    tracing::info!("Found {} pieces", pieces.len());

    options.prepare_dirs()?;
    let mut splitter = RandomSplitter::new(options.valid_p, options.test_p, options.seed);
    let mut counts = SplitCounts::default();
    for (idx, source) in pieces.iter().enumerate() {
        let split = splitter.pick();
        process_piece(source, split, options, &mut counts);
        log_progress(idx + 1, pieces.len());
    }

    log_counts(&counts);
    Ok(counts)
}

fn log_counts(counts: &SplitCounts) {
    tracing::info!(
        train = counts.train,
        val = counts.validation,
        test = counts.test,
        failed = counts.failed,
        "preprocessing finished"
    );
}
