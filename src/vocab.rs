//! Dense id assignment for symbolic streams.
//!
//! Symbolic artifacts are produced outside this crate with string symbols.
//! Once a corpus is complete, every distinct symbol of each stream gets an id
//! and the stored artifacts are rewritten to ids.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::dataset::Split;
use crate::storage::{list_artifacts, load_symbolic, save_symbolic, SymbolicSequence};

pub const VOCAB_FILE: &str = "vocab.json";

/// Per-stream symbol tables. Ids follow sorted symbol order, so the same
/// corpus always yields the same table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub notes: BTreeMap<String, u32>,
    pub durations: BTreeMap<String, u32>,
    pub chords: BTreeMap<String, u32>,
}

fn index(symbols: BTreeSet<String>) -> BTreeMap<String, u32> {
    symbols.into_iter().zip(0u32..).collect()
}

fn lookup(table: &BTreeMap<String, u32>, stream: &str, symbols: &[String]) -> Result<Vec<u32>> {
    symbols
        .iter()
        .map(|s| {
            table
                .get(s)
                .copied()
                .with_context(|| format!("Symbol {:?} missing from {} vocabulary", s, stream))
        })
        .collect()
}

impl Vocabulary {
    pub fn build<'a, I>(sequences: I) -> Self
    where
        I: IntoIterator<Item = &'a SymbolicSequence<String>>,
    {
        let mut notes = BTreeSet::new();
        let mut durations = BTreeSet::new();
        let mut chords = BTreeSet::new();
        for seq in sequences {
            notes.extend(seq.notes.iter().cloned());
            durations.extend(seq.durations.iter().cloned());
            chords.extend(seq.chords.iter().cloned());
        }
        Vocabulary {
            notes: index(notes),
            durations: index(durations),
            chords: index(chords),
        }
    }

    pub fn encode(&self, seq: &SymbolicSequence<String>) -> Result<SymbolicSequence<u32>> {
        Ok(SymbolicSequence {
            notes: lookup(&self.notes, "note", &seq.notes)?,
            durations: lookup(&self.durations, "duration", &seq.durations)?,
            chords: lookup(&self.chords, "chord", &seq.chords)?,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize vocabulary")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Build the vocabulary over every symbolic artifact in the split
/// directories of `output_dir`, rewrite each artifact to ids, and store the
/// vocabulary as `vocab.json`.
pub fn rewrite_in_place(output_dir: &Path) -> Result<Vocabulary> {
    let mut artifacts = Vec::new();
    for split in Split::ALL {
        for path in list_artifacts(&output_dir.join(split.dir_name()))? {
            let seq = load_symbolic::<String>(&path)?;
            artifacts.push((path, seq));
        }
    }

    let vocab = Vocabulary::build(artifacts.iter().map(|(_, seq)| seq));
    tracing::info!(
        notes = vocab.notes.len(),
        durations = vocab.durations.len(),
        chords = vocab.chords.len(),
        artifacts = artifacts.len(),
        "built vocabulary"
    );

    for (path, seq) in &artifacts {
        tracing::debug!("Replacing: {}", path.display());
        save_symbolic(path, &vocab.encode(seq)?)?;
    }

    vocab.save(&output_dir.join(VOCAB_FILE))?;
    Ok(vocab)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(notes: &[&str], durations: &[&str], chords: &[&str]) -> SymbolicSequence<String> {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        SymbolicSequence {
            notes: owned(notes),
            durations: owned(durations),
            chords: owned(chords),
        }
    }

    #[test]
    fn test_ids_are_dense_and_sorted() {
        let a = seq(&["START", "E4", "C4"], &["0.0", "1.0", "0.5"], &["0", "0", "major triad"]);
        let b = seq(&["START", "rest"], &["0.0", "1.0"], &["0", "0"]);
        let vocab = Vocabulary::build([&a, &b]);

        assert_eq!(vocab.notes.len(), 4);
        assert_eq!(vocab.notes["C4"], 0);
        assert_eq!(vocab.notes["E4"], 1);
        assert_eq!(vocab.notes["START"], 2);
        assert_eq!(vocab.notes["rest"], 3);
        assert_eq!(vocab.chords.len(), 2);

        let ids = vocab.encode(&a).unwrap();
        assert_eq!(ids.notes, vec![2, 1, 0]);
        assert_eq!(ids.durations, vec![0, 2, 1]);
        assert_eq!(ids.chords, vec![0, 0, 1]);
    }

    #[test]
    fn test_unknown_symbol_is_an_error() {
        let vocab = Vocabulary::build([&seq(&["C4"], &["1.0"], &["0"])]);
        assert!(vocab.encode(&seq(&["D4"], &["1.0"], &["0"])).is_err());
    }

    #[test]
    fn test_rewrite_in_place() {
        let out = tempfile::tempdir().unwrap();
        for split in Split::ALL {
            fs::create_dir_all(out.path().join(split.dir_name())).unwrap();
        }
        let train = out.path().join("train/a.mid.json");
        let test = out.path().join("test/b.mid.json");
        save_symbolic(&train, &seq(&["START", "C4"], &["0.0", "1.0"], &["0", "0"])).unwrap();
        save_symbolic(&test, &seq(&["START", "G4"], &["0.0", "2.0"], &["0", "0"])).unwrap();

        let vocab = rewrite_in_place(out.path()).unwrap();
        assert_eq!(vocab.notes.len(), 3);

        let rewritten = load_symbolic::<u32>(&train).unwrap();
        assert_eq!(rewritten.notes, vec![vocab.notes["START"], vocab.notes["C4"]]);
        assert_eq!(Vocabulary::load(&out.path().join(VOCAB_FILE)).unwrap(), vocab);
    }
}
