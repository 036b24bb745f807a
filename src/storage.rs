//! One JSON artifact per source file.

use anyhow::{Context, Result};
use perf_codec::Token;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Three parallel symbolic streams for one piece: note names, durations in
/// quarter lengths, and chord labels. Before vocabulary rewriting the
/// symbols are strings; afterwards they are dense ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolicSequence<T> {
    pub notes: Vec<T>,
    pub durations: Vec<T>,
    pub chords: Vec<T>,
}

impl<T> SymbolicSequence<T> {
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// All three streams must stay aligned
    pub fn is_aligned(&self) -> bool {
        self.notes.len() == self.durations.len() && self.notes.len() == self.chords.len()
    }
}

/// `<dir>/<source file name>.json`
pub fn artifact_path(dir: &Path, source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    dir.join(format!("{}.json", name))
}

pub fn save_tokens(dir: &Path, source: &Path, tokens: &[Token]) -> Result<PathBuf> {
    let path = artifact_path(dir, source);
    midi_to_tokens::write_tokens_json(&path, tokens)?;
    Ok(path)
}

pub fn load_tokens(path: &Path) -> Result<Vec<Token>> {
    midi_to_tokens::read_tokens_json(path)
}

pub fn save_symbolic<T: Serialize>(path: &Path, seq: &SymbolicSequence<T>) -> Result<()> {
    if !seq.is_aligned() {
        anyhow::bail!("Symbolic streams for {} have different lengths", path.display());
    }
    let json = serde_json::to_string(seq).context("Failed to serialize symbolic sequence")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn load_symbolic<T: DeserializeOwned>(path: &Path) -> Result<SymbolicSequence<T>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("{} is not a symbolic sequence", path.display()))
}

/// Every `.json` artifact directly inside `dir`, sorted by path.
pub fn list_artifacts(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    if !dir.is_dir() {
        return Ok(paths);
    }
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
