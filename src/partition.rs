//! Shuffle a folder of files into train/test/valid subfolders by ratio.

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
pub struct SplitRatios {
    pub train: f64,
    pub test: f64,
    pub valid: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        SplitRatios {
            train: 0.7,
            test: 0.2,
            valid: 0.1,
        }
    }
}

impl SplitRatios {
    pub fn validate(&self) -> Result<()> {
        let sum = self.train + self.test + self.valid;
        if (sum - 1.0).abs() >= 1e-6 {
            anyhow::bail!("Split ratios must sum to 1, got {}", sum);
        }
        if self.train < 0.0 || self.test < 0.0 || self.valid < 0.0 {
            anyhow::bail!("Split ratios must not be negative");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionSummary {
    pub total: usize,
    pub train: usize,
    pub test: usize,
    pub valid: usize,
}

/// All regular files below `dir`, recursively, in sorted order.
pub fn walk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)
            .with_context(|| format!("Failed to read {}", current.display()))?
        {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// First free path for `file_name` inside `dir`: the name itself, then
/// `<stem>_1<ext>`, `<stem>_2<ext>`, ...
pub fn free_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    };
    (1..)
        .map(|n| dir.join(format!("{}_{}{}", stem, n, ext)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

fn move_all(files: &[PathBuf], target: &Path) -> Result<()> {
    for source in files {
        let file_name = source
            .file_name()
            .and_then(|s| s.to_str())
            .with_context(|| format!("Unusable file name: {}", source.display()))?;
        let dest = free_destination(target, file_name);
        fs::rename(source, &dest).with_context(|| {
            format!("Failed to move {} to {}", source.display(), dest.display())
        })?;
    }
    Ok(())
}

/// Move every file under `src` into `dest/{train,test,valid}`.
pub fn partition_files<R: Rng>(
    src: &Path,
    dest: &Path,
    ratios: SplitRatios,
    rng: &mut R,
) -> Result<PartitionSummary> {
    ratios.validate()?;

    let train_dir = dest.join("train");
    let test_dir = dest.join("test");
    let valid_dir = dest.join("valid");
    for dir in [&train_dir, &test_dir, &valid_dir] {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let mut files = walk_files(src)?;
    files.shuffle(rng);

    let total = files.len();
    let train_split = (total as f64 * ratios.train) as usize;
    let test_split = ((total as f64 * (ratios.train + ratios.test)) as usize).max(train_split);

    let (train, rest) = files.split_at(train_split);
    let (test, valid) = rest.split_at(test_split - train_split);

    move_all(train, &train_dir)?;
    move_all(test, &test_dir)?;
    move_all(valid, &valid_dir)?;

    Ok(PartitionSummary {
        total,
        train: train.len(),
        test: test.len(),
        valid: valid.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_ratios_must_sum_to_one() {
        assert!(SplitRatios::default().validate().is_ok());
        let bad = SplitRatios {
            train: 0.8,
            test: 0.2,
            valid: 0.1,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_collisions_get_numbered() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(free_destination(dir.path(), "a.mid"), dir.path().join("a.mid"));
        fs::write(dir.path().join("a.mid"), "").unwrap();
        fs::write(dir.path().join("a_1.mid"), "").unwrap();
        assert_eq!(free_destination(dir.path(), "a.mid"), dir.path().join("a_2.mid"));
        fs::write(dir.path().join("README"), "").unwrap();
        assert_eq!(free_destination(dir.path(), "README"), dir.path().join("README_1"));
    }

    #[test]
    fn test_partition_moves_everything() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("nested")).unwrap();
        for i in 0..10 {
            fs::write(src.path().join(format!("{}.mid", i)), "").unwrap();
        }
        // same name as a top-level file
        fs::write(src.path().join("nested/0.mid"), "").unwrap();

        let mut rng = StdRng::seed_from_u64(11);
        let summary =
            partition_files(src.path(), dest.path(), SplitRatios::default(), &mut rng).unwrap();

        assert_eq!(summary.total, 11);
        assert_eq!(summary.train, 7);
        assert_eq!(summary.test, 2);
        assert_eq!(summary.valid, 2);
        assert!(walk_files(src.path()).unwrap().is_empty());
        assert_eq!(walk_files(dest.path()).unwrap().len(), 11);
    }
}
