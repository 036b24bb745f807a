// Standalone tool to shuffle a folder of files into train/test/valid subfolders
// Usage: cargo run --bin split_dataset -- <src_folder> <dest_folder> [--seed N]

use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

use preprocess_lib::{init_tracing, partition_files, SplitRatios};

#[derive(Parser, Debug)]
#[command(name = "split_dataset")]
#[command(about = "Move files into train/test/valid folders by ratio", long_about = None)]
struct Args {
    /// Source folder (walked recursively)
    src: PathBuf,

    /// Destination folder
    dest: PathBuf,

    #[arg(long, default_value = "0.7")]
    train: f64,

    #[arg(long, default_value = "0.2")]
    test: f64,

    #[arg(long, default_value = "0.1")]
    valid: f64,

    /// Seed for a reproducible shuffle
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(false);

    let ratios = SplitRatios {
        train: args.train,
        test: args.test,
        valid: args.valid,
    };
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let summary = partition_files(&args.src, &args.dest, ratios, &mut rng)?;

    println!("Total files: {}", summary.total);
    println!("Train: {} -> {}", summary.train, args.dest.join("train").display());
    println!("Test:  {} -> {}", summary.test, args.dest.join("test").display());
    println!("Valid: {} -> {}", summary.valid, args.dest.join("valid").display());

    Ok(())
}
