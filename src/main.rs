use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use preprocess_lib::{init_tracing, prep_custom, prep_maestro, vocab, PreprocessOptions};

#[derive(Parser, Debug)]
#[command(name = "preprocess")]
#[command(about = "Encode MIDI corpora into train/val/test token artifacts", long_about = None)]
struct Cli {
    /// Suppress informational messages (only warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Preprocess the MAESTRO dataset using its manifest for the split
    Maestro {
        /// Root folder of the MAESTRO dataset
        root: PathBuf,

        /// Output folder for the preprocessed pieces
        #[arg(short, long, default_value = "./dataset/e_piano")]
        output_dir: PathBuf,
    },
    /// Preprocess a folder of custom MIDI files with a random split
    Custom {
        /// Folder containing the MIDI files
        root: PathBuf,

        /// Output folder for the preprocessed pieces
        #[arg(short, long, default_value = "./dataset/e_piano")]
        output_dir: PathBuf,

        /// Probability that a piece is held out of training
        #[arg(long, default_value = "0.1")]
        valid_p: f64,

        /// Probability that a held-out piece goes to test instead of validation
        #[arg(long, default_value = "0.2")]
        test_p: f64,

        /// Seed for a reproducible split
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Assign ids to symbolic artifacts and rewrite them in place
    Vocab {
        /// Folder holding train/val/test symbolic artifacts
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    match cli.command {
        Commands::Maestro { root, output_dir } => {
            tracing::info!("Preprocessing midi files and saving to {}", output_dir.display());
            let options = PreprocessOptions {
                output_dir,
                ..PreprocessOptions::default()
            };
            let counts = prep_maestro(&root, &options)?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
        Commands::Custom {
            root,
            output_dir,
            valid_p,
            test_p,
            seed,
        } => {
            for (name, p) in [("valid-p", valid_p), ("test-p", test_p)] {
                if !(0.0..=1.0).contains(&p) {
                    anyhow::bail!("--{} must be between 0 and 1, got {}", name, p);
                }
            }
            tracing::info!("Preprocessing custom data and saving to {}", output_dir.display());
            let options = PreprocessOptions {
                output_dir,
                valid_p,
                test_p,
                seed,
            };
            let counts = prep_custom(&root, &options)?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
        Commands::Vocab { output_dir } => {
            let vocab = vocab::rewrite_in_place(&output_dir)?;
            println!(
                "notes: {}, durations: {}, chords: {}",
                vocab.notes.len(),
                vocab.durations.len(),
                vocab.chords.len()
            );
        }
    }

    Ok(())
}
