use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use perf_codec::Event;
use std::fs;
use std::path::{Path, PathBuf};

use midi_to_tokens::note::pitch_name;
use midi_to_tokens::{
    decode_to_midi, encode_file, init_tracing, read_tokens_json, write_tokens_json,
    MidiWriteOptions,
};

#[derive(Parser, Debug)]
#[command(name = "midi-to-tokens")]
#[command(about = "Convert MIDI files to performance event tokens and back", long_about = None)]
struct Cli {
    /// Suppress informational messages (only warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode a MIDI file into a JSON token array
    Encode {
        /// Path to the MIDI file (default: uses first .mid file in current directory)
        #[arg(short, long)]
        midi: Option<PathBuf>,

        /// Output file path (default: `<midi-name>.tokens.json`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print tokens to stdout instead of a file
        #[arg(long)]
        stdout: bool,
    },
    /// Decode a JSON token array into a MIDI file
    Decode {
        /// Path to the token file
        #[arg(short, long)]
        tokens: PathBuf,

        /// Output MIDI path
        #[arg(short, long)]
        output: PathBuf,

        /// General MIDI program of the rendered instrument
        #[arg(short, long, default_value = "0")]
        program: u8,
    },
    /// Print a token file as readable events
    Inspect {
        /// Path to the token file
        #[arg(short, long)]
        tokens: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    match cli.command {
        Commands::Encode { midi, output, stdout } => {
            let midi_path = match midi {
                Some(path) => {
                    if !path.exists() {
                        anyhow::bail!("MIDI file not found: {}", path.display());
                    }
                    path
                }
                None => find_first_midi_file()?,
            };

            tracing::info!("Encoding MIDI file: {}", midi_path.display());
            let tokens = encode_file(&midi_path)?;

            if stdout {
                println!("{}", serde_json::to_string(&tokens)?);
            } else {
                let output_path = output.unwrap_or_else(|| default_output_path(&midi_path));
                write_tokens_json(&output_path, &tokens)?;
                tracing::info!("{} tokens saved to {}", tokens.len(), output_path.display());
            }
        }
        Commands::Decode { tokens, output, program } => {
            let token_seq = read_tokens_json(&tokens)?;
            let options = MidiWriteOptions {
                program,
                ..MidiWriteOptions::default()
            };
            let (notes, bytes) = decode_to_midi(&token_seq, &options)?;
            fs::write(&output, bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!("{} notes saved to {}", notes.len(), output.display());
        }
        Commands::Inspect { tokens } => {
            for token in read_tokens_json(&tokens)? {
                let event = Event::from_int(token)?;
                let text = match event {
                    Event::NoteOn(pitch) => format!("NoteOn  {}", pitch_name(pitch)),
                    Event::NoteOff(pitch) => format!("NoteOff {}", pitch_name(pitch)),
                    Event::TimeShift(v) => format!("+{:.2}s", (v as f64 + 1.0) / 100.0),
                    Event::Velocity(v) => format!("vel {}", v as u32 * 4),
                };
                println!("{:>4}  {}", token, text);
            }
        }
    }

    Ok(())
}

fn default_output_path(midi_path: &Path) -> PathBuf {
    let stem = midi_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    PathBuf::from(format!("{}.tokens.json", stem))
}

fn find_first_midi_file() -> Result<PathBuf> {
    let entries = fs::read_dir(".").context("Failed to read current directory")?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if matches!(path.extension().and_then(|s| s.to_str()), Some("mid" | "midi")) {
            return Ok(path);
        }
    }

    anyhow::bail!("No MIDI files found in current directory")
}
