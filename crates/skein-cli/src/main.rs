//! Terminal player for skein interactive fiction.

mod commands;
mod demo;
mod presenter;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "skein",
    about = "skein — a terminal player for quality-based interactive fiction",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the bundled demo story interactively
    Play {
        /// RNG seed for a reproducible session (unique stream when omitted)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Load a saved game from this file before playing
        #[arg(short, long)]
        load: Option<PathBuf>,
    },

    /// Run a scripted playthrough of the demo story and print the transcript
    Run {
        /// RNG seed for deterministic output
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Comma-separated 1-based choice indices to commit, in order
        #[arg(short, long, default_value = "")]
        choices: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Play { seed, load } => commands::play::run(seed, load.as_deref()),
        Commands::Run { seed, choices } => commands::run::run(seed, &choices),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
