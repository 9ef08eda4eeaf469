mod error;
mod generate;
mod source;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use source::SourceDir;

#[derive(Parser, Debug)]
#[command(author, version, about = "Synthetic people generator for the geo recommender")]
struct Args {
    /// Directory holding the source datasets
    #[arg(long, global = true, default_value = "data_generation/source_data")]
    source_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write names_N.txt, ages_N.txt and coords_N.txt
    Generate {
        /// Number of people
        #[arg(short, long)]
        size: usize,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Output directory
        #[arg(long, default_value = "data_generation/generated_data")]
        out_dir: PathBuf,
    },

    /// Derive per-cell jitter offsets from the filtered map data
    Offsets,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let source = SourceDir::new(&args.source_dir);

    let result = match args.command {
        Command::Generate {
            size,
            seed,
            out_dir,
        } => generate::generate(&source, &out_dir, size, seed).map(|outputs| {
            info!(
                size,
                names = %outputs.names.display(),
                ages = %outputs.ages.display(),
                coords = %outputs.coords.display(),
                "data generated"
            );
        }),
        Command::Offsets => generate::derive_offsets(&source).map(|_| ()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
