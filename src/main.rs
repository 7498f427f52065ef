use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

use hubbard_index::{find_intersite_pairs, logger, parser, IntersiteConfig, DEFAULT_CUTOFF};

#[derive(Parser)]
#[command(author, version, about = "Lists atom pairs within a cutoff for Hubbard V (intersite) parameters")]
struct Cli {
    /// Quantum ESPRESSO pw.x input file.
    #[arg(short, long)]
    input: PathBuf,

    /// Cutoff radius in Å.
    #[arg(short, long, default_value_t = DEFAULT_CUTOFF)]
    cutoff: f64,

    /// Only use atoms of these species as pair centres.
    #[arg(short, long, num_args = 1..)]
    elements: Option<Vec<String>>,

    /// Drop the zero-distance pair of each atom with itself.
    #[arg(long)]
    exclude_self: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(logger::level_from_verbosity(cli.verbose)).context("Failed to install logger")?;
    let start_time = Instant::now();

    info!("Reading structure from {:?}...", cli.input);
    let crystal = parser::from_pw_input(&cli.input)?;
    info!("Loaded {} atoms.", crystal.len());

    let config = IntersiteConfig {
        cutoff: cli.cutoff,
        elements: cli.elements,
        include_self: !cli.exclude_self,
    };

    let records = find_intersite_pairs(&crystal, &config)?;
    for record in &records {
        println!("{}", record);
    }

    info!("Done in {:.2?}", start_time.elapsed());
    Ok(())
}
