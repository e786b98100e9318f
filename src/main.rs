// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
mod allocate;
mod classify;
mod config;
mod factory;
mod names;
mod normalize;
mod pack;
mod pool;
mod select;
#[cfg(test)]
mod testutil;
mod util;

use std::error::Error;
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};

use crate::classify::{index_library, Classifier};
use crate::factory::{Factory, PackSummary};
use crate::util::size_display;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Builds sample packs for the Polyend Play."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Builds new sample packs in the configured output directory.
    Pack {
        /// The path to the factory config.
        config_path: PathBuf,
        /// How many packs to build.
        #[arg(allow_negative_numbers = true)]
        count: i64,
        /// Seed for a reproducible batch.
        #[arg(short, long)]
        seed: Option<u64>,
        /// Prints the planned packs as YAML instead of writing them.
        #[arg(short, long)]
        dry_run: bool,
    },
    /// Builds one pack per library under the configured library roots.
    LibraryPacks {
        /// The path to the factory config.
        config_path: PathBuf,
        /// Seed for a reproducible batch.
        #[arg(short, long)]
        seed: Option<u64>,
        /// Prints the planned packs as YAML instead of writing them.
        #[arg(short, long)]
        dry_run: bool,
    },
    /// Lists the candidate pool of every configured category.
    Pools {
        /// The path to the factory config.
        config_path: PathBuf,
    },
    /// Classifies a sample library and prints how many files land in each category.
    Classify {
        /// The path to the factory config.
        config_path: PathBuf,
        /// The library root to classify.
        library_path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pack {
            config_path,
            count,
            seed,
            dry_run,
        } => {
            if count <= 0 {
                return Err(format!("pack count must be a positive number, got {}", count).into());
            }
            let count = usize::try_from(count)?;

            let factory = Factory::new(config::PackFactory::deserialize(&config_path)?);
            let pools = factory.pools();
            let packs = factory.plan(&pools, count, seed)?;

            if dry_run {
                print!("{}", serde_yml::to_string(&packs)?);
                return Ok(());
            }

            print_summaries(&factory.materialize(&pools, &packs)?);
        }
        Commands::LibraryPacks {
            config_path,
            seed,
            dry_run,
        } => {
            let factory = Factory::new(config::PackFactory::deserialize(&config_path)?);
            let batch = factory.plan_libraries(seed)?;

            if dry_run {
                print!("{}", serde_yml::to_string(&batch.packs())?);
                return Ok(());
            }
            if batch.is_empty() {
                println!("Every library already has a pack.");
                return Ok(());
            }

            print_summaries(&factory.materialize_libraries(&batch)?);
        }
        Commands::Pools { config_path } => {
            let factory = Factory::new(config::PackFactory::deserialize(&config_path)?);
            let pools = factory.pools();

            if pools.is_empty() {
                println!("No categories configured in {}.", config_path.display());
                return Ok(());
            }

            println!("Candidate pools (count: {}):", pools.len());
            for pool in pools.iter() {
                let bytes: u64 = pool.files().iter().map(|file| file.size()).sum();
                println!(
                    "- {}: {} files ({})",
                    pool.category(),
                    pool.len(),
                    size_display(bytes)
                );
            }
        }
        Commands::Classify {
            config_path,
            library_path,
        } => {
            let config = config::PackFactory::deserialize(&config_path)?;
            let classifier = config
                .library()
                .map(|library| library.classifier())
                .unwrap_or_else(Classifier::default);
            let index = index_library(&[library_path], &classifier);

            println!("Categories (count: {}):", index.counts().len());
            for (category, count) in index.counts() {
                println!("- {}: {} files", category, count);
            }
            println!("Ignored or unmatched: {} files", index.dropped());
        }
    }

    Ok(())
}

fn print_summaries(summaries: &[PackSummary]) {
    let inserted: usize = summaries.iter().map(|summary| summary.inserted()).sum();
    let failed: usize = summaries.iter().map(|summary| summary.failed().len()).sum();
    for summary in summaries.iter() {
        println!("{}", summary);
    }
    println!(
        "Built {} packs with {} files in total ({} failed).",
        summaries.len(),
        inserted,
        failed
    );
}
