//! zipmerge - ZIP-level grocery price and demographic dataset builder
//!
//! Cleans the raw product, store and census exports, aggregates product
//! prices per ZIP code and category, and merges them with store and
//! demographic data into one analysis table.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;
use zipmerge_core::SharedProgress;

#[derive(Parser)]
#[command(name = "zipmerge")]
#[command(about = "Build the ZIP-level grocery price and demographic dataset")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./zipmerge.toml or ~/.config/zipmerge/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the input and output tables
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Clean raw exports into the engine's input tables
    Prep(cmd::prep::PrepArgs),
    /// Aggregate and merge the cleaned tables into the final dataset
    Merge(cmd::merge::MergeArgs),
    /// Prep + merge, skipped when inputs are unchanged
    Run(cmd::run::RunArgs),
    /// Check the final dataset against its run manifest
    Verify,
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress: SharedProgress = Arc::new(zipmerge_core::ProgressContext::new());

    // TTY: quiet (warn) unless --debug, spinners show activity.
    // Non-TTY: info unless --debug.
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    zipmerge_core::init_logging(quiet, cli.debug, multi);

    let mut config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };
    if let Some(dir) = cli.data_dir {
        config.data.dir = dir;
    }

    match cli.command {
        Command::Prep(args) => cmd::prep::run(args, &config, &progress),
        Command::Merge(args) => cmd::merge::run(args, &config, &progress),
        Command::Run(args) => cmd::run::run(args, &config, &progress),
        Command::Verify => cmd::verify::run(&config),
        Command::Config => {
            let data = &config.data;
            let categories = config
                .prep
                .categories
                .iter()
                .map(|c| format!("{} → {}", c.pattern, c.category))
                .collect::<Vec<_>>()
                .join(", ");
            let rows = vec![
                ("Data directory", data.dir.display().to_string()),
                ("Raw products", data.raw_products.clone()),
                ("Products", data.products.clone()),
                ("Raw locations", data.raw_locations.clone()),
                ("Locations", data.locations.clone()),
                ("Raw census", data.raw_census.clone()),
                ("Census", data.census.clone()),
                ("Boundaries", data.boundaries.clone()),
                ("Final dataset", data.output.clone()),
                ("Output format", config.output.format.to_string()),
                ("Compression level", config.output.compression_level.to_string()),
                (
                    "Intermediate tables",
                    if config.output.write_intermediate {
                        format!("yes ({})", data.intermediate_dir)
                    } else {
                        "no".to_string()
                    },
                ),
                ("Location ID width", config.prep.location_id_width.to_string()),
                (
                    "Categories",
                    format!("{categories} (else {})", config.prep.fallback_category),
                ),
                ("Excluded keywords", config.prep.excluded_keywords.join(", ")),
            ];
            eprintln!("\n{}", cmd::key_value_table(("Setting", "Value"), &rows));
            Ok(())
        }
    }
}
