//! `zipmerge run` - prep + merge, skipped when nothing changed since the last run

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use zipmerge_aggregate::AggregateConfig;
use zipmerge_core::ProgressContext;
use zipmerge_store::{Lookup, RunInput, RunManifest, short_hex};

use super::merge::{self, MergeArgs};
use super::prep::{self, PrepArgs};
use crate::config::{Config, OutputConfig, PrepConfig};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Re-run the merge even if the manifest says it is current
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub merge: MergeArgs,
}

/// Settings that change the output for identical input tables.
#[derive(Serialize)]
struct RunKey<'a> {
    output: &'a OutputConfig,
    prep: &'a PrepConfig,
    format: String,
    intermediate: bool,
}

/// Identity of a merge over the cleaned tables in `agg`.
pub(crate) fn run_input(config: &Config, agg: &AggregateConfig) -> Result<RunInput> {
    let key = RunKey {
        output: &config.output,
        prep: &config.prep,
        format: agg.format.to_string(),
        intermediate: agg.intermediate_dir.is_some(),
    };
    RunInput::new(&key)?
        .with_file("product", &agg.product_path)?
        .with_file("location", &agg.location_path)?
        .with_file("demographic", &agg.demographic_path)?
        .with_optional_file("boundary", agg.boundary_path.as_deref())
}

pub fn run(args: RunArgs, config: &Config, progress: &ProgressContext) -> Result<()> {
    let report = prep::execute(&PrepArgs::default(), config, progress, true)?;
    for (step, line) in &report.lines {
        log::info!("prep {step}: {line}");
    }

    let agg = args.merge.resolve(config);
    // Missing cleaned tables surface here as the engine's input error.
    for (table, path) in [
        ("product", &agg.product_path),
        ("location", &agg.location_path),
        ("demographic", &agg.demographic_path),
    ] {
        zipmerge_core::require_input(table, path)?;
    }

    let input = run_input(config, &agg)?;
    let manifest_path = RunManifest::path_for(&agg.output_path);

    if !args.force {
        match RunManifest::lookup(&input, &agg.output_path)? {
            Lookup::Current(manifest) => {
                log::info!("merge: cached ({})", manifest.short_input_hash());
                let rows = vec![
                    ("Status", "CACHED".to_string()),
                    ("Input hash", manifest.short_input_hash().to_string()),
                    ("Content hash", short_hex(&manifest.content_hash).to_string()),
                    ("Final rows", zipmerge_core::fmt_num(manifest.output_rows)),
                    ("Created", manifest.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                    ("Output", agg.output_path.display().to_string()),
                ];
                eprintln!("\n{}", super::key_value_table(("Run", "Value"), &rows));
                return Ok(());
            }
            Lookup::Stale(reason) => log::info!("merge: needs run ({reason})"),
        }
    }

    let summary = merge::execute(&agg, progress)?;

    let extra: Vec<&std::path::Path> = agg.intermediate_dir.as_deref().into_iter().collect();
    let manifest = RunManifest::record(&input, &agg.output_path, &extra, summary.merge.output_rows)?;
    manifest.write_to(&manifest_path)?;
    log::info!(
        "merge: committed (content_hash: {})",
        short_hex(&manifest.content_hash)
    );

    let mut rows = vec![
        ("Status", "EXECUTED".to_string()),
        ("Input hash", manifest.short_input_hash().to_string()),
        ("Content hash", short_hex(&manifest.content_hash).to_string()),
    ];
    rows.extend(merge::summary_rows(&agg, &summary));
    eprintln!("\n{}", super::key_value_table(("Run", "Value"), &rows));
    Ok(())
}
