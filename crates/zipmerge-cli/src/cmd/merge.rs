//! `zipmerge merge` - run the aggregation engine on the cleaned tables

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use zipmerge_aggregate::{AggregateConfig, AggregateSummary, OutputFormat};
use zipmerge_core::{ProgressContext, fmt_num};

use crate::config::Config;

#[derive(Args, Debug, Default)]
pub struct MergeArgs {
    /// Output format (csv or parquet)
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Final dataset path (default: data dir / configured name)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the intermediate summary tables
    #[arg(long)]
    pub intermediate: bool,

    /// Skip the ZIP boundary join even if the file exists
    #[arg(long)]
    pub no_boundaries: bool,
}

impl MergeArgs {
    /// Config file values with command-line overrides applied.
    pub fn resolve(&self, config: &Config) -> AggregateConfig {
        let mut agg = config.aggregate_config();
        if let Some(format) = self.format {
            agg.format = format;
        }
        if let Some(output) = &self.output {
            agg.output_path = output.clone();
        }
        if self.intermediate && agg.intermediate_dir.is_none() {
            agg.intermediate_dir = Some(config.intermediate_path());
        }
        if self.no_boundaries {
            agg.boundary_path = None;
        }
        agg
    }
}

pub fn run(args: MergeArgs, config: &Config, progress: &ProgressContext) -> Result<()> {
    let agg = args.resolve(config);
    let summary = execute(&agg, progress)?;
    print_summary(&agg, &summary);
    Ok(())
}

pub(crate) fn execute(agg: &AggregateConfig, progress: &ProgressContext) -> Result<AggregateSummary> {
    let stage = progress.stage_line("merge");
    stage.message(format!("writing {}", agg.output_path.display()));
    let summary = zipmerge_aggregate::run(agg)?;
    stage.finish(&format!("{} rows", fmt_num(summary.merge.output_rows)));
    Ok(summary)
}

pub(crate) fn summary_rows(agg: &AggregateConfig, s: &AggregateSummary) -> Vec<(&'static str, String)> {
    vec![
        ("Product observations", fmt_num(s.observations)),
        ("Stores", fmt_num(s.stores)),
        ("Demographic ZIPs", fmt_num(s.demographic_zips)),
        (
            "Boundary ZIPs",
            s.boundary_zips.map_or_else(|| "not loaded".to_string(), fmt_num),
        ),
        ("Product-locations", fmt_num(s.product_summaries)),
        ("ZIP × category rows", fmt_num(s.zip_categories)),
        ("ZIPs with stores", fmt_num(s.location_zips)),
        ("Dropped incomplete", fmt_num(s.merge.dropped_incomplete)),
        ("Final rows", fmt_num(s.merge.output_rows)),
        ("Output", format!("{} ({})", agg.output_path.display(), agg.format)),
    ]
}

fn print_summary(agg: &AggregateConfig, summary: &AggregateSummary) {
    let table = super::key_value_table(("Merge", "Value"), &summary_rows(agg, summary));
    eprintln!("\n{table}");
}
