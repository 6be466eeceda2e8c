//! `zipmerge prep` - clean the raw exports into the engine's input tables

use anyhow::Result;
use clap::Args;

use zipmerge_core::{ProgressContext, fmt_num};

use crate::config::Config;

#[derive(Args, Debug, Default)]
pub struct PrepArgs {
    /// Clean the raw product export
    #[arg(long)]
    pub products: bool,

    /// Clean the geocoded location export
    #[arg(long)]
    pub locations: bool,

    /// Normalize the census table
    #[arg(long)]
    pub census: bool,
}

impl PrepArgs {
    /// No step flag means every step.
    fn selected(&self) -> (bool, bool, bool) {
        if !(self.products || self.locations || self.census) {
            return (true, true, true);
        }
        (self.products, self.locations, self.census)
    }
}

/// What a prep invocation did, one line per step.
#[derive(Debug, Default)]
pub struct PrepReport {
    pub lines: Vec<(&'static str, String)>,
}

pub fn run(args: PrepArgs, config: &Config, progress: &ProgressContext) -> Result<()> {
    let report = execute(&args, config, progress, false)?;
    let rows: Vec<(&str, String)> = report.lines.iter().map(|(k, v)| (*k, v.clone())).collect();
    eprintln!("\n{}", super::key_value_table(("Step", "Result"), &rows));
    Ok(())
}

/// Run the selected steps.
///
/// With `skip_missing_raw`, a step whose raw export is absent is skipped
/// and the existing cleaned table is used as is.
pub fn execute(
    args: &PrepArgs,
    config: &Config,
    progress: &ProgressContext,
    skip_missing_raw: bool,
) -> Result<PrepReport> {
    let (products, locations, census) = args.selected();
    let data = &config.data;
    let mut report = PrepReport::default();

    let skip = |name: &str, raw: &std::path::Path| -> bool {
        if skip_missing_raw && !raw.is_file() {
            log::info!(
                "{name}: raw file {} not found, using existing cleaned table",
                raw.display()
            );
            return true;
        }
        false
    };

    if products {
        let raw = data.path(&data.raw_products);
        if skip("products", &raw) {
            report.lines.push(("products", "skipped (no raw file)".to_string()));
        } else {
            let stage = progress.stage_line("products");
            stage.message(format!("cleaning {}", raw.display()));
            let summary = zipmerge_prep::clean_products(
                &raw,
                &data.path(&data.products),
                &config.prep.classifier(),
                config.prep.location_id_width,
            )?;
            let line = match summary {
                Some(s) => format!(
                    "{} of {} rows kept ({} inactive, {} duplicate)",
                    fmt_num(s.cleaned_rows),
                    fmt_num(s.raw_rows),
                    fmt_num(s.inactive_dropped),
                    fmt_num(s.duplicates_dropped)
                ),
                None => "empty raw table, nothing written".to_string(),
            };
            stage.finish(&line);
            report.lines.push(("products", line));
        }
    }

    if locations {
        let raw = data.path(&data.raw_locations);
        if skip("locations", &raw) {
            report.lines.push(("locations", "skipped (no raw file)".to_string()));
        } else {
            let stage = progress.stage_line("locations");
            stage.message(format!("cleaning {}", raw.display()));
            let s = zipmerge_prep::clean_locations(
                &raw,
                &data.path(&data.locations),
                config.prep.location_id_width,
            )?;
            let line = format!(
                "{} of {} stores kept ({} not geocoded, {} duplicate)",
                fmt_num(s.cleaned_rows),
                fmt_num(s.raw_rows),
                fmt_num(s.ungeocoded),
                fmt_num(s.duplicates_dropped)
            );
            stage.finish(&line);
            report.lines.push(("locations", line));
        }
    }

    if census {
        let raw = data.path(&data.raw_census);
        if skip("census", &raw) {
            report.lines.push(("census", "skipped (no raw file)".to_string()));
        } else {
            let stage = progress.stage_line("census");
            stage.message(format!("normalizing {}", raw.display()));
            let s = zipmerge_prep::process_census(&raw, &data.path(&data.census))?;
            let line = format!(
                "{} ZIP codes ({} with zero population)",
                fmt_num(s.rows),
                fmt_num(s.zero_population)
            );
            stage.finish(&line);
            report.lines.push(("census", line));
        }
    }

    Ok(report)
}
