//! `zipmerge verify` - re-hash the outputs recorded in the run manifest

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use zipmerge_store::{RunManifest, VerifyResult, short_hex};

use crate::config::Config;

/// Check every recorded output. Returns the per-file results.
pub fn check(config: &Config) -> Result<Vec<VerifyResult>> {
    let output = config.output_path();
    let manifest_path = RunManifest::path_for(&output);
    let manifest = RunManifest::read_from(&manifest_path)
        .with_context(|| format!("no run manifest next to {}", output.display()))?;
    let dir = manifest_path
        .parent()
        .map(std::path::Path::to_path_buf)
        .unwrap_or_default();
    Ok(manifest.verify(&dir))
}

pub fn run(config: &Config) -> Result<()> {
    let results = check(config)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("File").fg(Color::Cyan),
            Cell::new("Expected").fg(Color::Cyan),
            Cell::new("Actual").fg(Color::Cyan),
            Cell::new("Status").fg(Color::Cyan),
        ]);
    for r in &results {
        let status = if r.ok {
            Cell::new("OK").fg(Color::Green)
        } else {
            Cell::new("FAIL").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&r.path),
            Cell::new(short_hex(&r.expected)),
            Cell::new(short_hex(&r.actual)),
            status,
        ]);
    }
    eprintln!("\n{table}");

    let failed = results.iter().filter(|r| !r.ok).count();
    if failed > 0 {
        bail!("{failed} of {} output files do not match the manifest", results.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data.dir = dir.path().to_path_buf();
        let err = check(&config).unwrap_err();
        assert!(err.to_string().contains("no run manifest"));
    }

    #[test]
    fn detects_modified_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data.dir = dir.path().to_path_buf();
        let output = config.output_path();
        std::fs::write(&output, "ZIP Code\n45202\n").unwrap();

        let input = zipmerge_store::RunInput::new(&"cfg").unwrap();
        RunManifest::record(&input, &output, &[], 1)
            .unwrap()
            .write_to(&RunManifest::path_for(&output))
            .unwrap();
        assert!(check(&config).unwrap().iter().all(|r| r.ok));
        assert!(run(&config).is_ok());

        std::fs::write(&output, "ZIP Code\n45203\n").unwrap();
        assert!(!check(&config).unwrap()[0].ok);
        assert!(run(&config).is_err());
    }
}
