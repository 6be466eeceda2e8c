//! Run manifest: stored next to the final dataset as `manifest.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::hash;
use crate::input::RunInput;

pub const MANIFEST_FILE: &str = "manifest.json";

/// How one run was produced and what it wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Blake3 hash of config and input contents.
    pub input_hash: String,
    /// Config JSON that was hashed (for auditability).
    pub config_json: String,
    /// Per-table input hashes; `null` for an absent optional table.
    pub input_files: BTreeMap<String, Option<String>>,
    /// Output file name → blake3 hash, relative to the manifest directory.
    pub output_files: BTreeMap<String, String>,
    /// Combined hash of all output files.
    pub content_hash: String,
    pub output_rows: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Outcome of comparing a planned run with the stored manifest.
#[derive(Debug)]
pub enum Lookup {
    /// Same inputs and the recorded outputs are intact.
    Current(RunManifest),
    /// Needs a run, with the reason.
    Stale(String),
}

/// Verification result for one output file.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyResult {
    pub path: String,
    pub expected: String,
    pub actual: String,
    pub ok: bool,
}

fn relative_name(dir: &Path, path: &Path) -> String {
    path.strip_prefix(dir)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Hash the final dataset plus every file under `extra_dirs`.
///
/// Keys are paths relative to `dir`; the manifest itself is never hashed.
pub fn hash_outputs(
    dir: &Path,
    output_path: &Path,
    extra_dirs: &[&Path],
) -> Result<(BTreeMap<String, String>, blake3::Hash)> {
    let mut paths = vec![output_path.to_path_buf()];
    for extra in extra_dirs {
        let pattern = extra.join("**/*");
        let found = glob::glob(&pattern.to_string_lossy())
            .context("invalid glob pattern")?
            .filter_map(|e| e.ok())
            .filter(|p| p.is_file() && p.file_name().is_none_or(|n| n != MANIFEST_FILE));
        paths.extend(found);
    }

    let mut hashes = BTreeMap::new();
    for path in &paths {
        let h = hash::hash_file(path)
            .with_context(|| format!("failed to hash {}", path.display()))?;
        hashes.insert(relative_name(dir, path), h.to_hex().to_string());
    }

    // BTreeMap order keeps the combined hash stable.
    let digests: Vec<blake3::Hash> = hashes.values().filter_map(|h| hash::parse_hex(h)).collect();
    Ok((hashes, hash::combine_hashes(&digests)))
}

impl RunManifest {
    /// Manifest location for a given final dataset path.
    pub fn path_for(output_path: &Path) -> PathBuf {
        output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .join(MANIFEST_FILE)
    }

    /// Record a finished run.
    pub fn record(
        input: &RunInput,
        output_path: &Path,
        extra_dirs: &[&Path],
        output_rows: usize,
    ) -> Result<Self> {
        let manifest_path = Self::path_for(output_path);
        let dir = manifest_path.parent().unwrap_or(Path::new("."));
        let (output_files, content_hash) = hash_outputs(dir, output_path, extra_dirs)?;
        Ok(Self {
            input_hash: input.input_hash().to_hex().to_string(),
            config_json: input.config_json.clone(),
            input_files: input.files.clone(),
            output_files,
            content_hash: content_hash.to_hex().to_string(),
            output_rows,
            created_at: chrono::Utc::now(),
        })
    }

    pub fn short_input_hash(&self) -> &str {
        hash::short_hex(&self.input_hash)
    }

    /// Write atomically to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize manifest")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Re-hash every recorded output file.
    pub fn verify(&self, dir: &Path) -> Vec<VerifyResult> {
        self.output_files
            .iter()
            .map(|(name, expected)| {
                let path = dir.join(name);
                let actual = if path.is_file() {
                    match hash::hash_file(&path) {
                        Ok(h) => h.to_hex().to_string(),
                        Err(e) => format!("error: {e}"),
                    }
                } else {
                    "MISSING".to_string()
                };
                VerifyResult {
                    path: name.clone(),
                    ok: actual == *expected,
                    expected: expected.clone(),
                    actual,
                }
            })
            .collect()
    }

    /// Decide whether a run with `input` writing to `output_path` can be skipped.
    pub fn lookup(input: &RunInput, output_path: &Path) -> Result<Lookup> {
        let path = Self::path_for(output_path);
        if !path.is_file() {
            return Ok(Lookup::Stale("no manifest".to_string()));
        }
        let manifest = match Self::read_from(&path) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Ignoring unreadable manifest: {e:#}");
                return Ok(Lookup::Stale("unreadable manifest".to_string()));
            }
        };

        let planned = input.input_hash().to_hex().to_string();
        if manifest.input_hash != planned {
            let changed: Vec<&str> = input
                .files
                .iter()
                .filter(|(table, h)| manifest.input_files.get(*table) != Some(*h))
                .map(|(table, _)| table.as_str())
                .collect();
            let reason = if changed.is_empty() {
                "config changed".to_string()
            } else {
                format!("inputs changed: {}", changed.join(", "))
            };
            return Ok(Lookup::Stale(reason));
        }

        let dir = path.parent().unwrap_or(Path::new("."));
        if let Some(bad) = manifest.verify(dir).into_iter().find(|r| !r.ok) {
            return Ok(Lookup::Stale(format!("output {} does not match manifest", bad.path)));
        }
        Ok(Lookup::Current(manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Cfg {
        level: i32,
    }

    struct Setup {
        dir: tempfile::TempDir,
    }

    impl Setup {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("products.csv"), "p").unwrap();
            fs::write(dir.path().join("final_dataset.csv"), "ZIP Code\n45202\n").unwrap();
            Self { dir }
        }

        fn input(&self, level: i32) -> RunInput {
            RunInput::new(&Cfg { level })
                .unwrap()
                .with_file("product", &self.dir.path().join("products.csv"))
                .unwrap()
        }

        fn output(&self) -> PathBuf {
            self.dir.path().join("final_dataset.csv")
        }

        fn commit(&self, level: i32) -> RunManifest {
            let manifest = RunManifest::record(&self.input(level), &self.output(), &[], 1).unwrap();
            manifest.write_to(&RunManifest::path_for(&self.output())).unwrap();
            manifest
        }
    }

    #[test]
    fn manifest_sits_next_to_output() {
        assert_eq!(
            RunManifest::path_for(Path::new("out/final.csv")),
            Path::new("out/manifest.json")
        );
        assert_eq!(
            RunManifest::path_for(Path::new("final.csv")),
            Path::new("./manifest.json")
        );
    }

    #[test]
    fn write_and_read_back() {
        let s = Setup::new();
        let written = s.commit(3);
        let read = RunManifest::read_from(&RunManifest::path_for(&s.output())).unwrap();
        assert_eq!(read, written);
        assert_eq!(read.output_files.len(), 1);
        assert!(read.output_files.contains_key("final_dataset.csv"));
        assert_eq!(read.short_input_hash().len(), 8);
    }

    #[test]
    fn unchanged_run_is_current() {
        let s = Setup::new();
        s.commit(3);
        assert!(matches!(
            RunManifest::lookup(&s.input(3), &s.output()).unwrap(),
            Lookup::Current(_)
        ));
    }

    #[test]
    fn changed_input_or_config_is_stale() {
        let s = Setup::new();
        s.commit(3);
        let Lookup::Stale(reason) = RunManifest::lookup(&s.input(5), &s.output()).unwrap() else {
            panic!("config change should invalidate");
        };
        assert_eq!(reason, "config changed");

        fs::write(s.dir.path().join("products.csv"), "p2").unwrap();
        let Lookup::Stale(reason) = RunManifest::lookup(&s.input(3), &s.output()).unwrap() else {
            panic!("input change should invalidate");
        };
        assert!(reason.contains("product"));
    }

    #[test]
    fn tampered_output_fails_verify() {
        let s = Setup::new();
        let manifest = s.commit(3);
        fs::write(s.output(), "ZIP Code\n99999\n").unwrap();

        let results = manifest.verify(s.dir.path());
        assert_eq!(results.len(), 1);
        assert!(!results[0].ok);
        assert!(matches!(
            RunManifest::lookup(&s.input(3), &s.output()).unwrap(),
            Lookup::Stale(_)
        ));

        fs::remove_file(s.output()).unwrap();
        assert_eq!(manifest.verify(s.dir.path())[0].actual, "MISSING");
    }

    #[test]
    fn intermediate_files_are_recorded() {
        let s = Setup::new();
        let inter = s.dir.path().join("intermediate");
        fs::create_dir_all(&inter).unwrap();
        fs::write(inter.join("product_summary.csv"), "x").unwrap();
        fs::write(inter.join("zip_category_summary.csv"), "y").unwrap();

        let manifest = RunManifest::record(&s.input(3), &s.output(), &[&inter], 1).unwrap();
        assert_eq!(manifest.output_files.len(), 3);
        assert!(manifest.output_files.contains_key("intermediate/product_summary.csv"));
        assert!(manifest.verify(s.dir.path()).iter().all(|r| r.ok));
    }

    #[test]
    fn missing_manifest_is_stale() {
        let s = Setup::new();
        assert!(matches!(
            RunManifest::lookup(&s.input(3), &s.output()).unwrap(),
            Lookup::Stale(_)
        ));
    }
}
