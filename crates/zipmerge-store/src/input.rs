//! Identity of a run: config plus the content of every input table.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::hash;

/// Everything that determines a run's output.
///
/// Files are keyed by table name; an optional table that is absent is
/// recorded as `None` so that adding it later changes the hash.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInput {
    pub config_json: String,
    pub files: BTreeMap<String, Option<String>>,
}

impl RunInput {
    pub fn new<T: Serialize>(config: &T) -> Result<Self> {
        let config_json = serde_json::to_string(config).context("Failed to serialize run config")?;
        Ok(Self {
            config_json,
            files: BTreeMap::new(),
        })
    }

    /// Record a required input file.
    pub fn with_file(mut self, table: &str, path: &Path) -> Result<Self> {
        let h = hash::hash_file(path)
            .with_context(|| format!("Failed to hash {table} table: {}", path.display()))?;
        self.files.insert(table.to_string(), Some(h.to_hex().to_string()));
        Ok(self)
    }

    /// Record an input file that may be absent.
    pub fn with_optional_file(mut self, table: &str, path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.is_file() => self.with_file(table, path),
            _ => {
                self.files.insert(table.to_string(), None);
                Ok(self)
            }
        }
    }

    pub fn input_hash(&self) -> blake3::Hash {
        let mut parts = vec![hash::hash_bytes(self.config_json.as_bytes())];
        for (table, file_hash) in &self.files {
            parts.push(hash::hash_bytes(table.as_bytes()));
            parts.push(match file_hash {
                Some(hex) => hash::parse_hex(hex).unwrap_or_else(|| hash::hash_bytes(hex.as_bytes())),
                None => hash::hash_bytes(b"absent"),
            });
        }
        hash::combine_hashes(&parts)
    }
}
