//! Input errors shared by the prep and aggregate stages

use std::path::PathBuf;

/// Error raised when a required input table cannot be used at all.
///
/// Row-level defects (bad prices, unparseable sizes) never surface here;
/// they are replaced by sentinels while the row is deserialized.
#[derive(Debug)]
pub enum InputError {
    /// A required table file does not exist.
    Missing { table: &'static str, path: PathBuf },
    /// The table exists but lacks a column the stage keys on.
    MissingColumn { table: &'static str, column: String },
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { table, path } => write!(
                f,
                "{table} table not found: expected file at {}",
                path.display()
            ),
            Self::MissingColumn { table, column } => {
                write!(f, "{table} table has no '{column}' column")
            }
        }
    }
}

impl std::error::Error for InputError {}

impl InputError {
    /// Name of the table the error refers to.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Missing { table, .. } | Self::MissingColumn { table, .. } => table,
        }
    }
}
