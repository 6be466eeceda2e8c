//! zipmerge Core - Shared infrastructure for the ZIP-level merge pipeline
//!
//! Typed records for the three source tables, CSV table I/O with
//! fail-fast handling of missing inputs, and logging/progress plumbing
//! used by every other crate in the workspace.

pub mod error;
pub mod logging;
pub mod model;
pub mod progress;
pub mod table;

// Re-exports for convenience
pub use error::InputError;
pub use logging::{ProgressLogger, init_logging};
pub use model::{DemographicRecord, DemographicTable, Location, ProductObservation};
pub use progress::{ProgressContext, SharedProgress, StageLine, fmt_num};
pub use table::{RawTable, read_raw, read_records, require_input, write_raw, write_records};
