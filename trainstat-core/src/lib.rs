//! # trainstat-core — status of interrupted training runs
//!
//! Reads what a training loop left behind (checkpoints, exported models, the
//! dataset directory) and turns it into a progress report. Nothing here trains,
//! resumes, or writes to the inspected workspace.
//!
//! ```no_run
//! use trainstat_core::{InspectorConfig, StatusInspector};
//!
//! let inspector = StatusInspector::new(".".into(), InspectorConfig::default());
//! print!("{}", inspector.inspect());
//! ```

pub mod artifacts;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod inspector;
pub mod progress;
pub mod report;

// Re-exports
pub use checkpoint::CheckpointRecord;
pub use config::{ConfigOverrides, InspectorConfig, load_config};
pub use error::StatusError;
pub use inspector::StatusInspector;
pub use progress::ProgressSummary;
pub use report::StatusReport;
