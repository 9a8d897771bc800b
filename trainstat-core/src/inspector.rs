//! The status inspector: locates training artifacts and assembles a report.
//!
//! Every check is independent. A failure while reading one directory or file
//! becomes that section's outcome and the remaining checks still run. Nothing
//! under the workspace is ever written.

use crate::artifacts::{self, ArtifactFile};
use crate::checkpoint::CheckpointRecord;
use crate::config::InspectorConfig;
use crate::error::StatusError;
use crate::progress::ProgressSummary;
use crate::report::{
    CheckpointDetails, CheckpointSection, DatasetSection, SavedModelSection, StatusReport,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Inspects a workspace produced by the training loop.
pub struct StatusInspector {
    workspace: PathBuf,
    config: InspectorConfig,
    list_all: bool,
}

enum Listing {
    NoDirectory,
    Unreadable(StatusError),
    Files(Vec<ArtifactFile>),
}

impl StatusInspector {
    pub fn new(workspace: PathBuf, config: InspectorConfig) -> Self {
        Self {
            workspace,
            config,
            list_all: false,
        }
    }

    /// Include every checkpoint in the rendered report.
    pub fn with_listing(mut self, list_all: bool) -> Self {
        self.list_all = list_all;
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.workspace.join(path)
    }

    fn list(&self, dir: &Path, pattern: &str) -> Listing {
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "Directory not present");
            return Listing::NoDirectory;
        }
        match artifacts::scan(dir, pattern) {
            Ok(files) => Listing::Files(files),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Could not list directory");
                Listing::Unreadable(e)
            }
        }
    }

    /// Run all checks and collect their outcomes.
    pub fn inspect(&self) -> StatusReport {
        info!(workspace = %self.workspace.display(), "Inspecting training workspace");
        StatusReport {
            checkpoints: self.inspect_checkpoints(),
            saved_models: self.inspect_saved_models(),
            dataset: self.inspect_dataset(),
            resume_entry_point: self.config.resume_entry_point.clone(),
            list_all: self.list_all,
        }
    }

    pub fn inspect_checkpoints(&self) -> CheckpointSection {
        let dir = self.resolve(&self.config.checkpoint_dir);
        let files = match self.list(&dir, &self.config.checkpoint_pattern) {
            Listing::NoDirectory => return CheckpointSection::NoDirectory { dir },
            Listing::Unreadable(error) => return CheckpointSection::Unreadable { dir, error },
            Listing::Files(files) => files,
        };

        let Some(latest) = artifacts::latest(&files).cloned() else {
            return CheckpointSection::Empty { dir };
        };
        info!(checkpoint = %latest.file_name, count = files.len(), "Selected latest checkpoint");

        let details = self.read_details(&latest);
        if let Err(e) = &details {
            warn!(checkpoint = %latest.path.display(), error = %e, "Could not read checkpoint details");
        }

        CheckpointSection::Found {
            files,
            latest,
            details,
        }
    }

    fn read_details(&self, checkpoint: &ArtifactFile) -> Result<CheckpointDetails, StatusError> {
        let record = CheckpointRecord::load(&checkpoint.path)?;
        let progress = ProgressSummary::from_epoch(
            record.epoch,
            self.config.total_epochs,
            self.config.hours_per_epoch,
        );
        Ok(CheckpointDetails { record, progress })
    }

    pub fn inspect_saved_models(&self) -> SavedModelSection {
        let dir = self.resolve(&self.config.saved_models_dir);
        let files = match self.list(&dir, &self.config.saved_model_pattern) {
            Listing::NoDirectory => return SavedModelSection::NoDirectory { dir },
            Listing::Unreadable(error) => return SavedModelSection::Unreadable { dir, error },
            Listing::Files(files) => files,
        };

        match artifacts::latest(&files) {
            Some(latest) => SavedModelSection::Found {
                count: files.len(),
                latest: latest.clone(),
            },
            None => SavedModelSection::Empty { dir },
        }
    }

    pub fn inspect_dataset(&self) -> DatasetSection {
        let path = self.resolve(&self.config.dataset_path);
        if path.exists() {
            DatasetSection::Found { path }
        } else {
            debug!(path = %path.display(), "Dataset not found");
            DatasetSection::Missing { path }
        }
    }
}
