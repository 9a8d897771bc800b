//! Status report sections and their text rendering.
//!
//! Each section carries its own outcome, so a failure in one is rendered as a
//! warning without affecting the others.

use crate::artifacts::{ArtifactFile, format_size};
use crate::checkpoint::CheckpointRecord;
use crate::error::StatusError;
use crate::progress::ProgressSummary;
use std::fmt;
use std::path::PathBuf;

const RULE_WIDTH: usize = 50;

/// Values read from the newest checkpoint plus the figures derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointDetails {
    pub record: CheckpointRecord,
    pub progress: ProgressSummary,
}

/// Outcome of inspecting the checkpoint directory.
#[derive(Debug)]
pub enum CheckpointSection {
    NoDirectory {
        dir: PathBuf,
    },
    Unreadable {
        dir: PathBuf,
        error: StatusError,
    },
    Empty {
        dir: PathBuf,
    },
    Found {
        /// Every matching checkpoint, oldest first.
        files: Vec<ArtifactFile>,
        latest: ArtifactFile,
        details: Result<CheckpointDetails, StatusError>,
    },
}

/// Outcome of inspecting the saved-model directory.
#[derive(Debug)]
pub enum SavedModelSection {
    NoDirectory { dir: PathBuf },
    Unreadable { dir: PathBuf, error: StatusError },
    Empty { dir: PathBuf },
    Found { count: usize, latest: ArtifactFile },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSection {
    Found { path: PathBuf },
    Missing { path: PathBuf },
}

/// Aggregated result of one inspection run.
#[derive(Debug)]
pub struct StatusReport {
    pub checkpoints: CheckpointSection,
    pub saved_models: SavedModelSection,
    pub dataset: DatasetSection,
    pub resume_entry_point: String,
    /// Also list every checkpoint, not just the latest.
    pub list_all: bool,
}

impl StatusReport {
    /// Progress of the run, when the latest checkpoint could be read.
    pub fn progress(&self) -> Option<&ProgressSummary> {
        match &self.checkpoints {
            CheckpointSection::Found {
                details: Ok(details),
                ..
            } => Some(&details.progress),
            _ => None,
        }
    }

    /// Number of sections that ended in a warning.
    pub fn warning_count(&self) -> usize {
        let checkpoint = matches!(
            self.checkpoints,
            CheckpointSection::Unreadable { .. } | CheckpointSection::Found { details: Err(_), .. }
        );
        let models = matches!(self.saved_models, SavedModelSection::Unreadable { .. });
        let dataset = matches!(self.dataset, DatasetSection::Missing { .. });
        [checkpoint, models, dataset].iter().filter(|w| **w).count()
    }
}

fn dir_name(dir: &std::path::Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

impl fmt::Display for CheckpointSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointSection::NoDirectory { .. } => {
                writeln!(f, "No checkpoints directory found")?;
                writeln!(f, "Training hasn't been started yet")
            }
            CheckpointSection::Unreadable { dir, error } => {
                writeln!(f, "Warning: could not list {}: {error}", dir.display())
            }
            CheckpointSection::Empty { dir } => {
                writeln!(f, "Warning: No checkpoints found in {}/ directory", dir_name(dir))?;
                writeln!(f, "Training hasn't started yet or checkpoints were cleared")
            }
            CheckpointSection::Found {
                files,
                latest,
                details,
            } => {
                writeln!(f, "Found {} checkpoint(s)", files.len())?;
                writeln!(f, "Latest checkpoint: {}", latest.file_name)?;
                match details {
                    Ok(details) => write!(f, "{details}"),
                    Err(e) => writeln!(f, "Warning: Could not read checkpoint details: {e}"),
                }
            }
        }
    }
}

impl fmt::Display for CheckpointDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let CheckpointDetails { record, progress } = self;
        writeln!(f, "Last completed epoch: {}", record.epoch)?;
        writeln!(f, "Last loss: {:.4}", record.loss)?;
        writeln!(f, "Checkpoint time: {}", record.timestamp)?;
        writeln!(
            f,
            "Training progress: {:.1}% ({}/{} epochs)",
            progress.percent_complete, progress.completed_epochs, progress.total_epochs
        )?;
        writeln!(f, "Remaining epochs: {}", progress.remaining_epochs)
    }
}

impl fmt::Display for SavedModelSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SavedModelSection::NoDirectory { dir } => {
                writeln!(f, "No {}/ directory found", dir_name(dir))
            }
            SavedModelSection::Unreadable { dir, error } => {
                writeln!(f, "Warning: could not list {}: {error}", dir.display())
            }
            SavedModelSection::Empty { dir } => {
                writeln!(f, "{}/ directory exists but no models found", dir_name(dir))
            }
            SavedModelSection::Found { count, latest } => {
                writeln!(f, "Found {count} saved model(s)")?;
                writeln!(f, "Latest model: {}", latest.file_name)
            }
        }
    }
}

impl fmt::Display for DatasetSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSection::Found { path } => writeln!(f, "Dataset found at: {}", path.display()),
            DatasetSection::Missing { path } => {
                writeln!(f, "Warning: Dataset not found at expected location")?;
                writeln!(f, "  expected: {}", path.display())?;
                writeln!(f, "You may need to re-download the dataset")
            }
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "Training Session Status Check")?;
        writeln!(f, "{rule}")?;

        write!(f, "{}", self.checkpoints)?;
        if let CheckpointSection::Found { files, details, .. } = &self.checkpoints {
            if self.list_all {
                writeln!(f, "\nAll checkpoints (oldest first):")?;
                for file in files {
                    writeln!(
                        f,
                        "   {}  {:>10}  {}",
                        file.modified_display(),
                        format_size(file.size_bytes),
                        file.file_name
                    )?;
                }
            }
            if let Ok(details) = details {
                let progress = &details.progress;
                if progress.is_complete() {
                    writeln!(f, "\nTraining appears to be complete!")?;
                } else {
                    writeln!(f, "\nNext steps:")?;
                    writeln!(
                        f,
                        "   1. Re-run {} from the beginning",
                        self.resume_entry_point
                    )?;
                    writeln!(
                        f,
                        "   2. Training will automatically resume from epoch {}",
                        progress.resume_epoch()
                    )?;
                    writeln!(
                        f,
                        "   3. Estimated time: ~{:.1} hours remaining",
                        progress.estimated_hours_remaining
                    )?;
                }
            }
        }

        write!(f, "\n{}", self.saved_models)?;
        write!(f, "\n{}", self.dataset)?;

        writeln!(f, "\n{rule}")?;
        writeln!(
            f,
            "To resume training: Re-run {}",
            self.resume_entry_point
        )?;
        writeln!(
            f,
            "The training loop will automatically continue from where it left off!"
        )
    }
}
