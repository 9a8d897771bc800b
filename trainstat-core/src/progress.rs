//! Progress estimation from the last completed epoch.

/// Derived progress figures for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSummary {
    pub total_epochs: u64,
    pub completed_epochs: u64,
    pub remaining_epochs: u64,
    pub percent_complete: f64,
    pub estimated_hours_remaining: f64,
}

impl ProgressSummary {
    /// `last_epoch` is zero-based, so epoch 9 means ten epochs are done.
    pub fn from_epoch(last_epoch: u64, total_epochs: u64, hours_per_epoch: f64) -> Self {
        let completed_epochs = last_epoch.saturating_add(1);
        let remaining_epochs = total_epochs.saturating_sub(completed_epochs);
        let percent_complete = if total_epochs == 0 {
            100.0
        } else {
            completed_epochs as f64 / total_epochs as f64 * 100.0
        };

        Self {
            total_epochs,
            completed_epochs,
            remaining_epochs,
            percent_complete,
            estimated_hours_remaining: remaining_epochs as f64 * hours_per_epoch,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.remaining_epochs == 0
    }

    /// Zero-based epoch the training loop resumes from.
    pub fn resume_epoch(&self) -> u64 {
        self.completed_epochs
    }
}
