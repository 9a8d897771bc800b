//! Discovery of checkpoint and model files on disk.

use crate::error::StatusError;
use chrono::{DateTime, Local};
use globset::{GlobBuilder, GlobMatcher};
use std::cmp::Ordering;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// A file produced by the training loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub path: PathBuf,
    pub file_name: String,
    pub modified: SystemTime,
    pub size_bytes: u64,
    /// Epoch number embedded in the file name (`..._epoch_<N>...`), if any.
    pub epoch: Option<u64>,
}

impl ArtifactFile {
    pub fn modified_display(&self) -> String {
        DateTime::<Local>::from(self.modified)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    /// Ordering used to decide which file is the most recent.
    ///
    /// Modification time first, then the embedded epoch, then the file name, so
    /// the result never depends on directory iteration order.
    pub fn recency_cmp(&self, other: &Self) -> Ordering {
        self.modified
            .cmp(&other.modified)
            .then_with(|| self.epoch.cmp(&other.epoch))
            .then_with(|| self.file_name.cmp(&other.file_name))
    }
}

/// Extract `N` from names like `checkpoint_epoch_N.safetensors`.
pub fn epoch_from_file_name(file_name: &str) -> Option<u64> {
    let idx = file_name.rfind("epoch_")?;
    let digits: String = file_name[idx + "epoch_".len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher, StatusError> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

/// List regular files in `dir` whose names match `pattern`, oldest first.
///
/// Only metadata is read; file contents are never opened here.
pub fn scan(dir: &Path, pattern: &str) -> Result<Vec<ArtifactFile>, StatusError> {
    let matcher = compile_pattern(pattern)?;
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !matcher.is_match(&file_name) {
            continue;
        }

        let path = entry.path();
        // Deleted since listing, or a dangling symlink.
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Skipping vanished artifact");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        debug!(path = %path.display(), size = metadata.len(), "Matched artifact");
        files.push(ArtifactFile {
            epoch: epoch_from_file_name(&file_name),
            path,
            file_name,
            modified,
            size_bytes: metadata.len(),
        });
    }

    files.sort_by(ArtifactFile::recency_cmp);
    Ok(files)
}

/// The most recent file under [`ArtifactFile::recency_cmp`].
pub fn latest(files: &[ArtifactFile]) -> Option<&ArtifactFile> {
    files.iter().max_by(|a, b| a.recency_cmp(b))
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
