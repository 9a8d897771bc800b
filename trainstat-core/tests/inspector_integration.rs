//! End-to-end inspection tests.
//!
//! Each test lays out a throwaway workspace the way the training loop would and
//! checks the report produced from it.

use pretty_assertions::assert_eq;
use safetensors::Dtype;
use safetensors::tensor::{TensorView, serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use trainstat_core::report::{CheckpointSection, DatasetSection, SavedModelSection};
use trainstat_core::{CheckpointRecord, InspectorConfig, StatusError, StatusInspector};

fn config_for(ws: &Path) -> InspectorConfig {
    InspectorConfig {
        dataset_path: ws.join("dataset"),
        ..InspectorConfig::default()
    }
}

fn set_mtime(path: &Path, secs: u64) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

/// Serialize a checkpoint holding an i64 epoch, an optional f32 loss, a timestamp,
/// and `weight_count` f32 weights.
fn checkpoint_bytes(epoch: i64, loss: Option<f32>, weight_count: usize) -> Vec<u8> {
    let epoch_bytes = epoch.to_le_bytes();
    let loss_bytes = loss.map(f32::to_le_bytes);
    let weights = vec![0u8; weight_count * 4];

    let mut views = vec![
        (
            "epoch".to_string(),
            TensorView::new(Dtype::I64, vec![], &epoch_bytes).unwrap(),
        ),
        (
            "model.weight".to_string(),
            TensorView::new(Dtype::F32, vec![weight_count], &weights).unwrap(),
        ),
    ];
    if let Some(bytes) = &loss_bytes {
        views.push((
            "loss".to_string(),
            TensorView::new(Dtype::F32, vec![], bytes).unwrap(),
        ));
    }
    let metadata = Some(HashMap::from([(
        "timestamp".to_string(),
        "2024-05-01 10:00:00".to_string(),
    )]));
    serialize(views.iter().map(|(n, v)| (n.clone(), v)), &metadata).unwrap()
}

fn write_checkpoint(dir: &Path, name: &str, epoch: i64, loss: Option<f32>, mtime: u64) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, checkpoint_bytes(epoch, loss, 4)).unwrap();
    set_mtime(&path, mtime);
    path
}

#[test]
fn test_no_checkpoint_directory() {
    let ws = TempDir::new().unwrap();
    let inspector = StatusInspector::new(ws.path().to_path_buf(), config_for(ws.path()));
    let report = inspector.inspect();

    assert!(matches!(report.checkpoints, CheckpointSection::NoDirectory { .. }));
    let text = report.to_string();
    assert!(text.contains("No checkpoints directory found"));
    assert!(text.contains("No saved_models/ directory found"));
    assert!(text.contains("Dataset not found"));
}

#[test]
fn test_empty_checkpoint_directory() {
    let ws = TempDir::new().unwrap();
    std::fs::create_dir(ws.path().join("checkpoints")).unwrap();
    std::fs::write(ws.path().join("checkpoints/readme.txt"), "not a checkpoint").unwrap();

    let report = StatusInspector::new(ws.path().to_path_buf(), config_for(ws.path())).inspect();
    assert!(matches!(report.checkpoints, CheckpointSection::Empty { .. }));
    assert!(report.to_string().contains("No checkpoints found"));
}

#[test]
fn test_latest_is_chosen_by_time_not_name() {
    let ws = TempDir::new().unwrap();
    let ckpt = ws.path().join("checkpoints");
    write_checkpoint(&ckpt, "checkpoint_epoch_3.safetensors", 3, Some(0.4), 1_000);
    write_checkpoint(&ckpt, "checkpoint_epoch_7.safetensors", 7, Some(0.2), 2_000);

    let report = StatusInspector::new(ws.path().to_path_buf(), config_for(ws.path())).inspect();
    match &report.checkpoints {
        CheckpointSection::Found { files, latest, .. } => {
            assert_eq!(files.len(), 2);
            assert_eq!(latest.file_name, "checkpoint_epoch_7.safetensors");
        }
        other => panic!("expected checkpoints, got {other:?}"),
    }

    // Touch epoch 3 so it becomes the newest file.
    set_mtime(&ckpt.join("checkpoint_epoch_3.safetensors"), 3_000);
    let report = StatusInspector::new(ws.path().to_path_buf(), config_for(ws.path())).inspect();
    assert!(
        report
            .to_string()
            .contains("Latest checkpoint: checkpoint_epoch_3.safetensors")
    );
}

#[test]
fn test_progress_figures() {
    let ws = TempDir::new().unwrap();
    write_checkpoint(
        &ws.path().join("checkpoints"),
        "checkpoint_epoch_9.safetensors",
        9,
        Some(0.1234),
        1_000,
    );

    let report = StatusInspector::new(ws.path().to_path_buf(), config_for(ws.path())).inspect();
    let progress = report.progress().expect("progress should be available");
    assert_eq!(progress.completed_epochs, 10);
    assert_eq!(progress.remaining_epochs, 40);
    assert!((progress.percent_complete - 20.0).abs() < 1e-9);
    assert!((progress.estimated_hours_remaining - 8.0).abs() < 1e-9);

    let text = report.to_string();
    assert!(text.contains("Last completed epoch: 9"));
    assert!(text.contains("Last loss: 0.1234"));
    assert!(text.contains("Checkpoint time: 2024-05-01 10:00:00"));
    assert!(text.contains("Training progress: 20.0% (10/50 epochs)"));
    assert!(text.contains("Remaining epochs: 40"));
    assert!(text.contains("~8.0 hours remaining"));
}

#[test]
fn test_missing_loss_defaults_to_zero() {
    let ws = TempDir::new().unwrap();
    write_checkpoint(
        &ws.path().join("checkpoints"),
        "checkpoint_epoch_4.safetensors",
        4,
        None,
        1_000,
    );

    let report = StatusInspector::new(ws.path().to_path_buf(), config_for(ws.path())).inspect();
    match &report.checkpoints {
        CheckpointSection::Found {
            details: Ok(details),
            ..
        } => assert_eq!(details.record.loss, 0.0),
        other => panic!("expected readable checkpoint, got {other:?}"),
    }
    assert!(report.to_string().contains("Last loss: 0.0000"));
}

#[test]
fn test_corrupt_checkpoint_does_not_block_other_sections() {
    let ws = TempDir::new().unwrap();
    let ckpt = ws.path().join("checkpoints");
    std::fs::create_dir(&ckpt).unwrap();
    std::fs::write(ckpt.join("checkpoint_epoch_2.safetensors"), b"\x05\x00garbage").unwrap();

    let models = ws.path().join("saved_models");
    write_checkpoint(&models, "final_model.safetensors", 49, Some(0.05), 5_000);
    std::fs::create_dir(ws.path().join("dataset")).unwrap();

    let report = StatusInspector::new(ws.path().to_path_buf(), config_for(ws.path())).inspect();
    match &report.checkpoints {
        CheckpointSection::Found { details: Err(e), .. } => {
            assert!(matches!(e, StatusError::SafeTensors(_)));
        }
        other => panic!("expected a decode failure, got {other:?}"),
    }
    assert!(matches!(
        report.saved_models,
        SavedModelSection::Found { count: 1, .. }
    ));
    assert!(matches!(report.dataset, DatasetSection::Found { .. }));

    let text = report.to_string();
    assert!(text.contains("Could not read checkpoint details: Invalid safetensors container"));
    assert!(text.contains("Found 1 saved model(s)"));
    assert!(text.contains("Latest model: final_model.safetensors"));
    assert!(text.contains("Dataset found at:"));
}

#[test]
fn test_final_epoch_reports_completion() {
    let ws = TempDir::new().unwrap();
    write_checkpoint(
        &ws.path().join("checkpoints"),
        "checkpoint_epoch_49.safetensors",
        49,
        Some(0.01),
        1_000,
    );

    let report = StatusInspector::new(ws.path().to_path_buf(), config_for(ws.path())).inspect();
    assert_eq!(report.progress().unwrap().remaining_epochs, 0);
    let text = report.to_string();
    assert!(text.contains("Training appears to be complete!"));
    assert!(!text.contains("Next steps:"));
}

#[test]
fn test_configured_layout_is_respected() {
    let ws = TempDir::new().unwrap();
    write_checkpoint(&ws.path().join("runs/ckpt"), "epoch_1.safetensors", 1, Some(0.3), 1_000);

    let config = InspectorConfig {
        checkpoint_dir: PathBuf::from("runs/ckpt"),
        checkpoint_pattern: "epoch_*.safetensors".into(),
        total_epochs: 4,
        hours_per_epoch: 1.5,
        ..config_for(ws.path())
    };
    let report = StatusInspector::new(ws.path().to_path_buf(), config)
        .with_listing(true)
        .inspect();

    let progress = report.progress().unwrap();
    assert_eq!(progress.remaining_epochs, 2);
    assert_eq!(progress.estimated_hours_remaining, 3.0);
    let text = report.to_string();
    assert!(text.contains("Training progress: 50.0% (2/4 epochs)"));
    assert!(text.contains("All checkpoints (oldest first):"));
}

#[test]
fn test_inspection_leaves_files_untouched() {
    let ws = TempDir::new().unwrap();
    let path = write_checkpoint(
        &ws.path().join("checkpoints"),
        "checkpoint_epoch_5.safetensors",
        5,
        Some(0.2),
        1_000,
    );
    let before = std::fs::read(&path).unwrap();
    let mtime_before = std::fs::metadata(&path).unwrap().modified().unwrap();

    let _ = StatusInspector::new(ws.path().to_path_buf(), config_for(ws.path())).inspect();

    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), mtime_before);
}

#[test]
fn test_checkpoint_rewritten_during_load() {
    let ws = TempDir::new().unwrap();
    let ckpt = ws.path().join("checkpoints");
    std::fs::create_dir(&ckpt).unwrap();
    let path = ckpt.join("checkpoint_epoch_8.safetensors");
    let bytes = checkpoint_bytes(8, Some(0.25), 1 << 20);
    std::fs::write(&path, &bytes).unwrap();

    let writing = AtomicBool::new(true);
    std::thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..50 {
                std::fs::write(&path, &bytes).unwrap();
            }
            writing.store(false, Ordering::SeqCst);
        });

        // Truncated reads may fail to decode; they must never bring the process down.
        while writing.load(Ordering::SeqCst) {
            if let Ok(record) = CheckpointRecord::load(&path) {
                assert_eq!(record.epoch, 8);
            }
        }
    });

    let record = CheckpointRecord::load(&path).unwrap();
    assert_eq!(record.epoch, 8);
    assert_eq!(record.loss, 0.25);
}

#[cfg(unix)]
#[test]
fn test_dangling_checkpoint_link_is_skipped() {
    let ws = TempDir::new().unwrap();
    let ckpt = ws.path().join("checkpoints");
    write_checkpoint(&ckpt, "checkpoint_epoch_7.safetensors", 7, Some(0.2), 1_000);
    std::os::unix::fs::symlink(
        ckpt.join("removed.safetensors"),
        ckpt.join("checkpoint_epoch_3.safetensors"),
    )
    .unwrap();

    let report = StatusInspector::new(ws.path().to_path_buf(), config_for(ws.path())).inspect();
    match &report.checkpoints {
        CheckpointSection::Found { files, latest, .. } => {
            assert_eq!(files.len(), 1);
            assert_eq!(latest.epoch, Some(7));
        }
        other => panic!("expected checkpoints, got {other:?}"),
    }
    assert!(report.to_string().contains("Last completed epoch: 7"));
}
