use super::*;
use crate::logic::dataset::CropRecord;
use std::fs;
use std::sync::atomic::AtomicUsize;
use std::sync::mpsc as std_mpsc;
use tempfile::tempdir;

const CROPS: [&str; 4] = ["Wheat", "Rice", "Maize", "Barley"];

fn dataset(crops: &[&str]) -> Arc<Dataset> {
    let mut rows = Vec::new();
    for (c, crop) in crops.iter().enumerate() {
        for i in 0..12 {
            let f = i as f64;
            let base = c as f64;
            rows.push(CropRecord::new(crop, 70.0 + f * 4.0 + base, 20.0 + f * 0.5, 6.0 + base * 0.1, 2.0 + base + f * 0.1));
        }
    }
    Arc::new(Dataset::from_records(rows).unwrap())
}

fn drain(handle: &mut BatchHandle) -> Vec<BatchEvent> {
    let mut events = Vec::new();
    while let Some(event) = handle.next_event() {
        events.push(event);
    }
    events
}

#[test]
fn test_train_all_creates_every_artifact() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(ModelRegistry::new(dir.path()));
    let coordinator = BatchCoordinator::new(Arc::clone(&registry));
    let dataset = dataset(&CROPS[..3]);

    let mut handle = coordinator.start(ModelFamily::DecisionTree, Arc::clone(&dataset)).unwrap();
    let events = drain(&mut handle);
    assert_eq!(handle.wait(), JobState::Completed);

    assert_eq!(events.len(), 4);
    let fractions: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::Progress { fraction, outcome, .. } => {
                assert_eq!(*outcome, ItemOutcome::Trained);
                Some(*fraction)
            }
            _ => None,
        })
        .collect();
    assert_eq!(fractions, vec![1.0 / 3.0, 2.0 / 3.0, 1.0]);
    assert_eq!(events[3], BatchEvent::Completed { trained: 3, skipped: 0 });

    for crop in dataset.crop_types() {
        assert!(registry.exists(ModelFamily::DecisionTree, crop));
    }
    assert_eq!(coordinator.state(), JobState::Completed);

    let report = coordinator.last_report().unwrap();
    assert_eq!(report.state, JobState::Completed);
    assert_eq!((report.total, report.trained, report.skipped), (3, 3, 0));
    assert!(report.error.is_none());
}

#[test]
fn test_progress_follows_first_seen_order() {
    let dir = tempdir().unwrap();
    let coordinator = BatchCoordinator::new(Arc::new(ModelRegistry::new(dir.path())));

    let mut handle = coordinator.start(ModelFamily::DecisionTree, dataset(&CROPS)).unwrap();
    let crops: Vec<String> = drain(&mut handle)
        .into_iter()
        .filter_map(|e| match e {
            BatchEvent::Progress { crop_type, .. } => Some(crop_type),
            _ => None,
        })
        .collect();

    assert_eq!(crops, CROPS.iter().map(|c| c.to_string()).collect::<Vec<_>>());
}

#[test]
fn test_existing_artifacts_are_skipped() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(ModelRegistry::new(dir.path()));
    let dataset = dataset(&CROPS[..3]);

    let rice = dataset.slice("Rice");
    let model = Trainer::new().train(ModelFamily::DecisionTree, &rice).unwrap();
    registry.save(ModelFamily::DecisionTree, "Rice", &model, rice.len()).unwrap();

    let coordinator = BatchCoordinator::new(Arc::clone(&registry));
    let mut handle = coordinator.start(ModelFamily::DecisionTree, dataset).unwrap();
    let events = drain(&mut handle);
    handle.wait();

    assert!(matches!(
        &events[1],
        BatchEvent::Progress { crop_type, outcome: ItemOutcome::Skipped, .. } if crop_type == "Rice"
    ));
    assert_eq!(events.last(), Some(&BatchEvent::Completed { trained: 2, skipped: 1 }));
    // Untouched
    assert_eq!(registry.load(ModelFamily::DecisionTree, "Rice").unwrap(), model);
}

#[test]
fn test_cancel_after_n_keeps_n_artifacts() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(ModelRegistry::new(dir.path()));
    let coordinator = Arc::new(BatchCoordinator::new(Arc::clone(&registry)));

    let seen = Arc::new(AtomicUsize::new(0));
    let observer = {
        let coordinator = Arc::clone(&coordinator);
        let seen = Arc::clone(&seen);
        move |event: &BatchEvent| {
            if let BatchEvent::Progress { .. } = event {
                if seen.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                    assert!(coordinator.cancel());
                }
            }
        }
    };

    let mut handle = coordinator
        .start_observed(ModelFamily::DecisionTree, dataset(&CROPS), observer)
        .unwrap();
    let events = drain(&mut handle);
    assert_eq!(handle.wait(), JobState::Cancelled);

    assert_eq!(events.len(), 3);
    assert_eq!(events[2], BatchEvent::Cancelled { processed: 2 });
    assert!(!events.iter().any(|e| matches!(e, BatchEvent::Completed { .. })));

    assert_eq!(registry.list().unwrap().len(), 2);
    assert!(registry.exists(ModelFamily::DecisionTree, "Wheat"));
    assert!(registry.exists(ModelFamily::DecisionTree, "Rice"));
    assert_eq!(coordinator.state(), JobState::Cancelled);
    assert!(!coordinator.is_running());
}

#[test]
fn test_cancel_through_handle() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(ModelRegistry::new(dir.path()));
    let coordinator = BatchCoordinator::new(Arc::clone(&registry));
    let (entered_tx, entered_rx) = std_mpsc::channel::<()>();
    let (release_tx, release_rx) = std_mpsc::channel::<()>();

    // Hold the worker on its first event, then cancel through the handle
    let mut handle = coordinator
        .start_observed(ModelFamily::DecisionTree, dataset(&CROPS[..2]), move |_| {
            let _ = entered_tx.send(());
            let _ = release_rx.recv();
        })
        .unwrap();
    entered_rx.recv().unwrap();
    handle.cancel();
    drop(release_tx);

    let events = drain(&mut handle);
    assert_eq!(handle.wait(), JobState::Cancelled);
    // First crop finished before the token flipped
    assert_eq!(events.last(), Some(&BatchEvent::Cancelled { processed: 1 }));
    assert_eq!(registry.list().unwrap().len(), 1);
}

#[test]
fn test_second_start_is_already_running() {
    let dir = tempdir().unwrap();
    let coordinator = BatchCoordinator::new(Arc::new(ModelRegistry::new(dir.path())));
    let dataset = dataset(&CROPS[..2]);
    let (release_tx, release_rx) = std_mpsc::channel::<()>();

    let handle = coordinator
        .start_observed(ModelFamily::DecisionTree, Arc::clone(&dataset), move |_| {
            let _ = release_rx.recv();
        })
        .unwrap();
    assert!(coordinator.is_running());

    match coordinator.start(ModelFamily::RandomForest, Arc::clone(&dataset)) {
        Err(CoreError::AlreadyRunning) => {}
        Ok(_) => panic!("Expected AlreadyRunning"),
        Err(e) => panic!("Expected AlreadyRunning, got {}", e),
    }

    drop(release_tx);
    assert_eq!(handle.wait(), JobState::Completed);

    // Startable again once finished; everything is cached now
    let mut again = coordinator.start(ModelFamily::DecisionTree, dataset).unwrap();
    let events = drain(&mut again);
    assert_eq!(again.wait(), JobState::Completed);
    assert_eq!(events.last(), Some(&BatchEvent::Completed { trained: 0, skipped: 2 }));
}

#[test]
fn test_storage_failure_marks_job_failed() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "occupied").unwrap();
    let coordinator = BatchCoordinator::new(Arc::new(ModelRegistry::new(&blocker)));

    let mut handle = coordinator.start(ModelFamily::DecisionTree, dataset(&CROPS[..2])).unwrap();
    let events = drain(&mut handle);
    assert_eq!(handle.wait(), JobState::Failed);

    match events.last() {
        Some(BatchEvent::Failed { crop_type, message }) => {
            assert_eq!(crop_type, "Wheat");
            assert!(message.starts_with("Storage error"));
        }
        other => panic!("Expected Failed event, got {:?}", other),
    }
    assert_eq!(coordinator.state(), JobState::Failed);
    assert!(coordinator.last_report().unwrap().error.is_some());
}

#[test]
fn test_cancel_without_job_is_noop() {
    let dir = tempdir().unwrap();
    let coordinator = BatchCoordinator::new(Arc::new(ModelRegistry::new(dir.path())));
    assert_eq!(coordinator.state(), JobState::Idle);
    assert!(!coordinator.cancel());
    assert!(coordinator.last_report().is_none());
}

#[test]
fn test_event_names_and_payloads() {
    let progress = BatchEvent::progress(0, 3, "Wheat", ItemOutcome::Trained);
    assert_eq!(progress.name(), events::names::PROGRESS);
    assert_eq!(progress.percent(), Some(33));
    assert!(!progress.is_terminal());

    let json = serde_json::to_value(&progress).unwrap();
    assert_eq!(json["type"], "progress");
    assert_eq!(json["outcome"], "trained");
    assert_eq!(json["crop_type"], "Wheat");

    let done = BatchEvent::Completed { trained: 3, skipped: 0 };
    assert_eq!(done.name(), "training:completed");
    assert!(done.is_terminal());
    assert_eq!(done.percent(), None);
}

#[test]
fn test_panicking_observer_fails_job_and_frees_coordinator() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(ModelRegistry::new(dir.path()));
    let coordinator = BatchCoordinator::new(Arc::clone(&registry));
    let dataset = dataset(&CROPS[..3]);

    let mut handle = coordinator
        .start_observed(ModelFamily::DecisionTree, Arc::clone(&dataset), |_| panic!("observer boom"))
        .unwrap();
    let events = drain(&mut handle);
    assert_eq!(handle.wait(), JobState::Failed);

    assert_eq!(coordinator.state(), JobState::Failed);
    assert!(!coordinator.is_running());
    match events.last() {
        Some(BatchEvent::Failed { crop_type, message }) => {
            assert_eq!(crop_type, "Wheat");
            assert!(message.contains("observer"), "{}", message);
        }
        other => panic!("Expected Failed event, got {:?}", other),
    }
    assert_eq!(coordinator.last_report().unwrap().trained, 1);

    // Startable again; the crop trained before the panic is kept
    let mut again = coordinator.start(ModelFamily::DecisionTree, dataset).unwrap();
    let events = drain(&mut again);
    assert_eq!(again.wait(), JobState::Completed);
    assert_eq!(events.last(), Some(&BatchEvent::Completed { trained: 2, skipped: 1 }));
}

#[test]
fn test_cancellation_token_is_shared_with_handle() {
    let dir = tempdir().unwrap();
    let coordinator = BatchCoordinator::new(Arc::new(ModelRegistry::new(dir.path())));
    let (entered_tx, entered_rx) = std_mpsc::channel::<()>();
    let (release_tx, release_rx) = std_mpsc::channel::<()>();

    let mut handle = coordinator
        .start_observed(ModelFamily::DecisionTree, dataset(&CROPS[..3]), move |_| {
            let _ = entered_tx.send(());
            let _ = release_rx.recv();
        })
        .unwrap();
    entered_rx.recv().unwrap();

    let token = handle.cancellation_token();
    assert!(!token.is_cancelled());
    token.cancel();
    drop(release_tx);

    let mut events: Vec<BatchEvent> = Vec::new();
    while !events.last().map_or(false, BatchEvent::is_terminal) {
        match handle.try_next_event() {
            Some(event) => events.push(event),
            None => thread::yield_now(),
        }
    }
    assert_eq!(events.last(), Some(&BatchEvent::Cancelled { processed: 1 }));
    assert_eq!(handle.wait(), JobState::Cancelled);
}

#[tokio::test]
async fn test_events_consumable_from_async_code() {
    let dir = tempdir().unwrap();
    let coordinator = BatchCoordinator::new(Arc::new(ModelRegistry::new(dir.path())));

    let mut handle = coordinator.start(ModelFamily::DecisionTree, dataset(&CROPS[..2])).unwrap();
    let mut names = Vec::new();
    while let Some(event) = handle.recv_event().await {
        names.push(event.name());
    }

    assert_eq!(names, vec!["training:progress", "training:progress", "training:completed"]);
    assert_eq!(coordinator.state(), JobState::Completed);
}
