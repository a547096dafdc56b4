//! Integration tests for the file watcher
//!
//! These tests use temporary directories and real filesystem operations
//! to validate the watcher's behavior in realistic scenarios.

use dirflow_watcher::{
    FileEvent, FileOperation, FileWatcher, RuleBuilder, WatcherBuilder, WatcherCompositor,
    WatcherSettings,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Helper to create a test file
async fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    tokio::fs::write(&path, content).await.expect("test setup failed");
    path
}

/// Rule builder whose single step forwards every matched event
fn forwarding(
    rule: RuleBuilder,
    tx: mpsc::UnboundedSender<FileEvent>,
) -> RuleBuilder {
    rule.add_step(move |event: FileEvent| {
        let _ = tx.send(event);
        async { Ok(()) }
    })
}

/// Wait for the first forwarded event for `name`, skipping everything else
async fn next_for(rx: &mut mpsc::UnboundedReceiver<FileEvent>, name: &str) -> FileEvent {
    timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("channel closed");
            if event.file_name() == name {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

async fn start(builder: WatcherBuilder) -> FileWatcher {
    let watcher = builder.start().await.expect("test setup failed");
    // Wait a bit for watcher to stabilize
    tokio::time::sleep(Duration::from_millis(150)).await;
    watcher
}

#[tokio::test]
async fn test_file_creation_detection() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _watcher = start(
        WatcherBuilder::new(temp_dir.path())
            .when_created(|r| forwarding(r.filter("*.rs"), tx)),
    )
    .await;

    let test_file = create_test_file(temp_dir.path(), "main.rs", "fn main() {}").await;

    let event = next_for(&mut rx, "main.rs").await;
    assert_eq!(event.operation(), FileOperation::Created);
    assert_eq!(
        event.path().file_name(),
        test_file.file_name()
    );
}

#[tokio::test]
async fn test_file_modification_detection() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let test_file = create_test_file(temp_dir.path(), "notes.txt", "one").await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _watcher = start(
        WatcherBuilder::new(temp_dir.path())
            .when_changed(|r| forwarding(r.filter("*.txt"), tx)),
    )
    .await;

    tokio::fs::write(&test_file, "two").await.expect("test setup failed");

    let event = next_for(&mut rx, "notes.txt").await;
    assert_eq!(event.operation(), FileOperation::Changed);
}

#[tokio::test]
async fn test_file_deletion_detection() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let test_file = create_test_file(temp_dir.path(), "old.log", "bye").await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _watcher = start(
        WatcherBuilder::new(temp_dir.path())
            .when_deleted(|r| forwarding(r.filter("*.log"), tx)),
    )
    .await;

    tokio::fs::remove_file(&test_file).await.expect("test setup failed");

    let event = next_for(&mut rx, "old.log").await;
    assert_eq!(event.operation(), FileOperation::Deleted);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_rename_carries_both_paths() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let original = create_test_file(temp_dir.path(), "draft.md", "text").await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _watcher = start(
        WatcherBuilder::new(temp_dir.path())
            .when_renamed(|r| forwarding(r.filter("*.md"), tx)),
    )
    .await;

    let renamed = temp_dir.path().join("final.md");
    tokio::fs::rename(&original, &renamed)
        .await
        .expect("test setup failed");

    let event = next_for(&mut rx, "final.md").await;
    assert_eq!(event.operation(), FileOperation::Renamed);
    assert_eq!(
        event.previous_path().and_then(Path::file_name),
        original.file_name()
    );
}

#[tokio::test]
async fn test_file_moved_in_from_outside_is_created() {
    let watched = TempDir::new().expect("test setup failed");
    let outside = TempDir::new().expect("test setup failed");
    let source = create_test_file(outside.path(), "incoming.txt", "payload").await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _watcher = start(
        WatcherBuilder::new(watched.path())
            .when_created(|r| forwarding(r.filter("*.txt"), tx)),
    )
    .await;

    tokio::fs::rename(&source, watched.path().join("incoming.txt"))
        .await
        .expect("test setup failed");

    let event = next_for(&mut rx, "incoming.txt").await;
    assert_eq!(event.operation(), FileOperation::Created);
    assert!(event.path().ends_with("incoming.txt"));
}

#[tokio::test]
async fn test_file_moved_out_is_deleted() {
    let watched = TempDir::new().expect("test setup failed");
    let outside = TempDir::new().expect("test setup failed");
    let leaving = create_test_file(watched.path(), "leaving.txt", "payload").await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _watcher = start(
        WatcherBuilder::new(watched.path())
            .when_deleted(|r| forwarding(r.filter("*.txt"), tx)),
    )
    .await;

    tokio::fs::rename(&leaving, outside.path().join("leaving.txt"))
        .await
        .expect("test setup failed");

    let event = next_for(&mut rx, "leaving.txt").await;
    assert_eq!(event.operation(), FileOperation::Deleted);
    assert_eq!(event.path().file_name(), leaving.file_name());
}

#[tokio::test]
async fn test_non_ascii_names_match_case_insensitively() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _watcher = start(
        WatcherBuilder::new(temp_dir.path())
            .when_created(|r| forwarding(r.filter("RÉSUMÉ*.PDF"), tx)),
    )
    .await;

    create_test_file(temp_dir.path(), "résumé-2024.pdf", "pdf").await;

    let event = next_for(&mut rx, "résumé-2024.pdf").await;
    assert_eq!(event.operation(), FileOperation::Created);
}

#[tokio::test]
async fn test_non_matching_files_are_ignored() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _watcher = start(
        WatcherBuilder::new(temp_dir.path())
            .when_created(|r| forwarding(r.filter("*.txt").filter("*.csv").use_or_logic(), tx)),
    )
    .await;

    create_test_file(temp_dir.path(), "image.png", "png").await;
    create_test_file(temp_dir.path(), "report.csv", "a,b").await;

    let event = next_for(&mut rx, "report.csv").await;
    assert_eq!(event.operation(), FileOperation::Created);

    tokio::time::sleep(Duration::from_millis(200)).await;
    while let Ok(event) = rx.try_recv() {
        assert_ne!(event.file_name(), "image.png");
    }
}

#[tokio::test]
async fn test_subdirectories_are_watched() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let nested = temp_dir.path().join("nested");
    tokio::fs::create_dir(&nested).await.expect("test setup failed");
    let (tx, mut rx) = mpsc::unbounded_channel();

    let _watcher = start(
        WatcherBuilder::new(temp_dir.path())
            .when_created(|r| forwarding(r.filter("*.txt"), tx)),
    )
    .await;

    create_test_file(&nested, "deep.txt", "x").await;

    let event = next_for(&mut rx, "deep.txt").await;
    assert!(event.path().ends_with("nested/deep.txt"));
}

#[tokio::test]
async fn test_stopped_watcher_dispatches_nothing() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut watcher = start(
        WatcherBuilder::new(temp_dir.path())
            .when_created(|r| forwarding(r.filter("*"), tx)),
    )
    .await;
    watcher.stop().expect("stop failed");

    create_test_file(temp_dir.path(), "late.txt", "x").await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_compositor_watches_each_directory() {
    let first = TempDir::new().expect("test setup failed");
    let second = TempDir::new().expect("test setup failed");
    let (first_tx, mut first_rx) = mpsc::unbounded_channel();
    let (second_tx, mut second_rx) = mpsc::unbounded_channel();

    let mut compositor = WatcherCompositor::with_settings(WatcherSettings::default());
    compositor
        .for_path(first.path(), |w| {
            w.when_created(|r| forwarding(r.filter("*.txt"), first_tx))
        })
        .expect("test setup failed")
        .for_path(second.path(), |w| {
            w.when_created(|r| forwarding(r.filter("*.csv"), second_tx))
        })
        .expect("test setup failed");

    let watchers = compositor.compose().await.expect("compose failed");
    assert_eq!(watchers.len(), 2);
    assert!(watchers.iter().all(FileWatcher::is_running));
    tokio::time::sleep(Duration::from_millis(150)).await;

    create_test_file(first.path(), "a.txt", "x").await;
    create_test_file(second.path(), "b.csv", "x").await;

    assert_eq!(next_for(&mut first_rx, "a.txt").await.operation(), FileOperation::Created);
    assert_eq!(next_for(&mut second_rx, "b.csv").await.operation(), FileOperation::Created);
}
