use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use notion_publish::contract::{
    ContentBlock, Entry, MockDocumentStore, MockSourceStore, MockVersionControl, Status, TextRun,
};
use notion_publish::storage::FsDocumentStore;
use notion_publish::synchronise::{Outcome, PushOutcome, Synchroniser};
use notion_publish::SyncError;
use tempfile::tempdir;

fn entry(id: &str, slug: &str) -> Entry {
    Entry {
        id: id.into(),
        title: Some(format!("Title {id}")),
        description: Some("description".into()),
        category: Some("Rust".into()),
        slug: Some(slug.into()),
        tags: vec![],
        published_at: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        status: Status::ReadyToPublish,
    }
}

fn ready_source(entries: Vec<Entry>) -> MockSourceStore {
    let mut source = MockSourceStore::new();
    source
        .expect_query()
        .withf(|status| *status == Status::ReadyToPublish)
        .times(1)
        .returning(move |_| Ok(entries.clone()));
    source
        .expect_fetch_blocks()
        .returning(|_| Ok(vec![ContentBlock::Paragraph(vec![TextRun::plain("body")])]));
    source
}

fn recording_store(written: Arc<Mutex<Vec<String>>>) -> MockDocumentStore {
    let mut store = MockDocumentStore::new();
    store.expect_write().returning(move |name, _content| {
        written.lock().unwrap().push(name.to_string());
        Ok(PathBuf::from("/repo/posts").join(name))
    });
    store
}

fn committing_vcs(messages: Arc<Mutex<Vec<String>>>, commits: usize) -> MockVersionControl {
    let mut vcs = MockVersionControl::new();
    vcs.expect_stage().times(commits).returning(|_| Ok(()));
    vcs.expect_has_staged_changes()
        .times(commits)
        .returning(|_| Ok(true));
    vcs.expect_commit()
        .withf(|path, message| {
            let file = path.file_name().unwrap().to_string_lossy();
            *message == format!("Posted {file}")
        })
        .times(commits)
        .returning(move |_, message| {
            messages.lock().unwrap().push(message.to_string());
            Ok(())
        });
    vcs
}

#[tokio::test]
async fn test_run_once_publishes_every_ready_entry() {
    let mut source = ready_source(vec![entry("a", "first"), entry("b", "second")]);
    let acknowledged = Arc::new(Mutex::new(Vec::new()));
    let acked = acknowledged.clone();
    source
        .expect_set_status()
        .withf(|_, status| *status == Status::Published)
        .times(2)
        .returning(move |id, _| {
            acked.lock().unwrap().push(id.to_string());
            Ok(())
        });

    let messages = Arc::new(Mutex::new(Vec::new()));
    let mut vcs = committing_vcs(messages.clone(), 2);
    vcs.expect_push().times(1).returning(|| Ok(()));

    let written = Arc::new(Mutex::new(Vec::new()));
    let sync = Synchroniser::new(source, vcs, recording_store(written.clone()));

    let report = sync.run_once().await.expect("cycle should succeed");

    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.entries[0].entry_id, "a");
    assert_eq!(report.entries[0].file_name.as_deref(), Some("first.md"));
    assert_eq!(report.entries[1].entry_id, "b");
    for e in &report.entries {
        assert_eq!(e.outcome, Outcome::Success { committed: true });
    }
    assert_eq!(report.push, PushOutcome::Pushed);
    assert_eq!(*written.lock().unwrap(), vec!["first.md", "second.md"]);
    assert_eq!(
        *messages.lock().unwrap(),
        vec!["Posted first.md", "Posted second.md"]
    );
    assert_eq!(*acknowledged.lock().unwrap(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_malformed_entry_is_isolated_and_only_one_file_written() {
    let out = tempdir().unwrap();
    let mut malformed = entry("b", "broken");
    malformed.title = None;

    let mut source = ready_source(vec![entry("a", "good"), malformed]);
    source
        .expect_set_status()
        .withf(|id, status| id == "a" && *status == Status::Published)
        .times(1)
        .returning(|_, _| Ok(()));

    let messages = Arc::new(Mutex::new(Vec::new()));
    let mut vcs = committing_vcs(messages, 1);
    vcs.expect_push().times(1).returning(|| Ok(()));

    let sync = Synchroniser::new(source, vcs, FsDocumentStore::new(out.path()));
    let report = sync.run_once().await.expect("cycle should succeed");

    assert_eq!(report.succeeded().count(), 1);
    assert_eq!(report.failed().count(), 1);
    assert_eq!(report.entries[0].outcome, Outcome::Success { committed: true });
    assert_eq!(
        report.entries[1].outcome,
        Outcome::Failed(SyncError::MalformedEntry {
            entry_id: "b".into(),
            field: "title",
        })
    );

    let files: Vec<_> = std::fs::read_dir(out.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(files, vec!["good.md"]);
    let content = std::fs::read_to_string(out.path().join("good.md")).unwrap();
    assert!(content.starts_with("---\ntitle: \"Title a\"\ndate: \"2024-03-01\"\n"));
    assert!(content.contains("\nbody \n"));
}

#[tokio::test]
async fn test_empty_query_ends_cycle_without_work() {
    let mut source = MockSourceStore::new();
    source.expect_query().times(1).returning(|_| Ok(vec![]));
    source.expect_fetch_blocks().never();
    source.expect_set_status().never();

    let mut vcs = MockVersionControl::new();
    vcs.expect_push().never();
    let mut store = MockDocumentStore::new();
    store.expect_write().never();

    let sync = Synchroniser::new(source, vcs, store);
    let report = sync.run_once().await.unwrap();

    assert!(report.is_empty());
    assert_eq!(report.push, PushOutcome::NotNeeded);
}

#[tokio::test]
async fn test_second_run_without_new_entries_writes_nothing() {
    // Store that really moves entries from ready to published.
    let ready = Arc::new(Mutex::new(vec![entry("a", "once")]));
    let mut source = MockSourceStore::new();
    let ready_q = ready.clone();
    source
        .expect_query()
        .times(2)
        .returning(move |_| Ok(ready_q.lock().unwrap().clone()));
    source
        .expect_fetch_blocks()
        .times(1)
        .returning(|_| Ok(vec![ContentBlock::Heading1(vec![TextRun::plain("Once")])]));
    let ready_ack = ready.clone();
    source.expect_set_status().times(1).returning(move |id, _| {
        ready_ack.lock().unwrap().retain(|e| e.id != id);
        Ok(())
    });

    let mut vcs = committing_vcs(Arc::new(Mutex::new(Vec::new())), 1);
    vcs.expect_push().times(1).returning(|| Ok(()));

    let written = Arc::new(Mutex::new(Vec::new()));
    let sync = Synchroniser::new(source, vcs, recording_store(written.clone()));

    let first = sync.run_once().await.unwrap();
    assert_eq!(first.succeeded().count(), 1);

    let second = sync.run_once().await.unwrap();
    assert!(second.is_empty());
    assert_eq!(written.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_query_failure_aborts_cycle() {
    let mut source = MockSourceStore::new();
    source
        .expect_query()
        .returning(|_| Err("connection refused".into()));
    source.expect_fetch_blocks().never();

    let mut store = MockDocumentStore::new();
    store.expect_write().never();

    let sync = Synchroniser::new(source, MockVersionControl::new(), store);
    let err = sync.run_once().await.unwrap_err();

    match err {
        SyncError::SourceQueryFailed(reason) => assert!(reason.contains("connection refused")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_blocks_failure_skips_entry() {
    let mut source = MockSourceStore::new();
    source
        .expect_query()
        .returning(|_| Ok(vec![entry("a", "ok"), entry("b", "unreachable")]));
    source.expect_fetch_blocks().returning(|id| {
        if id == "b" {
            Err("timeout".into())
        } else {
            Ok(vec![])
        }
    });
    source
        .expect_set_status()
        .withf(|id, _| id == "a")
        .times(1)
        .returning(|_, _| Ok(()));

    let mut vcs = committing_vcs(Arc::new(Mutex::new(Vec::new())), 1);
    vcs.expect_push().times(1).returning(|| Ok(()));
    let written = Arc::new(Mutex::new(Vec::new()));

    let sync = Synchroniser::new(source, vcs, recording_store(written.clone()));
    let report = sync.run_once().await.unwrap();

    assert!(matches!(
        &report.entries[1].outcome,
        Outcome::Failed(SyncError::FetchBlocksFailed { entry_id, .. }) if entry_id == "b"
    ));
    assert_eq!(*written.lock().unwrap(), vec!["ok.md"]);
}

#[tokio::test]
async fn test_persist_failure_stops_entry_before_commit() {
    let mut source = ready_source(vec![entry("a", "full-disk"), entry("b", "fine")]);
    source
        .expect_set_status()
        .withf(|id, _| id == "b")
        .times(1)
        .returning(|_, _| Ok(()));

    let mut store = MockDocumentStore::new();
    store.expect_write().returning(|name, _| {
        if name == "full-disk.md" {
            Err("no space left on device".into())
        } else {
            Ok(PathBuf::from("/repo/posts").join(name))
        }
    });

    let mut vcs = MockVersionControl::new();
    vcs.expect_stage()
        .withf(|path| path.ends_with("fine.md"))
        .times(1)
        .returning(|_| Ok(()));
    vcs.expect_has_staged_changes().returning(|_| Ok(true));
    vcs.expect_commit().times(1).returning(|_, _| Ok(()));
    vcs.expect_push().times(1).returning(|| Ok(()));

    let sync = Synchroniser::new(source, vcs, store);
    let report = sync.run_once().await.unwrap();

    assert!(matches!(
        &report.entries[0].outcome,
        Outcome::Failed(SyncError::PersistFailed { entry_id, reason })
            if entry_id == "a" && reason.contains("no space")
    ));
    assert_eq!(report.entries[1].outcome, Outcome::Success { committed: true });
}

#[tokio::test]
async fn test_commit_failure_leaves_entry_unacknowledged() {
    let mut source = ready_source(vec![entry("a", "conflict"), entry("b", "fine")]);
    source
        .expect_set_status()
        .withf(|id, _| id == "b")
        .times(1)
        .returning(|_, _| Ok(()));

    let mut vcs = MockVersionControl::new();
    vcs.expect_stage().times(2).returning(|_| Ok(()));
    vcs.expect_has_staged_changes().returning(|_| Ok(true));
    vcs.expect_commit().times(2).returning(|_, message| {
        if message == "Posted conflict.md" {
            Err("index.lock exists".into())
        } else {
            Ok(())
        }
    });
    vcs.expect_push().times(1).returning(|| Ok(()));

    let sync = Synchroniser::new(
        source,
        vcs,
        recording_store(Arc::new(Mutex::new(Vec::new()))),
    );
    let report = sync.run_once().await.unwrap();

    assert!(matches!(
        &report.entries[0].outcome,
        Outcome::Failed(SyncError::CommitFailed { entry_id, .. }) if entry_id == "a"
    ));
    assert_eq!(report.entries[1].outcome, Outcome::Success { committed: true });
    assert_eq!(report.push, PushOutcome::Pushed);
}

#[tokio::test]
async fn test_no_successful_commit_means_no_push() {
    let mut source = ready_source(vec![entry("a", "one")]);
    source.expect_set_status().never();

    let mut vcs = MockVersionControl::new();
    vcs.expect_stage()
        .returning(|_| Err("not a git repository".into()));
    vcs.expect_commit().never();
    vcs.expect_push().never();

    let sync = Synchroniser::new(
        source,
        vcs,
        recording_store(Arc::new(Mutex::new(Vec::new()))),
    );
    let report = sync.run_once().await.unwrap();

    assert_eq!(report.failed().count(), 1);
    assert_eq!(report.push, PushOutcome::NotNeeded);
}

#[tokio::test]
async fn test_acknowledge_failure_is_recorded_after_commit() {
    let mut source = ready_source(vec![entry("a", "one")]);
    source
        .expect_set_status()
        .times(1)
        .returning(|_, _| Err("rate limited".into()));

    let mut vcs = committing_vcs(Arc::new(Mutex::new(Vec::new())), 1);
    vcs.expect_push().times(1).returning(|| Ok(()));

    let sync = Synchroniser::new(
        source,
        vcs,
        recording_store(Arc::new(Mutex::new(Vec::new()))),
    );
    let report = sync.run_once().await.unwrap();

    assert!(matches!(
        &report.entries[0].outcome,
        Outcome::Failed(SyncError::AcknowledgeFailed { entry_id, reason })
            if entry_id == "a" && reason.contains("rate limited")
    ));
    assert_eq!(report.push, PushOutcome::Pushed);
}

#[tokio::test]
async fn test_push_failure_is_reported_but_entries_are_acknowledged() {
    let mut source = ready_source(vec![entry("a", "one")]);
    source
        .expect_set_status()
        .times(1)
        .returning(|_, _| Ok(()));

    let mut vcs = committing_vcs(Arc::new(Mutex::new(Vec::new())), 1);
    vcs.expect_push()
        .times(1)
        .returning(|| Err("remote rejected".into()));

    let sync = Synchroniser::new(
        source,
        vcs,
        recording_store(Arc::new(Mutex::new(Vec::new()))),
    );
    let report = sync.run_once().await.expect("push failure is not fatal");

    assert_eq!(report.entries[0].outcome, Outcome::Success { committed: true });
    assert!(matches!(report.push, PushOutcome::Failed(SyncError::PushFailed(ref r)) if r.contains("remote rejected")));
}

#[tokio::test]
async fn test_unchanged_document_skips_commit_and_is_acknowledged() {
    let mut source = ready_source(vec![entry("a", "same")]);
    source
        .expect_set_status()
        .times(1)
        .returning(|_, _| Ok(()));

    let mut vcs = MockVersionControl::new();
    vcs.expect_stage().times(1).returning(|_| Ok(()));
    vcs.expect_has_staged_changes()
        .times(1)
        .returning(|_| Ok(false));
    vcs.expect_commit().never();
    vcs.expect_push().never();

    let sync = Synchroniser::new(
        source,
        vcs,
        recording_store(Arc::new(Mutex::new(Vec::new()))),
    );
    let report = sync.run_once().await.unwrap();

    assert_eq!(report.entries[0].outcome, Outcome::Success { committed: false });
    assert_eq!(report.push, PushOutcome::NotNeeded);
}

#[tokio::test]
async fn test_reconcile_reports_drift_both_ways() {
    let out = tempdir().unwrap();
    for name in ["acked.md", "orphan.md", "notes.txt"] {
        std::fs::write(out.path().join(name), "x").unwrap();
    }

    let mut source = MockSourceStore::new();
    source
        .expect_query()
        .withf(|status| *status == Status::Published)
        .times(1)
        .returning(|_| {
            let mut acked = entry("a", "acked");
            acked.status = Status::Published;
            let mut lost = entry("b", "lost");
            lost.status = Status::Published;
            Ok(vec![acked, lost])
        });

    let sync = Synchroniser::new(source, MockVersionControl::new(), FsDocumentStore::new(out.path()));
    let drift = sync.reconcile().await.unwrap();

    assert_eq!(drift.unacknowledged, vec!["orphan.md"]);
    assert_eq!(drift.missing_files, vec!["lost.md"]);
    assert!(!drift.is_clean());
}

#[tokio::test]
async fn test_reconcile_clean_when_in_step() {
    let mut source = MockSourceStore::new();
    source.expect_query().returning(|_| Ok(vec![entry("a", "post")]));
    let mut store = MockDocumentStore::new();
    store
        .expect_list()
        .returning(|| Ok(vec!["post.md".to_string()]));

    let sync = Synchroniser::new(source, MockVersionControl::new(), store);
    assert!(sync.reconcile().await.unwrap().is_clean());
}
