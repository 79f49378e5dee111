//! Both repositories honour the same optimistic locking contract

use onbehalf_core::TargetRef;
use onbehalf_store::{MemoryRepository, SqliteRepository, StoreError, TargetRepository};
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn racing_writers(repo: Arc<dyn TargetRepository>) {
    let target = TargetRef::proposal("P-RACE");
    repo.put_if_version(&target, None, json!({"counter": 0})).unwrap();

    // Every writer reads version 1 and tries to bump it; exactly one may win.
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let repo = Arc::clone(&repo);
            let target = target.clone();
            thread::spawn(move || repo.put_if_version(&target, Some(1), json!({"counter": i})))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(StoreError::VersionConflict { .. })))
        .count();

    assert_eq!(wins, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(repo.require(&target).unwrap().version, 2);
}

#[test]
fn memory_repository_serializes_writers() {
    racing_writers(Arc::new(MemoryRepository::new()));
}

#[test]
fn sqlite_repository_serializes_writers() {
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteRepository::new(dir.path().join("state.db")).unwrap();
    racing_writers(Arc::new(repo));
}
