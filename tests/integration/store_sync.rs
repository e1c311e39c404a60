//! Integration tests for the task store's confirm-then-apply synchronization.
//!
//! Covers per-id mutation ordering, failure isolation and the draft-to-store
//! flow against the in-memory collaborator.
//!
//! Verification command: `cargo test --test store_sync`

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use taskpad::remote::memory::InMemoryRemote;
use taskpad::tasks::{Draft, MutationAction, TaskError, TaskStore};
use taskpad_proto::task::{Priority, Task, TaskId};
use taskpad_proto::wire::TaskPatch;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_task(id: &str, title: &str) -> Task {
    let created = Utc::now() - TimeDelta::hours(2);
    Task {
        id: TaskId::new(id),
        title: title.to_string(),
        description: None,
        completed: false,
        due_date: None,
        priority: Priority::Medium,
        category: None,
        tags: Vec::new(),
        reminder: None,
        created_at: created,
        updated_at: created,
    }
}

async fn loaded_store(tasks: Vec<Task>) -> Arc<TaskStore<InMemoryRemote>> {
    let remote = InMemoryRemote::new();
    remote.seed("alice", tasks);
    let store = Arc::new(TaskStore::new(remote, "alice"));
    store.load("alice").await.unwrap();
    store
}

// ---------------------------------------------------------------------------
// Per-id ordering
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn same_id_mutations_never_overlap() {
    let store = loaded_store(vec![make_task("1", "A")]).await;
    store.remote().set_latency(Some(Duration::from_millis(100)));
    let id = TaskId::new("1");

    let high = TaskPatch {
        priority: Some(Priority::High),
        ..TaskPatch::default()
    };
    let (a, b) = tokio::join!(store.update(&id, high), store.toggle_completion(&id));
    a.unwrap();
    b.unwrap();

    assert_eq!(store.remote().same_id_overlaps(), 0);
    assert_eq!(store.remote().max_concurrent(), 1);

    let task = store.get(&id).unwrap();
    assert_eq!(task.priority, Priority::High);
    assert!(task.completed);
}

#[tokio::test(start_paused = true)]
async fn different_ids_run_concurrently() {
    let store = loaded_store(vec![make_task("1", "A"), make_task("2", "B")]).await;
    store.remote().set_latency(Some(Duration::from_millis(100)));

    let one = TaskId::new("1");
    let two = TaskId::new("2");
    let (a, b) = tokio::join!(store.toggle_completion(&one), store.toggle_completion(&two));
    a.unwrap();
    b.unwrap();

    assert_eq!(store.remote().max_concurrent(), 2);
    assert_eq!(store.remote().same_id_overlaps(), 0);
}

#[tokio::test(start_paused = true)]
async fn fan_out_over_many_ids_stays_serialized_per_id() {
    let tasks: Vec<Task> = (0..8).map(|i| make_task(&i.to_string(), "T")).collect();
    let store = loaded_store(tasks).await;
    store.remote().set_latency(Some(Duration::from_millis(20)));

    // Three toggles per id, all in flight at once.
    let ids: Vec<TaskId> = (0..8).map(|i| TaskId::new(i.to_string())).collect();
    let toggles = ids
        .iter()
        .cycle()
        .take(ids.len() * 3)
        .map(|id| store.toggle_completion(id));
    let results = futures_util::future::join_all(toggles).await;
    assert!(results.iter().all(Result::is_ok));

    assert_eq!(store.remote().same_id_overlaps(), 0);
    assert!(store.remote().max_concurrent() > 1);
    // Odd number of toggles: every task ends completed, locally and remotely.
    assert!(store.snapshot().iter().all(|t| t.completed));
    assert!(store.remote().tasks("alice").iter().all(|t| t.completed));
}

#[tokio::test(start_paused = true)]
async fn back_to_back_toggles_alternate() {
    let store = loaded_store(vec![make_task("1", "A")]).await;
    store.remote().set_latency(Some(Duration::from_millis(10)));
    let id = TaskId::new("1");

    let (a, b) = tokio::join!(store.toggle_completion(&id), store.toggle_completion(&id));
    assert!(a.unwrap().completed);
    assert!(!b.unwrap().completed);
    assert!(!store.remote().tasks("alice")[0].completed);
}

#[tokio::test(start_paused = true)]
async fn update_queued_behind_delete_sees_not_found() {
    let store = loaded_store(vec![make_task("1", "A")]).await;
    store.remote().set_latency(Some(Duration::from_millis(50)));
    let id = TaskId::new("1");

    let (deleted, toggled) = tokio::join!(store.delete(&id), store.toggle_completion(&id));
    deleted.unwrap();
    assert!(matches!(toggled, Err(TaskError::NotFound(_))));
    assert!(store.is_empty());
    // load + delete; the queued toggle never reached the collaborator.
    assert_eq!(store.remote().request_count(), 2);
}

// ---------------------------------------------------------------------------
// Failure isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn toggle_unknown_id_leaves_other_records_alone() {
    let store = loaded_store(vec![make_task("1", "A"), make_task("2", "B")]).await;
    let before = store.snapshot();

    let err = store
        .toggle_completion(&TaskId::new("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskError::NotFound(_)));
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn failed_mutations_are_not_applied() {
    let store = loaded_store(vec![make_task("1", "A")]).await;
    let before = store.snapshot();
    store.remote().set_failing(true);
    let id = TaskId::new("1");

    let patch = TaskPatch {
        title: Some("renamed".to_string()),
        ..TaskPatch::default()
    };
    let err = store.update(&id, patch).await.unwrap_err();
    assert!(matches!(
        err,
        TaskError::Mutation {
            action: MutationAction::Update,
            ..
        }
    ));
    assert!(store.toggle_completion(&id).await.is_err());
    assert!(store.delete(&id).await.is_err());

    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn failed_reload_keeps_loaded_collection() {
    let store = loaded_store(vec![make_task("1", "A")]).await;
    store.remote().set_failing(true);
    assert!(matches!(
        store.load("alice").await,
        Err(TaskError::Fetch { .. })
    ));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn blank_title_is_rejected_before_any_request() {
    let store = TaskStore::new(InMemoryRemote::new(), "alice");
    let mut draft = Draft::new().title("");
    assert!(matches!(
        draft.submit(&store).await,
        Err(TaskError::Validation(_))
    ));
    assert_eq!(store.remote().request_count(), 0);
}

// ---------------------------------------------------------------------------
// Full flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn draft_submit_then_edit_then_delete() {
    let store = loaded_store(vec![make_task("old", "Existing")]).await;

    let mut draft = Draft::new().title("Renew passport").priority(Priority::High);
    assert!(draft.add_tag("admin"));
    assert!(draft.add_tag("travel"));
    let created = draft.submit(&store).await.unwrap();
    assert!(draft.is_empty());

    // Newest first.
    assert_eq!(store.snapshot()[0].id, created.id);

    let patch = TaskPatch {
        description: Some(Some("bring photos".to_string())),
        tags: Some(vec!["admin".to_string()]),
        ..TaskPatch::default()
    };
    let edited = store.update(&created.id, patch).await.unwrap();
    assert_eq!(edited.description.as_deref(), Some("bring photos"));
    assert_eq!(edited.tags, vec!["admin"]);
    assert!(edited.updated_at >= edited.created_at);

    // The collaborator holds the same record.
    let remote_copy = store
        .remote()
        .tasks("alice")
        .into_iter()
        .find(|t| t.id == created.id)
        .unwrap();
    assert_eq!(remote_copy.tags, edited.tags);
    assert_eq!(remote_copy.description, edited.description);

    store.delete(&created.id).await.unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.remote().tasks("alice").len(), 1);
}

#[tokio::test]
async fn load_rebinds_user() {
    let remote = InMemoryRemote::new();
    remote.seed("alice", vec![make_task("a", "Alice's")]);
    remote.seed("bob", vec![make_task("b1", "Bob's"), make_task("b2", "Bob's too")]);
    let store = TaskStore::new(remote, "alice");

    assert_eq!(store.load("bob").await.unwrap(), 2);
    assert_eq!(store.user_id(), "bob");
    let created = store
        .create(&taskpad_proto::wire::NewTask::titled("for bob"))
        .await
        .unwrap();
    assert!(
        store
            .remote()
            .tasks("bob")
            .iter()
            .any(|t| t.id == created.id)
    );
    assert_eq!(store.remote().tasks("alice").len(), 1);
}
