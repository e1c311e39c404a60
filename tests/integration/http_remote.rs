//! Integration tests for the HTTP collaborator against a live task server.
//!
//! Each test starts `taskpad-server` on an ephemeral port and drives it
//! through [`HttpRemote`], directly and through a [`TaskStore`].
//!
//! Verification command: `cargo test --test http_remote`

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use taskpad::remote::http::{DEFAULT_TIMEOUT, HttpRemote};
use taskpad::remote::{RemoteError, RemoteTasks};
use taskpad::tasks::{Draft, MutationAction, TaskError, TaskStore};
use taskpad_proto::task::{Priority, TaskId};
use taskpad_proto::wire::{NewTask, TaskPatch};
use url::Url;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn start_service() -> HttpRemote {
    let (addr, _handle) = taskpad_server::routes::start_server("127.0.0.1:0")
        .await
        .expect("start task server");
    let url = Url::parse(&format!("http://{addr}")).unwrap();
    HttpRemote::new(url, DEFAULT_TIMEOUT)
}

// ---------------------------------------------------------------------------
// Raw collaborator calls
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_list_update_delete() {
    let remote = start_service().await;

    let mut new_task = NewTask::titled("Renew passport");
    new_task.priority = Some(Priority::High);
    new_task.tags = vec!["admin".to_string()];
    let created = remote.create("alice", &new_task).await.unwrap();
    assert_eq!(created.title, "Renew passport");
    assert_eq!(created.priority, Priority::High);
    assert!(!created.completed);

    let listed = remote.list("alice").await.unwrap();
    assert_eq!(listed, vec![created.clone()]);

    remote
        .update("alice", &created.id, &TaskPatch::completed(true))
        .await
        .unwrap();
    assert!(remote.list("alice").await.unwrap()[0].completed);

    remote.delete("alice", &created.id).await.unwrap();
    assert!(remote.list("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn newest_task_is_listed_first() {
    let remote = start_service().await;
    remote.create("alice", &NewTask::titled("first")).await.unwrap();
    let second = remote.create("alice", &NewTask::titled("second")).await.unwrap();

    let listed = remote.list("alice").await.unwrap();
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn users_are_isolated() {
    let remote = start_service().await;
    let created = remote.create("alice", &NewTask::titled("private")).await.unwrap();

    assert!(remote.list("bob").await.unwrap().is_empty());
    let err = remote.delete("bob", &created.id).await.unwrap_err();
    assert!(matches!(err, RemoteError::NotFound), "got {err:?}");
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let remote = start_service().await;
    let err = remote
        .update("alice", &TaskId::new("missing"), &TaskPatch::completed(true))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::NotFound), "got {err:?}");
}

#[tokio::test]
async fn blank_user_is_unauthorized() {
    let remote = start_service().await;
    let err = remote.list("  ").await.unwrap_err();
    assert!(matches!(err, RemoteError::Unauthorized), "got {err:?}");
}

#[tokio::test]
async fn hung_service_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept connections and never answer.
    let _hold = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            open.push(stream);
        }
    });

    let url = Url::parse(&format!("http://{addr}")).unwrap();
    let remote = HttpRemote::new(url, Duration::from_millis(100));
    let err = remote.list("alice").await.unwrap_err();
    assert!(matches!(err, RemoteError::Timeout), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Task store over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_round_trips_through_service() {
    let remote = start_service().await;
    let seeded = remote.create("alice", &NewTask::titled("seeded")).await.unwrap();

    let store = TaskStore::new(remote, "alice");
    assert_eq!(store.load("alice").await.unwrap(), 1);

    let mut draft = Draft::new().title("Water plants").category("home");
    draft.add_tag("garden");
    let created = draft.submit(&store).await.unwrap();
    assert_eq!(created.category.as_deref(), Some("home"));
    assert_eq!(created.tags, vec!["garden"]);

    let toggled = store.toggle_completion(&seeded.id).await.unwrap();
    assert!(toggled.completed);

    let patch = TaskPatch {
        title: Some("Water all plants".to_string()),
        ..TaskPatch::default()
    };
    store.update(&created.id, patch).await.unwrap();

    // A fresh load sees exactly what the store applied locally.
    let local = store.snapshot();
    store.load("alice").await.unwrap();
    let reloaded = store.snapshot();
    assert_eq!(reloaded.len(), local.len());
    for task in &local {
        let remote_copy = reloaded.iter().find(|t| t.id == task.id).unwrap();
        assert_eq!(remote_copy.title, task.title);
        assert_eq!(remote_copy.completed, task.completed);
        assert_eq!(remote_copy.tags, task.tags);
    }

    store.delete(&seeded.id).await.unwrap();
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn store_reports_service_failure_without_applying() {
    let remote = start_service().await;
    let store = TaskStore::new(remote, "alice");
    store.load("alice").await.unwrap();

    let err = store.delete(&TaskId::new("ghost")).await.unwrap_err();
    assert!(matches!(err, TaskError::NotFound(_)), "got {err:?}");

    let created = store.create(&NewTask::titled("kept")).await.unwrap();
    // Deleted behind the store's back: the next update fails and nothing changes.
    store.remote().delete("alice", &created.id).await.unwrap();
    let err = store
        .toggle_completion(&created.id)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            TaskError::Mutation {
                action: MutationAction::Update,
                ..
            }
        ),
        "got {err:?}"
    );
    assert!(!store.get(&created.id).unwrap().completed);
}
