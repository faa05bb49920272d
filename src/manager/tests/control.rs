use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::TransferError;
use crate::manager::TaskManager;
use crate::manager::test_helpers::{
    CHANNEL, MockMediaSource, MockObject, OWNER, RecordingSink, artifact_path,
    create_test_manager, test_config, wait_for_state,
};
use crate::media_source::{MediaSource, ProgressObserver};
use crate::types::{Event, ObjectMetadata, SourceRef, TaskId, TaskOutcome, TaskState};

const SIZE: usize = 64 * 1024;

#[tokio::test]
async fn pause_right_after_start_holds_bytes_until_resume() {
    let source = Arc::new(MockMediaSource::slow());
    let object = source.insert(1, MockObject::file("movie.mkv", SIZE));
    let (manager, _sink, _dir) = create_test_manager(source).await;

    let ticket = manager.submit_with_handle(object, OWNER).await.unwrap();
    let id = ticket.id.clone();
    wait_for_state(&manager, &id, TaskState::Running).await;

    assert!(manager.pause(&id).await);
    assert_eq!(manager.get_task(&id).await.unwrap().state, TaskState::Paused);

    // Let an in-flight chunk settle, then bytes must stay put
    tokio::time::sleep(Duration::from_millis(50)).await;
    let before = manager.get_task(&id).await.unwrap().bytes_transferred;
    tokio::time::sleep(Duration::from_millis(150)).await;
    let after = manager.get_task(&id).await.unwrap().bytes_transferred;
    assert_eq!(before, after);
    assert!(before < SIZE as u64);

    assert!(manager.resume(&id).await);
    let outcome = ticket.wait().await;

    assert!(matches!(outcome, TaskOutcome::Completed { .. }));
    let info = manager.get_task(&id).await.unwrap();
    assert_eq!(info.bytes_transferred, SIZE as u64);
    assert_eq!(
        std::fs::metadata(artifact_path(&manager, "1_movie.mkv"))
            .unwrap()
            .len(),
        SIZE as u64
    );
}

#[tokio::test]
async fn cancel_while_paused_ends_cancelled() {
    let source = Arc::new(MockMediaSource::slow());
    let object = source.insert(2, MockObject::file("song.mp3", SIZE));
    let (manager, sink, _dir) = create_test_manager(source).await;
    let mut events = manager.subscribe();

    let ticket = manager.submit_with_handle(object, OWNER).await.unwrap();
    let id = ticket.id.clone();
    wait_for_state(&manager, &id, TaskState::Running).await;

    assert!(manager.pause(&id).await);
    assert!(manager.cancel(&id).await);
    let outcome = ticket.wait().await;

    assert_eq!(outcome, TaskOutcome::Cancelled);
    let info = manager.get_task(&id).await.unwrap();
    assert_eq!(info.state, TaskState::Cancelled);
    assert!(info.error.is_none());
    assert!(sink.texts_for(OWNER).last().unwrap().starts_with("❌"));

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            Event::TaskPaused { .. } => kinds.push("paused"),
            Event::TaskCancelled { .. } => kinds.push("cancelled"),
            Event::TaskCompleted { .. } => kinds.push("completed"),
            _ => {}
        }
    }
    assert_eq!(kinds, vec!["paused", "cancelled"]);
}

/// Writes every byte up front, then reports 100% only once released, and
/// returns `Ok` whatever the observer answers
struct WrittenThenReported {
    data: Vec<u8>,
    written: Notify,
    release: Notify,
    observer_broke: AtomicBool,
}

#[async_trait]
impl MediaSource for WrittenThenReported {
    async fn fetch_object_metadata(
        &self,
        _source: &SourceRef,
    ) -> Result<Option<ObjectMetadata>, TransferError> {
        Ok(Some(ObjectMetadata {
            name: Some("tape.bin".to_string()),
            size: self.data.len() as u64,
            group_id: None,
        }))
    }

    async fn stream_object(
        &self,
        _source: &SourceRef,
        destination: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<PathBuf, TransferError> {
        tokio::fs::write(destination, &self.data).await?;
        self.written.notify_one();
        self.release.notified().await;

        let total = self.data.len() as u64;
        if observer.on_progress(total, total).await.is_break() {
            self.observer_broke.store(true, Ordering::SeqCst);
        }
        Ok(destination.to_path_buf())
    }

    async fn list_group_members(
        &self,
        _anchor: &SourceRef,
        _group_id: i64,
    ) -> Result<Vec<i64>, TransferError> {
        Ok(vec![])
    }
}

#[tokio::test]
async fn cancel_wins_even_when_every_byte_landed() {
    let source = Arc::new(WrittenThenReported {
        data: vec![1u8; 10],
        written: Notify::new(),
        release: Notify::new(),
        observer_broke: AtomicBool::new(false),
    });
    let temp_dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let manager = TaskManager::new(test_config(temp_dir.path()), source.clone(), sink)
        .await
        .unwrap();
    let mut events = manager.subscribe();

    let ticket = manager
        .submit_with_handle(SourceRef::new(CHANNEL, 1), OWNER)
        .await
        .unwrap();
    let id = ticket.id.clone();

    source.written.notified().await;
    assert!(manager.pause(&id).await);
    source.release.notify_one();
    // The 100% callback parks on the closed gate
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(manager.get_task(&id).await.unwrap().state, TaskState::Paused);

    assert!(manager.cancel(&id).await);
    let outcome = ticket.wait().await;

    assert_eq!(outcome, TaskOutcome::Cancelled);
    assert!(source.observer_broke.load(Ordering::SeqCst));
    let destination = manager
        .get_config()
        .download_dir()
        .join("save")
        .join("1_tape.bin");
    assert_eq!(std::fs::metadata(&destination).unwrap().len(), 10);

    let info = manager.get_task(&id).await.unwrap();
    assert_eq!(info.state, TaskState::Cancelled);
    assert!(info.file_paths.is_empty());

    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(event, Event::TaskCompleted { .. }),
            "cancelled task reported completion"
        );
    }
}

#[tokio::test]
async fn terminal_states_are_sticky() {
    let source = Arc::new(MockMediaSource::fast());
    let object = source.insert(3, MockObject::file("a.txt", 100));
    let (manager, _sink, _dir) = create_test_manager(source).await;

    let ticket = manager.submit_with_handle(object, OWNER).await.unwrap();
    let id = ticket.id.clone();
    ticket.wait().await;

    assert!(!manager.pause(&id).await);
    assert!(!manager.resume(&id).await);
    assert!(!manager.cancel(&id).await);
    assert_eq!(
        manager.get_task(&id).await.unwrap().state,
        TaskState::Completed
    );
}

#[tokio::test]
async fn unknown_ids_are_no_ops() {
    let source = Arc::new(MockMediaSource::fast());
    let (manager, _sink, _dir) = create_test_manager(source).await;
    let ghost = TaskId::from("task_999_0");

    assert!(!manager.pause(&ghost).await);
    assert!(!manager.resume(&ghost).await);
    assert!(!manager.cancel(&ghost).await);
    assert!(!manager.retire(&ghost).await);
    assert!(manager.get_task(&ghost).await.is_none());
}

#[tokio::test]
async fn pending_and_running_reject_the_wrong_transitions() {
    let source = Arc::new(MockMediaSource::slow());
    let (manager, _sink, _dir) = create_test_manager(source.clone()).await;
    manager.set_concurrency_limit(1).unwrap();

    let a = manager
        .submit(source.insert(1, MockObject::file("a.bin", SIZE)), OWNER)
        .await
        .unwrap();
    let b = manager
        .submit(source.insert(2, MockObject::file("b.bin", SIZE)), OWNER)
        .await
        .unwrap();
    wait_for_state(&manager, &a, TaskState::Running).await;

    // b waits for a slot
    assert!(!manager.pause(&b).await);
    assert!(!manager.cancel(&b).await);
    // a is running, not paused
    assert!(!manager.resume(&a).await);
    // live, non-terminal tasks are not retired
    assert!(!manager.retire(&a).await);

    manager.cancel_all().await;
    wait_for_state(&manager, &a, TaskState::Cancelled).await;
}

#[tokio::test]
async fn bulk_owner_operations_count_affected_tasks() {
    let source = Arc::new(MockMediaSource::slow());
    let (manager, _sink, _dir) = create_test_manager(source.clone()).await;

    let mine_1 = manager
        .submit(source.insert(1, MockObject::file("a.bin", SIZE)), OWNER)
        .await
        .unwrap();
    let mine_2 = manager
        .submit(source.insert(2, MockObject::file("b.bin", SIZE)), OWNER)
        .await
        .unwrap();
    let theirs = manager
        .submit(source.insert(3, MockObject::file("c.bin", SIZE)), 2002)
        .await
        .unwrap();
    for id in [&mine_1, &mine_2, &theirs] {
        wait_for_state(&manager, id, TaskState::Running).await;
    }

    assert_eq!(manager.pause_owner(OWNER).await, 2);
    assert_eq!(manager.pause_owner(OWNER).await, 0);
    assert_eq!(
        manager.get_task(&theirs).await.unwrap().state,
        TaskState::Running
    );

    assert_eq!(manager.pause_all().await, 1);
    assert_eq!(manager.resume_owner(2002).await, 1);
    assert_eq!(manager.resume_all().await, 2);

    assert_eq!(manager.cancel_owner(OWNER).await, 2);
    assert_eq!(manager.cancel_all().await, 1);
    for id in [&mine_1, &mine_2, &theirs] {
        wait_for_state(&manager, id, TaskState::Cancelled).await;
    }
}

#[tokio::test]
async fn purge_removes_only_finished_records() {
    let source = Arc::new(MockMediaSource::slow());
    let (manager, _sink, _dir) = create_test_manager(source.clone()).await;

    let done = manager
        .submit_with_handle(source.insert(1, MockObject::file("a.txt", 10)), OWNER)
        .await
        .unwrap();
    let done_id = done.id.clone();
    done.wait().await;

    let live = manager
        .submit(source.insert(2, MockObject::file("b.bin", SIZE)), OWNER)
        .await
        .unwrap();
    wait_for_state(&manager, &live, TaskState::Running).await;

    assert!(manager.purge(&live).await.is_err());
    assert!(manager.purge(&done_id).await.unwrap());
    assert!(!manager.purge(&done_id).await.unwrap());
    assert!(manager.get_task(&done_id).await.is_none());

    manager.cancel(&live).await;
}

#[tokio::test]
async fn list_tasks_filters_by_owner_in_admission_order() {
    let source = Arc::new(MockMediaSource::slow());
    let (manager, _sink, _dir) = create_test_manager(source.clone()).await;
    manager.set_concurrency_limit(1).unwrap();

    let first = manager
        .submit(source.insert(1, MockObject::file("a.bin", SIZE)), OWNER)
        .await
        .unwrap();
    let other = manager
        .submit(source.insert(2, MockObject::file("b.bin", SIZE)), 2002)
        .await
        .unwrap();
    let second = manager
        .submit(source.insert(3, MockObject::file("c.bin", SIZE)), OWNER)
        .await
        .unwrap();

    let all: Vec<_> = manager.list_tasks(None).await.into_iter().map(|t| t.id).collect();
    assert_eq!(all, vec![first.clone(), other.clone(), second.clone()]);

    let mine: Vec<_> = manager
        .list_tasks(Some(OWNER))
        .await
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(mine, vec![first, second]);

    manager.shutdown().await.unwrap();
}
