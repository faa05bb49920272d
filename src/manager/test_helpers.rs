//! Shared test helpers for creating TaskManager instances in tests.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::{TempDir, tempdir};

use crate::config::Config;
use crate::error::{NotifyError, TransferError};
use crate::manager::TaskManager;
use crate::media_source::{MediaSource, ProgressObserver, copy_with_progress};
use crate::notifier::{MessageRef, NotificationSink, TaskControls};
use crate::types::{ObjectMetadata, OwnerId, SourceRef, TaskId, TaskInfo, TaskState};

pub(crate) const CHANNEL: &str = "testchannel";
pub(crate) const OWNER: OwnerId = 1001;

/// An object the fake source can serve
#[derive(Clone)]
pub(crate) struct MockObject {
    pub(crate) name: Option<String>,
    pub(crate) data: Vec<u8>,
    pub(crate) group_id: Option<i64>,
    /// Fail the transfer after this many chunks
    pub(crate) fail_after_chunks: Option<usize>,
}

impl MockObject {
    pub(crate) fn file(name: &str, size: usize) -> Self {
        Self {
            name: Some(name.to_string()),
            data: vec![7u8; size],
            group_id: None,
            fail_after_chunks: None,
        }
    }

    pub(crate) fn in_group(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub(crate) fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after_chunks = Some(chunks);
        self
    }
}

/// In-memory [`MediaSource`] that streams through [`copy_with_progress`]
/// with a delay per chunk, and records concurrency
pub(crate) struct MockMediaSource {
    objects: Mutex<HashMap<(String, i64), MockObject>>,
    title: Option<String>,
    chunk_size: usize,
    chunk_delay: Duration,
    pub(crate) transfers: AtomicUsize,
    in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
}

impl MockMediaSource {
    pub(crate) fn new(chunk_size: usize, chunk_delay: Duration) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            title: Some("Test Channel".to_string()),
            chunk_size,
            chunk_delay,
            transfers: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// 1 KiB chunks, 5 ms apart
    pub(crate) fn slow() -> Self {
        Self::new(1024, Duration::from_millis(5))
    }

    /// 64 KiB chunks, no delay
    pub(crate) fn fast() -> Self {
        Self::new(64 * 1024, Duration::ZERO)
    }

    pub(crate) fn without_title(mut self) -> Self {
        self.title = None;
        self
    }

    pub(crate) fn insert(&self, object_id: i64, object: MockObject) -> SourceRef {
        self.objects
            .lock()
            .unwrap()
            .insert((CHANNEL.to_string(), object_id), object);
        SourceRef::new(CHANNEL, object_id)
    }

    fn get(&self, source: &SourceRef) -> Option<MockObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(source.container.clone(), source.object_id))
            .cloned()
    }
}

struct DelayedObserver<'a> {
    inner: &'a dyn ProgressObserver,
    delay: Duration,
    chunks: AtomicUsize,
    fail_after: Option<usize>,
}

#[async_trait]
impl ProgressObserver for DelayedObserver<'_> {
    async fn on_progress(&self, transferred: u64, total: u64) -> ControlFlow<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let chunks = self.chunks.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_after.is_some_and(|limit| chunks >= limit) {
            return ControlFlow::Break(());
        }
        self.inner.on_progress(transferred, total).await
    }
}

#[async_trait]
impl MediaSource for MockMediaSource {
    async fn fetch_object_metadata(
        &self,
        source: &SourceRef,
    ) -> Result<Option<ObjectMetadata>, TransferError> {
        Ok(self.get(source).map(|object| ObjectMetadata {
            name: object.name,
            size: object.data.len() as u64,
            group_id: object.group_id,
        }))
    }

    async fn stream_object(
        &self,
        source: &SourceRef,
        destination: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<PathBuf, TransferError> {
        let object = self
            .get(source)
            .ok_or_else(|| TransferError::NotFound(source.to_string()))?;

        self.transfers.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delayed = DelayedObserver {
            inner: observer,
            delay: self.chunk_delay,
            chunks: AtomicUsize::new(0),
            fail_after: object.fail_after_chunks,
        };
        let total = object.data.len() as u64;
        let result = copy_with_progress(
            std::io::Cursor::new(object.data),
            destination,
            total,
            &delayed,
            self.chunk_size,
        )
        .await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(_) => Ok(destination.to_path_buf()),
            Err(TransferError::Aborted) if object.fail_after_chunks.is_some() => Err(
                TransferError::Source("connection reset by peer".to_string()),
            ),
            Err(e) => Err(e),
        }
    }

    async fn list_group_members(
        &self,
        anchor: &SourceRef,
        group_id: i64,
    ) -> Result<Vec<i64>, TransferError> {
        let objects = self.objects.lock().unwrap();
        let mut ids: Vec<i64> = objects
            .iter()
            .filter(|((container, _), object)| {
                *container == anchor.container && object.group_id == Some(group_id)
            })
            .map(|((_, id), _)| *id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn container_title(&self, _container: &str) -> Option<String> {
        self.title.clone()
    }
}

/// [`NotificationSink`] that records every call
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) sent: Mutex<Vec<(OwnerId, String, bool)>>,
    pub(crate) edited: Mutex<Vec<(MessageRef, String)>>,
    pub(crate) deleted: Mutex<Vec<MessageRef>>,
    next_id: AtomicI64,
}

impl RecordingSink {
    /// Texts sent to `owner`, oldest first
    pub(crate) fn texts_for(&self, owner: OwnerId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(recipient, _, _)| *recipient == owner)
            .map(|(_, text, _)| text.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(
        &self,
        recipient: OwnerId,
        text: &str,
        controls: Option<&TaskControls>,
    ) -> Result<MessageRef, NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient, text.to_string(), controls.is_some()));
        Ok(MessageRef {
            chat_id: recipient,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn edit(
        &self,
        message: MessageRef,
        text: &str,
        _controls: Option<&TaskControls>,
    ) -> Result<(), NotifyError> {
        self.edited.lock().unwrap().push((message, text.to_string()));
        Ok(())
    }

    async fn delete(&self, message: MessageRef) -> Result<(), NotifyError> {
        self.deleted.lock().unwrap().push(message);
        Ok(())
    }
}

/// Config rooted in `dir` with fast refresh
pub(crate) fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.join("downloads");
    config.persistence.database_path = dir.join("test.db");
    config.download.refresh_interval = Duration::from_millis(100);
    config.download.max_concurrent_downloads = 3;
    config.notifications.max_per_second = 1000;
    config.notifications.max_per_minute = 100_000;
    config
}

/// Helper to create a test TaskManager with a persistent database.
/// Returns the manager, the sink, and the tempdir (which must be kept alive).
pub(crate) async fn create_test_manager(
    source: Arc<MockMediaSource>,
) -> (TaskManager, Arc<RecordingSink>, TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let (manager, sink) = create_manager_with_config(source, config).await;
    (manager, sink, temp_dir)
}

pub(crate) async fn create_manager_with_config(
    source: Arc<MockMediaSource>,
    config: Config,
) -> (TaskManager, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let manager = TaskManager::new(config, source, sink.clone()).await.unwrap();
    (manager, sink)
}

/// Poll until the task reaches `state` (live or recorded)
pub(crate) async fn wait_for_state(manager: &TaskManager, id: &TaskId, state: TaskState) -> TaskInfo {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Some(info) = manager.get_task(id).await
                && info.state == state
            {
                return info;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("task {} never reached {:?}", id, state))
}

/// Where the manager writes `display_name` for the mock channel
pub(crate) fn artifact_path(manager: &TaskManager, display_name: &str) -> PathBuf {
    manager
        .get_config()
        .download_dir()
        .join("Test Channel")
        .join(display_name)
}

/// Poll until the task has left the live registry (its record is final by then)
pub(crate) async fn wait_until_retired(manager: &TaskManager, id: &TaskId) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while manager.live_handle(id).await.is_some() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("task {} was never retired", id));
}
