//! In-memory media source and notification sink for integration tests

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tgmedia_dl::media_source::copy_with_progress;
use tgmedia_dl::notifier::{MessageRef, NotificationSink, TaskControls};
use tgmedia_dl::{
    MediaSource, NotifyError, ObjectMetadata, OwnerId, ProgressObserver, SourceRef, TransferError,
};

/// Username of the channel every fixture object lives in
pub const CHANNEL: &str = "fixturechannel";

/// Title the source reports for [`CHANNEL`]
pub const CHANNEL_TITLE: &str = "Fixture Channel";

/// Principal used by tests that do not care about ownership
pub const OWNER: OwnerId = 4242;

/// One message with a media attachment
#[derive(Clone, Debug)]
pub struct Post {
    /// Attachment file name
    pub name: Option<String>,
    /// Attachment bytes
    pub bytes: Vec<u8>,
    /// Album id
    pub group_id: Option<i64>,
}

impl Post {
    /// Attachment of `size` bytes named `name`
    pub fn media(name: &str, size: usize) -> Self {
        Self {
            name: Some(name.to_string()),
            bytes: (0..size).map(|i| (i % 251) as u8).collect(),
            group_id: None,
        }
    }

    /// Same attachment as part of album `group_id`
    pub fn in_album(mut self, group_id: i64) -> Self {
        self.group_id = Some(group_id);
        self
    }
}

/// A single channel served from memory, paced per chunk
pub struct ChannelSource {
    posts: Mutex<BTreeMap<i64, Post>>,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl ChannelSource {
    /// Source delivering `chunk_size` bytes every `chunk_delay`
    pub fn new(chunk_size: usize, chunk_delay: Duration) -> Self {
        Self {
            posts: Mutex::new(BTreeMap::new()),
            chunk_size,
            chunk_delay,
        }
    }

    /// Large chunks, no delay
    pub fn instant() -> Self {
        Self::new(256 * 1024, Duration::ZERO)
    }

    /// 4 KiB every 10 ms, slow enough to pause mid-transfer
    pub fn throttled() -> Self {
        Self::new(4 * 1024, Duration::from_millis(10))
    }

    /// Publish `post` as message `message_id` and return its reference
    pub fn publish(&self, message_id: i64, post: Post) -> SourceRef {
        self.posts.lock().unwrap().insert(message_id, post);
        SourceRef::new(CHANNEL, message_id)
    }

    fn post(&self, source: &SourceRef) -> Option<Post> {
        if source.container != CHANNEL {
            return None;
        }
        self.posts.lock().unwrap().get(&source.object_id).cloned()
    }
}

struct PacedObserver<'a> {
    inner: &'a dyn ProgressObserver,
    delay: Duration,
}

#[async_trait]
impl ProgressObserver for PacedObserver<'_> {
    async fn on_progress(&self, transferred: u64, total: u64) -> ControlFlow<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.on_progress(transferred, total).await
    }
}

#[async_trait]
impl MediaSource for ChannelSource {
    async fn fetch_object_metadata(
        &self,
        source: &SourceRef,
    ) -> Result<Option<ObjectMetadata>, TransferError> {
        Ok(self.post(source).map(|post| ObjectMetadata {
            name: post.name,
            size: post.bytes.len() as u64,
            group_id: post.group_id,
        }))
    }

    async fn stream_object(
        &self,
        source: &SourceRef,
        destination: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<PathBuf, TransferError> {
        let post = self
            .post(source)
            .ok_or_else(|| TransferError::NotFound(source.to_string()))?;
        let total = post.bytes.len() as u64;
        let paced = PacedObserver {
            inner: observer,
            delay: self.chunk_delay,
        };

        copy_with_progress(
            std::io::Cursor::new(post.bytes),
            destination,
            total,
            &paced,
            self.chunk_size,
        )
        .await?;
        Ok(destination.to_path_buf())
    }

    async fn list_group_members(
        &self,
        anchor: &SourceRef,
        group_id: i64,
    ) -> Result<Vec<i64>, TransferError> {
        if anchor.container != CHANNEL {
            return Ok(Vec::new());
        }
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, post)| post.group_id == Some(group_id))
            .map(|(id, _)| *id)
            .collect())
    }

    async fn container_title(&self, container: &str) -> Option<String> {
        (container == CHANNEL).then(|| CHANNEL_TITLE.to_string())
    }
}

/// Notification sink that keeps every message it was asked to send
#[derive(Default)]
pub struct CollectingSink {
    sent: Mutex<Vec<(OwnerId, String)>>,
    edits: Mutex<Vec<String>>,
    next_id: AtomicI64,
}

impl CollectingSink {
    /// Texts sent to `owner`, oldest first
    pub fn sent_to(&self, owner: OwnerId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(recipient, _)| *recipient == owner)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Every edit text, oldest first
    pub fn edits(&self) -> Vec<String> {
        self.edits.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for CollectingSink {
    async fn send(
        &self,
        recipient: OwnerId,
        text: &str,
        _controls: Option<&TaskControls>,
    ) -> Result<MessageRef, NotifyError> {
        self.sent.lock().unwrap().push((recipient, text.to_string()));
        Ok(MessageRef {
            chat_id: recipient,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn edit(
        &self,
        _message: MessageRef,
        text: &str,
        _controls: Option<&TaskControls>,
    ) -> Result<(), NotifyError> {
        self.edits.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn delete(&self, _message: MessageRef) -> Result<(), NotifyError> {
        Ok(())
    }
}
