//! Media source seam
//!
//! All protocol work against the messaging service lives behind
//! [`MediaSource`]. The engine only asks for metadata, album membership and a
//! byte stream into a local file, and it steers the stream through a
//! [`ProgressObserver`].

use async_trait::async_trait;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::error::TransferError;
use crate::types::{ObjectMetadata, SourceRef};

/// Receives progress callbacks from a running transfer
///
/// Returning `ControlFlow::Break(())` asks the source to abort; the source then
/// returns [`TransferError::Aborted`]. The call may suspend (a paused task
/// parks here), which suspends the transfer with it.
#[async_trait]
pub trait ProgressObserver: Send + Sync {
    /// Called after each chunk with cumulative bytes and the expected total
    async fn on_progress(&self, transferred: u64, total: u64) -> ControlFlow<()>;
}

/// Access to objects stored in the messaging service
///
/// # Examples
///
/// ```no_run
/// use std::ops::ControlFlow;
/// use std::path::{Path, PathBuf};
/// use async_trait::async_trait;
/// use tgmedia_dl::media_source::{MediaSource, ProgressObserver};
/// use tgmedia_dl::{ObjectMetadata, SourceRef, TransferError};
///
/// struct EmptySource;
///
/// #[async_trait]
/// impl MediaSource for EmptySource {
///     async fn fetch_object_metadata(
///         &self,
///         _source: &SourceRef,
///     ) -> Result<Option<ObjectMetadata>, TransferError> {
///         Ok(None)
///     }
///
///     async fn stream_object(
///         &self,
///         source: &SourceRef,
///         _destination: &Path,
///         _observer: &dyn ProgressObserver,
///     ) -> Result<PathBuf, TransferError> {
///         Err(TransferError::NotFound(source.to_string()))
///     }
///
///     async fn list_group_members(
///         &self,
///         _anchor: &SourceRef,
///         _group_id: i64,
///     ) -> Result<Vec<i64>, TransferError> {
///         Ok(vec![])
///     }
/// }
/// ```
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Name, size and album membership of an object; `None` when it does not exist
    async fn fetch_object_metadata(
        &self,
        source: &SourceRef,
    ) -> Result<Option<ObjectMetadata>, TransferError>;

    /// Write the object's bytes to `destination`, reporting through `observer`
    ///
    /// Returns the path actually written (normally `destination`).
    async fn stream_object(
        &self,
        source: &SourceRef,
        destination: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<PathBuf, TransferError>;

    /// Message ids sharing `group_id` with `anchor`, in ascending order
    async fn list_group_members(
        &self,
        anchor: &SourceRef,
        group_id: i64,
    ) -> Result<Vec<i64>, TransferError>;

    /// Human title of a container, used as the destination folder name
    async fn container_title(&self, _container: &str) -> Option<String> {
        None
    }
}

/// Chunk size used by [`copy_with_progress`] when the caller has no preference
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;

/// Copy `reader` into `destination` chunk by chunk, consulting `observer` after each write
///
/// Creates parent directories and truncates any existing file. Stops with
/// [`TransferError::Aborted`] as soon as the observer breaks; the partial file
/// is left in place for the caller to judge. Returns the number of bytes written.
pub async fn copy_with_progress<R>(
    mut reader: R,
    destination: &Path,
    total: u64,
    observer: &dyn ProgressObserver,
    chunk_size: usize,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin + Send,
{
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::File::create(destination).await?;
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut transferred = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).await?;
        transferred += n as u64;

        if observer.on_progress(transferred, total).await.is_break() {
            file.flush().await?;
            return Err(TransferError::Aborted);
        }
    }

    file.flush().await?;
    Ok(transferred)
}
