//! Outbound chat notifications
//!
//! [`NotificationSink`] is the seam to the bot API. The engine never talks to a
//! sink directly: every call goes through [`Notifier`], which applies the
//! [`RateLimiter`] and turns sink failures into log lines.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::NotifyError;
use crate::rate_limiter::RateLimiter;
use crate::types::{OwnerId, TaskId};

/// Handle to a message the sink has sent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct MessageRef {
    /// Chat the message lives in
    pub chat_id: i64,
    /// Message id within that chat
    pub message_id: i64,
}

/// Inline control a chat user can press on a task message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    /// Pause the task
    Pause,
    /// Resume the task
    Resume,
    /// Cancel the task
    Cancel,
}

impl ControlAction {
    fn prefix(&self) -> &'static str {
        match self {
            ControlAction::Pause => "pause_",
            ControlAction::Resume => "resume_",
            ControlAction::Cancel => "cancel_",
        }
    }

    /// Callback payload attached to the button for `task_id`
    pub fn callback_data(&self, task_id: &TaskId) -> String {
        format!("{}{}", self.prefix(), task_id)
    }

    /// Parse a payload produced by [`callback_data`](Self::callback_data)
    pub fn parse_callback(data: &str) -> Option<(ControlAction, TaskId)> {
        [ControlAction::Pause, ControlAction::Resume, ControlAction::Cancel]
            .into_iter()
            .find_map(|action| {
                data.strip_prefix(action.prefix())
                    .filter(|id| !id.is_empty())
                    .map(|id| (action, TaskId::from(id)))
            })
    }
}

/// Pause/resume/cancel buttons attached to a task message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskControls {
    /// Task the buttons act on
    pub task_id: TaskId,
}

impl TaskControls {
    /// Buttons for `task_id`
    pub fn new(task_id: TaskId) -> Self {
        Self { task_id }
    }

    /// `(action, callback payload)` pairs in display order
    pub fn buttons(&self) -> Vec<(ControlAction, String)> {
        [ControlAction::Pause, ControlAction::Resume, ControlAction::Cancel]
            .into_iter()
            .map(|action| (action, action.callback_data(&self.task_id)))
            .collect()
    }
}

/// Bot API used to talk to owners
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Send a new message to `recipient`
    async fn send(
        &self,
        recipient: OwnerId,
        text: &str,
        controls: Option<&TaskControls>,
    ) -> Result<MessageRef, NotifyError>;

    /// Replace the text of an existing message
    async fn edit(
        &self,
        message: MessageRef,
        text: &str,
        controls: Option<&TaskControls>,
    ) -> Result<(), NotifyError>;

    /// Delete a message
    async fn delete(&self, message: MessageRef) -> Result<(), NotifyError>;
}

/// Sink that drops everything, for headless deployments
///
/// # Examples
///
/// ```
/// use tgmedia_dl::notifier::{NoOpNotificationSink, NotificationSink};
///
/// # #[tokio::main]
/// # async fn main() {
/// let sink = NoOpNotificationSink;
/// let message = sink.send(42, "hello", None).await.unwrap();
/// assert_eq!(message.chat_id, 42);
/// # }
/// ```
pub struct NoOpNotificationSink;

#[async_trait]
impl NotificationSink for NoOpNotificationSink {
    async fn send(
        &self,
        recipient: OwnerId,
        _text: &str,
        _controls: Option<&TaskControls>,
    ) -> Result<MessageRef, NotifyError> {
        Ok(MessageRef {
            chat_id: recipient,
            message_id: 0,
        })
    }

    async fn edit(
        &self,
        _message: MessageRef,
        _text: &str,
        _controls: Option<&TaskControls>,
    ) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn delete(&self, _message: MessageRef) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Rate-limited, failure-swallowing front for a [`NotificationSink`]
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    limiter: Arc<RateLimiter>,
}

impl Notifier {
    /// Wrap `sink` with a limiter of `per_second` / `per_minute` calls
    pub fn new(sink: Arc<dyn NotificationSink>, per_second: usize, per_minute: usize) -> Self {
        Self {
            sink,
            limiter: Arc::new(RateLimiter::new(per_second, per_minute)),
        }
    }

    /// The limiter every call passes through
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Send a message; `None` when the sink failed
    pub async fn send(
        &self,
        recipient: OwnerId,
        text: &str,
        controls: Option<&TaskControls>,
    ) -> Option<MessageRef> {
        self.limiter.acquire().await;
        match self.sink.send(recipient, text, controls).await {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!(recipient, error = %e, "Failed to send notification");
                None
            }
        }
    }

    /// Edit a message; `false` when the sink failed
    pub async fn edit(
        &self,
        message: MessageRef,
        text: &str,
        controls: Option<&TaskControls>,
    ) -> bool {
        self.limiter.acquire().await;
        match self.sink.edit(message, text, controls).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    chat_id = message.chat_id,
                    message_id = message.message_id,
                    error = %e,
                    "Failed to edit notification"
                );
                false
            }
        }
    }

    /// Delete a message; `false` when the sink failed
    pub async fn delete(&self, message: MessageRef) -> bool {
        self.limiter.acquire().await;
        match self.sink.delete(message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    chat_id = message.chat_id,
                    message_id = message.message_id,
                    error = %e,
                    "Failed to delete notification"
                );
                false
            }
        }
    }
}
