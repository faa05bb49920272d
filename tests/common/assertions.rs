//! Event-driven waits and file assertions for integration tests

use std::path::Path;
use std::time::Duration;
use tgmedia_dl::{Event, TaskId, TaskInfo, TaskManager, TaskState};
use tokio::sync::broadcast;

/// Terminal result observed on the event channel
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Bytes were transferred
    Completed,
    /// An existing artifact satisfied the request
    Skipped,
    /// Cancelled by an owner or shutdown
    Cancelled,
    /// Failed with error
    Failed(String),
    /// Timeout waiting for a terminal event
    Timeout,
    /// Channel closed or lagged
    ChannelClosed,
}

/// Wait on an existing subscription for the terminal event of `id`
///
/// Subscribe before submitting so no event is missed.
pub async fn wait_for_terminal(
    events: &mut broadcast::Receiver<Event>,
    id: &TaskId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::TaskCompleted { id: event_id, .. }) if &event_id == id => {
                    return WaitResult::Completed;
                }
                Ok(Event::TaskSkipped { id: event_id, .. }) if &event_id == id => {
                    return WaitResult::Skipped;
                }
                Ok(Event::TaskCancelled { id: event_id }) if &event_id == id => {
                    return WaitResult::Cancelled;
                }
                Ok(Event::TaskFailed { id: event_id, error }) if &event_id == id => {
                    return WaitResult::Failed(error);
                }
                Ok(_) => continue,
                Err(_) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Collect events until `stop` matches or the timeout elapses
pub async fn collect_events_until<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    stop: F,
) -> Vec<Event>
where
    F: Fn(&Event) -> bool,
{
    let mut collected = Vec::new();

    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let should_stop = stop(&event);
            collected.push(event);
            if should_stop {
                break;
            }
        }
    })
    .await;

    collected
}

/// Poll the manager until the task reports `state`
pub async fn wait_for_state(manager: &TaskManager, id: &TaskId, state: TaskState) -> TaskInfo {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Some(info) = manager.get_task(id).await
                && info.state == state
            {
                return info;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("task {} never reached {}", id, state))
}

/// Assert a file exists with exactly `size` bytes
pub fn assert_file_size(path: &Path, size: u64) {
    let metadata = std::fs::metadata(path)
        .unwrap_or_else(|e| panic!("{} should exist: {}", path.display(), e));
    assert_eq!(metadata.len(), size, "unexpected size for {}", path.display());
}
