//! Progress observer handed to the media source for one transfer.

use std::ops::ControlFlow;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::db::TaskUpdate;
use crate::media_source::ProgressObserver;
use crate::progress::{ProgressThrottle, SpeedSample, progress_fraction, render_task_detail};
use crate::types::{Event, TaskState};

use super::context::DownloadTaskContext;

struct Reporting {
    throttle: ProgressThrottle,
    sample: SpeedSample,
}

/// Checks cancel, then pause, on every chunk and emits throttled progress
pub(super) struct TaskObserver<'a> {
    ctx: &'a DownloadTaskContext,
    reporting: Mutex<Reporting>,
}

impl<'a> TaskObserver<'a> {
    pub(super) fn new(ctx: &'a DownloadTaskContext) -> Self {
        Self {
            ctx,
            reporting: Mutex::new(Reporting {
                throttle: ProgressThrottle::new(ctx.manager.refresh_interval()),
                sample: SpeedSample::new(Instant::now()),
            }),
        }
    }
}

#[async_trait]
impl ProgressObserver for TaskObserver<'_> {
    async fn on_progress(&self, transferred: u64, total: u64) -> ControlFlow<()> {
        let handle = &self.ctx.handle;

        // Cancel is checked before the pause gate so a paused task can be cancelled
        if handle.is_cancelled() {
            return ControlFlow::Break(());
        }
        if !handle.is_gate_open() {
            tracing::debug!(task_id = %handle.id, transferred, "Transfer parked on pause gate");
            handle.wait_until_open().await;
        }
        if handle.is_cancelled() {
            return ControlFlow::Break(());
        }

        let now = Instant::now();
        let emitted = {
            let mut status = handle.status.lock().await;
            status.bytes_transferred = status.bytes_transferred.max(transferred);
            if total > 0 {
                status.bytes_total = total;
            }
            status.progress = progress_fraction(status.bytes_transferred, status.bytes_total);

            let mut reporting = self.reporting.lock().await;
            status.speed_bps = reporting.sample.rate(status.bytes_transferred, now);
            reporting
                .throttle
                .set_interval(self.ctx.manager.refresh_interval());

            let finished = status.bytes_total > 0 && status.bytes_transferred >= status.bytes_total;
            if reporting.throttle.should_emit_at(now) || finished {
                reporting.sample.advance(status.bytes_transferred, now);
                Some((
                    status.progress,
                    status.bytes_transferred,
                    status.bytes_total,
                    status.speed_bps,
                ))
            } else {
                None
            }
        };

        if let Some((progress, bytes_transferred, bytes_total, speed_bps)) = emitted {
            tracing::debug!(
                task_id = %handle.id,
                "{}",
                render_task_detail(
                    TaskState::Running,
                    &handle.display_name,
                    bytes_transferred,
                    bytes_total,
                    speed_bps
                )
            );
            self.ctx.manager.emit_event(Event::TaskProgress {
                id: handle.id.clone(),
                percent: progress * 100.0,
                bytes_transferred,
                bytes_total,
                speed_bps,
            });

            let update = TaskUpdate {
                progress: Some(progress),
                bytes_transferred: Some(bytes_transferred),
                bytes_total: Some(bytes_total),
                ..Default::default()
            };
            if let Err(e) = self.ctx.manager.db.update_task(&handle.id, &update).await {
                tracing::warn!(task_id = %handle.id, error = %e, "Failed to persist progress");
            }
        }

        ControlFlow::Continue(())
    }
}
