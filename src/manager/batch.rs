//! Album fan-out and the top-level `download` entry.

use futures::future::join_all;

use crate::error::Result;
use crate::types::{BatchSummary, DownloadReport, Event, OwnerId, SourceRef};

use super::TaskManager;
use super::download_task::NoticePolicy;
use super::submit::TaskTicket;

impl TaskManager {
    /// Download an object and wait for it
    ///
    /// Grouped objects (albums) are expanded into one task per member via
    /// [`download_group`](Self::download_group); anything else runs as a single
    /// task. Returns once every task reached a terminal state.
    ///
    /// # Errors
    ///
    /// Only admission-time failures for the requested object itself: shutting
    /// down, unknown object, failed metadata or membership query.
    pub async fn download(&self, source: SourceRef, owner: OwnerId) -> Result<DownloadReport> {
        self.ensure_accepting()?;
        let metadata = self.fetch_metadata(&source).await?;

        if let Some(group_id) = metadata.group_id {
            return self.download_group(source, owner, group_id).await;
        }

        let ticket = self
            .admit(source, owner, &metadata, NoticePolicy::Announce)
            .await?;
        let task_id = ticket.id.clone();
        let outcome = ticket.wait().await;

        let mut summary = BatchSummary::default();
        summary.record(&outcome);
        Ok(DownloadReport {
            task_ids: vec![task_id],
            group_id: None,
            summary,
        })
    }

    /// Download every member of an album concurrently and aggregate the outcomes
    ///
    /// Members run as independent tasks under the shared concurrency bound. A
    /// failing member never stops its siblings. Members whose metadata cannot
    /// be fetched, or that cannot be admitted, count as failed.
    pub async fn download_group(
        &self,
        anchor: SourceRef,
        owner: OwnerId,
        group_id: i64,
    ) -> Result<DownloadReport> {
        let mut members = self.source.list_group_members(&anchor, group_id).await?;
        if members.is_empty() {
            members.push(anchor.object_id);
        }

        tracing::info!(
            source = %anchor,
            group_id,
            members = members.len(),
            "Album download started"
        );
        self.notifier
            .send(
                owner,
                &format!("📦 Album with {} files queued", members.len()),
                None,
            )
            .await;

        let mut summary = BatchSummary::default();
        let mut tickets: Vec<TaskTicket> = Vec::with_capacity(members.len());

        for object_id in members {
            let member = SourceRef::new(anchor.container.clone(), object_id);
            let admitted = match self.fetch_metadata(&member).await {
                Ok(metadata) => {
                    self.admit(member.clone(), owner, &metadata, NoticePolicy::Silent)
                        .await
                }
                Err(e) => Err(e),
            };
            match admitted {
                Ok(ticket) => tickets.push(ticket),
                Err(e) => {
                    tracing::warn!(source = %member, group_id, error = %e, "Album member could not be admitted");
                    summary.failed += 1;
                }
            }
        }

        let task_ids = tickets.iter().map(|ticket| ticket.id.clone()).collect();
        let outcomes = join_all(tickets.into_iter().map(TaskTicket::wait)).await;
        for outcome in &outcomes {
            summary.record(outcome);
        }

        tracing::info!(
            group_id,
            new = summary.new,
            skipped = summary.skipped,
            failed = summary.failed,
            "Album download finished"
        );
        self.emit_event(Event::BatchCompleted { group_id, summary });
        self.notifier
            .send(owner, &render_batch_summary(&summary), None)
            .await;

        Ok(DownloadReport {
            task_ids,
            group_id: Some(group_id),
            summary,
        })
    }
}

/// Owner-facing summary of an album run; "all skipped" reads differently
pub(crate) fn render_batch_summary(summary: &BatchSummary) -> String {
    if summary.all_skipped() {
        return format!(
            "⏭️ Album already downloaded ({} files)",
            summary.skipped
        );
    }
    format!(
        "📦 Album finished: {} new, {} skipped, {} failed",
        summary.new, summary.skipped, summary.failed
    )
}
