//! Completeness reports against local storage.

use crate::error::Result;
use crate::existence::find_existing;
use crate::types::{CompletenessReport, MissingFile, ObjectMetadata, SourceRef};

use super::TaskManager;
use super::submit::display_name_for;

impl TaskManager {
    /// Check how much of an object (or its whole album) is on disk
    ///
    /// Uses the same path derivation and completeness rule as a download, so a
    /// clean report means a download would skip every file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) when the source does
    /// not know the object, or a source error when a query fails.
    pub async fn check_status(&self, container: &str, object_id: i64) -> Result<CompletenessReport> {
        let source = SourceRef::new(container, object_id);
        let metadata = self.fetch_metadata(&source).await?;
        let title = self.source.container_title(container).await;

        let members: Vec<(i64, ObjectMetadata)> = match metadata.group_id {
            Some(group_id) => {
                let ids = self.source.list_group_members(&source, group_id).await?;
                let mut members = Vec::with_capacity(ids.len());
                for id in ids {
                    if id == object_id {
                        members.push((id, metadata.clone()));
                        continue;
                    }
                    match self
                        .source
                        .fetch_object_metadata(&SourceRef::new(container, id))
                        .await?
                    {
                        Some(member) => members.push((id, member)),
                        None => tracing::debug!(container, object_id = id, "Album member vanished"),
                    }
                }
                if members.is_empty() {
                    members.push((object_id, metadata.clone()));
                }
                members
            }
            None => vec![(object_id, metadata.clone())],
        };

        let mut report = CompletenessReport {
            source,
            group_id: metadata.group_id,
            total_files: members.len(),
            downloaded_files: 0,
            downloaded_bytes: 0,
            expected_bytes: 0,
            missing: Vec::new(),
        };

        for (id, member) in members {
            let display_name = display_name_for(id, member.name.as_deref());
            let dir = self.paths.directory(title.as_deref(), &display_name);
            let existing = find_existing(&dir, id);

            report.expected_bytes += member.size;
            if existing.is_complete(member.size) {
                report.downloaded_files += 1;
                report.downloaded_bytes += existing.size;
            } else {
                report.missing.push(MissingFile {
                    object_id: id,
                    display_name,
                    local_size: existing.size,
                    expected_size: member.size,
                });
            }
        }

        Ok(report)
    }
}
