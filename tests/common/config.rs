//! Test configuration helpers for creating managers over temp directories

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tgmedia_dl::{Config, TaskManager};

use super::fixtures::{CHANNEL_TITLE, ChannelSource, CollectingSink};

/// Config rooted in `dir`: fast refresh, generous notification limits
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.join("downloads");
    config.download.refresh_interval = Duration::from_millis(100);
    config.download.max_concurrent_downloads = 2;
    config.persistence.database_path = dir.join("tasks.db");
    config.notifications.max_per_second = 1000;
    config.notifications.max_per_minute = 100_000;
    config
}

/// Manager over `source` with its own temp directory
pub async fn create_test_manager(
    source: Arc<ChannelSource>,
) -> (Arc<TaskManager>, Arc<CollectingSink>, TempDir) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let (manager, sink) = open_manager(source, test_config(temp_dir.path())).await;
    (manager, sink, temp_dir)
}

/// Manager over an explicit config (e.g. to reopen an existing database)
pub async fn open_manager(
    source: Arc<ChannelSource>,
    config: Config,
) -> (Arc<TaskManager>, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::default());
    let manager = TaskManager::new(config, source, sink.clone())
        .await
        .expect("manager should start");
    (Arc::new(manager), sink)
}

/// Where an attachment lands for the fixture channel
pub fn artifact_path(manager: &TaskManager, display_name: &str) -> PathBuf {
    manager
        .get_config()
        .download_dir()
        .join(CHANNEL_TITLE)
        .join(display_name)
}
