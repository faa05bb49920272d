//! Runtime configuration updates.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::config::{validate_concurrency, validate_refresh_interval};
use crate::error::Result;
use crate::types::Event;

use super::TaskManager;

impl TaskManager {
    /// Change the concurrency limit at runtime
    ///
    /// Tasks already running keep their slot; admissions from now on respect
    /// the new bound. Accepts `1..=20`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use tgmedia_dl::*;
    /// # fn example(manager: TaskManager) -> Result<()> {
    /// manager.set_concurrency_limit(5)?;
    /// assert_eq!(manager.concurrency_limit(), 5);
    /// # Ok(())
    /// # }
    /// ```
    pub fn set_concurrency_limit(&self, limit: usize) -> Result<()> {
        validate_concurrency(limit)?;
        let previous = self.registry.admission.set_limit(limit);

        tracing::info!(previous, limit, "Concurrency limit changed");
        self.emit_event(Event::ConcurrencyChanged { limit });
        Ok(())
    }

    /// Current concurrency limit
    pub fn concurrency_limit(&self) -> usize {
        self.registry.admission.limit()
    }

    /// Number of tasks currently holding a slot
    pub fn active_count(&self) -> usize {
        self.registry.admission.active()
    }

    /// Change how often progress is emitted and the reporter refreshes
    ///
    /// Accepts 0.1 to 60 seconds.
    pub fn set_refresh_interval(&self, interval: Duration) -> Result<()> {
        validate_refresh_interval(interval)?;
        self.runtime_config
            .refresh_interval_ms
            .store(interval.as_millis() as u64, Ordering::SeqCst);

        tracing::info!(interval_secs = interval.as_secs_f64(), "Refresh interval changed");
        Ok(())
    }

    /// Current progress refresh interval
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.runtime_config.refresh_interval_ms.load(Ordering::SeqCst))
    }
}
