//! Application state for the API server

use crate::{Config, TaskManager};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (Arc clones only).
#[derive(Clone)]
pub struct AppState {
    /// The task manager every handler delegates to
    pub manager: Arc<TaskManager>,

    /// Configuration (read-only; runtime updates go through the manager)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(manager: Arc<TaskManager>, config: Arc<Config>) -> Self {
        Self { manager, config }
    }
}
