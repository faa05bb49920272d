//! Download task execution -- the unit of work behind every admitted object.
//!
//! Split into focused submodules:
//! - [`context`] - Shared state and owner notices
//! - [`orchestration`] - Admission wait, existence gate, transfer
//! - [`observer`] - Per-chunk cancel/pause checks and progress emission
//! - [`finalization`] - Terminal state, slot release, retirement

mod context;
mod finalization;
mod observer;
mod orchestration;

pub(crate) use context::{DownloadTaskContext, NoticePolicy};
pub(crate) use orchestration::run_download_task;
