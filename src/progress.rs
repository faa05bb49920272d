//! Progress arithmetic and status rendering
//!
//! Pure helpers shared by the transfer loop and the per-owner reporter.

use std::time::{Duration, Instant};

use crate::types::TaskState;

/// Guards the rate division against a zero time delta
const RATE_EPSILON_SECS: f64 = 1e-6;
const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Longest display name shown in aggregate progress messages
pub const MAX_DISPLAY_NAME_CHARS: usize = 32;

/// The last reported `(bytes, instant)` pair, used to derive a transfer rate
#[derive(Clone, Copy, Debug)]
pub struct SpeedSample {
    /// Bytes transferred at the last report
    pub last_bytes: u64,
    /// When the last report happened
    pub last_instant: Instant,
}

impl SpeedSample {
    /// Start sampling at zero bytes
    pub fn new(now: Instant) -> Self {
        Self {
            last_bytes: 0,
            last_instant: now,
        }
    }

    /// Bytes per second between the last report and `(bytes, now)`
    ///
    /// Returns 0 when `now` is not after the last report.
    pub fn rate(&self, bytes: u64, now: Instant) -> f64 {
        if now <= self.last_instant {
            return 0.0;
        }
        let delta_bytes = bytes.saturating_sub(self.last_bytes) as f64;
        let delta_secs = now.duration_since(self.last_instant).as_secs_f64();
        delta_bytes / (delta_secs + RATE_EPSILON_SECS)
    }

    /// Make `(bytes, now)` the new reference point
    pub fn advance(&mut self, bytes: u64, now: Instant) {
        self.last_bytes = bytes;
        self.last_instant = now;
    }
}

/// Fraction in [0, 1]; 0 when the total is unknown
pub fn progress_fraction(transferred: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (transferred as f64 / total as f64).clamp(0.0, 1.0)
}

/// Whole percent, truncated
pub fn percent(progress: f64) -> u32 {
    (progress.clamp(0.0, 1.0) * 100.0) as u32
}

/// Human speed with two decimals: MB/s above 1 MiB/s, KB/s otherwise
pub fn format_speed(bytes_per_sec: f64) -> String {
    if bytes_per_sec > MIB {
        format!("{:.2}MB/s", bytes_per_sec / MIB)
    } else {
        format!("{:.2}KB/s", bytes_per_sec / KIB)
    }
}

/// Size in MiB with two decimals
pub fn format_size(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / MIB)
}

/// Cut a name to `max_chars` characters, marking the cut with `…`
pub fn truncate_name(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let mut out: String = name.chars().take(keep).collect();
    out.push('…');
    out
}

/// One line of an aggregate progress message
///
/// `⏬ 12_video.mp4: 42% | 1.50MB/s`. The speed part only appears while bytes flow.
pub fn render_task_line(state: TaskState, name: &str, progress: f64, speed_bps: f64) -> String {
    let speed = if speed_bps > 0.0 {
        format!(" | {}", format_speed(speed_bps))
    } else {
        String::new()
    };
    format!(
        "{} {}: {}%{}",
        state.emoji(),
        truncate_name(name, MAX_DISPLAY_NAME_CHARS),
        percent(progress),
        speed
    )
}

/// Per-task detail line including sizes, used for terminal notices and logs
///
/// `💥 12_video.mp4: 40% | 0.40/1.00MB`, with the speed appended while bytes flow.
pub fn render_task_detail(
    state: TaskState,
    name: &str,
    transferred: u64,
    total: u64,
    speed_bps: f64,
) -> String {
    let speed = if speed_bps > 0.0 {
        format!(" | {}", format_speed(speed_bps))
    } else {
        String::new()
    };
    format!(
        "{} {}: {}% | {:.2}/{}{}",
        state.emoji(),
        name,
        percent(progress_fraction(transferred, total)),
        transferred as f64 / MIB,
        format_size(total),
        speed
    )
}

/// Rate-limits progress emissions
///
/// The first check always passes; later checks pass once `min_interval` has
/// elapsed since the last pass.
#[derive(Debug)]
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    min_interval: Duration,
}

impl ProgressThrottle {
    /// Create a throttle with the given minimum interval
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_emit: None,
            min_interval,
        }
    }

    /// Check against an explicit time, recording it when the check passes
    pub fn should_emit_at(&mut self, now: Instant) -> bool {
        match self.last_emit {
            Some(last) if now.saturating_duration_since(last) < self.min_interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }

    /// Change the interval without forgetting the last emission
    pub fn set_interval(&mut self, min_interval: Duration) {
        self.min_interval = min_interval;
    }
}
