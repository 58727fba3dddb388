//! Time sources for the reaper, injectable so tests control the clock.

use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Wall and monotonic time as consumed by the container reaper.
///
/// Node ages are judged against `wall_now_ms` (mtimes are wall-clock);
/// submission pacing is measured with `elapsed_now_ms`, which never jumps
/// backwards.
pub trait Clock: Send + Sync + 'static {
    /// Wall-clock milliseconds since the unix epoch.
    fn wall_now_ms(&self) -> u64;

    /// Monotonic milliseconds from an arbitrary origin.
    fn elapsed_now_ms(&self) -> u64;
}

/// The process clock.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn wall_now_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }

    fn elapsed_now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
