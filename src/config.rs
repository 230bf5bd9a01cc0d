use std::time::Duration;

use crate::DEFAULT_BAUDRATE;

/// Link and retry parameters, fixed for the lifetime of a [`crate::Device`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterConfig {
    pub baudrate: u32,
    /// Wait for a single chunk read before it counts as empty.
    pub read_timeout: Duration,
    /// Bytes requested from the port per read.
    pub chunk_size: usize,
    /// Buffered bytes without a terminator after which a frame is abandoned.
    pub max_frame_len: usize,
    /// Consecutive empty reads after which a frame is abandoned.
    pub idle_read_limit: usize,
    /// Send/receive cycles per request before giving up.
    pub max_attempts: usize,
    /// Pause between two attempts of the same request.
    pub retry_delay: Duration,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            baudrate: DEFAULT_BAUDRATE,
            read_timeout: Duration::from_millis(100),
            chunk_size: 64,
            max_frame_len: 1024,
            idle_read_limit: 3,
            max_attempts: 6,
            retry_delay: Duration::from_millis(100),
        }
    }
}

impl MeterConfig {
    pub fn with_baudrate(mut self, baudrate: u32) -> Self {
        self.baudrate = baudrate;
        self
    }

    /// Upper bound for one `read_frame` call when the meter stays silent.
    pub fn frame_budget(&self) -> Duration {
        self.read_timeout * self.idle_read_limit as u32
    }
}
