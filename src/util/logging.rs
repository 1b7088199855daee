//! # Throttled Logging Utilities
//!
//! A meter that is wired wrong, or a line picking up noise, produces a broken
//! telegram every few hundred milliseconds. These helpers keep such streams
//! from flooding the log while still reporting the first failures of each kind.

use crate::error::ErrorKind;
use std::collections::HashMap;
use std::time::Instant;

/// Fixed-window rate limiter: at most `cap` messages per `window_ms`.
#[derive(Debug)]
pub struct LogThrottle {
    window_ms: u64,
    cap: u32,
    /// Messages let through in the current window
    count: u32,
    suppressed: u64,
    window_start: Instant,
}

impl LogThrottle {
    /// ```rust
    /// use dlms_meter::util::logging::LogThrottle;
    ///
    /// // Allow 3 messages per ten seconds
    /// let mut throttle = LogThrottle::new(10_000, 3);
    /// assert!(throttle.allow());
    /// ```
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            suppressed: 0,
            window_start: Instant::now(),
        }
    }

    /// Returns `true` if the message should be logged.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.window_start).as_millis() as u64 > self.window_ms {
            self.window_start = now;
            self.count = 0;
        }

        self.count += 1;
        let allowed = self.count <= self.cap;
        if !allowed {
            self.suppressed += 1;
        }
        allowed
    }

    /// Messages dropped since creation or the last reset
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Opens a fresh window and clears the suppression counter.
    pub fn reset(&mut self) {
        self.window_start = Instant::now();
        self.count = 0;
        self.suppressed = 0;
    }
}

/// One throttle per error kind, so a stream of CRC-like framing noise does
/// not hide the first crypto failure.
#[derive(Debug)]
pub struct ErrorThrottle {
    window_ms: u64,
    cap: u32,
    throttles: HashMap<ErrorKind, LogThrottle>,
}

impl ErrorThrottle {
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            throttles: HashMap::new(),
        }
    }

    pub fn allow(&mut self, kind: ErrorKind) -> bool {
        let (window_ms, cap) = (self.window_ms, self.cap);
        self.throttles
            .entry(kind)
            .or_insert_with(|| LogThrottle::new(window_ms, cap))
            .allow()
    }
}

impl Default for ErrorThrottle {
    fn default() -> Self {
        // 3 reports per kind per 10 seconds
        Self::new(10_000, 3)
    }
}

/// Log telegram bytes at trace level.
///
/// Output is capped so a runaway buffer does not produce megabyte log lines.
pub fn log_frame_hex(prefix: &str, data: &[u8]) {
    const MAX_LOG_BYTES: usize = 512;

    if !log::log_enabled!(log::Level::Trace) {
        return;
    }

    let shown = &data[..data.len().min(MAX_LOG_BYTES)];
    let ellipsis = if shown.len() < data.len() { " ..." } else { "" };
    log::trace!(
        "{prefix} ({} bytes): {}{ellipsis}",
        data.len(),
        crate::util::hex::format_hex_compact(shown)
    );
}
