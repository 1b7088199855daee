//! # Telegram Accumulator
//!
//! The P1 port gives no length information up front: a meter pushes a burst of
//! one or more M-Bus frames and then goes quiet until the next reading. The
//! accumulator collects bytes until the line has been idle for longer than the
//! inactivity timeout and then hands the whole burst over as one telegram.
//!
//! No framing knowledge lives here. Time is passed in explicitly so callers
//! (and tests) control the clock.

use crate::constants::{DEFAULT_INACTIVITY_TIMEOUT_MS, DEFAULT_MAX_TELEGRAM_SIZE};
use crate::error::FramingError;
use bytes::BytesMut;
use std::time::{Duration, Instant};

/// Collects inbound bytes into one in-flight telegram.
#[derive(Debug)]
pub struct FrameAccumulator {
    buffer: BytesMut,
    last_arrival: Option<Instant>,
    inactivity_timeout: Duration,
    max_size: usize,
    /// Set after an overflow; bytes are dropped until the line goes quiet.
    discarding: bool,
}

impl FrameAccumulator {
    pub fn new(inactivity_timeout: Duration, max_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_size),
            last_arrival: None,
            inactivity_timeout,
            max_size,
            discarding: false,
        }
    }

    /// Append one byte received at `now`.
    ///
    /// A byte arriving after the inactivity timeout on a buffer nobody took
    /// starts a fresh telegram. Exceeding the size cap discards the buffer and
    /// drops bytes until the next quiet period.
    pub fn feed(&mut self, byte: u8, now: Instant) -> Result<(), FramingError> {
        let gap_elapsed = self.gap_elapsed(now);
        self.last_arrival = Some(now);

        if self.discarding {
            if !gap_elapsed {
                return Ok(());
            }
            log::debug!("Line quiet after overflow, accumulating again");
            self.discarding = false;
        } else if gap_elapsed && !self.buffer.is_empty() {
            log::warn!(
                "Dropping stale telegram of {} bytes that was never taken",
                self.buffer.len()
            );
            self.buffer.clear();
        }

        if self.buffer.len() >= self.max_size {
            log::warn!("Telegram buffer overflow at {} bytes", self.max_size);
            self.buffer.clear();
            self.discarding = true;
            return Err(FramingError::BufferOverflow {
                limit: self.max_size,
            });
        }

        self.buffer.extend_from_slice(&[byte]);
        Ok(())
    }

    /// Append a chunk of bytes that arrived together at `now`.
    ///
    /// Stops at the first overflow; the remaining bytes of the chunk are
    /// dropped as part of the discarded telegram.
    pub fn feed_slice(&mut self, bytes: &[u8], now: Instant) -> Result<(), FramingError> {
        for &byte in bytes {
            self.feed(byte, now)?;
        }
        Ok(())
    }

    /// True iff a telegram is buffered and the line has been idle for longer
    /// than the inactivity timeout.
    pub fn is_complete(&self, now: Instant) -> bool {
        !self.buffer.is_empty() && self.gap_elapsed(now)
    }

    /// Move the buffered telegram out and reset for the next one.
    pub fn take(&mut self) -> BytesMut {
        self.last_arrival = None;
        self.buffer.split()
    }

    /// Discard whatever is buffered.
    pub fn abort(&mut self) {
        self.buffer.clear();
        self.last_arrival = None;
        self.discarding = false;
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    pub fn inactivity_timeout(&self) -> Duration {
        self.inactivity_timeout
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn gap_elapsed(&self, now: Instant) -> bool {
        match self.last_arrival {
            Some(last) => now.saturating_duration_since(last) > self.inactivity_timeout,
            None => false,
        }
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_INACTIVITY_TIMEOUT_MS),
            DEFAULT_MAX_TELEGRAM_SIZE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(100);

    #[test]
    fn test_empty_buffer_never_completes() {
        let acc = FrameAccumulator::new(TIMEOUT, 16);
        assert!(!acc.is_complete(Instant::now() + Duration::from_secs(10)));
    }

    #[test]
    fn test_completion_requires_strictly_longer_gap() {
        let t0 = Instant::now();
        let mut acc = FrameAccumulator::new(TIMEOUT, 16);
        acc.feed(0x68, t0).unwrap();

        assert!(!acc.is_complete(t0 + TIMEOUT));
        assert!(acc.is_complete(t0 + TIMEOUT + Duration::from_millis(1)));
    }

    #[test]
    fn test_take_resets_state() {
        let t0 = Instant::now();
        let mut acc = FrameAccumulator::new(TIMEOUT, 16);
        acc.feed_slice(&[0x68, 0x01, 0x02], t0).unwrap();

        let telegram = acc.take();
        assert_eq!(&telegram[..], &[0x68, 0x01, 0x02]);
        assert!(acc.is_empty());
        assert!(!acc.is_complete(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn test_overflow_discards_until_quiet() {
        let t0 = Instant::now();
        let mut acc = FrameAccumulator::new(TIMEOUT, 4);
        acc.feed_slice(&[1, 2, 3, 4], t0).unwrap();

        assert_eq!(
            acc.feed(5, t0),
            Err(FramingError::BufferOverflow { limit: 4 })
        );
        assert!(acc.is_empty());
        assert!(acc.is_discarding());

        // Still the same burst: dropped
        acc.feed(6, t0 + Duration::from_millis(10)).unwrap();
        assert!(acc.is_empty());

        // After a quiet period a new telegram starts
        let t1 = t0 + Duration::from_millis(500);
        acc.feed(0x68, t1).unwrap();
        assert!(!acc.is_discarding());
        assert_eq!(acc.len(), 1);
    }
}
