//! # Poll-Driven Meter
//!
//! [`DlmsMeter`] ties the stages together for a live line. The caller drains
//! whatever bytes the transport has and passes them to [`DlmsMeter::poll`]
//! together with the current time; once the line has been quiet for the
//! inactivity timeout the buffered telegram is decoded and its measurements
//! handed to the sink.
//!
//! Exactly one telegram is in flight. A failing telegram is reported, counted
//! and dropped; the meter sends a fresh one on its own cadence.
//!
//! ```rust
//! use dlms_meter::{AesKey, DlmsMeter, MeasurementSet};
//! use std::time::{Duration, Instant};
//!
//! let key = AesKey::from_bytes(&[0u8; 16]).unwrap();
//! let mut meter = DlmsMeter::new(key, Vec::<MeasurementSet>::new());
//! let start = Instant::now();
//! meter.poll(&[0x68, 0x00], start);
//! // Nothing happens until the line has been idle for the timeout
//! assert_eq!(meter.poll(&[], start + Duration::from_millis(50)), 0);
//! ```

use crate::config::MeterConfig;
use crate::decoder::TelegramDecoder;
use crate::dlms::crypto::AesKey;
use crate::error::MeterError;
use crate::mbus::accumulator::FrameAccumulator;
use crate::sink::MeasurementSink;
use crate::stats::TelegramStats;
use crate::util::logging::ErrorThrottle;
use bytes::BytesMut;
use std::time::Instant;

pub struct DlmsMeter<S> {
    accumulator: FrameAccumulator,
    decoder: TelegramDecoder,
    sink: S,
    stats: TelegramStats,
    throttle: ErrorThrottle,
}

impl<S: MeasurementSink> DlmsMeter<S> {
    /// Meter with the default inactivity timeout and buffer size.
    pub fn new(key: AesKey, sink: S) -> Self {
        Self::with_parts(FrameAccumulator::default(), TelegramDecoder::new(key), sink)
    }

    pub fn with_parts(accumulator: FrameAccumulator, decoder: TelegramDecoder, sink: S) -> Self {
        Self {
            accumulator,
            decoder,
            sink,
            stats: TelegramStats::new(),
            throttle: ErrorThrottle::default(),
        }
    }

    pub fn from_config(config: &MeterConfig, sink: S) -> Result<Self, MeterError> {
        config.validate()?;
        let accumulator =
            FrameAccumulator::new(config.inactivity_timeout(), config.max_telegram_size);
        let decoder = TelegramDecoder::new(config.aes_key()?)
            .with_checksum_verification(config.verify_checksums);
        Ok(Self::with_parts(accumulator, decoder, sink))
    }

    /// Feeds bytes that arrived by `now` and decodes any telegram completed
    /// by the inactivity timeout. Returns the number of telegrams processed.
    pub fn poll(&mut self, bytes: &[u8], now: Instant) -> usize {
        let mut processed = 0;
        for &byte in bytes {
            if self.accumulator.is_complete(now) {
                processed += self.process_pending();
            }
            if let Err(err) = self.accumulator.feed(byte, now) {
                self.stats.record_received();
                self.handle_error(err.into());
            }
        }
        if self.accumulator.is_complete(now) {
            processed += self.process_pending();
        }
        processed
    }

    /// Decodes whatever is buffered without waiting for the timeout, e.g.
    /// when the transport reached end of file.
    pub fn flush(&mut self) -> usize {
        if self.accumulator.is_empty() {
            return 0;
        }
        self.process_pending()
    }

    /// Discards the telegram currently being accumulated.
    pub fn abort(&mut self) {
        self.accumulator.abort();
    }

    /// Replaces the decryption key for every following telegram.
    pub fn set_key(&mut self, key: AesKey) {
        self.decoder.set_key(key);
    }

    pub fn stats(&self) -> &TelegramStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn accumulator(&self) -> &FrameAccumulator {
        &self.accumulator
    }

    fn process_pending(&mut self) -> usize {
        let raw = self.accumulator.take();
        self.process(raw);
        1
    }

    fn process(&mut self, raw: BytesMut) {
        self.stats.record_received();
        log::debug!("Telegram of {} bytes complete", raw.len());

        match self.decoder.decode(&raw) {
            Ok(measurements) => {
                self.stats.record_success();
                log::info!("Decoded telegram with {} quantities", measurements.len());
                if let Err(err) = self.sink.deliver(&measurements) {
                    log::warn!("Sink rejected measurements: {err}");
                }
            }
            Err(err) => self.handle_error(err),
        }
    }

    fn handle_error(&mut self, err: MeterError) {
        let kind = err.kind();
        self.stats.record_error(&err);
        if self.throttle.allow(kind) {
            log::error!("Telegram discarded ({kind:?}): {err}");
        }
        self.sink.report_error(&err);
    }
}
