//! # Telegram Statistics
//!
//! Counts how many telegrams the meter produced and why the discarded ones
//! were discarded. A healthy line shows `decoded == received`; a wrong key
//! shows up as a steady stream of `crypto` errors, a noisy line as `framing`.

use crate::error::{ErrorKind, MeterError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::SystemTime;

#[derive(Debug, Clone, Default)]
pub struct TelegramStats {
    /// Telegrams handed to the decoder
    pub received: u64,
    /// Telegrams that produced a measurement set
    pub decoded: u64,
    errors: BTreeMap<ErrorKind, u64>,
    pub last_decoded: Option<SystemTime>,
    pub last_error: Option<String>,
}

impl TelegramStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&mut self) {
        self.received += 1;
    }

    pub fn record_success(&mut self) {
        self.decoded += 1;
        self.last_decoded = Some(SystemTime::now());
    }

    pub fn record_error(&mut self, error: &MeterError) {
        *self.errors.entry(error.kind()).or_insert(0) += 1;
        self.last_error = Some(error.to_string());
    }

    pub fn error_count(&self, kind: ErrorKind) -> u64 {
        self.errors.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_errors(&self) -> u64 {
        self.errors.values().sum()
    }

    /// Percentage of received telegrams that decoded.
    pub fn success_rate(&self) -> f64 {
        if self.received == 0 {
            return 100.0;
        }
        (self.decoded as f64 / self.received as f64) * 100.0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Export statistics as JSON-serializable struct
    pub fn export(&self) -> TelegramStatsExport {
        TelegramStatsExport {
            received: self.received,
            decoded: self.decoded,
            success_rate: self.success_rate(),
            error_counts: self.errors.clone(),
            last_decoded: self.last_decoded,
            last_error: self.last_error.clone(),
        }
    }
}

/// Exportable telegram statistics (for serialization)
#[derive(Debug, Clone, Serialize)]
pub struct TelegramStatsExport {
    pub received: u64,
    pub decoded: u64,
    pub success_rate: f64,
    pub error_counts: BTreeMap<ErrorKind, u64>,
    pub last_decoded: Option<SystemTime>,
    pub last_error: Option<String>,
}
