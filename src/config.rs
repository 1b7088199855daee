//! # Meter Configuration
//!
//! Settings for one meter connection, loaded from a JSON file and optionally
//! overridden from the command line:
//!
//! ```json
//! {
//!   "port": "/dev/ttyUSB0",
//!   "baudrate": 2400,
//!   "parity": "even",
//!   "inactivity_timeout_ms": 100,
//!   "key": "36C66639E48A8CA4D6BC8B282A793BBB",
//!   "topic": "meter/main"
//! }
//! ```

use crate::constants::{AES_KEY_LENGTH, DEFAULT_INACTIVITY_TIMEOUT_MS, DEFAULT_MAX_TELEGRAM_SIZE};
use crate::dlms::crypto::AesKey;
use crate::error::MeterError;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

/// Accepted inactivity timeouts in milliseconds.
pub const INACTIVITY_TIMEOUT_RANGE_MS: RangeInclusive<u64> = 10..=5000;

/// Serial parity. P1 ports on DLMS meters run 8E1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    #[default]
    Even,
    Odd,
}

impl std::str::FromStr for Parity {
    type Err = MeterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Parity::None),
            "even" | "e" => Ok(Parity::Even),
            "odd" | "o" => Ok(Parity::Odd),
            other => Err(MeterError::Config(format!("unknown parity '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Serial device, e.g. `/dev/ttyUSB0`
    pub port: Option<String>,

    #[serde(default = "MeterConfig::default_baudrate")]
    pub baudrate: u32,

    #[serde(default)]
    pub parity: Parity,

    #[serde(default = "MeterConfig::default_inactivity_timeout_ms")]
    pub inactivity_timeout_ms: u64,

    #[serde(default = "MeterConfig::default_max_telegram_size")]
    pub max_telegram_size: usize,

    /// AES-128 key as 32 hex characters
    pub key: Option<String>,

    #[serde(default)]
    pub verify_checksums: bool,

    /// Label carried into JSON output
    pub topic: Option<String>,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            port: None,
            baudrate: Self::default_baudrate(),
            parity: Parity::default(),
            inactivity_timeout_ms: Self::default_inactivity_timeout_ms(),
            max_telegram_size: Self::default_max_telegram_size(),
            key: None,
            verify_checksums: false,
            topic: None,
        }
    }
}

impl MeterConfig {
    /// Reads and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MeterError> {
        let path = path.as_ref();
        log::info!("Reading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|err| {
            MeterError::Config(format!("error reading {}: {err}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, MeterError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|err| MeterError::Config(format!("invalid configuration: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MeterError> {
        if !INACTIVITY_TIMEOUT_RANGE_MS.contains(&self.inactivity_timeout_ms) {
            return Err(MeterError::Config(format!(
                "inactivity_timeout_ms {} outside {}..={}",
                self.inactivity_timeout_ms,
                INACTIVITY_TIMEOUT_RANGE_MS.start(),
                INACTIVITY_TIMEOUT_RANGE_MS.end()
            )));
        }
        if self.max_telegram_size == 0 {
            return Err(MeterError::Config("max_telegram_size must be positive".into()));
        }
        if self.baudrate == 0 {
            return Err(MeterError::Config("baudrate must be positive".into()));
        }
        if self.key.is_some() {
            self.aes_key()?;
        }
        Ok(())
    }

    /// Parses the configured key.
    pub fn aes_key(&self) -> Result<AesKey, MeterError> {
        let key = self
            .key
            .as_deref()
            .ok_or_else(|| MeterError::Config("no decryption key configured".into()))?;
        AesKey::from_hex(key).map_err(|err| {
            MeterError::Config(format!(
                "key must be {} hex characters: {err}",
                AES_KEY_LENGTH * 2
            ))
        })
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }

    fn default_baudrate() -> u32 {
        2400
    }

    fn default_inactivity_timeout_ms() -> u64 {
        DEFAULT_INACTIVITY_TIMEOUT_MS
    }

    fn default_max_telegram_size() -> usize {
        DEFAULT_MAX_TELEGRAM_SIZE
    }
}
