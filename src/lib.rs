//! # dlms-meter - Decoder for encrypted DLMS/COSEM smart meter telegrams
//!
//! Smart meters with a P1 customer interface (Kaifa, Sagemcom and others
//! rolled out by European grid operators) push a reading every few seconds.
//! Each reading is a DLMS data notification, encrypted with AES-128-GCM under
//! a key handed out by the operator, and carried in one or more wired M-Bus
//! long frames.
//!
//! ## Pipeline
//!
//! - [`mbus::accumulator`] splits the byte stream into telegrams by line silence
//! - [`mbus::frame`] validates and reassembles the M-Bus long frames
//! - [`dlms::envelope`] parses the general-glo-ciphering header and decrypts
//! - [`cosem::record`] walks the OBIS records into a [`MeasurementSet`]
//! - a [`MeasurementSink`] receives the result
//!
//! [`DlmsMeter`] wires these together for a live line; [`decode_telegram`]
//! decodes one complete telegram.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! dlms-meter = "0.9.0"
//! ```
//!
//! ```rust
//! use dlms_meter::{
//!     decode_telegram, AesKey, CodeType, DlmsMeter, MeasurementSet, MeterError,
//!     simulate::TelegramBuilder,
//! };
//!
//! let key = AesKey::from_hex("000102030405060708090A0B0C0D0E0F").unwrap();
//! let raw = TelegramBuilder::new()
//!     .current(CodeType::CurrentL1, 1.5)
//!     .build(&key)
//!     .unwrap();
//! let set = decode_telegram(&raw, &key).unwrap();
//! assert_eq!(set.numeric(CodeType::CurrentL1), Some(1.5));
//! ```

pub mod config;
pub mod constants;
pub mod cosem;
pub mod decoder;
pub mod dlms;
pub mod error;
pub mod logging;
pub mod mbus;
pub mod measurement;
pub mod meter;
pub mod simulate;
pub mod sink;
pub mod stats;
pub mod util;

pub use crate::error::{EnvelopeError, ErrorKind, FramingError, MeterError, ObisError};
pub use crate::logging::init_logger;

pub use config::MeterConfig;
pub use cosem::{CodeType, Medium, ObisCode, ObisRecord};
pub use decoder::TelegramDecoder;
pub use dlms::{AesKey, CryptoError, DlmsEnvelope, HeaderLayout};
pub use mbus::{FrameAccumulator, MBusFrame, MeterReader};
pub use measurement::{MeasurementSet, MeasurementValue};
pub use meter::DlmsMeter;
pub use sink::{JsonSink, LogSink, MeasurementSink};
pub use stats::TelegramStats;

/// Decode one complete raw telegram.
///
/// # Arguments
/// * `raw` - Telegram bytes as received, one or more M-Bus long frames
/// * `key` - AES-128 key of the meter
///
/// # Returns
/// * `Ok(MeasurementSet)` - Quantities carried by the telegram
/// * `Err(MeterError)` - The stage that rejected the telegram
pub fn decode_telegram(raw: &[u8], key: &AesKey) -> Result<MeasurementSet, MeterError> {
    TelegramDecoder::new(key.clone()).decode(raw)
}
