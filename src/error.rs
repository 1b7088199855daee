//! # Meter Error Handling
//!
//! This module defines the MeterError enum, which represents the different error
//! types that can occur while turning a raw P1 byte stream into measurements.
//! Every pipeline failure aborts only the telegram being decoded; the kind of
//! failure is available through [`MeterError::kind`].

use crate::dlms::crypto::CryptoError;
use crate::util::hex::HexError;
use serde::Serialize;
use thiserror::Error;

/// Represents the different error types that can occur in the meter crate.
#[derive(Debug, Error)]
pub enum MeterError {
    /// The M-Bus link layer framing is broken.
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    /// The declared DLMS message length disagrees with the received payload.
    #[error("Length error: message declares {declared} bytes, {actual} received")]
    Length { declared: usize, actual: usize },

    /// The DLMS security header is not the supported general-glo-ciphering form.
    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Authenticated decryption failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The plaintext decrypted but does not start like a data notification.
    #[error("Structural error: unexpected plaintext markers 0x{first:02X}/0x{sixth:02X}")]
    Structural { first: u8, sixth: u8 },

    /// The OBIS record stream cannot be decoded.
    #[error("OBIS error: {0}")]
    Obis(#[from] ObisError),

    /// Indicates an error related to the serial port communication.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Indicates an invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A synthetic telegram cannot be represented on the wire.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Indicates an invalid hexadecimal string was provided.
    #[error("Invalid hexadecimal string: {0}")]
    InvalidHex(#[from] HexError),
}

/// Errors of the M-Bus link layer (frame accumulation and reassembly).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("empty telegram")]
    Empty,

    #[error("invalid start byte 0x{found:02X} in frame at offset {offset}")]
    InvalidStartByte { offset: usize, found: u8 },

    #[error("length bytes 0x{first:02X}/0x{second:02X} differ in frame at offset {offset}")]
    LengthMismatch { offset: usize, first: u8, second: u8 },

    #[error("frame at offset {offset} declares {declared} bytes but only {available} remain")]
    Truncated {
        offset: usize,
        declared: usize,
        available: usize,
    },

    #[error("frame at offset {offset} is too short for a header (L = {length})")]
    FrameTooShort { offset: usize, length: u8 },

    #[error("invalid stop byte 0x{found:02X} in frame at offset {offset}")]
    InvalidStopByte { offset: usize, found: u8 },

    #[error("checksum mismatch in frame at offset {offset}: expected 0x{expected:02X}, calculated 0x{calculated:02X}")]
    ChecksumMismatch {
        offset: usize,
        expected: u8,
        calculated: u8,
    },

    #[error("telegram buffer exceeded {limit} bytes")]
    BufferOverflow { limit: usize },

    #[error("frame data of {length} bytes exceeds the {limit}-byte maximum")]
    DataTooLong { length: usize, limit: usize },
}

/// Errors of the DLMS security header.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("payload of {length} bytes is shorter than the {minimum}-byte header")]
    PayloadTooShort { length: usize, minimum: usize },

    #[error("unsupported cipher 0x{0:02X}")]
    UnsupportedCipher(u8),

    #[error("unsupported system title length {0}")]
    UnsupportedSystemTitleLength(u8),

    #[error("unsupported security control byte 0x{0:02X}")]
    UnsupportedSecurityControl(u8),
}

/// Errors of the OBIS record decoder. `offset` is the plaintext position at
/// which decoding stopped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObisError {
    #[error("unsupported OBIS header type 0x{found:02X} at offset {offset}")]
    UnsupportedHeaderType { offset: usize, found: u8 },

    #[error("unsupported OBIS header length {found} at offset {offset}")]
    UnsupportedHeaderLength { offset: usize, found: u8 },

    #[error("unsupported OBIS medium 0x{medium:02X} at offset {offset}")]
    UnsupportedMedium { offset: usize, medium: u8 },

    #[error("unsupported OBIS data type 0x{tag:02X} at offset {offset}")]
    UnsupportedDataType { offset: usize, tag: u8 },

    #[error("record at offset {offset} needs {needed} more bytes than available")]
    UnexpectedEnd { offset: usize, needed: usize },

    #[error("timestamp at offset {offset} has only {length} bytes")]
    InvalidTimestamp { offset: usize, length: usize },
}

/// Coarse classification of a [`MeterError`], used for statistics and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Framing,
    Length,
    Envelope,
    Crypto,
    Structural,
    Obis,
    Transport,
    Config,
}

impl MeterError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeterError::Framing(_) => ErrorKind::Framing,
            MeterError::Length { .. } => ErrorKind::Length,
            MeterError::Envelope(_) => ErrorKind::Envelope,
            MeterError::Crypto(_) => ErrorKind::Crypto,
            MeterError::Structural { .. } => ErrorKind::Structural,
            MeterError::Obis(_) => ErrorKind::Obis,
            MeterError::SerialPortError(_) | MeterError::Io(_) => ErrorKind::Transport,
            MeterError::Config(_) | MeterError::Encoding(_) | MeterError::InvalidHex(_) => {
                ErrorKind::Config
            }
        }
    }

    /// True for errors that only discard the telegram being decoded.
    pub fn is_telegram_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Transport | ErrorKind::Config)
    }
}
