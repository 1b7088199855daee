//! # Utility Modules
//!
//! Hex encoding/decoding and logging helpers used throughout the crate.

pub mod hex;
pub mod logging;

pub use hex::{decode_hex, encode_hex, format_hex_compact, parse_hex_lenient, pretty_hex, HexError};
pub use logging::{log_frame_hex, ErrorThrottle, LogThrottle};
