//! # Hex Encoding/Decoding Utilities
//!
//! Hex helpers shared by telegram logging, key provisioning and the CLI.
//! Keys and telegrams are usually copied out of meter portals or serial
//! sniffers, so decoding is tolerant of whitespace and common separators.
//!
//! ```rust
//! use dlms_meter::util::hex::{decode_hex, format_hex_compact};
//!
//! let bytes = decode_hex("68 FA FA 68").unwrap();
//! assert_eq!(format_hex_compact(&bytes), "68 FA FA 68");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to an uppercase hex string without separators.
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode a hex string, ignoring whitespace.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();
    decode_cleaned(&cleaned)
}

/// Decode a hex string, dropping every character that is not a hex digit.
///
/// Accepts dumps such as `68:FA:FA:68` or `0x68, 0xFA` as long as the `0x`
/// prefixes are stripped first.
pub fn parse_hex_lenient(input: &str) -> Result<Vec<u8>, HexError> {
    let without_prefixes = input.replace("0x", "").replace("0X", "");
    let cleaned: String = without_prefixes
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .collect();
    decode_cleaned(&cleaned)
}

fn decode_cleaned(cleaned: &str) -> Result<Vec<u8>, HexError> {
    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }
    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }
    hex::decode(cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format data as "68 FA FA 68" for single-line logs.
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Multi-line dump with offsets, used for trace-level telegram logging.
pub fn pretty_hex(data: &[u8], bytes_per_line: usize) -> String {
    let width = bytes_per_line.max(1);
    data.chunks(width)
        .enumerate()
        .map(|(line, chunk)| format!("{:04X}: {}", line * width, format_hex_compact(chunk)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_with_whitespace() {
        assert_eq!(
            decode_hex("68 fa\nFA 68").unwrap(),
            vec![0x68, 0xFA, 0xFA, 0x68]
        );
    }

    #[test]
    fn test_encode_is_uppercase() {
        assert_eq!(encode_hex(&[0xDB, 0x08, 0x4B]), "DB084B");
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(
            parse_hex_lenient("0x68, 0xFA:fa-68").unwrap(),
            vec![0x68, 0xFA, 0xFA, 0x68]
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(decode_hex(""), Err(HexError::EmptyString));
        assert_eq!(decode_hex("681"), Err(HexError::OddLength(3)));
        assert!(matches!(decode_hex("GG"), Err(HexError::DecodeError(_))));
    }

    #[test]
    fn test_pretty_hex_lines() {
        let data: Vec<u8> = (0u8..20).collect();
        let dump = pretty_hex(&data, 16);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0000: 00 01"));
        assert!(lines[1].starts_with("0010: 10 11 12 13"));
    }
}
