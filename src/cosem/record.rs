//! # COSEM Record Decoder
//!
//! After decryption the plaintext is a data notification:
//!
//! ```text
//! 0F | invoke id (4) | 0C date-time (12) | 02 n | record | record | ...
//! ```
//!
//! Records start at [`DECODER_START_OFFSET`]. Each one is
//!
//! ```text
//! 09 06 | OBIS A..F | type | value | break (2) [| 0F scaler 16 unit 02 02]
//! ```
//!
//! and the decoder walks them with a single cursor. Every read is bounds
//! checked; the first unsupported or truncated field aborts the whole
//! telegram and nothing decoded so far is returned.

use crate::constants::*;
use crate::cosem::data_type::DataType;
use crate::cosem::obis::{CodeType, Medium, ObisCode};
use crate::error::ObisError;
use crate::measurement::{MeasurementSet, MeasurementValue};

/// Decimal scaling of a long-unsigned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Unit,
    Tenths,
    Hundredths,
}

impl Scale {
    /// Interprets the byte found at the scaler position. Anything but the
    /// two known exponents, including a missing byte, means no scaling.
    pub fn from_scaler(byte: Option<u8>) -> Self {
        match byte {
            Some(SCALER_SINGLE_DIGIT) => Scale::Tenths,
            Some(SCALER_DOUBLE_DIGIT) => Scale::Hundredths,
            _ => Scale::Unit,
        }
    }

    pub fn apply(self, raw: f64) -> f64 {
        match self {
            Scale::Unit => raw,
            Scale::Tenths => raw / 10.0,
            Scale::Hundredths => raw / 100.0,
        }
    }
}

/// Value of one record as it appeared on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    DoubleLongUnsigned(u32),
    LongUnsigned { raw: u16, scale: Scale },
    OctetString(Vec<u8>),
}

/// One decoded record.
#[derive(Debug, Clone, PartialEq)]
pub struct ObisRecord {
    /// Plaintext offset of the record's type tag
    pub offset: usize,
    pub code: ObisCode,
    pub medium: Medium,
    /// `None` for codes that are valid but not reported
    pub code_type: Option<CodeType>,
    pub data_type: DataType,
    pub value: RecordValue,
}

impl ObisRecord {
    /// Converts the record into the value reported to the sink.
    pub fn measurement(&self) -> Option<(CodeType, MeasurementValue)> {
        let code_type = self.code_type?;
        let value = match &self.value {
            RecordValue::DoubleLongUnsigned(value) => MeasurementValue::Numeric(f64::from(*value)),
            RecordValue::LongUnsigned { raw, scale } => {
                MeasurementValue::Numeric(scale.apply(f64::from(*raw)))
            }
            RecordValue::OctetString(bytes) if code_type == CodeType::Timestamp => {
                MeasurementValue::Text(format_timestamp(bytes)?)
            }
            RecordValue::OctetString(bytes) => {
                MeasurementValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        };
        Some((code_type, value))
    }
}

/// Formats a COSEM date-time octet string as `YYYY-MM-DDThh:mm:ssZ`.
///
/// Layout: year (2, big-endian), month, day, day of week, hour, minute,
/// second. Returns `None` if fewer than eight bytes are given.
pub fn format_timestamp(bytes: &[u8]) -> Option<String> {
    if bytes.len() < TIMESTAMP_MIN_LENGTH {
        return None;
    }
    let year = u16::from_be_bytes([bytes[0], bytes[1]]);
    Some(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year, bytes[2], bytes[3], bytes[5], bytes[6], bytes[7]
    ))
}

fn read(plaintext: &[u8], offset: usize, len: usize) -> Result<&[u8], ObisError> {
    let end = offset.checked_add(len).ok_or(ObisError::UnexpectedEnd {
        offset,
        needed: len,
    })?;
    plaintext.get(offset..end).ok_or(ObisError::UnexpectedEnd {
        offset,
        needed: end - plaintext.len().max(offset).min(end),
    })
}

fn read_u8(plaintext: &[u8], offset: usize) -> Result<u8, ObisError> {
    Ok(read(plaintext, offset, 1)?[0])
}

/// Decodes the record whose type tag sits at `offset`.
///
/// Returns the record and the offset of the next one.
pub fn decode_record_at(plaintext: &[u8], offset: usize) -> Result<(ObisRecord, usize), ObisError> {
    let header_type = read_u8(plaintext, offset + OBIS_TYPE_OFFSET)?;
    if header_type != DataType::OctetString.tag() {
        return Err(ObisError::UnsupportedHeaderType {
            offset,
            found: header_type,
        });
    }

    let header_length = read_u8(plaintext, offset + OBIS_LENGTH_OFFSET)?;
    if header_length as usize != OBIS_CODE_LENGTH {
        return Err(ObisError::UnsupportedHeaderLength {
            offset: offset + OBIS_LENGTH_OFFSET,
            found: header_length,
        });
    }

    let code_offset = offset + OBIS_CODE_OFFSET;
    let mut code = [0u8; OBIS_CODE_LENGTH];
    code.copy_from_slice(read(plaintext, code_offset, OBIS_CODE_LENGTH)?);
    let code = ObisCode(code);

    let tag_offset = code_offset + OBIS_CODE_LENGTH;
    let tag = read_u8(plaintext, tag_offset)?;
    let mut cursor = tag_offset + 1;

    let medium = match code.medium() {
        Some(medium @ (Medium::Abstract | Medium::Electricity)) => medium,
        _ => {
            return Err(ObisError::UnsupportedMedium {
                offset: code_offset,
                medium: code.a(),
            })
        }
    };
    let code_type = CodeType::classify(medium, code.c(), code.d());
    match code_type {
        Some(code_type) => log::debug!("OBIS {code} at {offset}: {code_type}"),
        None => log::warn!("Unknown OBIS code {code} at offset {offset}, value ignored"),
    }

    let data_type = DataType::from_tag(tag)
        .filter(|data_type| data_type.is_decodable())
        .ok_or(ObisError::UnsupportedDataType {
            offset: tag_offset,
            tag,
        })?;

    let (value, value_len) = match data_type {
        DataType::DoubleLongUnsigned => {
            let bytes = read(plaintext, cursor, 4)?;
            let value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            (RecordValue::DoubleLongUnsigned(value), 4)
        }
        DataType::LongUnsigned => {
            let bytes = read(plaintext, cursor, 2)?;
            let raw = u16::from_be_bytes([bytes[0], bytes[1]]);
            let scale = Scale::from_scaler(plaintext.get(cursor + SCALER_OFFSET).copied());
            (RecordValue::LongUnsigned { raw, scale }, 2)
        }
        DataType::OctetString => {
            let length = read_u8(plaintext, cursor)? as usize;
            cursor += 1;
            let bytes = read(plaintext, cursor, length)?;
            if code_type == Some(CodeType::Timestamp) && length < TIMESTAMP_MIN_LENGTH {
                return Err(ObisError::InvalidTimestamp {
                    offset: cursor,
                    length,
                });
            }
            (RecordValue::OctetString(bytes.to_vec()), length)
        }
        _ => {
            return Err(ObisError::UnsupportedDataType {
                offset: tag_offset,
                tag,
            })
        }
    };

    cursor += value_len;
    read(plaintext, cursor, RECORD_BREAK_LENGTH)?;
    cursor += RECORD_BREAK_LENGTH;
    if plaintext.get(cursor) == Some(&RECORD_TRAILER_MARKER) {
        read(plaintext, cursor, RECORD_TRAILER_LENGTH)?;
        cursor += RECORD_TRAILER_LENGTH;
    }

    let record = ObisRecord {
        offset,
        code,
        medium,
        code_type,
        data_type,
        value,
    };
    Ok((record, cursor))
}

/// Decodes every record of a validated plaintext.
pub fn decode_record_list(plaintext: &[u8]) -> Result<Vec<ObisRecord>, ObisError> {
    if plaintext.len() < DECODER_START_OFFSET {
        return Err(ObisError::UnexpectedEnd {
            offset: plaintext.len(),
            needed: DECODER_START_OFFSET - plaintext.len(),
        });
    }
    let mut records = Vec::new();
    let mut cursor = DECODER_START_OFFSET;
    while cursor < plaintext.len() {
        let (record, next) = decode_record_at(plaintext, cursor)?;
        records.push(record);
        cursor = next;
    }
    Ok(records)
}

/// Decodes every record and collects the reported quantities.
pub fn decode_records(plaintext: &[u8]) -> Result<MeasurementSet, ObisError> {
    let mut set = MeasurementSet::new();
    for record in decode_record_list(plaintext)? {
        if let Some((code_type, value)) = record.measurement() {
            if set.insert(code_type, value).is_some() {
                log::debug!("{code_type} repeated in telegram, keeping the last value");
            }
        }
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREAMBLE: [u8; 20] = [
        0x0F, 0x00, 0x00, 0x00, 0x01, 0x0C, 0x07, 0xE8, 0x03, 0x01, 0x05, 0x0C, 0x00, 0x05, 0x00,
        0xFF, 0x88, 0x80, 0x02, 0x02,
    ];

    fn plaintext(records: &[&[u8]]) -> Vec<u8> {
        let mut out = PREAMBLE.to_vec();
        for record in records {
            out.extend_from_slice(record);
        }
        out
    }

    const VOLTAGE_L1: [u8; 19] = [
        0x09, 0x06, 0x01, 0x00, 0x20, 0x07, 0x00, 0xFF, 0x12, 0x09, 0x06, 0x02, 0x02, 0x0F, 0xFF,
        0x16, 0x23, 0x02, 0x02,
    ];

    #[test]
    fn test_scaled_voltage() {
        // 0x0906 = 2310 -> 231.0 V
        let data = plaintext(&[&VOLTAGE_L1[..]]);
        let set = decode_records(&data).unwrap();
        assert_eq!(set.numeric(CodeType::VoltageL1), Some(231.0));
    }

    #[test]
    fn test_scaler_without_known_exponent() {
        let mut record = VOLTAGE_L1[..].to_vec();
        record[14] = 0x00;
        let set = decode_records(&plaintext(&[&record])).unwrap();
        assert_eq!(set.numeric(CodeType::VoltageL1), Some(2310.0));
    }

    #[test]
    fn test_scaler_past_end_is_unscaled() {
        // trailing block missing entirely; peek for the scaler runs out of bounds
        let record = &VOLTAGE_L1[..13];
        let set = decode_records(&plaintext(&[record])).unwrap();
        assert_eq!(set.numeric(CodeType::VoltageL1), Some(2310.0));
    }

    #[test]
    fn test_timestamp_record() {
        let record = [
            0x09, 0x06, 0x00, 0x00, 0x01, 0x00, 0x00, 0xFF, 0x09, 0x0C, 0x07, 0xE8, 0x03, 0x01,
            0x05, 0x0C, 0x00, 0x05, 0x00, 0xFF, 0x88, 0x80, 0x02, 0x02,
        ];
        let set = decode_records(&plaintext(&[&record])).unwrap();
        assert_eq!(set.timestamp(), Some("2024-03-01T12:00:05Z"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_short_timestamp_rejected() {
        let record = [
            0x09, 0x06, 0x00, 0x00, 0x01, 0x00, 0x00, 0xFF, 0x09, 0x04, 0x07, 0xE8, 0x03, 0x01,
            0x02, 0x02,
        ];
        assert_eq!(
            decode_records(&plaintext(&[&record])),
            Err(ObisError::InvalidTimestamp {
                offset: 30,
                length: 4
            })
        );
    }

    #[test]
    fn test_unknown_code_is_skipped() {
        let unknown = [
            0x09, 0x06, 0x01, 0x00, 0x63, 0x63, 0x00, 0xFF, 0x06, 0x00, 0x00, 0x00, 0x07, 0x02,
            0x02,
        ];
        let energy = [
            0x09, 0x06, 0x01, 0x00, 0x01, 0x08, 0x00, 0xFF, 0x06, 0x00, 0x01, 0xE2, 0x40, 0x02,
            0x02,
        ];
        let set = decode_records(&plaintext(&[&unknown, &energy])).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.numeric(CodeType::ActiveEnergyPlus), Some(123_456.0));
    }

    #[test]
    fn test_unsupported_data_type_reports_tag_offset() {
        let record = [
            0x09, 0x06, 0x01, 0x00, 0x20, 0x07, 0x00, 0xFF, 0x17, 0x00, 0x00, 0x00, 0x00, 0x02,
            0x02,
        ];
        assert_eq!(
            decode_records(&plaintext(&[&record])),
            Err(ObisError::UnsupportedDataType {
                offset: 28,
                tag: 0x17
            })
        );
    }

    #[test]
    fn test_header_errors() {
        let mut record = VOLTAGE_L1[..].to_vec();
        record[0] = 0x0A;
        assert!(matches!(
            decode_records(&plaintext(&[&record])),
            Err(ObisError::UnsupportedHeaderType { offset: 20, found: 0x0A })
        ));

        let mut record = VOLTAGE_L1[..].to_vec();
        record[1] = 0x05;
        assert!(matches!(
            decode_records(&plaintext(&[&record])),
            Err(ObisError::UnsupportedHeaderLength { found: 5, .. })
        ));

        let mut record = VOLTAGE_L1[..].to_vec();
        record[2] = 0x07;
        assert!(matches!(
            decode_records(&plaintext(&[&record])),
            Err(ObisError::UnsupportedMedium { offset: 22, medium: 0x07 })
        ));
    }

    #[test]
    fn test_truncated_value() {
        let record = &VOLTAGE_L1[..10];
        assert!(matches!(
            decode_records(&plaintext(&[record])),
            Err(ObisError::UnexpectedEnd { offset: 29, needed: 1 })
        ));
    }

    #[test]
    fn test_missing_break_is_truncation() {
        // value present, record break cut off
        let record = &VOLTAGE_L1[..11];
        assert_eq!(
            decode_records(&plaintext(&[record])),
            Err(ObisError::UnexpectedEnd {
                offset: 31,
                needed: 2
            })
        );

        let record = &VOLTAGE_L1[..12];
        assert_eq!(
            decode_records(&plaintext(&[record])),
            Err(ObisError::UnexpectedEnd {
                offset: 31,
                needed: 1
            })
        );
    }

    #[test]
    fn test_cut_trailer_is_truncation() {
        let record = &VOLTAGE_L1[..16];
        assert_eq!(
            decode_records(&plaintext(&[record])),
            Err(ObisError::UnexpectedEnd {
                offset: 33,
                needed: 3
            })
        );
    }

    #[test]
    fn test_plaintext_shorter_than_preamble() {
        assert_eq!(
            decode_records(&PREAMBLE[..6]),
            Err(ObisError::UnexpectedEnd {
                offset: 6,
                needed: 14
            })
        );
        assert!(decode_record_list(&[]).is_err());
    }

    #[test]
    fn test_preamble_only_is_empty() {
        assert!(decode_records(&PREAMBLE).unwrap().is_empty());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(&[0x07, 0xE7, 12, 31, 7, 23, 59, 58]).as_deref(),
            Some("2023-12-31T23:59:58Z")
        );
        assert_eq!(format_timestamp(&[0x07, 0xE7]), None);
    }
}
