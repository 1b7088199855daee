//! # Synthetic Telegrams
//!
//! Builds telegrams the way a P1 meter sends them: COSEM records are
//! assembled into a data notification, sealed with AES-128-GCM into a
//! general-glo-ciphering envelope and split over M-Bus long frames. Used to
//! exercise the decoder without hardware.
//!
//! ```rust
//! use dlms_meter::simulate::TelegramBuilder;
//! use dlms_meter::{decode_telegram, AesKey, CodeType};
//!
//! let key = AesKey::from_bytes(&[7u8; 16]).unwrap();
//! let raw = TelegramBuilder::new()
//!     .voltage(CodeType::VoltageL1, 230.1)
//!     .build(&key)
//!     .unwrap();
//! let set = decode_telegram(&raw, &key).unwrap();
//! assert_eq!(set.numeric(CodeType::VoltageL1), Some(230.1));
//! ```

use crate::constants::*;
use crate::cosem::data_type::DataType;
use crate::cosem::obis::{CodeType, ObisCode};
use crate::dlms::crypto::AesKey;
use crate::dlms::envelope::seal_envelope;
use crate::error::MeterError;
use crate::mbus::frame::{pack_frames, split_into_frames, MBusFrame};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// COSEM unit enumeration values used in scaler-unit blocks.
pub mod unit {
    pub const WATT: u8 = 0x1B;
    pub const WATT_HOUR: u8 = 0x1E;
    pub const VAR_HOUR: u8 = 0x20;
    pub const AMPERE: u8 = 0x21;
    pub const VOLT: u8 = 0x23;
    pub const COUNT: u8 = 0xFF;
}

const DEFAULT_SYSTEM_TITLE: [u8; DLMS_SYSTEM_TITLE_LENGTH] =
    [0x4B, 0x46, 0x4D, 0x10, 0x20, 0x00, 0x00, 0x01];

const COSEM_DATETIME_LENGTH: usize = 12;
const STRUCTURE_TAG: u8 = 0x02;

/// Encodes a COSEM date-time (12 bytes, no deviation, status OK).
pub fn cosem_datetime(datetime: &NaiveDateTime) -> [u8; COSEM_DATETIME_LENGTH] {
    let year = u16::try_from(datetime.year()).unwrap_or(0xFFFF).to_be_bytes();
    [
        year[0],
        year[1],
        datetime.month() as u8,
        datetime.day() as u8,
        datetime.weekday().number_from_monday() as u8,
        datetime.hour() as u8,
        datetime.minute() as u8,
        datetime.second() as u8,
        0xFF,
        0x80,
        0x00,
        0x00,
    ]
}

fn default_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|date| date.and_hms_opt(12, 0, 5))
        .unwrap_or_default()
}

/// Fluent builder for one telegram.
#[derive(Debug, Clone)]
pub struct TelegramBuilder {
    invoke_id: u32,
    clock: NaiveDateTime,
    records: Vec<u8>,
    record_count: u8,
    system_title: [u8; DLMS_SYSTEM_TITLE_LENGTH],
    frame_counter: u32,
    max_frame_data: usize,
    /// First record that cannot be encoded, reported by every output method
    invalid: Option<String>,
}

impl Default for TelegramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelegramBuilder {
    pub fn new() -> Self {
        Self {
            invoke_id: 1,
            clock: default_clock(),
            records: Vec::new(),
            record_count: 0,
            system_title: DEFAULT_SYSTEM_TITLE,
            frame_counter: 1,
            max_frame_data: MBUS_MAX_FRAME_LENGTH - MBUS_LENGTH_FIELD_OVERHEAD,
            invalid: None,
        }
    }

    /// A telegram carrying every reported quantity, as a three-phase meter
    /// would send it.
    pub fn full_reading(clock: NaiveDateTime) -> Self {
        Self::new()
            .clock(clock)
            .timestamp(clock)
            .voltage(CodeType::VoltageL1, 231.4)
            .voltage(CodeType::VoltageL2, 229.8)
            .voltage(CodeType::VoltageL3, 230.6)
            .current(CodeType::CurrentL1, 1.23)
            .current(CodeType::CurrentL2, 0.45)
            .current(CodeType::CurrentL3, 2.07)
            .double_long_unsigned(CodeType::ActivePowerPlus, 612, unit::WATT)
            .double_long_unsigned(CodeType::ActivePowerMinus, 0, unit::WATT)
            .long_unsigned(CodeType::PowerFactor, 987, Some(0xFD), unit::COUNT)
            .double_long_unsigned(CodeType::ActiveEnergyPlus, 4_412_981, unit::WATT_HOUR)
            .double_long_unsigned(CodeType::ActiveEnergyMinus, 12, unit::WATT_HOUR)
            .double_long_unsigned(CodeType::ReactiveEnergyPlus, 371_120, unit::VAR_HOUR)
            .double_long_unsigned(CodeType::ReactiveEnergyMinus, 1_904_554, unit::VAR_HOUR)
            .serial_number("1KFM0200000001")
            .device_name("KFM1200200000001")
    }

    pub fn system_title(mut self, system_title: [u8; DLMS_SYSTEM_TITLE_LENGTH]) -> Self {
        self.system_title = system_title;
        self
    }

    pub fn frame_counter(mut self, frame_counter: u32) -> Self {
        self.frame_counter = frame_counter;
        self
    }

    pub fn invoke_id(mut self, invoke_id: u32) -> Self {
        self.invoke_id = invoke_id;
        self
    }

    /// Date-time in the notification header.
    pub fn clock(mut self, clock: NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Maximum user data bytes per M-Bus frame.
    pub fn max_frame_data(mut self, max_frame_data: usize) -> Self {
        self.max_frame_data = max_frame_data;
        self
    }

    /// Appends a record verbatim: `09 06 <code> <tag> <value> 02 02`.
    pub fn raw_record(mut self, code: ObisCode, tag: u8, value: &[u8]) -> Self {
        self.push_header(code, tag);
        self.records.extend_from_slice(value);
        self.push_break();
        self
    }

    /// Appends a long-unsigned record, with a scaler-unit block if `scaler`
    /// is given.
    pub fn long_unsigned(mut self, code_type: CodeType, raw: u16, scaler: Option<u8>, unit: u8) -> Self {
        self.push_header(code_type.obis(), DataType::LongUnsigned.tag());
        self.records.extend_from_slice(&raw.to_be_bytes());
        self.push_break();
        if let Some(scaler) = scaler {
            self.push_scaler_unit(scaler, unit);
        }
        self
    }

    pub fn double_long_unsigned(mut self, code_type: CodeType, value: u32, unit: u8) -> Self {
        self.push_header(code_type.obis(), DataType::DoubleLongUnsigned.tag());
        self.records.extend_from_slice(&value.to_be_bytes());
        self.push_break();
        self.push_scaler_unit(0x00, unit);
        self
    }

    /// Appends an octet string record. Values longer than 255 bytes make
    /// every output method fail.
    pub fn octet_string(mut self, code_type: CodeType, value: &[u8]) -> Self {
        let Ok(length) = u8::try_from(value.len()) else {
            self.invalid.get_or_insert_with(|| {
                format!("{code_type} value of {} bytes exceeds 255", value.len())
            });
            return self;
        };
        self.push_header(code_type.obis(), DataType::OctetString.tag());
        self.records.push(length);
        self.records.extend_from_slice(value);
        self.push_break();
        self
    }

    /// Voltage in volts, one decimal.
    pub fn voltage(self, code_type: CodeType, volts: f64) -> Self {
        let raw = (volts * 10.0).round() as u16;
        self.long_unsigned(code_type, raw, Some(SCALER_SINGLE_DIGIT), unit::VOLT)
    }

    /// Current in amperes, two decimals.
    pub fn current(self, code_type: CodeType, amperes: f64) -> Self {
        let raw = (amperes * 100.0).round() as u16;
        self.long_unsigned(code_type, raw, Some(SCALER_DOUBLE_DIGIT), unit::AMPERE)
    }

    pub fn timestamp(self, datetime: NaiveDateTime) -> Self {
        self.octet_string(CodeType::Timestamp, &cosem_datetime(&datetime))
    }

    pub fn serial_number(self, serial: &str) -> Self {
        self.octet_string(CodeType::SerialNumber, serial.as_bytes())
    }

    pub fn device_name(self, name: &str) -> Self {
        self.octet_string(CodeType::DeviceName, name.as_bytes())
    }

    /// The data notification as it looks after decryption.
    pub fn plaintext(&self) -> Result<Vec<u8>, MeterError> {
        if let Some(reason) = &self.invalid {
            return Err(MeterError::Encoding(reason.clone()));
        }
        let mut out = Vec::with_capacity(DECODER_START_OFFSET + self.records.len());
        out.push(COSEM_NOTIFICATION_MARKER);
        out.extend_from_slice(&self.invoke_id.to_be_bytes());
        out.push(COSEM_DATETIME_MARKER);
        out.extend_from_slice(&cosem_datetime(&self.clock));
        out.push(STRUCTURE_TAG);
        out.push(self.record_count);
        out.extend_from_slice(&self.records);
        Ok(out)
    }

    /// The sealed DLMS envelope, i.e. the reassembled M-Bus payload.
    pub fn payload(&self, key: &AesKey) -> Result<Vec<u8>, MeterError> {
        seal_envelope(key, self.system_title, self.frame_counter, &self.plaintext()?)
    }

    pub fn frames(&self, key: &AesKey) -> Result<Vec<MBusFrame>, MeterError> {
        Ok(split_into_frames(&self.payload(key)?, self.max_frame_data))
    }

    /// The raw telegram as it appears on the line.
    pub fn build(&self, key: &AesKey) -> Result<Vec<u8>, MeterError> {
        pack_frames(&self.frames(key)?).map_err(MeterError::from)
    }

    fn push_header(&mut self, code: ObisCode, tag: u8) {
        self.records.push(DataType::OctetString.tag());
        self.records.push(OBIS_CODE_LENGTH as u8);
        self.records.extend_from_slice(code.as_bytes());
        self.records.push(tag);
        self.record_count = self.record_count.wrapping_add(1);
    }

    fn push_break(&mut self) {
        self.records.extend_from_slice(&[STRUCTURE_TAG, 0x02]);
    }

    fn push_scaler_unit(&mut self, scaler: u8, unit: u8) {
        self.records.extend_from_slice(&[
            RECORD_TRAILER_MARKER,
            scaler,
            DataType::Enum.tag(),
            unit,
            STRUCTURE_TAG,
            0x02,
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosem::record::decode_records;

    #[test]
    fn test_plaintext_preamble() {
        let plaintext = TelegramBuilder::new().plaintext().unwrap();
        assert_eq!(plaintext.len(), DECODER_START_OFFSET);
        assert_eq!(plaintext[COSEM_NOTIFICATION_MARKER_OFFSET], COSEM_NOTIFICATION_MARKER);
        assert_eq!(plaintext[COSEM_DATETIME_MARKER_OFFSET], COSEM_DATETIME_MARKER);
        // 2024-03-01 is a Friday
        assert_eq!(plaintext[10], 5);
    }

    #[test]
    fn test_full_reading_decodes_every_quantity() {
        let builder = TelegramBuilder::full_reading(default_clock());
        let set = decode_records(&builder.plaintext().unwrap()).unwrap();
        assert_eq!(set.len(), CodeType::ALL.len());
        assert_eq!(set.numeric(CodeType::CurrentL3), Some(2.07));
        // 0xFD is not a known scaler, the raw value is kept
        assert_eq!(set.numeric(CodeType::PowerFactor), Some(987.0));
        assert_eq!(set.text(CodeType::DeviceName), Some("KFM1200200000001"));
    }

    #[test]
    fn test_build_splits_frames() {
        let key = AesKey::from_bytes(&[1u8; 16]).unwrap();
        let builder = TelegramBuilder::full_reading(default_clock()).max_frame_data(100);
        let frames = builder.frames(&key).unwrap();
        assert!(frames.len() > 1);
        assert!(frames.iter().all(|f| f.data.len() <= 100));
        assert_eq!(
            frames.last().map(|f| f.control_information & MBUS_CONTROL_INFO_FINAL),
            Some(MBUS_CONTROL_INFO_FINAL)
        );
    }

    #[test]
    fn test_oversized_octet_string_is_rejected() {
        let key = AesKey::from_bytes(&[1u8; 16]).unwrap();
        let builder = TelegramBuilder::new()
            .device_name(&"K".repeat(256))
            .voltage(CodeType::VoltageL1, 230.0);
        assert!(matches!(builder.plaintext(), Err(MeterError::Encoding(_))));
        assert!(matches!(builder.build(&key), Err(MeterError::Encoding(_))));

        let builder = TelegramBuilder::new().device_name(&"K".repeat(255));
        assert_eq!(builder.plaintext().unwrap().len(), DECODER_START_OFFSET + 9 + 1 + 255 + 2);
    }
}
