//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use dlms_meter::simulate::TelegramBuilder;
use dlms_meter::{AesKey, CodeType, DlmsMeter, MeasurementSet};

pub const KEY_HEX: &str = "36C66639E48A8CA4D6BC8B282A793BBB";

pub fn key() -> AesKey {
    AesKey::from_hex(KEY_HEX).unwrap()
}

pub fn wrong_key() -> AesKey {
    AesKey::from_bytes(&[0xAA; 16]).unwrap()
}

pub fn clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(12, 0, 5)
        .unwrap()
}

pub const CLOCK_TEXT: &str = "2024-03-01T12:00:05Z";

/// Timestamp record followed by a scaled voltage record.
pub fn voltage_and_timestamp() -> TelegramBuilder {
    TelegramBuilder::new()
        .clock(clock())
        .timestamp(clock())
        .voltage(CodeType::VoltageL1, 231.7)
}

/// Raw single-frame telegram of [`voltage_and_timestamp`].
pub fn single_frame_telegram() -> Vec<u8> {
    voltage_and_timestamp().build(&key()).unwrap()
}

pub fn collecting_meter() -> DlmsMeter<Vec<MeasurementSet>> {
    DlmsMeter::new(key(), Vec::new())
}
