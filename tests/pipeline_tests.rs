//! End-to-end decoding of synthetic telegrams: framing, envelope, decryption
//! and records together.

mod common;

use common::*;
use dlms_meter::constants::{
    DLMS_LENGTH_EXTENDED, DLMS_LENGTH_OFFSET, MBUS_FULL_HEADER_LENGTH, MBUS_LENGTH2_OFFSET,
};
use dlms_meter::cosem::{decode_records, DataType};
use dlms_meter::mbus::frame::{pack_telegram, parse_frames};
use dlms_meter::simulate::TelegramBuilder;
use dlms_meter::{
    decode_telegram, CodeType, CryptoError, FramingError, MeasurementValue, MeterError, ObisError,
};
use proptest::prelude::*;

#[test]
fn test_single_frame_voltage_and_timestamp() {
    let raw = single_frame_telegram();
    assert_eq!(parse_frames(&raw, true).unwrap().len(), 1);

    let set = decode_telegram(&raw, &key()).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.numeric(CodeType::VoltageL1), Some(231.7));
    assert_eq!(set.timestamp(), Some(CLOCK_TEXT));
    assert!(set.get(CodeType::CurrentL1).is_none());
}

#[test]
fn test_split_inside_record_matches_single_frame() {
    // Payload offset 61 is the voltage record's type tag (16 header bytes +
    // plaintext offset 45); 69 falls after its OBIS code, before the value.
    let builder = voltage_and_timestamp();
    let split = builder.clone().max_frame_data(69).build(&key()).unwrap();
    assert_eq!(parse_frames(&split, false).unwrap().len(), 2);

    let expected = decode_telegram(&builder.build(&key()).unwrap(), &key()).unwrap();
    assert_eq!(decode_telegram(&split, &key()).unwrap(), expected);
}

#[test]
fn test_extended_length_envelope() {
    let builder = TelegramBuilder::full_reading(clock());
    let payload = builder.payload(&key()).unwrap();
    assert_eq!(payload[DLMS_LENGTH_OFFSET], DLMS_LENGTH_EXTENDED);

    let set = decode_telegram(&builder.build(&key()).unwrap(), &key()).unwrap();
    assert_eq!(set.len(), CodeType::ALL.len());
    assert_eq!(set.numeric(CodeType::VoltageL2), Some(229.8));
    assert_eq!(set.numeric(CodeType::CurrentL1), Some(1.23));
    assert_eq!(set.numeric(CodeType::ActiveEnergyPlus), Some(4_412_981.0));
    assert_eq!(set.numeric(CodeType::ReactiveEnergyMinus), Some(1_904_554.0));
    assert_eq!(set.text(CodeType::SerialNumber), Some("1KFM0200000001"));
    assert_eq!(set.timestamp(), Some(CLOCK_TEXT));
}

#[test]
fn test_wrong_key_is_crypto_error() {
    let err = decode_telegram(&single_frame_telegram(), &wrong_key()).unwrap_err();
    assert!(matches!(err, MeterError::Crypto(CryptoError::AuthenticationFailed)));
}

#[test]
fn test_length_mismatch_detected_before_decryption() {
    let mut payload = voltage_and_timestamp().payload(&key()).unwrap();
    let declared = payload[DLMS_LENGTH_OFFSET] as usize;
    payload[DLMS_LENGTH_OFFSET] += 1;
    let raw = pack_telegram(&payload, 245).unwrap();

    // Same result with either key: decryption is never attempted
    for key in [key(), wrong_key()] {
        match decode_telegram(&raw, &key) {
            Err(MeterError::Length { declared: d, actual }) => {
                assert_eq!(d, declared + 1);
                assert_eq!(actual, declared);
            }
            other => panic!("expected length error, got {other:?}"),
        }
    }
}

#[test]
fn test_unsupported_data_type_reports_offset() {
    let builder = TelegramBuilder::new()
        .raw_record(CodeType::VoltageL1.obis(), DataType::Float32.tag(), &[0x43, 0x67, 0, 0])
        .voltage(CodeType::VoltageL2, 230.0);
    let err = decode_telegram(&builder.build(&key()).unwrap(), &key()).unwrap_err();
    assert!(matches!(
        err,
        MeterError::Obis(ObisError::UnsupportedDataType { offset: 28, tag: 0x17 })
    ));
}

#[test]
fn test_unknown_obis_code_is_ignored() {
    let builder = voltage_and_timestamp().raw_record(
        dlms_meter::ObisCode::new(1, 0, 0x63, 0x63, 0, 0xFF),
        DataType::DoubleLongUnsigned.tag(),
        &[0, 0, 0, 9],
    );
    let set = decode_telegram(&builder.build(&key()).unwrap(), &key()).unwrap();
    assert_eq!(set.len(), 2);
}

#[test]
fn test_structural_markers_checked_after_decryption() {
    let mut plaintext = voltage_and_timestamp().plaintext().unwrap();
    plaintext[5] = 0x09;
    let payload =
        dlms_meter::dlms::seal_envelope(&key(), [0x11; 8], 3, &plaintext).unwrap();
    let err = decode_telegram(&pack_telegram(&payload, 245).unwrap(), &key()).unwrap_err();
    assert!(matches!(err, MeterError::Structural { first: 0x0F, sixth: 0x09 }));
}

#[test]
fn test_truncated_plaintext_is_not_delivered() {
    let seal = |plaintext: &[u8]| {
        let payload =
            dlms_meter::dlms::seal_envelope(&key(), [0x11; 8], 4, plaintext).unwrap();
        decode_telegram(&pack_telegram(&payload, 245).unwrap(), &key())
    };

    // markers intact, record area missing
    let err = seal(&[0x0F, 0x00, 0x00, 0x00, 0x01, 0x0C]).unwrap_err();
    assert!(matches!(
        err,
        MeterError::Obis(ObisError::UnexpectedEnd { offset: 6, .. })
    ));

    // last record cut right after its value
    let mut plaintext = TelegramBuilder::new()
        .voltage(CodeType::VoltageL1, 231.0)
        .plaintext().unwrap();
    plaintext.truncate(31);
    let err = seal(&plaintext).unwrap_err();
    assert!(matches!(
        err,
        MeterError::Obis(ObisError::UnexpectedEnd { offset: 31, needed: 2 })
    ));
}

#[test]
fn test_serial_and_device_name_are_text() {
    let builder = TelegramBuilder::new()
        .serial_number("1KFM0200000001")
        .device_name("KFM1200200000001");
    let set = decode_telegram(&builder.build(&key()).unwrap(), &key()).unwrap();
    assert_eq!(
        set.get(CodeType::DeviceName),
        Some(&MeasurementValue::Text("KFM1200200000001".into()))
    );
}

proptest! {
    #[test]
    fn prop_tampered_ciphertext_is_rejected(index in 0usize..81, flip in 1u8..=255) {
        // 81 bytes of ciphertext and tag follow the 16-byte short header
        let mut raw = single_frame_telegram();
        raw[MBUS_FULL_HEADER_LENGTH + 16 + index] ^= flip;
        let result = decode_telegram(&raw, &key());
        prop_assert!(
            matches!(result, Err(MeterError::Crypto(CryptoError::AuthenticationFailed))),
            "got {:?}",
            result
        );
    }

    #[test]
    fn prop_length_pair_mismatch_is_framing_error(delta in 1u8..=255, tail in any::<u8>()) {
        let mut raw = single_frame_telegram();
        raw[MBUS_LENGTH2_OFFSET] = raw[MBUS_LENGTH2_OFFSET].wrapping_add(delta);
        let last = raw.len() - 3;
        raw[last] = tail;
        let result = decode_telegram(&raw, &key());
        prop_assert!(
            matches!(
                result,
                Err(MeterError::Framing(FramingError::LengthMismatch { offset: 0, .. }))
            ),
            "got {:?}",
            result
        );
    }

    #[test]
    fn prop_split_point_does_not_change_result(max_frame_data in 20usize..=245) {
        let builder = voltage_and_timestamp();
        let raw = builder.clone().max_frame_data(max_frame_data).build(&key()).unwrap();
        let set = decode_telegram(&raw, &key()).unwrap();
        prop_assert_eq!(set.numeric(CodeType::VoltageL1), Some(231.7));
        prop_assert_eq!(set.timestamp(), Some(CLOCK_TEXT));
    }

    #[test]
    fn prop_record_decoder_never_panics(tail in proptest::collection::vec(any::<u8>(), 0..200)) {
        let mut plaintext = voltage_and_timestamp().plaintext().unwrap();
        plaintext.truncate(20);
        plaintext.extend_from_slice(&tail);
        let _ = decode_records(&plaintext);
    }
}
