//! Meter Protocol Constants
//!
//! This module defines the fixed markers, offsets and sentinels of the three
//! protocol layers a P1 meter telegram is made of: the wired M-Bus long frame
//! (EN 13757-2), the DLMS general-glo-ciphering envelope (IEC 62056-5-3) and the
//! COSEM record stream inside it.

// ----------------------------------------------------------------------------
// M-Bus link layer
// ----------------------------------------------------------------------------

/// Start marker of a long frame (appears twice in the header)
pub const MBUS_START_BYTE: u8 = 0x68;

/// Stop marker terminating every frame
pub const MBUS_STOP_BYTE: u8 = 0x16;

/// Intro length: 0x68, L, L, 0x68
pub const MBUS_HEADER_INTRO_LENGTH: usize = 4;

/// Intro plus C, A, CI and the two transport bytes preceding user data
pub const MBUS_FULL_HEADER_LENGTH: usize = 9;

/// Checksum plus stop byte
pub const MBUS_FOOTER_LENGTH: usize = 2;

/// Header bytes counted by the L field before user data (C, A, CI, STSAP, DTSAP)
pub const MBUS_LENGTH_FIELD_OVERHEAD: usize = MBUS_FULL_HEADER_LENGTH - MBUS_HEADER_INTRO_LENGTH;

/// Largest L value a meter emits before splitting a telegram into several frames
pub const MBUS_MAX_FRAME_LENGTH: usize = 250;

pub const MBUS_START1_OFFSET: usize = 0;
pub const MBUS_LENGTH1_OFFSET: usize = 1;
pub const MBUS_LENGTH2_OFFSET: usize = 2;
pub const MBUS_START2_OFFSET: usize = 3;
pub const MBUS_CONTROL_OFFSET: usize = 4;
pub const MBUS_ADDRESS_OFFSET: usize = 5;
pub const MBUS_CONTROL_INFO_OFFSET: usize = 6;
pub const MBUS_STSAP_OFFSET: usize = 7;
pub const MBUS_DTSAP_OFFSET: usize = 8;

/// SND_UD control byte used by meters pushing data on the P1 port
pub const MBUS_CONTROL_SND_UD: u8 = 0x53;

/// Broadcast address (no reply expected)
pub const MBUS_ADDRESS_BROADCAST: u8 = 0xFF;

/// CI of the last (or only) frame of a segmented telegram
pub const MBUS_CONTROL_INFO_FINAL: u8 = 0x10;

/// Transport service access points used by DLMS over M-Bus
pub const MBUS_STSAP_DLMS: u8 = 0x01;
pub const MBUS_DTSAP_DLMS: u8 = 0x67;

// ----------------------------------------------------------------------------
// DLMS general-glo-ciphering envelope
// ----------------------------------------------------------------------------

/// Only general-glo-ciphering is accepted
pub const DLMS_CIPHER_GENERAL_GLO: u8 = 0xDB;

/// Only system titles of exactly 8 bytes are accepted
pub const DLMS_SYSTEM_TITLE_LENGTH: usize = 8;

/// Security control byte: security suite 0, encrypted
pub const DLMS_SECURITY_CONTROL: u8 = 0x21;

/// Length byte announcing a two-byte big-endian length
pub const DLMS_LENGTH_EXTENDED: u8 = 0x82;

/// Largest message length expressible in the one-byte form
pub const DLMS_SHORT_LENGTH_MAX: usize = 0x7F;

/// Header bytes (security control + frame counter) included in the declared length
pub const DLMS_LENGTH_CORRECTION: usize = 5;

/// Header length with a one-byte message length
pub const DLMS_HEADER_LENGTH: usize = 16;

/// Extra header bytes when the two-byte length form is used
pub const DLMS_HEADER_EXT_OFFSET: usize = 2;

/// Smallest reassembled payload worth parsing
pub const DLMS_MIN_PAYLOAD_LENGTH: usize = 20;

pub const DLMS_CIPHER_OFFSET: usize = 0;
pub const DLMS_SYST_LENGTH_OFFSET: usize = 1;
pub const DLMS_SYST_OFFSET: usize = 2;
pub const DLMS_LENGTH_OFFSET: usize = 10;
pub const DLMS_SECBYTE_OFFSET: usize = 11;
pub const DLMS_FRAMECOUNTER_OFFSET: usize = 12;
pub const DLMS_FRAMECOUNTER_LENGTH: usize = 4;

/// AES-GCM nonce: system title followed by frame counter
pub const DLMS_NONCE_LENGTH: usize = DLMS_SYSTEM_TITLE_LENGTH + DLMS_FRAMECOUNTER_LENGTH;

/// AES-128 key length
pub const AES_KEY_LENGTH: usize = 16;

/// Authentication tag appended to the ciphertext
pub const GCM_TAG_LENGTH: usize = 16;

// ----------------------------------------------------------------------------
// COSEM record stream
// ----------------------------------------------------------------------------

/// First plaintext byte: data-notification tag
pub const COSEM_NOTIFICATION_MARKER: u8 = 0x0F;
pub const COSEM_NOTIFICATION_MARKER_OFFSET: usize = 0;

/// Sixth plaintext byte: octet string carrying the notification date-time
pub const COSEM_DATETIME_MARKER: u8 = 0x0C;
pub const COSEM_DATETIME_MARKER_OFFSET: usize = 5;

/// Record decoding starts after the notification header, its date-time and
/// the enclosing structure header
pub const DECODER_START_OFFSET: usize = 20;

pub const OBIS_TYPE_OFFSET: usize = 0;
pub const OBIS_LENGTH_OFFSET: usize = 1;
pub const OBIS_CODE_OFFSET: usize = 2;

/// Only 6-byte OBIS codes are encoded
pub const OBIS_CODE_LENGTH: usize = 6;

pub const OBIS_A: usize = 0;
pub const OBIS_B: usize = 1;
pub const OBIS_C: usize = 2;
pub const OBIS_D: usize = 3;
pub const OBIS_E: usize = 4;
pub const OBIS_F: usize = 5;

/// Bytes separating one record's value from what follows
pub const RECORD_BREAK_LENGTH: usize = 2;

/// Marker of a scaler/unit block trailing a record
pub const RECORD_TRAILER_MARKER: u8 = 0x0F;

/// Scaler/unit block plus the following break
pub const RECORD_TRAILER_LENGTH: usize = 6;

/// Distance from the start of a long-unsigned value to its scaler byte
pub const SCALER_OFFSET: usize = 5;

/// Scaler byte meaning 10^-1
pub const SCALER_SINGLE_DIGIT: u8 = 0xFF;

/// Scaler byte meaning 10^-2
pub const SCALER_DOUBLE_DIGIT: u8 = 0xFE;

/// Bytes of a COSEM date-time used for the timestamp
pub const TIMESTAMP_MIN_LENGTH: usize = 8;

// ----------------------------------------------------------------------------
// Frame accumulator
// ----------------------------------------------------------------------------

/// Default inactivity gap ending a telegram
pub const DEFAULT_INACTIVITY_TIMEOUT_MS: u64 = 100;

/// Default cap on buffered telegram size
pub const DEFAULT_MAX_TELEGRAM_SIZE: usize = 1024;
