//! # Telegram Decoder
//!
//! Runs one complete telegram through every stage:
//!
//! 1. M-Bus reassembly ([`crate::mbus::frame::reassemble`])
//! 2. DLMS envelope parsing and AES-GCM decryption ([`crate::dlms::envelope`])
//! 3. COSEM record decoding ([`crate::cosem::record`])
//!
//! The decoder is stateless apart from the key; a failure at any stage is
//! returned as a [`MeterError`] and nothing is produced.

use crate::cosem::record::decode_records;
use crate::dlms::crypto::AesKey;
use crate::dlms::envelope::open_envelope;
use crate::error::MeterError;
use crate::mbus::frame::reassemble;
use crate::measurement::MeasurementSet;
use crate::util::logging::log_frame_hex;

#[derive(Debug, Clone)]
pub struct TelegramDecoder {
    key: AesKey,
    verify_checksums: bool,
}

impl TelegramDecoder {
    pub fn new(key: AesKey) -> Self {
        Self {
            key,
            verify_checksums: false,
        }
    }

    /// Also require a correct M-Bus checksum on every frame.
    pub fn with_checksum_verification(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    pub fn verifies_checksums(&self) -> bool {
        self.verify_checksums
    }

    /// Replaces the key used for every following telegram.
    pub fn set_key(&mut self, key: AesKey) {
        self.key = key;
    }

    /// Decodes one raw telegram as it came off the line.
    pub fn decode(&self, raw: &[u8]) -> Result<MeasurementSet, MeterError> {
        let plaintext = self.decrypt(raw)?;
        let measurements = decode_records(&plaintext)?;
        log::debug!("Decoded {} quantities", measurements.len());
        Ok(measurements)
    }

    /// Runs reassembly and decryption only, returning the validated
    /// plaintext of the data notification.
    pub fn decrypt(&self, raw: &[u8]) -> Result<Vec<u8>, MeterError> {
        log_frame_hex("RX telegram", raw);
        let payload = reassemble(raw, self.verify_checksums)?;
        log_frame_hex("DLMS payload", &payload);
        let plaintext = open_envelope(&payload, &self.key)?;
        log_frame_hex("Plaintext", &plaintext);
        Ok(plaintext)
    }
}
