//! # DLMS General-Glo-Ciphering Envelope
//!
//! The reassembled M-Bus payload starts with a DLMS security header:
//!
//! ```text
//! DB | 08 | system title (8) | length (1 or 0x82 + 2) | SC 21 | frame counter (4) | ciphertext + tag
//! ```
//!
//! The declared length covers the security control byte, the frame counter
//! and the ciphertext. Lengths above 127 use the extended form, which shifts
//! every field after the length by two bytes; [`HeaderLayout`] captures that
//! choice once so the remaining offsets are computed in one place.

use crate::constants::*;
use crate::dlms::crypto::{self, AesKey};
use crate::error::{EnvelopeError, MeterError};
use nom::{
    bytes::complete::take,
    number::complete::{be_u16, be_u32, be_u8},
    IResult,
};

/// Width of the message-length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLayout {
    /// One-byte length, message length <= 127
    Short,
    /// `0x82` followed by a two-byte big-endian length
    Extended,
}

impl HeaderLayout {
    /// Layout a sender must use for a declared length.
    pub fn for_length(declared: usize) -> Self {
        if declared <= DLMS_SHORT_LENGTH_MAX {
            HeaderLayout::Short
        } else {
            HeaderLayout::Extended
        }
    }

    /// Shift applied to every field after the length field.
    pub fn offset(self) -> usize {
        match self {
            HeaderLayout::Short => 0,
            HeaderLayout::Extended => DLMS_HEADER_EXT_OFFSET,
        }
    }

    /// Total header size before the ciphertext.
    pub fn header_len(self) -> usize {
        DLMS_HEADER_LENGTH + self.offset()
    }
}

/// Parsed security header borrowing the ciphertext from the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlmsEnvelope<'a> {
    pub system_title: [u8; DLMS_SYSTEM_TITLE_LENGTH],
    pub layout: HeaderLayout,
    /// Length as declared on the wire, including the correction bytes
    pub declared_length: usize,
    pub security_control: u8,
    pub frame_counter: u32,
    /// Ciphertext followed by the authentication tag
    pub ciphertext: &'a [u8],
}

impl DlmsEnvelope<'_> {
    /// GCM nonce: system title followed by the big-endian frame counter.
    pub fn nonce(&self) -> [u8; DLMS_NONCE_LENGTH] {
        let mut iv = [0u8; DLMS_NONCE_LENGTH];
        iv[..DLMS_SYSTEM_TITLE_LENGTH].copy_from_slice(&self.system_title);
        iv[DLMS_SYSTEM_TITLE_LENGTH..].copy_from_slice(&self.frame_counter.to_be_bytes());
        iv
    }

    /// Declared length minus the header bytes it includes.
    pub fn message_length(&self) -> usize {
        self.declared_length.saturating_sub(DLMS_LENGTH_CORRECTION)
    }

    /// System title rendered the way meters print it (manufacturer letters
    /// are ASCII, the rest is a serial).
    pub fn system_title_hex(&self) -> String {
        crate::util::hex::encode_hex(&self.system_title)
    }
}

fn system_title(input: &[u8]) -> IResult<&[u8], [u8; DLMS_SYSTEM_TITLE_LENGTH]> {
    let (input, bytes) = take(DLMS_SYSTEM_TITLE_LENGTH)(input)?;
    let mut title = [0u8; DLMS_SYSTEM_TITLE_LENGTH];
    title.copy_from_slice(bytes);
    Ok((input, title))
}

/// Reads the length field and picks the header layout.
fn message_length(input: &[u8]) -> IResult<&[u8], (HeaderLayout, usize)> {
    let (input, first) = be_u8(input)?;
    if first == DLMS_LENGTH_EXTENDED {
        let (input, length) = be_u16(input)?;
        Ok((input, (HeaderLayout::Extended, length as usize)))
    } else {
        Ok((input, (HeaderLayout::Short, first as usize)))
    }
}

fn short_payload(payload: &[u8]) -> MeterError {
    EnvelopeError::PayloadTooShort {
        length: payload.len(),
        minimum: DLMS_MIN_PAYLOAD_LENGTH,
    }
    .into()
}

/// Parses and validates the security header of a reassembled payload.
///
/// The declared length is checked against the received bytes here, before any
/// decryption is attempted.
pub fn parse_envelope(payload: &[u8]) -> Result<DlmsEnvelope<'_>, MeterError> {
    if payload.len() < DLMS_MIN_PAYLOAD_LENGTH {
        return Err(short_payload(payload));
    }
    let nom_err = |_: nom::Err<nom::error::Error<&[u8]>>| short_payload(payload);

    let (input, cipher) = be_u8(payload).map_err(nom_err)?;
    if cipher != DLMS_CIPHER_GENERAL_GLO {
        return Err(EnvelopeError::UnsupportedCipher(cipher).into());
    }

    let (input, title_length) = be_u8(input).map_err(nom_err)?;
    if title_length as usize != DLMS_SYSTEM_TITLE_LENGTH {
        return Err(EnvelopeError::UnsupportedSystemTitleLength(title_length).into());
    }

    let (input, system_title) = system_title(input).map_err(nom_err)?;
    let (input, (layout, declared_length)) = message_length(input).map_err(nom_err)?;
    log::debug!("DLMS: {layout:?} length form, declared length {declared_length}");

    let available = payload.len().saturating_sub(layout.header_len());
    if layout == HeaderLayout::Short && declared_length > DLMS_SHORT_LENGTH_MAX {
        return Err(MeterError::Length {
            declared: declared_length,
            actual: available + DLMS_LENGTH_CORRECTION,
        });
    }
    let corrected = declared_length.checked_sub(DLMS_LENGTH_CORRECTION);
    if corrected != Some(available) {
        return Err(MeterError::Length {
            declared: declared_length,
            actual: available + DLMS_LENGTH_CORRECTION,
        });
    }

    let (input, security_control) = be_u8(input).map_err(nom_err)?;
    if security_control != DLMS_SECURITY_CONTROL {
        return Err(EnvelopeError::UnsupportedSecurityControl(security_control).into());
    }

    let (ciphertext, frame_counter) = be_u32(input).map_err(nom_err)?;

    Ok(DlmsEnvelope {
        system_title,
        layout,
        declared_length,
        security_control,
        frame_counter,
        ciphertext,
    })
}

/// Checks that decrypted data starts like a data notification carrying a
/// date-time octet string.
pub fn validate_plaintext(plaintext: &[u8]) -> Result<(), MeterError> {
    let first = plaintext.get(COSEM_NOTIFICATION_MARKER_OFFSET).copied();
    let sixth = plaintext.get(COSEM_DATETIME_MARKER_OFFSET).copied();
    match (first, sixth) {
        (Some(COSEM_NOTIFICATION_MARKER), Some(COSEM_DATETIME_MARKER)) => Ok(()),
        (first, sixth) => Err(MeterError::Structural {
            first: first.unwrap_or_default(),
            sixth: sixth.unwrap_or_default(),
        }),
    }
}

/// Parses the envelope, authenticates and decrypts it, and validates the
/// plaintext structure.
pub fn open_envelope(payload: &[u8], key: &AesKey) -> Result<Vec<u8>, MeterError> {
    let envelope = parse_envelope(payload)?;
    log::debug!(
        "DLMS: system title {}, frame counter {}",
        envelope.system_title_hex(),
        envelope.frame_counter
    );

    let plaintext = crypto::open(key, &envelope.nonce(), envelope.ciphertext)?;
    validate_plaintext(&plaintext)?;
    Ok(plaintext)
}

/// Encrypts `plaintext` and wraps it in a general-glo-ciphering header,
/// choosing the short or extended length form as needed.
pub fn seal_envelope(
    key: &AesKey,
    system_title: [u8; DLMS_SYSTEM_TITLE_LENGTH],
    frame_counter: u32,
    plaintext: &[u8],
) -> Result<Vec<u8>, MeterError> {
    let mut nonce = [0u8; DLMS_NONCE_LENGTH];
    nonce[..DLMS_SYSTEM_TITLE_LENGTH].copy_from_slice(&system_title);
    nonce[DLMS_SYSTEM_TITLE_LENGTH..].copy_from_slice(&frame_counter.to_be_bytes());

    let ciphertext = crypto::seal(key, &nonce, plaintext)?;
    let declared = ciphertext.len() + DLMS_LENGTH_CORRECTION;
    let declared_u16 = u16::try_from(declared).map_err(|_| MeterError::Length {
        declared,
        actual: u16::MAX as usize,
    })?;
    let layout = HeaderLayout::for_length(declared);

    let mut out = Vec::with_capacity(layout.header_len() + ciphertext.len());
    out.push(DLMS_CIPHER_GENERAL_GLO);
    out.push(DLMS_SYSTEM_TITLE_LENGTH as u8);
    out.extend_from_slice(&system_title);
    match layout {
        HeaderLayout::Short => out.push(declared as u8),
        HeaderLayout::Extended => {
            out.push(DLMS_LENGTH_EXTENDED);
            out.extend_from_slice(&declared_u16.to_be_bytes());
        }
    }
    out.push(DLMS_SECURITY_CONTROL);
    out.extend_from_slice(&frame_counter.to_be_bytes());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}
