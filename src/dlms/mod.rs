//! The dlms module contains the security layer of a meter telegram: parsing the
//! general-glo-ciphering header and AES-GCM authenticated decryption.

pub mod crypto;
pub mod envelope;

pub use crypto::{AesKey, CryptoError};
pub use envelope::{open_envelope, parse_envelope, seal_envelope, DlmsEnvelope, HeaderLayout};
