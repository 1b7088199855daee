#![no_main]

use dlms_meter::cosem::decode_records;
use dlms_meter::mbus::frame::pack_telegram;
use dlms_meter::{AesKey, TelegramDecoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(key) = AesKey::from_bytes(&[0x11; 16]) else {
        return;
    };
    let decoder = TelegramDecoder::new(key);

    // Arbitrary bytes as a raw telegram
    let _ = decoder.decode(data);

    // Arbitrary bytes as a well-framed DLMS payload
    if let Ok(raw) = pack_telegram(data, 245) {
        let _ = decoder.decode(&raw);
    }

    // Arbitrary bytes as decrypted plaintext
    let _ = decode_records(data);
});
