#![no_main]

use libfuzzer_sys::fuzz_target;
use skein_core::codec::{decode, encode, Decoder};

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must survive another trip through the codec
    if let Ok(value) = decode(data) {
        assert_eq!(decode(&encode(&value)).ok(), Some(value));
    }

    // A shallow decoder must never recurse past its limit
    let _ = Decoder::new(4).decode(data);

    // Prefix decoding consumes what it reports
    let mut rest = data;
    while Decoder::default().decode_prefix(&mut rest).is_ok() {
        if rest.is_empty() {
            break;
        }
    }
});
