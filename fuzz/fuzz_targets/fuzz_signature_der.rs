#![no_main]

use cspkit::ecdsa::{marshal_signature, unmarshal_signature};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only canonical encodings may be accepted
    if let Ok((r, s)) = unmarshal_signature(data) {
        assert_eq!(marshal_signature(&r, &s), data);
    }
});
