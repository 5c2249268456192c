#![no_main]

use arbitrary::Arbitrary;
use cspkit::aes;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct AesCbcFuzzInput {
    key: [u8; 32],
    key_len: u8,
    iv: [u8; 16],
    plaintext: Vec<u8>,
    ciphertext: Vec<u8>,
}

fuzz_target!(|input: AesCbcFuzzInput| {
    let key = match input.key_len % 3 {
        0 => &input.key[..16],
        1 => &input.key[..24],
        _ => &input.key[..],
    };

    // Round trip must hold for every plaintext
    let ciphertext = aes::encrypt_with_iv(key, &input.iv, &input.plaintext).unwrap();
    assert_eq!(aes::decrypt(key, &ciphertext).unwrap(), input.plaintext);

    // Arbitrary ciphertexts fail cleanly
    let _ = aes::decrypt(key, &input.ciphertext);
});
