// Digest and HMAC vectors (FIPS 180-4, FIPS 202, RFC 4231)

use cspkit::HashType;

pub struct DigestTestVector {
    pub hash_type: HashType,
    pub message: &'static [u8],
    pub digest: &'static str,
}

pub fn digest_test_vectors() -> Vec<DigestTestVector> {
    vec![
        DigestTestVector {
            hash_type: HashType::Sha2_256,
            message: b"abc",
            digest: "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        },
        DigestTestVector {
            hash_type: HashType::Sha3_256,
            message: b"abc",
            digest: "3a985da74fe225b2045c172d6bd390bd855f086e3e9d525b46bfe24511431532",
        },
    ]
}

/// RFC 4231 test case 2
pub const HMAC_KEY: &[u8] = b"Jefe";
pub const HMAC_DATA: &[u8] = b"what do ya want for nothing?";
pub const HMAC_SHA256: &str = "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843";
