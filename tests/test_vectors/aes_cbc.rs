// AES-CBC vectors from NIST SP 800-38A, appendix F.2

use serde::{Deserialize, Serialize};

/// One CBC encryption case; `ciphertext` excludes the IV prefix and the
/// trailing PKCS#7 padding block
#[derive(Debug, Serialize, Deserialize)]
pub struct AesCbcTestVector {
    pub name: String,
    pub key: String,
    pub iv: String,
    pub plaintext: String,
    pub ciphertext: String,
}

const PLAINTEXT: &str = concat!(
    "6bc1bee22e409f96e93d7e117393172a",
    "ae2d8a571e03ac9c9eb76fac45af8e51",
    "30c81c46a35ce411e5fbc1191a0a52ef",
    "f69f2445df4f9b17ad2b417be66c3710",
);

const IV: &str = "000102030405060708090a0b0c0d0e0f";

pub fn standard_test_vectors() -> Vec<AesCbcTestVector> {
    vec![
        AesCbcTestVector {
            name: "CBC-AES128.Encrypt".to_string(),
            key: "2b7e151628aed2a6abf7158809cf4f3c".to_string(),
            iv: IV.to_string(),
            plaintext: PLAINTEXT.to_string(),
            ciphertext: concat!(
                "7649abac8119b246cee98e9b12e9197d",
                "5086cb9b507219ee95db113a917678b2",
                "73bed6b8e3c1743b7116e69e22229516",
                "3ff1caa1681fac09120eca307586e1a7",
            )
            .to_string(),
        },
        AesCbcTestVector {
            name: "CBC-AES256.Encrypt".to_string(),
            key: "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4".to_string(),
            iv: IV.to_string(),
            plaintext: PLAINTEXT.to_string(),
            ciphertext: concat!(
                "f58c4c04d6e5f1ba779eabfb5f7bfbd6",
                "9cfc4e967edb808d679f777bc6702c7d",
                "39f23369a9d9bacfa530e26304231461",
                "b2eb05e2c39be9fcda6c19078c6a9d1b",
            )
            .to_string(),
        },
    ]
}
