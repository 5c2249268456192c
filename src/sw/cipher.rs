use crate::aes;
use crate::csp::{Decryptor, Encryptor};
use crate::error::{CspError, CspResult};
use crate::key::{downcast_key, AesKey, Key};
use crate::opts::{AesCbcPkcs7ModeOpts, DecrypterOpts, EncrypterOpts};

fn aes_key(key: &dyn Key) -> CspResult<&AesKey> {
    downcast_key::<AesKey>(key).ok_or_else(|| {
        CspError::invalid_argument(
            "key",
            &format!("Expected an AES key but got [{}]", key.type_name()),
        )
    })
}

pub(crate) struct AesCbcPkcs7Encryptor;

impl Encryptor for AesCbcPkcs7Encryptor {
    fn encrypt(
        &self,
        key: &dyn Key,
        plaintext: &[u8],
        opts: Option<&dyn EncrypterOpts>,
    ) -> CspResult<Vec<u8>> {
        let key = aes_key(key)?;
        let iv = match opts {
            None => None,
            Some(opts) => {
                opts.as_any()
                    .downcast_ref::<AesCbcPkcs7ModeOpts>()
                    .ok_or_else(|| {
                        CspError::unsupported_algorithm("EncrypterOpts", opts.type_name())
                    })?
                    .iv
            }
        };

        match iv {
            Some(iv) => aes::encrypt_with_iv(key.raw(), &iv, plaintext),
            None => aes::encrypt(key.raw(), plaintext),
        }
    }
}

pub(crate) struct AesCbcPkcs7Decryptor;

impl Decryptor for AesCbcPkcs7Decryptor {
    fn decrypt(
        &self,
        key: &dyn Key,
        ciphertext: &[u8],
        opts: Option<&dyn DecrypterOpts>,
    ) -> CspResult<Vec<u8>> {
        let key = aes_key(key)?;
        if let Some(opts) = opts {
            if opts.as_any().downcast_ref::<AesCbcPkcs7ModeOpts>().is_none() {
                return Err(CspError::unsupported_algorithm(
                    "DecrypterOpts",
                    opts.type_name(),
                ));
            }
        }
        aes::decrypt(key.raw(), ciphertext)
    }
}
