use ::aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::{error_codes, CspError, CspResult};
use crate::utils;

/// AES block size, which is also the IV size
pub const BLOCK_SIZE: usize = 16;

// Selects the AES variant from the key length and binds it to `$cipher`
macro_rules! with_aes_cipher {
    ($key:expr, $cipher:ident => $body:expr) => {
        match $key.len() {
            16 => {
                type $cipher = Aes128;
                $body
            }
            24 => {
                type $cipher = Aes192;
                $body
            }
            32 => {
                type $cipher = Aes256;
                $body
            }
            other => Err(CspError::invalid_argument(
                "key",
                &format!(
                    "Invalid AES key length [{}]. It must be 16, 24 or 32 bytes",
                    other
                ),
            )),
        }
    };
}

fn cipher_init_failed(cause: impl std::fmt::Display) -> CspError {
    CspError::crypto_failure(
        "aes_cbc_init",
        &format!("Failed initializing cipher: {}", cause),
        error_codes::ENCRYPTION_FAILED,
    )
}

/// Generate a fresh IV from the OS random number generator
pub fn generate_iv() -> CspResult<[u8; BLOCK_SIZE]> {
    let bytes = utils::random_bytes(BLOCK_SIZE)?;
    let mut iv = [0u8; BLOCK_SIZE];
    iv.copy_from_slice(&bytes);
    Ok(iv)
}

/// Encrypt `plaintext` under a fresh random IV
///
/// # Arguments
///
/// * `key` - AES-128, AES-192 or AES-256 key (16, 24 or 32 bytes)
/// * `plaintext` - Data to encrypt; may be empty
///
/// # Returns
///
/// `IV || CBC(PKCS#7(plaintext))`, always at least two blocks long
///
/// # Errors
///
/// Returns `InvalidArgument` for an unsupported key length, or
/// `CryptoFailure` if the OS RNG fails
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> CspResult<Vec<u8>> {
    let iv = generate_iv()?;
    encrypt_with_iv(key, &iv, plaintext)
}

/// Encrypt `plaintext` under a caller-chosen IV
///
/// The same key, IV and plaintext always give the same output. Reusing an
/// IV under one key leaks equality of plaintext prefixes.
pub fn encrypt_with_iv(
    key: &[u8],
    iv: &[u8; BLOCK_SIZE],
    plaintext: &[u8],
) -> CspResult<Vec<u8>> {
    let ciphertext: CspResult<Vec<u8>> = with_aes_cipher!(key, C => {
        cbc::Encryptor::<C>::new_from_slices(key, iv)
            .map(|enc| enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
            .map_err(cipher_init_failed)
    });

    let ciphertext = ciphertext?;
    let mut out = Vec::with_capacity(BLOCK_SIZE + ciphertext.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt `IV || ciphertext` and strip the PKCS#7 padding
///
/// # Errors
///
/// * `InvalidArgument` if the input is shorter than two blocks, is not
///   block aligned, or the key length is unsupported
/// * `InvalidPadding` if the padding of the last block is malformed
pub fn decrypt(key: &[u8], ciphertext: &[u8]) -> CspResult<Vec<u8>> {
    if ciphertext.len() < 2 * BLOCK_SIZE {
        return Err(CspError::invalid_argument(
            "ciphertext",
            "It must hold an IV and at least one block",
        ));
    }
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CspError::invalid_argument(
            "ciphertext",
            "It must be a multiple of the block size",
        ));
    }

    let (iv, body) = ciphertext.split_at(BLOCK_SIZE);
    with_aes_cipher!(key, C => {
        cbc::Decryptor::<C>::new_from_slices(key, iv)
            .map_err(cipher_init_failed)?
            .decrypt_padded_vec_mut::<Pkcs7>(body)
            .map_err(|_| CspError::invalid_padding())
    })
}
