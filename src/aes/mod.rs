/*!
 * AES-CBC with PKCS#7 padding
 *
 * Ciphertexts are self-contained: the 16-byte IV is prepended to the CBC
 * output, so decryption needs only the key.
 */

mod cipher;

pub use self::cipher::*;
