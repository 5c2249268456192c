/*!
 * cspkit: pluggable Cryptographic Service Provider
 *
 * One contract, [`Csp`], covers key generation, derivation, import and
 * lookup, hashing, signing, verification and symmetric encryption. The
 * algorithm is chosen by the concrete type of the key or options value passed
 * in, so new algorithms plug in by registering a handler for a new type.
 *
 * Two providers ship with the crate:
 *
 * - [`SwCsp`] runs everything in process: ECDSA on P-256/P-384 with low-S
 *   signatures, RSA-PSS, AES-CBC with PKCS#7 padding, and HMAC-based AES key
 *   derivation.
 * - [`Pkcs11Csp`] keeps ECDSA private keys on a PKCS#11 token and hands the
 *   rest to an inner software provider.
 */

/// AES-CBC with PKCS#7 padding and IV prefix
pub mod aes;

/// The provider contract and handler traits
pub mod csp;

/// ECDSA signing, strict DER signature codec and low-S canonicalization
pub mod ecdsa;

/// Error types shared by every provider
pub mod error;

/// Hash families, hasher registry and SKI computation
pub mod hash;

/// Key object model
pub mod key;

/// Key persistence
pub mod keystore;

/// Options values that select algorithms
pub mod opts;

/// PKCS#11 hardware-backed provider
pub mod pkcs11;

/// In-process software provider
pub mod sw;

/// Utilities for cryptographic operations
pub mod utils;

pub use csp::{Csp, KeyMaterial};
pub use error::{CspError, CspResult};
pub use hash::{HashFamily, HashType, SwOpts};
pub use key::Key;
pub use keystore::{InMemoryKeyStore, KeyStore};
pub use pkcs11::{Pkcs11Csp, Pkcs11Opts};
pub use sw::SwCsp;

/// The types needed for everyday use of a provider
pub mod prelude {
    pub use crate::csp::{Csp, KeyMaterial};
    pub use crate::error::{CspError, CspResult};
    pub use crate::hash::{HashFamily, HashType, SwOpts};
    pub use crate::key::{downcast_key, Key};
    pub use crate::keystore::{InMemoryKeyStore, KeyStore};
    pub use crate::opts::*;
    pub use crate::pkcs11::{Pkcs11Csp, Pkcs11Opts};
    pub use crate::sw::SwCsp;
}
