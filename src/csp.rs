/*!
 * Provider contract
 *
 * [`Csp`] is the facade every backend implements. The handler traits below
 * are the seams a provider dispatches to: one handler per key or options
 * type, looked up by the concrete type of the determining argument.
 */

use std::fmt;
use std::sync::Arc;

use crate::error::CspResult;
use crate::hash::{HashType, Hasher};
use crate::key::{EcPublicKey, Key};
use crate::opts::{
    DecrypterOpts, EncrypterOpts, KeyDerivOpts, KeyGenOpts, KeyImportOpts, SignerOpts,
};

/// Input to a key import
#[derive(Debug, Clone, Copy)]
pub enum KeyMaterial<'a> {
    /// Raw bytes: symmetric key bytes or DER (SPKI / PKCS#8)
    Raw(&'a [u8]),
    /// An already parsed EC public key
    EcdsaPublicKey(&'a EcPublicKey),
    /// An already parsed RSA public key
    RsaPublicKey(&'a rsa::RsaPublicKey),
    /// A parsed X.509 certificate
    Certificate(&'a x509_cert::Certificate),
}

impl KeyMaterial<'_> {
    /// Short name of the material's shape, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            KeyMaterial::Raw(_) => "raw bytes",
            KeyMaterial::EcdsaPublicKey(_) => "EC public key",
            KeyMaterial::RsaPublicKey(_) => "RSA public key",
            KeyMaterial::Certificate(_) => "X.509 certificate",
        }
    }
}

impl<'a> From<&'a [u8]> for KeyMaterial<'a> {
    fn from(raw: &'a [u8]) -> Self {
        KeyMaterial::Raw(raw)
    }
}

impl<'a> From<&'a Vec<u8>> for KeyMaterial<'a> {
    fn from(raw: &'a Vec<u8>) -> Self {
        KeyMaterial::Raw(raw.as_slice())
    }
}

impl<'a> From<&'a EcPublicKey> for KeyMaterial<'a> {
    fn from(key: &'a EcPublicKey) -> Self {
        KeyMaterial::EcdsaPublicKey(key)
    }
}

impl<'a> From<&'a rsa::RsaPublicKey> for KeyMaterial<'a> {
    fn from(key: &'a rsa::RsaPublicKey) -> Self {
        KeyMaterial::RsaPublicKey(key)
    }
}

impl<'a> From<&'a x509_cert::Certificate> for KeyMaterial<'a> {
    fn from(cert: &'a x509_cert::Certificate) -> Self {
        KeyMaterial::Certificate(cert)
    }
}

/// Cryptographic Service Provider
///
/// Absent arguments are modelled as `None` and rejected with
/// `InvalidArgument`. Generated, derived and imported keys are persisted in
/// the provider's key store unless their options are ephemeral.
pub trait Csp: Send + Sync + fmt::Debug {
    /// Generate a key
    fn key_gen(&self, opts: Option<&dyn KeyGenOpts>) -> CspResult<Arc<dyn Key>>;

    /// Derive a key from `key`; dispatch is on the key's type
    fn key_deriv(
        &self,
        key: Option<&dyn Key>,
        opts: Option<&dyn KeyDerivOpts>,
    ) -> CspResult<Arc<dyn Key>>;

    /// Import key material; dispatch is on the options type
    fn key_import(
        &self,
        raw: Option<KeyMaterial<'_>>,
        opts: Option<&dyn KeyImportOpts>,
    ) -> CspResult<Arc<dyn Key>>;

    /// Look up a key by SKI in the key store
    fn key(&self, ski: &[u8]) -> CspResult<Arc<dyn Key>>;

    /// One-shot digest
    fn hash(&self, msg: &[u8], hash_type: HashType) -> CspResult<Vec<u8>>;

    /// Fresh streaming hash state
    fn hasher(&self, hash_type: HashType) -> CspResult<Hasher>;

    /// Sign a digest. Callers hash larger messages first.
    fn sign(
        &self,
        key: Option<&dyn Key>,
        digest: &[u8],
        opts: Option<&dyn SignerOpts>,
    ) -> CspResult<Vec<u8>>;

    /// Verify a signature over a digest
    ///
    /// A well-formed signature that does not match yields `Ok(false)`; a
    /// malformed one is an error.
    fn verify(
        &self,
        key: Option<&dyn Key>,
        signature: &[u8],
        digest: &[u8],
        opts: Option<&dyn SignerOpts>,
    ) -> CspResult<bool>;

    fn encrypt(
        &self,
        key: Option<&dyn Key>,
        plaintext: &[u8],
        opts: Option<&dyn EncrypterOpts>,
    ) -> CspResult<Vec<u8>>;

    fn decrypt(
        &self,
        key: Option<&dyn Key>,
        ciphertext: &[u8],
        opts: Option<&dyn DecrypterOpts>,
    ) -> CspResult<Vec<u8>>;
}

/// Generates keys for one options type
pub trait KeyGenerator: Send + Sync {
    fn key_gen(&self, opts: &dyn KeyGenOpts) -> CspResult<Arc<dyn Key>>;
}

/// Derives keys from one key type
pub trait KeyDeriver: Send + Sync {
    fn key_deriv(&self, key: &dyn Key, opts: &dyn KeyDerivOpts) -> CspResult<Arc<dyn Key>>;
}

/// Imports keys for one options type
pub trait KeyImporter: Send + Sync {
    fn key_import(&self, raw: KeyMaterial<'_>, opts: &dyn KeyImportOpts)
        -> CspResult<Arc<dyn Key>>;
}

/// Signs with one key type
pub trait Signer: Send + Sync {
    fn sign(&self, key: &dyn Key, digest: &[u8], opts: Option<&dyn SignerOpts>)
        -> CspResult<Vec<u8>>;
}

/// Verifies with one key type
pub trait Verifier: Send + Sync {
    fn verify(
        &self,
        key: &dyn Key,
        signature: &[u8],
        digest: &[u8],
        opts: Option<&dyn SignerOpts>,
    ) -> CspResult<bool>;
}

/// Encrypts with one key type
pub trait Encryptor: Send + Sync {
    fn encrypt(
        &self,
        key: &dyn Key,
        plaintext: &[u8],
        opts: Option<&dyn EncrypterOpts>,
    ) -> CspResult<Vec<u8>>;
}

/// Decrypts with one key type
pub trait Decryptor: Send + Sync {
    fn decrypt(
        &self,
        key: &dyn Key,
        ciphertext: &[u8],
        opts: Option<&dyn DecrypterOpts>,
    ) -> CspResult<Vec<u8>>;
}
