use std::fmt;
use std::sync::Arc;

use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;

use super::Key;
use crate::error::{error_codes, CspError, CspResult};
use crate::hash::SkiFunction;

/// RSA public key with its SKI
#[derive(Debug, Clone)]
pub struct RsaPublicKey {
    inner: rsa::RsaPublicKey,
    ski: Vec<u8>,
}

impl RsaPublicKey {
    /// Wrap a public key; the SKI covers the PKCS#1 `SEQUENCE{modulus, exponent}`
    pub fn new(inner: rsa::RsaPublicKey, ski_fn: &SkiFunction) -> CspResult<Self> {
        let pkcs1 = inner.to_pkcs1_der().map_err(|e| {
            CspError::crypto_failure(
                "rsa_public_key",
                &format!("Failed marshalling RSA public key: {}", e),
                error_codes::ENCODING_FAILED,
            )
        })?;
        let ski = ski_fn.ski(pkcs1.as_bytes())?;
        Ok(Self { inner, ski })
    }

    /// Parse a DER-encoded SubjectPublicKeyInfo
    pub fn from_spki_der(der: &[u8], ski_fn: &SkiFunction) -> CspResult<Self> {
        let inner = rsa::RsaPublicKey::from_public_key_der(der).map_err(|e| {
            CspError::invalid_key_material(
                "rsa_pkix_import",
                &format!("Failed converting PKIX to RSA public key: {}", e),
            )
        })?;
        Self::new(inner, ski_fn)
    }

    pub fn inner(&self) -> &rsa::RsaPublicKey {
        &self.inner
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.inner.n().bits()
    }
}

impl Key for RsaPublicKey {
    fn to_bytes(&self) -> CspResult<Vec<u8>> {
        self.inner
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| {
                CspError::crypto_failure(
                    "to_spki_der",
                    &format!("Failed marshalling RSA public key: {}", e),
                    error_codes::ENCODING_FAILED,
                )
            })
    }

    fn ski(&self) -> &[u8] {
        &self.ski
    }

    fn is_symmetric(&self) -> bool {
        false
    }

    fn is_private(&self) -> bool {
        false
    }

    fn public_key(&self) -> CspResult<Arc<dyn Key>> {
        Ok(Arc::new(self.clone()))
    }
}

/// RSA private key; shares the SKI of its public key
#[derive(Clone)]
pub struct RsaPrivateKey {
    inner: rsa::RsaPrivateKey,
    public: RsaPublicKey,
}

impl fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("bits", &self.public.bits())
            .field("ski", &hex::encode(&self.public.ski))
            .field("private", &"[REDACTED]")
            .finish()
    }
}

impl RsaPrivateKey {
    pub fn new(inner: rsa::RsaPrivateKey, ski_fn: &SkiFunction) -> CspResult<Self> {
        let public = RsaPublicKey::new(inner.to_public_key(), ski_fn)?;
        Ok(Self { inner, public })
    }

    pub fn inner(&self) -> &rsa::RsaPrivateKey {
        &self.inner
    }

    pub fn public(&self) -> &RsaPublicKey {
        &self.public
    }
}

impl Key for RsaPrivateKey {
    fn to_bytes(&self) -> CspResult<Vec<u8>> {
        Err(CspError::not_exportable("RSA private key"))
    }

    fn ski(&self) -> &[u8] {
        &self.public.ski
    }

    fn is_symmetric(&self) -> bool {
        false
    }

    fn is_private(&self) -> bool {
        true
    }

    fn public_key(&self) -> CspResult<Arc<dyn Key>> {
        Ok(Arc::new(self.public.clone()))
    }
}
