use std::sync::Arc;

use crate::error::{CspError, CspResult};
use crate::key::{EcCurve, EcdsaPublicKey, Key};

/// ECDSA private key held by a PKCS#11 token
///
/// Only the SKI and the public half live in process memory. The SKI is also
/// the `CKA_ID` of both token objects, which is how the private key is found
/// again when signing.
#[derive(Debug, Clone)]
pub struct Pkcs11EcdsaPrivateKey {
    public: EcdsaPublicKey,
}

impl Pkcs11EcdsaPrivateKey {
    pub(crate) fn new(public: EcdsaPublicKey) -> Self {
        Self { public }
    }

    pub fn public(&self) -> &EcdsaPublicKey {
        &self.public
    }

    pub fn curve(&self) -> EcCurve {
        self.public.curve()
    }
}

impl Key for Pkcs11EcdsaPrivateKey {
    fn to_bytes(&self) -> CspResult<Vec<u8>> {
        Err(CspError::not_exportable("PKCS#11 ECDSA private key"))
    }

    fn ski(&self) -> &[u8] {
        self.public.ski()
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
