use std::sync::Arc;

use crate::csp::KeyGenerator;
use crate::error::{error_codes, CspError, CspResult};
use crate::hash::SkiFunction;
use crate::key::{AesKey, EcCurve, EcSecretKey, EcdsaPrivateKey, Key, RsaPrivateKey};
use crate::opts::KeyGenOpts;
use crate::utils;

pub(crate) struct EcdsaKeyGenerator {
    pub curve: EcCurve,
    pub ski: SkiFunction,
}

impl KeyGenerator for EcdsaKeyGenerator {
    fn key_gen(&self, _opts: &dyn KeyGenOpts) -> CspResult<Arc<dyn Key>> {
        let key = EcdsaPrivateKey::new(EcSecretKey::generate(self.curve), &self.ski)?;
        Ok(Arc::new(key))
    }
}

pub(crate) struct RsaKeyGenerator {
    pub bits: usize,
    pub ski: SkiFunction,
}

impl KeyGenerator for RsaKeyGenerator {
    fn key_gen(&self, _opts: &dyn KeyGenOpts) -> CspResult<Arc<dyn Key>> {
        let inner = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), self.bits).map_err(|e| {
            CspError::crypto_failure(
                "rsa_key_gen",
                &format!("Failed generating RSA {} key: {}", self.bits, e),
                error_codes::KEY_GENERATION_FAILED,
            )
        })?;
        Ok(Arc::new(RsaPrivateKey::new(inner, &self.ski)?))
    }
}

pub(crate) struct AesKeyGenerator {
    pub length: usize,
    pub ski: SkiFunction,
}

impl KeyGenerator for AesKeyGenerator {
    fn key_gen(&self, _opts: &dyn KeyGenOpts) -> CspResult<Arc<dyn Key>> {
        let bytes = utils::random_bytes(self.length)?;
        Ok(Arc::new(AesKey::new(bytes, false, &self.ski)?))
    }
}
