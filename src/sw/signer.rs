use std::sync::Arc;

use rsa::Pss;
use sha2::{Sha256, Sha384};
use sha3::{Sha3_256, Sha3_384};

use crate::csp::{Signer, Verifier};
use crate::ecdsa::{self, CurveOrders};
use crate::error::{error_codes, CspError, CspResult};
use crate::hash::HashType;
use crate::key::{downcast_key, EcdsaPrivateKey, EcdsaPublicKey, Key, RsaPrivateKey, RsaPublicKey};
use crate::opts::{RsaPssOpts, SignerOpts};

fn unexpected_key<K>(key: &dyn Key) -> CspError {
    CspError::invalid_argument(
        "key",
        &format!(
            "Expected {} but got [{}]",
            std::any::type_name::<K>(),
            key.type_name()
        ),
    )
}

pub(crate) struct EcdsaSigner {
    pub orders: Arc<CurveOrders>,
}

impl Signer for EcdsaSigner {
    fn sign(
        &self,
        key: &dyn Key,
        digest: &[u8],
        _opts: Option<&dyn SignerOpts>,
    ) -> CspResult<Vec<u8>> {
        let key = downcast_key::<EcdsaPrivateKey>(key)
            .ok_or_else(|| unexpected_key::<EcdsaPrivateKey>(key))?;
        ecdsa::sign_digest(key.secret(), digest, self.orders.get(key.curve()))
    }
}

pub(crate) struct EcdsaPrivateKeyVerifier {
    pub orders: Arc<CurveOrders>,
}

impl Verifier for EcdsaPrivateKeyVerifier {
    fn verify(
        &self,
        key: &dyn Key,
        signature: &[u8],
        digest: &[u8],
        _opts: Option<&dyn SignerOpts>,
    ) -> CspResult<bool> {
        let key = downcast_key::<EcdsaPrivateKey>(key)
            .ok_or_else(|| unexpected_key::<EcdsaPrivateKey>(key))?;
        let public = key.public().key();
        ecdsa::verify_digest(public, signature, digest, self.orders.get(public.curve()))
    }
}

pub(crate) struct EcdsaPublicKeyVerifier {
    pub orders: Arc<CurveOrders>,
}

impl Verifier for EcdsaPublicKeyVerifier {
    fn verify(
        &self,
        key: &dyn Key,
        signature: &[u8],
        digest: &[u8],
        _opts: Option<&dyn SignerOpts>,
    ) -> CspResult<bool> {
        let key = downcast_key::<EcdsaPublicKey>(key)
            .ok_or_else(|| unexpected_key::<EcdsaPublicKey>(key))?;
        ecdsa::verify_digest(key.key(), signature, digest, self.orders.get(key.curve()))
    }
}

// Binds the digest type selected by a `HashType` to `$digest`
macro_rules! with_pss_digest {
    ($hash:expr, $digest:ident => $body:expr) => {
        match $hash {
            HashType::Sha2_256 => {
                type $digest = Sha256;
                $body
            }
            HashType::Sha2_384 => {
                type $digest = Sha384;
                $body
            }
            HashType::Sha3_256 => {
                type $digest = Sha3_256;
                $body
            }
            HashType::Sha3_384 => {
                type $digest = Sha3_384;
                $body
            }
            other => Err(CspError::unsupported_hash(other)),
        }
    };
}

/// RSA requires explicit PSS parameters
fn pss_opts(opts: Option<&dyn SignerOpts>) -> CspResult<&RsaPssOpts> {
    let opts = opts.ok_or_else(|| {
        CspError::invalid_argument("options", "Must be different from nil")
    })?;
    opts.as_any()
        .downcast_ref::<RsaPssOpts>()
        .ok_or_else(|| CspError::unsupported_algorithm("SignerOpts", opts.type_name()))
}

fn pss_sign(key: &rsa::RsaPrivateKey, digest: &[u8], opts: &RsaPssOpts) -> CspResult<Vec<u8>> {
    let salt_len = opts.salt_len();
    with_pss_digest!(opts.hash, D => {
        key.sign_with_rng(&mut rand::thread_rng(), Pss::new_with_salt::<D>(salt_len), digest)
            .map_err(|e| {
                CspError::crypto_failure(
                    "rsa_pss_sign",
                    &format!("Failed signing digest: {}", e),
                    error_codes::SIGNING_FAILED,
                )
            })
    })
}

fn pss_verify(
    key: &rsa::RsaPublicKey,
    signature: &[u8],
    digest: &[u8],
    opts: &RsaPssOpts,
) -> CspResult<bool> {
    let salt_len = opts.salt_len();
    with_pss_digest!(opts.hash, D => {
        Ok(key
            .verify(Pss::new_with_salt::<D>(salt_len), digest, signature)
            .is_ok())
    })
}

pub(crate) struct RsaSigner;

impl Signer for RsaSigner {
    fn sign(
        &self,
        key: &dyn Key,
        digest: &[u8],
        opts: Option<&dyn SignerOpts>,
    ) -> CspResult<Vec<u8>> {
        let opts = pss_opts(opts)?;
        let key = downcast_key::<RsaPrivateKey>(key)
            .ok_or_else(|| unexpected_key::<RsaPrivateKey>(key))?;
        pss_sign(key.inner(), digest, opts)
    }
}

pub(crate) struct RsaPrivateKeyVerifier;

impl Verifier for RsaPrivateKeyVerifier {
    fn verify(
        &self,
        key: &dyn Key,
        signature: &[u8],
        digest: &[u8],
        opts: Option<&dyn SignerOpts>,
    ) -> CspResult<bool> {
        let opts = pss_opts(opts)?;
        let key = downcast_key::<RsaPrivateKey>(key)
            .ok_or_else(|| unexpected_key::<RsaPrivateKey>(key))?;
        pss_verify(key.public().inner(), signature, digest, opts)
    }
}

pub(crate) struct RsaPublicKeyVerifier;

impl Verifier for RsaPublicKeyVerifier {
    fn verify(
        &self,
        key: &dyn Key,
        signature: &[u8],
        digest: &[u8],
        opts: Option<&dyn SignerOpts>,
    ) -> CspResult<bool> {
        let opts = pss_opts(opts)?;
        let key = downcast_key::<RsaPublicKey>(key)
            .ok_or_else(|| unexpected_key::<RsaPublicKey>(key))?;
        pss_verify(key.inner(), signature, digest, opts)
    }
}
