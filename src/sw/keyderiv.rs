use std::sync::Arc;

use rsa::BigUint;

use crate::csp::KeyDeriver;
use crate::ecdsa::CurveOrder;
use crate::ecdsa::CurveOrders;
use crate::error::{error_codes, CspError, CspResult};
use crate::hash::SkiFunction;
use crate::key::{
    downcast_key, AesKey, EcCurve, EcSecretKey, EcdsaPrivateKey, EcdsaPublicKey, Key,
};
use crate::opts::{EcdsaReRandKeyOpts, HmacDeriveKeyOpts, HmacTruncated256AesDeriveKeyOpts, KeyDerivOpts};
use crate::utils::to_fixed_be;

const TRUNCATED_KEY_LEN: usize = 32;

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

fn unsupported_opts(opts: &dyn KeyDerivOpts) -> CspError {
    CspError::unsupported_algorithm("KeyDerivOpts", opts.type_name())
}

/// HMAC derivation of symmetric keys
pub(crate) struct AesKeyDeriver {
    pub ski: SkiFunction,
}

impl KeyDeriver for AesKeyDeriver {
    fn key_deriv(&self, key: &dyn Key, opts: &dyn KeyDerivOpts) -> CspResult<Arc<dyn Key>> {
        let base = downcast_key::<AesKey>(key).ok_or_else(|| unexpected_key::<AesKey>(key))?;

        if let Some(opts) = opts.as_any().downcast_ref::<HmacTruncated256AesDeriveKeyOpts>() {
            let mut derived = self.ski.hmac(base.raw(), opts.argument())?;
            derived.truncate(TRUNCATED_KEY_LEN);
            return Ok(Arc::new(AesKey::new(derived, false, &self.ski)?));
        }

        if let Some(opts) = opts.as_any().downcast_ref::<HmacDeriveKeyOpts>() {
            let derived = self.ski.hmac(base.raw(), opts.argument())?;
            return Ok(Arc::new(AesKey::new(derived, true, &self.ski)?));
        }

        Err(unsupported_opts(opts))
    }
}

/// `k = (expansion mod (n - 1)) + 1`, so `k` is never zero
fn rerand_offset(expansion: &[u8], order: &CurveOrder) -> BigUint {
    let one = BigUint::from(1u32);
    let n_minus_one = &order.n - &one;
    BigUint::from_bytes_be(expansion) % n_minus_one + one
}

fn scalar_from_biguint(curve: EcCurve, value: &BigUint) -> CspResult<EcSecretKey> {
    let bytes = to_fixed_be(value, curve.field_size()).ok_or_else(|| {
        CspError::crypto_failure(
            "ecdsa_rerand",
            "Scalar out of range",
            error_codes::KEY_DERIVATION_FAILED,
        )
    })?;
    EcSecretKey::from_be_bytes(curve, &bytes)
}

fn rerand_opts(opts: &dyn KeyDerivOpts) -> CspResult<&EcdsaReRandKeyOpts> {
    opts.as_any()
        .downcast_ref::<EcdsaReRandKeyOpts>()
        .ok_or_else(|| unsupported_opts(opts))
}

/// Re-randomization of ECDSA private keys: `d' = d + k mod n`
pub(crate) struct EcdsaPrivateKeyDeriver {
    pub ski: SkiFunction,
    pub orders: Arc<CurveOrders>,
}

impl KeyDeriver for EcdsaPrivateKeyDeriver {
    fn key_deriv(&self, key: &dyn Key, opts: &dyn KeyDerivOpts) -> CspResult<Arc<dyn Key>> {
        let base = downcast_key::<EcdsaPrivateKey>(key)
            .ok_or_else(|| unexpected_key::<EcdsaPrivateKey>(key))?;
        let opts = rerand_opts(opts)?;

        let curve = base.curve();
        let order = self.orders.get(curve);
        let k = rerand_offset(opts.expansion_value(), order);

        let d = BigUint::from_bytes_be(&base.secret().to_be_bytes());
        let derived = (d + k) % &order.n;
        let secret = scalar_from_biguint(curve, &derived)?;

        Ok(Arc::new(EcdsaPrivateKey::new(secret, &self.ski)?))
    }
}

/// Re-randomization of ECDSA public keys: `P' = P + k·G`
pub(crate) struct EcdsaPublicKeyDeriver {
    pub ski: SkiFunction,
    pub orders: Arc<CurveOrders>,
}

impl KeyDeriver for EcdsaPublicKeyDeriver {
    fn key_deriv(&self, key: &dyn Key, opts: &dyn KeyDerivOpts) -> CspResult<Arc<dyn Key>> {
        let base = downcast_key::<EcdsaPublicKey>(key)
            .ok_or_else(|| unexpected_key::<EcdsaPublicKey>(key))?;
        let opts = rerand_opts(opts)?;

        let curve = base.curve();
        let k = rerand_offset(opts.expansion_value(), self.orders.get(curve));
        let offset = scalar_from_biguint(curve, &k)?.public_key();
        let derived = base.key().add(&offset)?;

        Ok(Arc::new(EcdsaPublicKey::new(derived, &self.ski)?))
    }
}
