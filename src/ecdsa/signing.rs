use std::borrow::Cow;

use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rsa::BigUint;

use super::canonical::CurveOrder;
use super::der::{marshal_signature, unmarshal_signature};
use crate::error::{error_codes, CspError, CspResult};
use crate::key::{EcPublicKey, EcSecretKey};
use crate::utils::to_fixed_be;

fn signing_failed(cause: impl std::fmt::Display) -> CspError {
    CspError::crypto_failure(
        "ecdsa_sign",
        &format!("Failed signing digest: {}", cause),
        error_codes::SIGNING_FAILED,
    )
}

/// Left-pad a short digest to `field_size` bytes
///
/// The prehash is read as a big-endian integer, so leading zeros keep its
/// value while meeting the minimum length the signers require.
fn prehash(digest: &[u8], field_size: usize) -> Cow<'_, [u8]> {
    if digest.len() >= field_size {
        return Cow::Borrowed(digest);
    }
    let mut padded = vec![0u8; field_size - digest.len()];
    padded.extend_from_slice(digest);
    Cow::Owned(padded)
}

/// Sign `digest` and return a low-S DER signature
///
/// # Arguments
///
/// * `secret` - Private scalar on P-256 or P-384
/// * `digest` - Pre-hashed message; longer digests are truncated to the field size
///   and shorter ones are zero-extended
/// * `order` - Order of the key's curve
pub fn sign_digest(secret: &EcSecretKey, digest: &[u8], order: &CurveOrder) -> CspResult<Vec<u8>> {
    let digest = prehash(digest, secret.curve().field_size());
    let digest = digest.as_ref();
    let (r, s) = match secret {
        EcSecretKey::P256(sk) => {
            let signer = p256::ecdsa::SigningKey::from(sk);
            let sig: p256::ecdsa::Signature =
                signer.sign_prehash(digest).map_err(signing_failed)?;
            let (r, s) = sig.split_bytes();
            (BigUint::from_bytes_be(&r), BigUint::from_bytes_be(&s))
        }
        EcSecretKey::P384(sk) => {
            let signer = p384::ecdsa::SigningKey::from(sk);
            let sig: p384::ecdsa::Signature =
                signer.sign_prehash(digest).map_err(signing_failed)?;
            let (r, s) = sig.split_bytes();
            (BigUint::from_bytes_be(&r), BigUint::from_bytes_be(&s))
        }
    };

    let s = order.to_low_s(s);
    Ok(marshal_signature(&r, &s))
}

/// Canonicalize and DER-encode a raw `r || s` signature
///
/// Devices return fixed-width concatenated scalars; both halves must have
/// the same length.
pub fn signature_from_raw(raw: &[u8], order: &CurveOrder) -> CspResult<Vec<u8>> {
    if raw.is_empty() || raw.len() % 2 != 0 {
        return Err(signing_failed(format!(
            "raw signature has odd length {}",
            raw.len()
        )));
    }
    let (r, s) = raw.split_at(raw.len() / 2);
    let r = BigUint::from_bytes_be(r);
    let s = order.to_low_s(BigUint::from_bytes_be(s));
    Ok(marshal_signature(&r, &s))
}

/// Decode a DER signature into fixed-width `r || s`, enforcing low-S
///
/// Returns `Ok(None)` if a scalar does not fit the field, which can only
/// mean the signature is invalid for this key.
pub fn signature_to_raw(
    signature: &[u8],
    order: &CurveOrder,
    field_size: usize,
) -> CspResult<Option<Vec<u8>>> {
    let (r, s) = unmarshal_signature(signature)?;
    if !order.is_low_s(&s) {
        return Err(CspError::malformed_signature(&format!(
            "Invalid S. Must be smaller than half the order [{}][{}]",
            s, order.half
        )));
    }

    let (Some(mut raw), Some(s)) = (to_fixed_be(&r, field_size), to_fixed_be(&s, field_size))
    else {
        return Ok(None);
    };
    raw.extend_from_slice(&s);
    Ok(Some(raw))
}

/// Verify a DER signature over `digest`
///
/// Encoding problems and high-S values are errors. An out-of-range `r` or a
/// signature that does not match is `Ok(false)`.
pub fn verify_digest(
    public: &EcPublicKey,
    signature: &[u8],
    digest: &[u8],
    order: &CurveOrder,
) -> CspResult<bool> {
    let field_size = public.curve().field_size();
    let Some(raw) = signature_to_raw(signature, order, field_size)? else {
        return Ok(false);
    };
    let digest = prehash(digest, field_size);
    let digest = digest.as_ref();

    let valid = match public {
        EcPublicKey::P256(pk) => match p256::ecdsa::Signature::from_slice(&raw) {
            Ok(sig) => p256::ecdsa::VerifyingKey::from(pk)
                .verify_prehash(digest, &sig)
                .is_ok(),
            Err(_) => false,
        },
        EcPublicKey::P384(pk) => match p384::ecdsa::Signature::from_slice(&raw) {
            Ok(sig) => p384::ecdsa::VerifyingKey::from(pk)
                .verify_prehash(digest, &sig)
                .is_ok(),
            Err(_) => false,
        },
    };
    Ok(valid)
}
