use std::fmt;
use std::sync::Arc;

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use super::Key;
use crate::error::{error_codes, CspError, CspResult};
use crate::hash::SkiFunction;

/// Supported NIST curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcCurve {
    P256,
    P384,
}

impl EcCurve {
    /// Size of a field element / scalar in bytes
    pub fn field_size(&self) -> usize {
        match self {
            EcCurve::P256 => 32,
            EcCurve::P384 => 48,
        }
    }

    /// Curve selected by a security level
    pub fn for_security_level(level: u16) -> Option<EcCurve> {
        match level {
            256 => Some(EcCurve::P256),
            384 => Some(EcCurve::P384),
            _ => None,
        }
    }
}

impl fmt::Display for EcCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcCurve::P256 => write!(f, "P-256"),
            EcCurve::P384 => write!(f, "P-384"),
        }
    }
}

/// A parsed elliptic-curve public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcPublicKey {
    P256(p256::PublicKey),
    P384(p384::PublicKey),
}

impl EcPublicKey {
    pub fn curve(&self) -> EcCurve {
        match self {
            EcPublicKey::P256(_) => EcCurve::P256,
            EcPublicKey::P384(_) => EcCurve::P384,
        }
    }

    /// Uncompressed SEC1 encoding (`0x04 || X || Y`)
    pub fn to_uncompressed_point(&self) -> Vec<u8> {
        match self {
            EcPublicKey::P256(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
            EcPublicKey::P384(pk) => pk.to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    /// Parse a SEC1-encoded point on `curve`
    pub fn from_sec1_bytes(curve: EcCurve, bytes: &[u8]) -> CspResult<Self> {
        let parsed = match curve {
            EcCurve::P256 => p256::PublicKey::from_sec1_bytes(bytes).map(EcPublicKey::P256),
            EcCurve::P384 => p384::PublicKey::from_sec1_bytes(bytes).map(EcPublicKey::P384),
        };
        parsed.map_err(|e| {
            CspError::invalid_key_material("ec_point", &format!("Invalid {} point: {}", curve, e))
        })
    }

    /// DER-encoded SubjectPublicKeyInfo
    pub fn to_spki_der(&self) -> CspResult<Vec<u8>> {
        let der = match self {
            EcPublicKey::P256(pk) => pk.to_public_key_der(),
            EcPublicKey::P384(pk) => pk.to_public_key_der(),
        };
        der.map(|doc| doc.as_bytes().to_vec()).map_err(|e| {
            CspError::crypto_failure(
                "to_spki_der",
                &format!("Failed marshalling EC public key: {}", e),
                error_codes::ENCODING_FAILED,
            )
        })
    }

    /// Parse a DER-encoded SubjectPublicKeyInfo for either supported curve
    pub fn from_spki_der(der: &[u8]) -> CspResult<Self> {
        if let Ok(pk) = p256::PublicKey::from_public_key_der(der) {
            return Ok(EcPublicKey::P256(pk));
        }
        p384::PublicKey::from_public_key_der(der)
            .map(EcPublicKey::P384)
            .map_err(|e| {
                CspError::invalid_key_material(
                    "ecdsa_pkix_import",
                    &format!("Failed converting PKIX to ECDSA public key: {}", e),
                )
            })
    }

    /// Point addition, `self + other`
    pub fn add(&self, other: &EcPublicKey) -> CspResult<EcPublicKey> {
        let identity = || {
            CspError::crypto_failure(
                "ec_point_add",
                "Point addition produced the identity",
                error_codes::KEY_DERIVATION_FAILED,
            )
        };
        match (self, other) {
            (EcPublicKey::P256(a), EcPublicKey::P256(b)) => {
                let sum = (a.to_projective() + b.to_projective()).to_affine();
                p256::PublicKey::from_affine(sum)
                    .map(EcPublicKey::P256)
                    .map_err(|_| identity())
            }
            (EcPublicKey::P384(a), EcPublicKey::P384(b)) => {
                let sum = (a.to_projective() + b.to_projective()).to_affine();
                p384::PublicKey::from_affine(sum)
                    .map(EcPublicKey::P384)
                    .map_err(|_| identity())
            }
            _ => Err(CspError::invalid_argument(
                "point",
                "Points must be on the same curve",
            )),
        }
    }
}

/// An elliptic-curve private scalar
#[derive(Clone)]
pub enum EcSecretKey {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
}

impl fmt::Debug for EcSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcSecretKey")
            .field("curve", &self.curve())
            .field("scalar", &"[REDACTED]")
            .finish()
    }
}

impl EcSecretKey {
    pub fn generate(curve: EcCurve) -> Self {
        match curve {
            EcCurve::P256 => EcSecretKey::P256(p256::SecretKey::random(&mut OsRng)),
            EcCurve::P384 => EcSecretKey::P384(p384::SecretKey::random(&mut OsRng)),
        }
    }

    pub fn curve(&self) -> EcCurve {
        match self {
            EcSecretKey::P256(_) => EcCurve::P256,
            EcSecretKey::P384(_) => EcCurve::P384,
        }
    }

    pub fn public_key(&self) -> EcPublicKey {
        match self {
            EcSecretKey::P256(sk) => EcPublicKey::P256(sk.public_key()),
            EcSecretKey::P384(sk) => EcPublicKey::P384(sk.public_key()),
        }
    }

    /// Big-endian scalar, exactly `curve.field_size()` bytes
    pub fn to_be_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            EcSecretKey::P256(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
            EcSecretKey::P384(sk) => Zeroizing::new(sk.to_bytes().to_vec()),
        }
    }

    /// Scalar from big-endian bytes; zero and out-of-range values are rejected
    pub fn from_be_bytes(curve: EcCurve, bytes: &[u8]) -> CspResult<Self> {
        let parsed = match curve {
            EcCurve::P256 => p256::SecretKey::from_slice(bytes).map(EcSecretKey::P256),
            EcCurve::P384 => p384::SecretKey::from_slice(bytes).map(EcSecretKey::P384),
        };
        parsed.map_err(|_| {
            CspError::invalid_key_material("ec_scalar", &format!("Invalid {} scalar", curve))
        })
    }

    /// Parse a PKCS#8 DER private key for either supported curve
    pub fn from_pkcs8_der(der: &[u8]) -> CspResult<Self> {
        if let Ok(sk) = p256::SecretKey::from_pkcs8_der(der) {
            return Ok(EcSecretKey::P256(sk));
        }
        p384::SecretKey::from_pkcs8_der(der)
            .map(EcSecretKey::P384)
            .map_err(|e| {
                CspError::invalid_key_material(
                    "ecdsa_private_key_import",
                    &format!("Failed converting PKCS#8 to ECDSA private key: {}", e),
                )
            })
    }
}

/// ECDSA public key with its SKI
#[derive(Debug, Clone)]
pub struct EcdsaPublicKey {
    key: EcPublicKey,
    ski: Vec<u8>,
}

impl EcdsaPublicKey {
    /// Wrap a public key, fingerprinting its uncompressed point
    pub fn new(key: EcPublicKey, ski_fn: &SkiFunction) -> CspResult<Self> {
        let ski = ski_fn.ski(&key.to_uncompressed_point())?;
        Ok(Self { key, ski })
    }

    /// Wrap a public key whose SKI is already known
    pub fn with_ski(key: EcPublicKey, ski: Vec<u8>) -> Self {
        Self { key, ski }
    }

    pub fn key(&self) -> &EcPublicKey {
        &self.key
    }

    pub fn curve(&self) -> EcCurve {
        self.key.curve()
    }
}

impl Key for EcdsaPublicKey {
    fn to_bytes(&self) -> CspResult<Vec<u8>> {
        self.key.to_spki_der()
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

/// ECDSA private key; the SKI is that of its public key
#[derive(Debug, Clone)]
pub struct EcdsaPrivateKey {
    secret: EcSecretKey,
    public: EcdsaPublicKey,
}

impl EcdsaPrivateKey {
    pub fn new(secret: EcSecretKey, ski_fn: &SkiFunction) -> CspResult<Self> {
        let public = EcdsaPublicKey::new(secret.public_key(), ski_fn)?;
        Ok(Self { secret, public })
    }

    pub fn secret(&self) -> &EcSecretKey {
        &self.secret
    }

    pub fn public(&self) -> &EcdsaPublicKey {
        &self.public
    }

    pub fn curve(&self) -> EcCurve {
        self.secret.curve()
    }
}

impl Key for EcdsaPrivateKey {
    fn to_bytes(&self) -> CspResult<Vec<u8>> {
        Err(CspError::not_exportable("ECDSA private key"))
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
