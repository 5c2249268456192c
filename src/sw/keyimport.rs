use std::sync::Arc;

use x509_cert::der::Encode;
use x509_cert::spki::ObjectIdentifier;

use crate::csp::{KeyImporter, KeyMaterial};
use crate::error::{error_codes, CspError, CspResult};
use crate::hash::SkiFunction;
use crate::key::{
    AesKey, EcPublicKey, EcSecretKey, EcdsaPrivateKey, EcdsaPublicKey, Key, RsaPublicKey,
};
use crate::opts::{KeyImportOpts, PublicKeyAlgorithm, X509PublicKeyImportOpts};

/// id-ecPublicKey
const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
/// rsaEncryption
const OID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

const AES_256_KEY_LEN: usize = 32;

fn wrong_shape(operation: &str, expected: &str, got: &KeyMaterial<'_>) -> CspError {
    CspError::invalid_key_material(
        operation,
        &format!("Invalid raw material. Expected {}, got {}", expected, got.kind()),
    )
}

/// Non-empty raw bytes, or `InvalidKeyMaterial`
fn raw_bytes<'a>(operation: &str, raw: KeyMaterial<'a>) -> CspResult<&'a [u8]> {
    match raw {
        KeyMaterial::Raw(bytes) if bytes.is_empty() => Err(CspError::invalid_key_material(
            operation,
            "Invalid raw. It must not be empty",
        )),
        KeyMaterial::Raw(bytes) => Ok(bytes),
        other => Err(wrong_shape(operation, "byte array", &other)),
    }
}

pub(crate) struct Aes256ImportKeyImporter {
    pub ski: SkiFunction,
}

impl KeyImporter for Aes256ImportKeyImporter {
    fn key_import(
        &self,
        raw: KeyMaterial<'_>,
        _opts: &dyn KeyImportOpts,
    ) -> CspResult<Arc<dyn Key>> {
        let bytes = raw_bytes("aes256_import", raw)?;
        if bytes.len() != AES_256_KEY_LEN {
            return Err(CspError::invalid_key_material(
                "aes256_import",
                &format!(
                    "Invalid Key Length [{}]. Must be {} bytes",
                    bytes.len(),
                    AES_256_KEY_LEN
                ),
            ));
        }
        Ok(Arc::new(AesKey::new(bytes.to_vec(), false, &self.ski)?))
    }
}

pub(crate) struct HmacImportKeyImporter {
    pub ski: SkiFunction,
}

impl KeyImporter for HmacImportKeyImporter {
    fn key_import(
        &self,
        raw: KeyMaterial<'_>,
        _opts: &dyn KeyImportOpts,
    ) -> CspResult<Arc<dyn Key>> {
        let bytes = raw_bytes("hmac_import", raw)?;
        Ok(Arc::new(AesKey::new(bytes.to_vec(), false, &self.ski)?))
    }
}

#[derive(Clone)]
pub(crate) struct EcdsaPkixPublicKeyImporter {
    pub ski: SkiFunction,
}

impl KeyImporter for EcdsaPkixPublicKeyImporter {
    fn key_import(
        &self,
        raw: KeyMaterial<'_>,
        _opts: &dyn KeyImportOpts,
    ) -> CspResult<Arc<dyn Key>> {
        let der = raw_bytes("ecdsa_pkix_import", raw)?;
        let public = EcPublicKey::from_spki_der(der)?;
        Ok(Arc::new(EcdsaPublicKey::new(public, &self.ski)?))
    }
}

pub(crate) struct EcdsaPrivateKeyImporter {
    pub ski: SkiFunction,
}

impl KeyImporter for EcdsaPrivateKeyImporter {
    fn key_import(
        &self,
        raw: KeyMaterial<'_>,
        _opts: &dyn KeyImportOpts,
    ) -> CspResult<Arc<dyn Key>> {
        let der = raw_bytes("ecdsa_private_key_import", raw)?;
        let secret = EcSecretKey::from_pkcs8_der(der)?;
        Ok(Arc::new(EcdsaPrivateKey::new(secret, &self.ski)?))
    }
}

pub(crate) struct EcdsaNativePublicKeyImporter {
    pub ski: SkiFunction,
}

impl KeyImporter for EcdsaNativePublicKeyImporter {
    fn key_import(
        &self,
        raw: KeyMaterial<'_>,
        _opts: &dyn KeyImportOpts,
    ) -> CspResult<Arc<dyn Key>> {
        match raw {
            KeyMaterial::EcdsaPublicKey(public) => {
                Ok(Arc::new(EcdsaPublicKey::new(public.clone(), &self.ski)?))
            }
            other => Err(wrong_shape("ecdsa_native_import", "EC public key", &other)),
        }
    }
}

#[derive(Clone)]
pub(crate) struct RsaPkixPublicKeyImporter {
    pub ski: SkiFunction,
}

impl KeyImporter for RsaPkixPublicKeyImporter {
    fn key_import(
        &self,
        raw: KeyMaterial<'_>,
        _opts: &dyn KeyImportOpts,
    ) -> CspResult<Arc<dyn Key>> {
        let der = raw_bytes("rsa_pkix_import", raw)?;
        Ok(Arc::new(RsaPublicKey::from_spki_der(der, &self.ski)?))
    }
}

pub(crate) struct RsaNativePublicKeyImporter {
    pub ski: SkiFunction,
}

impl KeyImporter for RsaNativePublicKeyImporter {
    fn key_import(
        &self,
        raw: KeyMaterial<'_>,
        _opts: &dyn KeyImportOpts,
    ) -> CspResult<Arc<dyn Key>> {
        match raw {
            KeyMaterial::RsaPublicKey(public) => {
                Ok(Arc::new(RsaPublicKey::new(public.clone(), &self.ski)?))
            }
            other => Err(wrong_shape("rsa_native_import", "RSA public key", &other)),
        }
    }
}

/// Extracts the SubjectPublicKeyInfo of a certificate and hands it to the
/// matching PKIX importer
pub(crate) struct X509PublicKeyImporter {
    pub ecdsa: EcdsaPkixPublicKeyImporter,
    pub rsa: RsaPkixPublicKeyImporter,
}

impl KeyImporter for X509PublicKeyImporter {
    fn key_import(
        &self,
        raw: KeyMaterial<'_>,
        opts: &dyn KeyImportOpts,
    ) -> CspResult<Arc<dyn Key>> {
        let cert = match raw {
            KeyMaterial::Certificate(cert) => cert,
            other => return Err(wrong_shape("x509_import", "X.509 certificate", &other)),
        };

        let spki = &cert.tbs_certificate.subject_public_key_info;
        let oid = spki.algorithm.oid;
        let algorithm = if oid == OID_EC_PUBLIC_KEY {
            PublicKeyAlgorithm::Ecdsa
        } else if oid == OID_RSA_ENCRYPTION {
            PublicKeyAlgorithm::Rsa
        } else {
            return Err(CspError::invalid_key_material(
                "x509_import",
                &format!("Certificate's public key type not recognized [{}]", oid),
            ));
        };

        let expected = opts
            .as_any()
            .downcast_ref::<X509PublicKeyImportOpts>()
            .and_then(|opts| opts.expected);
        if let Some(expected) = expected {
            if expected != algorithm {
                return Err(CspError::invalid_key_material(
                    "x509_import",
                    &format!(
                        "Certificate public key algorithm [{}] does not match expected [{}]",
                        algorithm, expected
                    ),
                ));
            }
        }

        let der = spki.to_der().map_err(|e| {
            CspError::crypto_failure(
                "x509_import",
                &format!("Failed encoding SubjectPublicKeyInfo: {}", e),
                error_codes::ENCODING_FAILED,
            )
        })?;

        match algorithm {
            PublicKeyAlgorithm::Ecdsa => self.ecdsa.key_import(KeyMaterial::Raw(&der), opts),
            PublicKeyAlgorithm::Rsa => self.rsa.key_import(KeyMaterial::Raw(&der), opts),
        }
    }
}
