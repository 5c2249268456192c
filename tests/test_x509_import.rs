// Public key extraction from X.509 certificates

use std::sync::Arc;
use std::time::Duration;

use cspkit::prelude::*;
use x509_cert::certificate::{Certificate, TbsCertificate, Version};
use x509_cert::der::asn1::BitString;
use x509_cert::der::Decode;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, ObjectIdentifier, SubjectPublicKeyInfoOwned};
use x509_cert::time::Validity;

/// ecdsa-with-SHA256
const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
/// id-Ed25519
const ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

fn new_csp() -> SwCsp {
    SwCsp::new(SwOpts::default(), Some(Arc::new(InMemoryKeyStore::new())))
        .expect("Failed to create provider")
}

/// A structurally valid certificate around `spki`; the signature is filler
fn certificate(spki: SubjectPublicKeyInfoOwned) -> Certificate {
    let algorithm = AlgorithmIdentifierOwned {
        oid: ECDSA_WITH_SHA256,
        parameters: None,
    };
    Certificate {
        tbs_certificate: TbsCertificate {
            version: Version::V3,
            serial_number: SerialNumber::new(&[0x01]).unwrap(),
            signature: algorithm.clone(),
            issuer: Name::default(),
            validity: Validity::from_now(Duration::from_secs(3600)).unwrap(),
            subject: Name::default(),
            subject_public_key_info: spki,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: None,
        },
        signature_algorithm: algorithm,
        signature: BitString::from_bytes(&[0u8; 8]).unwrap(),
    }
}

fn certificate_for(key: &dyn Key) -> Certificate {
    let der = key.public_key().unwrap().to_bytes().unwrap();
    certificate(SubjectPublicKeyInfoOwned::from_der(&der).unwrap())
}

#[test]
fn test_import_ecdsa_certificate() {
    let csp = new_csp();
    let key = csp.key_gen(Some(&EcdsaP256KeyGenOpts::new(true))).unwrap();
    let cert = certificate_for(key.as_ref());

    let imported = csp
        .key_import(
            Some(KeyMaterial::from(&cert)),
            Some(&X509PublicKeyImportOpts::new(true)),
        )
        .unwrap();
    assert!(!imported.is_private());
    assert_eq!(imported.ski(), key.ski());

    let digest = csp.hash(b"certificate", HashType::Sha2_256).unwrap();
    let signature = csp.sign(Some(key.as_ref()), &digest, None).unwrap();
    assert!(csp.verify(Some(imported.as_ref()), &signature, &digest, None).unwrap());
}

#[test]
fn test_import_rsa_certificate() {
    let csp = new_csp();
    let key = csp.key_gen(Some(&Rsa1024KeyGenOpts::new(true))).unwrap();
    let cert = certificate_for(key.as_ref());

    let imported = csp
        .key_import(
            Some(KeyMaterial::from(&cert)),
            Some(&X509PublicKeyImportOpts::expecting(true, PublicKeyAlgorithm::Rsa)),
        )
        .unwrap();
    assert_eq!(imported.ski(), key.ski());
}

#[test]
fn test_expected_algorithm_mismatch() {
    let csp = new_csp();
    let key = csp.key_gen(Some(&Rsa1024KeyGenOpts::new(true))).unwrap();
    let cert = certificate_for(key.as_ref());

    let err = csp
        .key_import(
            Some(KeyMaterial::from(&cert)),
            Some(&X509PublicKeyImportOpts::expecting(true, PublicKeyAlgorithm::Ecdsa)),
        )
        .unwrap_err();
    assert!(matches!(err, CspError::InvalidKeyMaterial { .. }));
}

#[test]
fn test_unrecognized_public_key_algorithm() {
    let csp = new_csp();
    let cert = certificate(SubjectPublicKeyInfoOwned {
        algorithm: AlgorithmIdentifierOwned {
            oid: ED25519,
            parameters: None,
        },
        subject_public_key: BitString::from_bytes(&[0x07; 32]).unwrap(),
    });

    let err = csp
        .key_import(
            Some(KeyMaterial::from(&cert)),
            Some(&X509PublicKeyImportOpts::new(true)),
        )
        .unwrap_err();
    assert!(matches!(err, CspError::InvalidKeyMaterial { .. }));
}

#[test]
fn test_certificate_given_to_other_importers() {
    let csp = new_csp();
    let key = csp.key_gen(Some(&EcdsaP256KeyGenOpts::new(true))).unwrap();
    let cert = certificate_for(key.as_ref());

    let err = csp
        .key_import(
            Some(KeyMaterial::from(&cert)),
            Some(&Aes256ImportKeyOpts::new(true)),
        )
        .unwrap_err();
    assert!(matches!(err, CspError::InvalidKeyMaterial { .. }));

    let err = csp
        .key_import(
            Some(KeyMaterial::from(&cert)),
            Some(&EcdsaPkixPublicKeyImportOpts::new(true)),
        )
        .unwrap_err();
    assert!(matches!(err, CspError::InvalidKeyMaterial { .. }));
}
