use std::sync::Arc;

use super::*;
use crate::error::CspError;
use crate::hash::{HashFamily, HasherRegistry, SkiFunction, SwOpts};

fn ski_fn() -> SkiFunction {
    SkiFunction::new(
        SwOpts::new(256, HashFamily::Sha2),
        Arc::new(HasherRegistry::default()),
    )
}

#[test]
fn test_ecdsa_private_and_public_share_ski() {
    let ski_fn = ski_fn();
    for curve in [EcCurve::P256, EcCurve::P384] {
        let key = EcdsaPrivateKey::new(EcSecretKey::generate(curve), &ski_fn).unwrap();
        let public1 = key.public_key().unwrap();
        let public2 = key.public_key().unwrap();

        assert!(key.is_private());
        assert!(!key.is_symmetric());
        assert!(!public1.is_private());
        assert_eq!(key.ski(), public1.ski());
        assert_eq!(public1.ski(), public2.ski());
        assert_eq!(
            key.ski(),
            ski_fn.ski(&key.public().key().to_uncompressed_point()).unwrap().as_slice()
        );
    }
}

#[test]
fn test_ecdsa_export_rules() {
    let ski_fn = ski_fn();
    let key = EcdsaPrivateKey::new(EcSecretKey::generate(EcCurve::P256), &ski_fn).unwrap();
    assert!(matches!(
        key.to_bytes(),
        Err(CspError::NotExportable { .. })
    ));

    let der = key.public_key().unwrap().to_bytes().unwrap();
    let parsed = EcPublicKey::from_spki_der(&der).unwrap();
    assert_eq!(&parsed, key.public().key());
}

#[test]
fn test_ec_point_addition_matches_scalar_addition() {
    let a = EcSecretKey::generate(EcCurve::P256);
    let b = EcSecretKey::generate(EcCurve::P256);
    let sum = a.public_key().add(&b.public_key()).unwrap();
    assert_eq!(sum.curve(), EcCurve::P256);

    let mixed = a.public_key().add(&EcSecretKey::generate(EcCurve::P384).public_key());
    assert!(matches!(mixed, Err(CspError::InvalidArgument { .. })));
}

#[test]
fn test_ec_scalar_round_trip() {
    let sk = EcSecretKey::generate(EcCurve::P384);
    let bytes = sk.to_be_bytes();
    assert_eq!(bytes.len(), EcCurve::P384.field_size());
    let back = EcSecretKey::from_be_bytes(EcCurve::P384, &bytes).unwrap();
    assert_eq!(back.public_key(), sk.public_key());

    assert!(EcSecretKey::from_be_bytes(EcCurve::P256, &[0u8; 32]).is_err());
}

#[test]
fn test_rsa_key_ski_and_export() {
    let ski_fn = ski_fn();
    let inner = ::rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
    let key = RsaPrivateKey::new(inner, &ski_fn).unwrap();
    let public = key.public_key().unwrap();

    assert_eq!(key.ski(), public.ski());
    assert!(key.to_bytes().is_err());

    let der = public.to_bytes().unwrap();
    let reparsed = RsaPublicKey::from_spki_der(&der, &ski_fn).unwrap();
    assert_eq!(reparsed.ski(), key.ski());
    assert_eq!(reparsed.bits(), 1024);
    assert!(!format!("{:?}", key).contains("primes"));
}

#[test]
fn test_aes_key_export_policy() {
    let ski_fn = ski_fn();
    let exportable = AesKey::new(vec![7u8; 32], true, &ski_fn).unwrap();
    let sealed = AesKey::new(vec![7u8; 32], false, &ski_fn).unwrap();

    assert_eq!(exportable.to_bytes().unwrap(), vec![7u8; 32]);
    assert!(matches!(
        sealed.to_bytes(),
        Err(CspError::NotExportable { .. })
    ));
    assert_eq!(exportable.ski(), sealed.ski());
    assert!(sealed.is_symmetric());
    assert!(sealed.is_private());
    assert!(matches!(
        sealed.public_key(),
        Err(CspError::UnsupportedAlgorithm { .. })
    ));
    assert!(!format!("{:?}", sealed).contains("7, 7"));
}

#[test]
fn test_key_tag_reports_concrete_type() {
    let ski_fn = ski_fn();
    let key: Arc<dyn Key> = Arc::new(AesKey::new(vec![1u8; 16], false, &ski_fn).unwrap());

    assert_eq!(key_tag(key.as_ref()), std::any::TypeId::of::<AesKey>());
    assert!(downcast_key::<AesKey>(key.as_ref()).is_some());
    assert!(downcast_key::<EcdsaPublicKey>(key.as_ref()).is_none());
    assert!(key.as_ref().type_name().ends_with("AesKey"));
}
