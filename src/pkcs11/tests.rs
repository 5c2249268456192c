use super::*;
use crate::keystore::InMemoryKeyStore;
use crate::opts::{Aes256KeyGenOpts, AesCbcPkcs7ModeOpts, EcdsaP256KeyGenOpts, EcdsaReRandKeyOpts};
use std::path::Path;

const DEFAULT_LIBRARY: &str = "/usr/lib/softhsm/libsofthsm2.so";

fn test_opts() -> Pkcs11Opts {
    Pkcs11Opts {
        library: std::env::var("CSPKIT_PKCS11_LIB").unwrap_or_else(|_| DEFAULT_LIBRARY.to_string()),
        label: std::env::var("CSPKIT_PKCS11_LABEL").unwrap_or_else(|_| "ForFabric".to_string()),
        pin: std::env::var("CSPKIT_PKCS11_PIN").unwrap_or_else(|_| "98765432".to_string()),
        hash_family: HashFamily::Sha2,
        security_level: 256,
        soft_verify: false,
        immutable: false,
    }
}

/// Serializes tests that touch the shared token
static TOKEN: Mutex<()> = Mutex::new(());

/// A provider on the test token, or `None` when no token is reachable
///
/// The guard keeps other token tests out until it is dropped.
fn test_csp(opts: Pkcs11Opts) -> Option<(Pkcs11Csp, MutexGuard<'static, ()>)> {
    if !Path::new(&opts.library).exists() {
        println!("Skipping HSM test: PKCS#11 library not found at {}", opts.library);
        return None;
    }
    let guard = TOKEN.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    match Pkcs11Csp::new(opts, Some(Arc::new(InMemoryKeyStore::new()))) {
        Ok(csp) => Some((csp, guard)),
        Err(e) => {
            println!("Skipping HSM test: {}", e);
            None
        }
    }
}

#[test]
fn test_opts_debug_redacts_pin() {
    let opts = test_opts();
    let debug = format!("{:?}", opts);
    assert!(debug.contains("[REDACTED]"));
    assert!(!debug.contains(&opts.pin));
}

#[test]
fn test_opts_serialization_skips_pin() {
    let mut opts = test_opts();
    opts.pin = "secret-pin-value".to_string();
    let json = serde_json::to_string(&opts).unwrap();
    assert!(!json.contains("secret-pin-value"));
    assert!(json.contains("\"SHA2\""));

    let restored: Pkcs11Opts = serde_json::from_str(&json).unwrap();
    assert!(restored.pin.is_empty());
    assert_eq!(restored.label, opts.label);
    assert_eq!(restored.sw_opts(), opts.sw_opts());
}

#[test]
fn test_new_requires_keystore() {
    let opts = Pkcs11Opts {
        library: "/nonexistent/libpkcs11.so".to_string(),
        ..test_opts()
    };
    let err = Pkcs11Csp::new(opts, None).unwrap_err();
    assert!(matches!(err, CspError::InvalidArgument { .. }));
}

#[test]
fn test_new_fails_on_missing_library() {
    let opts = Pkcs11Opts {
        library: "/nonexistent/libpkcs11.so".to_string(),
        ..test_opts()
    };
    let err = Pkcs11Csp::new(opts, Some(Arc::new(InMemoryKeyStore::new()))).unwrap_err();
    assert!(matches!(err, CspError::Pkcs11Failure { .. }));
}

#[test]
fn test_ec_params_identify_curves() {
    for curve in [EcCurve::P256, EcCurve::P384] {
        assert_eq!(curve_from_ec_params(ec_params(curve)), Some(curve));
    }
    assert_eq!(curve_from_ec_params(&[0x06, 0x03, 0x2b, 0x65, 0x70]), None);
}

#[test]
fn test_unwrap_ec_point_accepts_both_encodings() {
    let point: Vec<u8> = std::iter::once(0x04).chain(1..=64u8).collect();
    assert_eq!(unwrap_ec_point(EcCurve::P256, &point).unwrap(), point.as_slice());

    let mut wrapped = vec![0x04, 65];
    wrapped.extend_from_slice(&point);
    assert_eq!(unwrap_ec_point(EcCurve::P256, &wrapped).unwrap(), point.as_slice());

    // Wrapped P-256 point presented as P-384
    assert!(unwrap_ec_point(EcCurve::P384, &wrapped).is_err());
    assert!(unwrap_ec_point(EcCurve::P256, &point[..10]).is_err());
}

#[test]
fn test_device_key_is_not_exportable() {
    let ski = crate::hash::SkiFunction::new(
        SwOpts::default(),
        Arc::new(crate::hash::HasherRegistry::default()),
    );
    let secret = crate::key::EcSecretKey::generate(EcCurve::P256);
    let public = EcdsaPublicKey::new(secret.public_key(), &ski).unwrap();
    let key = Pkcs11EcdsaPrivateKey::new(public.clone());

    assert!(key.is_private());
    assert!(!key.is_symmetric());
    assert_eq!(key.ski(), public.ski());
    assert!(matches!(key.to_bytes(), Err(CspError::NotExportable { .. })));
    assert_eq!(key.public_key().unwrap().ski(), public.ski());
}

#[test]
fn test_hsm_sign_and_verify() {
    let Some((csp, _token)) = test_csp(test_opts()) else {
        return;
    };

    let key = csp.key_gen(Some(&EcdsaP256KeyGenOpts::new(true))).unwrap();
    assert!(downcast_key::<Pkcs11EcdsaPrivateKey>(key.as_ref()).is_some());

    let digest = csp.hash(b"Hello World", HashType::Sha2_256).unwrap();
    let signature = csp.sign(Some(key.as_ref()), &digest, None).unwrap();
    assert!(csp.verify(Some(key.as_ref()), &signature, &digest, None).unwrap());

    let public = key.public_key().unwrap();
    assert!(csp.verify(Some(public.as_ref()), &signature, &digest, None).unwrap());

    let other = csp.hash(b"Hello World!", HashType::Sha2_256).unwrap();
    assert!(!csp.verify(Some(key.as_ref()), &signature, &other, None).unwrap());
}

#[test]
fn test_hsm_soft_verify_matches_device() {
    let opts = Pkcs11Opts {
        soft_verify: true,
        ..test_opts()
    };
    let Some((csp, _token)) = test_csp(opts) else {
        return;
    };

    let key = csp.key_gen(Some(&EcdsaP256KeyGenOpts::new(true))).unwrap();
    let digest = csp.hash(b"soft verify", HashType::Sha2_256).unwrap();
    let signature = csp.sign(Some(key.as_ref()), &digest, None).unwrap();
    assert!(csp.verify(Some(key.as_ref()), &signature, &digest, None).unwrap());
}

#[test]
fn test_hsm_key_lookup_by_ski() {
    let Some((csp, _token)) = test_csp(test_opts()) else {
        return;
    };

    let key = csp.key_gen(Some(&EcdsaP256KeyGenOpts::new(false))).unwrap();
    let found = csp.key(key.ski()).unwrap();
    assert!(found.is_private());
    assert_eq!(found.ski(), key.ski());
    assert!(downcast_key::<Pkcs11EcdsaPrivateKey>(found.as_ref()).is_some());
}

#[test]
fn test_hsm_delegates_software_operations() {
    let Some((csp, _token)) = test_csp(test_opts()) else {
        return;
    };

    let aes = csp.key_gen(Some(&Aes256KeyGenOpts::new(false))).unwrap();
    let ciphertext = csp
        .encrypt(Some(aes.as_ref()), b"Hello World", Some(&AesCbcPkcs7ModeOpts::default()))
        .unwrap();
    let plaintext = csp.decrypt(Some(aes.as_ref()), &ciphertext, None).unwrap();
    assert_eq!(plaintext, b"Hello World");
    assert_eq!(csp.key(aes.ski()).unwrap().ski(), aes.ski());

    // Token keys cannot be re-randomized in software
    let device = csp.key_gen(Some(&EcdsaP256KeyGenOpts::new(true))).unwrap();
    let err = csp
        .key_deriv(
            Some(device.as_ref()),
            Some(&EcdsaReRandKeyOpts::new(true, vec![1u8; 32])),
        )
        .unwrap_err();
    assert!(matches!(err, CspError::UnsupportedAlgorithm { .. }));
}

/// EC key objects currently on the token
fn ec_objects(csp: &Pkcs11Csp) -> Vec<ObjectHandle> {
    csp.session()
        .unwrap()
        .find_objects(&[Attribute::KeyType(KeyType::EC)])
        .unwrap()
}

#[test]
fn test_hsm_failed_key_gen_leaves_no_objects() {
    // Accepted at construction, rejected once an SKI is needed
    let opts = Pkcs11Opts {
        security_level: 512,
        ..test_opts()
    };
    let Some((csp, _token)) = test_csp(opts) else {
        return;
    };

    let before = ec_objects(&csp);
    for ephemeral in [false, true] {
        let err = csp
            .key_gen(Some(&EcdsaP256KeyGenOpts::new(ephemeral)))
            .unwrap_err();
        assert!(matches!(err, CspError::UnsupportedHashType { .. }));
    }
    let after = ec_objects(&csp);

    assert_eq!(after.len(), before.len());
    assert!(after.iter().all(|handle| before.contains(handle)));
}
