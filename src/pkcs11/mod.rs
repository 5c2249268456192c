/*!
 * PKCS#11 provider
 *
 * `Pkcs11Csp` keeps ECDSA private keys on a hardware token reached through a
 * PKCS#11 library. Key generation and signing for those keys happen on the
 * device, and so does verification unless `soft_verify` is set. Every other
 * operation is handed to an inner software provider sharing the same key
 * store and hash configuration.
 */

mod key;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use cryptoki::context::{CInitializeArgs, Pkcs11};
use cryptoki::error::{Error as Pkcs11Error, RvError};
use cryptoki::mechanism::Mechanism;
use cryptoki::object::{Attribute, AttributeType, KeyType, ObjectClass, ObjectHandle};
use cryptoki::session::{Session, UserType};
use cryptoki::types::AuthPin;
use serde::{Deserialize, Serialize};

use crate::csp::{Csp, KeyMaterial};
use crate::ecdsa;
use crate::error::{CspError, CspResult};
use crate::hash::{HashFamily, HashType, Hasher, SwOpts};
use crate::key::{downcast_key, EcCurve, EcPublicKey, EcdsaPublicKey, Key};
use crate::keystore::KeyStore;
use crate::opts::{
    DecrypterOpts, EcdsaKeyGenOpts, EcdsaP256KeyGenOpts, EcdsaP384KeyGenOpts, EncrypterOpts,
    KeyDerivOpts, KeyGenOpts, KeyImportOpts, SignerOpts,
};
use crate::sw::SwCsp;

pub use self::key::Pkcs11EcdsaPrivateKey;

/// DER-encoded namedCurve OID for P-256 (1.2.840.10045.3.1.7)
const P256_EC_PARAMS: &[u8] = &[0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];
/// DER-encoded namedCurve OID for P-384 (1.3.132.0.34)
const P384_EC_PARAMS: &[u8] = &[0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x22];

fn ec_params(curve: EcCurve) -> &'static [u8] {
    match curve {
        EcCurve::P256 => P256_EC_PARAMS,
        EcCurve::P384 => P384_EC_PARAMS,
    }
}

fn curve_from_ec_params(params: &[u8]) -> Option<EcCurve> {
    if params == P256_EC_PARAMS {
        Some(EcCurve::P256)
    } else if params == P384_EC_PARAMS {
        Some(EcCurve::P384)
    } else {
        None
    }
}

/// Strip the OCTET STRING wrapper tokens put around `CKA_EC_POINT`
///
/// Some tokens return the bare point instead; the two forms are told apart by
/// length since an uncompressed point is always `2 * field + 1` bytes.
fn unwrap_ec_point(curve: EcCurve, value: &[u8]) -> CspResult<&[u8]> {
    let point_len = 2 * curve.field_size() + 1;
    if value.len() == point_len {
        return Ok(value);
    }
    match value {
        [0x04, len, point @ ..] if *len as usize == point_len && point.len() == point_len => {
            Ok(point)
        }
        _ => Err(CspError::invalid_key_material(
            "pkcs11_ec_point",
            &format!(
                "Unexpected EC point encoding of {} bytes for {}",
                value.len(),
                curve
            ),
        )),
    }
}

/// Configuration of the PKCS#11 provider
#[derive(Clone, Serialize, Deserialize)]
pub struct Pkcs11Opts {
    /// Path to the PKCS#11 shared library
    pub library: String,
    /// Label of the token to use
    pub label: String,
    /// User PIN; never serialized
    #[serde(skip_serializing, default)]
    pub pin: String,
    pub hash_family: HashFamily,
    pub security_level: u16,
    /// Verify signatures in software instead of on the device
    #[serde(default)]
    pub soft_verify: bool,
    /// Mark generated token objects as not modifiable
    #[serde(default)]
    pub immutable: bool,
}

impl fmt::Debug for Pkcs11Opts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pkcs11Opts")
            .field("library", &self.library)
            .field("label", &self.label)
            .field("pin", &"[REDACTED]")
            .field("hash_family", &self.hash_family)
            .field("security_level", &self.security_level)
            .field("soft_verify", &self.soft_verify)
            .field("immutable", &self.immutable)
            .finish()
    }
}

impl Pkcs11Opts {
    /// Hash configuration for the inner software provider
    pub fn sw_opts(&self) -> SwOpts {
        SwOpts::new(self.security_level, self.hash_family)
    }
}

/// Cryptographic Service Provider backed by a PKCS#11 token
pub struct Pkcs11Csp {
    sw: SwCsp,
    session: Mutex<Session>,
    opts: Pkcs11Opts,
}

impl fmt::Debug for Pkcs11Csp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pkcs11Csp")
            .field("opts", &self.opts)
            .field("sw", &self.sw)
            .finish()
    }
}

fn device_error(operation: &'static str, what: &'static str) -> impl Fn(Pkcs11Error) -> CspError {
    move |e| {
        log::warn!("PKCS#11 call failed during {}: {}", operation, e);
        CspError::pkcs11_failure(operation, &format!("{}: {}", what, e))
    }
}

impl Pkcs11Csp {
    /// Load the library, find the token by label and log in
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `keystore` is `None`, `Pkcs11Failure` if the
    /// library cannot be loaded, no token carries `opts.label`, or the
    /// session cannot be opened and authenticated.
    pub fn new(opts: Pkcs11Opts, keystore: Option<Arc<dyn KeyStore>>) -> CspResult<Self> {
        let sw = SwCsp::new(opts.sw_opts(), keystore)?;

        log::info!("Initializing PKCS#11 library: {}", opts.library);
        let ctx = Pkcs11::new(&opts.library)
            .map_err(device_error("pkcs11_init", "Failed to load PKCS#11 library"))?;
        ctx.initialize(CInitializeArgs::OsThreads)
            .map_err(device_error("pkcs11_init", "Failed to initialize PKCS#11 library"))?;

        let slots = ctx
            .get_slots_with_token()
            .map_err(device_error("pkcs11_init", "Failed to get slots"))?;
        let slot = slots
            .into_iter()
            .find(|slot| {
                ctx.get_token_info(*slot)
                    .map(|info| info.label().trim() == opts.label.trim())
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                CspError::pkcs11_failure(
                    "pkcs11_init",
                    &format!("Token with label '{}' not found", opts.label),
                )
            })?;
        log::info!("Using slot: {:?}", slot.id());

        let session = ctx
            .open_rw_session(slot)
            .map_err(device_error("pkcs11_init", "Failed to open session"))?;
        log::info!("Successfully opened session with HSM");

        if !opts.pin.is_empty() {
            log::info!("Logging in to HSM");
            let pin = AuthPin::new(opts.pin.clone());
            match session.login(UserType::User, Some(&pin)) {
                Ok(()) | Err(Pkcs11Error::Pkcs11(RvError::UserAlreadyLoggedIn, _)) => {}
                Err(e) => {
                    return Err(CspError::pkcs11_failure(
                        "pkcs11_init",
                        &format!("Failed to login to HSM: {}", e),
                    ))
                }
            }
        }

        Ok(Self {
            sw,
            session: Mutex::new(session),
            opts,
        })
    }

    pub fn opts(&self) -> &Pkcs11Opts {
        &self.opts
    }

    /// The software provider used for everything not kept on the token
    pub fn software(&self) -> &SwCsp {
        &self.sw
    }

    fn session(&self) -> CspResult<MutexGuard<'_, Session>> {
        self.session
            .lock()
            .map_err(|_| CspError::pkcs11_failure("pkcs11_session", "Session lock poisoned"))
    }

    fn find_object(
        session: &Session,
        class: ObjectClass,
        ski: &[u8],
    ) -> CspResult<Option<ObjectHandle>> {
        let template = [
            Attribute::Class(class),
            Attribute::KeyType(KeyType::EC),
            Attribute::Id(ski.to_vec()),
        ];
        let handles = session
            .find_objects(&template)
            .map_err(device_error("pkcs11_find", "Failed to search objects"))?;
        Ok(handles.into_iter().next())
    }

    /// Read the curve and point of an EC public key object
    fn read_public_key(session: &Session, handle: ObjectHandle) -> CspResult<EcPublicKey> {
        let attributes = session
            .get_attributes(handle, &[AttributeType::EcParams, AttributeType::EcPoint])
            .map_err(device_error("pkcs11_public_key", "Failed to read EC attributes"))?;

        let mut params = None;
        let mut point = None;
        for attribute in attributes {
            match attribute {
                Attribute::EcParams(value) => params = Some(value),
                Attribute::EcPoint(value) => point = Some(value),
                _ => {}
            }
        }
        let (Some(params), Some(point)) = (params, point) else {
            return Err(CspError::pkcs11_failure(
                "pkcs11_public_key",
                "Public key object has no EC parameters or point",
            ));
        };
        let curve = curve_from_ec_params(&params).ok_or_else(|| {
            CspError::unsupported_algorithm("pkcs11_public_key", &hex::encode(&params))
        })?;
        EcPublicKey::from_sec1_bytes(curve, unwrap_ec_point(curve, &point)?)
    }

    fn generate_ecdsa(&self, curve: EcCurve, ephemeral: bool) -> CspResult<Arc<dyn Key>> {
        let session = self.session()?;
        let on_token = !ephemeral;

        let public_template = [
            Attribute::Token(on_token),
            Attribute::Private(false),
            Attribute::Verify(true),
            Attribute::EcParams(ec_params(curve).to_vec()),
        ];
        let private_template = [
            Attribute::Token(on_token),
            Attribute::Private(true),
            Attribute::Sign(true),
            Attribute::Sensitive(true),
            Attribute::Extractable(false),
        ];

        let (public_handle, private_handle) = session
            .generate_key_pair(&Mechanism::EccKeyPairGen, &public_template, &private_template)
            .map_err(device_error("pkcs11_key_gen", "Failed to generate ECDSA key pair"))?;

        let public = match self.identify_key_pair(&session, public_handle, private_handle) {
            Ok(public) => public,
            Err(e) => {
                // Leave nothing behind on the token for a key the caller never sees
                for handle in [public_handle, private_handle] {
                    if let Err(destroy) = session.destroy_object(handle) {
                        log::warn!("Failed to destroy orphaned key object: {}", destroy);
                    }
                }
                return Err(e);
            }
        };

        log::info!(
            "Generated {} key pair on token [{}]",
            curve,
            hex::encode(public.ski())
        );
        Ok(Arc::new(Pkcs11EcdsaPrivateKey::new(public)))
    }

    /// Compute the SKI of a fresh pair and stamp it on both objects
    fn identify_key_pair(
        &self,
        session: &Session,
        public_handle: ObjectHandle,
        private_handle: ObjectHandle,
    ) -> CspResult<EcdsaPublicKey> {
        let public = EcdsaPublicKey::new(
            Self::read_public_key(session, public_handle)?,
            self.sw.ski_function(),
        )?;

        // Both objects are found again through the SKI
        let mut identity = vec![
            Attribute::Id(public.ski().to_vec()),
            Attribute::Label(hex::encode(public.ski()).into_bytes()),
        ];
        if self.opts.immutable {
            identity.push(Attribute::Modifiable(false));
        }
        for handle in [public_handle, private_handle] {
            session
                .update_attributes(handle, &identity)
                .map_err(device_error("pkcs11_key_gen", "Failed to set key identity"))?;
        }
        Ok(public)
    }

    fn sign_on_device(&self, key: &Pkcs11EcdsaPrivateKey, digest: &[u8]) -> CspResult<Vec<u8>> {
        let session = self.session()?;
        let handle = Self::find_object(&session, ObjectClass::PRIVATE_KEY, key.ski())?
            .ok_or_else(|| CspError::key_not_found(key.ski()))?;

        let raw = session
            .sign(&Mechanism::Ecdsa, handle, digest)
            .map_err(device_error("pkcs11_sign", "HSM signing failed"))?;
        ecdsa::signature_from_raw(&raw, self.sw.curve_orders().get(key.curve()))
    }

    fn verify_on_device(
        &self,
        key: &Pkcs11EcdsaPrivateKey,
        signature: &[u8],
        digest: &[u8],
    ) -> CspResult<bool> {
        let curve = key.curve();
        let Some(raw) =
            ecdsa::signature_to_raw(signature, self.sw.curve_orders().get(curve), curve.field_size())?
        else {
            return Ok(false);
        };

        let session = self.session()?;
        let handle = Self::find_object(&session, ObjectClass::PUBLIC_KEY, key.ski())?
            .ok_or_else(|| CspError::key_not_found(key.ski()))?;

        match session.verify(&Mechanism::Ecdsa, handle, digest, &raw) {
            Ok(()) => Ok(true),
            Err(Pkcs11Error::Pkcs11(RvError::SignatureInvalid, _)) => Ok(false),
            Err(e) => Err(CspError::pkcs11_failure(
                "pkcs11_verify",
                &format!("HSM verification failed: {}", e),
            )),
        }
    }

    /// Look a key up on the token by its SKI
    fn token_key(&self, ski: &[u8]) -> CspResult<Option<Arc<dyn Key>>> {
        let session = self.session()?;
        let Some(public_handle) = Self::find_object(&session, ObjectClass::PUBLIC_KEY, ski)? else {
            return Ok(None);
        };
        let public =
            EcdsaPublicKey::with_ski(Self::read_public_key(&session, public_handle)?, ski.to_vec());

        if Self::find_object(&session, ObjectClass::PRIVATE_KEY, ski)?.is_some() {
            Ok(Some(Arc::new(Pkcs11EcdsaPrivateKey::new(public))))
        } else {
            Ok(Some(Arc::new(public)))
        }
    }

    /// Curve for ECDSA generation options handled on the token
    fn device_curve(&self, opts: &dyn KeyGenOpts) -> Option<EcCurve> {
        let any = opts.as_any();
        if any.is::<EcdsaKeyGenOpts>() {
            EcCurve::for_security_level(self.opts.security_level)
        } else if any.is::<EcdsaP256KeyGenOpts>() {
            Some(EcCurve::P256)
        } else if any.is::<EcdsaP384KeyGenOpts>() {
            Some(EcCurve::P384)
        } else {
            None
        }
    }
}

impl Csp for Pkcs11Csp {
    fn key_gen(&self, opts: Option<&dyn KeyGenOpts>) -> CspResult<Arc<dyn Key>> {
        match opts.and_then(|opts| self.device_curve(opts).map(|curve| (opts, curve))) {
            Some((opts, curve)) => self.generate_ecdsa(curve, opts.ephemeral()),
            None => self.sw.key_gen(opts),
        }
    }

    fn key_deriv(
        &self,
        key: Option<&dyn Key>,
        opts: Option<&dyn KeyDerivOpts>,
    ) -> CspResult<Arc<dyn Key>> {
        self.sw.key_deriv(key, opts)
    }

    fn key_import(
        &self,
        raw: Option<KeyMaterial<'_>>,
        opts: Option<&dyn KeyImportOpts>,
    ) -> CspResult<Arc<dyn Key>> {
        self.sw.key_import(raw, opts)
    }

    fn key(&self, ski: &[u8]) -> CspResult<Arc<dyn Key>> {
        if !ski.is_empty() {
            if let Some(key) = self.token_key(ski)? {
                return Ok(key);
            }
        }
        self.sw.key(ski)
    }

    fn hash(&self, msg: &[u8], hash_type: HashType) -> CspResult<Vec<u8>> {
        self.sw.hash(msg, hash_type)
    }

    fn hasher(&self, hash_type: HashType) -> CspResult<Hasher> {
        self.sw.hasher(hash_type)
    }

    fn sign(
        &self,
        key: Option<&dyn Key>,
        digest: &[u8],
        opts: Option<&dyn SignerOpts>,
    ) -> CspResult<Vec<u8>> {
        match key.and_then(|key| downcast_key::<Pkcs11EcdsaPrivateKey>(key)) {
            Some(key) => {
                if digest.is_empty() {
                    return Err(CspError::invalid_argument("digest", "Cannot be empty"));
                }
                self.sign_on_device(key, digest)
            }
            None => self.sw.sign(key, digest, opts),
        }
    }

    fn verify(
        &self,
        key: Option<&dyn Key>,
        signature: &[u8],
        digest: &[u8],
        opts: Option<&dyn SignerOpts>,
    ) -> CspResult<bool> {
        let Some(device_key) = key.and_then(|key| downcast_key::<Pkcs11EcdsaPrivateKey>(key)) else {
            return self.sw.verify(key, signature, digest, opts);
        };
        if signature.is_empty() {
            return Err(CspError::invalid_argument("signature", "Cannot be empty"));
        }
        if digest.is_empty() {
            return Err(CspError::invalid_argument("digest", "Cannot be empty"));
        }

        if self.opts.soft_verify {
            let public = device_key.public().key();
            ecdsa::verify_digest(
                public,
                signature,
                digest,
                self.sw.curve_orders().get(public.curve()),
            )
        } else {
            self.verify_on_device(device_key, signature, digest)
        }
    }

    fn encrypt(
        &self,
        key: Option<&dyn Key>,
        plaintext: &[u8],
        opts: Option<&dyn EncrypterOpts>,
    ) -> CspResult<Vec<u8>> {
        self.sw.encrypt(key, plaintext, opts)
    }

    fn decrypt(
        &self,
        key: Option<&dyn Key>,
        ciphertext: &[u8],
        opts: Option<&dyn DecrypterOpts>,
    ) -> CspResult<Vec<u8>> {
        self.sw.decrypt(key, ciphertext, opts)
    }
}
