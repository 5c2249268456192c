/*!
 * Software provider
 *
 * `SwCsp` implements every operation in-process. Each operation looks up a
 * handler by the concrete type of its determining argument (the options for
 * generation and import, the key for everything else). The routing tables
 * are filled in the constructor; extra handlers can be registered through
 * `&mut self` before the provider is shared, after which it is read-only.
 */

mod cipher;
mod keyderiv;
mod keygen;
mod keyimport;
mod signer;


use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::csp::{
    Csp, Decryptor, Encryptor, KeyDeriver, KeyGenerator, KeyImporter, KeyMaterial, Signer,
    Verifier,
};
use crate::ecdsa::CurveOrders;
use crate::error::{CspError, CspResult};
use crate::hash::{HashType, Hasher, HasherRegistry, SkiFunction, SwOpts};
use crate::key::{
    key_tag, AesKey, EcCurve, EcdsaPrivateKey, EcdsaPublicKey, Key, RsaPrivateKey, RsaPublicKey,
};
use crate::keystore::KeyStore;
use crate::opts::*;

use self::cipher::{AesCbcPkcs7Decryptor, AesCbcPkcs7Encryptor};
use self::keyderiv::{AesKeyDeriver, EcdsaPrivateKeyDeriver, EcdsaPublicKeyDeriver};
use self::keygen::{AesKeyGenerator, EcdsaKeyGenerator, RsaKeyGenerator};
use self::keyimport::{
    Aes256ImportKeyImporter, EcdsaNativePublicKeyImporter, EcdsaPkixPublicKeyImporter,
    EcdsaPrivateKeyImporter, HmacImportKeyImporter, RsaNativePublicKeyImporter,
    RsaPkixPublicKeyImporter, X509PublicKeyImporter,
};
use self::signer::{
    EcdsaPrivateKeyVerifier, EcdsaPublicKeyVerifier, EcdsaSigner, RsaPrivateKeyVerifier,
    RsaPublicKeyVerifier, RsaSigner,
};

/// RSA modulus size for a security level
fn rsa_bits_for_level(level: u16) -> Option<usize> {
    match level {
        256 => Some(2048),
        384 => Some(3072),
        _ => None,
    }
}

/// In-process Cryptographic Service Provider
pub struct SwCsp {
    opts: SwOpts,
    ks: Arc<dyn KeyStore>,
    ski: SkiFunction,
    hashers: Arc<HasherRegistry>,
    orders: Arc<CurveOrders>,

    key_generators: HashMap<TypeId, Box<dyn KeyGenerator>>,
    key_derivers: HashMap<TypeId, Box<dyn KeyDeriver>>,
    key_importers: HashMap<TypeId, Box<dyn KeyImporter>>,
    signers: HashMap<TypeId, Box<dyn Signer>>,
    verifiers: HashMap<TypeId, Box<dyn Verifier>>,
    encryptors: HashMap<TypeId, Box<dyn Encryptor>>,
    decryptors: HashMap<TypeId, Box<dyn Decryptor>>,
}

impl fmt::Debug for SwCsp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwCsp")
            .field("opts", &self.opts)
            .field("hashers", &self.hashers)
            .field("key_generators", &self.key_generators.len())
            .field("key_derivers", &self.key_derivers.len())
            .field("key_importers", &self.key_importers.len())
            .field("signers", &self.signers.len())
            .field("verifiers", &self.verifiers.len())
            .field("encryptors", &self.encryptors.len())
            .field("decryptors", &self.decryptors.len())
            .finish()
    }
}

impl SwCsp {
    /// Create a provider with the default SHA2/SHA3 hashers
    ///
    /// # Arguments
    ///
    /// * `opts` - Hash family and security level used for SKIs and HMAC
    /// * `keystore` - Where non-ephemeral keys are persisted
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `keystore` is `None`. An unsupported
    /// hash family/level pair is accepted here and reported by the first
    /// operation that needs it.
    pub fn new(opts: SwOpts, keystore: Option<Arc<dyn KeyStore>>) -> CspResult<Self> {
        Self::with_hashers(opts, keystore, HasherRegistry::default())
    }

    /// Create a provider with a custom hasher registry
    pub fn with_hashers(
        opts: SwOpts,
        keystore: Option<Arc<dyn KeyStore>>,
        hashers: HasherRegistry,
    ) -> CspResult<Self> {
        let ks = keystore.ok_or_else(|| {
            CspError::invalid_argument(
                "KeyStore instance",
                "It must be different from nil",
            )
        })?;

        let hashers = Arc::new(hashers);
        let ski = SkiFunction::new(opts, hashers.clone());
        let orders = Arc::new(CurveOrders::new());

        let mut csp = Self {
            opts,
            ks,
            ski,
            hashers,
            orders,
            key_generators: HashMap::new(),
            key_derivers: HashMap::new(),
            key_importers: HashMap::new(),
            signers: HashMap::new(),
            verifiers: HashMap::new(),
            encryptors: HashMap::new(),
            decryptors: HashMap::new(),
        };
        csp.register_defaults();

        log::info!(
            "Initialized software CSP [{}/{}]",
            opts.hash_family,
            opts.security_level
        );
        Ok(csp)
    }

    fn register_defaults(&mut self) {
        let ski = self.ski.clone();
        let orders = self.orders.clone();
        let level = self.opts.security_level;

        // Key generators
        let ecdsa_gen = |curve| EcdsaKeyGenerator {
            curve,
            ski: ski.clone(),
        };
        if let Some(curve) = EcCurve::for_security_level(level) {
            self.register_key_generator::<EcdsaKeyGenOpts>(ecdsa_gen(curve));
        } else {
            log::warn!("No default ECDSA curve for security level {}", level);
        }
        self.register_key_generator::<EcdsaP256KeyGenOpts>(ecdsa_gen(EcCurve::P256));
        self.register_key_generator::<EcdsaP384KeyGenOpts>(ecdsa_gen(EcCurve::P384));

        let rsa_gen = |bits| RsaKeyGenerator {
            bits,
            ski: ski.clone(),
        };
        if let Some(bits) = rsa_bits_for_level(level) {
            self.register_key_generator::<RsaKeyGenOpts>(rsa_gen(bits));
        } else {
            log::warn!("No default RSA size for security level {}", level);
        }
        self.register_key_generator::<Rsa1024KeyGenOpts>(rsa_gen(1024));
        self.register_key_generator::<Rsa2048KeyGenOpts>(rsa_gen(2048));
        self.register_key_generator::<Rsa3072KeyGenOpts>(rsa_gen(3072));
        self.register_key_generator::<Rsa4096KeyGenOpts>(rsa_gen(4096));

        let aes_gen = |length| AesKeyGenerator {
            length,
            ski: ski.clone(),
        };
        self.register_key_generator::<AesKeyGenOpts>(aes_gen(32));
        self.register_key_generator::<Aes128KeyGenOpts>(aes_gen(16));
        self.register_key_generator::<Aes192KeyGenOpts>(aes_gen(24));
        self.register_key_generator::<Aes256KeyGenOpts>(aes_gen(32));

        // Key derivers
        self.register_key_deriver::<AesKey>(AesKeyDeriver { ski: ski.clone() });
        self.register_key_deriver::<EcdsaPrivateKey>(EcdsaPrivateKeyDeriver {
            ski: ski.clone(),
            orders: orders.clone(),
        });
        self.register_key_deriver::<EcdsaPublicKey>(EcdsaPublicKeyDeriver {
            ski: ski.clone(),
            orders: orders.clone(),
        });

        // Key importers
        let ecdsa_pkix = EcdsaPkixPublicKeyImporter { ski: ski.clone() };
        let rsa_pkix = RsaPkixPublicKeyImporter { ski: ski.clone() };
        self.register_key_importer::<Aes256ImportKeyOpts>(Aes256ImportKeyImporter {
            ski: ski.clone(),
        });
        self.register_key_importer::<HmacImportKeyOpts>(HmacImportKeyImporter {
            ski: ski.clone(),
        });
        self.register_key_importer::<EcdsaPkixPublicKeyImportOpts>(ecdsa_pkix.clone());
        self.register_key_importer::<EcdsaPrivateKeyImportOpts>(EcdsaPrivateKeyImporter {
            ski: ski.clone(),
        });
        self.register_key_importer::<EcdsaNativePublicKeyImportOpts>(
            EcdsaNativePublicKeyImporter { ski: ski.clone() },
        );
        self.register_key_importer::<RsaPkixPublicKeyImportOpts>(rsa_pkix.clone());
        self.register_key_importer::<RsaNativePublicKeyImportOpts>(RsaNativePublicKeyImporter {
            ski,
        });
        self.register_key_importer::<X509PublicKeyImportOpts>(X509PublicKeyImporter {
            ecdsa: ecdsa_pkix,
            rsa: rsa_pkix,
        });

        // Signers and verifiers
        self.register_signer::<EcdsaPrivateKey>(EcdsaSigner {
            orders: orders.clone(),
        });
        self.register_signer::<RsaPrivateKey>(RsaSigner);
        self.register_verifier::<EcdsaPrivateKey>(EcdsaPrivateKeyVerifier {
            orders: orders.clone(),
        });
        self.register_verifier::<EcdsaPublicKey>(EcdsaPublicKeyVerifier { orders });
        self.register_verifier::<RsaPrivateKey>(RsaPrivateKeyVerifier);
        self.register_verifier::<RsaPublicKey>(RsaPublicKeyVerifier);

        // Symmetric
        self.register_encryptor::<AesKey>(AesCbcPkcs7Encryptor);
        self.register_decryptor::<AesKey>(AesCbcPkcs7Decryptor);
    }

    /// Route key generation for options type `O` to `generator`
    pub fn register_key_generator<O: KeyGenOpts>(
        &mut self,
        generator: impl KeyGenerator + 'static,
    ) {
        self.key_generators
            .insert(TypeId::of::<O>(), Box::new(generator));
    }

    /// Route key derivation for key type `K` to `deriver`
    pub fn register_key_deriver<K: Key>(&mut self, deriver: impl KeyDeriver + 'static) {
        self.key_derivers.insert(TypeId::of::<K>(), Box::new(deriver));
    }

    /// Route key import for options type `O` to `importer`
    pub fn register_key_importer<O: KeyImportOpts>(
        &mut self,
        importer: impl KeyImporter + 'static,
    ) {
        self.key_importers
            .insert(TypeId::of::<O>(), Box::new(importer));
    }

    pub fn register_signer<K: Key>(&mut self, signer: impl Signer + 'static) {
        self.signers.insert(TypeId::of::<K>(), Box::new(signer));
    }

    pub fn register_verifier<K: Key>(&mut self, verifier: impl Verifier + 'static) {
        self.verifiers.insert(TypeId::of::<K>(), Box::new(verifier));
    }

    pub fn register_encryptor<K: Key>(&mut self, encryptor: impl Encryptor + 'static) {
        self.encryptors.insert(TypeId::of::<K>(), Box::new(encryptor));
    }

    pub fn register_decryptor<K: Key>(&mut self, decryptor: impl Decryptor + 'static) {
        self.decryptors.insert(TypeId::of::<K>(), Box::new(decryptor));
    }

    pub fn opts(&self) -> &SwOpts {
        &self.opts
    }

    /// The hash selected by the configured family and security level
    pub fn configured_hash_type(&self) -> CspResult<HashType> {
        self.ski.hash_type()
    }

    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.ks
    }

    pub(crate) fn ski_function(&self) -> &SkiFunction {
        &self.ski
    }

    pub(crate) fn curve_orders(&self) -> &CurveOrders {
        &self.orders
    }

    /// Store `key` unless the caller asked for an ephemeral one
    pub(crate) fn persist(
        &self,
        operation: &str,
        key: &Arc<dyn Key>,
        ephemeral: bool,
    ) -> CspResult<()> {
        if ephemeral {
            return Ok(());
        }
        log::debug!(
            "Persisting key from {} [{}]",
            operation,
            hex::encode(key.ski())
        );
        self.ks.store_key(key.clone()).map_err(|e| {
            log::warn!("Failed storing key during {}: {}", operation, e);
            CspError::persistence_failure(operation, e)
        })
    }
}

fn nil_key() -> CspError {
    CspError::invalid_argument("Key", "It must not be nil")
}

fn nil_opts() -> CspError {
    CspError::invalid_argument("Opts parameter", "It must not be nil")
}

impl Csp for SwCsp {
    fn key_gen(&self, opts: Option<&dyn KeyGenOpts>) -> CspResult<Arc<dyn Key>> {
        let opts = opts.ok_or_else(nil_opts)?;
        let generator = self
            .key_generators
            .get(&opts.as_any().type_id())
            .ok_or_else(|| CspError::unsupported_algorithm("KeyGenOpts", opts.type_name()))?;
        log::debug!("Generating key [{}]", opts.algorithm());

        let key = generator.key_gen(opts)?;
        self.persist("key_gen", &key, opts.ephemeral())?;
        Ok(key)
    }

    fn key_deriv(
        &self,
        key: Option<&dyn Key>,
        opts: Option<&dyn KeyDerivOpts>,
    ) -> CspResult<Arc<dyn Key>> {
        let key = key.ok_or_else(nil_key)?;
        let opts = opts.ok_or_else(nil_opts)?;
        let deriver = self
            .key_derivers
            .get(&key_tag(key))
            .ok_or_else(|| CspError::unsupported_algorithm("Key", key.type_name()))?;
        log::debug!("Deriving key [{}]", opts.algorithm());

        let derived = deriver.key_deriv(key, opts)?;
        self.persist("key_deriv", &derived, opts.ephemeral())?;
        Ok(derived)
    }

    fn key_import(
        &self,
        raw: Option<KeyMaterial<'_>>,
        opts: Option<&dyn KeyImportOpts>,
    ) -> CspResult<Arc<dyn Key>> {
        let raw = raw.ok_or_else(|| CspError::invalid_argument("raw", "It must not be nil"))?;
        let opts = opts.ok_or_else(nil_opts)?;
        let importer = self
            .key_importers
            .get(&opts.as_any().type_id())
            .ok_or_else(|| CspError::unsupported_algorithm("KeyImportOpts", opts.type_name()))?;
        log::debug!("Importing {} [{}]", raw.kind(), opts.algorithm());

        let key = importer.key_import(raw, opts)?;
        self.persist("key_import", &key, opts.ephemeral())?;
        Ok(key)
    }

    fn key(&self, ski: &[u8]) -> CspResult<Arc<dyn Key>> {
        self.ks.get_key(ski)
    }

    fn hash(&self, msg: &[u8], hash_type: HashType) -> CspResult<Vec<u8>> {
        self.hashers.hash(msg, hash_type)
    }

    fn hasher(&self, hash_type: HashType) -> CspResult<Hasher> {
        self.hashers.hasher(hash_type)
    }

    fn sign(
        &self,
        key: Option<&dyn Key>,
        digest: &[u8],
        opts: Option<&dyn SignerOpts>,
    ) -> CspResult<Vec<u8>> {
        let key = key.ok_or_else(nil_key)?;
        if digest.is_empty() {
            return Err(CspError::invalid_argument("digest", "Cannot be empty"));
        }
        let signer = self
            .signers
            .get(&key_tag(key))
            .ok_or_else(|| CspError::unsupported_algorithm("SignKey", key.type_name()))?;

        signer.sign(key, digest, opts)
    }

    fn verify(
        &self,
        key: Option<&dyn Key>,
        signature: &[u8],
        digest: &[u8],
        opts: Option<&dyn SignerOpts>,
    ) -> CspResult<bool> {
        let key = key.ok_or_else(nil_key)?;
        if signature.is_empty() {
            return Err(CspError::invalid_argument("signature", "Cannot be empty"));
        }
        if digest.is_empty() {
            return Err(CspError::invalid_argument("digest", "Cannot be empty"));
        }
        let verifier = self
            .verifiers
            .get(&key_tag(key))
            .ok_or_else(|| CspError::unsupported_algorithm("VerifyKey", key.type_name()))?;

        verifier.verify(key, signature, digest, opts)
    }

    fn encrypt(
        &self,
        key: Option<&dyn Key>,
        plaintext: &[u8],
        opts: Option<&dyn EncrypterOpts>,
    ) -> CspResult<Vec<u8>> {
        let key = key.ok_or_else(nil_key)?;
        let encryptor = self
            .encryptors
            .get(&key_tag(key))
            .ok_or_else(|| CspError::unsupported_algorithm("EncryptKey", key.type_name()))?;

        encryptor.encrypt(key, plaintext, opts)
    }

    fn decrypt(
        &self,
        key: Option<&dyn Key>,
        ciphertext: &[u8],
        opts: Option<&dyn DecrypterOpts>,
    ) -> CspResult<Vec<u8>> {
        let key = key.ok_or_else(nil_key)?;
        let decryptor = self
            .decryptors
            .get(&key_tag(key))
            .ok_or_else(|| CspError::unsupported_algorithm("DecryptKey", key.type_name()))?;

        decryptor.decrypt(key, ciphertext, opts)
    }
}
