/*!
 * Digest selection, SKI fingerprinting and HMAC
 *
 * A provider is configured with a hash family and a security level. Together
 * they select the hash used for key fingerprints (SKIs) and HMAC derivation.
 * Callers can also ask for any registered hash type explicitly.
 */

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::digest::DynDigest;
use sha2::{Sha256, Sha384};
use sha3::{Sha3_256, Sha3_384};

use crate::error::{error_codes, CspError, CspResult};


/// Boxed hash state handed out by `Csp::hasher`
pub type Hasher = Box<dyn DynDigest + Send>;

/// Constructor for a fresh hash state
pub type HasherFactory = fn() -> Hasher;

/// Hash function families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashFamily {
    #[serde(rename = "SHA2")]
    Sha2,
    #[serde(rename = "SHA3")]
    Sha3,
    #[serde(rename = "KECCAK")]
    Keccak,
}

impl fmt::Display for HashFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashFamily::Sha2 => write!(f, "SHA2"),
            HashFamily::Sha3 => write!(f, "SHA3"),
            HashFamily::Keccak => write!(f, "KECCAK"),
        }
    }
}

/// A concrete hash function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    Unknown,
    Sha2_256,
    Sha2_384,
    Sha3_256,
    Sha3_384,
    Keccak256,
}

impl HashType {
    /// Resolve a (family, security level) pair to a hash type
    pub fn from_family(family: HashFamily, security_level: u16) -> Option<HashType> {
        match (family, security_level) {
            (HashFamily::Sha2, 256) => Some(HashType::Sha2_256),
            (HashFamily::Sha2, 384) => Some(HashType::Sha2_384),
            (HashFamily::Sha3, 256) => Some(HashType::Sha3_256),
            (HashFamily::Sha3, 384) => Some(HashType::Sha3_384),
            (HashFamily::Keccak, 256) => Some(HashType::Keccak256),
            _ => None,
        }
    }

    /// The (family, security level) pair this hash type belongs to
    pub fn family_and_level(&self) -> Option<(HashFamily, u16)> {
        match self {
            HashType::Unknown => None,
            HashType::Sha2_256 => Some((HashFamily::Sha2, 256)),
            HashType::Sha2_384 => Some((HashFamily::Sha2, 384)),
            HashType::Sha3_256 => Some((HashFamily::Sha3, 256)),
            HashType::Sha3_384 => Some((HashFamily::Sha3, 384)),
            HashType::Keccak256 => Some((HashFamily::Keccak, 256)),
        }
    }

    /// Output size in bytes
    pub fn output_size(&self) -> usize {
        match self {
            HashType::Sha2_384 | HashType::Sha3_384 => 48,
            _ => 32,
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashType::Unknown => "unknown",
            HashType::Sha2_256 => "sha2-256",
            HashType::Sha2_384 => "sha2-384",
            HashType::Sha3_256 => "sha3-256",
            HashType::Sha3_384 => "sha3-384",
            HashType::Keccak256 => "keccak-256",
        };
        f.write_str(name)
    }
}

/// Provider-wide hash configuration
///
/// The pair is validated lazily: an unsupported combination is reported the
/// first time the provider needs the configured hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwOpts {
    pub security_level: u16,
    pub hash_family: HashFamily,
}

impl Default for SwOpts {
    fn default() -> Self {
        Self {
            security_level: 256,
            hash_family: HashFamily::Sha2,
        }
    }
}

impl SwOpts {
    pub fn new(security_level: u16, hash_family: HashFamily) -> Self {
        Self {
            security_level,
            hash_family,
        }
    }

    /// The configured hash type, if the family/level pair is supported
    pub fn hash_type(&self) -> CspResult<HashType> {
        HashType::from_family(self.hash_family, self.security_level).ok_or_else(|| {
            CspError::unsupported_hash(format!("{}/{}", self.hash_family, self.security_level))
        })
    }
}

/// Hasher factories keyed by (family, security level)
#[derive(Clone)]
pub struct HasherRegistry {
    factories: HashMap<(HashFamily, u16), HasherFactory>,
}

impl fmt::Debug for HasherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasherRegistry")
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for HasherRegistry {
    fn default() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(HashFamily::Sha2, 256, || Box::new(Sha256::default()));
        registry.register(HashFamily::Sha2, 384, || Box::new(Sha384::default()));
        registry.register(HashFamily::Sha3, 256, || Box::new(Sha3_256::default()));
        registry.register(HashFamily::Sha3, 384, || Box::new(Sha3_384::default()));
        registry
    }
}

impl HasherRegistry {
    pub fn register(&mut self, family: HashFamily, security_level: u16, factory: HasherFactory) {
        self.factories.insert((family, security_level), factory);
    }

    /// A fresh hash state for `hash_type`
    pub fn hasher(&self, hash_type: HashType) -> CspResult<Hasher> {
        hash_type
            .family_and_level()
            .and_then(|key| self.factories.get(&key))
            .map(|factory| factory())
            .ok_or_else(|| CspError::unsupported_hash(hash_type))
    }

    /// One-shot digest of `msg`
    pub fn hash(&self, msg: &[u8], hash_type: HashType) -> CspResult<Vec<u8>> {
        let mut hasher = self.hasher(hash_type)?;
        hasher.update(msg);
        Ok(hasher.finalize().into_vec())
    }
}

/// The configured fingerprint function shared by every handler of a provider
#[derive(Debug, Clone)]
pub struct SkiFunction {
    opts: SwOpts,
    hashers: Arc<HasherRegistry>,
}

impl SkiFunction {
    pub fn new(opts: SwOpts, hashers: Arc<HasherRegistry>) -> Self {
        Self { opts, hashers }
    }

    pub fn opts(&self) -> &SwOpts {
        &self.opts
    }

    /// The configured hash type
    pub fn hash_type(&self) -> CspResult<HashType> {
        self.opts.hash_type()
    }

    /// Fingerprint of public key material under the configured hash
    pub fn ski(&self, public_material: &[u8]) -> CspResult<Vec<u8>> {
        let hash_type = self.opts.hash_type()?;
        self.hashers.hash(public_material, hash_type)
    }

    /// HMAC under the configured hash
    pub fn hmac(&self, key: &[u8], data: &[u8]) -> CspResult<Vec<u8>> {
        hmac(self.opts.hash_type()?, key, data)
    }
}

/// HMAC of `data` keyed with `key` under `hash_type`
pub fn hmac(hash_type: HashType, key: &[u8], data: &[u8]) -> CspResult<Vec<u8>> {
    macro_rules! mac_with {
        ($digest:ty) => {{
            let mut mac = Hmac::<$digest>::new_from_slice(key).map_err(|e| {
                CspError::crypto_failure(
                    "hmac",
                    &format!("Failed initializing HMAC: {}", e),
                    error_codes::KEY_DERIVATION_FAILED,
                )
            })?;
            Mac::update(&mut mac, data);
            Ok(mac.finalize().into_bytes().to_vec())
        }};
    }

    match hash_type {
        HashType::Sha2_256 => mac_with!(Sha256),
        HashType::Sha2_384 => mac_with!(Sha384),
        HashType::Sha3_256 => mac_with!(Sha3_256),
        HashType::Sha3_384 => mac_with!(Sha3_384),
        other => Err(CspError::unsupported_hash(other)),
    }
}
