/*!
 * Key persistence
 *
 * Providers persist keys through the [`KeyStore`] trait and never retry a
 * failed call. [`InMemoryKeyStore`] keeps keys for the lifetime of the
 * process; it is what tests and embedders without durable storage use.
 */

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::{CspError, CspResult};
use crate::key::Key;

/// Storage for keys, addressed by SKI
pub trait KeyStore: Send + Sync {
    /// `true` if `store_key` always fails
    fn read_only(&self) -> bool;

    /// Key with the given SKI. Fails `KeyNotFound` if absent.
    fn get_key(&self, ski: &[u8]) -> CspResult<Arc<dyn Key>>;

    fn store_key(&self, key: Arc<dyn Key>) -> CspResult<()>;
}

#[derive(Default)]
struct Slots {
    private: Option<Arc<dyn Key>>,
    public: Option<Arc<dyn Key>>,
}

/// Process-local key store
///
/// A private key and its public key share an SKI, so each SKI holds one
/// private and one public slot. Lookups prefer the private key. Symmetric
/// keys occupy the private slot.
pub struct InMemoryKeyStore {
    read_only: bool,
    keys: RwLock<HashMap<Vec<u8>, Slots>>,
}

impl Default for InMemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryKeyStore")
            .field("read_only", &self.read_only)
            .field("len", &self.len())
            .finish()
    }
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self {
            read_only: false,
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// A store that rejects every write
    pub fn new_read_only() -> Self {
        Self {
            read_only: true,
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Number of distinct SKIs held
    pub fn len(&self) -> usize {
        match self.keys.read() {
            Ok(keys) => keys.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyStore for InMemoryKeyStore {
    fn read_only(&self) -> bool {
        self.read_only
    }

    fn get_key(&self, ski: &[u8]) -> CspResult<Arc<dyn Key>> {
        if ski.is_empty() {
            return Err(CspError::invalid_argument("SKI", "It must not be empty"));
        }
        // Every write is a single slot assignment, so a poisoned map is still consistent
        let keys = self.keys.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.get(ski)
            .and_then(|slots| slots.private.clone().or_else(|| slots.public.clone()))
            .ok_or_else(|| CspError::key_not_found(ski))
    }

    fn store_key(&self, key: Arc<dyn Key>) -> CspResult<()> {
        if self.read_only {
            return Err(CspError::invalid_argument(
                "KeyStore",
                "Read only KeyStore",
            ));
        }
        if key.ski().is_empty() {
            return Err(CspError::invalid_argument("SKI", "It must not be empty"));
        }

        let mut keys = self.keys.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let slots = keys.entry(key.ski().to_vec()).or_default();
        if key.is_private() {
            slots.private = Some(key);
        } else {
            slots.public = Some(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{HashFamily, HasherRegistry, SkiFunction, SwOpts};
    use crate::key::{AesKey, EcCurve, EcSecretKey, EcdsaPrivateKey};

    fn ski_fn() -> SkiFunction {
        SkiFunction::new(
            SwOpts::new(256, HashFamily::Sha2),
            Arc::new(HasherRegistry::default()),
        )
    }

    #[test]
    fn test_store_and_lookup() {
        let store = InMemoryKeyStore::new();
        let key: Arc<dyn Key> = Arc::new(AesKey::new(vec![3u8; 32], false, &ski_fn()).unwrap());
        store.store_key(key.clone()).unwrap();

        let found = store.get_key(key.ski()).unwrap();
        assert_eq!(found.ski(), key.ski());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_private_key_preferred_over_public() {
        let store = InMemoryKeyStore::new();
        let private = EcdsaPrivateKey::new(EcSecretKey::generate(EcCurve::P256), &ski_fn()).unwrap();
        let public = private.public_key().unwrap();

        store.store_key(public.clone()).unwrap();
        assert!(!store.get_key(public.ski()).unwrap().is_private());

        store.store_key(Arc::new(private)).unwrap();
        assert!(store.get_key(public.ski()).unwrap().is_private());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_missing_and_empty_ski() {
        let store = InMemoryKeyStore::new();
        assert!(matches!(
            store.get_key(&[1, 2, 3]),
            Err(CspError::KeyNotFound { .. })
        ));
        assert!(matches!(
            store.get_key(&[]),
            Err(CspError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_read_only_store_rejects_writes() {
        let store = InMemoryKeyStore::new_read_only();
        assert!(store.read_only());
        let key = Arc::new(AesKey::new(vec![3u8; 16], false, &ski_fn()).unwrap());
        assert!(store.store_key(key).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_poisoned_lock_still_serves_keys() {
        let store = Arc::new(InMemoryKeyStore::new());
        let key: Arc<dyn Key> = Arc::new(AesKey::new(vec![5u8; 32], false, &ski_fn()).unwrap());
        store.store_key(key.clone()).unwrap();

        let poisoner = store.clone();
        let result = std::thread::spawn(move || {
            let _guard = poisoner.keys.write().unwrap();
            panic!("poison the key map");
        })
        .join();
        assert!(result.is_err());
        assert!(store.keys.is_poisoned());

        assert_eq!(store.get_key(key.ski()).unwrap().ski(), key.ski());
        let other: Arc<dyn Key> = Arc::new(AesKey::new(vec![6u8; 32], false, &ski_fn()).unwrap());
        store.store_key(other.clone()).unwrap();
        assert_eq!(store.get_key(other.ski()).unwrap().ski(), other.ski());
        assert_eq!(store.len(), 2);
    }
}
