use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use super::Key;
use crate::error::{CspError, CspResult};
use crate::hash::SkiFunction;

/// Symmetric AES key
///
/// The key bytes are zeroized on drop. Only keys created as exportable (full
/// HMAC derivation) hand their bytes out through [`Key::to_bytes`].
#[derive(Clone)]
pub struct AesKey {
    key: Zeroizing<Vec<u8>>,
    ski: Vec<u8>,
    exportable: bool,
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesKey")
            .field("len", &self.key.len())
            .field("ski", &hex::encode(&self.ski))
            .field("exportable", &self.exportable)
            .finish()
    }
}

impl AesKey {
    /// Wrap raw key bytes; the SKI is the configured hash of the bytes
    pub fn new(key: Vec<u8>, exportable: bool, ski_fn: &SkiFunction) -> CspResult<Self> {
        let key = Zeroizing::new(key);
        let ski = ski_fn.ski(&key)?;
        Ok(Self {
            key,
            ski,
            exportable,
        })
    }

    /// Raw key bytes for the symmetric handlers
    pub(crate) fn raw(&self) -> &[u8] {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    pub fn is_exportable(&self) -> bool {
        self.exportable
    }
}

impl Key for AesKey {
    fn to_bytes(&self) -> CspResult<Vec<u8>> {
        if self.exportable {
            Ok(self.key.to_vec())
        } else {
            Err(CspError::not_exportable("AES key"))
        }
    }

    fn ski(&self) -> &[u8] {
        &self.ski
    }

    fn is_symmetric(&self) -> bool {
        true
    }

    fn is_private(&self) -> bool {
        true
    }

    fn public_key(&self) -> CspResult<Arc<dyn Key>> {
        Err(CspError::unsupported_algorithm(
            "PublicKey",
            "Cannot call this method on a symmetric key",
        ))
    }
}
