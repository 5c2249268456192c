/*!
 * Key object model
 *
 * Every key handed out by a provider implements [`Key`]. Keys are immutable
 * once created: operations on them produce new keys or new byte buffers.
 * The concrete type of a key is its dispatch tag, so new key types can be
 * added without touching the provider's dispatch code.
 */

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::CspResult;

mod aes;
mod ecdsa;
mod rsa;

#[cfg(test)]
mod tests;

pub use self::aes::AesKey;
pub use self::ecdsa::{EcCurve, EcPublicKey, EcSecretKey, EcdsaPrivateKey, EcdsaPublicKey};
pub use self::rsa::{RsaPrivateKey, RsaPublicKey};

/// Runtime type access for trait objects used as dispatch tags.
///
/// Implemented for every sized `'static` type. Always call it on a
/// `&dyn Key` (or options trait object), never on an `Arc` or a reference to
/// one, so the concrete type is reported rather than the wrapper.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Capability contract shared by all keys
pub trait Key: AsAny + fmt::Debug + Send + Sync {
    /// Serialized form of the key, when export is permitted
    fn to_bytes(&self) -> CspResult<Vec<u8>>;

    /// Subject Key Identifier, computed once at creation
    fn ski(&self) -> &[u8];

    fn is_symmetric(&self) -> bool;

    fn is_private(&self) -> bool;

    /// The public half of an asymmetric key pair
    fn public_key(&self) -> CspResult<Arc<dyn Key>>;
}

/// Dispatch tag of a key: its concrete type
pub fn key_tag(key: &dyn Key) -> TypeId {
    key.as_any().type_id()
}

/// Downcast a key to a concrete type
pub fn downcast_key<K: Key>(key: &dyn Key) -> Option<&K> {
    key.as_any().downcast_ref::<K>()
}
