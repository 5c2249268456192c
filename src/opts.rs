/*!
 * Option types
 *
 * Options select the algorithm of an operation. Each concrete struct is its
 * own dispatch tag: a provider routes a `key_gen`, `key_import` or
 * `key_deriv` call by the concrete type behind the trait object it receives.
 */

use std::fmt;

use crate::hash::HashType;
use crate::key::AsAny;

/// Options for key generation
pub trait KeyGenOpts: AsAny + fmt::Debug + Send + Sync {
    /// Key generation algorithm identifier
    fn algorithm(&self) -> &'static str;

    /// `true` if the generated key must not be persisted
    fn ephemeral(&self) -> bool;
}

/// Options for key derivation
pub trait KeyDerivOpts: AsAny + fmt::Debug + Send + Sync {
    fn algorithm(&self) -> &'static str;

    fn ephemeral(&self) -> bool;
}

/// Options for key import
pub trait KeyImportOpts: AsAny + fmt::Debug + Send + Sync {
    fn algorithm(&self) -> &'static str;

    fn ephemeral(&self) -> bool;
}

/// Options for signing and verification
pub trait SignerOpts: AsAny + fmt::Debug + Send + Sync {
    /// Hash used to produce the digest being signed
    fn hash_type(&self) -> HashType;
}

/// Options for encryption
pub trait EncrypterOpts: AsAny + fmt::Debug + Send + Sync {}

/// Options for decryption
pub trait DecrypterOpts: AsAny + fmt::Debug + Send + Sync {}

// Options that carry nothing but the ephemeral flag
macro_rules! flag_opts {
    ($(#[$meta:meta])* $name:ident: $opts_trait:ident => $algorithm:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name {
            pub ephemeral: bool,
        }

        impl $name {
            pub fn new(ephemeral: bool) -> Self {
                Self { ephemeral }
            }
        }

        impl $opts_trait for $name {
            fn algorithm(&self) -> &'static str {
                $algorithm
            }

            fn ephemeral(&self) -> bool {
                self.ephemeral
            }
        }
    };
}

flag_opts!(
    /// ECDSA key on the curve matching the provider's security level
    EcdsaKeyGenOpts: KeyGenOpts => "ECDSA"
);
flag_opts!(EcdsaP256KeyGenOpts: KeyGenOpts => "ECDSAP256");
flag_opts!(EcdsaP384KeyGenOpts: KeyGenOpts => "ECDSAP384");
flag_opts!(
    /// RSA key sized for the provider's security level (2048 or 3072 bits)
    RsaKeyGenOpts: KeyGenOpts => "RSA"
);
flag_opts!(Rsa1024KeyGenOpts: KeyGenOpts => "RSA1024");
flag_opts!(Rsa2048KeyGenOpts: KeyGenOpts => "RSA2048");
flag_opts!(Rsa3072KeyGenOpts: KeyGenOpts => "RSA3072");
flag_opts!(Rsa4096KeyGenOpts: KeyGenOpts => "RSA4096");
flag_opts!(
    /// 32-byte AES key
    AesKeyGenOpts: KeyGenOpts => "AES"
);
flag_opts!(Aes128KeyGenOpts: KeyGenOpts => "AES128");
flag_opts!(Aes192KeyGenOpts: KeyGenOpts => "AES192");
flag_opts!(Aes256KeyGenOpts: KeyGenOpts => "AES256");

flag_opts!(
    /// Exactly 32 raw bytes
    Aes256ImportKeyOpts: KeyImportOpts => "AES256"
);
flag_opts!(
    /// Any non-empty raw bytes, imported as a non-exportable symmetric key
    HmacImportKeyOpts: KeyImportOpts => "HMAC"
);
flag_opts!(
    /// DER-encoded SubjectPublicKeyInfo holding an EC key
    EcdsaPkixPublicKeyImportOpts: KeyImportOpts => "ECDSA"
);
flag_opts!(
    /// PKCS#8 DER-encoded EC private key
    EcdsaPrivateKeyImportOpts: KeyImportOpts => "ECDSA"
);
flag_opts!(
    /// An already parsed [`EcPublicKey`](crate::key::EcPublicKey)
    EcdsaNativePublicKeyImportOpts: KeyImportOpts => "ECDSA"
);
flag_opts!(
    /// DER-encoded SubjectPublicKeyInfo holding an RSA key
    RsaPkixPublicKeyImportOpts: KeyImportOpts => "RSA"
);
flag_opts!(
    /// An already parsed `rsa::RsaPublicKey`
    RsaNativePublicKeyImportOpts: KeyImportOpts => "RSA"
);

/// Full HMAC derivation: the derived key is `HMAC(key, arg)` and exportable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HmacDeriveKeyOpts {
    pub ephemeral: bool,
    pub arg: Vec<u8>,
}

impl HmacDeriveKeyOpts {
    pub fn new(ephemeral: bool, arg: impl Into<Vec<u8>>) -> Self {
        Self {
            ephemeral,
            arg: arg.into(),
        }
    }

    pub fn argument(&self) -> &[u8] {
        &self.arg
    }
}

impl KeyDerivOpts for HmacDeriveKeyOpts {
    fn algorithm(&self) -> &'static str {
        "HMAC"
    }

    fn ephemeral(&self) -> bool {
        self.ephemeral
    }
}

/// Truncated HMAC derivation: the first 32 bytes of `HMAC(key, arg)`,
/// never exportable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HmacTruncated256AesDeriveKeyOpts {
    pub ephemeral: bool,
    pub arg: Vec<u8>,
}

impl HmacTruncated256AesDeriveKeyOpts {
    pub fn new(ephemeral: bool, arg: impl Into<Vec<u8>>) -> Self {
        Self {
            ephemeral,
            arg: arg.into(),
        }
    }

    pub fn argument(&self) -> &[u8] {
        &self.arg
    }
}

impl KeyDerivOpts for HmacTruncated256AesDeriveKeyOpts {
    fn algorithm(&self) -> &'static str {
        "HMAC_TRUNCATED_256"
    }

    fn ephemeral(&self) -> bool {
        self.ephemeral
    }
}

/// ECDSA re-randomization
///
/// The expansion value `e` selects the offset `k = (e mod (n - 1)) + 1`.
/// A private key `d` becomes `d + k mod n` and a public key `P` becomes
/// `P + k·G`, so deriving both halves of a pair with the same expansion
/// yields a pair again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EcdsaReRandKeyOpts {
    pub ephemeral: bool,
    pub expansion: Vec<u8>,
}

impl EcdsaReRandKeyOpts {
    pub fn new(ephemeral: bool, expansion: impl Into<Vec<u8>>) -> Self {
        Self {
            ephemeral,
            expansion: expansion.into(),
        }
    }

    pub fn expansion_value(&self) -> &[u8] {
        &self.expansion
    }
}

impl KeyDerivOpts for EcdsaReRandKeyOpts {
    fn algorithm(&self) -> &'static str {
        "ECDSA_RERAND"
    }

    fn ephemeral(&self) -> bool {
        self.ephemeral
    }
}

/// Public-key algorithms recognised in certificates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKeyAlgorithm {
    Ecdsa,
    Rsa,
}

impl fmt::Display for PublicKeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicKeyAlgorithm::Ecdsa => write!(f, "ECDSA"),
            PublicKeyAlgorithm::Rsa => write!(f, "RSA"),
        }
    }
}

/// Import the public key of an X.509 certificate
///
/// When `expected` is set the certificate's public-key algorithm must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct X509PublicKeyImportOpts {
    pub ephemeral: bool,
    pub expected: Option<PublicKeyAlgorithm>,
}

impl X509PublicKeyImportOpts {
    pub fn new(ephemeral: bool) -> Self {
        Self {
            ephemeral,
            expected: None,
        }
    }

    pub fn expecting(ephemeral: bool, algorithm: PublicKeyAlgorithm) -> Self {
        Self {
            ephemeral,
            expected: Some(algorithm),
        }
    }
}

impl KeyImportOpts for X509PublicKeyImportOpts {
    fn algorithm(&self) -> &'static str {
        "X509Certificate"
    }

    fn ephemeral(&self) -> bool {
        self.ephemeral
    }
}

/// PSS salt length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PssSaltLength {
    /// Salt as long as the digest
    EqualsHash,
    /// Explicit salt length in bytes
    Length(usize),
}

/// RSA-PSS signing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsaPssOpts {
    pub salt_length: PssSaltLength,
    pub hash: HashType,
}

impl RsaPssOpts {
    pub fn new(salt_length: PssSaltLength, hash: HashType) -> Self {
        Self { salt_length, hash }
    }

    /// Salt length in bytes
    pub fn salt_len(&self) -> usize {
        match self.salt_length {
            PssSaltLength::EqualsHash => self.hash.output_size(),
            PssSaltLength::Length(len) => len,
        }
    }
}

impl SignerOpts for RsaPssOpts {
    fn hash_type(&self) -> HashType {
        self.hash
    }
}

/// AES-CBC with PKCS#7 padding
///
/// Without an explicit IV a fresh one is drawn from the OS RNG. Decryption
/// always reads the IV from the ciphertext prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AesCbcPkcs7ModeOpts {
    pub iv: Option<[u8; 16]>,
}

impl AesCbcPkcs7ModeOpts {
    pub fn with_iv(iv: [u8; 16]) -> Self {
        Self { iv: Some(iv) }
    }
}

impl EncrypterOpts for AesCbcPkcs7ModeOpts {}

impl DecrypterOpts for AesCbcPkcs7ModeOpts {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_opts_report_algorithm_and_ephemeral() {
        let opts = EcdsaP256KeyGenOpts::new(true);
        assert_eq!(opts.algorithm(), "ECDSAP256");
        assert!(opts.ephemeral());
        assert!(!Aes256ImportKeyOpts::default().ephemeral());
    }

    #[test]
    fn test_pss_salt_length() {
        let opts = RsaPssOpts::new(PssSaltLength::EqualsHash, HashType::Sha2_384);
        assert_eq!(opts.salt_len(), 48);
        let opts = RsaPssOpts::new(PssSaltLength::Length(20), HashType::Sha2_256);
        assert_eq!(opts.salt_len(), 20);
        assert_eq!(opts.hash_type(), HashType::Sha2_256);
    }

    #[test]
    fn test_opts_types_are_distinct_tags() {
        let a: &dyn KeyImportOpts = &EcdsaPkixPublicKeyImportOpts::default();
        let b: &dyn KeyImportOpts = &EcdsaPrivateKeyImportOpts::default();
        assert_eq!(a.algorithm(), b.algorithm());
        assert_ne!(a.as_any().type_id(), b.as_any().type_id());
    }
}
