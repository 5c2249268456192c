/*!
 * Error Handling for the Cryptographic Service Provider
 *
 * Every provider operation returns a `CspResult`. Errors carry enough context
 * (operation name, offending variant, cause) to be actionable, and map to a
 * stable numeric code per category.
 */

use thiserror::Error;

/// Error type for all provider operations
#[derive(Debug, Error)]
pub enum CspError {
    #[error("Invalid {parameter}. {reason}")]
    InvalidArgument {
        parameter: String,
        reason: String,
        error_code: u32,
    },

    #[error("Unsupported '{operation}' provided [{variant}]")]
    UnsupportedAlgorithm {
        operation: String,
        variant: String,
        error_code: u32,
    },

    #[error("Unsupported hash type [{hash}]")]
    UnsupportedHashType { hash: String, error_code: u32 },

    #[error("Invalid key material for {operation}: {cause}")]
    InvalidKeyMaterial {
        operation: String,
        cause: String,
        error_code: u32,
    },

    #[error("Key of type {key_type} is not exportable")]
    NotExportable { key_type: String, error_code: u32 },

    #[error("Malformed signature: {cause}")]
    MalformedSignature { cause: String, error_code: u32 },

    #[error("Invalid PKCS#7 padding")]
    InvalidPadding { error_code: u32 },

    #[error("Key not found [{ski}]")]
    KeyNotFound { ski: String, error_code: u32 },

    #[error("Failed storing key during {operation}: {source}")]
    PersistenceFailure {
        operation: String,
        #[source]
        source: Box<CspError>,
        error_code: u32,
    },

    #[error("Cryptographic operation failed: {operation} - {cause}")]
    CryptoFailure {
        operation: String,
        cause: String,
        error_code: u32,
    },

    #[error("PKCS#11 operation failed: {operation} - {cause}")]
    Pkcs11Failure {
        operation: String,
        cause: String,
        error_code: u32,
    },
}

/// Error code constants for the different error categories
pub mod error_codes {
    // Argument errors: 1000-1999
    pub const INVALID_ARGUMENT: u32 = 1001;
    pub const UNSUPPORTED_ALGORITHM: u32 = 1002;
    pub const UNSUPPORTED_HASH_TYPE: u32 = 1003;

    // Key errors: 2000-2999
    pub const INVALID_KEY_MATERIAL: u32 = 2001;
    pub const NOT_EXPORTABLE: u32 = 2002;
    pub const KEY_NOT_FOUND: u32 = 2003;
    pub const PERSISTENCE_FAILURE: u32 = 2004;

    // Signature errors: 3000-3999
    pub const MALFORMED_SIGNATURE: u32 = 3001;
    pub const SIGNING_FAILED: u32 = 3002;

    // Symmetric errors: 4000-4999
    pub const INVALID_PADDING: u32 = 4001;
    pub const ENCRYPTION_FAILED: u32 = 4002;

    // Primitive errors: 5000-5999
    pub const KEY_GENERATION_FAILED: u32 = 5001;
    pub const KEY_DERIVATION_FAILED: u32 = 5002;
    pub const ENCODING_FAILED: u32 = 5003;

    // Hardware errors: 7000-7999
    pub const HSM_OPERATION_FAILED: u32 = 7003;
}

impl CspError {
    /// Get the numeric error code for this error
    pub fn error_code(&self) -> u32 {
        match self {
            CspError::InvalidArgument { error_code, .. } => *error_code,
            CspError::UnsupportedAlgorithm { error_code, .. } => *error_code,
            CspError::UnsupportedHashType { error_code, .. } => *error_code,
            CspError::InvalidKeyMaterial { error_code, .. } => *error_code,
            CspError::NotExportable { error_code, .. } => *error_code,
            CspError::MalformedSignature { error_code, .. } => *error_code,
            CspError::InvalidPadding { error_code } => *error_code,
            CspError::KeyNotFound { error_code, .. } => *error_code,
            CspError::PersistenceFailure { error_code, .. } => *error_code,
            CspError::CryptoFailure { error_code, .. } => *error_code,
            CspError::Pkcs11Failure { error_code, .. } => *error_code,
        }
    }

    /// Get the error category as a string
    pub fn error_type(&self) -> &'static str {
        match self {
            CspError::InvalidArgument { .. } => "InvalidArgument",
            CspError::UnsupportedAlgorithm { .. } => "UnsupportedAlgorithm",
            CspError::UnsupportedHashType { .. } => "UnsupportedHashType",
            CspError::InvalidKeyMaterial { .. } => "InvalidKeyMaterial",
            CspError::NotExportable { .. } => "NotExportable",
            CspError::MalformedSignature { .. } => "MalformedSignature",
            CspError::InvalidPadding { .. } => "InvalidPadding",
            CspError::KeyNotFound { .. } => "KeyNotFound",
            CspError::PersistenceFailure { .. } => "PersistenceFailure",
            CspError::CryptoFailure { .. } => "CryptoFailure",
            CspError::Pkcs11Failure { .. } => "Pkcs11Failure",
        }
    }

    /// Get suggested remediation steps
    pub fn suggested_remediation(&self) -> Option<String> {
        match self {
            CspError::UnsupportedAlgorithm { .. } => Some(
                "Register a handler for this key or options type when constructing the provider."
                    .to_string(),
            ),
            CspError::UnsupportedHashType { .. } => Some(
                "Use a supported hash family (SHA2 or SHA3) at security level 256 or 384."
                    .to_string(),
            ),
            CspError::MalformedSignature { .. } => Some(
                "Signatures must be strict DER with a low-S component. Re-sign with this provider."
                    .to_string(),
            ),
            CspError::PersistenceFailure { .. } => Some(
                "Check the key store. Retry policy for transient failures is up to the caller."
                    .to_string(),
            ),
            CspError::Pkcs11Failure { .. } => Some(
                "Check the PKCS#11 library path, token label and PIN.".to_string(),
            ),
            _ => None,
        }
    }
}

/// Convenience constructors for common error types
impl CspError {
    pub fn invalid_argument(parameter: &str, reason: &str) -> Self {
        CspError::InvalidArgument {
            parameter: parameter.to_string(),
            reason: reason.to_string(),
            error_code: error_codes::INVALID_ARGUMENT,
        }
    }

    pub fn unsupported_algorithm(operation: &str, variant: &str) -> Self {
        CspError::UnsupportedAlgorithm {
            operation: operation.to_string(),
            variant: variant.to_string(),
            error_code: error_codes::UNSUPPORTED_ALGORITHM,
        }
    }

    pub fn unsupported_hash(hash: impl std::fmt::Display) -> Self {
        CspError::UnsupportedHashType {
            hash: hash.to_string(),
            error_code: error_codes::UNSUPPORTED_HASH_TYPE,
        }
    }

    pub fn invalid_key_material(operation: &str, cause: &str) -> Self {
        CspError::InvalidKeyMaterial {
            operation: operation.to_string(),
            cause: cause.to_string(),
            error_code: error_codes::INVALID_KEY_MATERIAL,
        }
    }

    pub fn not_exportable(key_type: &str) -> Self {
        CspError::NotExportable {
            key_type: key_type.to_string(),
            error_code: error_codes::NOT_EXPORTABLE,
        }
    }

    pub fn malformed_signature(cause: &str) -> Self {
        CspError::MalformedSignature {
            cause: cause.to_string(),
            error_code: error_codes::MALFORMED_SIGNATURE,
        }
    }

    pub fn invalid_padding() -> Self {
        CspError::InvalidPadding {
            error_code: error_codes::INVALID_PADDING,
        }
    }

    pub fn key_not_found(ski: &[u8]) -> Self {
        CspError::KeyNotFound {
            ski: hex::encode(ski),
            error_code: error_codes::KEY_NOT_FOUND,
        }
    }

    pub fn persistence_failure(operation: &str, source: CspError) -> Self {
        CspError::PersistenceFailure {
            operation: operation.to_string(),
            source: Box::new(source),
            error_code: error_codes::PERSISTENCE_FAILURE,
        }
    }

    pub fn crypto_failure(operation: &str, cause: &str, error_code: u32) -> Self {
        CspError::CryptoFailure {
            operation: operation.to_string(),
            cause: cause.to_string(),
            error_code,
        }
    }

    pub fn pkcs11_failure(operation: &str, cause: &str) -> Self {
        CspError::Pkcs11Failure {
            operation: operation.to_string(),
            cause: cause.to_string(),
            error_code: error_codes::HSM_OPERATION_FAILED,
        }
    }
}

impl From<cryptoki::error::Error> for CspError {
    fn from(err: cryptoki::error::Error) -> Self {
        CspError::pkcs11_failure("pkcs11", &err.to_string())
    }
}

/// Result type alias for provider operations
pub type CspResult<T> = Result<T, CspError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_algorithm_names_variant() {
        let error = CspError::unsupported_algorithm("KeyGenOpts", "cspkit::opts::MockOpts");
        assert_eq!(
            error.to_string(),
            "Unsupported 'KeyGenOpts' provided [cspkit::opts::MockOpts]"
        );
        assert_eq!(error.error_code(), error_codes::UNSUPPORTED_ALGORITHM);
        assert_eq!(error.error_type(), "UnsupportedAlgorithm");
    }

    #[test]
    fn test_persistence_failure_keeps_source() {
        let error = CspError::persistence_failure(
            "key_gen",
            CspError::invalid_argument("store", "cannot store key"),
        );
        assert!(error.to_string().contains("cannot store key"));
        assert!(std::error::Error::source(&error).is_some());
        assert!(error.suggested_remediation().is_some());
    }

    #[test]
    fn test_key_not_found_hex_encodes_ski() {
        let error = CspError::key_not_found(&[0xde, 0xad]);
        assert_eq!(error.to_string(), "Key not found [dead]");
    }
}
