use rand::{rngs::OsRng, RngCore};
use rsa::BigUint;

use crate::error::{error_codes, CspError, CspResult};

/// Generate random bytes of the specified length
pub fn random_bytes(length: usize) -> CspResult<Vec<u8>> {
    let mut bytes = vec![0u8; length];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        CspError::crypto_failure(
            "random_bytes",
            &format!("OS random number generator failed: {}", e),
            error_codes::KEY_GENERATION_FAILED,
        )
    })?;
    Ok(bytes)
}

/// Left-pad the big-endian encoding of `value` to exactly `width` bytes.
///
/// Returns `None` if the value does not fit.
pub fn to_fixed_be(value: &BigUint, width: usize) -> Option<Vec<u8>> {
    let bytes = value.to_bytes_be();
    // to_bytes_be yields [0] for zero
    let bytes: &[u8] = if bytes == [0] { &[] } else { &bytes };
    if bytes.len() > width {
        return None;
    }
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(bytes);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_bytes_length() {
        for len in [0usize, 1, 16, 32, 100] {
            assert_eq!(random_bytes(len).unwrap().len(), len);
        }
        assert_ne!(random_bytes(32).unwrap(), random_bytes(32).unwrap());
    }

    #[test]
    fn test_to_fixed_be_pads_and_rejects_overflow() {
        let value = BigUint::from_bytes_be(&[0x01, 0x02]);
        assert_eq!(to_fixed_be(&value, 4).unwrap(), vec![0, 0, 1, 2]);
        assert_eq!(to_fixed_be(&BigUint::from_bytes_be(&[0]), 2).unwrap(), vec![0, 0]);
        assert!(to_fixed_be(&value, 1).is_none());
    }
}
