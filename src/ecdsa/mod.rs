/*!
 * ECDSA over P-256 and P-384
 *
 * Every signature produced here is low-S: when `s > n/2` it is replaced by
 * `n - s`, so each (key, digest) pair has one valid encoding. Verification
 * decodes strictly and rejects high-S signatures as malformed before doing
 * any curve arithmetic.
 */

mod canonical;
mod der;
mod signing;

pub use canonical::{CurveOrder, CurveOrders};
pub use der::{marshal_signature, unmarshal_signature};
pub use signing::{sign_digest, signature_from_raw, signature_to_raw, verify_digest};
