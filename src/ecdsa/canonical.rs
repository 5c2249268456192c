use rsa::BigUint;

use crate::key::EcCurve;

const P256_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xbc, 0xe6, 0xfa, 0xad, 0xa7, 0x17, 0x9e, 0x84, 0xf3, 0xb9, 0xca, 0xc2, 0xfc, 0x63, 0x25, 0x51,
];

const P384_ORDER: [u8; 48] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xc7, 0x63, 0x4d, 0x81, 0xf4, 0x37, 0x2d, 0xdf,
    0x58, 0x1a, 0x0d, 0xb2, 0x48, 0xb0, 0xa7, 0x7a, 0xec, 0xec, 0x19, 0x6a, 0xcc, 0xc5, 0x29, 0x73,
];

/// Group order of a curve and its half
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveOrder {
    pub n: BigUint,
    pub half: BigUint,
}

impl CurveOrder {
    fn from_be_bytes(bytes: &[u8]) -> Self {
        let n = BigUint::from_bytes_be(bytes);
        let half = &n >> 1usize;
        Self { n, half }
    }

    pub fn is_low_s(&self, s: &BigUint) -> bool {
        s <= &self.half
    }

    /// `s` if it is already low, `n - s` otherwise
    pub fn to_low_s(&self, s: BigUint) -> BigUint {
        if self.is_low_s(&s) {
            s
        } else {
            &self.n - s
        }
    }
}

/// Orders of every supported curve, computed once per provider
#[derive(Debug, Clone)]
pub struct CurveOrders {
    p256: CurveOrder,
    p384: CurveOrder,
}

impl Default for CurveOrders {
    fn default() -> Self {
        Self::new()
    }
}

impl CurveOrders {
    pub fn new() -> Self {
        Self {
            p256: CurveOrder::from_be_bytes(&P256_ORDER),
            p384: CurveOrder::from_be_bytes(&P384_ORDER),
        }
    }

    pub fn get(&self, curve: EcCurve) -> &CurveOrder {
        match curve {
            EcCurve::P256 => &self.p256,
            EcCurve::P384 => &self.p384,
        }
    }
}
