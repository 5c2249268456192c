use rsa::BigUint;

use crate::error::{CspError, CspResult};

const TAG_SEQUENCE: u8 = 0x30;
const TAG_INTEGER: u8 = 0x02;

/// Encode `(r, s)` as DER `SEQUENCE { INTEGER r, INTEGER s }`
///
/// Integers and lengths use their minimal encodings.
pub fn marshal_signature(r: &BigUint, s: &BigUint) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 * 50);
    write_integer(&mut body, r);
    write_integer(&mut body, s);

    let mut out = Vec::with_capacity(body.len() + 4);
    out.push(TAG_SEQUENCE);
    write_length(&mut out, body.len());
    out.extend_from_slice(&body);
    out
}

/// Strictly decode a DER ECDSA signature into `(r, s)`
///
/// Anything that is not the unique DER encoding of two positive integers is
/// rejected with `MalformedSignature`.
pub fn unmarshal_signature(sig: &[u8]) -> CspResult<(BigUint, BigUint)> {
    let mut reader = DerReader::new(sig);

    reader.expect_tag(TAG_SEQUENCE)?;
    let len = reader.read_length()?;
    if reader.remaining() < len {
        return Err(malformed("sequence is truncated"));
    }
    if reader.remaining() > len {
        return Err(malformed("trailing data after signature"));
    }

    let r = reader.read_integer("R")?;
    let s = reader.read_integer("S")?;
    if reader.remaining() != 0 {
        return Err(malformed("trailing data inside sequence"));
    }
    Ok((r, s))
}

fn malformed(cause: &str) -> CspError {
    CspError::malformed_signature(&format!("Failed unmarshalling signature: {}", cause))
}

fn write_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

fn write_integer(out: &mut Vec<u8>, value: &BigUint) {
    let bytes = value.to_bytes_be();
    // Positive values with the high bit set need a sign byte
    let pad = bytes[0] & 0x80 != 0;
    out.push(TAG_INTEGER);
    write_length(out, bytes.len() + usize::from(pad));
    if pad {
        out.push(0x00);
    }
    out.extend_from_slice(&bytes);
}

struct DerReader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    fn read_byte(&mut self) -> CspResult<u8> {
        let byte = *self
            .input
            .get(self.pos)
            .ok_or_else(|| malformed("unexpected end of input"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, len: usize) -> CspResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(malformed("unexpected end of input"));
        }
        let bytes = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn expect_tag(&mut self, tag: u8) -> CspResult<()> {
        let found = self.read_byte()?;
        if found != tag {
            return Err(malformed(&format!(
                "expected tag 0x{:02x}, found 0x{:02x}",
                tag, found
            )));
        }
        Ok(())
    }

    fn read_length(&mut self) -> CspResult<usize> {
        let first = self.read_byte()?;
        if first < 0x80 {
            return Ok(first as usize);
        }
        if first == 0x80 {
            return Err(malformed("indefinite length"));
        }

        let count = (first & 0x7f) as usize;
        if count > std::mem::size_of::<u32>() {
            return Err(malformed("length too large"));
        }
        let bytes = self.read_bytes(count)?;
        if bytes[0] == 0 {
            return Err(malformed("non-minimal length"));
        }
        let len = bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
        if len < 0x80 {
            return Err(malformed("non-minimal length"));
        }
        Ok(len)
    }

    fn read_integer(&mut self, name: &str) -> CspResult<BigUint> {
        self.expect_tag(TAG_INTEGER)?;
        let len = self.read_length()?;
        let bytes = self.read_bytes(len)?;

        if bytes.is_empty() {
            return Err(malformed(&format!("empty integer {}", name)));
        }
        if bytes.len() > 1 {
            let superfluous_zero = bytes[0] == 0x00 && bytes[1] & 0x80 == 0;
            let superfluous_ff = bytes[0] == 0xff && bytes[1] & 0x80 != 0;
            if superfluous_zero || superfluous_ff {
                return Err(malformed(&format!("non-minimal integer {}", name)));
            }
        }
        if bytes[0] & 0x80 != 0 {
            return Err(malformed(&format!(
                "invalid {}. Must be larger than zero",
                name
            )));
        }

        let value = BigUint::from_bytes_be(bytes);
        if value == BigUint::default() {
            return Err(malformed(&format!(
                "invalid {}. Must be different from zero",
                name
            )));
        }
        Ok(value)
    }
}
