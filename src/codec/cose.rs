//! Canonical CTAP2 CBOR encoding of a P-256 EC2 COSE key.
//!
//! Byte layout (77 bytes):
//!
//! | offset | bytes           | meaning                       |
//! |--------|-----------------|-------------------------------|
//! | 0      | `a5`            | map(5)                        |
//! | 1      | `01 02`         | kty (1) = EC2 (2)             |
//! | 3      | `03 26`         | alg (3) = ES256 (-7)          |
//! | 5      | `20 01`         | crv (-1) = P-256 (1)          |
//! | 7      | `21 58 20`      | x (-2) = bstr(32)             |
//! | 10     | x               | 32-byte x coordinate          |
//! | 42     | `22 58 20`      | y (-3) = bstr(32)             |
//! | 45     | y               | 32-byte y coordinate          |
//!
//! Written by hand rather than through a general CBOR serializer because the
//! key order and integer widths must be the CTAP2 canonical ones.

use super::{writer::ByteWriter, CodecError};

pub const COSE_KEY_LEN: usize = 77;

pub const COSE_KTY_EC2: i64 = 2;
pub const COSE_ALG_ES256: i64 = -7;
pub const COSE_CRV_P256: i64 = 1;

const HEADER: [u8; 10] = [0xa5, 0x01, 0x02, 0x03, 0x26, 0x20, 0x01, 0x21, 0x58, 0x20];
const Y_PREFIX: [u8; 3] = [0x22, 0x58, 0x20];

const X_OFFSET: usize = 10;
const Y_PREFIX_OFFSET: usize = X_OFFSET + 32;
const Y_OFFSET: usize = Y_PREFIX_OFFSET + 3;

pub fn encode_cose_key(x: &[u8; 32], y: &[u8; 32]) -> Result<[u8; COSE_KEY_LEN], CodecError> {
    let mut out = [0u8; COSE_KEY_LEN];
    let mut w = ByteWriter::new(&mut out);
    w.put(&HEADER)?;
    w.put(x)?;
    w.put(&Y_PREFIX)?;
    w.put(y)?;
    w.finish()?;
    Ok(out)
}

/// Parse a key produced by [`encode_cose_key`] back into its coordinates.
pub fn decode_cose_key(bytes: &[u8]) -> Result<([u8; 32], [u8; 32]), CodecError> {
    if bytes.len() != COSE_KEY_LEN {
        return Err(CodecError::Malformed(format!(
            "COSE key must be {COSE_KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[..X_OFFSET] != HEADER || bytes[Y_PREFIX_OFFSET..Y_OFFSET] != Y_PREFIX {
        return Err(CodecError::Malformed("not a canonical ES256 EC2 key".into()));
    }
    let mut x = [0u8; 32];
    let mut y = [0u8; 32];
    x.copy_from_slice(&bytes[X_OFFSET..Y_PREFIX_OFFSET]);
    y.copy_from_slice(&bytes[Y_OFFSET..]);
    Ok((x, y))
}
