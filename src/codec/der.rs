//! IEEE-P1363 (r || s) <-> ASN.1 DER conversion for ES256 signatures.
//!
//! DER form: `30 len 02 rlen r 02 slen s`, each INTEGER minimally encoded
//! (leading zero bytes stripped, one `00` prepended when the high bit of the
//! first remaining byte is set, zero encoded as `02 01 00`).

use super::{writer::ByteWriter, CodecError};

pub const P1363_LEN: usize = 64;
const SCALAR_LEN: usize = 32;
/// SEQUENCE header + two INTEGERs of at most 33 content bytes each.
const DER_MAX_LEN: usize = 2 + 2 * (2 + SCALAR_LEN + 1);

const TAG_SEQUENCE: u8 = 0x30;
const TAG_INTEGER: u8 = 0x02;

fn minimal(n: &[u8]) -> (&[u8], bool) {
    let first = n.iter().position(|&b| b != 0).unwrap_or(n.len() - 1);
    let n = &n[first..];
    (n, n[0] & 0x80 != 0)
}

fn put_integer(w: &mut ByteWriter<'_>, n: &[u8]) -> Result<(), CodecError> {
    let (n, pad) = minimal(n);
    w.put_u8(TAG_INTEGER)?;
    w.put_u8((n.len() + usize::from(pad)) as u8)?;
    if pad {
        w.put_u8(0)?;
    }
    w.put(n)
}

fn integer_len(n: &[u8]) -> usize {
    let (n, pad) = minimal(n);
    2 + n.len() + usize::from(pad)
}

/// Convert a raw 64-byte P-256 signature into DER.
pub fn p1363_to_der(raw: &[u8; P1363_LEN]) -> Result<Vec<u8>, CodecError> {
    let (r, s) = raw.split_at(SCALAR_LEN);
    let inner_len = integer_len(r) + integer_len(s);

    let mut buf = [0u8; DER_MAX_LEN];
    let mut w = ByteWriter::new(&mut buf);
    w.put_u8(TAG_SEQUENCE)?;
    w.put_u8(inner_len as u8)?;
    put_integer(&mut w, r)?;
    put_integer(&mut w, s)?;
    Ok(w.into_written().to_vec())
}

fn read_integer<'a>(der: &'a [u8], pos: &mut usize) -> Result<&'a [u8], CodecError> {
    let header = der
        .get(*pos..*pos + 2)
        .ok_or_else(|| CodecError::Malformed("truncated INTEGER header".into()))?;
    if header[0] != TAG_INTEGER {
        return Err(CodecError::Malformed(format!("expected INTEGER, got {:#04x}", header[0])));
    }
    let len = header[1] as usize;
    let start = *pos + 2;
    let value = der
        .get(start..start + len)
        .ok_or_else(|| CodecError::Malformed("truncated INTEGER body".into()))?;
    *pos = start + len;

    let value = match value {
        [0, rest @ ..] if !rest.is_empty() => rest,
        v => v,
    };
    if value.is_empty() || value.len() > SCALAR_LEN {
        return Err(CodecError::Malformed(format!("INTEGER of {} bytes", value.len())));
    }
    Ok(value)
}

/// Inverse of [`p1363_to_der`]: left-pads r and s back to 32 bytes each.
pub fn der_to_p1363(der: &[u8]) -> Result<[u8; P1363_LEN], CodecError> {
    if der.len() < 2 || der[0] != TAG_SEQUENCE || der[1] as usize != der.len() - 2 {
        return Err(CodecError::Malformed("bad SEQUENCE header".into()));
    }
    let mut pos = 2;
    let r = read_integer(der, &mut pos)?;
    let s = read_integer(der, &mut pos)?;
    if pos != der.len() {
        return Err(CodecError::Malformed("trailing bytes after signature".into()));
    }

    let mut raw = [0u8; P1363_LEN];
    raw[SCALAR_LEN - r.len()..SCALAR_LEN].copy_from_slice(r);
    raw[P1363_LEN - s.len()..].copy_from_slice(s);
    Ok(raw)
}
