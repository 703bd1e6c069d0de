use super::{cose::encode_cose_key, writer::ByteWriter, CodecError};
pub use crate::config::AAGUID;

pub const RP_ID_HASH_LEN: usize = 32;
/// rpIdHash + flags + signCount.
pub const AUTH_DATA_HEADER_LEN: usize = RP_ID_HASH_LEN + 1 + 4;

/// authenticatorData flag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthDataFlags(u8);

impl AuthDataFlags {
    pub const USER_PRESENT: u8 = 0x01;
    pub const USER_VERIFIED: u8 = 0x04;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    pub const EXTENSION_DATA: u8 = 0x80;

    pub fn new(user_present: bool, user_verified: bool, attested: bool) -> Self {
        let mut flags = 0;
        if user_present {
            flags |= Self::USER_PRESENT;
        }
        if user_verified {
            flags |= Self::USER_VERIFIED;
        }
        if attested {
            flags |= Self::ATTESTED_CREDENTIAL_DATA;
        }
        Self(flags)
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Public half of a P-256 key as affine coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcPublicKey {
    pub x: [u8; 32],
    pub y: [u8; 32],
}

/// authenticatorData for a new credential: UP and AT set, attested block appended.
pub fn build_attested_auth_data(
    rp_id_hash: &[u8; RP_ID_HASH_LEN],
    counter: u32,
    credential_id: &[u8],
    public_key: &EcPublicKey,
) -> Result<Vec<u8>, CodecError> {
    let cred_id_len = u16::try_from(credential_id.len())
        .map_err(|_| CodecError::Malformed("credential id longer than 65535 bytes".into()))?;
    let cose_key = encode_cose_key(&public_key.x, &public_key.y)?;

    let total = AUTH_DATA_HEADER_LEN + AAGUID.len() + 2 + credential_id.len() + cose_key.len();
    let mut data = vec![0u8; total];
    let mut w = ByteWriter::new(&mut data);
    w.put(rp_id_hash)?;
    w.put_u8(AuthDataFlags::new(true, false, true).bits())?;
    w.put_u32_be(counter)?;
    w.put(&AAGUID)?;
    w.put_u16_be(cred_id_len)?;
    w.put(credential_id)?;
    w.put(&cose_key)?;
    w.finish()?;
    Ok(data)
}

/// authenticatorData for an assertion: UP only, no attested block.
pub fn build_assertion_auth_data(
    rp_id_hash: &[u8; RP_ID_HASH_LEN],
    counter: u32,
) -> Result<Vec<u8>, CodecError> {
    let mut data = vec![0u8; AUTH_DATA_HEADER_LEN];
    let mut w = ByteWriter::new(&mut data);
    w.put(rp_id_hash)?;
    w.put_u8(AuthDataFlags::new(true, false, false).bits())?;
    w.put_u32_be(counter)?;
    w.finish()?;
    Ok(data)
}
