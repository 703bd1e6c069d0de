pub mod attestation;
pub mod authenticator_data;
pub mod cose;
pub mod der;
pub mod response;
pub mod writer;

pub use authenticator_data::{AuthDataFlags, EcPublicKey};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("buffer overflow: capacity {capacity}, needed {needed}")]
    BufferOverflow { capacity: usize, needed: usize },
    #[error("incomplete buffer: expected {expected} bytes, wrote {written}")]
    Incomplete { expected: usize, written: usize },
    #[error("malformed: {0}")]
    Malformed(String),
    #[error("cbor: {0}")]
    Cbor(String),
}
