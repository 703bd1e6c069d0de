pub mod software;

pub use software::SoftwareCrypto;

use crate::codec::EcPublicKey;
use crate::store::CredentialId;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key generation: {0}")]
    KeyGeneration(String),
    #[error("key import: {0}")]
    KeyImport(String),
    #[error("sign: {0}")]
    Sign(String),
}

/// Freshly generated ECDSA P-256 key pair.
pub struct KeyPair {
    /// PKCS#8 DER encoding of the private key.
    pub private_pkcs8: Vec<u8>,
    pub public_key: EcPublicKey,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Cryptographic capabilities the authenticator needs. Injected so ceremonies
/// can run against a deterministic provider in tests.
pub trait CryptoProvider: Send + Sync {
    fn generate_key_pair(&self) -> Result<KeyPair, CryptoError>;

    /// Import a PKCS#8 private key and return its public half.
    fn public_key_from_pkcs8(&self, private_pkcs8: &[u8]) -> Result<EcPublicKey, CryptoError>;

    /// ECDSA-SHA256 over `data`, IEEE-P1363 (r || s) form.
    fn sign(&self, private_pkcs8: &[u8], data: &[u8]) -> Result<[u8; 64], CryptoError>;

    fn digest(&self, data: &[u8]) -> [u8; 32];

    fn generate_credential_id(&self) -> CredentialId;
}

impl<T: CryptoProvider + ?Sized> CryptoProvider for std::sync::Arc<T> {
    fn generate_key_pair(&self) -> Result<KeyPair, CryptoError> {
        (**self).generate_key_pair()
    }

    fn public_key_from_pkcs8(&self, private_pkcs8: &[u8]) -> Result<EcPublicKey, CryptoError> {
        (**self).public_key_from_pkcs8(private_pkcs8)
    }

    fn sign(&self, private_pkcs8: &[u8], data: &[u8]) -> Result<[u8; 64], CryptoError> {
        (**self).sign(private_pkcs8, data)
    }

    fn digest(&self, data: &[u8]) -> [u8; 32] {
        (**self).digest(data)
    }

    fn generate_credential_id(&self) -> CredentialId {
        (**self).generate_credential_id()
    }
}
