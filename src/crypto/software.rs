use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use super::{CryptoError, CryptoProvider, KeyPair};
use crate::codec::EcPublicKey;
use crate::store::CredentialId;

/// RustCrypto-backed provider. Keys never leave process memory except as the
/// PKCS#8 blob handed back to the caller for storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareCrypto;

impl SoftwareCrypto {
    pub fn new() -> Self {
        Self
    }
}

fn public_coords(key: &SigningKey) -> Result<EcPublicKey, CryptoError> {
    let point = key.verifying_key().to_encoded_point(false);
    let (Some(x), Some(y)) = (point.x(), point.y()) else {
        return Err(CryptoError::KeyImport("public key is the identity point".into()));
    };
    let mut public = EcPublicKey { x: [0u8; 32], y: [0u8; 32] };
    public.x.copy_from_slice(x);
    public.y.copy_from_slice(y);
    Ok(public)
}

fn load_signing_key(private_pkcs8: &[u8]) -> Result<SigningKey, CryptoError> {
    SigningKey::from_pkcs8_der(private_pkcs8).map_err(|e| CryptoError::KeyImport(e.to_string()))
}

impl CryptoProvider for SoftwareCrypto {
    fn generate_key_pair(&self) -> Result<KeyPair, CryptoError> {
        let key = SigningKey::random(&mut OsRng);
        let private_pkcs8 = key
            .to_pkcs8_der()
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?
            .as_bytes()
            .to_vec();
        let public_key = public_coords(&key)?;
        Ok(KeyPair { private_pkcs8, public_key })
    }

    fn public_key_from_pkcs8(&self, private_pkcs8: &[u8]) -> Result<EcPublicKey, CryptoError> {
        public_coords(&load_signing_key(private_pkcs8)?)
    }

    fn sign(&self, private_pkcs8: &[u8], data: &[u8]) -> Result<[u8; 64], CryptoError> {
        let key = load_signing_key(private_pkcs8)?;
        let signature: Signature = key
            .try_sign(data)
            .map_err(|e| CryptoError::Sign(e.to_string()))?;
        let bytes = signature.to_bytes();
        let mut raw = [0u8; 64];
        raw.copy_from_slice(&bytes);
        Ok(raw)
    }

    fn digest(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }

    fn generate_credential_id(&self) -> CredentialId {
        CredentialId::new_v4()
    }
}
