use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ItemId = Uuid;
pub type CredentialId = Uuid;

pub const KEY_TYPE_PUBLIC_KEY: &str = "public-key";
pub const KEY_ALGORITHM_ECDSA: &str = "ECDSA";
pub const KEY_CURVE_P256: &str = "P-256";

/// Resolve a descriptor id to a canonical credential id.
///
/// Accepts 16 raw bytes or the UTF-8 text of a UUID. Anything else is `None`.
pub fn parse_credential_id(raw: &[u8]) -> Option<CredentialId> {
    if let Ok(id) = Uuid::from_slice(raw) {
        return Some(id);
    }
    std::str::from_utf8(raw).ok().and_then(|s| Uuid::parse_str(s).ok())
}

/// One passkey: key material plus relying-party and user binding.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fido2Key {
    /// `None` when the owning item's id is the credential id (discoverable).
    pub non_discoverable_id: Option<CredentialId>,
    pub key_type: String,
    pub key_algorithm: String,
    pub key_curve: String,
    /// PKCS#8 DER private key.
    pub key_value: Vec<u8>,
    pub rp_id: String,
    pub rp_name: Option<String>,
    pub user_handle: Vec<u8>,
    pub user_name: Option<String>,
    pub counter: u32,
}

impl std::fmt::Debug for Fido2Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fido2Key")
            .field("non_discoverable_id", &self.non_discoverable_id)
            .field("rp_id", &self.rp_id)
            .field("user_name", &self.user_name)
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Login {
    pub username: Option<String>,
    pub fido2_key: Option<Fido2Key>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    /// Dedicated discoverable passkey record.
    Passkey(Fido2Key),
    /// Password login that may carry one non-discoverable passkey.
    Login(Login),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultItem {
    pub id: ItemId,
    pub name: String,
    pub kind: ItemKind,
    /// Soft-delete marker, ms since the Unix epoch.
    pub deleted_at: Option<u64>,
    /// ms since the Unix epoch.
    pub last_used_at: Option<u64>,
}

impl VaultItem {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn fido2_key(&self) -> Option<&Fido2Key> {
        match &self.kind {
            ItemKind::Passkey(key) => Some(key),
            ItemKind::Login(login) => login.fido2_key.as_ref(),
        }
    }
}

/// Item content handed to [`super::CredentialStore::create`]; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub kind: ItemKind,
}

impl NewItem {
    pub fn into_item(self, id: ItemId) -> VaultItem {
        VaultItem {
            id,
            name: self.name,
            kind: self.kind,
            deleted_at: None,
            last_used_at: None,
        }
    }
}
