pub mod disk;
pub mod index;
pub mod item;
pub mod memory;

pub use index::VaultStore;
pub use item::{
    parse_credential_id, CredentialId, Fido2Key, ItemId, ItemKind, Login, NewItem, VaultItem,
};
pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialize: {0}")]
    Serialization(String),
    #[error("Encrypt: {0}")]
    Encryption(String),
    #[error("Corrupt: {0}")]
    Corrupt(String),
    #[error("Not found: {0}")]
    NotFound(ItemId),
    #[error("Lock poisoned")]
    Poisoned,
}

/// Encrypted item storage owned by the vault.
///
/// Implementations serialize their own writes; the authenticator never holds
/// a lock across calls.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Encrypt and persist a new item, returning the id the store assigned.
    async fn create(&self, item: NewItem) -> Result<ItemId, StoreError>;

    async fn get(&self, id: &ItemId) -> Result<VaultItem, StoreError>;

    /// Re-encrypt and replace an existing item.
    async fn update(&self, item: &VaultItem) -> Result<(), StoreError>;

    async fn list_all_decrypted(&self) -> Result<Vec<VaultItem>, StoreError>;

    /// Non-deleted items carrying a passkey bound to `rp_id`.
    async fn list_for_rp(&self, rp_id: &str) -> Result<Vec<VaultItem>, StoreError> {
        Ok(self
            .list_all_decrypted()
            .await?
            .into_iter()
            .filter(|item| !item.is_deleted())
            .filter(|item| item.fido2_key().is_some_and(|key| key.rp_id == rp_id))
            .collect())
    }
}

#[async_trait::async_trait]
impl<T: CredentialStore + ?Sized> CredentialStore for std::sync::Arc<T> {
    async fn create(&self, item: NewItem) -> Result<ItemId, StoreError> {
        (**self).create(item).await
    }

    async fn get(&self, id: &ItemId) -> Result<VaultItem, StoreError> {
        (**self).get(id).await
    }

    async fn update(&self, item: &VaultItem) -> Result<(), StoreError> {
        (**self).update(item).await
    }

    async fn list_all_decrypted(&self) -> Result<Vec<VaultItem>, StoreError> {
        (**self).list_all_decrypted().await
    }

    async fn list_for_rp(&self, rp_id: &str) -> Result<Vec<VaultItem>, StoreError> {
        (**self).list_for_rp(rp_id).await
    }
}
