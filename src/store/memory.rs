use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{CredentialStore, ItemId, NewItem, StoreError, VaultItem};

/// Process-local store. Items are kept decrypted; used for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<ItemId, VaultItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item with a caller-chosen id, replacing any existing one.
    pub fn insert(&self, item: VaultItem) -> Result<(), StoreError> {
        self.items
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .insert(item.id, item);
        Ok(())
    }

    pub fn item_count(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryStore {
    async fn create(&self, item: NewItem) -> Result<ItemId, StoreError> {
        let mut items = self.items.lock().map_err(|_| StoreError::Poisoned)?;
        let id = loop {
            let id = ItemId::new_v4();
            if !items.contains_key(&id) {
                break id;
            }
        };
        items.insert(id, item.into_item(id));
        Ok(id)
    }

    async fn get(&self, id: &ItemId) -> Result<VaultItem, StoreError> {
        self.items
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    async fn update(&self, item: &VaultItem) -> Result<(), StoreError> {
        let mut items = self.items.lock().map_err(|_| StoreError::Poisoned)?;
        let slot = items.get_mut(&item.id).ok_or(StoreError::NotFound(item.id))?;
        *slot = item.clone();
        Ok(())
    }

    async fn list_all_decrypted(&self) -> Result<Vec<VaultItem>, StoreError> {
        Ok(self
            .items
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .values()
            .cloned()
            .collect())
    }
}
