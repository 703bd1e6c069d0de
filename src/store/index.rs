use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tokio::sync::Mutex as AsyncMutex;

use super::{disk, CredentialStore, ItemId, NewItem, StoreError, VaultItem};

struct Inner {
    by_id: HashMap<ItemId, VaultItem>,
}

/// Directory of AES-256-GCM encrypted items, one file per item, mirrored in
/// memory. Writes go to disk first and only then into the index.
///
/// File I/O runs on the blocking pool. `write_lock` serializes writers across
/// that await; `inner` is only ever held for map access.
pub struct VaultStore {
    aes_key: [u8; 32],
    items_dir: PathBuf,
    inner: Mutex<Inner>,
    write_lock: AsyncMutex<()>,
}

impl VaultStore {
    /// Load all items from disk into memory.
    pub fn load(aes_key: [u8; 32], items_dir: PathBuf) -> Result<Self, StoreError> {
        let by_id = disk::load_all(&aes_key, &items_dir)?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();
        Ok(Self {
            aes_key,
            items_dir,
            inner: Mutex::new(Inner { by_id }),
            write_lock: AsyncMutex::new(()),
        })
    }

    pub fn item_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.by_id.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    async fn persist(&self, item: VaultItem) -> Result<VaultItem, StoreError> {
        let aes_key = self.aes_key;
        let dir = self.items_dir.clone();
        tokio::task::spawn_blocking(move || {
            disk::write_item(&aes_key, &dir, &item)?;
            Ok::<_, StoreError>(item)
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }
}

#[async_trait::async_trait]
impl CredentialStore for VaultStore {
    async fn create(&self, item: NewItem) -> Result<ItemId, StoreError> {
        let _writer = self.write_lock.lock().await;
        let id = {
            let inner = self.lock()?;
            loop {
                let id = ItemId::new_v4();
                if !inner.by_id.contains_key(&id) {
                    break id;
                }
            }
        };
        let item = self.persist(item.into_item(id)).await?;
        self.lock()?.by_id.insert(id, item);
        tracing::debug!(item_id = %id, "Item created");
        Ok(id)
    }

    async fn get(&self, id: &ItemId) -> Result<VaultItem, StoreError> {
        self.lock()?
            .by_id
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    async fn update(&self, item: &VaultItem) -> Result<(), StoreError> {
        let _writer = self.write_lock.lock().await;
        if !self.lock()?.by_id.contains_key(&item.id) {
            return Err(StoreError::NotFound(item.id));
        }
        let item = self.persist(item.clone()).await?;
        let id = item.id;
        self.lock()?.by_id.insert(id, item);
        tracing::debug!(item_id = %id, "Item updated");
        Ok(())
    }

    async fn list_all_decrypted(&self) -> Result<Vec<VaultItem>, StoreError> {
        Ok(self.lock()?.by_id.values().cloned().collect())
    }
}
