use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::RngCore;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{ItemId, StoreError, VaultItem};

const NONCE_LEN: usize = 12;
pub(crate) const ITEM_EXTENSION: &str = "bin";
pub(crate) const TMP_EXTENSION: &str = "tmp";

pub(crate) fn item_path(dir: &Path, id: &ItemId) -> PathBuf {
    dir.join(format!("{}.{ITEM_EXTENSION}", id.simple()))
}

fn cipher(aes_key: &[u8; 32]) -> Result<Aes256Gcm, StoreError> {
    Aes256Gcm::new_from_slice(aes_key).map_err(|e| StoreError::Encryption(e.to_string()))
}

/// Encrypt + write item to `dir/{id}.bin`. The file is replaced atomically.
pub(crate) fn write_item(
    aes_key: &[u8; 32],
    dir: &Path,
    item: &VaultItem,
) -> Result<(), StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(item, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher(aes_key)?
        .encrypt(Nonce::from_slice(&nonce_bytes), buf.as_slice())
        .map_err(|e| StoreError::Encryption(e.to_string()))?;

    let mut file_bytes = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    file_bytes.extend_from_slice(&nonce_bytes);
    file_bytes.extend_from_slice(&ciphertext);

    let path = item_path(dir, &item.id);
    let tmp = path.with_extension(TMP_EXTENSION);
    if let Err(e) = write_synced(&tmp, &file_bytes).and_then(|()| std::fs::rename(&tmp, &path)) {
        if let Err(cleanup) = std::fs::remove_file(&tmp) {
            tracing::debug!(path = %tmp.display(), error = %cleanup, "Temp file not removed");
        }
        return Err(e.into());
    }
    Ok(())
}

/// Write and fsync, so a rename never exposes a partially flushed file.
fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Read + decrypt + deserialize item from `path`.
pub(crate) fn read_item(aes_key: &[u8; 32], path: &Path) -> Result<VaultItem, StoreError> {
    let bytes = std::fs::read(path)?;
    if bytes.len() < NONCE_LEN {
        return Err(StoreError::Corrupt("file too short".into()));
    }
    let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);

    let plaintext = cipher(aes_key)?
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| StoreError::Encryption(e.to_string()))?;

    ciborium::from_reader(plaintext.as_slice())
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Load all valid item files from `dir`. Logs and skips corrupt files and
/// removes temp files left by an interrupted write.
pub(crate) fn load_all(aes_key: &[u8; 32], dir: &Path) -> Result<Vec<VaultItem>, StoreError> {
    let mut items = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ITEM_EXTENSION) => {}
            Some(TMP_EXTENSION) if path.is_file() => {
                tracing::warn!(path = %path.display(), "Removing leftover temp file");
                std::fs::remove_file(&path)?;
                continue;
            }
            _ => continue,
        }
        match read_item(aes_key, &path) {
            Ok(item) if item_path(dir, &item.id) == path => items.push(item),
            Ok(item) => {
                tracing::warn!(path = %path.display(), item_id = %item.id, "Skipping item stored under a foreign file name");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping corrupt item file");
            }
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::item::{Login, NewItem};
    use crate::store::ItemKind;

    fn login(name: &str) -> VaultItem {
        NewItem {
            name: name.into(),
            kind: ItemKind::Login(Login { username: None, fido2_key: None }),
        }
        .into_item(ItemId::new_v4())
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_leaves_only_item_file() {
        let dir = tempfile::tempdir().unwrap();
        let item = login("a");
        write_item(&[1u8; 32], dir.path(), &item).unwrap();
        assert_eq!(entries(dir.path()), vec![format!("{}.bin", item.id.simple())]);
        assert_eq!(read_item(&[1u8; 32], &item_path(dir.path(), &item.id)).unwrap(), item);
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let item = login("blocked");
        // A directory in place of the item file makes the rename fail.
        std::fs::create_dir(item_path(dir.path(), &item.id)).unwrap();

        assert!(write_item(&[1u8; 32], dir.path(), &item).is_err());
        assert_eq!(entries(dir.path()), vec![format!("{}.bin", item.id.simple())]);
    }

    #[test]
    fn test_load_removes_leftover_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let item = login("kept");
        write_item(&[2u8; 32], dir.path(), &item).unwrap();
        std::fs::write(dir.path().join("0123abcd.tmp"), b"half written").unwrap();

        let items = load_all(&[2u8; 32], dir.path()).unwrap();
        assert_eq!(items, vec![item.clone()]);
        assert_eq!(entries(dir.path()), vec![format!("{}.bin", item.id.simple())]);
    }
}
