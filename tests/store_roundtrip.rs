use fidovault::store::item::{KEY_ALGORITHM_ECDSA, KEY_CURVE_P256, KEY_TYPE_PUBLIC_KEY};
use fidovault::store::{
    CredentialStore, Fido2Key, ItemId, ItemKind, Login, NewItem, VaultItem, VaultStore,
};

fn make_key(rp_id: &str, user_handle: &[u8], counter: u32) -> Fido2Key {
    Fido2Key {
        non_discoverable_id: None,
        key_type: KEY_TYPE_PUBLIC_KEY.into(),
        key_algorithm: KEY_ALGORITHM_ECDSA.into(),
        key_curve: KEY_CURVE_P256.into(),
        key_value: vec![2u8; 138],
        rp_id: rp_id.to_string(),
        rp_name: Some(format!("{rp_id} name")),
        user_handle: user_handle.to_vec(),
        user_name: Some("alice".into()),
        counter,
    }
}

fn passkey(rp_id: &str, user_handle: &[u8]) -> NewItem {
    NewItem {
        name: rp_id.to_string(),
        kind: ItemKind::Passkey(make_key(rp_id, user_handle, 0)),
    }
}

fn bin_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "bin"))
        .collect()
}

#[tokio::test]
async fn test_store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let key = [0xabu8; 32];

    let id = {
        let store = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
        store.create(passkey("example.com", b"user1")).await.unwrap()
    };

    // Reload from disk
    let store = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
    assert_eq!(store.item_count(), 1);

    let loaded = store.get(&id).await.expect("item not found");
    assert_eq!(loaded.id, id);
    let fido2 = loaded.fido2_key().unwrap();
    assert_eq!(fido2.rp_id, "example.com");
    assert_eq!(fido2.user_handle, b"user1");
    assert_eq!(fido2.counter, 0);
    assert!(fido2.non_discoverable_id.is_none());
}

#[tokio::test]
async fn test_store_list_for_rp_filters_rp_and_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let key = [0xcd_u8; 32];

    let store = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
    let live = store.create(passkey("rp.example", b"user1")).await.unwrap();
    let trashed = store.create(passkey("rp.example", b"user2")).await.unwrap();
    store.create(passkey("other.example", b"user3")).await.unwrap();
    store
        .create(NewItem {
            name: "plain login".into(),
            kind: ItemKind::Login(Login { username: Some("bob".into()), fido2_key: None }),
        })
        .await
        .unwrap();

    let mut item = store.get(&trashed).await.unwrap();
    item.deleted_at = Some(1_700_000_000_000);
    store.update(&item).await.unwrap();

    let results = store.list_for_rp("rp.example").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, live);
    assert_eq!(store.list_all_decrypted().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_store_update_persists_and_replaces_file() {
    let dir = tempfile::tempdir().unwrap();
    let key = [0xef_u8; 32];

    let store = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
    let id = store.create(passkey("update.example", b"user")).await.unwrap();

    let mut item = store.get(&id).await.unwrap();
    if let ItemKind::Passkey(fido2) = &mut item.kind {
        fido2.counter = 41;
    }
    item.last_used_at = Some(1_234);
    store.update(&item).await.unwrap();

    // One file per item, no temp file left behind
    assert_eq!(bin_files(dir.path()).len(), 1);
    assert!(!dir.path().join(format!("{}.tmp", id.simple())).exists());

    let reloaded = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
    let item = reloaded.get(&id).await.unwrap();
    assert_eq!(item.fido2_key().unwrap().counter, 41);
    assert_eq!(item.last_used_at, Some(1_234));
}

#[tokio::test]
async fn test_store_update_unknown_item_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = VaultStore::load([0x01u8; 32], dir.path().to_path_buf()).unwrap();
    let ghost = VaultItem {
        id: ItemId::new_v4(),
        name: "ghost".into(),
        kind: ItemKind::Passkey(make_key("ghost.example", b"u", 0)),
        deleted_at: None,
        last_used_at: None,
    };
    assert!(store.update(&ghost).await.is_err());
    assert!(bin_files(dir.path()).is_empty(), "failed update must not write");
}

#[tokio::test]
async fn test_store_wrong_key_skips_file() {
    // Write with key A, reload with key B; the AES-GCM tag check fails so the file is skipped.
    let dir = tempfile::tempdir().unwrap();
    let key_a = [0x11u8; 32];
    let key_b = [0x22u8; 32];

    let store = VaultStore::load(key_a, dir.path().to_path_buf()).unwrap();
    store.create(passkey("wrong-key.example", b"user")).await.unwrap();
    drop(store);

    let store2 = VaultStore::load(key_b, dir.path().to_path_buf()).unwrap();
    assert_eq!(store2.item_count(), 0, "wrong-key file must be skipped");
}

#[test]
fn test_store_skips_truncated_bin_file() {
    // A .bin file shorter than the 12-byte nonce prefix should be skipped.
    let dir = tempfile::tempdir().unwrap();
    let key = [0xAAu8; 32];

    std::fs::write(dir.path().join("deadbeef.bin"), b"short").unwrap();

    let store = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
    assert_eq!(store.item_count(), 0, "truncated .bin file must be skipped");
}

#[test]
fn test_store_skips_non_bin_files() {
    let dir = tempfile::tempdir().unwrap();
    let key = [0xBBu8; 32];

    std::fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();
    std::fs::write(dir.path().join("backup.json"), b"{}").unwrap();

    let store = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
    assert_eq!(store.item_count(), 0, "non-.bin files must be ignored");
}

#[tokio::test]
async fn test_store_corrupt_bin_file_does_not_affect_valid_ones() {
    let dir = tempfile::tempdir().unwrap();
    let key = [0xCCu8; 32];

    let store = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
    let id = store.create(passkey("good.example", b"user")).await.unwrap();
    drop(store);

    std::fs::write(dir.path().join("garbage.bin"), b"not encrypted").unwrap();

    let store2 = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
    assert_eq!(
        store2.item_count(),
        1,
        "valid item must still load despite corrupt neighbour"
    );
    assert!(store2.get(&id).await.is_ok());
}

#[tokio::test]
async fn test_store_renamed_file_is_skipped() {
    // An item whose file name disagrees with its id is not trusted.
    let dir = tempfile::tempdir().unwrap();
    let key = [0xDDu8; 32];

    let store = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
    let id = store.create(passkey("moved.example", b"user")).await.unwrap();
    drop(store);

    let from = dir.path().join(format!("{}.bin", id.simple()));
    let to = dir.path().join(format!("{}.bin", ItemId::new_v4().simple()));
    std::fs::rename(from, to).unwrap();

    let store2 = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
    assert_eq!(store2.item_count(), 0);
}

#[tokio::test]
async fn test_store_load_removes_leftover_temp_file() {
    // A crash between write and rename leaves `{id}.tmp` behind.
    let dir = tempfile::tempdir().unwrap();
    let key = [0xEEu8; 32];

    let store = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
    let id = store.create(passkey("tmp.example", b"user")).await.unwrap();
    drop(store);

    let leftover = dir.path().join(format!("{}.tmp", ItemId::new_v4().simple()));
    std::fs::write(&leftover, b"partial").unwrap();

    let store2 = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
    assert_eq!(store2.item_count(), 1);
    assert!(store2.get(&id).await.is_ok());
    assert!(!leftover.exists(), "leftover temp file must be removed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_store_concurrent_creates_all_persist() {
    let dir = tempfile::tempdir().unwrap();
    let key = [0x5Au8; 32];
    let store = std::sync::Arc::new(VaultStore::load(key, dir.path().to_path_buf()).unwrap());

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .create(passkey(&format!("rp{i}.example"), b"user"))
                    .await
                    .unwrap()
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(store.item_count(), 16);
    assert_eq!(bin_files(dir.path()).len(), 16);
    let reloaded = VaultStore::load(key, dir.path().to_path_buf()).unwrap();
    assert_eq!(reloaded.item_count(), 16);
}
