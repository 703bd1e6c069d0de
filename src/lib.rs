pub mod authenticator;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod diagnostics;
pub mod error;
pub mod store;
pub mod ui;

pub use authenticator::{AuthenticatorError, Fido2Authenticator};
pub use error::{Error, Result};

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use rand::RngCore;

use authenticator::{
    CredentialDescriptor, GetAssertionParams, MakeCredentialParams, PubKeyCredParam, RpEntity,
    UserEntity,
};
use config::{Command, Config};
use crypto::SoftwareCrypto;
use store::{CredentialStore, ItemKind, Login, NewItem, VaultStore};
use ui::{CancelHandle, CancelToken, PinentryInterface};

pub async fn run(cfg: Config) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;
    let level = match cfg.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .init();

    let data_dir = cfg.data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    // Single-instance lock on the vault directory
    let lock_path = data_dir.join(config::LOCK_FILE);
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)?;
    let mut lock = fd_lock::RwLock::new(lock_file);
    let _guard = lock.try_write().map_err(|_| {
        anyhow::anyhow!("vault is in use by another fidovault (lock: {})", lock_path.display())
    })?;

    match cfg.command.clone() {
        Command::Register {
            rp_id,
            rp_name,
            user_id,
            user_name,
            resident,
            item,
            client_data_hash,
        } => {
            let store = open_vault(&cfg, &data_dir)?;
            let mut ui = PinentryInterface::new(&cfg.pinentry)
                .with_labels(item_labels(store.as_ref()).await?);
            if let Some(item) = item {
                ui = ui.with_attach_target(item);
            }
            let params = MakeCredentialParams {
                client_data_hash: client_data_hash_arg(client_data_hash.as_deref())?,
                rp: RpEntity { id: rp_id, name: rp_name },
                user: UserEntity {
                    id: hex::decode(&user_id)
                        .map_err(|e| anyhow::anyhow!("invalid --user-id: {e}"))?,
                    name: user_name.clone(),
                    display_name: user_name,
                },
                cred_types_and_pub_key_algs: vec![PubKeyCredParam::es256()],
                exclude_credential_descriptor_list: vec![],
                require_resident_key: Some(resident),
                require_user_verification: Some(false),
            };
            let authenticator = Fido2Authenticator::new(store, ui, SoftwareCrypto::new());
            let cancel = cancel_on_ctrl_c();
            let result = authenticator
                .make_credential(params, &cancel)
                .await
                .map_err(ceremony_error)?;
            let response = codec::response::encode_make_credential_response(&result)?;
            let mut out = std::io::stdout().lock();
            writeln!(out, "credential_id: {}", hex::encode(&result.credential_id))?;
            writeln!(out, "response: {}", hex::encode(response))?;
        }
        Command::Login {
            rp_id,
            allow,
            client_data_hash,
        } => {
            let store = open_vault(&cfg, &data_dir)?;
            let ui = PinentryInterface::new(&cfg.pinentry)
                .with_labels(item_labels(store.as_ref()).await?);
            let allow_credential_descriptor_list = allow
                .iter()
                .map(|id| {
                    hex::decode(id)
                        .map(CredentialDescriptor::public_key)
                        .map_err(|e| anyhow::anyhow!("invalid --allow {id}: {e}"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            let params = GetAssertionParams {
                rp_id,
                client_data_hash: client_data_hash_arg(client_data_hash.as_deref())?,
                allow_credential_descriptor_list,
                require_user_verification: Some(false),
            };
            let authenticator = Fido2Authenticator::new(store, ui, SoftwareCrypto::new());
            let cancel = cancel_on_ctrl_c();
            let result = authenticator
                .get_assertion(params, &cancel)
                .await
                .map_err(ceremony_error)?;
            let response = codec::response::encode_get_assertion_response(&result)?;
            let mut out = std::io::stdout().lock();
            writeln!(out, "credential_id: {}", hex::encode(&result.selected_credential.id))?;
            writeln!(out, "response: {}", hex::encode(response))?;
        }
        Command::AddLogin { name, username } => {
            let store = open_vault(&cfg, &data_dir)?;
            let id = store
                .create(NewItem {
                    name,
                    kind: ItemKind::Login(Login { username, fido2_key: None }),
                })
                .await?;
            println!("{id}");
        }
        Command::List => {
            let store = open_vault(&cfg, &data_dir)?;
            let mut items = store.list_all_decrypted().await?;
            items.retain(|item| !item.is_deleted());
            items.sort_by(|a, b| a.name.cmp(&b.name));
            let mut out = std::io::stdout().lock();
            for item in items {
                let kind = match &item.kind {
                    ItemKind::Passkey(_) => "passkey",
                    ItemKind::Login(_) => "login",
                };
                match item.fido2_key() {
                    Some(key) => writeln!(
                        out,
                        "{}  {kind:<7}  {}  rp={} counter={}",
                        item.id, item.name, key.rp_id, key.counter
                    )?,
                    None => writeln!(out, "{}  {kind:<7}  {}", item.id, item.name)?,
                }
            }
        }
        Command::Wipe => wipe(&data_dir)?,
    }
    Ok(())
}

/// Run preflight checks, then decrypt the vault into memory.
fn open_vault(cfg: &Config, data_dir: &Path) -> anyhow::Result<Arc<VaultStore>> {
    diagnostics::check(cfg, data_dir)?;

    let aes_key = load_or_create_vault_key(&data_dir.join(config::VAULT_KEY_FILE))?;
    let items_dir = data_dir.join(config::ITEMS_DIR);
    std::fs::create_dir_all(&items_dir)?;
    let store = VaultStore::load(aes_key, items_dir)
        .map_err(|e| anyhow::anyhow!("Failed to load vault: {e}"))?;
    tracing::info!(count = store.item_count(), "Vault loaded");
    Ok(Arc::new(store))
}

/// Delete every vault item file and the vault key. Anything other than a
/// regular file under the items directory is left in place.
pub fn wipe(data_dir: &Path) -> anyhow::Result<()> {
    let items_dir = data_dir.join(config::ITEMS_DIR);
    let mut count = 0usize;
    if items_dir.exists() {
        for entry in std::fs::read_dir(&items_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                tracing::warn!(path = %entry.path().display(), "Not a file, leaving it in place");
                continue;
            }
            std::fs::remove_file(entry.path())?;
            count += 1;
        }
    }
    println!("Deleted {count} item(s) from {}", items_dir.display());

    let key_path = data_dir.join(config::VAULT_KEY_FILE);
    if key_path.exists() {
        std::fs::remove_file(&key_path)?;
        println!("Vault key {} deleted (a new one is created on next use)", key_path.display());
    }
    Ok(())
}

/// Read the 32-byte vault key, creating it with mode 0600 on first use.
pub fn load_or_create_vault_key(path: &Path) -> Result<[u8; 32]> {
    if path.exists() {
        let bytes = std::fs::read(path)?;
        return <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
            Error::Internal(format!(
                "{} is {} bytes, expected 32",
                path.display(),
                bytes.len()
            ))
        });
    }

    let mut key = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut key);
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(&key)?;
    file.sync_all()?;
    tracing::info!(path = %path.display(), "Vault key created");
    Ok(key)
}

async fn item_labels(store: &VaultStore) -> anyhow::Result<HashMap<store::ItemId, String>> {
    Ok(store
        .list_all_decrypted()
        .await?
        .into_iter()
        .map(|item| {
            let label = match &item.kind {
                ItemKind::Login(Login { username: Some(user), .. }) => {
                    format!("{} ({user})", item.name)
                }
                _ => item.name.clone(),
            };
            (item.id, label)
        })
        .collect())
}

fn client_data_hash_arg(arg: Option<&str>) -> anyhow::Result<Vec<u8>> {
    match arg {
        Some(hex_hash) => {
            let hash = hex::decode(hex_hash)
                .map_err(|e| anyhow::anyhow!("invalid --client-data-hash: {e}"))?;
            if hash.len() != 32 {
                anyhow::bail!("--client-data-hash must be 32 bytes, got {}", hash.len());
            }
            Ok(hash)
        }
        None => {
            let mut hash = vec![0u8; 32];
            rand::rngs::OsRng.fill_bytes(&mut hash);
            Ok(hash)
        }
    }
}

/// Token cancelled when the user hits Ctrl-C.
fn cancel_on_ctrl_c() -> CancelToken {
    let (handle, token) = CancelHandle::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling ceremony");
            handle.cancel();
        }
    });
    token
}

fn ceremony_error(e: AuthenticatorError) -> anyhow::Error {
    anyhow::anyhow!("{} (status {:#04x}): {e}", e.name(), e.status_byte())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wipe_removes_items_and_key_but_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let items_dir = dir.path().join(config::ITEMS_DIR);
        let nested = items_dir.join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(items_dir.join("a.bin"), b"a").unwrap();
        std::fs::write(items_dir.join("b.tmp"), b"b").unwrap();
        let key_path = dir.path().join(config::VAULT_KEY_FILE);
        load_or_create_vault_key(&key_path).unwrap();

        wipe(dir.path()).unwrap();

        assert!(!key_path.exists());
        let left: Vec<_> = std::fs::read_dir(&items_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(left, vec![nested]);
    }

    #[test]
    fn test_wipe_without_vault_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        wipe(dir.path()).unwrap();
    }

    #[test]
    fn test_vault_key_is_stable_and_length_checked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(config::VAULT_KEY_FILE);
        let first = load_or_create_vault_key(&path).unwrap();
        assert_eq!(load_or_create_vault_key(&path).unwrap(), first);

        std::fs::write(&path, [0u8; 31]).unwrap();
        assert!(matches!(load_or_create_vault_key(&path), Err(Error::Internal(_))));
    }
}
