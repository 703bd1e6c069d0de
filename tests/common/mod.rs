#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use fidovault::authenticator::{
    Fido2Authenticator, MakeCredentialParams, PubKeyCredParam, RpEntity, UserEntity,
};
use fidovault::crypto::SoftwareCrypto;
use fidovault::store::{
    CredentialStore, ItemId, ItemKind, Login, MemoryStore, NewItem, StoreError, VaultItem,
};
use fidovault::ui::{
    CancelToken, NewCredentialPrompt, UiError, UserInterface, UserInterfaceSession,
};

pub const RP_ID: &str = "example.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCall {
    NewSession,
    ConfirmNew(NewCredentialPrompt),
    ConfirmNonDiscoverable(NewCredentialPrompt),
    InformExcluded(Vec<ItemId>),
    Pick(Vec<ItemId>),
}

#[derive(Debug, Clone, Copy, Default)]
pub enum Pick {
    #[default]
    First,
    Nothing,
    Item(ItemId),
}

/// Canned answers for every prompt.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub confirm_new: bool,
    pub attach_to: Option<ItemId>,
    pub pick: Pick,
    /// Prompts never answer; only cancellation ends them.
    pub hang: bool,
    pub fail_with_backend_error: bool,
}

impl Script {
    pub fn approve() -> Self {
        Self { confirm_new: true, ..Self::default() }
    }
}

#[derive(Debug, Default)]
pub struct ScriptedUi {
    script: Script,
    calls: Arc<Mutex<Vec<UiCall>>>,
}

impl ScriptedUi {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self { script, calls: Arc::default() })
    }

    pub fn calls(&self) -> Vec<UiCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl UserInterface for ScriptedUi {
    async fn new_session(
        &self,
        _cancel: &CancelToken,
    ) -> Result<Box<dyn UserInterfaceSession>, UiError> {
        self.calls.lock().unwrap().push(UiCall::NewSession);
        Ok(Box::new(ScriptedSession {
            script: self.script.clone(),
            calls: self.calls.clone(),
        }))
    }
}

struct ScriptedSession {
    script: Script,
    calls: Arc<Mutex<Vec<UiCall>>>,
}

impl ScriptedSession {
    async fn answer<T>(&self, call: UiCall, value: T) -> Result<T, UiError> {
        self.calls.lock().unwrap().push(call);
        if self.script.hang {
            std::future::pending::<()>().await;
        }
        if self.script.fail_with_backend_error {
            return Err(UiError::Backend("scripted failure".into()));
        }
        Ok(value)
    }
}

#[async_trait::async_trait]
impl UserInterfaceSession for ScriptedSession {
    async fn confirm_new_credential(
        &mut self,
        prompt: &NewCredentialPrompt,
    ) -> Result<bool, UiError> {
        self.answer(UiCall::ConfirmNew(prompt.clone()), self.script.confirm_new)
            .await
    }

    async fn confirm_new_non_discoverable_credential(
        &mut self,
        prompt: &NewCredentialPrompt,
    ) -> Result<Option<ItemId>, UiError> {
        self.answer(UiCall::ConfirmNonDiscoverable(prompt.clone()), self.script.attach_to)
            .await
    }

    async fn inform_excluded_credential(&mut self, existing: &[ItemId]) -> Result<(), UiError> {
        self.answer(UiCall::InformExcluded(existing.to_vec()), ()).await
    }

    async fn pick_credential(&mut self, candidates: &[ItemId]) -> Result<Option<ItemId>, UiError> {
        let choice = match self.script.pick {
            Pick::First => candidates.first().copied(),
            Pick::Nothing => None,
            Pick::Item(id) => Some(id),
        };
        self.answer(UiCall::Pick(candidates.to_vec()), choice).await
    }
}

/// Memory store that counts writes and can be told to reject updates.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
    fail_updates: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    pub fn insert(&self, item: VaultItem) {
        self.inner.insert(item).unwrap();
    }
}

#[async_trait::async_trait]
impl CredentialStore for RecordingStore {
    async fn create(&self, item: NewItem) -> Result<ItemId, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create(item).await
    }

    async fn get(&self, id: &ItemId) -> Result<VaultItem, StoreError> {
        self.inner.get(id).await
    }

    async fn update(&self, item: &VaultItem) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(item).await
    }

    async fn list_all_decrypted(&self) -> Result<Vec<VaultItem>, StoreError> {
        self.inner.list_all_decrypted().await
    }
}

pub type TestAuthenticator = Fido2Authenticator<Arc<RecordingStore>, Arc<ScriptedUi>, SoftwareCrypto>;

pub fn authenticator(store: &Arc<RecordingStore>, ui: &Arc<ScriptedUi>) -> TestAuthenticator {
    Fido2Authenticator::new(store.clone(), ui.clone(), SoftwareCrypto::new())
}

pub fn make_credential_params(resident: bool) -> MakeCredentialParams {
    MakeCredentialParams {
        client_data_hash: vec![0x11; 32],
        rp: RpEntity { id: RP_ID.into(), name: Some("Example".into()) },
        user: UserEntity {
            id: b"user-handle-1".to_vec(),
            name: Some("alice@example.com".into()),
            display_name: Some("Alice".into()),
        },
        cred_types_and_pub_key_algs: vec![PubKeyCredParam::es256()],
        exclude_credential_descriptor_list: vec![],
        require_resident_key: Some(resident),
        require_user_verification: Some(false),
    }
}

/// A login item without a passkey, ready to receive a non-discoverable one.
pub async fn add_login(store: &Arc<RecordingStore>, name: &str) -> ItemId {
    store
        .create(NewItem {
            name: name.into(),
            kind: ItemKind::Login(Login { username: Some("alice".into()), fido2_key: None }),
        })
        .await
        .unwrap()
}
