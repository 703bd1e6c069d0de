use crate::store::{CredentialId, Fido2Key, ItemId, ItemKind, Login, VaultItem};

/// Where a credential lives, resolved once when candidates are loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOwner {
    /// A dedicated passkey item; the item id is the credential id.
    Discoverable(VaultItem),
    /// A login item carrying a non-discoverable credential.
    EmbeddedIn {
        item: VaultItem,
        credential_id: CredentialId,
    },
}

impl CredentialOwner {
    /// `None` for items without a passkey.
    pub fn from_item(item: VaultItem) -> Option<Self> {
        match &item.kind {
            ItemKind::Passkey(_) => Some(Self::Discoverable(item)),
            ItemKind::Login(Login {
                fido2_key: Some(Fido2Key {
                    non_discoverable_id: Some(credential_id),
                    ..
                }),
                ..
            }) => {
                let credential_id = *credential_id;
                Some(Self::EmbeddedIn { item, credential_id })
            }
            ItemKind::Login(_) => None,
        }
    }

    pub fn credential_id(&self) -> CredentialId {
        match self {
            Self::Discoverable(item) => item.id,
            Self::EmbeddedIn { credential_id, .. } => *credential_id,
        }
    }

    pub fn is_discoverable(&self) -> bool {
        matches!(self, Self::Discoverable(_))
    }

    pub fn item(&self) -> &VaultItem {
        match self {
            Self::Discoverable(item) | Self::EmbeddedIn { item, .. } => item,
        }
    }

    pub fn item_mut(&mut self) -> &mut VaultItem {
        match self {
            Self::Discoverable(item) | Self::EmbeddedIn { item, .. } => item,
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.item().id
    }

    pub fn fido2_key(&self) -> Option<&Fido2Key> {
        self.item().fido2_key()
    }

    pub fn fido2_key_mut(&mut self) -> Option<&mut Fido2Key> {
        match &mut self.item_mut().kind {
            ItemKind::Passkey(key) => Some(key),
            ItemKind::Login(login) => login.fido2_key.as_mut(),
        }
    }

    pub fn into_item(self) -> VaultItem {
        match self {
            Self::Discoverable(item) | Self::EmbeddedIn { item, .. } => item,
        }
    }
}
