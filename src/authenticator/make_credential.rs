use std::collections::HashSet;

use super::{interact, unexpected, AuthenticatorError, CredentialOwner, Fido2Authenticator};
use super::types::MAX_USER_HANDLE_LEN;
use super::{MakeCredentialParams, MakeCredentialResult};
use crate::codec::attestation::build_none_attestation_object;
use crate::codec::authenticator_data::build_attested_auth_data;
use crate::codec::cose::COSE_ALG_ES256;
use crate::crypto::{CryptoProvider, KeyPair};
use crate::store::item::{KEY_ALGORITHM_ECDSA, KEY_CURVE_P256, KEY_TYPE_PUBLIC_KEY};
use crate::store::{CredentialId, CredentialStore, Fido2Key, ItemId, ItemKind, NewItem};
use crate::ui::{CancelToken, NewCredentialPrompt, UserInterface};

impl<S, U, C> Fido2Authenticator<S, U, C>
where
    S: CredentialStore,
    U: UserInterface,
    C: CryptoProvider,
{
    /// Create a credential for `params.rp` and return its attestation.
    pub async fn make_credential(
        &self,
        params: MakeCredentialParams,
        cancel: &CancelToken,
    ) -> Result<MakeCredentialResult, AuthenticatorError> {
        let mut session = self.open_session(cancel).await?;

        if !params
            .cred_types_and_pub_key_algs
            .iter()
            .any(|p| p.alg == COSE_ALG_ES256)
        {
            tracing::debug!(rp_id = %params.rp.id, "No supported algorithm requested");
            return Err(AuthenticatorError::NotSupported);
        }
        if params.require_user_verification == Some(true) {
            tracing::debug!(rp_id = %params.rp.id, "User verification requested");
            return Err(AuthenticatorError::Constraint);
        }
        if params.user.id.is_empty() || params.user.id.len() > MAX_USER_HANDLE_LEN {
            tracing::debug!(rp_id = %params.rp.id, len = params.user.id.len(), "Invalid user handle");
            return Err(AuthenticatorError::Unknown);
        }

        let excluded = self.find_excluded(&params).await?;
        if !excluded.is_empty() {
            tracing::info!(rp_id = %params.rp.id, count = excluded.len(), "Excluded credential present");
            interact(cancel, session.inform_excluded_credential(&excluded)).await?;
            return Err(AuthenticatorError::NotAllowed);
        }

        let prompt = NewCredentialPrompt {
            credential_name: credential_name(&params),
            user_name: display_name(&params).unwrap_or_default(),
        };

        let (credential_id, key_pair) = if params.require_resident_key == Some(true) {
            if !interact(cancel, session.confirm_new_credential(&prompt)).await? {
                tracing::debug!(rp_id = %params.rp.id, "New credential declined");
                return Err(AuthenticatorError::NotAllowed);
            }
            self.create_discoverable(&params).await?
        } else {
            let target = interact(cancel, session.confirm_new_non_discoverable_credential(&prompt))
                .await?
                .ok_or_else(|| {
                    tracing::debug!(rp_id = %params.rp.id, "No item chosen for new credential");
                    AuthenticatorError::NotAllowed
                })?;
            self.attach_non_discoverable(&params, target).await?
        };

        let rp_id_hash = self.crypto.digest(params.rp.id.as_bytes());
        let auth_data =
            build_attested_auth_data(&rp_id_hash, 0, credential_id.as_bytes(), &key_pair.public_key)
                .map_err(|e| unexpected("Encoding authenticator data", e))?;
        let attestation_object = build_none_attestation_object(&auth_data)
            .map_err(|e| unexpected("Encoding attestation object", e))?;

        tracing::info!(
            rp_id = %params.rp.id,
            credential_id = %credential_id,
            discoverable = params.require_resident_key == Some(true),
            "Credential created"
        );
        Ok(MakeCredentialResult {
            credential_id: credential_id.as_bytes().to_vec(),
            attestation_object,
            auth_data,
            public_key_algorithm: COSE_ALG_ES256,
        })
    }

    /// Items for this RP already holding one of the excluded credentials.
    async fn find_excluded(
        &self,
        params: &MakeCredentialParams,
    ) -> Result<Vec<ItemId>, AuthenticatorError> {
        let ids: HashSet<CredentialId> = params
            .exclude_credential_descriptor_list
            .iter()
            .filter_map(|d| d.credential_id())
            .collect();
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let items = self
            .store
            .list_for_rp(&params.rp.id)
            .await
            .map_err(|e| unexpected("Listing items", e))?;
        Ok(items
            .into_iter()
            .filter_map(CredentialOwner::from_item)
            .filter(|owner| ids.contains(&owner.credential_id()))
            .map(|owner| owner.item_id())
            .collect())
    }

    async fn create_discoverable(
        &self,
        params: &MakeCredentialParams,
    ) -> Result<(CredentialId, KeyPair), AuthenticatorError> {
        let key_pair = self
            .crypto
            .generate_key_pair()
            .map_err(|e| unexpected("Key generation", e))?;
        let item = NewItem {
            name: credential_name(params),
            kind: ItemKind::Passkey(new_fido2_key(params, &key_pair, None)),
        };
        let id = self
            .store
            .create(item)
            .await
            .map_err(|e| unexpected("Storing new passkey", e))?;
        Ok((id, key_pair))
    }

    async fn attach_non_discoverable(
        &self,
        params: &MakeCredentialParams,
        target: ItemId,
    ) -> Result<(CredentialId, KeyPair), AuthenticatorError> {
        let key_pair = self
            .crypto
            .generate_key_pair()
            .map_err(|e| unexpected("Key generation", e))?;
        let mut item = self
            .store
            .get(&target)
            .await
            .map_err(|e| unexpected("Loading target item", e))?;
        if item.is_deleted() {
            tracing::warn!(item_id = %target, "Target item is deleted");
            return Err(AuthenticatorError::Unknown);
        }
        let ItemKind::Login(login) = &mut item.kind else {
            tracing::warn!(item_id = %target, "Target item is not a login");
            return Err(AuthenticatorError::Unknown);
        };
        let credential_id = self.crypto.generate_credential_id();
        login.fido2_key = Some(new_fido2_key(params, &key_pair, Some(credential_id)));
        self.store
            .update(&item)
            .await
            .map_err(|e| unexpected("Updating target item", e))?;
        Ok((credential_id, key_pair))
    }
}

fn credential_name(params: &MakeCredentialParams) -> String {
    params.rp.name.clone().unwrap_or_else(|| params.rp.id.clone())
}

/// `displayName`, falling back to `name`.
fn display_name(params: &MakeCredentialParams) -> Option<String> {
    params
        .user
        .display_name
        .clone()
        .or_else(|| params.user.name.clone())
}

fn new_fido2_key(
    params: &MakeCredentialParams,
    key_pair: &KeyPair,
    non_discoverable_id: Option<CredentialId>,
) -> Fido2Key {
    Fido2Key {
        non_discoverable_id,
        key_type: KEY_TYPE_PUBLIC_KEY.to_string(),
        key_algorithm: KEY_ALGORITHM_ECDSA.to_string(),
        key_curve: KEY_CURVE_P256.to_string(),
        key_value: key_pair.private_pkcs8.clone(),
        rp_id: params.rp.id.clone(),
        rp_name: params.rp.name.clone(),
        user_handle: params.user.id.clone(),
        user_name: display_name(params),
        counter: 0,
    }
}
