use std::collections::HashSet;

use super::{interact, now_millis, unexpected, AuthenticatorError, CredentialOwner};
use super::{Fido2Authenticator, GetAssertionParams, GetAssertionResult, SelectedCredential};
use crate::codec::authenticator_data::build_assertion_auth_data;
use crate::codec::der::p1363_to_der;
use crate::crypto::CryptoProvider;
use crate::store::{CredentialId, CredentialStore, ItemId};
use crate::ui::{CancelToken, UserInterface};

impl<S, U, C> Fido2Authenticator<S, U, C>
where
    S: CredentialStore,
    U: UserInterface,
    C: CryptoProvider,
{
    /// Sign `params.client_data_hash` with a credential the user picks.
    ///
    /// The counter is persisted before anything is signed; if that write
    /// fails no signature leaves the authenticator.
    pub async fn get_assertion(
        &self,
        params: GetAssertionParams,
        cancel: &CancelToken,
    ) -> Result<GetAssertionResult, AuthenticatorError> {
        let mut session = self.open_session(cancel).await?;

        if params.require_user_verification == Some(true) {
            tracing::debug!(rp_id = %params.rp_id, "User verification requested");
            return Err(AuthenticatorError::Constraint);
        }

        let candidates = self.find_candidates(&params).await?;
        if candidates.is_empty() {
            tracing::debug!(rp_id = %params.rp_id, "No matching credentials");
            return Err(AuthenticatorError::NotAllowed);
        }

        let ids: Vec<ItemId> = candidates.iter().map(CredentialOwner::item_id).collect();
        let picked = interact(cancel, session.pick_credential(&ids)).await?;
        let Some(mut selected) =
            picked.and_then(|id| candidates.into_iter().find(|c| c.item_id() == id))
        else {
            tracing::debug!(rp_id = %params.rp_id, "No credential picked");
            return Err(AuthenticatorError::NotAllowed);
        };

        let key = selected.fido2_key_mut().ok_or_else(|| {
            tracing::warn!("Selected item lost its passkey");
            AuthenticatorError::Unknown
        })?;
        key.counter = key.counter.checked_add(1).ok_or_else(|| {
            tracing::warn!(rp_id = %key.rp_id, "Signature counter exhausted");
            AuthenticatorError::Unknown
        })?;
        let counter = key.counter;
        selected.item_mut().last_used_at = Some(now_millis());
        self.store
            .update(selected.item())
            .await
            .map_err(|e| unexpected("Persisting signature counter", e))?;

        let key = selected.fido2_key().ok_or(AuthenticatorError::Unknown)?;
        let rp_id_hash = self.crypto.digest(key.rp_id.as_bytes());
        let authenticator_data = build_assertion_auth_data(&rp_id_hash, counter)
            .map_err(|e| unexpected("Encoding authenticator data", e))?;

        let mut signed = Vec::with_capacity(authenticator_data.len() + params.client_data_hash.len());
        signed.extend_from_slice(&authenticator_data);
        signed.extend_from_slice(&params.client_data_hash);
        let raw = self
            .crypto
            .sign(&key.key_value, &signed)
            .map_err(|e| unexpected("Signing assertion", e))?;
        let signature = p1363_to_der(&raw).map_err(|e| unexpected("Encoding signature", e))?;

        let credential_id = selected.credential_id();
        tracing::info!(
            rp_id = %params.rp_id,
            credential_id = %credential_id,
            counter,
            "Assertion signed"
        );
        Ok(GetAssertionResult {
            authenticator_data,
            selected_credential: SelectedCredential {
                id: credential_id.as_bytes().to_vec(),
                user_handle: key.user_handle.clone(),
                user_name: key.user_name.clone(),
                discoverable: selected.is_discoverable(),
            },
            signature,
        })
    }

    /// Allow-listed credentials when an allow list is given, otherwise every
    /// discoverable credential for the RP.
    async fn find_candidates(
        &self,
        params: &GetAssertionParams,
    ) -> Result<Vec<CredentialOwner>, AuthenticatorError> {
        let allowed: HashSet<CredentialId> = params
            .allow_credential_descriptor_list
            .iter()
            .filter_map(|d| d.credential_id())
            .collect();
        let by_allow_list = !params.allow_credential_descriptor_list.is_empty();
        if by_allow_list && allowed.is_empty() {
            return Ok(vec![]);
        }

        let items = self
            .store
            .list_for_rp(&params.rp_id)
            .await
            .map_err(|e| unexpected("Listing items", e))?;
        Ok(items
            .into_iter()
            .filter_map(CredentialOwner::from_item)
            .filter(|owner| {
                if by_allow_list {
                    allowed.contains(&owner.credential_id())
                } else {
                    owner.is_discoverable()
                }
            })
            .collect())
    }
}
