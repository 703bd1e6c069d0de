//! WebAuthn authenticator ceremonies over a vault-backed credential store.
//!
//! [`Fido2Authenticator`] owns its three collaborators: the store that holds
//! encrypted items, the user interface that confirms each ceremony, and the
//! crypto provider. Every failure leaving this module is an
//! [`AuthenticatorError`]; collaborator errors are logged and remapped here.

pub mod credential;
mod get_assertion;
mod make_credential;
pub mod types;

pub use credential::CredentialOwner;
pub use types::{
    AuthenticatorError, CredentialDescriptor, GetAssertionParams, GetAssertionResult,
    MakeCredentialParams, MakeCredentialResult, PubKeyCredParam, RpEntity, SelectedCredential,
    UserEntity,
};

use std::future::Future;

use crate::crypto::{CryptoProvider, SoftwareCrypto};
use crate::store::CredentialStore;
use crate::ui::{CancelToken, UiError, UserInterface, UserInterfaceSession};

pub struct Fido2Authenticator<S, U, C = SoftwareCrypto> {
    store: S,
    ui: U,
    crypto: C,
}

impl<S, U, C> Fido2Authenticator<S, U, C>
where
    S: CredentialStore,
    U: UserInterface,
    C: CryptoProvider,
{
    pub fn new(store: S, ui: U, crypto: C) -> Self {
        Self { store, ui, crypto }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn open_session(
        &self,
        cancel: &CancelToken,
    ) -> Result<Box<dyn UserInterfaceSession>, AuthenticatorError> {
        interact(cancel, self.ui.new_session(cancel)).await
    }
}

/// Race one user-interaction step against the ceremony's cancel token.
async fn interact<T, F>(cancel: &CancelToken, step: F) -> Result<T, AuthenticatorError>
where
    F: Future<Output = Result<T, UiError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!("Ceremony cancelled during user interaction");
            Err(AuthenticatorError::NotAllowed)
        }
        res = step => res.map_err(ui_failure),
    }
}

fn ui_failure(e: UiError) -> AuthenticatorError {
    match e {
        UiError::Cancelled | UiError::Timeout => {
            tracing::debug!(error = %e, "User interaction ended without consent");
            AuthenticatorError::NotAllowed
        }
        UiError::Backend(_) => {
            tracing::warn!(error = %e, "User interface failed");
            AuthenticatorError::Unknown
        }
    }
}

/// Log an unexpected collaborator failure and collapse it to `Unknown`.
fn unexpected(context: &'static str, e: impl std::fmt::Display) -> AuthenticatorError {
    tracing::warn!(error = %e, "{context} failed");
    AuthenticatorError::Unknown
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::CancelHandle;

    #[test]
    fn test_ui_failure_mapping() {
        assert_eq!(ui_failure(UiError::Cancelled), AuthenticatorError::NotAllowed);
        assert_eq!(ui_failure(UiError::Timeout), AuthenticatorError::NotAllowed);
        assert_eq!(
            ui_failure(UiError::Backend("pinentry exited".into())),
            AuthenticatorError::Unknown
        );
    }

    #[tokio::test]
    async fn test_interact_prefers_cancellation() {
        let (handle, token) = CancelHandle::new();
        handle.cancel();
        let res = interact(&token, async { Ok::<_, UiError>(true) }).await;
        assert_eq!(res, Err(AuthenticatorError::NotAllowed));
    }
}
