pub mod cancel;
pub mod dialog;
pub(crate) mod prompt;

pub use cancel::{CancelHandle, CancelToken};
pub use dialog::PinentryInterface;

use crate::store::ItemId;

#[derive(Debug, thiserror::Error)]
pub enum UiError {
    #[error("cancelled")]
    Cancelled,
    #[error("timed out")]
    Timeout,
    #[error("interface: {0}")]
    Backend(String),
}

/// What the user is asked to approve when a credential is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredentialPrompt {
    pub credential_name: String,
    pub user_name: String,
}

/// Opens one interaction session per ceremony.
#[async_trait::async_trait]
pub trait UserInterface: Send + Sync {
    async fn new_session(
        &self,
        cancel: &CancelToken,
    ) -> Result<Box<dyn UserInterfaceSession>, UiError>;
}

/// Prompts within a single ceremony. The authenticator races every call
/// against the session's [`CancelToken`].
#[async_trait::async_trait]
pub trait UserInterfaceSession: Send {
    /// Ask to store a new discoverable credential. `false` means declined.
    async fn confirm_new_credential(&mut self, prompt: &NewCredentialPrompt)
        -> Result<bool, UiError>;

    /// Ask which existing item should receive a non-discoverable credential.
    async fn confirm_new_non_discoverable_credential(
        &mut self,
        prompt: &NewCredentialPrompt,
    ) -> Result<Option<ItemId>, UiError>;

    /// Tell the user an excluded credential already exists.
    async fn inform_excluded_credential(&mut self, existing: &[ItemId]) -> Result<(), UiError>;

    /// Let the user choose one of `candidates`.
    async fn pick_credential(&mut self, candidates: &[ItemId]) -> Result<Option<ItemId>, UiError>;
}

#[async_trait::async_trait]
impl<T: UserInterface + ?Sized> UserInterface for std::sync::Arc<T> {
    async fn new_session(
        &self,
        cancel: &CancelToken,
    ) -> Result<Box<dyn UserInterfaceSession>, UiError> {
        (**self).new_session(cancel).await
    }
}
