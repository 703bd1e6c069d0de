use std::collections::HashMap;
use std::time::Duration;

use super::prompt::{self, TITLE};
use super::{CancelToken, NewCredentialPrompt, UiError, UserInterface, UserInterfaceSession};
use crate::store::ItemId;

const PROMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives the `pinentry` dialog program.
///
/// `pinentry` only offers yes/no dialogs, so picking walks the candidates one
/// dialog at a time and attaching a non-discoverable credential confirms a
/// target item chosen up front.
#[derive(Debug, Clone)]
pub struct PinentryInterface {
    binary: String,
    attach_target: Option<ItemId>,
    labels: HashMap<ItemId, String>,
}

impl PinentryInterface {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            attach_target: None,
            labels: HashMap::new(),
        }
    }

    /// Item offered when a non-discoverable credential is created.
    pub fn with_attach_target(mut self, item: ItemId) -> Self {
        self.attach_target = Some(item);
        self
    }

    /// Human-readable names shown instead of raw item ids.
    pub fn with_labels(mut self, labels: HashMap<ItemId, String>) -> Self {
        self.labels = labels;
        self
    }
}

#[async_trait::async_trait]
impl UserInterface for PinentryInterface {
    async fn new_session(
        &self,
        cancel: &CancelToken,
    ) -> Result<Box<dyn UserInterfaceSession>, UiError> {
        if cancel.is_cancelled() {
            return Err(UiError::Cancelled);
        }
        Ok(Box::new(PinentrySession { ui: self.clone() }))
    }
}

struct PinentrySession {
    ui: PinentryInterface,
}

impl PinentrySession {
    fn label(&self, id: &ItemId) -> String {
        self.ui.labels.get(id).cloned().unwrap_or_else(|| id.to_string())
    }

    async fn confirm(&self, description: String) -> Result<bool, UiError> {
        let bin = self.ui.binary.clone();
        let join = tokio::task::spawn_blocking(move || {
            let Some(mut dialog) = pinentry::ConfirmationDialog::with_binary(&bin) else {
                return Err(pinentry::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "pinentry binary not found",
                )));
            };
            dialog
                .with_title(TITLE)
                .with_ok("Confirm")
                .with_cancel("Deny")
                .confirm(&description)
        });

        match tokio::time::timeout(PROMPT_TIMEOUT, join).await {
            Err(_) => Err(UiError::Timeout),
            Ok(Err(e)) => Err(UiError::Backend(e.to_string())),
            Ok(Ok(Ok(confirmed))) => Ok(confirmed),
            Ok(Ok(Err(pinentry::Error::Cancelled))) => Ok(false),
            Ok(Ok(Err(pinentry::Error::Timeout))) => Err(UiError::Timeout),
            Ok(Ok(Err(e))) => Err(UiError::Backend(e.to_string())),
        }
    }

    async fn show(&self, message: String) -> Result<(), UiError> {
        let bin = self.ui.binary.clone();
        let join = tokio::task::spawn_blocking(move || {
            let Some(mut dialog) = pinentry::MessageDialog::with_binary(&bin) else {
                return Err(pinentry::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "pinentry binary not found",
                )));
            };
            dialog.with_title(TITLE).with_ok("OK").show_message(&message)
        });

        match tokio::time::timeout(PROMPT_TIMEOUT, join).await {
            Err(_) => Err(UiError::Timeout),
            Ok(Err(e)) => Err(UiError::Backend(e.to_string())),
            Ok(Ok(Ok(()))) | Ok(Ok(Err(pinentry::Error::Cancelled))) => Ok(()),
            Ok(Ok(Err(e))) => Err(UiError::Backend(e.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl UserInterfaceSession for PinentrySession {
    async fn confirm_new_credential(
        &mut self,
        prompt: &NewCredentialPrompt,
    ) -> Result<bool, UiError> {
        self.confirm(prompt::new_credential_text(prompt)).await
    }

    async fn confirm_new_non_discoverable_credential(
        &mut self,
        prompt: &NewCredentialPrompt,
    ) -> Result<Option<ItemId>, UiError> {
        let Some(target) = self.ui.attach_target else {
            tracing::debug!("No login item selected to hold the passkey");
            return Ok(None);
        };
        let text = prompt::attach_credential_text(prompt, &self.label(&target));
        Ok(self.confirm(text).await?.then_some(target))
    }

    async fn inform_excluded_credential(&mut self, existing: &[ItemId]) -> Result<(), UiError> {
        self.show(prompt::excluded_text(existing.len())).await
    }

    async fn pick_credential(&mut self, candidates: &[ItemId]) -> Result<Option<ItemId>, UiError> {
        for (index, id) in candidates.iter().enumerate() {
            let text = prompt::pick_text(&self.label(id), index, candidates.len());
            if self.confirm(text).await? {
                return Ok(Some(*id));
            }
        }
        Ok(None)
    }
}
