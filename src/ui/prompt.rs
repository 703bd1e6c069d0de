use super::NewCredentialPrompt;

pub(crate) const TITLE: &str = "fidovault";

pub(crate) fn new_credential_text(prompt: &NewCredentialPrompt) -> String {
    format!(
        "Save a new passkey?\n\nSite: {}\nAccount: {}\n\nPress Confirm to create, or Deny.",
        prompt.credential_name, prompt.user_name
    )
}

pub(crate) fn attach_credential_text(prompt: &NewCredentialPrompt, item_label: &str) -> String {
    format!(
        "Add a passkey to \"{item_label}\"?\n\nSite: {}\nAccount: {}\n\nPress Confirm to add, or Deny.",
        prompt.credential_name, prompt.user_name
    )
}

pub(crate) fn excluded_text(count: usize) -> String {
    match count {
        1 => "A passkey for this account already exists in the vault.".to_string(),
        n => format!("{n} passkeys for this account already exist in the vault."),
    }
}

pub(crate) fn pick_text(item_label: &str, index: usize, total: usize) -> String {
    format!(
        "Sign in with passkey ({}/{total})\n\nItem: {item_label}\n\nPress Confirm to use it, or Skip.",
        index + 1
    )
}
