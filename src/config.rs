use std::path::PathBuf;

pub const AAGUID: [u8; 16] = [
    0x6f, 0x1b, 0x2a, 0x94, 0xd3, 0x5e, 0x47, 0x0c, 0x8a, 0x61, 0x3c, 0xe2, 0x00, 0x00, 0x00, 0x02,
];
pub const APP_NAME: &str = "fidovault";
pub const VAULT_KEY_FILE: &str = "vault.key";
pub const ITEMS_DIR: &str = "items";
pub const LOCK_FILE: &str = "fidovault.lock";

#[derive(clap::Parser, Debug, Clone)]
#[command(name = "fidovault", version, about = "FIDO2 authenticator backed by an encrypted vault")]
pub struct Config {
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Vault location. Defaults to the XDG data dir.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[arg(long, default_value = "pinentry", global = true)]
    pub pinentry: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a credential and print the CTAP2 makeCredential response as hex.
    Register {
        rp_id: String,
        #[arg(long)]
        rp_name: Option<String>,
        /// User handle, hex encoded.
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        user_name: Option<String>,
        /// Store as a discoverable passkey item.
        #[arg(long, conflicts_with = "item")]
        resident: bool,
        /// Attach a non-discoverable credential to this login item.
        #[arg(long)]
        item: Option<uuid::Uuid>,
        /// 32-byte client data hash, hex encoded. Random when omitted.
        #[arg(long)]
        client_data_hash: Option<String>,
    },
    /// Produce an assertion and print the CTAP2 getAssertion response as hex.
    Login {
        rp_id: String,
        /// Allowed credential id, hex encoded. Repeatable.
        #[arg(long = "allow")]
        allow: Vec<String>,
        #[arg(long)]
        client_data_hash: Option<String>,
    },
    /// Add a password login item that can later receive a passkey.
    AddLogin {
        name: String,
        #[arg(long)]
        username: Option<String>,
    },
    /// List vault items.
    List,
    /// Delete every vault item and the vault key, then exit.
    Wipe,
}

impl Config {
    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        Ok(directories::ProjectDirs::from("", "", APP_NAME)
            .ok_or_else(|| anyhow::anyhow!("cannot determine XDG data dir"))?
            .data_dir()
            .to_path_buf())
    }
}
