mod allowlist;
mod commands;
mod config_cmd;
mod init;
mod keys;
mod prove;
mod revoke;
mod utils;

pub use allowlist::handle_allowlist;
pub use commands::{Cli, Commands};
pub use config_cmd::handle_config;
pub use init::init_attester;
pub use keys::{show_pubkey, verify_signature};
pub use prove::{handle_attest, handle_prove};
pub use revoke::{handle_revoke, show_status};
pub use utils::init_logging;
