#![warn(clippy::all)]

pub mod attester;
pub mod config;
pub mod keystore;
pub mod revocation;
pub mod services;

pub use attester::{Attester, AttesterStatus};
pub use config::{AttesterConfig, LogLevel, LoggingConfig, CONFIG_FILE_NAME};
pub use keystore::{create_signing_key, load_signer, load_signing_key, KeyProvider};
pub use revocation::RevocationRegistry;
pub use services::{AttestationService, ProofService, ServiceStats};
