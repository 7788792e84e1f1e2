pub const DEFAULT_ATTESTER_ID: u64 = 1;
pub const MIN_ATTESTATION_TTL_SECS: u64 = 60;
pub const MAX_ATTESTATION_TTL_SECS: u64 = 366 * 86_400;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEYS_DIR_NAME: &str = "keys";
pub const SIGNING_KEY_FILE_NAME: &str = "attester.key";
pub const REVOCATION_FILE_NAME: &str = "revocations.json";
