use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zkattest_types::{ZkAttestError, ZkAttestResult, DEFAULT_ATTESTATION_TTL_SECS};

use super::constants::{
    DEFAULT_ATTESTER_ID, KEYS_DIR_NAME, MAX_ATTESTATION_TTL_SECS, MIN_ATTESTATION_TTL_SECS,
    REVOCATION_FILE_NAME, SIGNING_KEY_FILE_NAME,
};
use super::logging::{LogLevel, LoggingConfig};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AttesterConfig {
    pub data_dir: PathBuf,
    /// Circuit keys. Defaults to `<data_dir>/keys`.
    pub keys_dir: Option<PathBuf>,
    /// Run a local single-party setup when no keys exist. Development only.
    pub generate_missing_keys: bool,
    /// Numeric id under which the registry knows this attester.
    pub attester_id: u64,
    /// Hex secp256k1 secret. Defaults to `<data_dir>/attester.key`.
    pub signing_key_file: Option<PathBuf>,
    pub attestation_ttl_secs: u64,
    /// Revocation snapshot. Defaults to `<data_dir>/revocations.json`.
    pub revocation_file: Option<PathBuf>,
    pub logging: LoggingConfig,
}

impl Default for AttesterConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|h| h.join(".zkattest"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/zkattest"));

        Self {
            data_dir,
            keys_dir: None,
            generate_missing_keys: false,
            attester_id: DEFAULT_ATTESTER_ID,
            signing_key_file: None,
            attestation_ttl_secs: DEFAULT_ATTESTATION_TTL_SECS,
            revocation_file: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl AttesterConfig {
    pub fn load(path: impl AsRef<Path>) -> ZkAttestResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ZkAttestError::Config(format!("Failed to read config: {}", e)))?;

            toml::from_str(&contents)
                .map_err(|e| ZkAttestError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ZkAttestResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ZkAttestError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ZkAttestError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path.as_ref(), contents)
            .map_err(|e| ZkAttestError::Config(format!("Failed to write config: {}", e)))?;

        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.keys_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(KEYS_DIR_NAME))
    }

    pub fn signing_key_file(&self) -> PathBuf {
        self.signing_key_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(SIGNING_KEY_FILE_NAME))
    }

    pub fn revocation_file(&self) -> PathBuf {
        self.revocation_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(REVOCATION_FILE_NAME))
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = var("ZKATTEST_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(dir) = var("ZKATTEST_KEYS_DIR") {
            self.keys_dir = Some(PathBuf::from(dir));
        }

        if let Some(flag) = var("ZKATTEST_GENERATE_MISSING_KEYS") {
            self.generate_missing_keys = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Some(id) = var("ZKATTEST_ATTESTER_ID") {
            match id.parse() {
                Ok(id) => self.attester_id = id,
                Err(_) => warn!("Ignoring invalid ZKATTEST_ATTESTER_ID: {}", id),
            }
        }

        if let Some(file) = var("ZKATTEST_SIGNING_KEY_FILE") {
            self.signing_key_file = Some(PathBuf::from(file));
        }

        if let Some(ttl) = var("ZKATTEST_ATTESTATION_TTL") {
            match ttl.parse() {
                Ok(ttl) => self.attestation_ttl_secs = ttl,
                Err(_) => warn!("Ignoring invalid ZKATTEST_ATTESTATION_TTL: {}", ttl),
            }
        }

        if let Some(file) = var("ZKATTEST_REVOCATION_FILE") {
            self.revocation_file = Some(PathBuf::from(file));
        }

        if let Some(level) = var("ZKATTEST_LOG_LEVEL") {
            self.logging.level = LogLevel::parse(&level).unwrap_or(LogLevel::Info);
        }

        if let Some(file) = var("ZKATTEST_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
    }

    pub fn validate(&self) -> ZkAttestResult<()> {
        if self.attester_id == 0 {
            return Err(ZkAttestError::Config(
                "attester_id must be non-zero".into(),
            ));
        }

        if self.attestation_ttl_secs < MIN_ATTESTATION_TTL_SECS {
            return Err(ZkAttestError::Config(format!(
                "Attestation TTL must be at least {} seconds",
                MIN_ATTESTATION_TTL_SECS
            )));
        }

        if self.attestation_ttl_secs > MAX_ATTESTATION_TTL_SECS {
            return Err(ZkAttestError::Config(format!(
                "Attestation TTL must be at most {} seconds",
                MAX_ATTESTATION_TTL_SECS
            )));
        }

        if self.keys_dir() == self.data_dir {
            return Err(ZkAttestError::Config(
                "keys_dir must not be the data directory itself".into(),
            ));
        }

        if self.generate_missing_keys {
            warn!("generate_missing_keys is enabled. Locally generated circuit keys are not a trusted setup.");
        }

        Ok(())
    }

    /// Config rendering without local filesystem layout.
    pub fn redacted(&self) -> RedactedConfig {
        RedactedConfig {
            attester_id: self.attester_id,
            attestation_ttl_secs: self.attestation_ttl_secs,
            generate_missing_keys: self.generate_missing_keys,
            log_level: self.logging.level,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RedactedConfig {
    pub attester_id: u64,
    pub attestation_ttl_secs: u64,
    pub generate_missing_keys: bool,
    pub log_level: LogLevel,
}

impl std::fmt::Display for RedactedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Attester ID: {}", self.attester_id)?;
        writeln!(f, "Attestation TTL: {}s", self.attestation_ttl_secs)?;
        writeln!(f, "Generate missing keys: {}", self.generate_missing_keys)?;
        write!(f, "Log level: {}", self.log_level)
    }
}
