//! Lazily loaded circuit keys and the attester's signing key.

use crate::config::AttesterConfig;
use rand::rngs::OsRng;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use zkattest_crypto::{generate_attester_key, AttestationSigner, CircuitKeys, Verifier};
use zkattest_types::{AttesterPrivateKey, ZkAttestError, ZkAttestResult};

const SIGNING_KEY_PERMS: u32 = 0o600;

/// Single-flight provider of the Groth16 key pair.
///
/// The first caller loads (or, when allowed, generates) the keys on the
/// blocking pool; concurrent callers wait for that one attempt. A failed
/// attempt leaves the cell empty so a later call can retry.
pub struct KeyProvider {
    keys_dir: PathBuf,
    generate_missing: bool,
    keys: OnceCell<Arc<CircuitKeys>>,
    verifier: OnceCell<Arc<Verifier>>,
    load_attempts: AtomicU64,
}

impl KeyProvider {
    pub fn new(keys_dir: impl Into<PathBuf>, generate_missing: bool) -> Self {
        Self {
            keys_dir: keys_dir.into(),
            generate_missing,
            keys: OnceCell::new(),
            verifier: OnceCell::new(),
            load_attempts: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &AttesterConfig) -> Self {
        Self::new(config.keys_dir(), config.generate_missing_keys)
    }

    /// Provider that already holds `keys`.
    pub fn with_keys(keys: Arc<CircuitKeys>) -> Self {
        Self {
            keys_dir: PathBuf::new(),
            generate_missing: false,
            keys: OnceCell::new_with(Some(keys)),
            verifier: OnceCell::new(),
            load_attempts: AtomicU64::new(0),
        }
    }

    pub async fn keys(&self) -> ZkAttestResult<Arc<CircuitKeys>> {
        let keys = self
            .keys
            .get_or_try_init(|| async {
                self.load_attempts.fetch_add(1, Ordering::SeqCst);
                let dir = self.keys_dir.clone();
                let generate = self.generate_missing;

                let keys = tokio::task::spawn_blocking(move || load_or_generate(&dir, generate))
                    .await
                    .map_err(|e| ZkAttestError::Internal(format!("key loading task failed: {}", e)))??;
                Ok::<_, ZkAttestError>(Arc::new(keys))
            })
            .await?;
        Ok(keys.clone())
    }

    /// Verifier over the loaded key's prepared VK, built once and shared.
    pub async fn verifier(&self) -> ZkAttestResult<Arc<Verifier>> {
        let verifier = self
            .verifier
            .get_or_try_init(|| async {
                let keys = self.keys().await?;
                Ok::<_, ZkAttestError>(Arc::new(Verifier::from_prepared(
                    keys.prepared_verifying_key().clone(),
                )))
            })
            .await?;
        Ok(verifier.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.keys.initialized()
    }

    pub fn load_attempts(&self) -> u64 {
        self.load_attempts.load(Ordering::SeqCst)
    }

    pub fn keys_dir(&self) -> &Path {
        &self.keys_dir
    }
}

fn load_or_generate(dir: &Path, generate_missing: bool) -> ZkAttestResult<CircuitKeys> {
    if CircuitKeys::exists(dir) {
        let keys = CircuitKeys::load(dir)?;
        info!("Loaded circuit keys from {}", dir.display());
        return Ok(keys);
    }

    if !generate_missing {
        return Err(ZkAttestError::KeyMissing(format!(
            "no circuit keys in {}; run zk-keygen generate",
            dir.display()
        )));
    }

    warn!(
        "No circuit keys in {}, running a local setup. These keys are not from a trusted ceremony.",
        dir.display()
    );
    let keys = CircuitKeys::generate(&mut OsRng)?;
    let metadata = keys.save(dir)?;
    info!("Generated circuit keys, vk hash {}", metadata.vk_hash);
    Ok(keys)
}

/// Read the hex signing key at `path`.
pub fn load_signing_key(path: &Path) -> ZkAttestResult<AttesterPrivateKey> {
    if !path.is_file() {
        return Err(ZkAttestError::KeyMissing(format!(
            "no attester signing key at {}",
            path.display()
        )));
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| ZkAttestError::Storage(format!("Failed to read signing key: {}", e)))?;
    let key = AttesterPrivateKey::from_hex(contents.trim())?;
    debug!("Loaded attester signing key from {}", path.display());
    Ok(key)
}

/// Generate a signing key and write it to `path` with owner-only permissions.
pub fn create_signing_key(path: &Path, force: bool) -> ZkAttestResult<AttesterPrivateKey> {
    if path.exists() && !force {
        return Err(ZkAttestError::Config(format!(
            "signing key already exists at {}",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ZkAttestError::Storage(format!("Failed to create key dir: {}", e)))?;
    }

    let key = generate_attester_key();
    write_secret(path, key.to_hex().as_bytes())?;
    info!("Generated attester signing key at {}", path.display());
    Ok(key)
}

pub fn load_signer(config: &AttesterConfig) -> ZkAttestResult<AttestationSigner> {
    let key = load_signing_key(&config.signing_key_file())?;
    AttestationSigner::new(&key, config.attester_id)
}

fn write_secret(path: &Path, contents: &[u8]) -> ZkAttestResult<()> {
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(SIGNING_KEY_PERMS)
            .open(path)
            .map_err(|e| ZkAttestError::Storage(format!("Failed to create signing key: {}", e)))?;
        file.write_all(contents)
            .map_err(|e| ZkAttestError::Storage(format!("Failed to write signing key: {}", e)))?;
    }

    #[cfg(not(unix))]
    {
        let _ = SIGNING_KEY_PERMS;
        fs::write(path, contents)
            .map_err(|e| ZkAttestError::Storage(format!("Failed to write signing key: {}", e)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_keys;
    use zkattest_crypto::derive_public_key;
    use zkattest_types::ErrorKind;

    #[tokio::test]
    async fn test_missing_keys_without_generation() {
        let dir = tempfile::tempdir().unwrap();
        let provider = KeyProvider::new(dir.path().join("keys"), false);

        let err = provider.keys().await.unwrap_err();
        assert!(matches!(err, ZkAttestError::KeyMissing(_)));
        assert_eq!(err.kind(), ErrorKind::InfrastructureFailure);
        assert!(!provider.is_initialized());

        // A failed attempt is not cached.
        assert!(provider.keys().await.is_err());
        assert_eq!(provider.load_attempts(), 2);
    }

    #[tokio::test]
    async fn test_loads_saved_keys_once() {
        let dir = tempfile::tempdir().unwrap();
        let keys = test_keys();
        keys.save(dir.path()).unwrap();

        let provider = Arc::new(KeyProvider::new(dir.path(), false));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let provider = provider.clone();
            handles.push(tokio::spawn(async move { provider.keys().await }));
        }

        let mut loaded = Vec::new();
        for handle in handles {
            loaded.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(provider.load_attempts(), 1);
        assert!(provider.is_initialized());
        for k in &loaded {
            assert!(Arc::ptr_eq(k, &loaded[0]));
        }
        assert_eq!(loaded[0].verifying_key(), keys.verifying_key());
    }

    #[tokio::test]
    async fn test_preloaded_provider() {
        let provider = KeyProvider::with_keys(test_keys());
        assert!(provider.is_initialized());
        provider.keys().await.unwrap();
        assert_eq!(provider.load_attempts(), 0);
    }

    #[tokio::test]
    async fn test_verifier_built_once() {
        let dir = tempfile::tempdir().unwrap();
        let provider = KeyProvider::new(dir.path().join("keys"), false);
        assert!(provider.verifier().await.is_err());

        test_keys().save(provider.keys_dir()).unwrap();
        let first = provider.verifier().await.unwrap();
        let second = provider.verifier().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.load_attempts(), 2);
    }

    #[test]
    fn test_signing_key_create_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attester.key");

        let created = create_signing_key(&path, false).unwrap();
        let loaded = load_signing_key(&path).unwrap();
        assert_eq!(created.as_bytes(), loaded.as_bytes());
        assert_eq!(
            derive_public_key(&created).unwrap(),
            derive_public_key(&loaded).unwrap()
        );

        assert!(create_signing_key(&path, false).is_err());
        let replaced = create_signing_key(&path, true).unwrap();
        assert_ne!(replaced.as_bytes(), created.as_bytes());
    }

    #[cfg(unix)]
    #[test]
    fn test_signing_key_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attester.key");
        create_signing_key(&path, false).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_missing_or_corrupt_signing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attester.key");
        assert!(matches!(load_signing_key(&path), Err(ZkAttestError::KeyMissing(_))));

        fs::write(&path, "zz").unwrap();
        assert!(matches!(load_signing_key(&path), Err(ZkAttestError::InvalidKey(_))));
    }
}
