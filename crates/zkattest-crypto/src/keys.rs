//! Groth16 key material for the eligibility circuit.

use crate::circuit::EligibilityCircuit;
use ark_bn254::Bn254;
use ark_groth16::{Groth16, PreparedVerifyingKey, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use zkattest_types::{
    ZkAttestError, ZkAttestResult, AGE_BIT_WIDTH, CIRCUIT_VERSION, JURISDICTION_TREE_DEPTH,
    PUBLIC_INPUT_COUNT,
};

pub const CIRCUIT_NAME: &str = "eligibility";
pub const PROVING_KEY_FILE: &str = "eligibility.pk.bin";
pub const VERIFYING_KEY_FILE: &str = "eligibility.vk.bin";
pub const VK_HASH_FILE: &str = "eligibility.vk.hash";
pub const METADATA_FILE: &str = "eligibility.meta.json";

/// Contents of `eligibility.meta.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    pub circuit: String,
    pub version: String,
    pub merkle_depth: usize,
    pub age_bit_width: usize,
    pub public_inputs: usize,
    pub vk_hash: String,
    pub pk_size: usize,
    pub vk_size: usize,
    pub generated_at: String,
}

impl KeyMetadata {
    /// Keys built for a different circuit layout must never be used.
    pub fn check_compatible(&self) -> ZkAttestResult<()> {
        let expected = (CIRCUIT_NAME, CIRCUIT_VERSION, JURISDICTION_TREE_DEPTH, AGE_BIT_WIDTH, PUBLIC_INPUT_COUNT);
        let actual = (
            self.circuit.as_str(),
            self.version.as_str(),
            self.merkle_depth,
            self.age_bit_width,
            self.public_inputs,
        );
        if expected != actual {
            return Err(ZkAttestError::Circuit(format!(
                "keys were generated for {} {} (depth {}, age bits {}, {} inputs), expected {} {} (depth {}, age bits {}, {} inputs)",
                actual.0, actual.1, actual.2, actual.3, actual.4,
                expected.0, expected.1, expected.2, expected.3, expected.4,
            )));
        }
        Ok(())
    }

    pub fn read(dir: &Path) -> ZkAttestResult<Self> {
        let path = dir.join(METADATA_FILE);
        let content = read_string(&path)?;
        serde_json::from_str(&content)
            .map_err(|e| ZkAttestError::Serialization(format!("{}: {}", path.display(), e)))
    }
}

/// Blake3 of the compressed verifying key, hex encoded.
pub fn compute_vk_hash(vk_bytes: &[u8]) -> String {
    hex::encode(blake3::hash(vk_bytes).as_bytes())
}

/// Proving and verifying keys plus the prepared verifying key. Immutable once
/// built; share behind an `Arc`.
#[derive(Debug)]
pub struct CircuitKeys {
    proving_key: ProvingKey<Bn254>,
    prepared_vk: PreparedVerifyingKey<Bn254>,
}

impl CircuitKeys {
    /// Circuit-specific trusted setup.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> ZkAttestResult<Self> {
        info!("Running Groth16 setup for {} circuit {}", CIRCUIT_NAME, CIRCUIT_VERSION);
        let (proving_key, verifying_key) =
            Groth16::<Bn254>::circuit_specific_setup(EligibilityCircuit::empty(), rng)
                .map_err(|e| ZkAttestError::Circuit(format!("setup failed: {}", e)))?;
        Self::from_parts(proving_key, verifying_key)
    }

    pub fn from_parts(
        proving_key: ProvingKey<Bn254>,
        verifying_key: VerifyingKey<Bn254>,
    ) -> ZkAttestResult<Self> {
        if verifying_key.gamma_abc_g1.len() != PUBLIC_INPUT_COUNT + 1 {
            return Err(ZkAttestError::Circuit(format!(
                "verifying key expects {} public inputs, circuit has {}",
                verifying_key.gamma_abc_g1.len().saturating_sub(1),
                PUBLIC_INPUT_COUNT
            )));
        }
        let prepared_vk = Groth16::<Bn254>::process_vk(&verifying_key)
            .map_err(|e| ZkAttestError::Circuit(format!("failed to prepare verifying key: {}", e)))?;
        Ok(Self {
            proving_key,
            prepared_vk,
        })
    }

    pub fn proving_key(&self) -> &ProvingKey<Bn254> {
        &self.proving_key
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.proving_key.vk
    }

    pub fn prepared_verifying_key(&self) -> &PreparedVerifyingKey<Bn254> {
        &self.prepared_vk
    }

    pub fn vk_bytes(&self) -> ZkAttestResult<Vec<u8>> {
        serialize(self.verifying_key(), "verifying key")
    }

    pub fn vk_hash(&self) -> ZkAttestResult<String> {
        Ok(compute_vk_hash(&self.vk_bytes()?))
    }

    pub fn exists(dir: &Path) -> bool {
        dir.join(PROVING_KEY_FILE).is_file() && dir.join(VERIFYING_KEY_FILE).is_file()
    }

    /// Write the key files and metadata into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> ZkAttestResult<KeyMetadata> {
        fs::create_dir_all(dir)
            .map_err(|e| ZkAttestError::Storage(format!("{}: {}", dir.display(), e)))?;

        let pk_bytes = serialize(&self.proving_key, "proving key")?;
        let vk_bytes = self.vk_bytes()?;
        let vk_hash = compute_vk_hash(&vk_bytes);

        write_file(&dir.join(PROVING_KEY_FILE), &pk_bytes)?;
        write_file(&dir.join(VERIFYING_KEY_FILE), &vk_bytes)?;
        write_file(&dir.join(VK_HASH_FILE), format!("{}\n", vk_hash).as_bytes())?;

        let metadata = KeyMetadata {
            circuit: CIRCUIT_NAME.to_string(),
            version: CIRCUIT_VERSION.to_string(),
            merkle_depth: JURISDICTION_TREE_DEPTH,
            age_bit_width: AGE_BIT_WIDTH,
            public_inputs: PUBLIC_INPUT_COUNT,
            vk_hash,
            pk_size: pk_bytes.len(),
            vk_size: vk_bytes.len(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| ZkAttestError::Serialization(e.to_string()))?;
        write_file(&dir.join(METADATA_FILE), &json)?;

        info!(
            "Saved {} keys to {} (pk {} bytes, vk {} bytes)",
            CIRCUIT_NAME,
            dir.display(),
            metadata.pk_size,
            metadata.vk_size
        );
        Ok(metadata)
    }

    /// Load keys written by [`CircuitKeys::save`], refusing mismatched metadata
    /// or a verifying key whose hash differs from the recorded one.
    pub fn load(dir: &Path) -> ZkAttestResult<Self> {
        let vk = VerifierKey::load(dir)?;
        let pk_bytes = read_key_file(&dir.join(PROVING_KEY_FILE))?;
        let proving_key = ProvingKey::<Bn254>::deserialize_compressed(&pk_bytes[..])
            .map_err(|e| ZkAttestError::Serialization(format!("proving key: {}", e)))?;

        if proving_key.vk != vk.verifying_key {
            return Err(ZkAttestError::Circuit(
                "proving key does not belong to the stored verifying key".into(),
            ));
        }

        debug!("Loaded {} keys from {}", CIRCUIT_NAME, dir.display());
        Self::from_parts(proving_key, vk.verifying_key)
    }
}

/// Verifying key alone, for parties that never prove.
#[derive(Clone, Debug)]
pub struct VerifierKey {
    pub verifying_key: VerifyingKey<Bn254>,
    pub hash: String,
}

impl VerifierKey {
    pub fn load(dir: &Path) -> ZkAttestResult<Self> {
        let metadata = KeyMetadata::read(dir)?;
        metadata.check_compatible()?;

        let vk_bytes = read_key_file(&dir.join(VERIFYING_KEY_FILE))?;
        let hash = compute_vk_hash(&vk_bytes);
        if hash != metadata.vk_hash {
            return Err(ZkAttestError::Storage(format!(
                "verifying key hash {} does not match recorded {}",
                hash, metadata.vk_hash
            )));
        }
        let hash_file = dir.join(VK_HASH_FILE);
        if hash_file.is_file() && read_string(&hash_file)?.trim() != hash {
            return Err(ZkAttestError::Storage(format!(
                "{} does not match the verifying key",
                hash_file.display()
            )));
        }

        let verifying_key = VerifyingKey::<Bn254>::deserialize_compressed(&vk_bytes[..])
            .map_err(|e| ZkAttestError::Serialization(format!("verifying key: {}", e)))?;
        Ok(Self {
            verifying_key,
            hash,
        })
    }
}

fn serialize<T: CanonicalSerialize>(value: &T, label: &str) -> ZkAttestResult<Vec<u8>> {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    value
        .serialize_compressed(&mut bytes)
        .map_err(|e| ZkAttestError::Serialization(format!("{}: {}", label, e)))?;
    Ok(bytes)
}

fn write_file(path: &Path, bytes: &[u8]) -> ZkAttestResult<()> {
    fs::write(path, bytes).map_err(|e| ZkAttestError::Storage(format!("{}: {}", path.display(), e)))
}

fn read_key_file(path: &Path) -> ZkAttestResult<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ZkAttestError::KeyMissing(path.display().to_string()),
        _ => ZkAttestError::Storage(format!("{}: {}", path.display(), e)),
    })
}

fn read_string(path: &Path) -> ZkAttestResult<String> {
    let bytes = read_key_file(path)?;
    String::from_utf8(bytes)
        .map_err(|e| ZkAttestError::Serialization(format!("{}: {}", path.display(), e)))
}
