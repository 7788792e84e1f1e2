//! Append-only accumulator of revoked commitments.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zkattest_crypto::{
    commitment_to_field, field_to_commitment, fr_to_hex, Fr, MerkleProof, PoseidonMerkleTree,
};
use zkattest_types::{
    wire::{RevocationStatus, RevokeResponse},
    Commitment, ZkAttestError, ZkAttestResult,
};

const SNAPSHOT_VERSION: u32 = 1;

/// On-disk form of the registry. The root is stored so a snapshot whose
/// leaves were edited is detected on load.
#[derive(Debug, Serialize, Deserialize)]
struct RevocationSnapshot {
    version: u32,
    root: String,
    commitments: Vec<String>,
}

pub struct RevocationRegistry {
    tree: RwLock<PoseidonMerkleTree>,
    snapshot_path: Option<PathBuf>,
}

impl RevocationRegistry {
    /// In-memory registry, nothing persisted.
    pub fn new() -> ZkAttestResult<Self> {
        Ok(Self {
            tree: RwLock::new(PoseidonMerkleTree::revocations()?),
            snapshot_path: None,
        })
    }

    /// Registry backed by a JSON snapshot at `path`, created on first revocation.
    pub async fn open(path: impl Into<PathBuf>) -> ZkAttestResult<Self> {
        let path = path.into();
        let tree = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => restore(&path, &contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No revocation snapshot at {}, starting empty", path.display());
                PoseidonMerkleTree::revocations()?
            }
            Err(e) => {
                return Err(ZkAttestError::Storage(format!(
                    "Failed to read revocation snapshot: {}",
                    e
                )))
            }
        };

        info!(
            "Revocation registry opened with {} entries, root {}",
            tree.len(),
            fr_to_hex(&tree.root())
        );
        Ok(Self {
            tree: RwLock::new(tree),
            snapshot_path: Some(path),
        })
    }

    /// Add `commitment`. Fails with `AlreadyRevoked` on a repeat; the tree
    /// never shrinks.
    pub async fn revoke(&self, commitment: &Commitment) -> ZkAttestResult<RevokeResponse> {
        let leaf = commitment_to_field(commitment)?;

        let mut tree = self.tree.write().await;
        match tree.insert(leaf) {
            Ok(_) => {}
            Err(ZkAttestError::AlreadyPresent(_)) => {
                debug!("Commitment {} already revoked", commitment.short());
                return Err(ZkAttestError::AlreadyRevoked(commitment.to_hex()));
            }
            Err(e) => return Err(e),
        }

        if let Some(path) = &self.snapshot_path {
            persist(path, &tree).await?;
        }

        let root = fr_to_hex(&tree.root());
        info!(
            "Revoked commitment {} ({} total, root {})",
            commitment.short(),
            tree.len(),
            root
        );
        Ok(RevokeResponse {
            commitment: commitment.to_hex(),
            root,
            count: tree.len(),
            success: true,
        })
    }

    /// A commitment outside the field can never have been revoked.
    pub async fn is_revoked(&self, commitment: &Commitment) -> bool {
        match commitment_to_field(commitment) {
            Ok(leaf) => self.tree.read().await.contains(&leaf),
            Err(_) => false,
        }
    }

    pub async fn status(&self) -> RevocationStatus {
        let tree = self.tree.read().await;
        RevocationStatus {
            root: fr_to_hex(&tree.root()),
            count: tree.len(),
        }
    }

    pub async fn root(&self) -> Fr {
        self.tree.read().await.root()
    }

    pub async fn len(&self) -> u64 {
        self.tree.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tree.read().await.is_empty()
    }

    /// Membership proof that `commitment` is revoked.
    pub async fn proof(&self, commitment: &Commitment) -> ZkAttestResult<MerkleProof<Fr>> {
        let leaf = commitment_to_field(commitment)?;
        self.tree.read().await.proof(&leaf).map_err(|e| match e {
            ZkAttestError::NotFound(_) => {
                ZkAttestError::NotFound(format!("commitment {} is not revoked", commitment.short()))
            }
            other => other,
        })
    }

    pub async fn commitments(&self) -> Vec<Commitment> {
        self.tree
            .read()
            .await
            .leaves()
            .iter()
            .map(field_to_commitment)
            .collect()
    }
}

fn restore(path: &Path, contents: &str) -> ZkAttestResult<PoseidonMerkleTree> {
    let snapshot: RevocationSnapshot = serde_json::from_str(contents).map_err(|e| {
        ZkAttestError::Serialization(format!("revocation snapshot {}: {}", path.display(), e))
    })?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(ZkAttestError::Storage(format!(
            "unsupported revocation snapshot version {}",
            snapshot.version
        )));
    }

    let mut tree = PoseidonMerkleTree::revocations()?;
    for hex in &snapshot.commitments {
        let commitment = Commitment::from_hex(hex)?;
        tree.insert(commitment_to_field(&commitment)?)?;
    }

    let root = fr_to_hex(&tree.root());
    if root != snapshot.root {
        warn!(target: "security", "Revocation snapshot root mismatch at {}", path.display());
        return Err(ZkAttestError::Storage(format!(
            "revocation snapshot root {} does not match its entries ({})",
            snapshot.root, root
        )));
    }
    Ok(tree)
}

/// Write to a sibling temp file and rename over the snapshot.
async fn persist(path: &Path, tree: &PoseidonMerkleTree) -> ZkAttestResult<()> {
    let snapshot = RevocationSnapshot {
        version: SNAPSHOT_VERSION,
        root: fr_to_hex(&tree.root()),
        commitments: tree
            .leaves()
            .iter()
            .map(|leaf| field_to_commitment(leaf).to_hex())
            .collect(),
    };
    let json = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| ZkAttestError::Serialization(e.to_string()))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ZkAttestError::Storage(format!("Failed to create snapshot dir: {}", e)))?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| ZkAttestError::Storage(format!("Failed to write revocation snapshot: {}", e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| ZkAttestError::Storage(format!("Failed to replace revocation snapshot: {}", e)))?;
    Ok(())
}
