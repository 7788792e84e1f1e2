use crate::constants::*;
use crate::error::{ZkAttestError, ZkAttestResult};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::fmt;
use zeroize::Zeroize;

/// Decode an optionally `0x`-prefixed hex string into exactly `N` bytes.
pub fn decode_hex_exact<const N: usize>(label: &str, s: &str) -> ZkAttestResult<[u8; N]> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits)
        .map_err(|e| ZkAttestError::Validation(format!("{}: invalid hex: {}", label, e)))?;
    if bytes.len() != N {
        return Err(ZkAttestError::Validation(format!(
            "{}: expected {} bytes, got {}",
            label,
            N,
            bytes.len()
        )));
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Commitment(pub [u8; COMMITMENT_SIZE]);

impl Commitment {
    pub fn from_bytes(bytes: [u8; COMMITMENT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; COMMITMENT_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> ZkAttestResult<Self> {
        decode_hex_exact::<COMMITMENT_SIZE>("commitment", s).map(Self)
    }

    /// First bytes only, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.to_hex())
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttestationSignature(
    #[serde_as(as = "serde_with::Bytes")] pub [u8; ATTESTATION_SIGNATURE_SIZE],
);

impl AttestationSignature {
    pub fn from_bytes(bytes: [u8; ATTESTATION_SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ATTESTATION_SIGNATURE_SIZE] {
        &self.0
    }

    pub fn r(&self) -> &[u8] {
        &self.0[..32]
    }

    pub fn s(&self) -> &[u8] {
        &self.0[32..]
    }

    /// 128 hex characters, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> ZkAttestResult<Self> {
        decode_hex_exact::<ATTESTATION_SIGNATURE_SIZE>("signature", s).map(Self)
    }
}

impl fmt::Debug for AttestationSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttestationSignature({}...)", &self.to_hex()[..16])
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AttesterPrivateKey(pub [u8; SECP256K1_PRIVATE_KEY_SIZE]);

impl AttesterPrivateKey {
    pub fn from_bytes(bytes: [u8; SECP256K1_PRIVATE_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SECP256K1_PRIVATE_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> ZkAttestResult<Self> {
        decode_hex_exact::<SECP256K1_PRIVATE_KEY_SIZE>("attester private key", s)
            .map(Self)
            .map_err(|e| ZkAttestError::InvalidKey(e.to_string()))
    }
}

impl fmt::Debug for AttesterPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttesterPrivateKey([REDACTED])")
    }
}

impl Drop for AttesterPrivateKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Compressed SEC1 point, the form the registry stores per attester id.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttesterPublicKey(#[serde_as(as = "serde_with::Bytes")] pub [u8; SECP256K1_PUBLIC_KEY_SIZE]);

impl AttesterPublicKey {
    pub fn from_bytes(bytes: [u8; SECP256K1_PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SECP256K1_PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> ZkAttestResult<Self> {
        decode_hex_exact::<SECP256K1_PUBLIC_KEY_SIZE>("attester public key", s)
            .map(Self)
            .map_err(|e| ZkAttestError::InvalidKey(e.to_string()))
    }
}

impl fmt::Debug for AttesterPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttesterPublicKey({})", self.to_hex())
    }
}

impl fmt::Display for AttesterPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Signed statement that `commitment` passed proof verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub commitment: Commitment,
    pub signature: AttestationSignature,
    pub attester_id: u64,
    /// Unix seconds.
    pub expiry: u64,
}

impl Attestation {
    pub fn is_expired_at(&self, unix_secs: u64) -> bool {
        unix_secs >= self.expiry
    }
}
