//! Attestation signatures over commitments.
//!
//! The 32 commitment bytes are signed directly as the ECDSA digest (no
//! re-hashing), and `s` is always normalized into the lower half of the group
//! order so the registry sees exactly one valid encoding per signature.

use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;
use tracing::warn;
use zkattest_types::{
    Attestation, AttestationSignature, AttesterPrivateKey, AttesterPublicKey, Commitment,
    ZkAttestError, ZkAttestResult, ATTESTATION_SIGNATURE_SIZE, COMMITMENT_SIZE,
};

thread_local! {
    static SECP256K1_CTX: Secp256k1<secp256k1::All> = Secp256k1::new();
}

/// n / 2 for the secp256k1 group order n, big-endian.
const HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

pub fn generate_attester_key() -> AttesterPrivateKey {
    let secret = SecretKey::new(&mut rand::thread_rng());
    AttesterPrivateKey::from_bytes(secret.secret_bytes())
}

pub fn derive_public_key(private_key: &AttesterPrivateKey) -> ZkAttestResult<AttesterPublicKey> {
    SECP256K1_CTX.with(|ctx| {
        let secret = SecretKey::from_slice(private_key.as_bytes())
            .map_err(|e| ZkAttestError::InvalidKey(e.to_string()))?;
        Ok(AttesterPublicKey::from_bytes(
            PublicKey::from_secret_key(ctx, &secret).serialize(),
        ))
    })
}

/// `s <= n/2`.
pub fn is_low_s(signature: &AttestationSignature) -> bool {
    signature.s() <= &HALF_ORDER[..]
}

pub struct AttestationSigner {
    secret: SecretKey,
    public_key: AttesterPublicKey,
    attester_id: u64,
}

impl AttestationSigner {
    pub fn new(private_key: &AttesterPrivateKey, attester_id: u64) -> ZkAttestResult<Self> {
        let secret = SecretKey::from_slice(private_key.as_bytes())
            .map_err(|e| ZkAttestError::InvalidKey(e.to_string()))?;
        let public_key = derive_public_key(private_key)?;
        Ok(Self {
            secret,
            public_key,
            attester_id,
        })
    }

    pub fn attester_id(&self) -> u64 {
        self.attester_id
    }

    /// Compressed 33-byte key, as registered for this attester id.
    pub fn public_key(&self) -> AttesterPublicKey {
        self.public_key
    }

    /// RFC 6979 ECDSA over the raw commitment bytes, low-S, compact `r || s`.
    pub fn sign_commitment(&self, commitment: &Commitment) -> AttestationSignature {
        let message = Message::from_digest(*commitment.as_bytes());
        let mut signature = SECP256K1_CTX.with(|ctx| ctx.sign_ecdsa(&message, &self.secret));
        signature.normalize_s();
        AttestationSignature::from_bytes(signature.serialize_compact())
    }

    pub fn attest(&self, commitment: Commitment, expiry: u64) -> Attestation {
        Attestation {
            commitment,
            signature: self.sign_commitment(&commitment),
            attester_id: self.attester_id,
            expiry,
        }
    }
}

impl fmt::Debug for AttestationSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttestationSigner")
            .field("attester_id", &self.attester_id)
            .field("public_key", &self.public_key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl Drop for AttestationSigner {
    fn drop(&mut self) {
        self.secret.non_secure_erase();
    }
}

/// The registry's acceptance check: 32-byte commitment, 64-byte signature,
/// low-S, valid ECDSA under `public_key`.
pub fn verify_attestation_signature(
    public_key: &AttesterPublicKey,
    commitment: &[u8],
    signature: &[u8],
) -> ZkAttestResult<()> {
    let digest: [u8; COMMITMENT_SIZE] = commitment.try_into().map_err(|_| {
        ZkAttestError::Validation(format!(
            "commitment must be {} bytes, got {}",
            COMMITMENT_SIZE,
            commitment.len()
        ))
    })?;
    let compact: [u8; ATTESTATION_SIGNATURE_SIZE] = signature.try_into().map_err(|_| {
        ZkAttestError::Validation(format!(
            "signature must be {} bytes, got {}",
            ATTESTATION_SIGNATURE_SIZE,
            signature.len()
        ))
    })?;

    if !is_low_s(&AttestationSignature::from_bytes(compact)) {
        warn!(target: "security", "Rejected attestation signature with high s");
        return Err(ZkAttestError::InvalidSignature("s is not in the lower half order".into()));
    }

    let pubkey = PublicKey::from_slice(public_key.as_bytes())
        .map_err(|e| ZkAttestError::InvalidKey(e.to_string()))?;
    let sig = Signature::from_compact(&compact)
        .map_err(|e| ZkAttestError::InvalidSignature(e.to_string()))?;
    let message = Message::from_digest(digest);

    SECP256K1_CTX.with(|ctx| {
        ctx.verify_ecdsa(&message, &sig, &pubkey).map_err(|e| {
            warn!(target: "security", "Attestation signature failed verification");
            ZkAttestError::InvalidSignature(e.to_string())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// n - s for a 32-byte big-endian s.
    fn negate_s(s: &[u8]) -> [u8; 32] {
        const ORDER: [u8; 32] = [
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
            0xff, 0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c,
            0xd0, 0x36, 0x41, 0x41,
        ];
        let mut out = [0u8; 32];
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let mut diff = ORDER[i] as i16 - s[i] as i16 - borrow;
            borrow = if diff < 0 {
                diff += 256;
                1
            } else {
                0
            };
            out[i] = diff as u8;
        }
        out
    }

    fn signer() -> AttestationSigner {
        let key = AttesterPrivateKey::from_bytes([0x42; 32]);
        AttestationSigner::new(&key, 7).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = signer();
        let commitment = Commitment::from_bytes([0x11; 32]);
        let sig = signer.sign_commitment(&commitment);

        assert_eq!(sig.as_bytes().len(), ATTESTATION_SIGNATURE_SIZE);
        assert!(is_low_s(&sig));
        verify_attestation_signature(&signer.public_key(), commitment.as_bytes(), sig.as_bytes())
            .unwrap();
    }

    #[test]
    fn test_signatures_deterministic() {
        let signer = signer();
        let commitment = Commitment::from_bytes([0x33; 32]);
        assert_eq!(signer.sign_commitment(&commitment), signer.sign_commitment(&commitment));
    }

    #[test]
    fn test_low_s_across_many_commitments() {
        let signer = signer();
        for i in 0..64u8 {
            let commitment = Commitment::from_bytes([i; 32]);
            assert!(is_low_s(&signer.sign_commitment(&commitment)), "commitment {}", i);
        }
    }

    #[test]
    fn test_high_s_rejected() {
        let signer = signer();
        let commitment = Commitment::from_bytes([0x55; 32]);
        let sig = signer.sign_commitment(&commitment);

        let mut malleated = *sig.as_bytes();
        let high = negate_s(sig.s());
        malleated[32..].copy_from_slice(&high);
        assert!(!is_low_s(&AttestationSignature::from_bytes(malleated)));

        let err = verify_attestation_signature(&signer.public_key(), commitment.as_bytes(), &malleated)
            .unwrap_err();
        assert!(matches!(err, ZkAttestError::InvalidSignature(_)));
    }

    #[test]
    fn test_wrong_key_or_message_rejected() {
        let signer = signer();
        let other = AttestationSigner::new(&AttesterPrivateKey::from_bytes([0x24; 32]), 8).unwrap();
        let commitment = Commitment::from_bytes([0x11; 32]);
        let sig = signer.sign_commitment(&commitment);

        assert!(verify_attestation_signature(&other.public_key(), commitment.as_bytes(), sig.as_bytes()).is_err());
        assert!(verify_attestation_signature(&signer.public_key(), &[0x12; 32], sig.as_bytes()).is_err());
    }

    #[test]
    fn test_length_checks() {
        let signer = signer();
        let commitment = Commitment::from_bytes([0x11; 32]);
        let sig = signer.sign_commitment(&commitment);

        let err = verify_attestation_signature(&signer.public_key(), &[0x11; 31], sig.as_bytes())
            .unwrap_err();
        assert!(matches!(err, ZkAttestError::Validation(_)));
        let err = verify_attestation_signature(&signer.public_key(), commitment.as_bytes(), &sig.as_bytes()[..63])
            .unwrap_err();
        assert!(matches!(err, ZkAttestError::Validation(_)));
    }

    #[test]
    fn test_public_key_compressed() {
        let signer = signer();
        let pk = signer.public_key();
        assert_eq!(pk.as_bytes().len(), 33);
        assert!(pk.as_bytes()[0] == 0x02 || pk.as_bytes()[0] == 0x03);
    }

    #[test]
    fn test_invalid_private_key() {
        assert!(AttestationSigner::new(&AttesterPrivateKey::from_bytes([0u8; 32]), 1).is_err());
        assert!(AttestationSigner::new(&AttesterPrivateKey::from_bytes([0xff; 32]), 1).is_err());
    }

    #[test]
    fn test_attest_and_debug() {
        let signer = signer();
        let attestation = signer.attest(Commitment::from_bytes([9; 32]), 1_000);
        assert_eq!(attestation.attester_id, 7);
        assert_eq!(attestation.expiry, 1_000);
        assert!(format!("{:?}", signer).contains("REDACTED"));
    }

    #[test]
    fn test_generated_key_usable() {
        let key = generate_attester_key();
        let signer = AttestationSigner::new(&key, 1).unwrap();
        let commitment = Commitment::from_bytes([1; 32]);
        let sig = signer.sign_commitment(&commitment);
        verify_attestation_signature(&signer.public_key(), commitment.as_bytes(), sig.as_bytes())
            .unwrap();
    }
}
