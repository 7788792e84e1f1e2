use super::commands::OutputFormat;
use super::utils::print_json;
use serde_json::json;
use zkattest_attester::{load_signing_key, AttesterConfig};
use zkattest_crypto::{derive_public_key, verify_attestation_signature};
use zkattest_types::{decode_hex_exact, AttesterPublicKey, ZkAttestResult, ATTESTATION_SIGNATURE_SIZE, COMMITMENT_SIZE};

pub fn show_pubkey(config: &AttesterConfig, format: &OutputFormat) -> ZkAttestResult<()> {
    let key = load_signing_key(&config.signing_key_file())?;
    let public_key = derive_public_key(&key)?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "attesterId": config.attester_id,
            "publicKey": public_key.to_hex(),
        })),
        OutputFormat::Text => {
            println!("Attester ID: {}", config.attester_id);
            println!("Public key:  {}", public_key);
            Ok(())
        }
    }
}

pub fn verify_signature(public_key: &str, commitment: &str, signature: &str) -> ZkAttestResult<()> {
    let public_key = AttesterPublicKey::from_hex(public_key)?;
    let commitment = decode_hex_exact::<COMMITMENT_SIZE>("commitment", commitment)?;
    let signature = decode_hex_exact::<ATTESTATION_SIGNATURE_SIZE>("signature", signature)?;

    verify_attestation_signature(&public_key, &commitment, &signature)?;
    println!("[+] Signature valid and canonical (low-S)");
    Ok(())
}
