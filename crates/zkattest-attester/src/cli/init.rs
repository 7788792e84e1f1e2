use std::path::Path;
use zkattest_attester::{create_signing_key, AttesterConfig};
use zkattest_crypto::derive_public_key;
use zkattest_types::{ZkAttestError, ZkAttestResult};

pub fn init_attester(
    config_path: &Path,
    data_dir: &Path,
    force: bool,
    attester_id: Option<u64>,
) -> ZkAttestResult<()> {
    println!("Initializing zkattest attester...");
    println!();

    if config_path.exists() && !force {
        println!("Configuration already exists at {}", config_path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    std::fs::create_dir_all(data_dir)
        .map_err(|e| ZkAttestError::Config(format!("Failed to create data directory: {}", e)))?;

    let mut config = AttesterConfig {
        data_dir: data_dir.to_path_buf(),
        ..AttesterConfig::default()
    };
    if let Some(id) = attester_id {
        config.attester_id = id;
    }
    config.validate()?;
    config.save(config_path)?;

    let key_path = config.signing_key_file();
    let key = create_signing_key(&key_path, force)?;
    let public_key = derive_public_key(&key)?;

    println!("[+] Configuration: {}", config_path.display());
    println!("[+] Signing key:   {}", key_path.display());
    println!();
    println!("Attester ID: {}", config.attester_id);
    println!("Public key:  {}", public_key);
    println!();
    println!("Next steps:");
    println!("  1. Register the public key for attester {} in the registry", config.attester_id);
    println!("  2. Place eligibility.vk.bin, eligibility.pk.bin and eligibility.meta.json in {}", config.keys_dir().display());
    println!("  3. Attest: zkattest attest request.json");

    Ok(())
}
