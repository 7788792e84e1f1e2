use super::commands::OutputFormat;
use super::utils::print_json;
use zkattest_attester::{Attester, AttesterConfig, RevocationRegistry};
use zkattest_types::{wire::ErrorResponse, Commitment, ZkAttestError, ZkAttestResult};

pub async fn handle_revoke(
    config: &AttesterConfig,
    commitment: &str,
    format: &OutputFormat,
) -> ZkAttestResult<()> {
    let commitment = Commitment::from_hex(commitment)?;
    let registry = RevocationRegistry::open(config.revocation_file()).await?;

    match registry.revoke(&commitment).await {
        Ok(response) => match format {
            OutputFormat::Json => print_json(&response),
            OutputFormat::Text => {
                println!("[+] Revoked {}", response.commitment);
                println!("    Revoked total: {}", response.count);
                println!("    Root:          {}", response.root);
                Ok(())
            }
        },
        Err(e) => {
            match format {
                OutputFormat::Json => print_json(&ErrorResponse::from(&e))?,
                OutputFormat::Text => println!("[-] {}", e),
            }
            Err(e)
        }
    }
}

pub async fn show_status(
    config: AttesterConfig,
    commitment: Option<&str>,
    format: &OutputFormat,
) -> ZkAttestResult<()> {
    let commitment = commitment.map(Commitment::from_hex).transpose()?;
    let attester = Attester::open(config).await?;
    let status = attester.status().await;
    let revoked = match &commitment {
        Some(c) => Some(attester.revocations().is_revoked(c).await),
        None => None,
    };

    match format {
        OutputFormat::Json => {
            let mut value = serde_json::to_value(&status)
                .map_err(|e| ZkAttestError::Serialization(e.to_string()))?;
            if let (Some(revoked), Some(map)) = (revoked, value.as_object_mut()) {
                map.insert("revoked".into(), serde_json::Value::Bool(revoked));
            }
            print_json(&value)
        }
        OutputFormat::Text => {
            println!("Attester ID:      {}", status.attester_id);
            println!("Public key:       {}", status.public_key);
            println!("Keys directory:   {}", attester.config().keys_dir().display());
            println!("Revoked total:    {}", status.revocations.count);
            println!("Revocation root:  {}", status.revocations.root);
            if let (Some(c), Some(revoked)) = (commitment, revoked) {
                println!("{}: {}", c, if revoked { "REVOKED" } else { "not revoked" });
            }
            Ok(())
        }
    }
}
