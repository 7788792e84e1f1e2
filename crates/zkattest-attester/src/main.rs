mod cli;

use clap::Parser;
use cli::{
    Cli, Commands, init_logging, init_attester, handle_config, handle_allowlist,
    handle_prove, handle_attest, handle_revoke, show_status, show_pubkey, verify_signature,
};
use std::path::PathBuf;
use zkattest_attester::{AttesterConfig, CONFIG_FILE_NAME};
use zkattest_types::ZkAttestResult;

#[tokio::main]
async fn main() -> ZkAttestResult<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(|| {
        dirs::home_dir()
            .map(|h| h.join(".zkattest"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/zkattest"))
    });

    let config_path = cli.config.clone().unwrap_or_else(|| data_dir.join(CONFIG_FILE_NAME));

    let mut config = match AttesterConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) if matches!(cli.command, Commands::Init { force: true, .. }) => {
            eprintln!("Ignoring existing configuration: {}", e);
            AttesterConfig::default()
        }
        Err(e) => return Err(e),
    };
    if cli.data_dir.is_some() {
        config.data_dir = data_dir.clone();
    }

    init_logging(&cli, &config.logging);

    match cli.command {
        Commands::Init { force, attester_id } => {
            init_attester(&config_path, &data_dir, force, attester_id)?;
        }
        Commands::Config { action } => {
            handle_config(&config_path, &config, action, &cli.format)?;
        }
        Commands::Pubkey => {
            show_pubkey(&config, &cli.format)?;
        }
        Commands::Allowlist { jurisdictions, member } => {
            handle_allowlist(&jurisdictions, member.as_deref(), &cli.format)?;
        }
        Commands::Prove { request } => {
            handle_prove(&config, &request).await?;
        }
        Commands::Attest { request } => {
            handle_attest(config, &request).await?;
        }
        Commands::Revoke { commitment } => {
            handle_revoke(&config, &commitment, &cli.format).await?;
        }
        Commands::Status { commitment } => {
            show_status(config, commitment.as_deref(), &cli.format).await?;
        }
        Commands::VerifySignature { public_key, commitment, signature } => {
            verify_signature(&public_key, &commitment, &signature)?;
        }
    }

    Ok(())
}
