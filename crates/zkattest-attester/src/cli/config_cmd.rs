use super::commands::{ConfigAction, OutputFormat};
use super::utils::print_json;
use std::path::Path;
use zkattest_attester::AttesterConfig;
use zkattest_types::ZkAttestResult;

pub fn handle_config(
    config_path: &Path,
    config: &AttesterConfig,
    action: Option<ConfigAction>,
    format: &OutputFormat,
) -> ZkAttestResult<()> {
    match action {
        Some(ConfigAction::Show) | None => match format {
            OutputFormat::Json => print_json(&config.redacted())?,
            OutputFormat::Text => {
                if !config_path.exists() {
                    println!("No configuration file at {}, showing defaults", config_path.display());
                }
                println!("{}", config.redacted());
            }
        },
        Some(ConfigAction::Validate) => {
            if !config_path.exists() {
                println!("No configuration file found at {}", config_path.display());
            }
            match config.validate() {
                Ok(()) => println!("[+] Configuration is valid"),
                Err(e) => println!("[-] Configuration error: {}", e),
            }
        }
    }
    Ok(())
}
