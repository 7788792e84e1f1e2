use super::commands::Cli;
use serde::{de::DeserializeOwned, Serialize};
use std::io::Read;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zkattest_attester::LoggingConfig;
use zkattest_types::{ZkAttestError, ZkAttestResult};

/// Logs go to stderr so JSON on stdout stays parseable.
pub fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let level = if cli.quiet {
        "warn".to_string()
    } else {
        match cli.verbose {
            0 => logging.level.to_string(),
            1 => "info,zkattest_attester=debug,zkattest_crypto=debug".to_string(),
            2 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter);

    if let Some(log_file) = cli.log_file.as_ref().or(logging.file.as_ref()) {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
        {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false);
                subscriber.with(file_layer).init();
                return;
            }
            Err(e) => eprintln!("Failed to open log file {}: {}", log_file.display(), e),
        }
    }

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2);
    subscriber.with(stderr_layer).init();
}

/// Read JSON from `path`, or stdin when `path` is `-`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> ZkAttestResult<T> {
    let contents = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| ZkAttestError::Validation(format!("Failed to read stdin: {}", e)))?;
        buf
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| ZkAttestError::Validation(format!("Failed to read {}: {}", path.display(), e)))?
    };

    serde_json::from_str(&contents)
        .map_err(|e| ZkAttestError::Validation(format!("Invalid request JSON: {}", e)))
}

pub fn print_json<T: Serialize>(value: &T) -> ZkAttestResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ZkAttestError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
