use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "zkattest")]
#[command(version = BUILD_VERSION)]
#[command(about = "zkattest - eligibility proofs and signed attestations")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(short, long, global = true, value_name = "FILE", help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(short = 'd', long, global = true, value_name = "DIR", env = "ZKATTEST_DATA_DIR", help = "Data directory path")]
    pub data_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,

    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[arg(long, global = true, value_name = "FILE", help = "Write logs to file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text", help = "Output format")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Initialize an attester")]
    #[command(long_about = "Write a default configuration and generate the attester's secp256k1 signing key.\n\nCircuit keys are produced separately with zk-keygen.")]
    Init {
        #[arg(short, long, help = "Overwrite existing configuration and signing key")]
        force: bool,
        #[arg(long, value_name = "ID", help = "Attester id registered on-chain")]
        attester_id: Option<u64>,
    },

    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    #[command(about = "Show the attester id and public key")]
    Pubkey,

    #[command(about = "Build a jurisdiction allow-list")]
    #[command(long_about = "Build the jurisdiction Merkle tree and print its root.\n\nWith --member, also print the merklePath/merkleHelper a holder of that jurisdiction needs.")]
    Allowlist {
        #[arg(short, long = "jurisdiction", value_name = "ID", value_delimiter = ',', required = true, help = "Jurisdiction ids, decimal or 0x hex")]
        jurisdictions: Vec<String>,
        #[arg(long, value_name = "ID", help = "Emit the membership proof for this jurisdiction")]
        member: Option<String>,
    },

    #[command(about = "Generate an eligibility proof")]
    Prove {
        #[arg(value_name = "FILE", help = "ProofRequest JSON, or - for stdin")]
        request: PathBuf,
    },

    #[command(about = "Verify a proof and issue an attestation")]
    Attest {
        #[arg(value_name = "FILE", help = "AttestationRequest JSON, or - for stdin")]
        request: PathBuf,
    },

    #[command(about = "Revoke a commitment")]
    Revoke {
        #[arg(value_name = "COMMITMENT", help = "32-byte commitment, 0x hex")]
        commitment: String,
    },

    #[command(about = "Show revocation and key status")]
    Status {
        #[arg(value_name = "COMMITMENT", help = "Also report whether this commitment is revoked")]
        commitment: Option<String>,
    },

    #[command(about = "Check an attestation signature the way the registry does")]
    VerifySignature {
        #[arg(long, value_name = "HEX", help = "Compressed attester public key")]
        public_key: String,
        #[arg(long, value_name = "HEX", help = "Attested commitment")]
        commitment: String,
        #[arg(long, value_name = "HEX", help = "64-byte r || s signature")]
        signature: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Validate configuration")]
    Validate,
}
