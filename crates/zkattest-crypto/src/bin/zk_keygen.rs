//! Groth16 key generation for the eligibility circuit.
//!
//! Usage:
//!   zk-keygen generate --output ./zk-keys
//!   zk-keygen verify --keys-dir ./zk-keys --expected-hash <hex>
//!   zk-keygen info --keys-dir ./zk-keys

use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use zkattest_crypto::keys::{
    compute_vk_hash, CircuitKeys, KeyMetadata, VerifierKey, PROVING_KEY_FILE, VERIFYING_KEY_FILE,
};
use zkattest_types::{ZkAttestResult, AGE_BIT_WIDTH, CIRCUIT_VERSION, JURISDICTION_TREE_DEPTH};

#[derive(Parser)]
#[command(name = "zk-keygen")]
#[command(about = "Generate and inspect Groth16 keys for the zkattest eligibility circuit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the circuit-specific setup and write new keys.
    Generate {
        /// Output directory for keys.
        #[arg(short, long, default_value = "./zk-keys")]
        output: PathBuf,

        /// Overwrite keys that already exist in the output directory.
        #[arg(long)]
        force: bool,

        /// Deterministic setup from a seed. Test fixtures only.
        #[arg(long, hide = true)]
        insecure_seed: Option<u64>,
    },

    /// Check a verifying key against its metadata and an expected hash.
    Verify {
        /// Directory containing keys.
        #[arg(short, long, default_value = "./zk-keys")]
        keys_dir: PathBuf,

        /// Expected VK hash (hex).
        #[arg(short, long)]
        expected_hash: Option<String>,
    },

    /// Show information about existing keys.
    Info {
        /// Directory containing keys.
        #[arg(short, long, default_value = "./zk-keys")]
        keys_dir: PathBuf,
    },
}

fn generate(output: &PathBuf, force: bool, seed: Option<u64>) -> ZkAttestResult<bool> {
    if CircuitKeys::exists(output) && !force {
        eprintln!(
            "Keys already exist in {}. Pass --force to replace them.",
            output.display()
        );
        return Ok(false);
    }

    println!("zkattest key generator, circuit {}", CIRCUIT_VERSION);
    println!("==============================");
    println!("Jurisdiction tree depth: {}", JURISDICTION_TREE_DEPTH);
    println!("Age bit width: {}", AGE_BIT_WIDTH);
    println!();
    println!("Running trusted setup (circuit-specific)...");

    let keys = match seed {
        Some(seed) => {
            eprintln!("WARNING: deterministic setup, do not use these keys in production");
            CircuitKeys::generate(&mut StdRng::seed_from_u64(seed))?
        }
        None => CircuitKeys::generate(&mut StdRng::from_entropy())?,
    };
    let metadata = keys.save(output)?;

    println!("Proving key: {} ({} bytes)", output.join(PROVING_KEY_FILE).display(), metadata.pk_size);
    println!("Verifying key: {} ({} bytes)", output.join(VERIFYING_KEY_FILE).display(), metadata.vk_size);
    println!("VK hash: {}", metadata.vk_hash);
    println!();
    println!("Key generation complete.");
    println!("  1. Give eligibility.pk.bin to provers");
    println!("  2. Give eligibility.vk.bin and eligibility.meta.json to attesters");
    println!("  3. Publish the VK hash: {}", metadata.vk_hash);

    Ok(true)
}

fn verify(keys_dir: &PathBuf, expected_hash: Option<String>) -> ZkAttestResult<bool> {
    println!("Verifying keys in {}", keys_dir.display());

    let vk = VerifierKey::load(keys_dir)?;
    println!("VK hash: {}", vk.hash);
    println!("Metadata and deserialization: OK");

    if let Some(expected) = expected_hash {
        let expected = expected.trim().trim_start_matches("0x").to_lowercase();
        if vk.hash != expected {
            eprintln!("Hash MISMATCH!");
            eprintln!("  Expected: {}", expected);
            eprintln!("  Actual:   {}", vk.hash);
            return Ok(false);
        }
        println!("Hash match: OK");
    }

    Ok(true)
}

fn info(keys_dir: &PathBuf) -> ZkAttestResult<bool> {
    println!("zkattest keys");
    println!("=============");
    println!("Directory: {}", keys_dir.display());
    println!();

    if !CircuitKeys::exists(keys_dir) {
        println!("No keys found. Run 'zk-keygen generate' first.");
        return Ok(true);
    }

    let metadata = KeyMetadata::read(keys_dir)?;
    println!("Circuit: {} {}", metadata.circuit, metadata.version);
    println!("  Merkle depth: {}", metadata.merkle_depth);
    println!("  Age bit width: {}", metadata.age_bit_width);
    println!("  Public inputs: {}", metadata.public_inputs);
    println!("  VK hash: {}", metadata.vk_hash);
    println!("  PK size: {} bytes", metadata.pk_size);
    println!("  VK size: {} bytes", metadata.vk_size);
    println!("  Generated: {}", metadata.generated_at);

    let vk_bytes = fs::read(keys_dir.join(VERIFYING_KEY_FILE)).unwrap_or_default();
    let compatible = metadata.check_compatible().is_ok() && compute_vk_hash(&vk_bytes) == metadata.vk_hash;
    println!("  Usable by this build: {}", if compatible { "yes" } else { "no" });

    Ok(true)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            output,
            force,
            insecure_seed,
        } => generate(&output, force, insecure_seed),
        Commands::Verify {
            keys_dir,
            expected_hash,
        } => verify(&keys_dir, expected_hash),
        Commands::Info { keys_dir } => info(&keys_dir),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
