//! SPKI command-line tool
//!
//! Key generation, certificate signing, proof search and proof checking over
//! JSON files.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use spki_certify::{Certificate, Proof, Signer};
use spki_core::{Cert, PublicKey};
use spki_prover::{MemoryCertStore, Prover, ProverConfig, SearchDirection, validate_proof};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spki")]
#[command(about = "SPKI/SDSI certificates and authorization proofs", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an Ed25519 key pair
    Keygen {
        /// Where to write the key file
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Sign a certificate as its issuer
    Sign {
        /// Key file of the issuer
        #[arg(short, long)]
        key: PathBuf,
        /// Unsigned certificate (JSON)
        #[arg(short, long)]
        cert: PathBuf,
        /// Where to write the signed certificate
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Search a certificate store for a proof of a statement
    Prove {
        /// Store file: a JSON array of signed certificates
        #[arg(short, long)]
        store: PathBuf,
        /// Statement to prove (JSON)
        #[arg(short, long)]
        target: PathBuf,
        /// Prover settings (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Search from the subject towards the issuer
        #[arg(long)]
        backward: bool,
        /// Maximum number of store queries
        #[arg(long)]
        max_fetches: Option<usize>,
        /// Where to write the proof; stdout if absent
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Check a proof against a statement
    Verify {
        /// Proof file
        #[arg(short, long)]
        proof: PathBuf,
        /// Statement the proof must establish
        #[arg(short, long)]
        target: PathBuf,
    },
}

/// On-disk key pair
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    public: PublicKey,
    secret: String,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).wrap_err_with(|| format!("failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text).wrap_err_with(|| format!("failed to write {}", path.display()))
}

fn keygen(out: &Path) -> Result<PublicKey> {
    let signer = Signer::generate();
    let key = KeyFile {
        public: signer.public_key(),
        secret: signer.secret_hex(),
    };
    write_json(out, &key)?;
    Ok(key.public)
}

fn sign(key: &Path, cert: &Path, out: &Path) -> Result<Certificate> {
    let key: KeyFile = read_json(key)?;
    let signer = Signer::from_secret_hex(&key.secret)?;
    let cert: Cert = read_json(cert)?;
    let certificate = Certificate::sign(cert, &signer)?;
    write_json(out, &certificate)?;
    Ok(certificate)
}

fn prove(
    store: &Path,
    target: &Path,
    config: ProverConfig,
    out: Option<&Path>,
) -> Result<Option<Proof>> {
    let store = MemoryCertStore::load(store)?;
    let target: Cert = read_json(target)?;
    let mut prover = Prover::with_config(target, &store, config);
    let proof = prover.get_proof()?;
    let stats = prover.stats();
    tracing::info!(
        fetches = stats.fetches,
        derived = stats.inserted,
        compositions = stats.compositions,
        budget_exceeded = stats.budget_exceeded,
        "search finished"
    );

    if let Some(proof) = &proof {
        match out {
            Some(path) => write_json(path, proof)?,
            None => println!("{}", serde_json::to_string_pretty(proof)?),
        }
    }
    Ok(proof)
}

fn verify(proof: &Path, target: &Path) -> Result<()> {
    let proof: Proof = read_json(proof)?;
    let target: Cert = read_json(target)?;
    validate_proof(&proof, &target).map_err(|e| eyre!("proof rejected: {}", e))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Keygen { out } => {
            let public = keygen(&out)?;
            println!("{}", public);
            Ok(())
        }
        Commands::Sign { key, cert, out } => {
            let certificate = sign(&key, &cert, &out)?;
            println!("signed {}", certificate.cert);
            Ok(())
        }
        Commands::Prove {
            store,
            target,
            config,
            backward,
            max_fetches,
            out,
        } => {
            let mut settings = match config {
                Some(path) => read_json(&path)?,
                None => ProverConfig::default(),
            };
            if backward {
                settings.direction = SearchDirection::Backward;
            }
            if let Some(max) = max_fetches {
                settings.max_fetches = Some(max);
            }
            match prove(&store, &target, settings, out.as_deref())? {
                Some(proof) => {
                    eprintln!("proof found: {}", proof);
                    Ok(())
                }
                None => {
                    eprintln!("no proof found");
                    std::process::exit(1);
                }
            }
        }
        Commands::Verify { proof, target } => {
            verify(&proof, &target)?;
            println!("proof ok");
            Ok(())
        }
    }
}
