use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::Value;
use siegel_document::{attach_signature, verify_signature, SignerIdentity};
use siegel_signature::{SignatureService, StaticKeyRegistry};

#[derive(Parser)]
#[command(
    name = "siegel",
    about = "Command line interface for the Siegel signing gateway",
    version,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an ECDSA P-256 key pair and write it as PKCS#8 PEM.
    ///
    /// Deployments without a persistent key fall back to an ephemeral
    /// pair whose signatures cannot be verified after a restart; generate
    /// and configure a key file for anything beyond development.
    Keygen {
        /// Output file for the private key.
        #[arg(short, long, value_name = "FILE", default_value = "siegel-key.pem")]
        out: PathBuf,
        /// Also write the SPKI public key to `<FILE>.pub`.
        #[arg(long, action = ArgAction::SetTrue)]
        public: bool,
    },

    /// Sign a Bundle JSON file and print the signed document.
    Sign {
        /// Path to the bundle JSON (or "-" for stdin).
        bundle: PathBuf,
        /// PKCS#8 PEM private key file.
        #[arg(short, long, value_name = "FILE")]
        key: PathBuf,
        /// Signer identity recorded in the signature block.
        #[arg(long, default_value = "siegel-cli")]
        signer: String,
    },

    /// Verify a signed Bundle JSON file, printing the verdict.
    Verify {
        /// Path to the signed bundle JSON (or "-" for stdin).
        bundle: PathBuf,
        /// Key file: either an SPKI public key or a PKCS#8 key pair.
        #[arg(short, long, value_name = "FILE")]
        key: PathBuf,
    },

    /// Print the RFC 8785 canonical form of a JSON document.
    Canonical {
        /// Path to the JSON file (or "-" for stdin).
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { out, public } => {
            let service = SignatureService::ephemeral();
            std::fs::write(&out, service.private_key_pem()?)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Private key written to {}", out.display());
            if public {
                let public_path = out.with_extension("pem.pub");
                std::fs::write(&public_path, service.public_key_pem()?)
                    .with_context(|| format!("Failed to write {}", public_path.display()))?;
                println!("Public key written to {}", public_path.display());
            } else {
                println!("{}", service.public_key_pem()?);
            }
        }

        Commands::Sign {
            bundle,
            key,
            signer,
        } => {
            let service = SignatureService::from_key_file(&key)?;
            let document: Value = serde_json::from_str(&read_input(&bundle)?)
                .context("Input is not valid JSON")?;
            let signed = attach_signature(
                document,
                &service,
                &SignerIdentity {
                    value: signer,
                    system: None,
                },
            )?;
            println!("{}", serde_json::to_string_pretty(&signed)?);
        }

        Commands::Verify { bundle, key } => {
            let pem = std::fs::read_to_string(&key)
                .with_context(|| format!("Failed to read {}", key.display()))?;
            let verifying_key = SignatureService::public_key_from_pem(&pem)
                .or_else(|_| {
                    SignatureService::from_pkcs8_pem(&pem).map(|s| *s.verifying_key())
                })
                .context("Key file is neither an SPKI public key nor a PKCS#8 key pair")?;
            let registry = StaticKeyRegistry::new(verifying_key);

            let document: Value = serde_json::from_str(&read_input(&bundle)?)
                .context("Input is not valid JSON")?;
            let verified = verify_signature(&document, &registry)?;
            println!("{}", serde_json::json!({ "verified": verified }));
            if !verified {
                std::process::exit(1);
            }
        }

        Commands::Canonical { file } => {
            let document: Value = serde_json::from_str(&read_input(&file)?)
                .context("Input is not valid JSON")?;
            println!("{}", siegel_canonical::canonicalize_to_string(&document)?);
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }
}
