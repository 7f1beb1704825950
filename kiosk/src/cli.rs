//! # CLI Interface
//!
//! Defines the command-line argument structure for `aperture-kiosk` using
//! `clap` derive. Supports three subcommands: `run`, `encode`, and
//! `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Aperture authorization kiosk.
///
/// Runs one biometric-gated authorization session: match a face against
/// the enrolled templates, scan a payment code, sign the transfer with the
/// local wallet, and render the signed artifact as an output code.
#[derive(Parser, Debug)]
#[command(
    name = "aperture-kiosk",
    about = "Aperture authorization kiosk",
    version,
    propagate_version = true
)]
pub struct ApertureKioskCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the kiosk binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one authorization session to a terminal state.
    Run(RunArgs),
    /// Encode a payment request into a visual code image, for testing the
    /// scanning side of a kiosk.
    Encode(EncodeArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory of PGM frames replayed as the camera feed.
    #[arg(long, short = 'f', env = "APERTURE_FRAMES_DIR")]
    pub frames_dir: PathBuf,

    /// Path to the enrollment store (JSON array of name/template records).
    #[arg(long, env = "APERTURE_ENROLLMENT", default_value = "enrollment.json")]
    pub enrollment: PathBuf,

    /// Path to the wallet store holding the base58 private key.
    ///
    /// **Never pass the key itself on the command line** — the store file
    /// is the only supported channel.
    #[arg(long, env = "APERTURE_WALLET", default_value = "wallet.json")]
    pub wallet: PathBuf,

    /// Ledger RPC endpoint for the anchor fetch.
    #[arg(long, env = "APERTURE_RPC_URL", default_value = "http://127.0.0.1:8899")]
    pub rpc_url: String,

    /// Where to write the signed output code (PGM).
    #[arg(long, short = 'o', default_value = "signed_code.pgm")]
    pub out: PathBuf,

    /// Submit the signed transaction to the ledger after rendering.
    #[arg(long, default_value_t = false)]
    pub submit: bool,

    /// External text-to-speech command; narrations go to stdout when unset.
    #[arg(long, env = "APERTURE_TTS_COMMAND")]
    pub tts_command: Option<String>,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "APERTURE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Frame polls allowed while authenticating.
    #[arg(long, default_value_t = aperture_core::config::DEFAULT_AUTH_ATTEMPTS)]
    pub auth_attempts: u32,

    /// Frame polls allowed while scanning for a payment code.
    #[arg(long, default_value_t = aperture_core::config::DEFAULT_SCAN_ATTEMPTS)]
    pub scan_attempts: u32,
}

/// Arguments for the `encode` subcommand.
#[derive(Parser, Debug)]
pub struct EncodeArgs {
    /// Base58-encoded recipient identifier.
    #[arg(long)]
    pub recipient: String,

    /// Amount in whole coins.
    #[arg(long)]
    pub amount: f64,

    /// Where to write the request code (PGM).
    #[arg(long, short = 'o', default_value = "request_code.pgm")]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        ApertureKioskCli::command().debug_assert();
    }

    #[test]
    fn run_parses_with_only_frames_dir() {
        let cli =
            ApertureKioskCli::try_parse_from(["aperture-kiosk", "run", "--frames-dir", "/tmp/f"])
                .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.frames_dir, PathBuf::from("/tmp/f"));
                assert!(!args.submit);
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn encode_requires_recipient_and_amount() {
        assert!(ApertureKioskCli::try_parse_from(["aperture-kiosk", "encode"]).is_err());
        assert!(ApertureKioskCli::try_parse_from([
            "aperture-kiosk",
            "encode",
            "--recipient",
            "abc",
            "--amount",
            "1.5",
        ])
        .is_ok());
    }
}
