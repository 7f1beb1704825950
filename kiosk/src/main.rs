// Copyright (c) 2026 Aperture Contributors. MIT License.
// See LICENSE for details.

//! # Aperture Kiosk
//!
//! Entry point for the `aperture-kiosk` binary. Parses CLI arguments,
//! initializes logging, loads the enrollment and wallet stores, and runs
//! one authorization session to a terminal state.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — run one authorization session
//! - `encode`  — render a payment request as a visual code image
//! - `version` — print build version information
//!
//! The process exit code reflects the session outcome, so shell wrappers
//! and supervisors can react without parsing logs: 0 signed, 2 auth
//! failed, 3 code timeout, 4 invalid request, 5 sign failed.

mod camera;
mod cli;
mod engine;
mod logging;
mod pgm;
mod rpc;
mod sinks;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use aperture_core::biometric::EnrollmentSet;
use aperture_core::capture::ExclusiveCamera;
use aperture_core::session::{
    AuthorizationSession, SessionConfig, SessionContext, SessionOutcome,
};
use aperture_core::transaction::{validate_amount, Pubkey, WalletKeypair, WalletSigner};
use aperture_core::transport::{GridCodec, TransactionRequest};

use camera::ReplayCamera;
use cli::{ApertureKioskCli, Commands};
use engine::LumaGridEngine;
use logging::LogFormat;
use rpc::JsonRpcLedger;
use sinks::{SpeechNarrator, TracingIndicator};

fn main() -> Result<ExitCode> {
    let cli = ApertureKioskCli::parse();

    match cli.command {
        Commands::Run(args) => run_session(args),
        Commands::Encode(args) => {
            encode_request(args)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => {
            print_version();
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Runs one authorization session against the configured stores and
/// collaborators.
fn run_session(args: cli::RunArgs) -> Result<ExitCode> {
    logging::init_logging(
        "aperture_kiosk=info,aperture_core=info",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        frames_dir = %args.frames_dir.display(),
        enrollment = %args.enrollment.display(),
        rpc_url = %args.rpc_url,
        "starting aperture-kiosk"
    );

    // --- Process-wide stores, loaded once ---
    let enrollment = EnrollmentSet::load(&args.enrollment).with_context(|| {
        format!("failed to load enrollment store {}", args.enrollment.display())
    })?;
    let wallet = WalletKeypair::load(&args.wallet)
        .with_context(|| format!("failed to load wallet store {}", args.wallet.display()))?;

    // --- Collaborators ---
    let camera = ExclusiveCamera::new(Arc::new(ReplayCamera::new(&args.frames_dir)));
    let engine = LumaGridEngine::new();
    let signer = WalletSigner::new(&wallet);
    let ledger = JsonRpcLedger::new(args.rpc_url.clone());
    let indicator = TracingIndicator;
    let narrator = SpeechNarrator::new(args.tts_command.clone());

    let ctx = SessionContext {
        camera: &camera,
        engine: &engine,
        enrollment: &enrollment,
        codec: GridCodec::new(),
        signer: &signer,
        ledger: &ledger,
        indicator: &indicator,
        narrator: &narrator,
    };

    let session = AuthorizationSession::new(SessionConfig {
        auth_attempts: args.auth_attempts,
        scan_attempts: args.scan_attempts,
        ..SessionConfig::default()
    });
    tracing::info!(session = %session.id(), "session starting");

    let outcome = session
        .run(&ctx)
        .context("could not open the capture device")?;

    let code = match outcome {
        SessionOutcome::Signed {
            artifact,
            code,
            identity,
        } => {
            pgm::write_frame(&args.out, &code)
                .with_context(|| format!("failed to write {}", args.out.display()))?;
            tracing::info!(
                identity = %identity,
                recipient = %artifact.recipient,
                lamports = artifact.lamports,
                out = %args.out.display(),
                "signed code written"
            );

            if args.submit {
                match ledger.submit(&artifact) {
                    Ok(signature) => tracing::info!(%signature, "transaction submitted"),
                    Err(e) => tracing::error!(error = %e, "submission failed"),
                }
            }
            ExitCode::SUCCESS
        }
        SessionOutcome::AuthFailed => {
            tracing::warn!("session ended: authentication failed");
            ExitCode::from(2)
        }
        SessionOutcome::CodeTimeout => {
            tracing::warn!("session ended: no payment code received");
            ExitCode::from(3)
        }
        SessionOutcome::Invalid(e) => {
            tracing::warn!(error = %e, "session ended: invalid payment request");
            ExitCode::from(4)
        }
        SessionOutcome::SignFailed(e) => {
            tracing::error!(error = %e, "session ended: signing failed");
            ExitCode::from(5)
        }
    };

    Ok(code)
}

/// Renders a payment request as a visual code image, for pointing a test
/// kiosk's camera at.
fn encode_request(args: cli::EncodeArgs) -> Result<()> {
    // Validate up front so nobody prints a code the kiosk will refuse.
    Pubkey::from_base58(&args.recipient)
        .with_context(|| format!("invalid recipient {}", args.recipient))?;
    validate_amount(args.amount).context("invalid amount")?;

    let request = TransactionRequest {
        recipient: args.recipient,
        amount: args.amount,
    };
    let frame = GridCodec::new()
        .encode(&request.to_bytes())
        .context("failed to encode the request")?;
    pgm::write_frame(&args.out, &frame)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    println!("Request code written to {}", args.out.display());
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("aperture-kiosk {}", env!("CARGO_PKG_VERSION"));
    println!("wire version   {}", aperture_core::config::WIRE_VERSION);
}
