//! `krypt` command-line entry point.
//!
//! Startup sequence:
//! 1. Parse flags and load [`Config`] from `KRYPT_*` environment variables.
//! 2. Initialise logging on stderr.
//! 3. Build the [`EnvelopeCodec`] and run the requested operation.
//!
//! Exit status: `0` on success, `2` for invalid input or configuration, `1`
//! for crypto and I/O failures.

mod cli;
mod config;
mod run;
mod telemetry;

use std::process::ExitCode;

use clap::Parser;
use krypt::{EnvelopeCodec, KryptError};

use cli::Args;
use config::Config;

/// Exit status for configuration errors, matching invalid-argument failures.
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = match Config::load(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Telemetry is not yet up; write to stderr directly.
            eprintln!("ERROR: configuration invalid: {e:#}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    if let Err(e) = telemetry::init(&cfg.log_level) {
        eprintln!("ERROR: {e:#}");
        return ExitCode::FAILURE;
    }

    // -----------------------------------------------------------------------
    // 3. Codec
    // -----------------------------------------------------------------------
    let settings = match cfg.codec_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("ERROR: configuration invalid: {e:#}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    let codec = EnvelopeCodec::new(settings);

    match run::run(args.mode(), args.out.as_deref(), &codec).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            let code = e
                .downcast_ref::<KryptError>()
                .map(KryptError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}
