//! `vault` — credential vault binary entry point.
//!
//! `vault serve` (the default) startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing, optional OTLP).
//! 3. Build the [`CredentialCipher`] over the passphrase environment variable and
//!    report whether it is usable right now.
//! 4. Build the Axum router and start the HTTP server.
//!
//! `vault generate-key` prints a fresh random passphrase and exits.

mod config;
mod credentials;
mod crypto;
mod server;
mod telemetry;

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use config::Config;
use credentials::CredentialStore;
use crypto::{kdf::PBKDF2_ITERATIONS, CredentialCipher, EnvPassphrase};
use server::state::AppState;

/// Minimum byte count for `generate-key`: 16 bytes is 32 hex characters, the
/// shortest passphrase the cipher accepts.
const MIN_GENERATED_KEY_BYTES: usize = crypto::passphrase::MIN_PASSPHRASE_LEN / 2;

#[derive(Debug, Parser)]
#[command(name = "vault", version, about = "Encrypts third-party API keys at rest")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service (default).
    Serve,
    /// Print a random hex passphrase suitable for the encryption key variable.
    GenerateKey {
        /// Number of random bytes; the output has twice as many hex characters.
        #[arg(long, default_value_t = crypto::DEFAULT_KEY_LEN, value_parser = parse_key_bytes)]
        bytes: usize,
    },
}

fn parse_key_bytes(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{e}"))?;
    if n < MIN_GENERATED_KEY_BYTES {
        return Err(format!("must be at least {MIN_GENERATED_KEY_BYTES}"));
    }
    Ok(n)
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command.unwrap_or(Command::Serve) {
        Command::GenerateKey { bytes } => {
            println!("{}", crypto::generate_key(bytes));
            Ok(())
        }
        Command::Serve => serve().await,
    }
}

async fn serve() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        "credential vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Cipher
    // -----------------------------------------------------------------------
    let cipher = CredentialCipher::new(EnvPassphrase::new(cfg.passphrase_var.clone()));
    if !cipher.is_configured() {
        warn!(
            passphrase_var = %cfg.passphrase_var,
            "encryption passphrase is missing or too short; credential operations will fail until it is provisioned"
        );
    }
    warn!(
        iterations = PBKDF2_ITERATIONS,
        "PBKDF2 iteration count is kept for compatibility with stored credentials and is below current guidance"
    );

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(
        CredentialStore::new(cipher),
        Duration::from_secs(cfg.request_timeout_secs),
    );
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    telemetry::shutdown_telemetry();
    Ok(())
}
