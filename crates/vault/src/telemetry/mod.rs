//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No secret material** in any span attribute or log field: not the
//!   passphrase, not a plaintext API key, not a derived key, and not an encrypted
//!   credential string. Identify credentials by `user_id` and `provider` only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence.

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
