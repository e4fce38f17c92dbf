//! Shared wire types and errors for the credential vault crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
