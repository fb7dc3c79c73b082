//! Environment variable names used by this crate for convenient
//! configuration from services.
//!
//! These are purely helpers; the handler types take their configuration
//! explicitly and never read the environment themselves.

/// Google Cloud project used to build trace resource names.
pub const GOOGLE_CLOUD_PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
