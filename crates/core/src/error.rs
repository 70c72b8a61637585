//! Error taxonomy shared by the engine and its callers.

use std::time::Duration;

use thiserror::Error;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, CadesError>;

/// Typed failures surfaced by the signing engine.
///
/// Backend crates report failures as [`anyhow::Error`]; the engine classifies
/// them into these variants (see [`crate::provider::ProviderFault`]).
#[derive(Debug, Error)]
pub enum CadesError {
    #[error("Crypto provider is not available: {0}")]
    ProviderUnavailable(String),

    #[error("Access to certificate store denied: {0}")]
    StoreAccessDenied(String),

    #[error("Certificate not found in session cache: {thumbprint}")]
    UnknownCertificate { thumbprint: String },

    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("No digest computed for required algorithm '{key}'")]
    MissingHashForAlgorithm { key: String },

    #[error("Provider error during {operation}: {source:#}")]
    Provider {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Provider call '{operation}' timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Signature is invalid: {0}")]
    InvalidSignature(String),

    #[error("Chunk order violation: {0}")]
    ChunkOrder(String),

    #[error("Failed to read chunk {index}: {source:#}")]
    ChunkRead {
        index: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CadesError {
    /// Wrap a backend failure that happened during `operation`.
    pub fn provider(operation: &'static str, source: anyhow::Error) -> Self {
        CadesError::Provider { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_hash_names_the_key() {
        let err = CadesError::MissingHashForAlgorithm {
            key: "v256".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No digest computed for required algorithm 'v256'"
        );
    }

    #[test]
    fn provider_error_keeps_backend_chain() {
        let source = anyhow::anyhow!("0x8009200B").context("SignHash failed");
        let err = CadesError::provider("sign_hash", source);
        let text = err.to_string();
        assert!(text.contains("sign_hash"), "unexpected: {text}");
        assert!(text.contains("SignHash failed"), "unexpected: {text}");
        assert!(text.contains("0x8009200B"), "unexpected: {text}");
    }
}
