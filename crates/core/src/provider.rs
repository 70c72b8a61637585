//! Capability interface of the external crypto provider.
//!
//! The engine never sees key material. Everything that touches a private key,
//! the certificate store or the digest math goes through this trait. Backends
//! return [`anyhow::Error`] and tag well-known failures with [`ProviderFault`]
//! so the engine can classify them.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Signature profile requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureProfile {
    /// CAdES-BES, the basic electronic signature.
    CadesBes,
}

impl SignatureProfile {
    /// Provider constant for the profile.
    pub fn provider_id(self) -> u32 {
        match self {
            SignatureProfile::CadesBes => 1,
        }
    }
}

/// Which certificate store to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreLocation {
    CurrentUser,
    LocalMachine,
}

/// Key usage filter applied while opening a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyUsage {
    DigitalSignature,
    Any,
}

/// Provider version as reported by its metadata query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
}

impl std::fmt::Display for ProviderVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// Certificate properties read from a live provider handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub thumbprint: String,
    pub subject_name: String,
    pub issuer_name: String,
    pub valid_to: String,
    pub serial_number: String,
    pub has_private_key: bool,
    pub is_valid: bool,
    pub public_key_algorithm_oid: String,
}

/// Failures a backend can flag explicitly.
///
/// Anything not tagged is treated as a generic provider error.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProviderFault {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// The signature was checked and does not match.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// Async capability surface of a crypto provider.
///
/// Associated handle types are opaque to the engine. Hash handles are owned
/// by exactly one operation; certificate handles may be cloned into the
/// session cache.
#[async_trait]
pub trait Provider: Send + Sync {
    type Store: Send;
    type Certificate: Clone + Send + Sync;
    type Hash: Send;
    type Signer: Send + Sync;

    /// Version metadata for the given provider type.
    async fn version(&self, provider_type: u32) -> Result<ProviderVersion>;

    async fn open_store(
        &self,
        location: StoreLocation,
        name: &str,
        usage: KeyUsage,
    ) -> Result<Self::Store>;

    async fn store_certificates(&self, store: &Self::Store) -> Result<Vec<Self::Certificate>>;

    async fn close_store(&self, store: Self::Store) -> Result<()>;

    async fn certificate_info(&self, certificate: &Self::Certificate) -> Result<CertificateInfo>;

    /// New incremental hash object for a provider hash constant.
    async fn create_hash(&self, algorithm: u32) -> Result<Self::Hash>;

    /// Feed base64-encoded data; the provider decodes it before hashing.
    async fn hash_update(&self, hash: &mut Self::Hash, base64_data: &str) -> Result<()>;

    /// Digest value (base64) of everything fed so far.
    async fn hash_value(&self, hash: &Self::Hash) -> Result<String>;

    /// Hash object carrying an externally computed digest value.
    async fn hash_from_value(&self, algorithm: u32, value: &str) -> Result<Self::Hash>;

    /// Signer bound to the certificate's private key.
    async fn create_signer(&self, certificate: &Self::Certificate) -> Result<Self::Signer>;

    /// Detached signature over a finalized hash. Output may contain line breaks.
    async fn sign_hash(
        &self,
        hash: Self::Hash,
        signer: &Self::Signer,
        profile: SignatureProfile,
    ) -> Result<String>;

    /// Check a detached signature against a finalized hash.
    async fn verify_hash(
        &self,
        hash: Self::Hash,
        signature: &str,
        profile: SignatureProfile,
    ) -> Result<()>;

    /// Check a detached signature against base64 content; the provider picks
    /// the digest algorithm named inside the signature.
    async fn verify_detached(
        &self,
        base64_content: &str,
        signature: &str,
        profile: SignatureProfile,
    ) -> Result<()>;

    /// Enveloped XML-DSig signature.
    async fn sign_xml(
        &self,
        document: &str,
        signer: &Self::Signer,
        signature_method: &str,
        digest_method: &str,
    ) -> Result<String>;

    /// Verify an enveloped XML-DSig signature.
    async fn verify_xml(&self, signed_document: &str) -> Result<()>;
}
