//! Digest algorithm registry keyed by public-key algorithm OID.
//!
//! Each certificate's public key algorithm dictates the one digest family the
//! provider will accept for it. The registry maps that OID to the provider's
//! hash constant and to a stable symbolic key used in multi-hash maps.

use serde::Serialize;

use crate::error::{CadesError, Result};

/// Provider constant for GOST R 34.11-94 (CryptoPro parameters).
pub const HASH_ALGORITHM_GOST_3411: u32 = 100;
/// Provider constant for GOST R 34.11-2012, 256-bit output.
pub const HASH_ALGORITHM_GOST_3411_2012_256: u32 = 101;
/// Provider constant for GOST R 34.11-2012, 512-bit output.
pub const HASH_ALGORITHM_GOST_3411_2012_512: u32 = 102;

/// Static description of one digest family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlgorithmDescriptor {
    /// Stable key used in multi-hash maps.
    pub key: &'static str,
    /// Older symbolic names accepted on lookup.
    pub aliases: &'static [&'static str],
    /// Public key algorithm OID of certificates using this family.
    pub oid: &'static str,
    /// Opaque hash algorithm constant passed to the provider.
    pub provider_id: u32,
    /// Human readable label.
    pub label: &'static str,
    /// Digest output length in bytes.
    pub output_len: usize,
    /// XML-DSig signature method URI.
    pub xml_signature_method: &'static str,
    /// XML-DSig digest method URI.
    pub xml_digest_method: &'static str,
    /// Understood by every provider version.
    pub legacy: bool,
}

impl AlgorithmDescriptor {
    /// Whether `name` is this descriptor's key or one of its aliases.
    pub fn answers_to(&self, name: &str) -> bool {
        self.key == name || self.aliases.contains(&name)
    }
}

static REGISTRY: [AlgorithmDescriptor; 3] = [
    AlgorithmDescriptor {
        key: "legacy",
        aliases: &["v2001"],
        oid: "1.2.643.2.2.19",
        provider_id: HASH_ALGORITHM_GOST_3411,
        label: "GOST R 34.10-2001",
        output_len: 32,
        xml_signature_method: "urn:ietf:params:xml:ns:cpxmlsec:algorithms:gostr34102001-gostr3411",
        xml_digest_method: "urn:ietf:params:xml:ns:cpxmlsec:algorithms:gostr3411",
        legacy: true,
    },
    AlgorithmDescriptor {
        key: "v256",
        aliases: &["v2012"],
        oid: "1.2.643.7.1.1.1.1",
        provider_id: HASH_ALGORITHM_GOST_3411_2012_256,
        label: "GOST R 34.10-2012 (256-bit key)",
        output_len: 32,
        xml_signature_method: "urn:ietf:params:xml:ns:cpxmlsec:algorithms:gostr34102012-gostr34112012-256",
        xml_digest_method: "urn:ietf:params:xml:ns:cpxmlsec:algorithms:gostr34112012-256",
        legacy: false,
    },
    AlgorithmDescriptor {
        key: "v512",
        aliases: &["v2012Strong"],
        oid: "1.2.643.7.1.1.1.2",
        provider_id: HASH_ALGORITHM_GOST_3411_2012_512,
        label: "GOST R 34.10-2012 (512-bit key)",
        output_len: 64,
        xml_signature_method: "urn:ietf:params:xml:ns:cpxmlsec:algorithms:gostr34102012-gostr34112012-512",
        xml_digest_method: "urn:ietf:params:xml:ns:cpxmlsec:algorithms:gostr34112012-512",
        legacy: false,
    },
];

/// All registered descriptors, in registry order.
pub fn all() -> &'static [AlgorithmDescriptor] {
    &REGISTRY
}

/// Descriptors every provider version understands.
pub fn legacy() -> impl Iterator<Item = &'static AlgorithmDescriptor> {
    REGISTRY.iter().filter(|d| d.legacy)
}

/// Resolve a descriptor by certificate public key algorithm OID.
pub fn resolve_oid(oid: &str) -> Result<&'static AlgorithmDescriptor> {
    let oid = oid.trim();
    REGISTRY
        .iter()
        .find(|d| d.oid == oid)
        .ok_or_else(|| CadesError::UnknownAlgorithm(format!("no digest registered for OID {oid}")))
}

/// Resolve a descriptor by symbolic key or alias.
pub fn resolve_key(key: &str) -> Result<&'static AlgorithmDescriptor> {
    REGISTRY
        .iter()
        .find(|d| d.answers_to(key))
        .ok_or_else(|| CadesError::UnknownAlgorithm(format!("unknown algorithm key '{key}'")))
}
