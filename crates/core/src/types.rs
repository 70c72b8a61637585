//! Common types and result structures.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::algorithm::{self, AlgorithmDescriptor};
use crate::dn::DistinguishedName;
use crate::error::Result;

/// A signing certificate retained in the session cache.
///
/// `H` is the provider's live certificate handle.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateRecord<H> {
    pub thumbprint: String,
    pub subject: DistinguishedName,
    pub issuer: DistinguishedName,
    pub valid_to: String,
    pub serial_number: String,
    pub has_private_key: bool,
    pub is_valid: bool,
    pub public_key_algorithm_oid: String,
    #[serde(skip)]
    pub handle: H,
}

impl<H> CertificateRecord<H> {
    /// Whether the record may be kept in the session cache.
    pub fn is_usable(&self) -> bool {
        self.has_private_key && self.is_valid
    }

    /// Digest family this certificate's key requires.
    pub fn algorithm(&self) -> Result<&'static AlgorithmDescriptor> {
        algorithm::resolve_oid(&self.public_key_algorithm_oid)
    }

    /// Thumbprint comparison ignoring case and embedded whitespace.
    pub fn matches_thumbprint(&self, thumbprint: &str) -> bool {
        normalize_thumbprint(&self.thumbprint) == normalize_thumbprint(thumbprint)
    }
}

fn normalize_thumbprint(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Finalized digest value as reported by the provider (base64).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DigestValue(String);

impl DigestValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DigestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest values keyed by algorithm symbolic key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiHash(BTreeMap<String, DigestValue>);

impl MultiHash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: DigestValue) {
        self.0.insert(key.into(), value);
    }

    /// Entry stored under `key` verbatim.
    pub fn get(&self, key: &str) -> Option<&DigestValue> {
        self.0.get(key)
    }

    /// Entry for `descriptor`, found by its key or any of its aliases.
    pub fn get_for(&self, descriptor: &AlgorithmDescriptor) -> Option<&DigestValue> {
        self.0.get(descriptor.key).or_else(|| {
            descriptor
                .aliases
                .iter()
                .find_map(|alias| self.0.get(*alias))
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, DigestValue)> for MultiHash {
    fn from_iter<T: IntoIterator<Item = (String, DigestValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Detached CAdES signature, base64 without line breaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetachedSignature(String);

impl DetachedSignature {
    /// Normalize raw provider output.
    ///
    /// Providers wrap base64 at fixed width with CR-LF; the wrapping carries no
    /// meaning, so every CR and LF is removed.
    pub fn from_provider(raw: &str) -> Self {
        Self(raw.chars().filter(|c| *c != '\r' && *c != '\n').collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DetachedSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a verification that keeps invalid signatures apart from errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Verification {
    Valid,
    Invalid(String),
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid)
    }
}
