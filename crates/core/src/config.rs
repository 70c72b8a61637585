//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::error::{CadesError, Result};
use crate::provider::{KeyUsage, SignatureProfile, StoreLocation};

/// Provider type queried for version metadata (GOST R 34.10-2001 DH).
pub const DEFAULT_PROBE_PROVIDER_TYPE: u32 = 75;
/// First provider major version able to hash with every registered family.
pub const DEFAULT_MULTI_ALGORITHM_MIN_MAJOR: u32 = 4;

/// Certificate store selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub location: StoreLocation,
    pub name: String,
    pub key_usage: KeyUsage,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: StoreLocation::CurrentUser,
            name: "My".to_string(),
            key_usage: KeyUsage::DigitalSignature,
        }
    }
}

/// Tunables for a signing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bytes per chunk when hashing large payloads.
    pub chunk_size: usize,
    /// Upper bound for a single provider call. `None` waits forever.
    pub provider_timeout: Option<Duration>,
    pub multi_algorithm_min_major: u32,
    pub probe_provider_type: u32,
    pub store: StoreConfig,
    pub signature_profile: SignatureProfile,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            provider_timeout: Some(Duration::from_secs(60)),
            multi_algorithm_min_major: DEFAULT_MULTI_ALGORITHM_MIN_MAJOR,
            probe_provider_type: DEFAULT_PROBE_PROVIDER_TYPE,
            store: StoreConfig::default(),
            signature_profile: SignatureProfile::CadesBes,
        }
    }
}

impl EngineConfig {
    /// Parse from JSON; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CadesError::Config(format!("malformed engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(CadesError::Config("chunk_size must be positive".into()));
        }
        if self.store.name.trim().is_empty() {
            return Err(CadesError::Config("store name must not be empty".into()));
        }
        if self.provider_timeout == Some(Duration::ZERO) {
            return Err(CadesError::Config(
                "provider_timeout must be positive (use null to disable)".into(),
            ));
        }
        Ok(())
    }
}
