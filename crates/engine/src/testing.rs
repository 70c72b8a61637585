//! Fixtures shared by the engine's unit tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use cades_sign_core::{Chunk, ChunkSource, EngineConfig};
use cades_sign_soft::{SoftCertificate, SoftProvider};

use crate::Session;

pub const OID_LEGACY: &str = "1.2.643.2.2.19";
pub const OID_V256: &str = "1.2.643.7.1.1.1.1";
pub const OID_V512: &str = "1.2.643.7.1.1.1.2";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn alice() -> SoftCertificate {
    SoftCertificate::new("CN=Alice, O=\"Roga i Kopyta, LLC\", C=RU", OID_V256)
}

pub fn bob() -> SoftCertificate {
    SoftCertificate::new("CN=Bob, C=RU", OID_LEGACY)
}

pub fn carol() -> SoftCertificate {
    SoftCertificate::new("CN=Carol+SN=Strong, C=RU", OID_V512)
}

/// Provider holding Alice (v256), Bob (legacy) and Carol (v512).
pub fn provider() -> SoftProvider {
    SoftProvider::new()
        .with_certificate(alice())
        .with_certificate(bob())
        .with_certificate(carol())
}

pub fn session(provider: SoftProvider) -> Session<SoftProvider> {
    init_tracing();
    Session::new(provider, EngineConfig::default()).unwrap()
}

pub fn session_with_timeout(provider: SoftProvider, timeout: Duration) -> Session<SoftProvider> {
    init_tracing();
    let config = EngineConfig {
        provider_timeout: Some(timeout),
        ..EngineConfig::default()
    };
    Session::new(provider, config).unwrap()
}

/// Session with the certificate cache already populated.
pub async fn listed_session(provider: SoftProvider) -> Session<SoftProvider> {
    let session = session(provider);
    session.list_signing_certificates().await.unwrap();
    session
}

pub fn count_calls(provider: &SoftProvider, operation: &str) -> usize {
    provider
        .calls()
        .into_iter()
        .filter(|call| *call == operation)
        .count()
}

/// Chunk source replaying a fixed list, whatever its indices.
pub struct ScriptedChunks {
    pub chunks: VecDeque<Chunk>,
    pub declared: u64,
}

impl ScriptedChunks {
    pub fn new(chunks: Vec<Chunk>, declared: u64) -> Self {
        Self {
            chunks: chunks.into(),
            declared,
        }
    }
}

pub fn chunk(index: u64, data: &[u8]) -> Chunk {
    use base64::Engine;
    Chunk {
        index,
        len: data.len(),
        data: base64::engine::general_purpose::STANDARD.encode(data),
    }
}

#[async_trait]
impl ChunkSource for ScriptedChunks {
    fn total_len(&self) -> u64 {
        self.chunks.iter().map(|c| c.len as u64).sum()
    }

    fn chunk_count(&self) -> u64 {
        self.declared
    }

    async fn next_chunk(&mut self) -> anyhow::Result<Option<Chunk>> {
        Ok(self.chunks.pop_front())
    }
}
