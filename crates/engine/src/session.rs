//! Session state shared by all operations.

use std::future::Future;
use std::sync::Arc;

use cades_sign_core::{CertificateRecord, EngineConfig, Provider, Result};
use parking_lot::RwLock;
use tokio::sync::OnceCell;

use crate::call;

/// Snapshot of the certificate cache.
pub type CertificateCache<H> = Arc<Vec<CertificateRecord<H>>>;

/// One signing session against a provider.
///
/// The certificate cache is replaced wholesale by
/// [`list_signing_certificates`](Session::list_signing_certificates); readers
/// work on an `Arc` snapshot, so a refresh never disturbs operations in
/// flight. The capability probe result is remembered once it succeeds.
pub struct Session<P: Provider> {
    pub(crate) provider: P,
    pub(crate) config: EngineConfig,
    pub(crate) cache: RwLock<CertificateCache<P::Certificate>>,
    pub(crate) multi_algorithm: OnceCell<bool>,
}

impl<P: Provider> Session<P> {
    pub fn new(provider: P, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            chunk_size = config.chunk_size,
            timeout = ?config.provider_timeout,
            "Session created"
        );
        Ok(Self {
            provider,
            config,
            cache: RwLock::new(Arc::new(Vec::new())),
            multi_algorithm: OnceCell::new(),
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one provider call under the configured timeout.
    pub(crate) async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T> {
        call::call(self.config.provider_timeout, operation, fut).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cades_sign_core::CadesError;
    use cades_sign_soft::SoftProvider;

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            chunk_size: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Session::new(SoftProvider::new(), config),
            Err(CadesError::Config(_))
        ));
    }

    #[test]
    fn new_session_starts_with_empty_cache() {
        let session = Session::new(SoftProvider::new(), EngineConfig::default()).unwrap();
        assert!(session.cache.read().is_empty());
        assert!(session.multi_algorithm.get().is_none());
        assert!(session.provider().calls().is_empty());
    }
}
