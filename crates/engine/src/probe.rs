//! Multi-algorithm capability probe.

use cades_sign_core::algorithm::{self, AlgorithmDescriptor};
use cades_sign_core::{CadesError, Provider, Result};

use crate::session::Session;

impl<P: Provider> Session<P> {
    /// Whether the provider can hash with every registered algorithm.
    ///
    /// Queries the provider version once; a major version below
    /// `multi_algorithm_min_major` means only the legacy family is usable.
    /// Successful answers are cached for the session, failures are not.
    #[tracing::instrument(skip(self), fields(provider_type = self.config.probe_provider_type))]
    pub async fn probe_multi_algorithm_support(&self) -> Result<bool> {
        let supported = self
            .multi_algorithm
            .get_or_try_init(|| async {
                let version = self
                    .call(
                        "version",
                        self.provider.version(self.config.probe_provider_type),
                    )
                    .await?;
                let supported = version.major >= self.config.multi_algorithm_min_major;
                tracing::info!(%version, supported, "Probed provider version");
                Ok::<_, CadesError>(supported)
            })
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Capability probe failed"))?;
        Ok(*supported)
    }

    /// Whether the provider answers at all. Never fails; every error is
    /// logged and reported as `false`. Not cached.
    #[tracing::instrument(skip(self), fields(provider_type = self.config.probe_provider_type))]
    pub async fn provider_available(&self) -> bool {
        let outcome = self
            .call(
                "version",
                self.provider.version(self.config.probe_provider_type),
            )
            .await;
        match outcome {
            Ok(version) => {
                tracing::debug!(%version, "Provider present");
                true
            }
            Err(err @ (CadesError::ProviderUnavailable(_) | CadesError::Timeout { .. })) => {
                tracing::warn!(error = %err, "Provider not available");
                false
            }
            Err(err) => {
                tracing::error!(error = %err, "Provider presence check failed");
                false
            }
        }
    }

    /// Algorithms the multi-hash path should compute on this provider.
    pub async fn supported_algorithms(&self) -> Result<Vec<&'static AlgorithmDescriptor>> {
        if self.probe_multi_algorithm_support().await? {
            Ok(algorithm::all().iter().collect())
        } else {
            Ok(algorithm::legacy().collect())
        }
    }
}
