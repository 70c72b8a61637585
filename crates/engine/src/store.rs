//! Certificate store enumeration and the session certificate cache.

use std::sync::Arc;

use cades_sign_core::{CadesError, CertificateRecord, DistinguishedName, Provider, Result};

use crate::session::{CertificateCache, Session};

impl<P: Provider> Session<P> {
    /// Enumerate the configured store and replace the certificate cache.
    ///
    /// Only certificates with an accessible private key that pass the
    /// provider's validity check are kept. The store is closed on every
    /// path; when both enumeration and closing fail, the enumeration error
    /// wins and the close error is logged.
    #[tracing::instrument(skip(self), fields(store = %self.config.store.name))]
    pub async fn list_signing_certificates(&self) -> Result<CertificateCache<P::Certificate>> {
        let store_config = &self.config.store;
        let store = self
            .call(
                "open_store",
                self.provider.open_store(
                    store_config.location,
                    &store_config.name,
                    store_config.key_usage,
                ),
            )
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to open certificate store"))?;

        let collected = self.collect_records(&store).await;
        let closed = self.call("close_store", self.provider.close_store(store)).await;

        let records = match (collected, closed) {
            (Ok(records), Ok(())) => records,
            (Ok(_), Err(close_err)) => {
                tracing::error!(error = %close_err, "Failed to close certificate store");
                return Err(close_err);
            }
            (Err(err), Ok(())) => {
                tracing::error!(error = %err, "Failed to enumerate certificates");
                return Err(err);
            }
            (Err(err), Err(close_err)) => {
                tracing::warn!(error = %close_err, "Failed to close certificate store after an earlier error");
                tracing::error!(error = %err, "Failed to enumerate certificates");
                return Err(err);
            }
        };

        let records = Arc::new(records);
        *self.cache.write() = Arc::clone(&records);
        tracing::info!(count = records.len(), "Certificate cache refreshed");
        Ok(records)
    }

    async fn collect_records(
        &self,
        store: &P::Store,
    ) -> Result<Vec<CertificateRecord<P::Certificate>>> {
        let handles = self
            .call("store_certificates", self.provider.store_certificates(store))
            .await?;
        tracing::debug!(entries = handles.len(), "Enumerated store");

        let mut records = Vec::with_capacity(handles.len());
        for handle in handles {
            let info = self
                .call("certificate_info", self.provider.certificate_info(&handle))
                .await?;
            let record = CertificateRecord {
                subject: DistinguishedName::parse(&info.subject_name),
                issuer: DistinguishedName::parse(&info.issuer_name),
                thumbprint: info.thumbprint,
                valid_to: info.valid_to,
                serial_number: info.serial_number,
                has_private_key: info.has_private_key,
                is_valid: info.is_valid,
                public_key_algorithm_oid: info.public_key_algorithm_oid,
                handle,
            };
            if record.is_usable() {
                records.push(record);
            } else {
                tracing::debug!(
                    thumbprint = %record.thumbprint,
                    has_private_key = record.has_private_key,
                    is_valid = record.is_valid,
                    "Skipping certificate"
                );
            }
        }
        Ok(records)
    }

    /// Current cache snapshot; empty until the store has been listed.
    pub fn certificates(&self) -> CertificateCache<P::Certificate> {
        Arc::clone(&self.cache.read())
    }

    /// Cached certificate with the given thumbprint.
    pub fn find_certificate(&self, thumbprint: &str) -> Result<CertificateRecord<P::Certificate>> {
        self.cache
            .read()
            .iter()
            .find(|record| record.matches_thumbprint(thumbprint))
            .cloned()
            .ok_or_else(|| CadesError::UnknownCertificate {
                thumbprint: thumbprint.to_string(),
            })
    }
}
