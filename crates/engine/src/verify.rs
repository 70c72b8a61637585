//! Signature verification.

use base64::Engine;
use cades_sign_core::{CadesError, Provider, Result, Verification};

use crate::session::Session;

/// Separate "checked and rejected" from "could not check".
fn settle(outcome: Result<()>) -> Result<Verification> {
    match outcome {
        Ok(()) => Ok(Verification::Valid),
        Err(CadesError::InvalidSignature(reason)) => Ok(Verification::Invalid(reason)),
        Err(err) => Err(err),
    }
}

fn collapse(outcome: Result<Verification>) -> bool {
    match outcome {
        Ok(Verification::Valid) => true,
        Ok(Verification::Invalid(reason)) => {
            tracing::warn!(%reason, "Signature rejected");
            false
        }
        Err(err) => {
            tracing::error!(error = %err, "Verification failed");
            false
        }
    }
}

impl<P: Provider> Session<P> {
    /// Check a detached signature over `payload`. Never fails: provider
    /// errors and invalid signatures both yield `false`.
    pub async fn verify(&self, signature: &str, payload: &[u8]) -> bool {
        collapse(self.verify_detailed(signature, payload).await)
    }

    /// Check a detached signature; the provider rehashes `payload` with the
    /// algorithm named inside the signature.
    #[tracing::instrument(skip(self, signature, payload), fields(payload_len = payload.len()))]
    pub async fn verify_detailed(&self, signature: &str, payload: &[u8]) -> Result<Verification> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(payload);
        let outcome = self
            .call(
                "verify_detached",
                self.provider
                    .verify_detached(&encoded, signature, self.config.signature_profile),
            )
            .await;
        let verification = settle(outcome)?;
        tracing::debug!(valid = verification.is_valid(), "Detached signature checked");
        Ok(verification)
    }

    /// Check a signature against a digest the engine computes with the
    /// algorithm of the cached certificate `thumbprint`.
    pub async fn verify_with_certificate(
        &self,
        thumbprint: &str,
        signature: &str,
        payload: &[u8],
    ) -> bool {
        collapse(
            self.verify_with_certificate_detailed(thumbprint, signature, payload)
                .await,
        )
    }

    #[tracing::instrument(skip(self, signature, payload), fields(payload_len = payload.len()))]
    pub async fn verify_with_certificate_detailed(
        &self,
        thumbprint: &str,
        signature: &str,
        payload: &[u8],
    ) -> Result<Verification> {
        let record = self.find_certificate(thumbprint)?;
        let descriptor = record.algorithm()?;
        let mut handle = self.open_digest(descriptor).await?;
        if !payload.is_empty() {
            let encoded = base64::engine::general_purpose::STANDARD.encode(payload);
            self.feed(&mut handle, &encoded).await?;
        }
        let outcome = self
            .call(
                "verify_hash",
                self.provider.verify_hash(
                    handle.into_hash(),
                    signature,
                    self.config.signature_profile,
                ),
            )
            .await;
        settle(outcome)
    }

    /// Check an enveloped XML signature.
    #[tracing::instrument(skip(self, signed_document), fields(document_len = signed_document.len()))]
    pub async fn verify_embedded(&self, signed_document: &str) -> bool {
        let outcome = self
            .call("verify_xml", self.provider.verify_xml(signed_document))
            .await;
        collapse(settle(outcome))
    }
}
