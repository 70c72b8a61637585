//! Detached CAdES-BES and enveloped XML signing.

use base64::Engine;
use cades_sign_core::{
    CadesError, ChunkSource, DetachedSignature, DigestValue, MultiHash, Provider, Result,
    resolve_key,
};
use tokio_util::sync::CancellationToken;

use crate::session::Session;

impl<P: Provider> Session<P> {
    /// Sign `payload` with the cached certificate `thumbprint`.
    ///
    /// The digest family follows the certificate's public key algorithm.
    #[tracing::instrument(skip(self, payload), fields(payload_len = payload.len()))]
    pub async fn sign_data(&self, thumbprint: &str, payload: &[u8]) -> Result<DetachedSignature> {
        async {
            let record = self.find_certificate(thumbprint)?;
            let descriptor = record.algorithm()?;
            tracing::debug!(algorithm = descriptor.key, "Creating signer");
            let signer = self
                .call("create_signer", self.provider.create_signer(&record.handle))
                .await?;

            let mut handle = self.open_digest(descriptor).await?;
            if !payload.is_empty() {
                let encoded = base64::engine::general_purpose::STANDARD.encode(payload);
                self.feed(&mut handle, &encoded).await?;
            }
            self.sign_digest(handle.into_hash(), &signer).await
        }
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Signing failed"))
    }

    /// Sign a digest computed elsewhere.
    ///
    /// `hashes` must hold an entry for the certificate's algorithm, keyed by
    /// its symbolic key or one of its aliases.
    #[tracing::instrument(skip(self, hashes), fields(entries = hashes.len()))]
    pub async fn sign_precomputed_hash(
        &self,
        thumbprint: &str,
        hashes: &MultiHash,
    ) -> Result<DetachedSignature> {
        async {
            let record = self.find_certificate(thumbprint)?;
            let descriptor = record.algorithm()?;
            let value = hashes.get_for(descriptor).ok_or_else(|| {
                CadesError::MissingHashForAlgorithm {
                    key: descriptor.key.to_string(),
                }
            })?;
            let signer = self
                .call("create_signer", self.provider.create_signer(&record.handle))
                .await?;
            let hash = self
                .call(
                    "hash_from_value",
                    self.provider
                        .hash_from_value(descriptor.provider_id, value.as_str()),
                )
                .await?;
            self.sign_digest(hash, &signer).await
        }
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Signing precomputed hash failed"))
    }

    /// Sign a single digest value computed with the algorithm named `key`.
    pub async fn sign_hash_value(
        &self,
        thumbprint: &str,
        key: &str,
        value: DigestValue,
    ) -> Result<DetachedSignature> {
        let descriptor = resolve_key(key)?;
        let mut hashes = MultiHash::new();
        hashes.insert(descriptor.key, value);
        self.sign_precomputed_hash(thumbprint, &hashes).await
    }

    /// Hash a chunked payload with the certificate's algorithm and sign it.
    #[tracing::instrument(
        skip(self, source, cancel),
        fields(total_len = source.total_len(), chunks = source.chunk_count())
    )]
    pub async fn sign_file<S: ChunkSource + ?Sized>(
        &self,
        thumbprint: &str,
        source: &mut S,
        cancel: &CancellationToken,
    ) -> Result<DetachedSignature> {
        async {
            let record = self.find_certificate(thumbprint)?;
            let descriptor = record.algorithm()?;
            let signer = self
                .call("create_signer", self.provider.create_signer(&record.handle))
                .await?;

            let mut handle = self.open_digest(descriptor).await?;
            self.feed_chunks(source, std::slice::from_mut(&mut handle), cancel)
                .await?;
            self.sign_digest(handle.into_hash(), &signer).await
        }
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Signing file failed"))
    }

    /// Enveloped XML-DSig signature over `document`.
    #[tracing::instrument(skip(self, document), fields(document_len = document.len()))]
    pub async fn sign_xml(&self, thumbprint: &str, document: &str) -> Result<String> {
        async {
            let record = self.find_certificate(thumbprint)?;
            let descriptor = record.algorithm()?;
            let signer = self
                .call("create_signer", self.provider.create_signer(&record.handle))
                .await?;
            let signed = self
                .call(
                    "sign_xml",
                    self.provider.sign_xml(
                        document,
                        &signer,
                        descriptor.xml_signature_method,
                        descriptor.xml_digest_method,
                    ),
                )
                .await?;
            tracing::info!(signed_len = signed.len(), "XML document signed");
            Ok(signed)
        }
        .await
        .inspect_err(|e| tracing::error!(error = %e, "XML signing failed"))
    }

    async fn sign_digest(&self, hash: P::Hash, signer: &P::Signer) -> Result<DetachedSignature> {
        let raw = self
            .call(
                "sign_hash",
                self.provider
                    .sign_hash(hash, signer, self.config.signature_profile),
            )
            .await?;
        let signature = DetachedSignature::from_provider(&raw);
        tracing::info!(sig_len = signature.as_str().len(), "Signature created");
        Ok(signature)
    }
}
