//! Single and multi-algorithm hashing over buffers and chunk sources.

use base64::Engine;
use cades_sign_core::algorithm::AlgorithmDescriptor;
use cades_sign_core::{CadesError, ChunkSource, DigestValue, MultiHash, Provider, Result};
use tokio_util::sync::CancellationToken;

use crate::session::Session;

/// Provider hash object bound to one algorithm.
///
/// Owned by the operation that created it. Reading the value consumes the
/// handle, so a digest is finalized at most once.
pub struct DigestHandle<H> {
    descriptor: &'static AlgorithmDescriptor,
    hash: H,
}

impl<H> DigestHandle<H> {
    pub fn descriptor(&self) -> &'static AlgorithmDescriptor {
        self.descriptor
    }

    pub(crate) fn into_hash(self) -> H {
        self.hash
    }
}

impl<P: Provider> Session<P> {
    /// Digest of `payload` under each of `algorithms`, keyed by symbolic key.
    #[tracing::instrument(
        skip(self, payload, algorithms),
        fields(payload_len = payload.len(), algorithms = algorithms.len())
    )]
    pub async fn hash(
        &self,
        payload: &[u8],
        algorithms: &[&'static AlgorithmDescriptor],
    ) -> Result<MultiHash> {
        async {
            let mut handles = self.open_digests(algorithms).await?;
            if !payload.is_empty() {
                let encoded = base64::engine::general_purpose::STANDARD.encode(payload);
                for handle in &mut handles {
                    self.feed(handle, &encoded).await?;
                }
            }
            self.finalize_all(handles).await
        }
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Hashing failed"))
    }

    /// Digest of a chunked payload under each of `algorithms`.
    ///
    /// Every chunk is fed into all handles before the next one is pulled.
    /// A read failure, provider failure, cancellation or out-of-order chunk
    /// discards every handle and no partial result is returned.
    #[tracing::instrument(
        skip(self, source, algorithms, cancel),
        fields(total_len = source.total_len(), chunks = source.chunk_count())
    )]
    pub async fn hash_chunks<S: ChunkSource + ?Sized>(
        &self,
        source: &mut S,
        algorithms: &[&'static AlgorithmDescriptor],
        cancel: &CancellationToken,
    ) -> Result<MultiHash> {
        async {
            let mut handles = self.open_digests(algorithms).await?;
            self.feed_chunks(source, &mut handles, cancel).await?;
            self.finalize_all(handles).await
        }
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Chunked hashing failed"))
    }

    /// [`hash`](Self::hash) with the algorithms the provider supports.
    pub async fn hash_supported(&self, payload: &[u8]) -> Result<MultiHash> {
        let algorithms = self.supported_algorithms().await?;
        self.hash(payload, &algorithms).await
    }

    /// [`hash_chunks`](Self::hash_chunks) with the algorithms the provider
    /// supports.
    pub async fn hash_supported_chunks<S: ChunkSource + ?Sized>(
        &self,
        source: &mut S,
        cancel: &CancellationToken,
    ) -> Result<MultiHash> {
        let algorithms = self.supported_algorithms().await?;
        self.hash_chunks(source, &algorithms, cancel).await
    }

    /// New incremental digest for `descriptor`.
    pub async fn open_digest(
        &self,
        descriptor: &'static AlgorithmDescriptor,
    ) -> Result<DigestHandle<P::Hash>> {
        let hash = self
            .call("create_hash", self.provider.create_hash(descriptor.provider_id))
            .await?;
        Ok(DigestHandle { descriptor, hash })
    }

    async fn open_digests(
        &self,
        algorithms: &[&'static AlgorithmDescriptor],
    ) -> Result<Vec<DigestHandle<P::Hash>>> {
        let mut handles: Vec<DigestHandle<P::Hash>> = Vec::with_capacity(algorithms.len());
        for &descriptor in algorithms {
            if handles.iter().any(|h| h.descriptor.key == descriptor.key) {
                continue;
            }
            handles.push(self.open_digest(descriptor).await?);
        }
        Ok(handles)
    }

    /// Feed base64-encoded data into `handle`.
    pub async fn feed(&self, handle: &mut DigestHandle<P::Hash>, data: &str) -> Result<()> {
        self.call("hash_update", self.provider.hash_update(&mut handle.hash, data))
            .await
    }

    /// Pull every chunk of `source` into `handles`, enforcing gap-free order.
    pub(crate) async fn feed_chunks<S: ChunkSource + ?Sized>(
        &self,
        source: &mut S,
        handles: &mut [DigestHandle<P::Hash>],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let expected = source.chunk_count();
        let mut next_index = 0u64;
        loop {
            if cancel.is_cancelled() {
                tracing::debug!(next_index, "Hashing cancelled");
                return Err(CadesError::Cancelled);
            }
            let chunk = source
                .next_chunk()
                .await
                .map_err(|err| CadesError::ChunkRead {
                    index: next_index,
                    source: err,
                })?;
            let Some(chunk) = chunk else { break };

            if chunk.index != next_index {
                return Err(CadesError::ChunkOrder(format!(
                    "expected chunk {next_index}, got {}",
                    chunk.index
                )));
            }
            if next_index >= expected {
                return Err(CadesError::ChunkOrder(format!(
                    "source yielded more than the {expected} chunks it announced"
                )));
            }
            for handle in handles.iter_mut() {
                self.feed(handle, &chunk.data).await?;
            }
            tracing::debug!(index = chunk.index, len = chunk.len, "Chunk hashed");
            next_index += 1;
        }
        if next_index != expected {
            return Err(CadesError::ChunkOrder(format!(
                "source ended after {next_index} of {expected} chunks"
            )));
        }
        Ok(())
    }

    /// Read the value of a handle, consuming it.
    pub async fn finalize(&self, handle: DigestHandle<P::Hash>) -> Result<DigestValue> {
        let value = self
            .call("hash_value", self.provider.hash_value(&handle.hash))
            .await?;
        Ok(DigestValue::new(value))
    }

    async fn finalize_all(&self, handles: Vec<DigestHandle<P::Hash>>) -> Result<MultiHash> {
        let mut result = MultiHash::new();
        for handle in handles {
            let key = handle.descriptor.key;
            result.insert(key, self.finalize(handle).await?);
        }
        tracing::debug!(entries = result.len(), "Digests finalized");
        Ok(result)
    }
}
