//! In-process software provider.
//!
//! Implements the provider capability trait without any native crypto
//! service: certificates live in memory, digests are SHA-2 stand-ins and
//! signatures are keyed MAC tokens. It backs the engine's tests and lets the
//! engine run where no hardware provider is installed. Failure injection
//! hooks simulate legacy versions, denied store access, failing and hanging
//! calls.

pub mod certificate;
mod digest;
mod envelope;

use std::collections::VecDeque;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use base64::Engine;
use cades_sign_core::algorithm::{self, HASH_ALGORITHM_GOST_3411};
use cades_sign_core::{
    CertificateInfo, KeyUsage, Provider, ProviderFault, ProviderVersion, SignatureProfile,
    StoreLocation,
};
use parking_lot::Mutex;

pub use certificate::SoftCertificate;

use crate::digest::Hasher;

/// Major version from which the 2012 digest families are accepted.
const MODERN_MAJOR: u32 = 4;
/// Most recent calls kept in the journal.
const CALL_LOG_LIMIT: usize = 256;

/// Handle of an opened in-memory store.
#[derive(Debug)]
pub struct SoftStore {
    id: u64,
    certificates: Vec<SoftCertificate>,
}

/// Provider-side hash object.
pub struct SoftHash {
    algorithm: u32,
    state: HashState,
}

enum HashState {
    Streaming(Hasher),
    Fixed(Vec<u8>),
}

impl SoftHash {
    fn digest(&self) -> Vec<u8> {
        match &self.state {
            HashState::Streaming(h) => h.snapshot(),
            HashState::Fixed(v) => v.clone(),
        }
    }
}

/// Signer bound to one certificate.
#[derive(Debug, Clone)]
pub struct SoftSigner {
    certificate: SoftCertificate,
}

#[derive(Default)]
struct Journal {
    calls: VecDeque<&'static str>,
    open_stores: Vec<u64>,
    next_store_id: u64,
}

/// Software implementation of [`Provider`].
pub struct SoftProvider {
    version: ProviderVersion,
    certificates: Vec<SoftCertificate>,
    available: bool,
    deny_store_access: bool,
    failing: Vec<&'static str>,
    stalling: Vec<&'static str>,
    journal: Mutex<Journal>,
}

impl Default for SoftProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftProvider {
    /// Modern provider (version 5.0) with an empty store.
    pub fn new() -> Self {
        Self {
            version: ProviderVersion {
                major: 5,
                minor: 0,
                build: 12000,
            },
            certificates: Vec::new(),
            available: true,
            deny_store_access: false,
            failing: Vec::new(),
            stalling: Vec::new(),
            journal: Mutex::new(Journal::default()),
        }
    }

    pub fn with_version(mut self, major: u32, minor: u32, build: u32) -> Self {
        self.version = ProviderVersion {
            major,
            minor,
            build,
        };
        self
    }

    pub fn with_certificate(mut self, certificate: SoftCertificate) -> Self {
        self.certificates.push(certificate);
        self
    }

    /// Every call fails as if the provider were not installed.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Opening the store fails with an access-denied fault.
    pub fn deny_store_access(mut self) -> Self {
        self.deny_store_access = true;
        self
    }

    /// Calls named `operation` fail.
    pub fn fail_on(mut self, operation: &'static str) -> Self {
        self.failing.push(operation);
        self
    }

    /// Calls named `operation` never complete.
    pub fn stall_on(mut self, operation: &'static str) -> Self {
        self.stalling.push(operation);
        self
    }

    /// Names of the most recent calls, oldest first.
    pub fn calls(&self) -> Vec<&'static str> {
        self.journal.lock().calls.iter().copied().collect()
    }

    /// Number of stores opened and not yet closed.
    pub fn open_store_count(&self) -> usize {
        self.journal.lock().open_stores.len()
    }

    async fn enter(&self, operation: &'static str) -> Result<()> {
        {
            let mut journal = self.journal.lock();
            if journal.calls.len() == CALL_LOG_LIMIT {
                journal.calls.pop_front();
            }
            journal.calls.push_back(operation);
        }
        if !self.available {
            return Err(ProviderFault::Unavailable("software provider disabled".into()).into());
        }
        if self.stalling.contains(&operation) {
            tracing::debug!(operation, "Stalling provider call");
            std::future::pending::<()>().await;
        }
        if self.failing.contains(&operation) {
            bail!("Injected failure in {operation}");
        }
        Ok(())
    }

    fn check_algorithm(&self, algorithm: u32) -> Result<()> {
        if self.version.major < MODERN_MAJOR && algorithm != HASH_ALGORITHM_GOST_3411 {
            bail!(
                "Hash algorithm {algorithm} is not supported by provider {}",
                self.version
            );
        }
        Ok(())
    }

    fn find_certificate(&self, thumbprint: &str) -> Result<&SoftCertificate> {
        self.certificates
            .iter()
            .find(|c| c.thumbprint() == thumbprint)
            .with_context(|| format!("Signer certificate {thumbprint} not found"))
    }

    fn check_token(&self, signature: &str, algorithm: u32, digest: &[u8]) -> Result<()> {
        let token = envelope::open(signature).map_err(|e| invalid(format!("{e:#}")))?;
        if token.algorithm != algorithm {
            return Err(invalid(format!(
                "signature was made with hash algorithm {}, got {algorithm}",
                token.algorithm
            )));
        }
        let certificate = self
            .find_certificate(&token.thumbprint)
            .map_err(|e| invalid(format!("{e:#}")))?;
        if envelope::mac(certificate, algorithm, digest) != token.mac {
            return Err(invalid("signature does not match the data".to_string()));
        }
        Ok(())
    }

    fn decode(data: &str) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .context("Data is not valid base64")
    }
}

fn invalid(reason: String) -> anyhow::Error {
    ProviderFault::InvalidSignature(reason).into()
}

#[async_trait]
impl Provider for SoftProvider {
    type Store = SoftStore;
    type Certificate = SoftCertificate;
    type Hash = SoftHash;
    type Signer = SoftSigner;

    async fn version(&self, _provider_type: u32) -> Result<ProviderVersion> {
        self.enter("version").await?;
        Ok(self.version)
    }

    async fn open_store(
        &self,
        location: StoreLocation,
        name: &str,
        usage: KeyUsage,
    ) -> Result<SoftStore> {
        self.enter("open_store").await?;
        if self.deny_store_access {
            return Err(ProviderFault::AccessDenied(format!("store {name} ({location:?})")).into());
        }
        let mut journal = self.journal.lock();
        journal.next_store_id += 1;
        let id = journal.next_store_id;
        journal.open_stores.push(id);
        tracing::debug!(id, name, ?usage, "Opened soft store");
        Ok(SoftStore {
            id,
            certificates: self.certificates.clone(),
        })
    }

    async fn store_certificates(&self, store: &SoftStore) -> Result<Vec<SoftCertificate>> {
        self.enter("store_certificates").await?;
        Ok(store.certificates.clone())
    }

    async fn close_store(&self, store: SoftStore) -> Result<()> {
        self.enter("close_store").await?;
        self.journal.lock().open_stores.retain(|id| *id != store.id);
        Ok(())
    }

    async fn certificate_info(&self, certificate: &SoftCertificate) -> Result<CertificateInfo> {
        self.enter("certificate_info").await?;
        Ok(certificate.info().clone())
    }

    async fn create_hash(&self, algorithm: u32) -> Result<SoftHash> {
        self.enter("create_hash").await?;
        self.check_algorithm(algorithm)?;
        Ok(SoftHash {
            algorithm,
            state: HashState::Streaming(Hasher::for_algorithm(algorithm)?),
        })
    }

    async fn hash_update(&self, hash: &mut SoftHash, base64_data: &str) -> Result<()> {
        self.enter("hash_update").await?;
        let data = Self::decode(base64_data)?;
        match &mut hash.state {
            HashState::Streaming(h) => h.update(&data),
            HashState::Fixed(_) => bail!("Hash value was set explicitly and cannot be extended"),
        }
        Ok(())
    }

    async fn hash_value(&self, hash: &SoftHash) -> Result<String> {
        self.enter("hash_value").await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(hash.digest()))
    }

    async fn hash_from_value(&self, algorithm: u32, value: &str) -> Result<SoftHash> {
        self.enter("hash_from_value").await?;
        self.check_algorithm(algorithm)?;
        let bytes = Self::decode(value)?;
        let expected = digest::output_len(algorithm)?;
        if bytes.len() != expected {
            bail!(
                "Digest length mismatch for algorithm {algorithm}: expected {expected}, got {}",
                bytes.len()
            );
        }
        Ok(SoftHash {
            algorithm,
            state: HashState::Fixed(bytes),
        })
    }

    async fn create_signer(&self, certificate: &SoftCertificate) -> Result<SoftSigner> {
        self.enter("create_signer").await?;
        if !certificate.info().has_private_key {
            bail!(
                "Certificate {} has no private key",
                certificate.thumbprint()
            );
        }
        Ok(SoftSigner {
            certificate: certificate.clone(),
        })
    }

    async fn sign_hash(
        &self,
        hash: SoftHash,
        signer: &SoftSigner,
        profile: SignatureProfile,
    ) -> Result<String> {
        self.enter("sign_hash").await?;
        tracing::debug!(?profile, algorithm = hash.algorithm, "Soft sign");
        envelope::seal(&signer.certificate, hash.algorithm, &hash.digest())
    }

    async fn verify_hash(
        &self,
        hash: SoftHash,
        signature: &str,
        _profile: SignatureProfile,
    ) -> Result<()> {
        self.enter("verify_hash").await?;
        self.check_token(signature, hash.algorithm, &hash.digest())
    }

    async fn verify_detached(
        &self,
        base64_content: &str,
        signature: &str,
        _profile: SignatureProfile,
    ) -> Result<()> {
        self.enter("verify_detached").await?;
        let token = envelope::open(signature).map_err(|e| invalid(format!("{e:#}")))?;
        let content = Self::decode(base64_content)?;
        let digest = digest::digest(token.algorithm, &content)?;
        self.check_token(signature, token.algorithm, &digest)
    }

    async fn sign_xml(
        &self,
        document: &str,
        signer: &SoftSigner,
        signature_method: &str,
        digest_method: &str,
    ) -> Result<String> {
        self.enter("sign_xml").await?;
        let descriptor = algorithm::all()
            .iter()
            .find(|d| d.xml_digest_method == digest_method)
            .with_context(|| format!("Unsupported XML digest method {digest_method}"))?;
        self.check_algorithm(descriptor.provider_id)?;
        let digest = digest::digest(descriptor.provider_id, document.as_bytes())?;
        let token = envelope::seal(&signer.certificate, descriptor.provider_id, &digest)?;
        envelope::envelop_xml(document, signature_method, digest_method, &token)
    }

    async fn verify_xml(&self, signed_document: &str) -> Result<()> {
        self.enter("verify_xml").await?;
        let (original, digest_method, token) = envelope::unwrap_xml(signed_document)?;
        let descriptor = algorithm::all()
            .iter()
            .find(|d| d.xml_digest_method == digest_method)
            .with_context(|| format!("Unsupported XML digest method {digest_method}"))?;
        let digest = digest::digest(descriptor.provider_id, original.as_bytes())?;
        self.check_token(&token, descriptor.provider_id, &digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cades_sign_core::algorithm::HASH_ALGORITHM_GOST_3411_2012_256;

    fn b64(data: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(data)
    }

    #[tokio::test]
    async fn legacy_version_rejects_modern_hashes() {
        let provider = SoftProvider::new().with_version(3, 9, 0);
        assert!(provider.create_hash(HASH_ALGORITHM_GOST_3411).await.is_ok());
        assert!(
            provider
                .create_hash(HASH_ALGORITHM_GOST_3411_2012_256)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn sign_then_verify_hash() {
        let cert = SoftCertificate::new("CN=Signer", "1.2.643.7.1.1.1.1");
        let provider = SoftProvider::new().with_certificate(cert.clone());

        let mut hash = provider
            .create_hash(HASH_ALGORITHM_GOST_3411_2012_256)
            .await
            .unwrap();
        provider.hash_update(&mut hash, &b64(b"hello")).await.unwrap();
        let value = provider.hash_value(&hash).await.unwrap();

        let signer = provider.create_signer(&cert).await.unwrap();
        let signature = provider
            .sign_hash(hash, &signer, SignatureProfile::CadesBes)
            .await
            .unwrap();

        let again = provider
            .hash_from_value(HASH_ALGORITHM_GOST_3411_2012_256, &value)
            .await
            .unwrap();
        provider
            .verify_hash(again, &signature, SignatureProfile::CadesBes)
            .await
            .unwrap();
        provider
            .verify_detached(&b64(b"hello"), &signature, SignatureProfile::CadesBes)
            .await
            .unwrap();
        let err = provider
            .verify_detached(&b64(b"hullo"), &signature, SignatureProfile::CadesBes)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderFault>(),
            Some(ProviderFault::InvalidSignature(_))
        ));
    }

    #[tokio::test]
    async fn store_access_denied_is_tagged() {
        let provider = SoftProvider::new().deny_store_access();
        let err = provider
            .open_store(StoreLocation::CurrentUser, "My", KeyUsage::DigitalSignature)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderFault>(),
            Some(ProviderFault::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn stores_are_tracked_until_closed() {
        let provider = SoftProvider::new();
        let store = provider
            .open_store(StoreLocation::CurrentUser, "My", KeyUsage::DigitalSignature)
            .await
            .unwrap();
        assert_eq!(provider.open_store_count(), 1);
        provider.close_store(store).await.unwrap();
        assert_eq!(provider.open_store_count(), 0);
        assert_eq!(provider.calls(), vec!["open_store", "close_store"]);
    }

    #[tokio::test]
    async fn fixed_hash_cannot_be_extended() {
        let provider = SoftProvider::new();
        let mut hash = provider
            .hash_from_value(HASH_ALGORITHM_GOST_3411, &b64(&[0u8; 32]))
            .await
            .unwrap();
        assert!(provider.hash_update(&mut hash, &b64(b"x")).await.is_err());
        assert!(
            provider
                .hash_from_value(HASH_ALGORITHM_GOST_3411, &b64(&[0u8; 31]))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn signer_requires_private_key() {
        let cert = SoftCertificate::new("CN=NoKey", "1.2.643.2.2.19").without_private_key();
        let provider = SoftProvider::new();
        assert!(provider.create_signer(&cert).await.is_err());
    }

    #[tokio::test]
    async fn xml_sign_and_verify() {
        let cert = SoftCertificate::new("CN=Xml", "1.2.643.2.2.19");
        let provider = SoftProvider::new().with_certificate(cert.clone());
        let signer = provider.create_signer(&cert).await.unwrap();
        let d = algorithm::resolve_key("legacy").unwrap();
        let signed = provider
            .sign_xml(
                "<doc>42</doc>",
                &signer,
                d.xml_signature_method,
                d.xml_digest_method,
            )
            .await
            .unwrap();
        provider.verify_xml(&signed).await.unwrap();
        let tampered = signed.replace("42", "43");
        assert!(provider.verify_xml(&tampered).await.is_err());
    }

    #[tokio::test]
    async fn xml_with_trailing_newline_verifies() {
        let cert = SoftCertificate::new("CN=Xml", "1.2.643.7.1.1.1.1");
        let provider = SoftProvider::new().with_certificate(cert.clone());
        let signer = provider.create_signer(&cert).await.unwrap();
        let d = algorithm::resolve_key("v256").unwrap();
        let signed = provider
            .sign_xml(
                "<doc>42</doc>\r\n",
                &signer,
                d.xml_signature_method,
                d.xml_digest_method,
            )
            .await
            .unwrap();
        assert!(signed.ends_with("</doc>\r\n"));
        provider.verify_xml(&signed).await.unwrap();
    }

    #[tokio::test]
    async fn signer_unknown_to_provider_is_invalid() {
        let cert = SoftCertificate::new("CN=Elsewhere", "1.2.643.2.2.19");
        let elsewhere = SoftProvider::new().with_certificate(cert.clone());
        let signer = elsewhere.create_signer(&cert).await.unwrap();
        let hash = elsewhere.create_hash(HASH_ALGORITHM_GOST_3411).await.unwrap();
        let signature = elsewhere
            .sign_hash(hash, &signer, SignatureProfile::CadesBes)
            .await
            .unwrap();

        let err = SoftProvider::new()
            .verify_detached("", &signature, SignatureProfile::CadesBes)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderFault>(),
            Some(ProviderFault::InvalidSignature(_))
        ));
    }

    #[tokio::test]
    async fn call_journal_is_bounded() {
        let provider = SoftProvider::new();
        for _ in 0..CALL_LOG_LIMIT + 10 {
            provider.version(75).await.unwrap();
        }
        provider.create_hash(HASH_ALGORITHM_GOST_3411).await.unwrap();
        let calls = provider.calls();
        assert_eq!(calls.len(), CALL_LOG_LIMIT);
        assert_eq!(calls.last(), Some(&"create_hash"));
    }

    #[tokio::test]
    async fn injected_failure_names_operation() {
        let provider = SoftProvider::new().fail_on("hash_value");
        let hash = provider.create_hash(HASH_ALGORITHM_GOST_3411).await.unwrap();
        let err = provider.hash_value(&hash).await.unwrap_err();
        assert!(err.to_string().contains("hash_value"));
    }
}
