//! In-memory certificates with derived key material.

use std::sync::Arc;

use cades_sign_core::CertificateInfo;
use sha2::{Digest as _, Sha256};

/// A certificate held by the software provider.
///
/// The "private key" is a secret derived from the thumbprint; it never leaves
/// the provider crate.
#[derive(Debug, Clone)]
pub struct SoftCertificate {
    info: Arc<CertificateInfo>,
    secret: [u8; 32],
}

impl SoftCertificate {
    /// Valid certificate with a private key for `subject` and key algorithm `oid`.
    pub fn new(subject: &str, oid: &str) -> Self {
        let mut h = Sha256::new();
        h.update(subject.as_bytes());
        h.update([0u8]);
        h.update(oid.as_bytes());
        let fingerprint = h.finalize();

        let thumbprint = upper_hex(&fingerprint[..20]);
        let serial_number = upper_hex(&fingerprint[20..28]);
        let info = CertificateInfo {
            thumbprint,
            subject_name: subject.to_string(),
            issuer_name: "CN=Soft Test CA, O=cades-sign, C=RU".to_string(),
            valid_to: "2099-12-31T23:59:59Z".to_string(),
            serial_number,
            has_private_key: true,
            is_valid: true,
            public_key_algorithm_oid: oid.to_string(),
        };
        Self::from_info(info)
    }

    /// Build from explicit properties.
    pub fn from_info(info: CertificateInfo) -> Self {
        let secret = derive_secret(&info.thumbprint);
        Self {
            info: Arc::new(info),
            secret,
        }
    }

    pub fn with_issuer(self, issuer: &str) -> Self {
        self.map_info(|info| info.issuer_name = issuer.to_string())
    }

    /// Same certificate without an accessible private key.
    pub fn without_private_key(self) -> Self {
        self.map_info(|info| info.has_private_key = false)
    }

    /// Same certificate failing the validity check.
    pub fn invalid(self) -> Self {
        self.map_info(|info| info.is_valid = false)
    }

    pub fn info(&self) -> &CertificateInfo {
        &self.info
    }

    pub fn thumbprint(&self) -> &str {
        &self.info.thumbprint
    }

    pub(crate) fn secret(&self) -> &[u8; 32] {
        &self.secret
    }

    fn map_info(self, f: impl FnOnce(&mut CertificateInfo)) -> Self {
        let mut info = (*self.info).clone();
        f(&mut info);
        Self::from_info(info)
    }
}

fn derive_secret(thumbprint: &str) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(b"cades-sign-soft key");
    h.update(thumbprint.as_bytes());
    h.finalize().into()
}

pub(crate) fn upper_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbprint_is_stable_and_hex() {
        let a = SoftCertificate::new("CN=Alice", "1.2.643.7.1.1.1.1");
        let b = SoftCertificate::new("CN=Alice", "1.2.643.7.1.1.1.1");
        assert_eq!(a.thumbprint(), b.thumbprint());
        assert_eq!(a.thumbprint().len(), 40);
        assert!(a.thumbprint().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_subjects_get_different_keys() {
        let a = SoftCertificate::new("CN=Alice", "1.2.643.7.1.1.1.1");
        let b = SoftCertificate::new("CN=Bob", "1.2.643.7.1.1.1.1");
        assert_ne!(a.thumbprint(), b.thumbprint());
        assert_ne!(a.secret(), b.secret());
    }

    #[test]
    fn modifiers_keep_identity() {
        let a = SoftCertificate::new("CN=Alice", "1.2.643.2.2.19");
        let b = a.clone().without_private_key().invalid();
        assert_eq!(a.thumbprint(), b.thumbprint());
        assert!(!b.info().has_private_key);
        assert!(!b.info().is_valid);
    }
}
