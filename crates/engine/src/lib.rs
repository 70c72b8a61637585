//! Signing orchestration on top of a crypto [`Provider`].
//!
//! A [`Session`] owns the provider, the engine configuration and the
//! certificate cache. Its operations cover certificate enumeration, the
//! multi-algorithm capability probe, hashing over buffers or chunk sources,
//! detached CAdES-BES and enveloped XML signing, and verification.
//!
//! ```no_run
//! # async fn demo<P: cades_sign_core::Provider>(provider: P) -> cades_sign_core::Result<()> {
//! use cades_sign_core::EngineConfig;
//! use cades_sign_engine::Session;
//!
//! let session = Session::new(provider, EngineConfig::default())?;
//! let certificates = session.list_signing_certificates().await?;
//! if let Some(first) = certificates.first() {
//!     let signature = session.sign_data(&first.thumbprint, b"hello").await?;
//!     assert!(session.verify(signature.as_str(), b"hello").await);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`Provider`]: cades_sign_core::Provider

mod call;
mod hasher;
mod probe;
mod session;
mod sign;
mod store;
mod verify;

pub use hasher::DigestHandle;
pub use session::{CertificateCache, Session};
pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
pub(crate) mod testing;
