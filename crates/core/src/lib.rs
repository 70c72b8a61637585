//! Core building blocks for CAdES detached signing: algorithm registry,
//! distinguished name parsing, chunk sources, the provider capability trait,
//! configuration and the error taxonomy.
//!
//! This crate performs no cryptography itself and has no provider bindings.

pub mod algorithm;
pub mod chunk;
pub mod config;
pub mod dn;
pub mod error;
pub mod provider;
pub mod types;

pub use algorithm::{AlgorithmDescriptor, resolve_key, resolve_oid};
pub use chunk::{Chunk, ChunkSource, DEFAULT_CHUNK_SIZE, FileChunks};
pub use config::{EngineConfig, StoreConfig};
pub use dn::DistinguishedName;
pub use error::{CadesError, Result};
pub use provider::{
    CertificateInfo, KeyUsage, Provider, ProviderFault, ProviderVersion, SignatureProfile,
    StoreLocation,
};
pub use types::*;
