//! Stand-in digests for the provider hash constants.
//!
//! The software provider has no GOST implementation; each registered family is
//! mapped to a SHA-2 function of the same output length so that values differ
//! per family and have realistic sizes.

use anyhow::{Result, bail};
use cades_sign_core::algorithm::{
    HASH_ALGORITHM_GOST_3411, HASH_ALGORITHM_GOST_3411_2012_256, HASH_ALGORITHM_GOST_3411_2012_512,
};
use sha2::{Digest as _, Sha256, Sha512, Sha512_256};

#[derive(Clone)]
pub(crate) enum Hasher {
    Sha256(Sha256),
    Sha512Trunc256(Sha512_256),
    Sha512(Sha512),
}

impl Hasher {
    pub(crate) fn for_algorithm(algorithm: u32) -> Result<Self> {
        Ok(match algorithm {
            HASH_ALGORITHM_GOST_3411 => Hasher::Sha256(Sha256::new()),
            HASH_ALGORITHM_GOST_3411_2012_256 => Hasher::Sha512Trunc256(Sha512_256::new()),
            HASH_ALGORITHM_GOST_3411_2012_512 => Hasher::Sha512(Sha512::new()),
            other => bail!("Unsupported hash algorithm constant: {other}"),
        })
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha512Trunc256(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    /// Digest of the data fed so far; the hasher stays usable.
    pub(crate) fn snapshot(&self) -> Vec<u8> {
        match self {
            Hasher::Sha256(h) => h.clone().finalize().to_vec(),
            Hasher::Sha512Trunc256(h) => h.clone().finalize().to_vec(),
            Hasher::Sha512(h) => h.clone().finalize().to_vec(),
        }
    }
}

/// One-shot digest of `data`.
pub(crate) fn digest(algorithm: u32, data: &[u8]) -> Result<Vec<u8>> {
    let mut hasher = Hasher::for_algorithm(algorithm)?;
    hasher.update(data);
    Ok(hasher.snapshot())
}

/// Expected digest length for a provider constant.
pub(crate) fn output_len(algorithm: u32) -> Result<usize> {
    Ok(match algorithm {
        HASH_ALGORITHM_GOST_3411 | HASH_ALGORITHM_GOST_3411_2012_256 => 32,
        HASH_ALGORITHM_GOST_3411_2012_512 => 64,
        other => bail!("Unsupported hash algorithm constant: {other}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_produce_distinct_values() {
        let a = digest(HASH_ALGORITHM_GOST_3411, b"payload").unwrap();
        let b = digest(HASH_ALGORITHM_GOST_3411_2012_256, b"payload").unwrap();
        let c = digest(HASH_ALGORITHM_GOST_3411_2012_512, b"payload").unwrap();
        assert_eq!(a.len(), 32);
        assert_eq!(b.len(), 32);
        assert_eq!(c.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut h = Hasher::for_algorithm(HASH_ALGORITHM_GOST_3411_2012_512).unwrap();
        h.update(b"pay");
        h.update(b"load");
        assert_eq!(
            h.snapshot(),
            digest(HASH_ALGORITHM_GOST_3411_2012_512, b"payload").unwrap()
        );
    }

    #[test]
    fn unknown_constant_is_rejected() {
        assert!(Hasher::for_algorithm(7).is_err());
        assert!(output_len(7).is_err());
    }
}
