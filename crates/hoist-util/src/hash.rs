//! Digest algorithms used for artifact integrity checks.
//!
//! The algorithm is engine-scoped configuration: it is chosen once, before
//! any identification begins, and handed to artifacts from there. Changing it
//! between runs makes every previously recorded digest mismatch, so all
//! non-volatile artifacts reinstall.

use std::io::Read;
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::errors::HoistError;

/// A supported digest algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    #[default]
    Sha1,
    Sha256,
    Md5,
}

impl DigestAlgorithm {
    /// Parse an algorithm name as it appears in configuration.
    ///
    /// Accepts the JCA-style names (`SHA-1`, `SHA-256`, `MD5`) and their
    /// undashed variants, case-insensitively.
    ///
    /// # Errors
    /// Returns [`HoistError::DigestAlgorithmUnavailable`] for any other name.
    pub fn parse(name: &str) -> Result<Self, HoistError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sha-1" | "sha1" => Ok(Self::Sha1),
            "sha-256" | "sha256" => Ok(Self::Sha256),
            "md5" => Ok(Self::Md5),
            _ => Err(HoistError::DigestAlgorithmUnavailable {
                name: name.to_owned(),
            }),
        }
    }

    /// The canonical name of this algorithm.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Md5 => "MD5",
        }
    }

    /// Start a streaming hasher for this algorithm.
    pub fn hasher(self) -> StreamHasher {
        match self {
            Self::Sha1 => StreamHasher::Sha1(Sha1::new()),
            Self::Sha256 => StreamHasher::Sha256(Sha256::new()),
            Self::Md5 => StreamHasher::Md5(Md5::new()),
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An in-progress digest over a byte stream.
///
/// Lets transfer code hash while copying without committing to one digest
/// crate at the call site.
pub enum StreamHasher {
    Sha1(Sha1),
    Sha256(Sha256),
    Md5(Md5),
}

impl StreamHasher {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Md5(h) => h.update(data),
        }
    }

    /// Finish the digest, returning a lowercase hex string.
    pub fn finish_hex(self) -> String {
        match self {
            Self::Sha1(h) => format!("{:x}", h.finalize()),
            Self::Sha256(h) => format!("{:x}", h.finalize()),
            Self::Md5(h) => format!("{:x}", h.finalize()),
        }
    }
}

/// Compute the digest of a byte slice, returning a lowercase hex string.
pub fn digest_bytes(algorithm: DigestAlgorithm, data: &[u8]) -> String {
    let mut hasher = algorithm.hasher();
    hasher.update(data);
    hasher.finish_hex()
}

/// Compute the digest of a file using streaming reads, returning a lowercase
/// hex string. Does not load the entire file into memory.
pub fn digest_file(algorithm: DigestAlgorithm, path: &Path) -> Result<String, HoistError> {
    let file = std::fs::File::open(path).map_err(HoistError::Io)?;
    let mut reader = std::io::BufReader::with_capacity(64 * 1024, file);
    let mut hasher = algorithm.hasher();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(HoistError::Io)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finish_hex())
}
