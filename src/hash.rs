//! Strong, collision-resistant hashing used to confirm a rolling-checksum
//! hit before trusting it as a real match.

use crate::error::{Error, Result};
use sha1::{Digest, Sha1};
use std::io::Read;

/// A strong hash algorithm, selected by name at signature-read time.
pub trait StrongHash {
    /// The name recorded in (and looked up from) a signature file header.
    fn name(&self) -> &'static str;

    /// The number of bytes a digest occupies on disk.
    fn output_length(&self) -> usize;

    /// Hashes a single in-memory buffer.
    fn hash_bytes(&self, buf: &[u8]) -> Vec<u8>;

    /// Hashes an entire stream without requiring it to fit in memory.
    ///
    /// # Errors
    /// Returns an error if reading from `reader` fails.
    fn hash_stream(&self, reader: &mut dyn Read) -> Result<Vec<u8>>;
}

/// SHA-1, the only strong hash the octodiff formats use in practice.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Hash;

impl StrongHash for Sha1Hash {
    fn name(&self) -> &'static str {
        "SHA1"
    }

    fn output_length(&self) -> usize {
        20
    }

    fn hash_bytes(&self, buf: &[u8]) -> Vec<u8> {
        let mut hasher = Sha1::new();
        hasher.update(buf);
        hasher.finalize().to_vec()
    }

    fn hash_stream(&self, reader: &mut dyn Read) -> Result<Vec<u8>> {
        let mut hasher = Sha1::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize().to_vec())
    }
}

/// Resolves a strong hash algorithm by its signature-header name.
///
/// # Errors
/// Returns [`Error::UnsupportedAlgorithm`] for any name other than `"SHA1"`.
pub fn by_name(name: &str) -> Result<Box<dyn StrongHash + Send + Sync>> {
    match name {
        "SHA1" => Ok(Box::new(Sha1Hash)),
        other => Err(Error::UnsupportedAlgorithm(other.to_string())),
    }
}
