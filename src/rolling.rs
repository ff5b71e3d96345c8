//! Weak, O(1)-updatable checksums used to cheaply prune non-matching windows
//! before paying for a strong hash comparison.

use crate::error::{Error, Result};

const MODULUS: u32 = 65521;

/// A rolling checksum algorithm, selected by name at signature-read time.
///
/// `rotate` must satisfy, for any window `w` of length `n` and any
/// extension byte `x`:
/// `rotate(calculate(w), w[0], x, n) == calculate(w[1..] ++ [x])`.
pub trait RollingChecksum {
    /// The name recorded in (and looked up from) a signature file header.
    fn name(&self) -> &'static str;

    /// Computes the checksum over a full window from scratch.
    fn calculate(&self, window: &[u8]) -> u32;

    /// Slides the window forward by one byte without rescanning it.
    fn rotate(&self, checksum: u32, remove: u8, add: u8, window_size: usize) -> u32;
}

/// The legacy, non-standard Adler32 variant. No modulus is applied, so `a`
/// and `b` are allowed to wrap through the full `u32` range exactly as the
/// reference tool's 32-bit arithmetic does. This is the default rolling
/// checksum for newly-produced signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Adler32;

impl RollingChecksum for Adler32 {
    fn name(&self) -> &'static str {
        "Adler32"
    }

    fn calculate(&self, window: &[u8]) -> u32 {
        let mut a: u32 = 1;
        let mut b: u32 = 0;
        for &byte in window {
            a = a.wrapping_add(u32::from(byte));
            b = b.wrapping_add(a);
        }
        (b << 16) | a
    }

    fn rotate(&self, checksum: u32, remove: u8, add: u8, window_size: usize) -> u32 {
        let b = (checksum >> 16) & 0xFFFF;
        let a = checksum & 0xFFFF;

        let a = a.wrapping_sub(u32::from(remove)).wrapping_add(u32::from(add));
        let b = b
            .wrapping_sub((window_size as u32).wrapping_mul(u32::from(remove)))
            .wrapping_add(a)
            .wrapping_sub(1);

        (b << 16) | a
    }
}

/// The modulo-65521 Adler32 variant. Exists so the on-disk format can switch
/// rolling-checksum algorithms; the two must never be confused at read
/// time, which is why selection is purely by the name string in the
/// signature header.
#[derive(Debug, Clone, Copy, Default)]
pub struct Adler32V2;

impl RollingChecksum for Adler32V2 {
    fn name(&self) -> &'static str {
        "Adler32V2"
    }

    fn calculate(&self, window: &[u8]) -> u32 {
        let mut a: u32 = 1;
        let mut b: u32 = 0;
        for &byte in window {
            a = a.wrapping_add(u32::from(byte)) % MODULUS;
            b = b.wrapping_add(a) % MODULUS;
        }
        (b << 16) | a
    }

    fn rotate(&self, checksum: u32, remove: u8, add: u8, window_size: usize) -> u32 {
        let b = (checksum >> 16) & 0xFFFF;
        let a = (checksum & 0xFFFF)
            .wrapping_sub(u32::from(remove))
            .wrapping_add(u32::from(add))
            % MODULUS;
        let b = b
            .wrapping_sub((window_size as u32).wrapping_mul(u32::from(remove)))
            .wrapping_add(a)
            .wrapping_sub(1)
            % MODULUS;

        ((b & 0xFFFF) << 16) | (a & 0xFFFF)
    }
}

/// Resolves a rolling-checksum algorithm by its signature-header name.
///
/// # Errors
/// Returns [`Error::UnsupportedAlgorithm`] for any name other than
/// `"Adler32"` or `"Adler32V2"`.
pub fn by_name(name: &str) -> Result<Box<dyn RollingChecksum + Send + Sync>> {
    match name {
        "Adler32" => Ok(Box::new(Adler32)),
        "Adler32V2" => Ok(Box::new(Adler32V2)),
        other => Err(Error::UnsupportedAlgorithm(other.to_string())),
    }
}
