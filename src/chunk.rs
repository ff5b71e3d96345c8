//! The chunk signature data model shared by the signature writer/reader
//! and the delta builder.

/// A basis file is never chunked below this size.
pub const MIN_CHUNK_SIZE: usize = 128;

/// The chunk size used when a caller doesn't specify one.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

/// A basis file is never chunked above this size; chunk lengths on disk
/// are `u16`, but this format caps them well below 65535.
pub const MAX_CHUNK_SIZE: usize = 31 * 1024;

/// One chunk of the basis file: its position, length, and the weak/strong
/// hashes that identify its contents.
///
/// `start_offset` is never stored on disk — the signature format only
/// records lengths, and a reader reconstructs offsets by running the sum
/// of previously-read lengths in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSignature {
    pub start_offset: u64,
    pub length: u16,
    pub rolling_checksum: u32,
    pub strong_hash: Vec<u8>,
}
