//! Core signature/delta machinery for an Octodiff-compatible binary-delta
//! toolkit.
//!
//! Given a *basis* file (what a receiver already has) and a *new* file
//! (what it needs), this crate can:
//!
//! - summarize the basis as a [`signature`] (a sequence of chunk
//!   fingerprints: a weak rolling checksum plus a strong hash);
//! - compare a new file against that signature to [`builder`] a delta of
//!   `COPY`/`DATA` commands; and
//! - [`delta_reader`] that command stream back out, handing bytes and
//!   basis ranges to caller-supplied callbacks.
//!
//! Patch application (replaying a delta against a basis to reconstruct
//! the new file) is the mechanical inverse of [`delta_reader::DeltaReader`]
//! and is left to callers — see `demos/` for a minimal example.

pub mod builder;
pub mod chunk;
pub mod delta_reader;
pub mod delta_writer;
pub mod error;
pub mod hash;
mod io_util;
pub mod rolling;
pub mod signature;

pub use builder::{build_delta, DeltaBuilder};
pub use chunk::{ChunkSignature, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use delta_reader::{DeltaMetadata, DeltaReader};
pub use delta_writer::DeltaWriter;
pub use error::{Error, Result};
pub use hash::{StrongHash, by_name as strong_hash_by_name};
pub use rolling::{RollingChecksum, by_name as rolling_checksum_by_name};
pub use signature::{
    read_signature, write_signature, write_signature_with_chunk_size, HashKind, RollingKind,
    Signature, SignatureOptions, SignatureReader, SignatureWriter,
};
