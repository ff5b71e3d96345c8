//! Delta command-stream parsing (C7): reads an `OCTODELTA` stream and
//! dispatches `DATA`/`COPY` commands to caller-supplied callbacks.

use crate::error::{Error, Result};
use crate::io_util::read_length_prefixed_string;
use std::io::Read;

const MAGIC: &[u8; 9] = b"OCTODELTA";
/// A single schema-version byte — see the note on the identically-named
/// constant in `signature.rs` for why this isn't two bytes.
const VERSION: [u8; 1] = [0x01];
const END_OF_METADATA: [u8; 3] = [0x3E, 0x3E, 0x3E];

const COPY_TAG: u8 = 0x60;
const DATA_TAG: u8 = 0x80;

/// A `DATA` command is handed to its callback in pieces no larger than
/// this, so a maliciously large length can't force an unbounded
/// allocation.
const DATA_READ_CHUNK_SIZE: usize = 1024 * 1024;

/// The parsed delta header: the strong-hash algorithm name and the
/// expected hash of the fully-reconstructed new file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaMetadata {
    pub hash_name: String,
    pub expected_new_hash: Vec<u8>,
}

/// Parses an `OCTODELTA` stream (C7), per the state machine in §4.9:
/// *Start → Metadata → Commands → End*.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaReader;

impl DeltaReader {
    /// Reads the header and returns it without touching the command
    /// stream; `input` is left positioned at the first command byte.
    ///
    /// # Errors
    /// Returns [`Error::MalformedDelta`] for a bad magic or version.
    pub fn read_metadata<R: Read + ?Sized>(&self, input: &mut R) -> Result<DeltaMetadata> {
        let mut magic = [0u8; 9];
        read_exact_malformed(input, &mut magic, "truncated delta header")?;
        if &magic != MAGIC {
            return Err(Error::MalformedDelta("bad delta magic".into()));
        }

        let mut version = [0u8; 1];
        read_exact_malformed(input, &mut version, "truncated delta header")?;
        if version != VERSION {
            return Err(Error::MalformedDelta(format!(
                "unsupported delta version {version:?}"
            )));
        }

        let hash_name = read_length_prefixed_string(input, Error::MalformedDelta)?;

        let mut hash_len_buf = [0u8; 4];
        read_exact_malformed(input, &mut hash_len_buf, "truncated delta header")?;
        let hash_len = i32::from_le_bytes(hash_len_buf);
        if hash_len < 0 {
            return Err(Error::MalformedDelta("negative hash length".into()));
        }

        #[allow(clippy::cast_sign_loss)]
        let mut expected_new_hash = vec![0u8; hash_len as usize];
        read_exact_malformed(input, &mut expected_new_hash, "truncated delta header")?;

        let mut end_meta = [0u8; 3];
        read_exact_malformed(input, &mut end_meta, "truncated delta header")?;
        if end_meta != END_OF_METADATA {
            return Err(Error::MalformedDelta(
                "missing end-of-metadata marker".into(),
            ));
        }

        Ok(DeltaMetadata {
            hash_name,
            expected_new_hash,
        })
    }

    /// Reads the header, then drives the command loop: every `DATA`
    /// command's bytes (chunked to bound memory) go to `on_data`, every
    /// `COPY` command's `(offset, length)` goes to `on_copy`. Stops at a
    /// clean end-of-stream, or immediately if either callback errors.
    ///
    /// # Errors
    /// Returns [`Error::MalformedDelta`] for an unknown command byte or a
    /// command payload truncated mid-read, or whatever error a callback
    /// returns (wrapped as [`Error::Callback`] unless it already is one).
    pub fn apply<R, OnData, OnCopy>(
        &self,
        input: &mut R,
        mut on_data: OnData,
        mut on_copy: OnCopy,
    ) -> Result<DeltaMetadata>
    where
        R: Read + ?Sized,
        OnData: FnMut(&[u8]) -> Result<()>,
        OnCopy: FnMut(i64, i64) -> Result<()>,
    {
        let metadata = self.read_metadata(input)?;

        let mut tag = [0u8; 1];
        loop {
            let n = crate::io_util::read_exact_or_eof(input, &mut tag)?;
            if n == 0 {
                break;
            }
            match tag[0] {
                DATA_TAG => {
                    let length = read_i64_malformed(input, "truncated data command length")?;
                    if length < 0 {
                        return Err(Error::MalformedDelta("negative data length".into()));
                    }
                    #[allow(clippy::cast_sign_loss)]
                    let mut remaining = length as u64;
                    let mut buf = vec![0u8; DATA_READ_CHUNK_SIZE];
                    while remaining > 0 {
                        #[allow(clippy::cast_possible_truncation)]
                        let want = remaining.min(buf.len() as u64) as usize;
                        read_exact_malformed(input, &mut buf[..want], "truncated data command")?;
                        on_data(&buf[..want])?;
                        remaining -= want as u64;
                    }
                }
                COPY_TAG => {
                    let offset = read_i64_malformed(input, "truncated copy command offset")?;
                    let length = read_i64_malformed(input, "truncated copy command length")?;
                    on_copy(offset, length)?;
                }
                other => {
                    return Err(Error::MalformedDelta(format!(
                        "unrecognized command byte 0x{other:02x}"
                    )));
                }
            }
        }
        Ok(metadata)
    }
}

fn read_exact_malformed<R: Read + ?Sized>(r: &mut R, buf: &mut [u8], context: &str) -> Result<()> {
    match r.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(Error::MalformedDelta(context.to_string()))
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// Reads a little-endian `i64`, mapping a truncated read to
/// [`Error::MalformedDelta`] rather than [`Error::Io`] — per §4.9/§7, EOF
/// mid-command is a format error, not a transient I/O fault.
fn read_i64_malformed<R: Read + ?Sized>(r: &mut R, context: &str) -> Result<i64> {
    let mut buf = [0u8; 8];
    read_exact_malformed(r, &mut buf, context)?;
    Ok(i64::from_le_bytes(buf))
}
