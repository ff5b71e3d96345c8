//! Delta command-stream framing (C6): the `OCTODELTA` header followed by
//! `COPY`/`DATA` commands, per §6.2.

use crate::error::Result;
use crate::io_util::{with_restored_position, write_i64_le, write_length_prefixed_string};
use std::io::{Read, Seek, SeekFrom, Write};

const MAGIC: &[u8; 9] = b"OCTODELTA";
/// A single schema-version byte — see the note on the identically-named
/// constant in `signature.rs` for why this isn't two bytes.
const VERSION: [u8; 1] = [0x01];
const END_OF_METADATA: [u8; 3] = [0x3E, 0x3E, 0x3E];

const COPY_TAG: u8 = 0x60;
const DATA_TAG: u8 = 0x80;

/// The size of the buffer `write_data` uses to copy bytes out of the
/// source, so a single large command never forces the whole span into
/// memory at once.
const DATA_COPY_BUFFER_SIZE: usize = 1024 * 1024;

/// Writes the `OCTODELTA` header and command stream (C6).
pub struct DeltaWriter<W> {
    output: W,
}

impl<W: Write> DeltaWriter<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    /// Writes the header: magic, version, the strong-hash algorithm name,
    /// and the expected hash of the reconstructed new file.
    ///
    /// # Errors
    /// Returns an error if writing to the output fails.
    pub fn write_metadata(&mut self, hash_name: &str, expected_new_hash: &[u8]) -> Result<()> {
        self.output.write_all(MAGIC)?;
        self.output.write_all(&VERSION)?;
        write_length_prefixed_string(&mut self.output, hash_name)?;

        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        let hash_len = expected_new_hash.len() as i32;
        self.output.write_all(&hash_len.to_le_bytes())?;
        self.output.write_all(expected_new_hash)?;
        self.output.write_all(&END_OF_METADATA)?;
        Ok(())
    }

    /// Emits a `COPY` command referencing `length` bytes of the basis
    /// starting at `offset`.
    ///
    /// # Errors
    /// Returns an error if writing to the output fails.
    pub fn write_copy(&mut self, offset: i64, length: i64) -> Result<()> {
        self.output.write_all(&[COPY_TAG])?;
        write_i64_le(&mut self.output, offset)?;
        write_i64_le(&mut self.output, length)?;
        Ok(())
    }

    /// Emits a `DATA` command carrying `length` literal bytes read from
    /// `source` starting at `offset`. `source`'s position on entry is
    /// restored on every exit path, success or failure, via a scoped
    /// seek guard — so the caller's own scan position is never disturbed.
    ///
    /// # Errors
    /// Returns an error if seeking or reading `source`, or writing to the
    /// output, fails.
    pub fn write_data<S: Read + Seek>(
        &mut self,
        source: &mut S,
        offset: i64,
        length: i64,
    ) -> Result<()> {
        self.output.write_all(&[DATA_TAG])?;
        write_i64_le(&mut self.output, length)?;

        let output = &mut self.output;
        with_restored_position(source, |source| {
            #[allow(clippy::cast_sign_loss)]
            source.seek(SeekFrom::Start(offset as u64))?;

            #[allow(clippy::cast_sign_loss)]
            let mut remaining = length as u64;
            let mut buf = vec![0u8; DATA_COPY_BUFFER_SIZE.min(remaining.max(1) as usize)];
            while remaining > 0 {
                #[allow(clippy::cast_possible_truncation)]
                let want = remaining.min(buf.len() as u64) as usize;
                source.read_exact(&mut buf[..want])?;
                output.write_all(&buf[..want])?;
                remaining -= want as u64;
            }
            Ok(())
        })
    }

    /// Consumes the writer, returning the underlying output.
    pub fn into_inner(self) -> W {
        self.output
    }
}
