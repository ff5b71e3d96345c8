//! Low-level byte-stream plumbing shared by the signature and delta
//! components: little-endian integers, the length-prefixed string form
//! used by every metadata header, a scoped-seek helper, and the chunked
//! reader that draws fixed-size blocks off a basis file.

use crate::error::{Error, Result};
use std::io::{Read, Seek, SeekFrom, Write};

/// Reads exactly `buf.len()` bytes or until EOF, returning the number of
/// bytes actually read. Short reads caused by `Interrupted` are retried;
/// any other read is returned verbatim.
pub(crate) fn read_exact_or_eof<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

pub(crate) fn read_u16_le<R: Read + ?Sized>(r: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub(crate) fn read_u32_le<R: Read + ?Sized>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_i32_le<R: Read + ?Sized>(r: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub(crate) fn read_i64_le<R: Read + ?Sized>(r: &mut R) -> Result<i64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

pub(crate) fn write_u16_le<W: Write + ?Sized>(w: &mut W, v: u16) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_u32_le<W: Write + ?Sized>(w: &mut W, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_i32_le<W: Write + ?Sized>(w: &mut W, v: i32) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_i64_le<W: Write + ?Sized>(w: &mut W, v: i64) -> Result<()> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Reads a `u8`-length-prefixed ASCII string, as written by
/// [`write_length_prefixed_string`]. Lengths of 128 or more are out of
/// range for every name this format ever emits and are rejected as
/// corruption rather than interpreted as a multi-byte length.
///
/// A stream truncated partway through the length byte, the name bytes,
/// or carrying invalid UTF-8 is a header-format error, not a transient
/// I/O fault — but which *kind* of header error depends on which stream
/// is being parsed (a signature header's `CorruptSignature` vs. a
/// delta header's `MalformedDelta`). Callers pass `err` to pick the
/// right variant for their own header.
pub(crate) fn read_length_prefixed_string<R: Read + ?Sized>(
    r: &mut R,
    err: impl Fn(String) -> Error,
) -> Result<String> {
    let mut len_buf = [0u8; 1];
    read_exact_mapped(r, &mut len_buf, &err, "truncated string length prefix")?;
    let len = len_buf[0];
    if len >= 128 {
        return Err(err(format!("string length {len} is out of range")));
    }
    let mut bytes = vec![0u8; len as usize];
    read_exact_mapped(r, &mut bytes, &err, "truncated string bytes")?;
    String::from_utf8(bytes).map_err(|e| err(format!("name is not valid UTF-8: {e}")))
}

/// Reads exactly `buf.len()` bytes, mapping a truncated read (EOF mid-read)
/// through `err` rather than surfacing it as [`Error::Io`]; any other I/O
/// failure is passed through unchanged.
fn read_exact_mapped<R: Read + ?Sized>(
    r: &mut R,
    buf: &mut [u8],
    err: &impl Fn(String) -> Error,
    context: &str,
) -> Result<()> {
    match r.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(err(context.to_string())),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Writes a string as a single length byte followed by its ASCII/UTF-8
/// bytes. Only ever called with the fixed algorithm names this crate
/// knows about, all well under the 128-byte limit.
pub(crate) fn write_length_prefixed_string<W: Write + ?Sized>(w: &mut W, s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    debug_assert!(bytes.len() < 128, "name too long for single-byte prefix");
    w.write_all(&[bytes.len() as u8])?;
    w.write_all(bytes)?;
    Ok(())
}

/// Runs `f` with `source`'s read/write position saved, then restores it
/// regardless of whether `f` succeeded. If the restoring seek itself
/// fails, that failure is what's surfaced to the caller — matching the
/// reference tool's behavior of letting a failed seek-back clobber
/// whatever error (if any) `f` produced.
pub(crate) fn with_restored_position<S, F, T>(source: &mut S, f: F) -> Result<T>
where
    S: Seek,
    F: FnOnce(&mut S) -> Result<T>,
{
    let original = source.stream_position()?;
    let result = f(source);
    match source.seek(SeekFrom::Start(original)) {
        Ok(_) => result,
        Err(e) => Err(Error::Io(e)),
    }
}

/// Draws fixed-size blocks from a byte source (C3). Every block is
/// exactly `block_size` bytes except the final one, which may be
/// shorter; an empty source yields no blocks at all.
pub(crate) struct ChunkedReader<R> {
    reader: R,
    buffer: Vec<u8>,
    block_size: usize,
    done: bool,
}

impl<R: Read> ChunkedReader<R> {
    pub(crate) fn new(reader: R, block_size: usize) -> Self {
        Self {
            reader,
            buffer: vec![0u8; block_size],
            block_size,
            done: false,
        }
    }

    /// Returns the next block, or `None` once the source is exhausted.
    pub(crate) fn next_chunk(&mut self) -> Result<Option<&[u8]>> {
        if self.done {
            return Ok(None);
        }
        let n = read_exact_or_eof(&mut self.reader, &mut self.buffer[..self.block_size])?;
        if n == 0 {
            self.done = true;
            return Ok(None);
        }
        if n < self.block_size {
            self.done = true;
        }
        Ok(Some(&self.buffer[..n]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn chunked_reader_splits_exact_and_partial_blocks() {
        let data: Vec<u8> = (0..20u8).collect();
        let mut reader = ChunkedReader::new(Cursor::new(data), 8);

        assert_eq!(reader.next_chunk().unwrap(), Some(&(0u8..8).collect::<Vec<_>>()[..]));
        assert_eq!(reader.next_chunk().unwrap(), Some(&(8u8..16).collect::<Vec<_>>()[..]));
        assert_eq!(reader.next_chunk().unwrap(), Some(&(16u8..20).collect::<Vec<_>>()[..]));
        assert_eq!(reader.next_chunk().unwrap(), None);
    }

    #[test]
    fn chunked_reader_on_empty_source_yields_nothing() {
        let mut reader = ChunkedReader::new(Cursor::new(Vec::<u8>::new()), 8);
        assert_eq!(reader.next_chunk().unwrap(), None);
    }

    #[test]
    fn chunked_reader_exact_multiple_has_no_trailing_empty_block() {
        let data: Vec<u8> = (0..16u8).collect();
        let mut reader = ChunkedReader::new(Cursor::new(data), 8);
        assert!(reader.next_chunk().unwrap().is_some());
        assert!(reader.next_chunk().unwrap().is_some());
        assert_eq!(reader.next_chunk().unwrap(), None);
    }

    #[test]
    fn length_prefixed_string_round_trips() {
        let mut buf = Vec::new();
        write_length_prefixed_string(&mut buf, "Adler32V2").unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(
            read_length_prefixed_string(&mut cursor, Error::CorruptSignature).unwrap(),
            "Adler32V2"
        );
    }

    #[test]
    fn length_prefixed_string_truncated_mid_name_maps_to_caller_error_kind() {
        let mut buf = Vec::new();
        write_length_prefixed_string(&mut buf, "Adler32V2").unwrap();
        buf.truncate(buf.len() - 2); // chop the last two name bytes off

        let err =
            read_length_prefixed_string(&mut Cursor::new(buf.clone()), Error::CorruptSignature)
                .unwrap_err();
        assert!(matches!(err, Error::CorruptSignature(_)));

        let err = read_length_prefixed_string(&mut Cursor::new(buf), Error::MalformedDelta)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedDelta(_)));
    }

    #[test]
    fn with_restored_position_restores_after_success() {
        let mut cursor = Cursor::new(vec![0u8; 64]);
        cursor.seek(SeekFrom::Start(10)).unwrap();
        with_restored_position(&mut cursor, |c| {
            c.seek(SeekFrom::Start(40))?;
            Ok(())
        })
        .unwrap();
        assert_eq!(cursor.stream_position().unwrap(), 10);
    }

    #[test]
    fn with_restored_position_restores_after_failure() {
        let mut cursor = Cursor::new(vec![0u8; 64]);
        cursor.seek(SeekFrom::Start(5)).unwrap();
        let result: Result<()> = with_restored_position(&mut cursor, |_c| {
            Err(Error::MalformedDelta("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(cursor.stream_position().unwrap(), 5);
    }
}
