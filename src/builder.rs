//! The delta builder (C8): the rolling-match engine that turns a new file
//! and a basis signature into a delta command stream. This is where C1
//! (rolling checksum), C2 (strong hash), C5 (signature reader), and C6
//! (delta writer) come together.

use crate::delta_writer::DeltaWriter;
use crate::error::Result;
use crate::hash;
use crate::rolling;
use crate::signature::SignatureReader;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom, Write};

/// The scan buffer size: large enough that most files are a single pass,
/// small enough to bound memory for huge inputs.
const SCAN_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Builds an `OCTODELTA` stream describing how to turn a basis (summarized
/// by a signature) into a new file.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaBuilder;

impl DeltaBuilder {
    /// Reads the signature from `signature_input`, scans `new_file`
    /// (which must support seeking and starts wherever the caller left
    /// it — its final position is unspecified), and writes the resulting
    /// delta to `output`.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::UnsupportedAlgorithm`] if the
    /// signature names an algorithm this crate doesn't implement, or
    /// propagates any I/O error from reading `new_file`/`signature_input`
    /// or writing `output`.
    pub fn build<N, S, O>(&self, new_file: &mut N, signature_input: &mut S, output: &mut O) -> Result<()>
    where
        N: Read + Seek,
        S: Read,
        O: Write,
    {
        let signature = SignatureReader.read(signature_input)?;

        let new_file_length = new_file.seek(SeekFrom::End(0))?;
        new_file.seek(SeekFrom::Start(0))?;

        let hash = hash::by_name(&signature.hash_name)?;
        let expected_hash = hash.hash_stream(new_file)?;
        new_file.seek(SeekFrom::Start(0))?;

        let mut writer = DeltaWriter::new(output);
        writer.write_metadata(&signature.hash_name, &expected_hash)?;

        if signature.chunks.is_empty() {
            #[allow(clippy::cast_possible_wrap)]
            if new_file_length > 0 {
                writer.write_data(new_file, 0, new_file_length as i64)?;
            }
            return Ok(());
        }

        let rolling = rolling::by_name(&signature.rolling_checksum_name)?;

        // Stable sort by rolling_checksum descending: ties keep basis order.
        let mut sorted = signature.chunks.clone();
        sorted.sort_by(|a, b| b.rolling_checksum.cmp(&a.rolling_checksum));

        let mut index: HashMap<u32, usize> = HashMap::new();
        let mut min_chunk_size = usize::MAX;
        let mut max_chunk_size = 0usize;
        for (idx, chunk) in sorted.iter().enumerate() {
            index.entry(chunk.rolling_checksum).or_insert(idx);
            let len = chunk.length as usize;
            min_chunk_size = min_chunk_size.min(len);
            max_chunk_size = max_chunk_size.max(len);
        }
        log::debug!(
            "chunk map built: {} chunks, window {}..={}",
            sorted.len(),
            min_chunk_size,
            max_chunk_size
        );

        let mut last_match_position: i64 = 0;
        let mut start_position: i64 = 0;
        let mut buffer = vec![0u8; SCAN_BUFFER_SIZE];

        loop {
            let bytes_in_buffer =
                crate::io_util::read_exact_or_eof(new_file, &mut buffer)?;
            if bytes_in_buffer == 0 {
                break;
            }

            if bytes_in_buffer >= min_chunk_size {
                let upper = bytes_in_buffer - min_chunk_size;
                let mut checksum: u32 = 0;
                let mut prev_w: usize = 0;

                for i in 0..=upper {
                    let remaining_in_buffer = bytes_in_buffer - i;
                    let w = if remaining_in_buffer >= max_chunk_size {
                        max_chunk_size
                    } else {
                        min_chunk_size
                    };

                    if i == 0 || w != prev_w {
                        checksum = rolling.calculate(&buffer[i..i + w]);
                    } else {
                        checksum = rolling.rotate(checksum, buffer[i - 1], buffer[i + w - 1], w);
                    }
                    prev_w = w;

                    #[allow(clippy::cast_possible_wrap)]
                    let read_so_far = start_position + i as i64;
                    #[allow(clippy::cast_possible_wrap)]
                    let w64 = w as i64;
                    if read_so_far - (last_match_position - w64) < w64 {
                        log::trace!("throttled probe at new-file offset {read_so_far}");
                        continue;
                    }

                    let Some(&first_idx) = index.get(&checksum) else {
                        continue;
                    };

                    let mut j = first_idx;
                    while j < sorted.len() && sorted[j].rolling_checksum == checksum {
                        let strong = hash.hash_bytes(&buffer[i..i + w]);
                        if strong == sorted[j].strong_hash {
                            #[allow(clippy::cast_possible_wrap)]
                            let end = start_position + i as i64 + w64;
                            if end - last_match_position > w64 {
                                writer.write_data(
                                    new_file,
                                    last_match_position,
                                    end - w64 - last_match_position,
                                )?;
                            }
                            log::trace!(
                                "match: new-file [{last_match_position}, {end}) -> basis offset {}",
                                sorted[j].start_offset
                            );
                            #[allow(clippy::cast_possible_wrap)]
                            writer.write_copy(
                                sorted[j].start_offset as i64,
                                i64::from(sorted[j].length),
                            )?;
                            last_match_position = end;
                            break;
                        }
                        j += 1;
                    }
                }
            }

            if bytes_in_buffer == buffer.len() {
                #[allow(clippy::cast_possible_wrap)]
                let back = (max_chunk_size as i64) - 1;
                let new_pos = new_file.seek(SeekFrom::Current(-back))?;
                #[allow(clippy::cast_possible_wrap)]
                {
                    start_position = new_pos as i64;
                }
            } else {
                break;
            }
        }

        #[allow(clippy::cast_possible_wrap)]
        let new_file_length_signed = new_file_length as i64;
        if last_match_position < new_file_length_signed {
            writer.write_data(
                new_file,
                last_match_position,
                new_file_length_signed - last_match_position,
            )?;
        }

        Ok(())
    }
}

/// Builds a delta with a fresh [`DeltaBuilder`].
///
/// # Errors
/// See [`DeltaBuilder::build`].
pub fn build_delta<N, S, O>(new_file: &mut N, signature_input: &mut S, output: &mut O) -> Result<()>
where
    N: Read + Seek,
    S: Read,
    O: Write,
{
    DeltaBuilder.build(new_file, signature_input, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta_reader::DeltaReader;
    use crate::signature::write_signature_with_chunk_size;
    use std::io::Cursor;

    fn test_blob() -> Vec<u8> {
        let mut seed: u64 = 0x1234_5678;
        (0..520)
            .map(|_| {
                seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                (seed >> 56) as u8
            })
            .collect()
    }

    #[derive(Debug, PartialEq)]
    enum Command {
        Data(Vec<u8>),
        Copy(i64, i64),
    }

    fn run_delta(new: &[u8], basis: &[u8], chunk_size: usize) -> Vec<Command> {
        let mut sig_bytes = Vec::new();
        write_signature_with_chunk_size(Cursor::new(basis), &mut sig_bytes, chunk_size).unwrap();

        let mut delta_bytes = Vec::new();
        build_delta(
            &mut Cursor::new(new.to_vec()),
            &mut Cursor::new(sig_bytes),
            &mut delta_bytes,
        )
        .unwrap();

        let mut commands = Vec::new();
        DeltaReader
            .apply(
                &mut Cursor::new(delta_bytes),
                |bytes| {
                    commands.push(Command::Data(bytes.to_vec()));
                    Ok(())
                },
                |offset, length| {
                    commands.push(Command::Copy(offset, length));
                    Ok(())
                },
            )
            .unwrap();
        commands
    }

    #[test]
    fn identity_delta_is_single_copy() {
        // With the default 2048-byte chunk size the ~520-byte blob fits
        // in one chunk, so an identical new file resolves to one COPY
        // spanning the whole basis.
        let blob = test_blob();
        let commands = run_delta(&blob, &blob, 2048);
        assert_eq!(commands, vec![Command::Copy(0, 520)]);
    }

    #[test]
    fn identity_delta_of_empty_basis_is_empty() {
        let commands = run_delta(&[], &[], 128);
        assert!(commands.is_empty());
    }

    #[test]
    fn empty_basis_yields_single_data_command() {
        let blob = test_blob();
        let commands = run_delta(&blob, &[], 128);
        assert_eq!(commands, vec![Command::Data(blob)]);
    }

    #[test]
    fn prepend_yields_data_then_copy() {
        let blob = test_blob();
        let mut new_file = vec![0xAA];
        new_file.extend_from_slice(&blob);

        let commands = run_delta(&new_file, &blob, 2048);
        assert_eq!(
            commands,
            vec![Command::Data(vec![0xAA]), Command::Copy(0, 520)]
        );
    }

    #[test]
    fn small_change_in_middle_keeps_surrounding_copies() {
        let mut basis = test_blob();
        basis.truncate(512);
        let mut new_file = basis.clone();
        new_file[256] ^= 0xFF; // corrupt one byte in the middle

        let commands = run_delta(&new_file, &basis, 128);
        // The corrupted byte falls inside the third 128-byte chunk
        // (bytes 256..384); the chunks before and after it should still
        // resolve to COPY commands, with a DATA command carrying the
        // literal replacement bytes in between.
        assert!(commands.iter().any(|c| matches!(c, Command::Copy(0, 128))));
        assert!(commands.iter().any(|c| matches!(c, Command::Copy(128, 128))));
        assert!(commands
            .iter()
            .any(|c| matches!(c, Command::Copy(384, 128))));
        assert!(commands.iter().any(|c| matches!(c, Command::Data(_))));
    }

    #[test]
    fn round_trip_reconstructs_repeated_content() {
        // The new file is two back-to-back copies of the basis, so the
        // builder must match the same basis chunks twice without the
        // throttle causing it to skip or duplicate any new-file bytes.
        let blob = test_blob();
        let mut new_file = blob.clone();
        new_file.extend_from_slice(&blob);

        let commands = run_delta(&new_file, &blob, 64);
        let mut reconstructed = Vec::new();
        for command in commands {
            match command {
                Command::Data(bytes) => reconstructed.extend_from_slice(&bytes),
                Command::Copy(offset, length) => {
                    #[allow(clippy::cast_sign_loss)]
                    let start = offset as usize;
                    #[allow(clippy::cast_sign_loss)]
                    let len = length as usize;
                    reconstructed.extend_from_slice(&blob[start..start + len]);
                }
            }
        }
        assert_eq!(reconstructed, new_file);
    }
}
