//! Header-layout checks against the literal hex vectors in §8 of the
//! format description. The header bytes (magic, version, algorithm
//! names, end-of-metadata marker) don't depend on basis content, so they
//! can be checked byte-for-byte without reproducing the exact basis blob
//! the vectors were generated from.

use octodiff_core::{
    read_signature, write_signature, write_signature_with_chunk_size, Error, RollingKind,
    SignatureOptions, SignatureWriter,
};
use std::io::Cursor;

const S1_HEADER: &str = "4f43544f5349470104534841310741646c657233323e3e3e";
const S2_HEADER: &str = "4f43544f5349470104534841310941646c6572333256323e3e3e";

#[test]
fn default_signature_header_matches_s1_prefix() {
    let mut out = Vec::new();
    write_signature(Cursor::new(&b"whatever basis bytes go here"[..]), &mut out).unwrap();

    let expected = hex::decode(S1_HEADER).unwrap();
    assert_eq!(&out[..expected.len()], &expected[..]);
}

#[test]
fn adler32v2_signature_header_matches_s2_prefix() {
    let options = SignatureOptions {
        rolling: RollingKind::Adler32V2,
        ..SignatureOptions::default()
    };
    let mut out = Vec::new();
    SignatureWriter::new(options)
        .unwrap()
        .write(Cursor::new(&b"whatever basis bytes go here"[..]), &mut out)
        .unwrap();

    let expected = hex::decode(S2_HEADER).unwrap();
    assert_eq!(&out[..expected.len()], &expected[..]);
}

#[test]
fn chunk_records_cover_basis_in_order_with_reconstructed_offsets() {
    let basis: Vec<u8> = (0..1000u32).map(|n| (n % 251) as u8).collect();
    let mut out = Vec::new();
    write_signature_with_chunk_size(Cursor::new(&basis), &mut out, 300).unwrap();

    let signature = read_signature(&mut Cursor::new(out)).unwrap();
    assert_eq!(signature.chunks.len(), 4); // 300, 300, 300, 100
    assert_eq!(
        signature.chunks.iter().map(|c| u64::from(c.length)).sum::<u64>(),
        basis.len() as u64
    );

    let mut offset = 0u64;
    for chunk in &signature.chunks {
        assert_eq!(chunk.start_offset, offset);
        offset += u64::from(chunk.length);
    }
    assert_eq!(signature.chunks.last().unwrap().length, 100);
}

#[test]
fn unknown_rolling_checksum_name_is_rejected_on_read() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&hex::decode("4f43544f534947010404534841310443524332").unwrap());
    buf.extend_from_slice(&[0x3E, 0x3E, 0x3E]);

    let err = read_signature(&mut Cursor::new(buf)).unwrap_err();
    assert!(matches!(err, Error::UnsupportedAlgorithm(name) if name == "CRC2"));
}
