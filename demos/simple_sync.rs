use octodiff_core::{build_delta, write_signature, DeltaReader};
use std::io::Cursor;

fn main() -> Result<(), octodiff_core::Error> {
    let basis = b"Hello, world! This is the original content of the file.".to_vec();
    let new_file = b"Hello, Rust! This is the modified content of the file.".to_vec();

    println!("basis:    {:?}", String::from_utf8_lossy(&basis));
    println!("new file: {:?}", String::from_utf8_lossy(&new_file));

    let mut signature = Vec::new();
    write_signature(Cursor::new(&basis), &mut signature)?;
    println!("\nsignature is {} bytes", signature.len());

    let mut delta = Vec::new();
    build_delta(
        &mut Cursor::new(new_file.clone()),
        &mut Cursor::new(signature),
        &mut delta,
    )?;
    println!("delta is {} bytes", delta.len());

    // Patch application is the mechanical inverse of the delta reader: a
    // COPY command pulls bytes out of the basis, a DATA command pulls
    // bytes out of the delta itself.
    let mut reconstructed = Vec::new();
    DeltaReader.apply(
        &mut Cursor::new(delta),
        |bytes| {
            reconstructed.extend_from_slice(bytes);
            Ok(())
        },
        |offset, length| {
            let start = offset as usize;
            let end = start + length as usize;
            reconstructed.extend_from_slice(&basis[start..end]);
            Ok(())
        },
    )?;

    assert_eq!(reconstructed, new_file);
    println!(
        "\nreconstructed: {:?}",
        String::from_utf8_lossy(&reconstructed)
    );
    println!("basis + delta = new file");
    Ok(())
}
