//! Integration tests for writing code segments with address fixups.
//!
//! The segments are written both into an in-memory cursor and into a memory-mapped output file,
//! then the patched operands are read back.

use std::io::Cursor;

use cilmeta::prelude::*;
use tempfile::NamedTempFile;

const IMAGE_BASE: u64 = 0x0040_0000;

/// A call stub `call rel32; jmp [abs32]; ret` and a data segment the stub refers to
fn stub_image() -> Result<(CodeImage, SegmentId, SegmentId)> {
    let mut image = CodeImage::new(IMAGE_BASE);
    let helper = image.define_symbol("helper");
    let table = image.define_symbol("import_table");

    let mut stub = CodeSegment::new(vec![
        0xE8, 0x00, 0x00, 0x00, 0x00, // call helper
        0xFF, 0x25, 0x00, 0x00, 0x00, 0x00, // jmp [import_table]
        0xC3, // ret
    ]);
    stub.add_fixup(AddressFixup::new(1, AddressFixupKind::Relative32, helper))?;
    stub.add_fixup(AddressFixup::new(7, AddressFixupKind::Absolute32, table))?;
    let stub = image.add_segment(stub);

    let data = image.add_segment(CodeSegment::new(vec![0xAA; 8]));

    let mut assignment = AddressAssignment::new();
    assignment
        .place_segment(stub, 0x400, 0x1000)
        .place_segment(data, 0x600, 0x3000)
        .place_symbol(helper, 0x1800)
        .place_symbol(table, 0x3000);
    image.assign_addresses(&assignment)?;

    Ok((image, stub, data))
}

fn check_stub(bytes: &[u8]) {
    let call = i32::from_le_bytes(bytes[0x401..0x405].try_into().unwrap());
    assert_eq!(call, 0x1800 - 0x1005);

    let jump = u32::from_le_bytes(bytes[0x407..0x40B].try_into().unwrap());
    assert_eq!(jump, 0x0040_3000);

    assert_eq!(bytes[0x400], 0xE8);
    assert_eq!(bytes[0x40B], 0xC3);
    assert_eq!(&bytes[0x600..0x608], &[0xAA; 8]);
}

#[test]
fn write_into_memory() -> Result<()> {
    let (mut image, stub, data) = stub_image()?;

    let mut output = Cursor::new(Vec::new());
    image.write_all(&mut output)?;
    check_stub(output.get_ref());

    assert_eq!(
        image.segment(stub).map(CodeSegment::state),
        Some(SegmentState::Written(SegmentPlacement {
            offset: 0x400,
            rva: 0x1000
        }))
    );
    assert!(image
        .write_segment(data, &mut output)
        .unwrap_err()
        .is_invariant_violation());
    Ok(())
}

#[test]
fn write_into_mapped_file() -> Result<()> {
    let (mut image, _, _) = stub_image()?;
    let file = NamedTempFile::new()?;
    let path = file.path().to_path_buf();

    let mut output = Output::create(&path, 0x800)?;
    image.write_all(&mut output)?;
    assert_eq!(output.position(), 0x608);
    check_stub(output.as_slice());
    output.finalize()?;

    let written = std::fs::read(&path)?;
    assert_eq!(written.len(), 0x800);
    check_stub(&written);
    Ok(())
}

#[test]
fn segments_written_out_of_order() -> Result<()> {
    let (mut image, stub, data) = stub_image()?;

    let mut output = Cursor::new(vec![0u8; 0x800]);
    image.write_segment(data, &mut output)?;
    assert_eq!(output.position(), 0x608);
    image.write_segment(stub, &mut output)?;
    assert_eq!(output.position(), 0x40C);

    check_stub(output.get_ref());
    Ok(())
}

#[test]
fn symbols_are_read_only_after_assignment() -> Result<()> {
    let mut image = CodeImage::new(IMAGE_BASE);
    let early = image.define_symbol("early");
    assert!(image
        .symbol_rva(early)
        .unwrap_err()
        .is_invariant_violation());

    let mut assignment = AddressAssignment::new();
    assignment.place_symbol(early, 0x2000);
    image.assign_addresses(&assignment)?;
    assert_eq!(image.symbol_rva(early)?, 0x2000);
    assert_eq!(image.symbols().name(early), Some("early"));

    let late = image.define_symbol("late");
    assert!(image.symbol_rva(late).unwrap_err().is_invariant_violation());
    Ok(())
}
