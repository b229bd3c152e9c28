//! Integrity checks and composition of readers and writers across formats.

use arcstream_archive::predicate::{self, Predicate, PredicateExt};
use arcstream_archive::source::{filter, read_concat, read_memory, read_multi, to_memory, to_multi};
use arcstream_archive::tar::{TarReader, TarWriter};
use arcstream_archive::zip::{ZipReader, ZipWriter};
use arcstream_core::{ArcError, DEFAULT_BUFFER_SIZE, Reader, Stat, Writer};

fn tar_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = TarWriter::new("", to_memory()).unwrap();
    for (name, data) in files {
        writer.new_file(name, &Stat::new(), "").unwrap();
        writer.write_data(data).unwrap();
    }
    writer.close().unwrap();
    writer.into_inner().into_inner()
}

fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new("", to_memory()).unwrap().with_level(9);
    for (name, data) in files {
        writer.new_file(name, &Stat::new(), "").unwrap();
        writer.write_data(data).unwrap();
    }
    writer.close().unwrap();
    writer.into_inner().into_inner()
}

// ============================================================================
// Corruption
// ============================================================================

#[test]
fn test_tar_checksum_rejected() {
    let mut data = tar_bytes(&[("x.txt", &b"ABCDEFGH"[..])]);
    data[0] ^= 0x01;

    let mut reader = TarReader::new(Box::new(read_memory(data, "x.tar")), false);
    assert!(matches!(
        reader.next(),
        Err(ArcError::ChecksumMismatch { .. })
    ));
}

/// Offset of the first entry's data in a zip archive.
fn first_payload(data: &[u8]) -> usize {
    let name_len = u16::from_le_bytes([data[26], data[27]]) as usize;
    let extra_len = u16::from_le_bytes([data[28], data[29]]) as usize;
    30 + name_len + extra_len
}

#[test]
fn test_zip_crc_rejected_lazily() {
    let body = "compressible line\n".repeat(200);
    let data = zip_bytes(&[("big.txt", body.as_bytes()), ("after.txt", &b"ok"[..])]);
    let payload = first_payload(&data);

    for delta in [2, 5, 10] {
        let mut damaged = data.clone();
        damaged[payload + delta] ^= 0x01;

        let mut reader = ZipReader::new(Box::new(read_memory(damaged, "bad.zip")), false);
        assert!(reader.next().unwrap());
        assert_eq!(reader.filename(), "big.txt");
        assert_eq!(reader.stat().size, Some(body.len() as u64));
        assert!(
            matches!(reader.read_data(Some(16)), Err(ArcError::CrcMismatch { .. })),
            "bit flipped at data offset {delta}"
        );
    }
}

#[test]
fn test_zip_stored_crc_field_checked() {
    let body = "compressible line\n".repeat(200);
    let mut data = zip_bytes(&[("big.txt", body.as_bytes()), ("after.txt", &b"ok"[..])]);
    // CRC-32 field of the first local header
    data[14] ^= 0x01;

    let mut reader = ZipReader::new(Box::new(read_memory(data, "bad.zip")), false);
    assert!(reader.next().unwrap());
    assert!(matches!(
        reader.read_data(None),
        Err(ArcError::CrcMismatch { .. })
    ));
}

#[test]
fn test_zip_failed_entry_keeps_position() {
    let body = "compressible line\n".repeat(200);
    let mut data = zip_bytes(&[("big.txt", body.as_bytes()), ("after.txt", &b"ok"[..])]);
    data[14] ^= 0x01;

    let mut reader = ZipReader::new(Box::new(read_memory(data, "bad.zip")), false);
    assert!(reader.next().unwrap());
    assert!(matches!(
        reader.read_data(None),
        Err(ArcError::CrcMismatch { .. })
    ));
    // The damaged entry stays failed and the archive position is untouched.
    assert!(reader.read_data(None).is_err());
    assert!(reader.read_data(Some(4)).is_err());
    assert!(reader.next().unwrap());
    assert_eq!(reader.filename(), "after.txt");
    assert_eq!(reader.read_data(None).unwrap().unwrap(), b"ok");
    assert!(!reader.next().unwrap());
}

#[test]
fn test_zip_crc_not_checked_when_skipped() {
    let mut data = zip_bytes(&[("big.txt", &b"payload payload payload"[..]), ("after.txt", &b"ok"[..])]);
    data[14] ^= 0x01;

    let mut reader = ZipReader::new(Box::new(read_memory(data, "bad.zip")), false);
    assert!(reader.next().unwrap());
    assert!(reader.next().unwrap());
    assert_eq!(reader.filename(), "after.txt");
    assert_eq!(reader.read_data(None).unwrap().unwrap(), b"ok");
}

// ============================================================================
// Composition
// ============================================================================

/// Entries of equal content in a tar, a zip and memory.
fn mixed_source() -> Box<dyn Reader> {
    let nine: &[u8] = b"123456789";
    let eight: &[u8] = b"12345678";
    Box::new(read_multi([
        Box::new(TarReader::new(
            Box::new(read_memory(tar_bytes(&[("t9.txt", nine), ("t8.txt", eight)]), "a.tar")),
            false,
        )) as Box<dyn Reader>,
        Box::new(ZipReader::new(
            Box::new(read_memory(zip_bytes(&[("z9.txt", nine), ("z8.txt", eight)]), "b.zip")),
            false,
        )),
        Box::new(read_memory(nine, "m9.txt")),
        Box::new(read_memory(eight, "m8.txt")),
    ]))
}

#[test]
fn test_predicate_algebra_across_formats() {
    let mut reader = mixed_source();
    let mut seen = 0;
    while reader.next().unwrap() {
        let entry: &dyn Reader = &*reader;
        assert!(!predicate::always().and(predicate::never()).is_true(entry));
        assert!(predicate::never().or(predicate::always()).is_true(entry));
        assert!(!predicate::always().not().is_true(entry));

        let nine = entry.filename().contains('9');
        assert_eq!(predicate::min_size(9).is_true(entry), nine);
        seen += 1;
    }
    reader.close().unwrap();
    assert_eq!(seen, 6);
}

#[test]
fn test_filter_across_formats() {
    let mut reader = filter(predicate::min_size(9), mixed_source());
    assert_eq!(reader.file_list().unwrap(), vec!["t9.txt", "z9.txt", "m9.txt"]);
}

#[test]
fn test_multi_writer_fan_out() {
    let mut writer = to_multi(to_memory(), to_memory());
    writer.new_file("x.txt", &Stat::new(), "text/plain").unwrap();
    writer.write_data(b"ABC").unwrap();
    writer.write_data(b"DEF").unwrap();
    writer.close().unwrap();

    let (a, b) = writer.into_inner();
    assert_eq!(a.data(), b"ABCDEF");
    assert_eq!(b.data(), b"ABCDEF");
}

#[test]
fn test_concat_over_archive_entries() {
    let tar = tar_bytes(&[("a", &b"ABCDE"[..]), ("b", &b"FGHIJ"[..]), ("c", &b"KLMNO"[..])]);
    let source = TarReader::new(Box::new(read_memory(tar, "parts.tar")), false);
    let mut reader = read_concat(Box::new(source), "joined.txt", Stat::new()).unwrap();
    assert_eq!(reader.stat().size, Some(15));

    assert!(reader.next().unwrap());
    assert_eq!(reader.read_data(Some(3)).unwrap().unwrap(), b"ABC");
    assert_eq!(reader.read_data(Some(3)).unwrap().unwrap(), b"DEF");
    assert_eq!(reader.read_data(None).unwrap().unwrap(), b"GHIJKLMNO");
    assert_eq!(reader.read_data(Some(3)).unwrap(), None);
}

#[test]
fn test_convert_tar_to_zip() {
    let tar = tar_bytes(&[("docs/a.txt", &b"alpha"[..]), ("b.bin", &[0u8, 1, 2, 3][..])]);
    let mut source = TarReader::new(Box::new(read_memory(tar, "in.tar")), false);
    let mut zip = ZipWriter::new("", to_memory()).unwrap();
    source.extract(&mut zip, true, DEFAULT_BUFFER_SIZE).unwrap();

    let mut reader = ZipReader::new(
        Box::new(read_memory(zip.into_inner().into_inner(), "out.zip")),
        false,
    );
    assert!(reader.next().unwrap());
    assert_eq!(reader.filename(), "docs/a.txt");
    assert_eq!(reader.read_data(None).unwrap().unwrap(), b"alpha");
    assert!(reader.next().unwrap());
    assert_eq!(reader.filename(), "b.bin");
    assert_eq!(reader.read_data(None).unwrap().unwrap(), [0u8, 1, 2, 3]);
    assert!(!reader.next().unwrap());
}
