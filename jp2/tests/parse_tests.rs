mod common;

use common::*;
use jp2::{decode_jp2, JP2Error, BOX_TYPE_CONTIGUOUS_CODESTREAM};
use jpc::{decode_jpc, ErrorKind};

fn header_box(height: u32, width: u32, components: u16) -> Vec<u8> {
    jp2_box(b"jp2h", &image_header_box(height, width, components, 7))
}

#[test]
fn test_minimal_jp2() {
    init_logger();
    let builder = FileBuilder::jp2().bytes(&header_box(16, 32, 3));
    let expected_offset = builder.len() + 8;
    let mut reader = builder.jp2_box(b"jp2c", &codestream(32, 16, 3)).reader();

    let jp2 = decode_jp2(&mut reader).expect("minimal JP2 should decode");
    assert!(jp2.jp2_used());
    assert_eq!(jp2.codestream_offset(), expected_offset);
    assert_eq!(jp2.codestream_offset(), 70);
    assert_eq!(reader.position(), 70);

    let file_type = jp2.file_type_box().expect("ftyp");
    assert_eq!(file_type.brand(), "jp2 ");
    assert_eq!(file_type.compatibility_list(), vec!["jp2 ".to_string()]);

    let image_header = jp2.image_header_box().expect("ihdr");
    assert_eq!(image_header.height(), 16);
    assert_eq!(image_header.width(), 32);
    assert_eq!(image_header.components_num(), 3);
    assert_eq!(image_header.components_bits(), Some(8));

    let codestream = decode_jpc(&mut reader).expect("codestream should decode");
    assert_eq!(codestream.offset(), 70);
    assert_eq!(codestream.header().num_components(), 3);
    assert!(jp2.verify_image_header(codestream.header().image_and_tile_size_marker_segment()));
}

#[test]
fn test_raw_codestream() {
    let mut reader = FileBuilder::new().bytes(&codestream(8, 8, 1)).reader();
    let jp2 = decode_jp2(&mut reader).unwrap();
    assert!(!jp2.jp2_used());
    assert_eq!(jp2.codestream_offset(), 0);
    assert!(jp2.file_type_box().is_none());
    assert_eq!(reader.position(), 0);

    let codestream = decode_jpc(&mut reader).unwrap();
    assert_eq!(codestream.header().num_tiles(), 1);
    // Nothing to compare against
    assert!(jp2.verify_image_header(codestream.header().image_and_tile_size_marker_segment()));
}

#[test]
fn test_not_jpeg2000() {
    let mut reader = FileBuilder::new().bytes(b"GIF89a").reader();
    let error = decode_jp2(&mut reader).unwrap_err();
    assert!(matches!(error, JP2Error::NotJpeg2000 { offset: 0 }));
    assert_eq!(error.kind(), ErrorKind::MalformedStructure);

    let mut reader = FileBuilder::new().bytes(&[0xFF]).reader();
    let error = decode_jp2(&mut reader).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MalformedStructure);
}

#[test]
fn test_not_compatible() {
    let mut reader = FileBuilder::new()
        .bytes(&signature_box())
        .bytes(&file_type_box(b"jpx ", &[b"jpx ", b"jpxb"]))
        .bytes(&header_box(8, 8, 1))
        .jp2_box(b"jp2c", &codestream(8, 8, 1))
        .reader();
    let error = decode_jp2(&mut reader).unwrap_err();
    match error {
        JP2Error::NotCompatible { compatibility_list } => {
            assert_eq!(compatibility_list, vec!["jpx ", "jpxb"]);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_other_brand_compatible_with_jp2() {
    let mut reader = FileBuilder::new()
        .bytes(&signature_box())
        .bytes(&file_type_box(b"jpx ", &[b"jpx ", b"jp2 "]))
        .bytes(&header_box(8, 8, 1))
        .jp2_box(b"jp2c", &codestream(8, 8, 1))
        .reader();
    let jp2 = decode_jp2(&mut reader).unwrap();
    assert_eq!(jp2.file_type_box().map(|f| f.brand()), Some("jpx ".to_string()));
}

#[test]
fn test_file_type_must_follow_signature() {
    let mut reader = FileBuilder::new()
        .bytes(&signature_box())
        .bytes(&header_box(8, 8, 1))
        .reader();
    let error = decode_jp2(&mut reader).unwrap_err();
    assert!(matches!(error, JP2Error::BoxUnexpected { .. }));
}

#[test]
fn test_codestream_before_header() {
    let mut reader = FileBuilder::jp2()
        .jp2_box(b"jp2c", &codestream(8, 8, 1))
        .bytes(&header_box(8, 8, 1))
        .reader();
    let error = decode_jp2(&mut reader).unwrap_err();
    assert!(matches!(error, JP2Error::BoxUnexpected { .. }));
    assert_eq!(error.kind(), ErrorKind::MalformedStructure);
}

#[test]
fn test_duplicate_header() {
    let mut reader = FileBuilder::jp2()
        .bytes(&header_box(8, 8, 1))
        .bytes(&header_box(8, 8, 1))
        .jp2_box(b"jp2c", &codestream(8, 8, 1))
        .reader();
    let error = decode_jp2(&mut reader).unwrap_err();
    assert!(matches!(error, JP2Error::BoxDuplicate { .. }));
}

#[test]
fn test_boxes_after_codestream_are_not_read() {
    let builder = FileBuilder::jp2().bytes(&header_box(8, 8, 1));
    let expected_offset = builder.len() + 8;
    let mut reader = builder
        .jp2_box(b"jp2c", &codestream(8, 8, 1))
        .bytes(&header_box(8, 8, 1))
        .bytes(&[0, 0, 0, 1])
        .reader();
    let jp2 = decode_jp2(&mut reader).unwrap();
    assert_eq!(jp2.codestream_offset(), expected_offset);
    assert_eq!(reader.position(), expected_offset);
    assert!(decode_jpc(&mut reader).is_ok());
}

#[test]
fn test_missing_codestream() {
    let mut reader = FileBuilder::jp2().bytes(&header_box(8, 8, 1)).reader();
    let error = decode_jp2(&mut reader).unwrap_err();
    match error {
        JP2Error::BoxMissing { box_type } => assert_eq!(box_type, BOX_TYPE_CONTIGUOUS_CODESTREAM),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_unknown_boxes_are_skipped() {
    init_logger();
    let builder = FileBuilder::jp2()
        .jp2_box(b"xml ", b"<a/>")
        .bytes(&header_box(8, 8, 1))
        .jp2_box(b"abcd", &[1, 2, 3])
        .jp2_box(b"uuid", &[0; 16]);
    let expected_offset = builder.len() + 8;
    let mut reader = builder.jp2_box(b"jp2c", &codestream(8, 8, 1)).reader();
    let jp2 = decode_jp2(&mut reader).unwrap();
    assert_eq!(jp2.codestream_offset(), expected_offset);
}

#[test]
fn test_codestream_box_to_end_of_file() {
    let builder = FileBuilder::jp2().bytes(&header_box(8, 8, 1));
    let expected_offset = builder.len() + 8;
    let stream = codestream(8, 8, 1);
    let mut reader = builder
        .bytes(&[0, 0, 0, 0])
        .bytes(b"jp2c")
        .bytes(&stream)
        .reader();
    let jp2 = decode_jp2(&mut reader).unwrap();
    assert_eq!(jp2.codestream_offset(), expected_offset);
    assert_eq!(jp2.codestream_length(), stream.len() as u64);
    assert!(decode_jpc(&mut reader).is_ok());
}

#[test]
fn test_extended_box_length() {
    let mut reader = FileBuilder::jp2()
        .bytes(&header_box(8, 8, 1))
        .bytes(&[0, 0, 0, 1])
        .bytes(b"jp2c")
        .bytes(&[0, 0, 0, 0, 0, 0, 0, 16])
        .reader();
    let error = decode_jp2(&mut reader).unwrap_err();
    assert!(matches!(error, JP2Error::Unsupported { .. }));
    assert_eq!(error.kind(), ErrorKind::Unsupported);
}

#[test]
fn test_header_without_image_header() {
    init_logger();
    let mut reader = FileBuilder::jp2()
        .jp2_box(b"jp2h", &jp2_box(b"colr", &[1, 0, 0, 0, 0, 0, 16]))
        .jp2_box(b"jp2c", &codestream(8, 8, 1))
        .reader();
    let jp2 = decode_jp2(&mut reader).unwrap();
    assert!(jp2.header_box().is_some());
    assert!(jp2.image_header_box().is_none());
}

#[test]
fn test_image_header_mismatch() {
    init_logger();
    let mut reader = FileBuilder::jp2()
        .bytes(&header_box(10, 20, 1))
        .jp2_box(b"jp2c", &codestream(20, 12, 3))
        .reader();
    let jp2 = decode_jp2(&mut reader).unwrap();
    let codestream = decode_jpc(&mut reader).unwrap();
    let siz = codestream.header().image_and_tile_size_marker_segment();
    assert_eq!(siz.image_width(), 20);
    assert_eq!(siz.image_height(), 12);
    assert!(!jp2.verify_image_header(siz));
}

#[test]
fn test_truncated_codestream_inside_box() {
    let mut stream = codestream(8, 8, 1);
    stream.truncate(20);
    let mut reader = FileBuilder::jp2()
        .bytes(&header_box(8, 8, 1))
        .jp2_box(b"jp2c", &stream)
        .reader();
    decode_jp2(&mut reader).unwrap();
    let error = decode_jpc(&mut reader).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::TruncatedInput);
}
