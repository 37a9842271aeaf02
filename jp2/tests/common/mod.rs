#![allow(dead_code)]

use std::io::Cursor;

use jpc::RandomAccessReader;

pub fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

/// Box with a four byte LBox covering `content`.
pub fn jp2_box(box_type: &[u8; 4], content: &[u8]) -> Vec<u8> {
    let mut bytes = ((content.len() + 8) as u32).to_be_bytes().to_vec();
    bytes.extend(box_type);
    bytes.extend(content);
    bytes
}

pub fn signature_box() -> Vec<u8> {
    jp2_box(b"jP  ", &[0x0D, 0x0A, 0x87, 0x0A])
}

pub fn file_type_box(brand: &[u8; 4], compatibility_list: &[&[u8; 4]]) -> Vec<u8> {
    let mut content = brand.to_vec();
    content.extend(0u32.to_be_bytes());
    for entry in compatibility_list {
        content.extend(*entry);
    }
    jp2_box(b"ftyp", &content)
}

pub fn image_header_box(height: u32, width: u32, components: u16, bits: u8) -> Vec<u8> {
    let mut content = height.to_be_bytes().to_vec();
    content.extend(width.to_be_bytes());
    content.extend(components.to_be_bytes());
    content.extend([bits, 7, 0, 0]);
    jp2_box(b"ihdr", &content)
}

fn segment(marker: u16, data: &[u8]) -> Vec<u8> {
    let mut bytes = marker.to_be_bytes().to_vec();
    bytes.extend(((data.len() + 2) as u16).to_be_bytes());
    bytes.extend(data);
    bytes
}

/// Single tile codestream with 8 bit unsigned components and no
/// decomposition levels.
pub fn codestream(width: u32, height: u32, components: u16) -> Vec<u8> {
    let mut siz = vec![0, 0];
    for value in [width, height, 0, 0, width, height, 0, 0] {
        siz.extend(value.to_be_bytes());
    }
    siz.extend(components.to_be_bytes());
    for _ in 0..components {
        siz.extend([7, 1, 1]);
    }

    let mut bytes = vec![0xFF, 0x4F];
    bytes.extend(segment(0xFF51, &siz));
    bytes.extend(segment(0xFF52, &[0, 0, 0, 1, 0, 0, 4, 4, 0, 1]));
    bytes.extend(segment(0xFF5C, &[0x40, 8 << 3]));
    // SOT with Psot covering SOT and SOD
    bytes.extend([0xFF, 0x90, 0, 10, 0, 0, 0, 0, 0, 14, 0, 1]);
    bytes.extend([0xFF, 0x93]);
    bytes.extend([0xFF, 0xD9]);
    bytes
}

#[derive(Default)]
pub struct FileBuilder {
    bytes: Vec<u8>,
}

impl FileBuilder {
    pub fn new() -> FileBuilder {
        FileBuilder::default()
    }

    /// Signature and a File Type box compatible with 'jp2 '.
    pub fn jp2() -> FileBuilder {
        FileBuilder::new()
            .bytes(&signature_box())
            .bytes(&file_type_box(b"jp2 ", &[b"jp2 "]))
    }

    pub fn bytes(mut self, bytes: &[u8]) -> FileBuilder {
        self.bytes.extend(bytes);
        self
    }

    pub fn jp2_box(self, box_type: &[u8; 4], content: &[u8]) -> FileBuilder {
        self.bytes(&jp2_box(box_type, content))
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn reader(self) -> RandomAccessReader<Cursor<Vec<u8>>> {
        RandomAccessReader::new(Cursor::new(self.bytes)).expect("cursor has a length")
    }
}
