//! JP2 file format box reader, ITU-T T.800 | ISO/IEC 15444-1 Annex I.
//!
//! Locates the contiguous codestream inside a JP2 file, or recognises a raw
//! codestream that carries no file format wrapper at all.

use jpc::{
    CodestreamError, ErrorKind, ImageAndTileSizeMarkerSegment, RandomAccessReader,
    MARKER_SYMBOL_SOC,
};
use log::{debug, info, warn};
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JP2Error {
    #[error("invalid signature {signature:02X?} at byte offset {offset}")]
    InvalidSignature { signature: [u8; 4], offset: u64 },

    #[error("'jp2 ' not found in compatibility list '{}'", .compatibility_list.join(", "))]
    NotCompatible { compatibility_list: Vec<String> },

    #[error("neither a JP2 signature nor a codestream at byte offset {offset}")]
    NotJpeg2000 { offset: u64 },

    #[error("unexpected box type {box_type} at byte offset {offset}")]
    BoxUnexpected { box_type: BoxType, offset: u64 },

    #[error("unexpected duplicate box type {box_type} at byte offset {offset}")]
    BoxDuplicate { box_type: BoxType, offset: u64 },

    #[error("malformed box type {box_type} at byte offset {offset}")]
    BoxMalformed { box_type: BoxType, offset: u64 },

    #[error("box type {box_type} at byte offset {offset} of length {length} extends past the end of data")]
    BoxTruncated {
        box_type: BoxType,
        offset: u64,
        length: u64,
    },

    #[error("box type {box_type} missing")]
    BoxMissing { box_type: BoxType },

    #[error("box type {box_type} at byte offset {offset} uses an extended length, files above 4 GiB are not supported")]
    Unsupported { box_type: BoxType, offset: u64 },

    #[error(transparent)]
    Codestream(#[from] CodestreamError),
}

impl JP2Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSignature { .. }
            | Self::NotCompatible { .. }
            | Self::NotJpeg2000 { .. }
            | Self::BoxUnexpected { .. }
            | Self::BoxDuplicate { .. }
            | Self::BoxMalformed { .. }
            | Self::BoxMissing { .. } => ErrorKind::MalformedStructure,
            Self::BoxTruncated { .. } => ErrorKind::TruncatedInput,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::Codestream(e) => e.kind(),
        }
    }
}

/// Four character box type, read as a big-endian integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxType(pub [u8; 4]);

impl fmt::Display for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "'")?;
        for &byte in &self.0 {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{:02X}", byte)?;
            }
        }
        write!(f, "'")
    }
}

// jP\040\040 (0x6A50 2020)
pub const BOX_TYPE_SIGNATURE: BoxType = BoxType(*b"jP  ");
pub const BOX_TYPE_FILE_TYPE: BoxType = BoxType(*b"ftyp");
pub const BOX_TYPE_HEADER: BoxType = BoxType(*b"jp2h");
pub const BOX_TYPE_IMAGE_HEADER: BoxType = BoxType(*b"ihdr");
pub const BOX_TYPE_CONTIGUOUS_CODESTREAM: BoxType = BoxType(*b"jp2c");
pub const BOX_TYPE_INTELLECTUAL_PROPERTY: BoxType = BoxType(*b"jp2i");
pub const BOX_TYPE_XML: BoxType = BoxType(*b"xml ");
pub const BOX_TYPE_UUID: BoxType = BoxType(*b"uuid");
pub const BOX_TYPE_UUID_INFO: BoxType = BoxType(*b"uinf");

// jp2\040
const BRAND_JP2: [u8; 4] = *b"jp2 ";

// <CR><LF><0x87><LF> (0x0D0A 870A).
const SIGNATURE_MAGIC: [u8; 4] = [13, 10, 135, 10];

// LBox and TBox
const BOX_HEADER_LENGTH: u8 = 8;

// The only compression type defined for JP2
const COMPRESSION_TYPE_WAVELET: u8 = 7;

#[derive(Debug)]
enum BoxTypes {
    Signature,
    FileType,
    Header,
    ImageHeader,
    ContiguousCodestream,
    IntellectualProperty,
    Xml,
    Uuid,
    UUIDInfo,
    Unknown,
}

impl BoxTypes {
    fn new(value: BoxType) -> BoxTypes {
        match value {
            BOX_TYPE_SIGNATURE => BoxTypes::Signature,
            BOX_TYPE_FILE_TYPE => BoxTypes::FileType,
            BOX_TYPE_HEADER => BoxTypes::Header,
            BOX_TYPE_IMAGE_HEADER => BoxTypes::ImageHeader,
            BOX_TYPE_CONTIGUOUS_CODESTREAM => BoxTypes::ContiguousCodestream,
            BOX_TYPE_INTELLECTUAL_PROPERTY => BoxTypes::IntellectualProperty,
            BOX_TYPE_XML => BoxTypes::Xml,
            BOX_TYPE_UUID => BoxTypes::Uuid,
            BOX_TYPE_UUID_INFO => BoxTypes::UUIDInfo,
            _ => BoxTypes::Unknown,
        }
    }
}

/// JPEG 2000 box trait.
///
/// The building-block of the JP2 file format is called a box. All
/// information contained within the file is encapsulated in boxes, some of
/// which contain other boxes.
///
/// Length and offset describe the box contents, excluding the box header.
///
/// For more information, see ISO/IEC 15444-1 / ITU T-800 Appendix I.4.
pub trait JBox {
    fn identifier(&self) -> BoxType;
    fn length(&self) -> u64;
    fn offset(&self) -> u64;

    fn decode<R: io::Read + io::Seek>(
        &mut self,
        reader: &mut RandomAccessReader<R>,
    ) -> Result<(), JP2Error>;
}

/// JPEG 2000 Signature box.
///
/// The Signature box shall be the first box in the file. For file
/// verification purposes it is a fixed-length 12-byte string with the value
/// 0x0000 000C 6A50 2020 0D0A 870A.
///
/// For more information, see ISO/IEC 15444-1 / ITU T-800 Appendix I.5.1.
#[derive(Debug, Default)]
pub struct SignatureBox {
    length: u64,
    offset: u64,
}

impl JBox for SignatureBox {
    fn identifier(&self) -> BoxType {
        BOX_TYPE_SIGNATURE
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    // The contents of this box shall be the 4-byte character string
    // ‘<CR><LF><0x87><LF>’ (0x0D0A 870A).
    fn decode<R: io::Read + io::Seek>(
        &mut self,
        reader: &mut RandomAccessReader<R>,
    ) -> Result<(), JP2Error> {
        if self.length != SIGNATURE_MAGIC.len() as u64 {
            return Err(JP2Error::BoxMalformed {
                box_type: BOX_TYPE_SIGNATURE,
                offset: self.offset,
            });
        }

        let mut signature = [0; 4];
        reader.read_fully(&mut signature)?;
        if signature != SIGNATURE_MAGIC {
            return Err(JP2Error::InvalidSignature {
                signature,
                offset: self.offset,
            });
        }

        Ok(())
    }
}

/// File Type box.
///
/// Names the standard that defines the file (the brand) and the readers
/// that can interpret it (the compatibility list). It shall immediately
/// follow the Signature box.
///
/// For more information, see ISO/IEC 15444-1 / ITU T-800 Appendix I.5.2.
#[derive(Debug, Default)]
pub struct FileTypeBox {
    length: u64,
    offset: u64,
    brand: [u8; 4],
    min_version: u32,
    compatibility_list: Vec<[u8; 4]>,
}

impl FileTypeBox {
    pub fn brand(&self) -> String {
        String::from_utf8_lossy(&self.brand).into_owned()
    }

    /// Minor version, readers continue even when it is not zero.
    pub fn min_version(&self) -> u32 {
        self.min_version
    }

    pub fn compatibility_list(&self) -> Vec<String> {
        self.compatibility_list
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect()
    }
}

impl JBox for FileTypeBox {
    fn identifier(&self) -> BoxType {
        BOX_TYPE_FILE_TYPE
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn decode<R: io::Read + io::Seek>(
        &mut self,
        reader: &mut RandomAccessReader<R>,
    ) -> Result<(), JP2Error> {
        if self.length < 8 {
            return Err(JP2Error::BoxMalformed {
                box_type: BOX_TYPE_FILE_TYPE,
                offset: self.offset,
            });
        }

        reader.read_fully(&mut self.brand)?;
        self.min_version = reader.read_u32()?;

        // The number of CL fields is determined by the length of this box
        let mut buffer = [0; 4];
        for _ in 0..(self.length - 8) / 4 {
            reader.read_fully(&mut buffer)?;
            self.compatibility_list.push(buffer);
        }
        debug!(
            "brand {:?}, minor version {}, compatibility list {:?}",
            self.brand(),
            self.min_version,
            self.compatibility_list()
        );

        // All conforming readers shall properly interpret all files with
        // ‘jp2\040’ in one of the CL fields.
        if !self.compatibility_list.contains(&BRAND_JP2) {
            return Err(JP2Error::NotCompatible {
                compatibility_list: self.compatibility_list(),
            });
        }

        Ok(())
    }
}

/// Image Header box.
///
/// Height, width, component count and bit depth of the image as the file
/// format announces them. They shall agree with the SIZ marker segment of
/// the codestream.
///
/// For more information, see ISO/IEC 15444-1 / ITU T-800 Appendix I.5.3.1.
#[derive(Debug, Default)]
pub struct ImageHeaderBox {
    length: u64,
    offset: u64,
    height: u32,
    width: u32,
    components_num: u16,
    components_bits: u8,
    compression_type: u8,
    colourspace_unknown: u8,
    intellectual_property: u8,
}

impl ImageHeaderBox {
    /// Image area height, Ysiz - YOsiz.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Image area width, Xsiz - XOsiz.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Csiz.
    pub fn components_num(&self) -> u16 {
        self.components_num
    }

    /// Bit depth shared by every component, counting the sign bit.
    ///
    /// Returns `None` when the components vary in bit depth (a Bits Per
    /// Component box then carries them) or the value is reserved.
    pub fn components_bits(&self) -> Option<u8> {
        // 1111 1111 Components vary in bit depth
        if self.components_bits == 255 {
            return None;
        }
        // x000 0000 to x010 0101 Component bit depth = value + 1
        let low_bits = self.components_bits & 0b0111_1111;
        if low_bits <= 37 {
            Some(low_bits + 1)
        } else {
            None
        }
    }

    /// False when unsigned or when the bit depth varies.
    pub fn values_are_signed(&self) -> bool {
        self.components_bits != 255 && self.components_bits & 0x80 == 0x80
    }

    pub fn compression_type(&self) -> u8 {
        self.compression_type
    }

    /// 1 when the colourspace of the image data is not known.
    pub fn colourspace_unknown(&self) -> u8 {
        self.colourspace_unknown
    }

    /// 1 when the file contains an Intellectual Property box.
    pub fn intellectual_property(&self) -> u8 {
        self.intellectual_property
    }
}

impl JBox for ImageHeaderBox {
    fn identifier(&self) -> BoxType {
        BOX_TYPE_IMAGE_HEADER
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn decode<R: io::Read + io::Seek>(
        &mut self,
        reader: &mut RandomAccessReader<R>,
    ) -> Result<(), JP2Error> {
        if self.length < 14 {
            return Err(JP2Error::BoxMalformed {
                box_type: BOX_TYPE_IMAGE_HEADER,
                offset: self.offset,
            });
        }

        self.height = reader.read_u32()?;
        self.width = reader.read_u32()?;
        self.components_num = reader.read_u16()?;
        self.components_bits = reader.read_u8()?;
        self.compression_type = reader.read_u8()?;
        self.colourspace_unknown = reader.read_u8()?;
        self.intellectual_property = reader.read_u8()?;
        debug!(
            "image header {}x{}, {} components, bits per component {}",
            self.width, self.height, self.components_num, self.components_bits
        );

        if self.compression_type != COMPRESSION_TYPE_WAVELET {
            warn!(
                "image header compression type {} is reserved",
                self.compression_type
            );
        }

        Ok(())
    }
}

// I.5.3
//
// JP2 Header box
//
// A superbox holding generic information about the file. It shall begin
// with the Image Header box; the other boxes inside it (bits per component,
// colour specification, palette, component mapping, channel definition,
// resolution) are skipped here.
#[derive(Debug, Default)]
pub struct HeaderSuperBox {
    length: u64,
    offset: u64,
    pub image_header_box: Option<ImageHeaderBox>,
}

impl JBox for HeaderSuperBox {
    fn identifier(&self) -> BoxType {
        BOX_TYPE_HEADER
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn decode<R: io::Read + io::Seek>(
        &mut self,
        reader: &mut RandomAccessReader<R>,
    ) -> Result<(), JP2Error> {
        let end = self.offset + self.length;

        let mut first = true;
        while reader.position() < end {
            let box_header = decode_box_header(reader)?;
            if box_header.end() > end {
                return Err(JP2Error::BoxMalformed {
                    box_type: box_header.box_type,
                    offset: box_header.offset,
                });
            }

            match BoxTypes::new(box_header.box_type) {
                BoxTypes::ImageHeader if first => {
                    let mut image_header_box = ImageHeaderBox {
                        length: box_header.box_length,
                        offset: reader.position(),
                        ..Default::default()
                    };
                    info!("ImageHeaderBox start at {}", image_header_box.offset);
                    image_header_box.decode(reader)?;
                    info!("ImageHeaderBox finish at {}", reader.position());
                    self.image_header_box = Some(image_header_box);
                }
                BoxTypes::ImageHeader => {
                    // Instances of Image Header box in other places in the file shall be ignored.
                    warn!(
                        "ImageHeaderBox found in other place at {}, ignoring",
                        box_header.offset
                    );
                }
                _ => {
                    debug!(
                        "skipping box {} at {} inside JP2 Header box",
                        box_header.box_type, box_header.offset
                    );
                }
            }

            first = false;
            reader.seek(box_header.end())?;
        }

        if self.image_header_box.is_none() {
            warn!("JP2 Header box at {} has no Image Header box", self.offset);
        }

        Ok(())
    }
}

// Contiguous Codestream box
//
// Contains a complete JPEG 2000 codestream. A conforming reader shall
// ignore all codestreams after the first one found in the file, and the
// box may not appear before the JP2 Header box.
#[derive(Debug, Default)]
pub struct ContiguousCodestreamBox {
    length: u64,
    offset: u64,
}

impl JBox for ContiguousCodestreamBox {
    fn identifier(&self) -> BoxType {
        BOX_TYPE_CONTIGUOUS_CODESTREAM
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    // The codestream itself is left to the codestream decoder.
    fn decode<R: io::Read + io::Seek>(
        &mut self,
        reader: &mut RandomAccessReader<R>,
    ) -> Result<(), JP2Error> {
        reader.seek(self.offset)?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct JP2File {
    jp2_used: bool,
    codestream_offset: u64,
    codestream_length: u64,
    file_type: Option<FileTypeBox>,
    header: Option<HeaderSuperBox>,
}

impl JP2File {
    /// False when the source is a bare codestream.
    pub fn jp2_used(&self) -> bool {
        self.jp2_used
    }

    /// Byte offset of SOC, the first byte after the jp2c box header.
    pub fn codestream_offset(&self) -> u64 {
        self.codestream_offset
    }

    pub fn codestream_length(&self) -> u64 {
        self.codestream_length
    }

    pub fn file_type_box(&self) -> Option<&FileTypeBox> {
        self.file_type.as_ref()
    }

    pub fn header_box(&self) -> Option<&HeaderSuperBox> {
        self.header.as_ref()
    }

    pub fn image_header_box(&self) -> Option<&ImageHeaderBox> {
        self.header.as_ref()?.image_header_box.as_ref()
    }

    /// Compares the Image Header box against SIZ, warning on every
    /// disagreement. The codestream values are the ones to use either way.
    pub fn verify_image_header(&self, siz: &ImageAndTileSizeMarkerSegment) -> bool {
        let image_header = match self.image_header_box() {
            Some(image_header) => image_header,
            None => return true,
        };

        let mut verified = true;
        if image_header.height() != siz.image_height() {
            warn!(
                "image header height {} does not match codestream height {}",
                image_header.height(),
                siz.image_height()
            );
            verified = false;
        }
        if image_header.width() != siz.image_width() {
            warn!(
                "image header width {} does not match codestream width {}",
                image_header.width(),
                siz.image_width()
            );
            verified = false;
        }
        if image_header.components_num() != siz.no_components() {
            warn!(
                "image header component count {} does not match codestream component count {}",
                image_header.components_num(),
                siz.no_components()
            );
            verified = false;
        }
        verified
    }
}

struct BoxHeader {
    // Byte offset of LBox
    offset: u64,

    // Box Type
    //
    // Boxes are generally referred to by an ISO 646 character string
    // translation of the integer value. All values of TBox not defined are
    // reserved for ISO use.
    box_type: BoxType,

    // Length of the box contents, excluding LBox and TBox.
    box_length: u64,

    header_length: u8,
}

impl BoxHeader {
    fn end(&self) -> u64 {
        self.offset + u64::from(self.header_length) + self.box_length
    }
}

fn decode_box_header<R: io::Read + io::Seek>(
    reader: &mut RandomAccessReader<R>,
) -> Result<BoxHeader, JP2Error> {
    let offset = reader.position();
    let box_length = reader.read_u32()?;
    let mut box_type = [0; 4];
    reader.read_fully(&mut box_type)?;
    let box_type = BoxType(box_type);

    let box_length = match box_length {
        // The length of the box was not known when LBox was written, the box
        // contains all bytes up to the end of the file.
        0 => reader.remaining(),
        // XLBox holds the actual length
        1 => return Err(JP2Error::Unsupported { box_type, offset }),
        // The values 2–7 are reserved for ISO use.
        2..=7 => return Err(JP2Error::BoxMalformed { box_type, offset }),
        _ => {
            let box_length = u64::from(box_length) - u64::from(BOX_HEADER_LENGTH);
            if box_length > reader.remaining() {
                return Err(JP2Error::BoxTruncated {
                    box_type,
                    offset,
                    length: box_length + u64::from(BOX_HEADER_LENGTH),
                });
            }
            box_length
        }
    };

    Ok(BoxHeader {
        offset,
        box_type,
        box_length,
        header_length: BOX_HEADER_LENGTH,
    })
}

/// Peeks whether the stream opens with a Signature box header.
fn starts_with_signature<R: io::Read + io::Seek>(
    reader: &mut RandomAccessReader<R>,
) -> Result<bool, JP2Error> {
    let start = reader.position();
    if reader.remaining() < u64::from(BOX_HEADER_LENGTH) {
        return Ok(false);
    }
    reader.skip(4)?;
    let mut box_type = [0; 4];
    reader.read_fully(&mut box_type)?;
    reader.seek(start)?;
    Ok(BoxType(box_type) == BOX_TYPE_SIGNATURE)
}

fn decode_raw_codestream<R: io::Read + io::Seek>(
    reader: &mut RandomAccessReader<R>,
) -> Result<JP2File, JP2Error> {
    let offset = reader.position();
    if reader.remaining() < 2 || reader.read_marker()? != MARKER_SYMBOL_SOC {
        return Err(JP2Error::NotJpeg2000 { offset });
    }
    reader.seek(offset)?;
    info!("no JP2 signature, codestream starts at {}", offset);

    Ok(JP2File {
        jp2_used: false,
        codestream_offset: offset,
        codestream_length: reader.remaining(),
        file_type: None,
        header: None,
    })
}

/// Reads the file format boxes up to the first Contiguous Codestream box.
///
/// Without a JP2 signature the source is accepted as a raw codestream when
/// it begins with SOC. On success the reader is positioned on SOC.
pub fn decode_jp2<R: io::Read + io::Seek>(
    reader: &mut RandomAccessReader<R>,
) -> Result<JP2File, JP2Error> {
    if !starts_with_signature(reader)? {
        return decode_raw_codestream(reader);
    }

    // The Signature box shall be the first box
    let box_header = decode_box_header(reader)?;
    let mut signature_box = SignatureBox {
        length: box_header.box_length,
        offset: reader.position(),
    };
    info!("SignatureBox start at {}", signature_box.offset);
    signature_box.decode(reader)?;
    info!("SignatureBox finish at {}", reader.position());

    // The File Type box shall immediately follow the Signature box
    let box_header = decode_box_header(reader)?;
    if box_header.box_type != BOX_TYPE_FILE_TYPE {
        return Err(JP2Error::BoxUnexpected {
            box_type: box_header.box_type,
            offset: box_header.offset,
        });
    }
    let mut file_type_box = FileTypeBox {
        length: box_header.box_length,
        offset: reader.position(),
        ..Default::default()
    };
    info!("FileTypeBox start at {}", file_type_box.offset);
    file_type_box.decode(reader)?;
    reader.seek(box_header.end())?;
    info!("FileTypeBox finish at {}", reader.position());

    let mut header_box_option: Option<HeaderSuperBox> = None;

    let codestream_box = loop {
        if reader.remaining() == 0 {
            return Err(JP2Error::BoxMissing {
                box_type: BOX_TYPE_CONTIGUOUS_CODESTREAM,
            });
        }

        let box_header = decode_box_header(reader)?;
        match BoxTypes::new(box_header.box_type) {
            BoxTypes::Header => {
                // Within a JP2 file, there shall be one and only one JP2 Header box.
                if header_box_option.is_some() {
                    return Err(JP2Error::BoxDuplicate {
                        box_type: box_header.box_type,
                        offset: box_header.offset,
                    });
                }
                let mut header_box = HeaderSuperBox {
                    length: box_header.box_length,
                    offset: reader.position(),
                    ..Default::default()
                };
                info!("HeaderSuperBox start at {}", header_box.offset);
                header_box.decode(reader)?;
                info!("HeaderSuperBox finish at {}", box_header.end());
                header_box_option = Some(header_box);
            }
            BoxTypes::ContiguousCodestream => {
                // The Header box shall fall before the Contiguous Codestream box
                if header_box_option.is_none() {
                    return Err(JP2Error::BoxUnexpected {
                        box_type: box_header.box_type,
                        offset: box_header.offset,
                    });
                }
                let mut codestream_box = ContiguousCodestreamBox {
                    length: box_header.box_length,
                    offset: reader.position(),
                };
                info!("ContiguousCodestreamBox start at {}", codestream_box.offset);
                codestream_box.decode(reader)?;
                // Boxes after the first codestream are not read, so a
                // duplicate header box there goes unnoticed
                break codestream_box;
            }
            BoxTypes::Signature | BoxTypes::FileType => {
                return Err(JP2Error::BoxUnexpected {
                    box_type: box_header.box_type,
                    offset: box_header.offset,
                });
            }
            BoxTypes::ImageHeader => {
                warn!(
                    "ImageHeaderBox found in other place at {}, ignoring",
                    box_header.offset
                );
            }
            other => {
                debug!(
                    "skipping {:?} box {} at {}, {} bytes",
                    other, box_header.box_type, box_header.offset, box_header.box_length
                );
            }
        }

        reader.seek(box_header.end())?;
    };

    Ok(JP2File {
        jp2_used: true,
        codestream_offset: codestream_box.offset(),
        codestream_length: codestream_box.length(),
        file_type: Some(file_type_box),
        header: header_box_option,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(bytes: Vec<u8>) -> RandomAccessReader<Cursor<Vec<u8>>> {
        RandomAccessReader::new(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_box_type_display() {
        assert_eq!(BOX_TYPE_CONTIGUOUS_CODESTREAM.to_string(), "'jp2c'");
        assert_eq!(BOX_TYPE_SIGNATURE.to_string(), "'jP  '");
        assert_eq!(BoxType([0, b'a', b'b', b'c']).to_string(), "'\\x00abc'");
    }

    #[test]
    fn test_decode_box_header() {
        let mut bytes = vec![0, 0, 0, 12];
        bytes.extend(b"xml ");
        bytes.extend([1, 2, 3, 4, 5]);
        let mut reader = source(bytes);
        let header = decode_box_header(&mut reader).unwrap();
        assert_eq!(header.box_type, BOX_TYPE_XML);
        assert_eq!(header.box_length, 4);
        assert_eq!(header.end(), 12);
    }

    #[test]
    fn test_decode_box_header_to_end() {
        let mut bytes = vec![0, 0, 0, 0];
        bytes.extend(b"jp2c");
        bytes.extend([0xFF, 0x4F, 0xFF, 0x51]);
        let mut reader = source(bytes);
        let header = decode_box_header(&mut reader).unwrap();
        assert_eq!(header.box_length, 4);
        assert_eq!(header.end(), 12);
    }

    #[test]
    fn test_decode_box_header_lengths() {
        let mut bytes = vec![0, 0, 0, 1];
        bytes.extend(b"jp2c");
        bytes.extend([0; 8]);
        let error = decode_box_header(&mut source(bytes)).err().unwrap();
        assert_eq!(error.kind(), ErrorKind::Unsupported);

        let mut bytes = vec![0, 0, 0, 5];
        bytes.extend(b"jp2c");
        let error = decode_box_header(&mut source(bytes)).err().unwrap();
        assert_eq!(error.kind(), ErrorKind::MalformedStructure);

        let mut bytes = vec![0, 0, 0, 100];
        bytes.extend(b"jp2c");
        bytes.extend([0; 8]);
        let error = decode_box_header(&mut source(bytes)).err().unwrap();
        assert_eq!(error.kind(), ErrorKind::TruncatedInput);
    }

    #[test]
    fn test_image_header_bits() {
        let mut image_header = ImageHeaderBox {
            components_bits: 0x87,
            ..Default::default()
        };
        assert_eq!(image_header.components_bits(), Some(8));
        assert!(image_header.values_are_signed());

        image_header.components_bits = 255;
        assert_eq!(image_header.components_bits(), None);
        assert!(!image_header.values_are_signed());

        image_header.components_bits = 0x30;
        assert_eq!(image_header.components_bits(), None);
    }

    #[test]
    fn test_starts_with_signature() {
        let mut bytes = vec![0, 0, 0, 12];
        bytes.extend(b"jP  ");
        bytes.extend(SIGNATURE_MAGIC);
        let mut reader = source(bytes);
        assert!(starts_with_signature(&mut reader).unwrap());
        assert_eq!(reader.position(), 0);

        let mut short = source(vec![0xFF, 0x4F]);
        assert!(!starts_with_signature(&mut short).unwrap());
    }

    #[test]
    fn test_invalid_signature() {
        let mut bytes = vec![0, 0, 0, 12];
        bytes.extend(b"jP  ");
        bytes.extend([13, 10, 7, 10]);
        let error = decode_jp2(&mut source(bytes)).unwrap_err();
        assert!(matches!(error, JP2Error::InvalidSignature { .. }));
        assert_eq!(error.kind(), ErrorKind::MalformedStructure);
    }
}
