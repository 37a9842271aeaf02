//! JPEG 2000 codestream header decoding, ITU-T T.800 | ISO/IEC 15444-1
//! Annex A.
//!
//! The main header is decoded into typed marker segment records
//! ([`HeaderInfo`]) and per tile-component coding parameters
//! ([`DecoderSpecs`]). Tile-part headers follow the same path at tile scope.

use std::io;

mod decoder;
mod decoder_specs;
mod error;
mod header;
mod marker;
mod reader;
mod segment;
mod spec;

pub use decoder::HeaderDecoder;
pub use decoder_specs::DecoderSpecs;
pub use error::{CodestreamError, ErrorKind};
pub use header::{Header, HeaderInfo, HeaderScope};
pub use marker::*;
pub use reader::RandomAccessReader;
pub use segment::*;
pub use spec::{Spec, SpecScope};

// Contiguous Codestream
//
// The codestream is a linear stream of bits from the first bit to the last
// bit. It starts with the main header, followed by one or more tile-parts
// each with their own header, and ends with EOC.
#[derive(Debug)]
pub struct ContiguousCodestream {
    offset: u64,
    header: Header,
}

impl ContiguousCodestream {
    /// Byte offset of SOC in the source.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn into_header(self) -> Header {
        self.header
    }
}

/// Decodes the main header and every tile-part header of a codestream
/// starting at the reader's current position.
pub fn decode_jpc<R: io::Read + io::Seek>(
    reader: &mut RandomAccessReader<R>,
) -> Result<ContiguousCodestream, CodestreamError> {
    let offset = reader.position();
    let mut decoder = HeaderDecoder::new();

    // The main header is found at the beginning of the codestream
    let mut header = decoder.decode_main_header(reader)?;

    // The tile-part headers are found at the beginning of each tile-part
    decoder.decode_tile_part_headers(reader, &mut header)?;

    Ok(ContiguousCodestream { offset, header })
}
