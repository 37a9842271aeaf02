#![allow(dead_code)]

use std::io::Cursor;

use jpc::RandomAccessReader;

pub fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

pub const SOC: u16 = 0xFF4F;
pub const SOT: u16 = 0xFF90;
pub const SOD: u16 = 0xFF93;
pub const EOC: u16 = 0xFFD9;
pub const SIZ: u16 = 0xFF51;
pub const COD: u16 = 0xFF52;
pub const COC: u16 = 0xFF53;
pub const QCD: u16 = 0xFF5C;
pub const QCC: u16 = 0xFF5D;
pub const RGN: u16 = 0xFF5E;
pub const POC: u16 = 0xFF5F;
pub const PLT: u16 = 0xFF58;
pub const PPT: u16 = 0xFF61;
pub const CRG: u16 = 0xFF63;
pub const COM: u16 = 0xFF64;

/// Marker followed by a length field covering `data`.
pub fn segment(marker: u16, data: &[u8]) -> Vec<u8> {
    let mut bytes = marker.to_be_bytes().to_vec();
    bytes.extend(((data.len() + 2) as u16).to_be_bytes());
    bytes.extend(data);
    bytes
}

/// SIZ content without offsets, one entry of `ssiz` per component with no
/// subsampling.
pub fn siz_data(width: u32, height: u32, tile_width: u32, tile_height: u32, ssiz: &[u8]) -> Vec<u8> {
    let mut data = vec![0, 0];
    for value in [width, height, 0, 0, tile_width, tile_height, 0, 0] {
        data.extend(value.to_be_bytes());
    }
    data.extend((ssiz.len() as u16).to_be_bytes());
    for &precision in ssiz {
        data.extend([precision, 1, 1]);
    }
    data
}

/// COD content with LRCP progression, 64x64 code-blocks and the 5-3 filter.
pub fn cod_data(coding_style: u8, layers: u16, levels: u8) -> Vec<u8> {
    let mut data = vec![coding_style, 0];
    data.extend(layers.to_be_bytes());
    data.extend([0, levels, 4, 4, 0, 1]);
    data
}

/// COC content for fewer than 257 components.
pub fn coc_data(component: u8, levels: u8, code_block_exponent: u8) -> Vec<u8> {
    vec![component, 0, levels, code_block_exponent, code_block_exponent, 0, 1]
}

/// QCD content without quantization, 2 guard bits and one exponent per
/// subband.
pub fn qcd_data(levels: u8) -> Vec<u8> {
    let mut data = vec![0x40];
    for subband in 0..(1 + 3 * levels as usize) {
        data.push((8 + subband as u8 % 3) << 3);
    }
    data
}

/// POC content, one 7 byte entry per (RSpoc, CSpoc, LYEpoc, REpoc, CEpoc,
/// Ppoc).
pub fn poc_data(entries: &[(u8, u8, u16, u8, u8, u8)]) -> Vec<u8> {
    let mut data = Vec::new();
    for &(rs, cs, lye, re, ce, order) in entries {
        data.extend([rs, cs]);
        data.extend(lye.to_be_bytes());
        data.extend([re, ce, order]);
    }
    data
}

pub struct CodestreamBuilder {
    bytes: Vec<u8>,
}

impl CodestreamBuilder {
    pub fn new() -> CodestreamBuilder {
        CodestreamBuilder {
            bytes: SOC.to_be_bytes().to_vec(),
        }
    }

    /// SOC, SIZ, COD and QCD for an image of `ssiz.len()` components.
    pub fn main_header(width: u32, height: u32, tile_width: u32, tile_height: u32, ssiz: &[u8]) -> CodestreamBuilder {
        CodestreamBuilder::new()
            .segment(SIZ, &siz_data(width, height, tile_width, tile_height, ssiz))
            .segment(COD, &cod_data(0, 1, 2))
            .segment(QCD, &qcd_data(2))
    }

    pub fn segment(mut self, marker: u16, data: &[u8]) -> CodestreamBuilder {
        self.bytes.extend(segment(marker, data));
        self
    }

    pub fn marker(mut self, marker: u16) -> CodestreamBuilder {
        self.bytes.extend(marker.to_be_bytes());
        self
    }

    pub fn bytes(mut self, bytes: &[u8]) -> CodestreamBuilder {
        self.bytes.extend(bytes);
        self
    }

    /// A whole tile-part, Psot covering SOT, `header`, SOD and `data`.
    pub fn tile_part(
        self,
        tile: u16,
        tile_part_index: u8,
        no_tile_parts: u8,
        header: &[u8],
        data: &[u8],
    ) -> CodestreamBuilder {
        let length = (12 + header.len() + 2 + data.len()) as u32;
        self.tile_part_with_length(tile, tile_part_index, no_tile_parts, length, header, data)
    }

    pub fn tile_part_with_length(
        mut self,
        tile: u16,
        tile_part_index: u8,
        no_tile_parts: u8,
        tile_part_length: u32,
        header: &[u8],
        data: &[u8],
    ) -> CodestreamBuilder {
        self.bytes.extend(SOT.to_be_bytes());
        self.bytes.extend(10u16.to_be_bytes());
        self.bytes.extend(tile.to_be_bytes());
        self.bytes.extend(tile_part_length.to_be_bytes());
        self.bytes.extend([tile_part_index, no_tile_parts]);
        self.bytes.extend(header);
        self.bytes.extend(SOD.to_be_bytes());
        self.bytes.extend(data);
        self
    }

    pub fn eoc(self) -> CodestreamBuilder {
        self.marker(EOC)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }

    pub fn reader(self) -> RandomAccessReader<Cursor<Vec<u8>>> {
        RandomAccessReader::new(Cursor::new(self.bytes)).expect("cursor has a length")
    }
}
