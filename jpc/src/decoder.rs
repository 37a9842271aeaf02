use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::io;

use crate::decoder_specs::DecoderSpecs;
use crate::error::CodestreamError;
use crate::header::{Header, HeaderInfo, HeaderScope};
use crate::marker::*;
use crate::reader::{RandomAccessReader, SegmentReader};
use crate::segment::{
    CodeBlockSize, CodingStyleComponentSegment, CodingStyleMarkerSegment, CodingStyleParameters,
    CommentMarkerSegment, CommentRegistrationValue, ComponentRegistrationSegment, ComponentSize,
    ImageAndTileSizeMarkerSegment, MultipleComponentTransformation, PackedPacketHeaderSegment,
    PacketLengthSegment, PrecinctSize, ProgressionOrder, ProgressionOrderChange,
    QuantizationComponentSegment, QuantizationDefaultMarkerSegment, QuantizationParameters,
    QuantizationStepSize, QuantizationStepSizes, QuantizationType, RegionOfInterestSegment,
    RegionOfInterestStyle, StartOfTileSegment, TilePackedPacketHeaderSegment, TilePacketLength,
    TilePartLength, TilePartLengthsSegment, TransformationFilter,
};
use crate::spec::Spec;

// Order in which buffered main header segments are decoded. SIZ comes first
// as every table is sized from it.
const MAIN_HEADER_DECODING_ORDER: [MarkerSymbol; 12] = [
    MARKER_SYMBOL_SIZ,
    MARKER_SYMBOL_COM,
    MARKER_SYMBOL_CRG,
    MARKER_SYMBOL_COD,
    MARKER_SYMBOL_COC,
    MARKER_SYMBOL_QCD,
    MARKER_SYMBOL_QCC,
    MARKER_SYMBOL_RGN,
    MARKER_SYMBOL_POC,
    MARKER_SYMBOL_PPM,
    MARKER_SYMBOL_TLM,
    MARKER_SYMBOL_PLM,
];

/// Raw bytes of one marker segment, from its length field onwards.
#[derive(Debug)]
struct MarkerSegmentBuffer {
    // Byte offset of the length field
    offset: u64,
    data: Vec<u8>,
}

/// Decodes the main header and the tile-part headers of a codestream.
///
/// The main header is read in two passes. The first walks the markers up to
/// the first SOT, checks their order and count, and buffers each segment.
/// The second decodes the buffered segments in a fixed order into typed
/// records and coding parameters.
#[derive(Default)]
pub struct HeaderDecoder {
    // Main header segments of the first pass, by marker in stream order
    segments: BTreeMap<MarkerSymbol, Vec<MarkerSegmentBuffer>>,

    // Horizontal and vertical code-block partition origin once a COD fixed it
    code_block_origin: Option<(bool, bool)>,

    // Tile-part count per tile for TPsot checks
    tile_part_indices: BTreeMap<usize, u8>,
}

impl HeaderDecoder {
    pub fn new() -> HeaderDecoder {
        HeaderDecoder::default()
    }

    fn reset(&mut self) {
        self.segments.clear();
        self.code_block_origin = None;
        self.tile_part_indices.clear();
    }

    /// Decodes the main header, leaving the reader on the first SOT marker.
    pub fn decode_main_header<R: io::Read + io::Seek>(
        &mut self,
        reader: &mut RandomAccessReader<R>,
    ) -> Result<Header, CodestreamError> {
        self.reset();

        let offset = reader.position();
        let marker = reader.read_marker()?;
        if marker != MARKER_SYMBOL_SOC {
            return Err(CodestreamError::MarkerMissing {
                marker: MARKER_SYMBOL_SOC,
            });
        }
        info!("SOC at byte offset {}", offset);

        self.scan_main_header(reader)?;
        let header = self.decode_main_header_segments();

        // Buffers are only needed between the two passes.
        self.segments.clear();
        header
    }

    // First pass, buffers every main header segment up to the first SOT.
    fn scan_main_header<R: io::Read + io::Seek>(
        &mut self,
        reader: &mut RandomAccessReader<R>,
    ) -> Result<(), CodestreamError> {
        let mut first = true;
        loop {
            let offset = reader.position();
            let marker = reader.read_marker()?;

            // SIZ is required directly after SOC
            if first && marker != MARKER_SYMBOL_SIZ {
                return Err(CodestreamError::MarkerUnexpected { marker, offset });
            }
            first = false;

            match marker {
                MARKER_SYMBOL_SOT => {
                    // Leave SOT to be read again by the tile-part decoding.
                    reader.seek(offset)?;
                    debug!("main header end at byte offset {}", offset);
                    return Ok(());
                }
                MARKER_SYMBOL_SIZ
                | MARKER_SYMBOL_COD
                | MARKER_SYMBOL_QCD
                | MARKER_SYMBOL_CRG
                | MARKER_SYMBOL_TLM
                | MARKER_SYMBOL_PLM
                | MARKER_SYMBOL_POC => {
                    if self.segments.contains_key(&marker) {
                        return Err(CodestreamError::MarkerDuplicate { marker, offset });
                    }
                    let segment = read_segment(reader, marker)?;
                    self.segments.entry(marker).or_default().push(segment);
                }
                MARKER_SYMBOL_COC
                | MARKER_SYMBOL_QCC
                | MARKER_SYMBOL_RGN
                | MARKER_SYMBOL_COM
                | MARKER_SYMBOL_PPM => {
                    let segment = read_segment(reader, marker)?;
                    self.segments.entry(marker).or_default().push(segment);
                }
                MARKER_SYMBOL_SOC
                | MARKER_SYMBOL_SOD
                | MARKER_SYMBOL_EOC
                | MARKER_SYMBOL_PLT
                | MARKER_SYMBOL_PPT
                | MARKER_SYMBOL_SOP
                | MARKER_SYMBOL_EPH => {
                    return Err(CodestreamError::MarkerUnexpected { marker, offset });
                }
                _ => skip_unknown_marker(reader, marker, offset)?,
            }
        }
    }

    // Second pass over the buffered segments.
    fn decode_main_header_segments(&mut self) -> Result<Header, CodestreamError> {
        let segments = std::mem::take(&mut self.segments);
        let siz = segments
            .get(&MARKER_SYMBOL_SIZ)
            .and_then(|siz| siz.first())
            .ok_or(CodestreamError::MarkerMissing {
                marker: MARKER_SYMBOL_SIZ,
            })?;
        let siz = decode_siz(siz)?;
        for marker in [MARKER_SYMBOL_COD, MARKER_SYMBOL_QCD] {
            if !segments.contains_key(&marker) {
                return Err(CodestreamError::MarkerMissing { marker });
            }
        }

        let specs = DecoderSpecs::new(siz.num_tiles(), siz.components.len());
        let mut header = Header {
            info: HeaderInfo::new(siz),
            specs,
        };

        for marker in &MAIN_HEADER_DECODING_ORDER[1..] {
            for segment in segments.get(marker).into_iter().flatten() {
                self.decode_segment(HeaderScope::Main, *marker, segment, &mut header)?;
            }
        }
        Ok(header)
    }

    /// Decodes the tile-part headers following the main header up to EOC.
    ///
    /// The bit-stream data of each tile-part is skipped using Psot. A
    /// tile-part with Psot of zero runs to the end of the codestream and ends
    /// the scan.
    pub fn decode_tile_part_headers<R: io::Read + io::Seek>(
        &mut self,
        reader: &mut RandomAccessReader<R>,
        header: &mut Header,
    ) -> Result<(), CodestreamError> {
        loop {
            let offset = reader.position();
            if reader.remaining() < 2 {
                warn!("codestream ends at byte offset {} without EOC", offset);
                return Ok(());
            }

            let marker = reader.read_marker()?;
            match marker {
                MARKER_SYMBOL_EOC => {
                    info!("EOC at byte offset {}", offset);
                    return Ok(());
                }
                MARKER_SYMBOL_SOT => {
                    let sot = self.decode_tile_part_header(reader, offset, header)?;
                    if sot.tile_part_length() == 0 {
                        debug!("tile-part at byte offset {} runs to the end", offset);
                        return Ok(());
                    }
                    let end = offset + sot.tile_part_length() as u64;
                    if end < reader.position() {
                        return Err(CodestreamError::marker_error(
                            MARKER_SYMBOL_SOT,
                            format!(
                                "Psot {} ends at byte offset {}, inside the tile-part header ending at {}",
                                sot.tile_part_length(),
                                end,
                                reader.position()
                            ),
                        ));
                    }
                    if end > reader.length() {
                        warn!(
                            "tile-part at byte offset {} ends at {}, beyond end of data at {}",
                            offset,
                            end,
                            reader.length()
                        );
                        return Ok(());
                    }
                    reader.seek(end)?;
                }
                _ => return Err(CodestreamError::MarkerUnexpected { marker, offset }),
            }
        }
    }

    // A.4.2 - SOT followed by the tile-part header up to SOD
    fn decode_tile_part_header<R: io::Read + io::Seek>(
        &mut self,
        reader: &mut RandomAccessReader<R>,
        sot_offset: u64,
        header: &mut Header,
    ) -> Result<StartOfTileSegment, CodestreamError> {
        let sot = self.decode_sot(reader, sot_offset, header)?;
        let scope = HeaderScope::Tile(sot.tile_index() as usize);

        let mut found: Vec<MarkerSymbol> = Vec::new();
        loop {
            let offset = reader.position();
            let marker = reader.read_marker()?;
            match marker {
                MARKER_SYMBOL_SOD => {
                    info!("SOD at byte offset {}", offset);
                    break;
                }
                MARKER_SYMBOL_COD
                | MARKER_SYMBOL_COC
                | MARKER_SYMBOL_QCD
                | MARKER_SYMBOL_QCC
                | MARKER_SYMBOL_RGN
                | MARKER_SYMBOL_POC
                | MARKER_SYMBOL_COM
                | MARKER_SYMBOL_PPT
                | MARKER_SYMBOL_PLT => {
                    let once = [MARKER_SYMBOL_COD, MARKER_SYMBOL_QCD, MARKER_SYMBOL_POC];
                    if once.contains(&marker) {
                        if found.contains(&marker) {
                            return Err(CodestreamError::MarkerDuplicate { marker, offset });
                        }
                        found.push(marker);
                    }
                    let segment = read_segment(reader, marker)?;
                    self.decode_segment(scope, marker, &segment, header)?;
                }
                MARKER_SYMBOL_SOC
                | MARKER_SYMBOL_SIZ
                | MARKER_SYMBOL_TLM
                | MARKER_SYMBOL_PLM
                | MARKER_SYMBOL_PPM
                | MARKER_SYMBOL_CRG
                | MARKER_SYMBOL_SOT
                | MARKER_SYMBOL_EOC
                | MARKER_SYMBOL_SOP
                | MARKER_SYMBOL_EPH => {
                    return Err(CodestreamError::MarkerUnexpected { marker, offset });
                }
                _ => skip_unknown_marker(reader, marker, offset)?,
            }
        }

        header.info.push_tile_part(sot.clone());
        Ok(sot)
    }

    fn decode_sot<R: io::Read + io::Seek>(
        &mut self,
        reader: &mut RandomAccessReader<R>,
        offset: u64,
        header: &Header,
    ) -> Result<StartOfTileSegment, CodestreamError> {
        info!("SOT start at byte offset {}", offset);
        let length = reader.read_u16()?;
        if length != SOT_SEGMENT_LENGTH {
            return Err(CodestreamError::SegmentLength {
                marker: MARKER_SYMBOL_SOT,
                length,
                offset: offset + 2,
            });
        }

        let segment = StartOfTileSegment {
            offset,
            length,
            tile_index: reader.read_u16()?,
            tile_part_length: reader.read_u32()?,
            tile_part_index: reader.read_u8()?,
            no_tile_parts: reader.read_u8()?,
        };

        let tile = segment.tile_index as usize;
        if tile >= header.num_tiles() {
            return Err(CodestreamError::out_of_range(
                MARKER_SYMBOL_SOT,
                "Isot",
                segment.tile_index,
            ));
        }

        // SOT and SOD alone take 14 bytes
        if segment.tile_part_length != 0 && segment.tile_part_length < 14 {
            return Err(CodestreamError::out_of_range(
                MARKER_SYMBOL_SOT,
                "Psot",
                segment.tile_part_length,
            ));
        }

        let expected = self.tile_part_indices.entry(tile).or_insert(0);
        if segment.tile_part_index != *expected {
            warn!(
                "tile {} has tile-part {} where {} was expected",
                tile, segment.tile_part_index, expected
            );
        }
        *expected = segment.tile_part_index.wrapping_add(1);

        info!("SOT end at byte offset {}", reader.position());
        Ok(segment)
    }

    fn decode_segment(
        &mut self,
        scope: HeaderScope,
        marker: MarkerSymbol,
        segment: &MarkerSegmentBuffer,
        header: &mut Header,
    ) -> Result<(), CodestreamError> {
        info!("{} start at byte offset {}", marker, segment.offset - 2);
        match marker {
            MARKER_SYMBOL_COD => self.decode_cod(scope, segment, header)?,
            MARKER_SYMBOL_COC => decode_coc(scope, segment, header)?,
            MARKER_SYMBOL_QCD => decode_qcd(scope, segment, header)?,
            MARKER_SYMBOL_QCC => decode_qcc(scope, segment, header)?,
            MARKER_SYMBOL_RGN => decode_rgn(scope, segment, header)?,
            MARKER_SYMBOL_POC => decode_poc(scope, segment, header)?,
            MARKER_SYMBOL_COM => decode_com(scope, segment, header)?,
            MARKER_SYMBOL_CRG => decode_crg(segment, header)?,
            MARKER_SYMBOL_PPM => decode_ppm(segment, header)?,
            MARKER_SYMBOL_TLM => decode_tlm(segment, header)?,
            MARKER_SYMBOL_PLM => decode_plm(segment, header)?,
            MARKER_SYMBOL_PPT => decode_ppt(scope, segment, header)?,
            MARKER_SYMBOL_PLT => decode_plt(scope, segment, header)?,
            _ => warn!("{} is not decoded in a {} header", marker, scope),
        }
        info!(
            "{} end at byte offset {}",
            marker,
            segment.offset + segment.data.len() as u64
        );
        Ok(())
    }

    // A.6.1 - Coding style default (COD)
    fn decode_cod(
        &mut self,
        scope: HeaderScope,
        segment: &MarkerSegmentBuffer,
        header: &mut Header,
    ) -> Result<(), CodestreamError> {
        let mut reader = SegmentReader::new(MARKER_SYMBOL_COD, &segment.data);
        let length = reader.read_u16()?;

        let scod = reader.read_u8()?;
        if scod & !CodingStyle::all().bits() != 0 {
            warn!("COD reserved coding style bits set in 0x{:02X}", scod);
        }
        let coding_style = CodingStyle::from_bits_truncate(scod);
        self.check_code_block_origin(coding_style)?;

        let progression_order = ProgressionOrder::new(reader.read_u8()?);
        if let ProgressionOrder::Reserved { value } = progression_order {
            warn!("COD reserved progression order {}", value);
        }

        let no_layers = reader.read_u16()?;
        if no_layers == 0 {
            return Err(CodestreamError::out_of_range(
                MARKER_SYMBOL_COD,
                "number of layers",
                no_layers,
            ));
        }

        let multiple_component_transformation =
            MultipleComponentTransformation::new(reader.read_u8()?);
        if let MultipleComponentTransformation::Reserved { value } =
            multiple_component_transformation
        {
            warn!("COD reserved multiple component transformation {}", value);
        }

        let parameters = decode_coding_style_parameters(&mut reader, coding_style)?;
        finish_segment(&reader);

        let specs = &mut header.specs;
        set_scoped(
            &mut specs.sop_markers,
            scope,
            coding_style.contains(CodingStyle::SOP_MARKERS),
        )?;
        set_scoped(
            &mut specs.eph_markers,
            scope,
            coding_style.contains(CodingStyle::EPH_MARKERS),
        )?;
        set_scoped(&mut specs.layers, scope, no_layers)?;
        set_scoped(&mut specs.progression_orders, scope, progression_order)?;
        set_scoped(
            &mut specs.component_transformations,
            scope,
            multiple_component_transformation,
        )?;
        set_coding_style_parameters(specs, scope, None, &parameters)?;

        header.info.insert_cod(
            scope,
            CodingStyleMarkerSegment {
                offset: segment.offset,
                length,
                coding_style,
                progression_order,
                no_layers,
                multiple_component_transformation,
                coding_style_parameters: parameters,
            },
        );
        Ok(())
    }

    // The code-block partition origin may only be fixed once per codestream.
    fn check_code_block_origin(&mut self, coding_style: CodingStyle) -> Result<(), CodestreamError> {
        let origin = (
            coding_style.contains(CodingStyle::HORIZONTAL_CODE_BLOCK_PARTITION),
            coding_style.contains(CodingStyle::VERTICAL_CODE_BLOCK_PARTITION),
        );
        match self.code_block_origin {
            None => {
                if origin != (false, false) {
                    warn!(
                        "COD code-block partition origin ({}, {}) is not defined in Part 1",
                        origin.0 as u8, origin.1 as u8
                    );
                }
                self.code_block_origin = Some(origin);
                Ok(())
            }
            Some(fixed) if fixed != origin => Err(CodestreamError::marker_error(
                MARKER_SYMBOL_COD,
                format!(
                    "code-block partition origin ({}, {}) redefined as ({}, {})",
                    fixed.0 as u8, fixed.1 as u8, origin.0 as u8, origin.1 as u8
                ),
            )),
            Some(_) => Ok(()),
        }
    }
}

/// Reads a marker segment's length field and content.
///
/// The returned buffer starts with the length field itself, so it is exactly
/// as long as the declared length.
fn read_segment<R: io::Read + io::Seek>(
    reader: &mut RandomAccessReader<R>,
    marker: MarkerSymbol,
) -> Result<MarkerSegmentBuffer, CodestreamError> {
    let offset = reader.position();
    let length = reader.read_u16()?;
    if length < 2 {
        return Err(CodestreamError::SegmentLength {
            marker,
            length,
            offset,
        });
    }

    let mut data = vec![0; length as usize];
    data[..2].copy_from_slice(&length.to_be_bytes());
    reader.read_fully(&mut data[2..])?;
    debug!("{} buffered {} bytes at byte offset {}", marker, length, offset);

    Ok(MarkerSegmentBuffer { offset, data })
}

fn skip_unknown_marker<R: io::Read + io::Seek>(
    reader: &mut RandomAccessReader<R>,
    marker: MarkerSymbol,
    offset: u64,
) -> Result<(), CodestreamError> {
    if !marker.is_marker() {
        return Err(CodestreamError::MarkerInvalid {
            value: marker.value(),
            offset,
        });
    }
    if marker.is_delimiter_range() {
        warn!("skipping reserved marker {} at byte offset {}", marker, offset);
        return Ok(());
    }

    let length = reader.read_u16()?;
    if length < 2 {
        return Err(CodestreamError::SegmentLength {
            marker,
            length,
            offset: offset + 2,
        });
    }
    warn!(
        "skipping unrecognized marker {} of length {} at byte offset {}",
        marker, length, offset
    );
    reader.skip(length as u64 - 2)
}

// Content left over after decoding is ignored, the next segment starts at
// the declared length.
fn finish_segment(reader: &SegmentReader) {
    let remaining = reader.remaining();
    if remaining > 0 {
        warn!(
            "{} length was short, skipping {} unread bytes",
            reader.marker(),
            remaining
        );
    }
}

fn set_scoped<T>(spec: &mut Spec<T>, scope: HeaderScope, value: T) -> Result<(), CodestreamError> {
    match scope {
        HeaderScope::Main => {
            spec.set_default(value);
            Ok(())
        }
        HeaderScope::Tile(tile) => spec.set_tile_default(tile, value),
    }
}

fn set_scoped_component<T>(
    spec: &mut Spec<T>,
    scope: HeaderScope,
    component: usize,
    value: T,
) -> Result<(), CodestreamError> {
    match scope {
        HeaderScope::Main => spec.set_component_default(component, value),
        HeaderScope::Tile(tile) => spec.set_tile_component(tile, component, value),
    }
}

// Sets a value for a whole header, or for one component when given.
fn set_for<T>(
    spec: &mut Spec<T>,
    scope: HeaderScope,
    component: Option<usize>,
    value: T,
) -> Result<(), CodestreamError> {
    match component {
        Some(component) => set_scoped_component(spec, scope, component, value),
        None => set_scoped(spec, scope, value),
    }
}

fn set_coding_style_parameters(
    specs: &mut DecoderSpecs,
    scope: HeaderScope,
    component: Option<usize>,
    parameters: &CodingStyleParameters,
) -> Result<(), CodestreamError> {
    set_for(
        &mut specs.decomposition_levels,
        scope,
        component,
        parameters.no_decomposition_levels(),
    )?;
    set_for(
        &mut specs.code_block_sizes,
        scope,
        component,
        CodeBlockSize {
            width: parameters.code_block_width(),
            height: parameters.code_block_height(),
        },
    )?;
    set_for(
        &mut specs.code_block_styles,
        scope,
        component,
        parameters.code_block_style(),
    )?;
    set_for(
        &mut specs.filters,
        scope,
        component,
        parameters.transformation(),
    )?;
    set_for(
        &mut specs.precinct_sizes,
        scope,
        component,
        parameters.precinct_sizes(),
    )
}

// A.5.1 - Image and tile size (SIZ)
fn decode_siz(buffer: &MarkerSegmentBuffer) -> Result<ImageAndTileSizeMarkerSegment, CodestreamError> {
    info!("SIZ start at byte offset {}", buffer.offset - 2);
    let mut reader = SegmentReader::new(MARKER_SYMBOL_SIZ, &buffer.data);
    let length = reader.read_u16()?;

    let decoder_capabilities = reader.read_u16()?;
    if decoder_capabilities > MAX_CAPABILITIES {
        return Err(CodestreamError::Unsupported {
            marker: MARKER_SYMBOL_SIZ,
            feature: format!("capabilities Rsiz = {}", decoder_capabilities),
        });
    }

    let mut segment = ImageAndTileSizeMarkerSegment {
        offset: buffer.offset,
        length,
        decoder_capabilities,
        reference_grid_width: read_size(&mut reader, "Xsiz", 1)?,
        reference_grid_height: read_size(&mut reader, "Ysiz", 1)?,
        image_horizontal_offset: read_size(&mut reader, "XOsiz", 0)?,
        image_vertical_offset: read_size(&mut reader, "YOsiz", 0)?,
        reference_tile_width: read_size(&mut reader, "XTsiz", 1)?,
        reference_tile_height: read_size(&mut reader, "YTsiz", 1)?,
        tile_horizontal_offset: read_size(&mut reader, "XTOsiz", 0)?,
        tile_vertical_offset: read_size(&mut reader, "YTOsiz", 0)?,
        components: Vec::new(),
    };

    // The image area must not be empty
    if segment.image_horizontal_offset >= segment.reference_grid_width {
        return Err(CodestreamError::out_of_range(
            MARKER_SYMBOL_SIZ,
            "XOsiz",
            segment.image_horizontal_offset,
        ));
    }
    if segment.image_vertical_offset >= segment.reference_grid_height {
        return Err(CodestreamError::out_of_range(
            MARKER_SYMBOL_SIZ,
            "YOsiz",
            segment.image_vertical_offset,
        ));
    }

    // The tile grid offsets (XTOsiz, YTOsiz) are constrained to be no
    // greater than the image area offsets. This is expressed by the
    // following ranges
    // 0 ≤ XTOsiz ≤ XOsiz
    // 0 ≤ YTOsiz ≤ YOsiz
    if segment.tile_horizontal_offset > segment.image_horizontal_offset
        || segment.tile_vertical_offset > segment.image_vertical_offset
    {
        return Err(CodestreamError::TileGridOffsetOverflow {
            tile_horizontal_offset: segment.tile_horizontal_offset,
            tile_vertical_offset: segment.tile_vertical_offset,
            image_horizontal_offset: segment.image_horizontal_offset,
            image_vertical_offset: segment.image_vertical_offset,
        });
    }

    // Also, the tile size plus the tile offset shall be greater than the image
    // area offset. This ensures that the first tile (tile 0) will contain at least
    // one reference grid point from the image area.
    //
    // XTsiz + XTOsiz > XOsiz
    // YTsiz + YTOsiz > YOsiz
    //
    // Every value is at most 2^31 - 1 so the sums fit.
    if segment.reference_tile_width + segment.tile_horizontal_offset
        <= segment.image_horizontal_offset
        || segment.reference_tile_height + segment.tile_vertical_offset
            <= segment.image_vertical_offset
    {
        return Err(CodestreamError::TileSizeOverflow {
            image_horizontal_offset: segment.image_horizontal_offset,
            image_vertical_offset: segment.image_vertical_offset,
            tile_horizontal_offset: segment.tile_horizontal_offset,
            tile_vertical_offset: segment.tile_vertical_offset,
            reference_tile_width: segment.reference_tile_width,
            reference_tile_height: segment.reference_tile_height,
        });
    }

    let no_components = reader.read_u16()?;
    if no_components == 0 || no_components > MAX_COMPONENTS {
        return Err(CodestreamError::out_of_range(
            MARKER_SYMBOL_SIZ,
            "Csiz",
            no_components,
        ));
    }

    segment.components = Vec::with_capacity(no_components as usize);
    for i in 0..no_components {
        let component = ComponentSize {
            precision: reader.read_u8()?,
            horizontal_separation: reader.read_u8()?,
            vertical_separation: reader.read_u8()?,
        };
        if component.depth() > MAX_COMPONENT_DEPTH {
            return Err(CodestreamError::out_of_range(
                MARKER_SYMBOL_SIZ,
                "Ssiz depth",
                component.depth(),
            ));
        }
        if component.horizontal_separation == 0 {
            return Err(CodestreamError::out_of_range(MARKER_SYMBOL_SIZ, "XRsiz", 0u8));
        }
        if component.vertical_separation == 0 {
            return Err(CodestreamError::out_of_range(MARKER_SYMBOL_SIZ, "YRsiz", 0u8));
        }
        debug!(
            "component {}: depth {}, signed {}, separation {}x{}",
            i,
            component.depth(),
            component.is_signed(),
            component.horizontal_separation,
            component.vertical_separation
        );
        segment.components.push(component);
    }

    let num_tiles = segment.num_tiles();
    if num_tiles > MAX_TILES {
        return Err(CodestreamError::out_of_range(
            MARKER_SYMBOL_SIZ,
            "number of tiles",
            num_tiles as u64,
        ));
    }

    finish_segment(&reader);
    info!(
        "SIZ end at byte offset {}",
        segment.offset + segment.length as u64
    );
    Ok(segment)
}

// Reads a SIZ size or offset, which must lie in minimum..=2^31 - 1.
fn read_size(
    reader: &mut SegmentReader,
    parameter: &'static str,
    minimum: u32,
) -> Result<u32, CodestreamError> {
    let value = reader.read_u32()?;
    if value < minimum || value > i32::MAX as u32 {
        return Err(CodestreamError::out_of_range(
            MARKER_SYMBOL_SIZ,
            parameter,
            value,
        ));
    }
    Ok(value)
}

fn read_component_index(
    reader: &mut SegmentReader,
    header: &Header,
) -> Result<u16, CodestreamError> {
    let no_components = header.info.siz().no_components();
    let component = reader.read_component_index(no_components)?;
    if component >= no_components {
        return Err(CodestreamError::marker_error(
            reader.marker(),
            format!(
                "component index {} out of range, {} components",
                component, no_components
            ),
        ));
    }
    Ok(component)
}

// A.6.1, A.6.2 - SPcod and SPcoc
fn decode_coding_style_parameters(
    reader: &mut SegmentReader,
    coding_style: CodingStyle,
) -> Result<CodingStyleParameters, CodestreamError> {
    let marker = reader.marker();

    let no_decomposition_levels = reader.read_u8()?;
    if no_decomposition_levels > MAX_DECOMPOSITION_LEVELS {
        return Err(CodestreamError::out_of_range(
            marker,
            "number of decomposition levels",
            no_decomposition_levels,
        ));
    }

    let code_block_width = reader.read_u8()?;
    let code_block_height = reader.read_u8()?;
    CodeBlockSize::from_exponents(marker, code_block_width, code_block_height)?;

    let style = reader.read_u8()?;
    let code_block_style = CodeBlockStyle::from_bits(style).ok_or_else(|| {
        CodestreamError::marker_error(marker, format!("unknown code-block style 0x{:02X}", style))
    })?;

    let filter = reader.read_u8()?;
    let transformation = match filter {
        FILTER_IRREVERSIBLE_9X7 => TransformationFilter::Irreversible,
        FILTER_REVERSIBLE_5X3 => TransformationFilter::Reversible,
        f if f & FILTER_CUSTOM_FLAG != 0 => {
            return Err(CodestreamError::Unsupported {
                marker,
                feature: format!("custom wavelet filter {}", f),
            })
        }
        f => {
            return Err(CodestreamError::marker_error(
                marker,
                format!("invalid wavelet filter {}", f),
            ))
        }
    };

    // One precinct size per resolution level, from the NL LL band upwards
    let mut precinct_sizes = Vec::new();
    if coding_style.contains(CodingStyle::PRECINCT_PARTITION) {
        for resolution_level in 0..=no_decomposition_levels {
            let size = PrecinctSize::new(reader.read_u8()?);
            if resolution_level > 0 && (size.width_exponent() == 0 || size.height_exponent() == 0)
            {
                return Err(CodestreamError::marker_error(
                    marker,
                    format!(
                        "precinct size exponent of zero at resolution level {}",
                        resolution_level
                    ),
                ));
            }
            debug!(
                "resolution level {} precinct size {}x{}",
                resolution_level,
                size.width(),
                size.height()
            );
            precinct_sizes.push(size);
        }
    }

    Ok(CodingStyleParameters {
        no_decomposition_levels,
        code_block_width,
        code_block_height,
        code_block_style,
        transformation,
        precinct_sizes,
    })
}

// A.6.2 - Coding style component (COC)
fn decode_coc(
    scope: HeaderScope,
    segment: &MarkerSegmentBuffer,
    header: &mut Header,
) -> Result<(), CodestreamError> {
    let mut reader = SegmentReader::new(MARKER_SYMBOL_COC, &segment.data);
    let length = reader.read_u16()?;
    let component_index = read_component_index(&mut reader, header)?;

    // Only the precinct bit is defined for Scoc
    let scoc = reader.read_u8()?;
    if scoc & !CodingStyle::PRECINCT_PARTITION.bits() != 0 {
        warn!("COC reserved coding style bits set in 0x{:02X}", scoc);
    }
    let coding_style = CodingStyle::from_bits_truncate(scoc) & CodingStyle::PRECINCT_PARTITION;

    let parameters = decode_coding_style_parameters(&mut reader, coding_style)?;
    finish_segment(&reader);

    set_coding_style_parameters(
        &mut header.specs,
        scope,
        Some(component_index as usize),
        &parameters,
    )?;
    header.info.insert_coc(
        scope,
        CodingStyleComponentSegment {
            offset: segment.offset,
            length,
            component_index,
            coding_style,
            coding_style_parameters: parameters,
        },
    );
    Ok(())
}

// A.6.4, A.6.5 - Sqcd/Sqcc and SPqcd/SPqcc
fn decode_quantization_parameters(
    reader: &mut SegmentReader,
) -> Result<QuantizationParameters, CodestreamError> {
    let marker = reader.marker();
    let sqcx = reader.read_u8()?;
    let guard_bits = (sqcx >> SQCX_GUARD_BITS_SHIFT) & SQCX_GUARD_BITS_MASK;
    let quantization_type = match sqcx & !(SQCX_GUARD_BITS_MASK << SQCX_GUARD_BITS_SHIFT) {
        SQCX_NO_QUANTIZATION => QuantizationType::No,
        SQCX_SCALAR_DERIVED => QuantizationType::ScalarDerived,
        SQCX_SCALAR_EXPOUNDED => QuantizationType::ScalarExpounded,
        value => {
            return Err(CodestreamError::marker_error(
                marker,
                format!("reserved quantization style {}", value),
            ))
        }
    };

    let mut values = Vec::new();
    match quantization_type {
        // Reversible, exponent only in the upper 5 bits
        QuantizationType::No => {
            while reader.remaining() > 0 {
                values.push(QuantizationStepSize {
                    exponent: reader.read_u8()? >> SQCX_REVERSIBLE_EXPONENT_SHIFT,
                    mantissa: 0,
                });
            }
        }
        QuantizationType::ScalarDerived => {
            values.push(read_step_size(reader)?);
        }
        QuantizationType::ScalarExpounded => {
            while reader.remaining() >= 2 {
                values.push(read_step_size(reader)?);
            }
        }
    }
    if values.is_empty() {
        return Err(CodestreamError::marker_error(
            marker,
            "no quantization step sizes",
        ));
    }

    let (step_sizes, leftover) = QuantizationStepSizes::from_values(values);
    if leftover > 0 {
        warn!(
            "{} has {} step sizes beyond the last complete resolution level",
            marker, leftover
        );
    }

    Ok(QuantizationParameters {
        quantization_type,
        guard_bits,
        step_sizes,
    })
}

fn read_step_size(reader: &mut SegmentReader) -> Result<QuantizationStepSize, CodestreamError> {
    let value = reader.read_u16()?;
    Ok(QuantizationStepSize {
        exponent: ((value >> SQCX_EXPONENT_SHIFT) & SQCX_EXPONENT_MASK) as u8,
        mantissa: value & SQCX_MANTISSA_MASK,
    })
}

// Step sizes are signalled for each resolution level, compare with the
// decomposition levels in effect for the same header and component.
fn check_resolution_levels(
    marker: MarkerSymbol,
    parameters: &QuantizationParameters,
    decomposition_levels: Option<&u8>,
) {
    if parameters.quantization_type() == QuantizationType::ScalarDerived {
        return;
    }
    if let Some(&levels) = decomposition_levels {
        let signalled = parameters.step_sizes().no_resolution_levels();
        if signalled != levels as usize + 1 {
            warn!(
                "{} signals step sizes for {} resolution levels, coding style has {}",
                marker,
                signalled,
                levels as usize + 1
            );
        }
    }
}

fn set_quantization_parameters(
    specs: &mut DecoderSpecs,
    scope: HeaderScope,
    component: Option<usize>,
    parameters: &QuantizationParameters,
) -> Result<(), CodestreamError> {
    set_for(
        &mut specs.quantization_types,
        scope,
        component,
        parameters.quantization_type(),
    )?;
    set_for(
        &mut specs.guard_bits,
        scope,
        component,
        parameters.guard_bits(),
    )?;
    set_for(
        &mut specs.step_sizes,
        scope,
        component,
        parameters.step_sizes().clone(),
    )
}

// A.6.4 - Quantization default (QCD)
fn decode_qcd(
    scope: HeaderScope,
    segment: &MarkerSegmentBuffer,
    header: &mut Header,
) -> Result<(), CodestreamError> {
    let mut reader = SegmentReader::new(MARKER_SYMBOL_QCD, &segment.data);
    let length = reader.read_u16()?;
    let parameters = decode_quantization_parameters(&mut reader)?;
    finish_segment(&reader);

    let levels = match scope {
        HeaderScope::Main => header.specs.decomposition_levels.default(),
        HeaderScope::Tile(tile) => header.specs.decomposition_levels.tile_default(tile),
    };
    check_resolution_levels(MARKER_SYMBOL_QCD, &parameters, levels);

    set_quantization_parameters(&mut header.specs, scope, None, &parameters)?;
    header.info.insert_qcd(
        scope,
        QuantizationDefaultMarkerSegment {
            offset: segment.offset,
            length,
            quantization_parameters: parameters,
        },
    );
    Ok(())
}

// A.6.5 - Quantization component (QCC)
fn decode_qcc(
    scope: HeaderScope,
    segment: &MarkerSegmentBuffer,
    header: &mut Header,
) -> Result<(), CodestreamError> {
    let mut reader = SegmentReader::new(MARKER_SYMBOL_QCC, &segment.data);
    let length = reader.read_u16()?;
    let component_index = read_component_index(&mut reader, header)?;
    let parameters = decode_quantization_parameters(&mut reader)?;
    finish_segment(&reader);

    let component = component_index as usize;
    let levels = match scope {
        HeaderScope::Main => header.specs.decomposition_levels.component_default(component),
        HeaderScope::Tile(tile) => header.specs.decomposition_levels.resolve(tile, component),
    };
    check_resolution_levels(MARKER_SYMBOL_QCC, &parameters, levels);

    set_quantization_parameters(&mut header.specs, scope, Some(component), &parameters)?;
    header.info.insert_qcc(
        scope,
        QuantizationComponentSegment {
            offset: segment.offset,
            length,
            component_index,
            quantization_parameters: parameters,
        },
    );
    Ok(())
}

// A.6.3 - Region of interest (RGN)
fn decode_rgn(
    scope: HeaderScope,
    segment: &MarkerSegmentBuffer,
    header: &mut Header,
) -> Result<(), CodestreamError> {
    let mut reader = SegmentReader::new(MARKER_SYMBOL_RGN, &segment.data);
    let length = reader.read_u16()?;
    let component_index = read_component_index(&mut reader, header)?;

    let region_of_interest_style = RegionOfInterestStyle::new(reader.read_u8()?);
    if let RegionOfInterestStyle::Reserved { value } = region_of_interest_style {
        return Err(CodestreamError::Unsupported {
            marker: MARKER_SYMBOL_RGN,
            feature: format!("region of interest style {}", value),
        });
    }
    let shift = reader.read_u8()?;
    finish_segment(&reader);

    set_scoped_component(
        &mut header.specs.region_of_interest_shifts,
        scope,
        component_index as usize,
        shift,
    )?;
    header.info.insert_rgn(
        scope,
        RegionOfInterestSegment {
            offset: segment.offset,
            length,
            component_index,
            region_of_interest_style,
            region_of_interest_style_parameter: shift,
        },
    );
    Ok(())
}

// A.6.6 - Progression order change (POC)
fn decode_poc(
    scope: HeaderScope,
    segment: &MarkerSegmentBuffer,
    header: &mut Header,
) -> Result<(), CodestreamError> {
    let mut reader = SegmentReader::new(MARKER_SYMBOL_POC, &segment.data);
    let length = reader.read_u16()?;

    // Component indices take two bytes from 256 components on
    let wide = header.info.siz().no_components() >= 256;
    let entry_size = if wide { 9 } else { 7 };
    let no_changes = (length as usize - 2) / entry_size;

    let mut progressions = Vec::with_capacity(no_changes);
    for _ in 0..no_changes {
        let resolution_level_index_start = reader.read_u8()?;
        let component_index_start = if wide {
            reader.read_u16()?
        } else {
            reader.read_u8()? as u16
        };
        let layer_index_end = reader.read_u16()?;
        let resolution_level_index_end = reader.read_u8()?;
        let component_index_end = if wide {
            reader.read_u16()?
        } else {
            // 0 is interpreted as 256
            match reader.read_u8()? {
                0 => 256,
                value => value as u16,
            }
        };
        let progression_order = ProgressionOrder::new(reader.read_u8()?);

        if let ProgressionOrder::Reserved { value } = progression_order {
            return Err(CodestreamError::marker_error(
                MARKER_SYMBOL_POC,
                format!("reserved progression order {}", value),
            ));
        }
        if layer_index_end == 0 {
            return Err(CodestreamError::out_of_range(
                MARKER_SYMBOL_POC,
                "LYEpoc",
                layer_index_end,
            ));
        }
        if resolution_level_index_end <= resolution_level_index_start {
            return Err(CodestreamError::out_of_range(
                MARKER_SYMBOL_POC,
                "REpoc",
                resolution_level_index_end,
            ));
        }
        if component_index_end <= component_index_start {
            return Err(CodestreamError::out_of_range(
                MARKER_SYMBOL_POC,
                "CEpoc",
                component_index_end,
            ));
        }

        progressions.push(ProgressionOrderChange {
            resolution_level_index_start,
            component_index_start,
            layer_index_end,
            resolution_level_index_end,
            component_index_end,
            progression_order,
        });
    }
    finish_segment(&reader);

    let changes = header
        .info
        .append_poc(scope, segment.offset, length, progressions)
        .progressions()
        .to_vec();
    debug!("{} progression changes in the {} header", changes.len(), scope);
    set_scoped(&mut header.specs.progression_changes, scope, changes)
}

// A.9.2 - Comment (COM)
fn decode_com(
    scope: HeaderScope,
    segment: &MarkerSegmentBuffer,
    header: &mut Header,
) -> Result<(), CodestreamError> {
    let mut reader = SegmentReader::new(MARKER_SYMBOL_COM, &segment.data);
    let length = reader.read_u16()?;

    let registration_value = CommentRegistrationValue::new(reader.read_u16()?);
    if let CommentRegistrationValue::Reserved { value } = registration_value {
        warn!("COM reserved registration value {}", value);
    }
    let comment = reader.read_remaining().to_vec();

    header.info.push_com(
        scope,
        CommentMarkerSegment {
            offset: segment.offset,
            length,
            registration_value,
            comment,
        },
    );
    Ok(())
}

// A.9.1 - Component registration (CRG)
fn decode_crg(segment: &MarkerSegmentBuffer, header: &mut Header) -> Result<(), CodestreamError> {
    let mut reader = SegmentReader::new(MARKER_SYMBOL_CRG, &segment.data);
    let length = reader.read_u16()?;

    let no_components = header.info.siz().no_components() as usize;
    let mut horizontal_offset = Vec::with_capacity(no_components);
    let mut vertical_offset = Vec::with_capacity(no_components);
    for _ in 0..no_components {
        horizontal_offset.push(reader.read_u16()?);
        vertical_offset.push(reader.read_u16()?);
    }
    finish_segment(&reader);
    warn!("CRG information is not used when decoding");

    header.info.set_crg(ComponentRegistrationSegment {
        offset: segment.offset,
        length,
        horizontal_offset,
        vertical_offset,
    });
    Ok(())
}

// A.7.4 - Packed packet headers, main header (PPM)
fn decode_ppm(segment: &MarkerSegmentBuffer, header: &mut Header) -> Result<(), CodestreamError> {
    let mut reader = SegmentReader::new(MARKER_SYMBOL_PPM, &segment.data);
    let length = reader.read_u16()?;
    let index = reader.read_u8()?;
    let data = reader.read_remaining().to_vec();

    header.specs.packed_packet_headers.set_default(true);
    header.info.push_ppm(PackedPacketHeaderSegment {
        offset: segment.offset,
        length,
        index,
        data,
    });
    Ok(())
}

// A.7.5 - Packed packet headers, tile-part header (PPT)
fn decode_ppt(
    scope: HeaderScope,
    segment: &MarkerSegmentBuffer,
    header: &mut Header,
) -> Result<(), CodestreamError> {
    let HeaderScope::Tile(tile) = scope else {
        return Err(CodestreamError::MarkerUnexpected {
            marker: MARKER_SYMBOL_PPT,
            offset: segment.offset - 2,
        });
    };
    // PPM and PPT shall not both be used
    if !header.info.ppm().is_empty() {
        return Err(CodestreamError::marker_error(
            MARKER_SYMBOL_PPT,
            "packed packet headers already in the main header",
        ));
    }

    let mut reader = SegmentReader::new(MARKER_SYMBOL_PPT, &segment.data);
    let length = reader.read_u16()?;
    let index = reader.read_u8()?;
    let data = reader.read_remaining().to_vec();

    header.specs.packed_packet_headers.set_tile_default(tile, true)?;
    header.info.push_ppt(
        tile,
        TilePackedPacketHeaderSegment {
            offset: segment.offset,
            length,
            index,
            data,
        },
    );
    Ok(())
}

// A.7.1 - Tile-part lengths (TLM)
fn decode_tlm(segment: &MarkerSegmentBuffer, header: &mut Header) -> Result<(), CodestreamError> {
    let mut reader = SegmentReader::new(MARKER_SYMBOL_TLM, &segment.data);
    let length = reader.read_u16()?;
    let index = reader.read_u8()?;
    let stlm = reader.read_u8()?;

    // ST: size of Ttlm, SP: size of Ptlm
    let tile_index_size = (stlm >> 4) & 0b11;
    if tile_index_size == 3 {
        return Err(CodestreamError::marker_error(
            MARKER_SYMBOL_TLM,
            format!("reserved Stlm 0x{:02X}", stlm),
        ));
    }
    let tile_part_length_size = if (stlm >> 6) & 1 == 1 { 4 } else { 2 };
    let entry_size = tile_index_size as usize + tile_part_length_size;

    let mut tile_part_lengths = Vec::new();
    while reader.remaining() >= entry_size {
        let tile_index = match tile_index_size {
            0 => None,
            1 => Some(reader.read_u8()? as u16),
            _ => Some(reader.read_u16()?),
        };
        let tile_part_length = if tile_part_length_size == 4 {
            reader.read_u32()?
        } else {
            reader.read_u16()? as u32
        };
        tile_part_lengths.push(TilePartLength {
            tile_index,
            tile_part_length,
        });
    }
    finish_segment(&reader);

    header.info.push_tlm(TilePartLengthsSegment {
        offset: segment.offset,
        length,
        index,
        tile_part_lengths,
    });
    Ok(())
}

/// Splits packet lengths coded in 7 bit groups, most significant group
/// first, with the high bit set on every group but the last.
///
/// Returns the lengths and whether the last one was complete.
pub(crate) fn decode_packet_lengths(
    marker: MarkerSymbol,
    bytes: &[u8],
) -> Result<(Vec<u32>, bool), CodestreamError> {
    let mut lengths = Vec::new();
    let mut value: u64 = 0;
    let mut pending = false;
    for &byte in bytes {
        value = (value << 7) | (byte & 0x7F) as u64;
        if value > u32::MAX as u64 {
            return Err(CodestreamError::marker_error(
                marker,
                "packet length does not fit in 32 bits",
            ));
        }
        pending = byte & 0x80 != 0;
        if !pending {
            lengths.push(value as u32);
            value = 0;
        }
    }
    Ok((lengths, !pending))
}

// A.7.2 - Packet length, main header (PLM)
fn decode_plm(segment: &MarkerSegmentBuffer, header: &mut Header) -> Result<(), CodestreamError> {
    let mut reader = SegmentReader::new(MARKER_SYMBOL_PLM, &segment.data);
    let length = reader.read_u16()?;
    let index = reader.read_u8()?;

    let mut tile_parts = Vec::new();
    while reader.remaining() > 0 {
        let no_bytes = reader.read_u8()? as usize;
        let available = no_bytes.min(reader.remaining());
        if available < no_bytes {
            warn!(
                "PLM packet lengths continue past the segment, {} of {} bytes present",
                available, no_bytes
            );
        }
        let (lengths, complete) =
            decode_packet_lengths(MARKER_SYMBOL_PLM, reader.read_bytes(available)?)?;
        if !complete {
            warn!("PLM last packet length of a tile-part is incomplete");
        }
        tile_parts.push(lengths);
    }

    header.info.push_plm(PacketLengthSegment {
        offset: segment.offset,
        length,
        index,
        tile_parts,
    });
    Ok(())
}

// A.7.3 - Packet length, tile-part header (PLT)
fn decode_plt(
    scope: HeaderScope,
    segment: &MarkerSegmentBuffer,
    header: &mut Header,
) -> Result<(), CodestreamError> {
    let HeaderScope::Tile(tile) = scope else {
        return Err(CodestreamError::MarkerUnexpected {
            marker: MARKER_SYMBOL_PLT,
            offset: segment.offset - 2,
        });
    };

    let mut reader = SegmentReader::new(MARKER_SYMBOL_PLT, &segment.data);
    let length = reader.read_u16()?;
    let index = reader.read_u8()?;
    let (packet_lengths, complete) =
        decode_packet_lengths(MARKER_SYMBOL_PLT, reader.read_remaining())?;
    if !complete {
        warn!("PLT last packet length is incomplete");
    }

    header.info.push_plt(
        tile,
        TilePacketLength {
            offset: segment.offset,
            length,
            index,
            packet_lengths,
        },
    );
    Ok(())
}
