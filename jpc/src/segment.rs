use std::fmt;

use crate::error::CodestreamError;
use crate::marker::{
    CodeBlockStyle, CodingStyle, MarkerSymbol, MAX_CODE_BLOCK_AREA, MAX_CODE_BLOCK_DIMENSION,
    MIN_CODE_BLOCK_DIMENSION, PRECINCT_PARTITION_DEFAULT_SIZE, SSIZ_DEPTH_MASK,
    SSIZ_SIGNED_SHIFT,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressionOrder {
    // 0000 0000 Layer-resolution level-component-position progression
    LRLCPP,

    // 0000 0001 Resolution level-layer-component-position progression
    RLLCPP,

    // 0000 0010 Resolution level-position-component-layer progression
    RLPCLP,

    // 0000 0011 Position-component-resolution level-layer progression
    PCRLLP,

    // 0000 0100 Component-position-resolution level-layer progression
    CPRLLP,

    // All other values reserved
    Reserved { value: u8 },
}

impl ProgressionOrder {
    pub fn new(value: u8) -> ProgressionOrder {
        match value {
            0b0000_0000 => ProgressionOrder::LRLCPP,
            0b0000_0001 => ProgressionOrder::RLLCPP,
            0b0000_0010 => ProgressionOrder::RLPCLP,
            0b0000_0011 => ProgressionOrder::PCRLLP,
            0b0000_0100 => ProgressionOrder::CPRLLP,
            _ => ProgressionOrder::Reserved { value },
        }
    }
}

impl fmt::Display for ProgressionOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProgressionOrder::LRLCPP => write!(f, "LRCP"),
            ProgressionOrder::RLLCPP => write!(f, "RLCP"),
            ProgressionOrder::RLPCLP => write!(f, "RPCL"),
            ProgressionOrder::PCRLLP => write!(f, "PCRL"),
            ProgressionOrder::CPRLLP => write!(f, "CPRL"),
            ProgressionOrder::Reserved { value } => write!(f, "reserved ({})", value),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MultipleComponentTransformation {
    // No multiple component transformation specified.
    None,

    // Component transformation used on components 0, 1, 2 for coding efficiency.
    // Irreversible component transformation used with the 9-7 irreversible filter.
    // Reversible component transformation used with the 5-3 reversible filter.
    Multiple,

    // All other values reserved
    Reserved { value: u8 },
}

impl MultipleComponentTransformation {
    pub fn new(value: u8) -> MultipleComponentTransformation {
        match value {
            0 => MultipleComponentTransformation::None,
            1 => MultipleComponentTransformation::Multiple,
            _ => MultipleComponentTransformation::Reserved { value },
        }
    }
}

/// Wavelet transformation of a tile-component.
///
/// Only the two Part 1 filters are representable; custom filters are
/// rejected while decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformationFilter {
    // 9-7 irreversible filter
    Irreversible,
    // 5-3 reversible filter
    Reversible,
}

impl fmt::Display for TransformationFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransformationFilter::Irreversible => write!(f, "9-7 irreversible"),
            TransformationFilter::Reversible => write!(f, "5-3 reversible"),
        }
    }
}

/// Code-block dimensions in samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeBlockSize {
    pub width: u32,
    pub height: u32,
}

impl CodeBlockSize {
    /// Maps the SPcod/SPcoc exponents to a size, 2^(xcb + 2) by 2^(ycb + 2).
    pub fn from_exponents(
        marker: MarkerSymbol,
        width_exponent: u8,
        height_exponent: u8,
    ) -> Result<CodeBlockSize, CodestreamError> {
        let width = code_block_dimension(width_exponent)
            .filter(|w| (MIN_CODE_BLOCK_DIMENSION..=MAX_CODE_BLOCK_DIMENSION).contains(w))
            .ok_or_else(|| {
                CodestreamError::out_of_range(marker, "code-block width exponent", width_exponent)
            })?;
        let height = code_block_dimension(height_exponent)
            .filter(|h| (MIN_CODE_BLOCK_DIMENSION..=MAX_CODE_BLOCK_DIMENSION).contains(h))
            .ok_or_else(|| {
                CodestreamError::out_of_range(marker, "code-block height exponent", height_exponent)
            })?;
        if width * height > MAX_CODE_BLOCK_AREA {
            return Err(CodestreamError::out_of_range(
                marker,
                "code-block area",
                width * height,
            ));
        }
        Ok(CodeBlockSize { width, height })
    }
}

/// 1 << (exponent + 2), or `None` when it does not fit in 32 bits.
pub fn code_block_dimension(exponent: u8) -> Option<u32> {
    1u32.checked_shl(exponent as u32 + 2)
}

/// Precinct size of a single resolution level.
///
/// The low nibble is the width exponent PPx, the high nibble the height
/// exponent PPy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrecinctSize {
    value: u8,
}

impl PrecinctSize {
    pub fn new(value: u8) -> PrecinctSize {
        PrecinctSize { value }
    }

    pub fn width_exponent(&self) -> u8 {
        self.value & 0b0000_1111
    }

    pub fn height_exponent(&self) -> u8 {
        self.value >> 4
    }

    pub fn width(&self) -> u32 {
        1 << self.width_exponent()
    }

    pub fn height(&self) -> u32 {
        1 << self.height_exponent()
    }
}

impl Default for PrecinctSize {
    // PPx = 15 and PPy = 15
    fn default() -> Self {
        PrecinctSize::new(PRECINCT_PARTITION_DEFAULT_SIZE)
    }
}

// A.12 – Coding style default parameter values
#[derive(Clone, Debug, PartialEq)]
pub struct CodingStyleParameters {
    // Number of decomposition levels, NL, zero implies no transformation.
    pub(crate) no_decomposition_levels: u8,

    // Code-block width exponent offset value, xcb
    pub(crate) code_block_width: u8,

    // Code-block height exponent offset value, ycb
    pub(crate) code_block_height: u8,

    // Style of the code-block coding passes
    pub(crate) code_block_style: CodeBlockStyle,

    // Wavelet transformation used
    pub(crate) transformation: TransformationFilter,

    // Precinct sizes, one per resolution level starting with the NL LL band.
    // Empty when the default 2^15 precincts are used.
    pub(crate) precinct_sizes: Vec<PrecinctSize>,
}

impl CodingStyleParameters {
    pub fn no_decomposition_levels(&self) -> u8 {
        self.no_decomposition_levels
    }

    pub fn code_block_width_exponent(&self) -> u8 {
        self.code_block_width
    }

    pub fn code_block_height_exponent(&self) -> u8 {
        self.code_block_height
    }

    pub fn code_block_width(&self) -> u32 {
        1 << (self.code_block_width + 2)
    }

    pub fn code_block_height(&self) -> u32 {
        1 << (self.code_block_height + 2)
    }

    pub fn code_block_style(&self) -> CodeBlockStyle {
        self.code_block_style
    }

    pub fn transformation(&self) -> TransformationFilter {
        self.transformation
    }

    pub fn has_defined_precinct_size(&self) -> bool {
        !self.precinct_sizes.is_empty()
    }

    /// Signalled precinct sizes, or the single default size.
    pub fn precinct_sizes(&self) -> Vec<PrecinctSize> {
        if self.precinct_sizes.is_empty() {
            vec![PrecinctSize::default()]
        } else {
            self.precinct_sizes.clone()
        }
    }
}

impl fmt::Display for CodingStyleParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "  Decomposition levels: {}", self.no_decomposition_levels)?;
        writeln!(
            f,
            "  Code-block size: {}x{}",
            self.code_block_width(),
            self.code_block_height()
        )?;
        writeln!(f, "  Code-block style: {:?}", self.code_block_style)?;
        writeln!(f, "  Transformation: {}", self.transformation)?;
        let sizes: Vec<String> = self
            .precinct_sizes()
            .iter()
            .map(|p| format!("{}x{}", p.width(), p.height()))
            .collect();
        writeln!(f, "  Precinct sizes: {}", sizes.join(", "))
    }
}

// A.6.1
//
// Coding style default (COD)
//
// Function: Describes the coding style, number of decomposition levels,
// and layering that is the default used for compressing all components of
// an image (if in the main header) or a tile (if in the tile-part header).
//
// The parameter values can be overridden for an individual component by a
// COC marker segment in either the main or tile-part header.
#[derive(Clone, Debug, PartialEq)]
pub struct CodingStyleMarkerSegment {
    pub(crate) offset: u64,

    // Lcod: Length of marker segment in bytes (not including the marker).
    pub(crate) length: u16,

    // Scod: Coding style for all components.
    pub(crate) coding_style: CodingStyle,

    // SGcod: Progression order.
    pub(crate) progression_order: ProgressionOrder,

    // SGcod: Number of layers.
    pub(crate) no_layers: u16,

    // SGcod: Multiple component transformation.
    pub(crate) multiple_component_transformation: MultipleComponentTransformation,

    // SPcod
    pub(crate) coding_style_parameters: CodingStyleParameters,
}

impl CodingStyleMarkerSegment {
    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn coding_style(&self) -> CodingStyle {
        self.coding_style
    }

    pub fn progression_order(&self) -> ProgressionOrder {
        self.progression_order
    }

    pub fn no_layers(&self) -> u16 {
        self.no_layers
    }

    pub fn multiple_component_transformation(&self) -> MultipleComponentTransformation {
        self.multiple_component_transformation
    }

    pub fn coding_style_parameters(&self) -> &CodingStyleParameters {
        &self.coding_style_parameters
    }
}

impl fmt::Display for CodingStyleMarkerSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "  Coding style: {:?}", self.coding_style)?;
        writeln!(f, "  Progression order: {}", self.progression_order)?;
        writeln!(f, "  Layers: {}", self.no_layers)?;
        writeln!(
            f,
            "  Multiple component transformation: {:?}",
            self.multiple_component_transformation
        )?;
        write!(f, "{}", self.coding_style_parameters)
    }
}

// A.6.2
//
// Coding style component (COC)
//
// Function: Describes the coding style, number of decomposition levels, and
// layering used for compressing a particular component.
#[derive(Clone, Debug, PartialEq)]
pub struct CodingStyleComponentSegment {
    pub(crate) offset: u64,

    // Lcoc: Length of marker segment in bytes (not including the marker).
    pub(crate) length: u16,

    // Ccoc: The index of the component to which this marker segment relates.
    pub(crate) component_index: u16,

    // Scoc: Coding style for this component.
    pub(crate) coding_style: CodingStyle,

    // SPcoc
    pub(crate) coding_style_parameters: CodingStyleParameters,
}

impl CodingStyleComponentSegment {
    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn component_index(&self) -> u16 {
        self.component_index
    }

    pub fn coding_style(&self) -> CodingStyle {
        self.coding_style
    }

    pub fn coding_style_parameters(&self) -> &CodingStyleParameters {
        &self.coding_style_parameters
    }
}

impl fmt::Display for CodingStyleComponentSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "  Component: {}", self.component_index)?;
        writeln!(f, "  Coding style: {:?}", self.coding_style)?;
        write!(f, "{}", self.coding_style_parameters)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantizationType {
    // No quantization
    No,

    // Scalar derived (values signalled for NLLL subband only).
    ScalarDerived,

    // Scalar expounded (values signalled for each subband). There are
    // as many step sizes signalled as there are subbands.
    ScalarExpounded,
}

/// Exponent and mantissa of one subband's quantization step size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuantizationStepSize {
    pub exponent: u8,
    pub mantissa: u16,
}

impl QuantizationStepSize {
    /// (1 + mantissa / 2^11) / 2^exponent, relative to the subband's
    /// dynamic range.
    pub fn normalized(&self) -> f32 {
        (1.0 + self.mantissa as f32 / 2048.0) / (1u64 << self.exponent) as f32
    }
}

/// Step sizes per resolution level and subband.
///
/// Level 0 holds the single NL LL subband, each following level holds its HL,
/// LH and HH subbands in that order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuantizationStepSizes {
    levels: Vec<Vec<QuantizationStepSize>>,
}

impl QuantizationStepSizes {
    /// Splits the flat signalled list into the LL then HL/LH/HH shape.
    ///
    /// Returns the step sizes and the number of trailing values that do not
    /// complete a resolution level.
    pub fn from_values(values: Vec<QuantizationStepSize>) -> (QuantizationStepSizes, usize) {
        let mut levels = Vec::new();
        let mut values = values.into_iter();
        if let Some(ll) = values.next() {
            levels.push(vec![ll]);
        }
        let rest: Vec<QuantizationStepSize> = values.collect();
        let mut chunks = rest.chunks_exact(3);
        for chunk in &mut chunks {
            levels.push(chunk.to_vec());
        }
        let leftover = chunks.remainder().len();
        (QuantizationStepSizes { levels }, leftover)
    }

    pub fn levels(&self) -> &[Vec<QuantizationStepSize>] {
        &self.levels
    }

    /// Number of resolution levels with signalled values.
    pub fn no_resolution_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn get(&self, resolution_level: usize, subband: usize) -> Option<QuantizationStepSize> {
        self.levels
            .get(resolution_level)
            .and_then(|level| level.get(subband))
            .copied()
    }

    /// Step size derived from the NL LL value, E.5.
    ///
    /// Every subband of resolution level r > 0 uses exponent ε0 + 1 - r and
    /// the LL mantissa.
    pub fn derive(&self, resolution_level: usize, subband: usize) -> Option<QuantizationStepSize> {
        let ll = self.get(0, 0)?;
        if resolution_level == 0 {
            return if subband == 0 { Some(ll) } else { None };
        }
        if subband > 2 {
            return None;
        }
        let exponent = (ll.exponent as usize + 1).checked_sub(resolution_level)?;
        Some(QuantizationStepSize {
            exponent: exponent as u8,
            mantissa: ll.mantissa,
        })
    }
}

// A.6.4 / A.6.5 – Quantization parameter values shared by QCD and QCC
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizationParameters {
    pub(crate) quantization_type: QuantizationType,

    // Number of guard bits, 0 to 7
    pub(crate) guard_bits: u8,

    // SPqcd / SPqcc
    pub(crate) step_sizes: QuantizationStepSizes,
}

impl QuantizationParameters {
    pub fn quantization_type(&self) -> QuantizationType {
        self.quantization_type
    }

    pub fn guard_bits(&self) -> u8 {
        self.guard_bits
    }

    pub fn step_sizes(&self) -> &QuantizationStepSizes {
        &self.step_sizes
    }

    /// Step size of a subband, deriving it from the LL value when only that
    /// one is signalled.
    pub fn step_size(&self, resolution_level: usize, subband: usize) -> Option<QuantizationStepSize> {
        match self.quantization_type {
            QuantizationType::ScalarDerived => self.step_sizes.derive(resolution_level, subband),
            _ => self.step_sizes.get(resolution_level, subband),
        }
    }

    pub fn quantization_exponents(&self) -> Vec<u8> {
        self.step_sizes
            .levels
            .iter()
            .flatten()
            .map(|s| s.exponent)
            .collect()
    }
}

impl fmt::Display for QuantizationParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "  Quantization type: {:?}", self.quantization_type)?;
        writeln!(f, "  Guard bits: {}", self.guard_bits)?;
        for (r, level) in self.step_sizes.levels.iter().enumerate() {
            let values: Vec<String> = level
                .iter()
                .map(|s| match self.quantization_type {
                    QuantizationType::No => format!("{}", s.exponent),
                    _ => format!("{}/{}", s.exponent, s.mantissa),
                })
                .collect();
            writeln!(f, "  Resolution {}: {}", r, values.join(" "))?;
        }
        Ok(())
    }
}

// A.6.4
//
// Quantization default (QCD)
//
// Function: Describes the quantization default used for compressing all
// components not defined by a QCC marker segment. The parameter values can be
// overridden for an individual component by a QCC marker segment in either the
// main or tile-part header.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizationDefaultMarkerSegment {
    pub(crate) offset: u64,

    // Lqcd: Length of marker segment in bytes (not including the marker).
    pub(crate) length: u16,

    // Sqcd, SPqcd
    pub(crate) quantization_parameters: QuantizationParameters,
}

impl QuantizationDefaultMarkerSegment {
    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn quantization_parameters(&self) -> &QuantizationParameters {
        &self.quantization_parameters
    }
}

// A.6.5
//
// Quantization component (QCC)
//
// Function: Describes the quantization used for compressing a particular
// component
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizationComponentSegment {
    pub(crate) offset: u64,

    // Lqcc: Length of marker segment in bytes (not including the marker).
    pub(crate) length: u16,

    // Cqcc: The index of the component to which this marker segment relates.
    pub(crate) component_index: u16,

    // Sqcc, SPqcc
    pub(crate) quantization_parameters: QuantizationParameters,
}

impl QuantizationComponentSegment {
    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn component_index(&self) -> u16 {
        self.component_index
    }

    pub fn quantization_parameters(&self) -> &QuantizationParameters {
        &self.quantization_parameters
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionOfInterestStyle {
    ImplicitRegionOfInterest,
    Reserved { value: u8 },
}

impl RegionOfInterestStyle {
    pub fn new(value: u8) -> RegionOfInterestStyle {
        match value {
            0 => RegionOfInterestStyle::ImplicitRegionOfInterest,
            _ => RegionOfInterestStyle::Reserved { value },
        }
    }
}

// A.6.3
//
// Region of interest (RGN)
//
// Function: Signals the presence of an ROI in the codestream.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionOfInterestSegment {
    pub(crate) offset: u64,

    // Lrgn: Length of marker segment in bytes (not including the marker)
    pub(crate) length: u16,

    // Crgn: The index of the component to which this marker segment relates.
    // The components are indexed 0, 1, 2, etc.
    pub(crate) component_index: u16,

    // Srgn: ROI style for the current ROI.
    pub(crate) region_of_interest_style: RegionOfInterestStyle,

    // SPrgn: Parameter for ROI style designated in Srgn, the max-shift value.
    pub(crate) region_of_interest_style_parameter: u8,
}

impl RegionOfInterestSegment {
    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn component_index(&self) -> u16 {
        self.component_index
    }

    pub fn region_of_interest_style(&self) -> RegionOfInterestStyle {
        self.region_of_interest_style
    }

    pub fn shift(&self) -> u8 {
        self.region_of_interest_style_parameter
    }
}

/// One entry of a progression order change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressionOrderChange {
    // RSpoc: Resolution level index (inclusive) for the start of a progression.
    pub resolution_level_index_start: u8,

    // CSpoc: Component index (inclusive) for the start of a progression.
    pub component_index_start: u16,

    // LYEpoc: Layer index (exclusive) for the end of a progression.
    pub layer_index_end: u16,

    // REpoc: Resolution Level index (exclusive) for the end of a progression.
    pub resolution_level_index_end: u8,

    // CEpoc: Component index (exclusive) for the end of a progression.
    pub component_index_end: u16,

    // Ppoc: Progression order.
    pub progression_order: ProgressionOrder,
}

// A.6.6
//
// Progression order change (POC)
//
// Function: Describes the bounds and progression order for any progression
// order other than specified in the COD marker segments in the codestream.
//
// In a tile, the changes of every POC segment are kept in order, later
// segments append to the list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgressionOrderChangeSegment {
    // Byte offset and Lpoc of each segment contributing to the list, in
    // stream order.
    pub(crate) segments: Vec<(u64, u16)>,

    pub(crate) progressions: Vec<ProgressionOrderChange>,
}

impl ProgressionOrderChangeSegment {
    /// Lpoc of the first segment.
    pub fn length(&self) -> u16 {
        self.segments.first().map_or(0, |(_, length)| *length)
    }

    /// Byte offset of the first segment.
    pub fn offset(&self) -> u64 {
        self.segments.first().map_or(0, |(offset, _)| *offset)
    }

    /// Byte offset and Lpoc of every segment, first to last.
    pub fn segments(&self) -> &[(u64, u16)] {
        &self.segments
    }

    pub fn progressions(&self) -> &[ProgressionOrderChange] {
        &self.progressions
    }
}

impl fmt::Display for ProgressionOrderChangeSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (offset, length) in &self.segments {
            writeln!(f, "  Segment at byte offset {}, Lpoc {}", offset, length)?;
        }
        for (i, p) in self.progressions.iter().enumerate() {
            writeln!(
                f,
                "  Change {}: resolutions {}..{}, components {}..{}, layers ..{}, {}",
                i,
                p.resolution_level_index_start,
                p.resolution_level_index_end,
                p.component_index_start,
                p.component_index_end,
                p.layer_index_end,
                p.progression_order
            )?;
        }
        Ok(())
    }
}

/// Size and sampling of one image component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentSize {
    // Ssiz: Precision (depth) in bits and sign of the component samples.
    pub(crate) precision: u8,

    // XRsiz: Horizontal separation of a sample of this component with respect
    // to the reference grid.
    pub(crate) horizontal_separation: u8,

    // YRsiz: Vertical separation of a sample of this component with respect
    // to the reference grid.
    pub(crate) vertical_separation: u8,
}

impl ComponentSize {
    /// Original bit depth, (Ssiz & 0x7F) + 1.
    pub fn depth(&self) -> u8 {
        (self.precision & SSIZ_DEPTH_MASK) + 1
    }

    pub fn is_signed(&self) -> bool {
        self.precision >> SSIZ_SIGNED_SHIFT == 1
    }
}

// A.5.1
//
// Image and tile size (SIZ)
//
// Function: Provides information about the uncompressed image such as the
// width and height of the reference grid, the width and height of the tiles,
// the number of components, component bit depth, and the separation of
// component samples with respect to the reference grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageAndTileSizeMarkerSegment {
    pub(crate) offset: u64,

    // Lsiz: Length of marker segment in bytes (not including the marker).
    pub(crate) length: u16,

    // Rsiz: Denotes capabilities that a decoder needs to properly decode the
    // codestream.
    pub(crate) decoder_capabilities: u16,

    // Xsiz: Width of the reference grid.
    pub(crate) reference_grid_width: u32,

    // Ysiz: Height of the reference grid.
    pub(crate) reference_grid_height: u32,

    // XOsiz: Horizontal offset from the origin of the reference grid to the
    // left side of the image area.
    pub(crate) image_horizontal_offset: u32,

    // YOsiz: Vertical offset from the origin of the reference grid to the top
    // side of the image area.
    pub(crate) image_vertical_offset: u32,

    // XTsiz: Width of one reference tile with respect to the reference grid.
    pub(crate) reference_tile_width: u32,

    // YTsiz: Height of one reference tile with respect to the reference grid.
    pub(crate) reference_tile_height: u32,

    // XTOsiz: Horizontal offset from the origin of the reference grid to the
    // left side of the first tile.
    pub(crate) tile_horizontal_offset: u32,

    // YTOsiz: Vertical offset from the origin of the reference grid to the top
    // side of the first tile.
    pub(crate) tile_vertical_offset: u32,

    // Ssiz, XRsiz, YRsiz for each of the Csiz components
    pub(crate) components: Vec<ComponentSize>,
}

impl ImageAndTileSizeMarkerSegment {
    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn decoder_capabilities(&self) -> u16 {
        self.decoder_capabilities
    }

    pub fn reference_grid_width(&self) -> u32 {
        self.reference_grid_width
    }
    pub fn reference_grid_height(&self) -> u32 {
        self.reference_grid_height
    }

    pub fn image_horizontal_offset(&self) -> u32 {
        self.image_horizontal_offset
    }
    pub fn image_vertical_offset(&self) -> u32 {
        self.image_vertical_offset
    }

    pub fn reference_tile_width(&self) -> u32 {
        self.reference_tile_width
    }
    pub fn reference_tile_height(&self) -> u32 {
        self.reference_tile_height
    }

    pub fn tile_horizontal_offset(&self) -> u32 {
        self.tile_horizontal_offset
    }
    pub fn tile_vertical_offset(&self) -> u32 {
        self.tile_vertical_offset
    }

    pub fn no_components(&self) -> u16 {
        self.components.len() as u16
    }

    pub fn components(&self) -> &[ComponentSize] {
        &self.components
    }

    /// Bit depth of component `i`, including the sign bit.
    pub fn precision(&self, i: usize) -> Option<u8> {
        self.components.get(i).map(ComponentSize::depth)
    }

    pub fn values_are_signed(&self, i: usize) -> Option<bool> {
        self.components.get(i).map(ComponentSize::is_signed)
    }

    pub fn horizontal_separation(&self, i: usize) -> Option<u8> {
        self.components.get(i).map(|c| c.horizontal_separation)
    }

    pub fn vertical_separation(&self, i: usize) -> Option<u8> {
        self.components.get(i).map(|c| c.vertical_separation)
    }

    /// Width of the image area, Xsiz - XOsiz.
    pub fn image_width(&self) -> u32 {
        self.reference_grid_width - self.image_horizontal_offset
    }

    /// Height of the image area, Ysiz - YOsiz.
    pub fn image_height(&self) -> u32 {
        self.reference_grid_height - self.image_vertical_offset
    }

    // B.3 - Number of tiles horizontally and vertically
    //
    // numXtiles = ⌈(Xsiz − XTOsiz) / XTsiz⌉
    // numYtiles = ⌈(Ysiz − YTOsiz) / YTsiz⌉
    pub fn num_x_tiles(&self) -> u32 {
        (self.reference_grid_width - self.tile_horizontal_offset)
            .div_ceil(self.reference_tile_width)
    }
    pub fn num_y_tiles(&self) -> u32 {
        (self.reference_grid_height - self.tile_vertical_offset)
            .div_ceil(self.reference_tile_height)
    }

    pub fn num_tiles(&self) -> usize {
        self.num_x_tiles() as usize * self.num_y_tiles() as usize
    }

    // B.2 - Component width, ⌈Xsiz / XRsiz⌉ − ⌈XOsiz / XRsiz⌉
    pub fn component_width(&self, i: usize) -> Option<u32> {
        let separation = self.horizontal_separation(i)? as u32;
        Some(
            self.reference_grid_width.div_ceil(separation)
                - self.image_horizontal_offset.div_ceil(separation),
        )
    }

    // B.2 - Component height, ⌈Ysiz / YRsiz⌉ − ⌈YOsiz / YRsiz⌉
    pub fn component_height(&self, i: usize) -> Option<u32> {
        let separation = self.vertical_separation(i)? as u32;
        Some(
            self.reference_grid_height.div_ceil(separation)
                - self.image_vertical_offset.div_ceil(separation),
        )
    }
}

impl fmt::Display for ImageAndTileSizeMarkerSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "  Capabilities: {}", self.decoder_capabilities)?;
        writeln!(
            f,
            "  Reference grid: {}x{}, image offset ({}, {})",
            self.reference_grid_width,
            self.reference_grid_height,
            self.image_horizontal_offset,
            self.image_vertical_offset
        )?;
        writeln!(
            f,
            "  Tiles: {}x{}, tile offset ({}, {}), {} tiles",
            self.reference_tile_width,
            self.reference_tile_height,
            self.tile_horizontal_offset,
            self.tile_vertical_offset,
            self.num_tiles()
        )?;
        writeln!(f, "  Components: {}", self.components.len())?;
        for (i, component) in self.components.iter().enumerate() {
            writeln!(
                f,
                "  Component {}: {} bit {}, separation {}x{}",
                i,
                component.depth(),
                if component.is_signed() { "signed" } else { "unsigned" },
                component.horizontal_separation,
                component.vertical_separation
            )?;
        }
        Ok(())
    }
}

// A.4.2
//
// Start of tile-part (SOT)
//
// Function: Marks the beginning of a tile-part, the index of its tile, and the
// index of its tile-part. The tile-parts of a given tile shall appear in order
// (see TPsot) in the codestream. However, tile-parts from other tiles may be
// interleaved in the codestream. Therefore, the tile-parts from a given tile
// may not appear contiguously in the codestream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StartOfTileSegment {
    // Offset of the SOT marker itself, Psot is measured from here.
    pub(crate) offset: u64,

    // Lsot: Length of marker segment in bytes (not including the marker).
    pub(crate) length: u16,

    // Isot: Tile index.
    pub(crate) tile_index: u16,

    // Psot: Length, in bytes, from the beginning of the first byte of this SOT
    // marker segment of the tile-part to the end of the data of that
    // tile-part. Zero means the tile-part extends to the EOC marker.
    pub(crate) tile_part_length: u32,

    // TPsot: Tile-part index.
    pub(crate) tile_part_index: u8,

    // TNsot: Number of tile-parts of a tile in the codestream, zero if
    // not given.
    pub(crate) no_tile_parts: u8,
}

impl StartOfTileSegment {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn tile_index(&self) -> u16 {
        self.tile_index
    }

    pub fn tile_part_length(&self) -> u32 {
        self.tile_part_length
    }

    pub fn tile_part_index(&self) -> u8 {
        self.tile_part_index
    }

    pub fn no_tile_parts(&self) -> u8 {
        self.no_tile_parts
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TilePartLength {
    // Ttlm: Tile index, absent when tiles are in order with one tile-part each.
    pub tile_index: Option<u16>,

    // Ptlm: Length of the tile-part, same as its Psot.
    pub tile_part_length: u32,
}

// A.7.1
//
// Tile-part lengths (TLM)
//
// Function: Describes the length of every tile-part in the codestream. Each
// tile-part's length is measured from the first byte of the SOT marker segment
// to the end of the bit-stream data of that tile-part. The value of each
// individual tile-part length in the TLM marker segment is the same as the
// value in the corresponding Psot in the SOT marker segment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TilePartLengthsSegment {
    pub(crate) offset: u64,
    pub(crate) length: u16,

    // Ztlm: Index of this marker segment relative to all other TLM marker
    // segments present in the current header.
    pub(crate) index: u8,

    pub(crate) tile_part_lengths: Vec<TilePartLength>,
}

impl TilePartLengthsSegment {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn tile_part_lengths(&self) -> &[TilePartLength] {
        &self.tile_part_lengths
    }
}

// A.7.2
//
// Packet length, main header (PLM)
//
// Function: A list of packet lengths in the tile-parts for every tile-part in
// order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PacketLengthSegment {
    pub(crate) offset: u64,
    pub(crate) length: u16,

    // Zplm: Index of this marker segment relative to all other PLM marker
    // segments present in the main header.
    pub(crate) index: u8,

    // Iplm packet lengths, grouped by the tile-part they describe (Nplm).
    pub(crate) tile_parts: Vec<Vec<u32>>,
}

impl PacketLengthSegment {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn tile_parts(&self) -> &[Vec<u32>] {
        &self.tile_parts
    }
}

// A.7.3
//
// Packet length, tile-part header (PLT)
//
// Function: A list of packet lengths in the tile-part
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TilePacketLength {
    pub(crate) offset: u64,
    pub(crate) length: u16,

    // Zplt
    pub(crate) index: u8,

    // Iplt
    pub(crate) packet_lengths: Vec<u32>,
}

impl TilePacketLength {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn packet_lengths(&self) -> &[u32] {
        &self.packet_lengths
    }
}

// A.7.4
//
// Packed packet headers, main header (PPM)
//
// Function: A collection of the packet headers from all tiles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedPacketHeaderSegment {
    pub(crate) offset: u64,
    pub(crate) length: u16,

    // Zppm
    pub(crate) index: u8,

    // Nppm and Ippm, kept packed. A segment may continue the Ippm series of
    // the previous one so they are only split once all are collected.
    pub(crate) data: Vec<u8>,
}

impl PackedPacketHeaderSegment {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

// A.7.5
//
// Packed packet headers, tile-part header (PPT)
//
// Function: A collection of the packet headers from one tile or tile-part.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TilePackedPacketHeaderSegment {
    pub(crate) offset: u64,
    pub(crate) length: u16,

    // Zppt
    pub(crate) index: u8,

    // Ippt
    pub(crate) data: Vec<u8>,
}

impl TilePackedPacketHeaderSegment {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

// A.9.1
//
// Component registration (CRG)
//
// Function: Allows specific registration of components with respect to each
// other. For coding purposes the samples of components are considered to be
// located at reference grid points that are integer multiples of XRsiz and
// YRsiz.
//
// This marker segment has no effect on decoding the codestream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComponentRegistrationSegment {
    pub(crate) offset: u64,
    pub(crate) length: u16,

    // Xcrg: Horizontal offset in units of 1/65536 of XRsiz.
    pub(crate) horizontal_offset: Vec<u16>,

    // Ycrg: Vertical offset in units of 1/65536 of YRsiz.
    pub(crate) vertical_offset: Vec<u16>,
}

impl ComponentRegistrationSegment {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn horizontal_offset(&self, i: usize) -> Option<u16> {
        self.horizontal_offset.get(i).copied()
    }

    pub fn vertical_offset(&self, i: usize) -> Option<u16> {
        self.vertical_offset.get(i).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommentRegistrationValue {
    // General use (binary values)
    Binary,

    // General use (ISO 8859-15:1999 (Latin) values)
    Latin,

    // All other values reserved
    Reserved { value: u16 },
}

impl CommentRegistrationValue {
    pub fn new(value: u16) -> CommentRegistrationValue {
        match value {
            // See ISO/IEC 15444-1:2019 Table A.44
            0 => CommentRegistrationValue::Binary,
            1 => CommentRegistrationValue::Latin,
            _ => CommentRegistrationValue::Reserved { value },
        }
    }
}

// A.9.2
//
// Comment (COM)
//
// Allows unstructured data in the main and tile-part header.
#[derive(Clone, Debug, PartialEq)]
pub struct CommentMarkerSegment {
    pub(crate) offset: u64,
    pub(crate) length: u16,

    // Rcom: Registration value of the marker segment
    pub(crate) registration_value: CommentRegistrationValue,

    // Ccomi: Byte of unstructured data
    pub(crate) comment: Vec<u8>,
}

impl CommentMarkerSegment {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn registration_value(&self) -> CommentRegistrationValue {
        self.registration_value
    }

    pub fn comment(&self) -> &[u8] {
        &self.comment
    }

    /// The comment read as Latin-1 text.
    pub fn comment_latin(&self) -> String {
        self.comment.iter().map(|&b| b as char).collect()
    }
}

impl fmt::Display for CommentMarkerSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.registration_value {
            CommentRegistrationValue::Latin => writeln!(f, "  Text: {}", self.comment_latin()),
            _ => writeln!(
                f,
                "  {:?} data: {} bytes",
                self.registration_value,
                self.comment.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::marker::MARKER_SYMBOL_COD;

    fn siz(width: u32, height: u32, tile_width: u32, tile_height: u32) -> ImageAndTileSizeMarkerSegment {
        ImageAndTileSizeMarkerSegment {
            reference_grid_width: width,
            reference_grid_height: height,
            reference_tile_width: tile_width,
            reference_tile_height: tile_height,
            components: vec![ComponentSize {
                precision: 0x87,
                horizontal_separation: 1,
                vertical_separation: 1,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_number_of_tiles() {
        assert_eq!(siz(100, 100, 50, 50).num_tiles(), 4);
        assert_eq!(siz(101, 100, 50, 50).num_tiles(), 6);
        assert_eq!(siz(100, 100, 100, 100).num_tiles(), 1);

        let mut offset = siz(100, 100, 50, 50);
        offset.image_horizontal_offset = 10;
        offset.tile_horizontal_offset = 10;
        // ⌈90 / 50⌉ x ⌈100 / 50⌉
        assert_eq!(offset.num_x_tiles(), 2);
        assert_eq!(offset.num_tiles(), 4);
    }

    #[test]
    fn test_bit_depth_and_sign() {
        let siz = siz(8, 8, 8, 8);
        assert_eq!(siz.precision(0), Some(8));
        assert_eq!(siz.values_are_signed(0), Some(true));
        assert_eq!(siz.precision(1), None);

        let unsigned = ComponentSize {
            precision: 0x0B,
            horizontal_separation: 1,
            vertical_separation: 1,
        };
        assert_eq!(unsigned.depth(), 12);
        assert!(!unsigned.is_signed());
    }

    #[test]
    fn test_component_dimensions() {
        let mut siz = siz(101, 51, 101, 51);
        siz.image_horizontal_offset = 1;
        siz.components.push(ComponentSize {
            precision: 7,
            horizontal_separation: 2,
            vertical_separation: 2,
        });
        assert_eq!(siz.component_width(0), Some(100));
        assert_eq!(siz.component_height(0), Some(51));
        // ⌈101 / 2⌉ - ⌈1 / 2⌉ and ⌈51 / 2⌉ - 0
        assert_eq!(siz.component_width(1), Some(50));
        assert_eq!(siz.component_height(1), Some(26));
        assert_eq!(siz.component_width(2), None);
    }

    #[test]
    fn test_code_block_exponents() {
        assert_eq!(code_block_dimension(4), Some(64));
        assert_eq!(code_block_dimension(0), Some(4));

        let size = CodeBlockSize::from_exponents(MARKER_SYMBOL_COD, 4, 4).unwrap();
        assert_eq!(size, CodeBlockSize { width: 64, height: 64 });

        let size = CodeBlockSize::from_exponents(MARKER_SYMBOL_COD, 0, 0).unwrap();
        assert_eq!(size, CodeBlockSize { width: 4, height: 4 });

        // 2^11 = 2048 exceeds the maximum dimension
        let error = CodeBlockSize::from_exponents(MARKER_SYMBOL_COD, 9, 0).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::OutOfRange);

        // Shift larger than the integer width
        let error = CodeBlockSize::from_exponents(MARKER_SYMBOL_COD, 0, 200).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::OutOfRange);

        // 128 x 64 exceeds the maximum area
        let error = CodeBlockSize::from_exponents(MARKER_SYMBOL_COD, 5, 4).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn test_precinct_size_nibbles() {
        let size = PrecinctSize::new(0x76);
        assert_eq!(size.width_exponent(), 6);
        assert_eq!(size.height_exponent(), 7);
        assert_eq!(size.width(), 64);
        assert_eq!(size.height(), 128);

        let default = PrecinctSize::default();
        assert_eq!(default.width(), 1 << 15);
        assert_eq!(default.height(), 1 << 15);
    }

    #[test]
    fn test_step_sizes_shape() {
        let values: Vec<QuantizationStepSize> = (0..8)
            .map(|e| QuantizationStepSize {
                exponent: e,
                mantissa: 0,
            })
            .collect();
        let (step_sizes, leftover) = QuantizationStepSizes::from_values(values);
        assert_eq!(step_sizes.no_resolution_levels(), 3);
        assert_eq!(leftover, 1);
        assert_eq!(step_sizes.levels()[0].len(), 1);
        assert_eq!(step_sizes.levels()[1].len(), 3);
        assert_eq!(step_sizes.get(2, 2).map(|s| s.exponent), Some(6));
        assert_eq!(step_sizes.get(3, 0), None);
    }

    #[test]
    fn test_derived_step_sizes() {
        let (step_sizes, _) = QuantizationStepSizes::from_values(vec![QuantizationStepSize {
            exponent: 10,
            mantissa: 100,
        }]);
        let parameters = QuantizationParameters {
            quantization_type: QuantizationType::ScalarDerived,
            guard_bits: 2,
            step_sizes,
        };
        assert_eq!(parameters.step_size(0, 0).map(|s| s.exponent), Some(10));
        assert_eq!(parameters.step_size(1, 2).map(|s| s.exponent), Some(10));
        assert_eq!(parameters.step_size(3, 1).map(|s| s.exponent), Some(8));
        assert_eq!(parameters.step_size(3, 1).map(|s| s.mantissa), Some(100));
        assert_eq!(parameters.step_size(0, 1), None);
    }

    #[test]
    fn test_normalized_step_size() {
        let step = QuantizationStepSize {
            exponent: 1,
            mantissa: 1024,
        };
        assert!((step.normalized() - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_comment_latin() {
        let comment = CommentMarkerSegment {
            offset: 0,
            length: 8,
            registration_value: CommentRegistrationValue::new(1),
            comment: vec![b'K', b'a', b'k', 0xE9],
        };
        assert_eq!(comment.registration_value(), CommentRegistrationValue::Latin);
        assert_eq!(comment.comment_latin(), "Kaké");
    }
}
