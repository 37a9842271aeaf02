use crate::marker::CodeBlockStyle;
use crate::segment::{
    CodeBlockSize, MultipleComponentTransformation, PrecinctSize, ProgressionOrder,
    ProgressionOrderChange, QuantizationStepSize, QuantizationStepSizes, QuantizationType,
    TransformationFilter,
};
use crate::spec::Spec;

/// Coding parameters of every tile and component, as the later decoding
/// stages need them.
///
/// Each parameter is its own table so a COC or QCC only overrides what it
/// signals.
#[derive(Clone, Debug, PartialEq)]
pub struct DecoderSpecs {
    // Tile-component parameters
    pub quantization_types: Spec<QuantizationType>,
    pub step_sizes: Spec<QuantizationStepSizes>,
    pub guard_bits: Spec<u8>,
    pub filters: Spec<TransformationFilter>,
    pub decomposition_levels: Spec<u8>,
    pub code_block_styles: Spec<CodeBlockStyle>,
    pub code_block_sizes: Spec<CodeBlockSize>,
    pub precinct_sizes: Spec<Vec<PrecinctSize>>,
    pub region_of_interest_shifts: Spec<u8>,

    // Tile parameters
    pub layers: Spec<u16>,
    pub progression_orders: Spec<ProgressionOrder>,
    pub progression_changes: Spec<Vec<ProgressionOrderChange>>,
    pub component_transformations: Spec<MultipleComponentTransformation>,
    pub sop_markers: Spec<bool>,
    pub eph_markers: Spec<bool>,
    pub packed_packet_headers: Spec<bool>,
}

impl DecoderSpecs {
    pub fn new(num_tiles: usize, num_components: usize) -> DecoderSpecs {
        let mut packed_packet_headers = Spec::new(num_tiles, num_components);
        packed_packet_headers.set_default(false);

        DecoderSpecs {
            quantization_types: Spec::new(num_tiles, num_components),
            step_sizes: Spec::new(num_tiles, num_components),
            guard_bits: Spec::new(num_tiles, num_components),
            filters: Spec::new(num_tiles, num_components),
            decomposition_levels: Spec::new(num_tiles, num_components),
            code_block_styles: Spec::new(num_tiles, num_components),
            code_block_sizes: Spec::new(num_tiles, num_components),
            precinct_sizes: Spec::new(num_tiles, num_components),
            region_of_interest_shifts: Spec::new(num_tiles, num_components),
            layers: Spec::new(num_tiles, num_components),
            progression_orders: Spec::new(num_tiles, num_components),
            progression_changes: Spec::new(num_tiles, num_components),
            component_transformations: Spec::new(num_tiles, num_components),
            sop_markers: Spec::new(num_tiles, num_components),
            eph_markers: Spec::new(num_tiles, num_components),
            packed_packet_headers,
        }
    }

    pub fn num_tiles(&self) -> usize {
        self.filters.num_tiles()
    }

    pub fn num_components(&self) -> usize {
        self.filters.num_components()
    }

    /// Widest code-block set anywhere in the codestream.
    pub fn max_code_block_width(&self) -> u32 {
        self.code_block_sizes
            .values()
            .map(|size| size.width)
            .max()
            .unwrap_or(0)
    }

    /// Tallest code-block set anywhere in the codestream.
    pub fn max_code_block_height(&self) -> u32 {
        self.code_block_sizes
            .values()
            .map(|size| size.height)
            .max()
            .unwrap_or(0)
    }

    /// Precinct size of a resolution level. Levels beyond the signalled ones
    /// use the last signalled size.
    pub fn precinct_size(
        &self,
        tile: usize,
        component: usize,
        resolution_level: usize,
    ) -> Option<PrecinctSize> {
        let sizes = self.precinct_sizes.resolve(tile, component)?;
        sizes.get(resolution_level).or(sizes.last()).copied()
    }

    /// Step size of a subband, derived from the LL value for scalar derived
    /// quantization.
    pub fn step_size(
        &self,
        tile: usize,
        component: usize,
        resolution_level: usize,
        subband: usize,
    ) -> Option<QuantizationStepSize> {
        let step_sizes = self.step_sizes.resolve(tile, component)?;
        match self.quantization_types.resolve(tile, component)? {
            QuantizationType::ScalarDerived => step_sizes.derive(resolution_level, subband),
            _ => step_sizes.get(resolution_level, subband),
        }
    }

    pub fn normalized_step_size(
        &self,
        tile: usize,
        component: usize,
        resolution_level: usize,
        subband: usize,
    ) -> Option<f32> {
        self.step_size(tile, component, resolution_level, subband)
            .map(|step| step.normalized())
    }

    /// True when every tile-component has the parameters COD and QCD
    /// provide.
    pub fn is_fully_specified(&self) -> bool {
        self.quantization_types.is_fully_specified()
            && self.step_sizes.is_fully_specified()
            && self.guard_bits.is_fully_specified()
            && self.filters.is_fully_specified()
            && self.decomposition_levels.is_fully_specified()
            && self.code_block_styles.is_fully_specified()
            && self.code_block_sizes.is_fully_specified()
            && self.precinct_sizes.is_fully_specified()
            && self.layers.is_fully_specified()
            && self.progression_orders.is_fully_specified()
            && self.component_transformations.is_fully_specified()
            && self.sop_markers.is_fully_specified()
            && self.eph_markers.is_fully_specified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_code_block_dimensions() {
        let mut specs = DecoderSpecs::new(2, 2);
        assert_eq!(specs.max_code_block_width(), 0);
        specs.code_block_sizes.set_default(CodeBlockSize {
            width: 64,
            height: 32,
        });
        specs
            .code_block_sizes
            .set_tile_component(1, 0, CodeBlockSize { width: 16, height: 128 })
            .unwrap();
        assert_eq!(specs.max_code_block_width(), 64);
        assert_eq!(specs.max_code_block_height(), 128);
    }

    #[test]
    fn test_precinct_size_falls_back_to_last_level() {
        let mut specs = DecoderSpecs::new(1, 1);
        specs
            .precinct_sizes
            .set_default(vec![PrecinctSize::new(0x77), PrecinctSize::new(0x88)]);
        assert_eq!(specs.precinct_size(0, 0, 0).map(|p| p.width()), Some(128));
        assert_eq!(specs.precinct_size(0, 0, 1).map(|p| p.width()), Some(256));
        assert_eq!(specs.precinct_size(0, 0, 5).map(|p| p.width()), Some(256));
    }

    #[test]
    fn test_packed_packet_headers_default_to_false() {
        let mut specs = DecoderSpecs::new(2, 1);
        assert_eq!(specs.packed_packet_headers.resolve(1, 0), Some(&false));
        specs.packed_packet_headers.set_tile_default(1, true).unwrap();
        assert_eq!(specs.packed_packet_headers.resolve(0, 0), Some(&false));
        assert_eq!(specs.packed_packet_headers.resolve(1, 0), Some(&true));
        assert!(!specs.is_fully_specified());
    }

    #[test]
    fn test_expounded_and_derived_step_sizes() {
        let mut specs = DecoderSpecs::new(1, 2);
        let (explicit, _) = QuantizationStepSizes::from_values(vec![
            QuantizationStepSize {
                exponent: 8,
                mantissa: 0,
            },
            QuantizationStepSize {
                exponent: 9,
                mantissa: 0,
            },
            QuantizationStepSize {
                exponent: 9,
                mantissa: 1024,
            },
            QuantizationStepSize {
                exponent: 10,
                mantissa: 0,
            },
        ]);
        specs.quantization_types.set_default(QuantizationType::ScalarExpounded);
        specs.step_sizes.set_default(explicit.clone());
        specs
            .quantization_types
            .set_component_default(1, QuantizationType::ScalarDerived)
            .unwrap();
        specs.step_sizes.set_component_default(1, explicit).unwrap();

        assert_eq!(specs.step_size(0, 0, 1, 1).map(|s| s.mantissa), Some(1024));
        // Derived: ε0 + 1 - r with the LL mantissa.
        assert_eq!(specs.step_size(0, 1, 1, 1).map(|s| s.exponent), Some(8));
        assert_eq!(specs.step_size(0, 1, 1, 1).map(|s| s.mantissa), Some(0));
        let normalized = specs.normalized_step_size(0, 0, 1, 1).unwrap();
        assert!((normalized - 1.5 / 512.0).abs() < f32::EPSILON);
    }
}
