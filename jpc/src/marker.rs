use bitflags::bitflags;
use std::fmt;

/// A two byte marker code, read big-endian from the codestream.
///
/// Every marker begins with 0xFF followed by a byte that identifies it. See
/// ITU-T T.800 or ISO/IEC 15444-1:2019 Section A.1 for the marker catalogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerSymbol(pub u16);

// Delimiting markers and marker segments
pub const MARKER_SYMBOL_SOC: MarkerSymbol = MarkerSymbol(0xFF4F); // Start of codestream
pub const MARKER_SYMBOL_SOT: MarkerSymbol = MarkerSymbol(0xFF90); // Start of tile-part
pub const MARKER_SYMBOL_SOD: MarkerSymbol = MarkerSymbol(0xFF93); // Start of data
pub const MARKER_SYMBOL_EOC: MarkerSymbol = MarkerSymbol(0xFFD9); // End of codestream

// Fixed information marker segments
pub const MARKER_SYMBOL_SIZ: MarkerSymbol = MarkerSymbol(0xFF51); // Image and tile size

// Functional marker segments
pub const MARKER_SYMBOL_COD: MarkerSymbol = MarkerSymbol(0xFF52); // Coding style default
pub const MARKER_SYMBOL_COC: MarkerSymbol = MarkerSymbol(0xFF53); // Coding style component
pub const MARKER_SYMBOL_RGN: MarkerSymbol = MarkerSymbol(0xFF5E); // Region-of-interest
pub const MARKER_SYMBOL_QCD: MarkerSymbol = MarkerSymbol(0xFF5C); // Quantization default
pub const MARKER_SYMBOL_QCC: MarkerSymbol = MarkerSymbol(0xFF5D); // Quantization component
pub const MARKER_SYMBOL_POC: MarkerSymbol = MarkerSymbol(0xFF5F); // Progression order change

// Pointer marker segments
pub const MARKER_SYMBOL_TLM: MarkerSymbol = MarkerSymbol(0xFF55); // Tile-part lengths
pub const MARKER_SYMBOL_PLM: MarkerSymbol = MarkerSymbol(0xFF57); // Packet length, main header
pub const MARKER_SYMBOL_PLT: MarkerSymbol = MarkerSymbol(0xFF58); // Packet length, tile-part header
pub const MARKER_SYMBOL_PPM: MarkerSymbol = MarkerSymbol(0xFF60); // Packed packet headers, main header
pub const MARKER_SYMBOL_PPT: MarkerSymbol = MarkerSymbol(0xFF61); // Packed packet headers, tile-part header

// In bit stream markers and marker segments
pub const MARKER_SYMBOL_SOP: MarkerSymbol = MarkerSymbol(0xFF91); // Start of packet
pub const MARKER_SYMBOL_EPH: MarkerSymbol = MarkerSymbol(0xFF92); // End of packet header

// Informational marker segments
pub const MARKER_SYMBOL_CRG: MarkerSymbol = MarkerSymbol(0xFF63); // Component registration
pub const MARKER_SYMBOL_COM: MarkerSymbol = MarkerSymbol(0xFF64); // Comment

// Markers 0xFF30 to 0xFF3F are reserved and carry no length field.
const DELIMITER_RANGE_START: u16 = 0xFF30;
const DELIMITER_RANGE_END: u16 = 0xFF3F;

impl MarkerSymbol {
    pub fn from_be_bytes(bytes: [u8; 2]) -> MarkerSymbol {
        MarkerSymbol(u16::from_be_bytes(bytes))
    }

    pub fn value(self) -> u16 {
        self.0
    }

    /// Three letter mnemonic of a known marker.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            MARKER_SYMBOL_SOC => "SOC",
            MARKER_SYMBOL_SOT => "SOT",
            MARKER_SYMBOL_SOD => "SOD",
            MARKER_SYMBOL_EOC => "EOC",
            MARKER_SYMBOL_SIZ => "SIZ",
            MARKER_SYMBOL_COD => "COD",
            MARKER_SYMBOL_COC => "COC",
            MARKER_SYMBOL_RGN => "RGN",
            MARKER_SYMBOL_QCD => "QCD",
            MARKER_SYMBOL_QCC => "QCC",
            MARKER_SYMBOL_POC => "POC",
            MARKER_SYMBOL_TLM => "TLM",
            MARKER_SYMBOL_PLM => "PLM",
            MARKER_SYMBOL_PLT => "PLT",
            MARKER_SYMBOL_PPM => "PPM",
            MARKER_SYMBOL_PPT => "PPT",
            MARKER_SYMBOL_SOP => "SOP",
            MARKER_SYMBOL_EPH => "EPH",
            MARKER_SYMBOL_CRG => "CRG",
            MARKER_SYMBOL_COM => "COM",
            _ => return None,
        };
        Some(name)
    }

    /// All marker codes start with 0xFF.
    pub fn is_marker(self) -> bool {
        self.0 >> 8 == 0xFF
    }

    /// Reserved delimiting markers without a length field.
    pub fn is_delimiter_range(self) -> bool {
        (DELIMITER_RANGE_START..=DELIMITER_RANGE_END).contains(&self.0)
    }
}

impl fmt::Display for MarkerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:04X})", name, self.0),
            None => write!(f, "0x{:04X}", self.0),
        }
    }
}

// A.13 – Coding style parameter values for the Scod parameter
bitflags! {
    /// Scod / Scoc flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CodingStyle: u8 {
        // xxxx xxx1 Entropy coder with precincts defined below
        const PRECINCT_PARTITION = 0b0000_0001;
        // xxxx xx1x SOP marker segments may be used
        const SOP_MARKERS = 0b0000_0010;
        // xxxx x1xx EPH marker may be used
        const EPH_MARKERS = 0b0000_0100;
        // xxxx 1xxx Horizontal code-block partition origin is 1
        const HORIZONTAL_CODE_BLOCK_PARTITION = 0b0000_1000;
        // xxx1 xxxx Vertical code-block partition origin is 1
        const VERTICAL_CODE_BLOCK_PARTITION = 0b0001_0000;
    }
}

// A.19 – Code-block style for the SPcod and SPcoc parameters
bitflags! {
    /// Code-block coding pass options.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CodeBlockStyle: u8 {
        // xxxx xxx1 Selective arithmetic coding bypass
        const SELECTIVE_ARITHMETIC_CODING_BYPASS = 0b0000_0001;
        // xxxx xx1x Reset context probabilities on coding pass boundaries
        const RESET_CONTEXT_PROBABILITIES = 0b0000_0010;
        // xxxx x1xx Termination on each coding pass
        const TERMINATION_ON_EACH_CODING_PASS = 0b0000_0100;
        // xxxx 1xxx Vertically causal context
        const VERTICALLY_CAUSAL_CONTEXT = 0b0000_1000;
        // xxx1 xxxx Predictable termination
        const PREDICTABLE_TERMINATION = 0b0001_0000;
        // xx1x xxxx Segmentation symbols are used
        const SEGMENTATION_SYMBOLS = 0b0010_0000;
    }
}

// Code-block dimensions, A.6.1
pub const MIN_CODE_BLOCK_DIMENSION: u32 = 4;
pub const MAX_CODE_BLOCK_DIMENSION: u32 = 1024;
pub const MAX_CODE_BLOCK_AREA: u32 = 4096;

pub const MAX_DECOMPOSITION_LEVELS: u8 = 32;
pub const MAX_COMPONENTS: u16 = 16384;
pub const MAX_TILES: usize = 65535;

// Rsiz values above this are not Part 1 profiles.
pub const MAX_CAPABILITIES: u16 = 2;

// Ssiz: low 7 bits are depth minus one, high bit is the sign.
pub const SSIZ_DEPTH_MASK: u8 = 0x7F;
pub const SSIZ_SIGNED_SHIFT: u8 = 7;
pub const MAX_COMPONENT_DEPTH: u8 = 38;

// Sqcd / Sqcc
pub const SQCX_GUARD_BITS_SHIFT: u8 = 5;
pub const SQCX_GUARD_BITS_MASK: u8 = 0b0000_0111;
pub const SQCX_NO_QUANTIZATION: u8 = 0;
pub const SQCX_SCALAR_DERIVED: u8 = 1;
pub const SQCX_SCALAR_EXPOUNDED: u8 = 2;
pub const SQCX_REVERSIBLE_EXPONENT_SHIFT: u8 = 3;
pub const SQCX_EXPONENT_SHIFT: u16 = 11;
pub const SQCX_EXPONENT_MASK: u16 = 0b0001_1111;
pub const SQCX_MANTISSA_MASK: u16 = 0x07FF;

// Srgn
pub const SRGN_IMPLICIT: u8 = 0;

// Rcom
pub const RCOM_BINARY: u16 = 0;
pub const RCOM_LATIN: u16 = 1;

// Transformation (SPcod / SPcoc)
pub const FILTER_IRREVERSIBLE_9X7: u8 = 0;
pub const FILTER_REVERSIBLE_5X3: u8 = 1;
pub const FILTER_CUSTOM_FLAG: u8 = 0b1000_0000;

// Precinct size default when Scod bit 0 is clear: PPx = PPy = 15.
pub const PRECINCT_PARTITION_DEFAULT_SIZE: u8 = 0xFF;

// Lsot is fixed.
pub const SOT_SEGMENT_LENGTH: u16 = 10;
