use std::io;
use thiserror::Error;

use crate::marker::MarkerSymbol;

/// Broad failure categories callers can branch on without matching every
/// variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The codestream violates the marker/box structure.
    MalformedStructure,
    /// The data ended before a read could be satisfied.
    TruncatedInput,
    /// A parameter lies outside the bounds of the standard.
    OutOfRange,
    /// Standard-legal but not supported by this decoder.
    Unsupported,
    /// Any other I/O failure from the underlying reader.
    Io,
}

#[derive(Debug, Error)]
pub enum CodestreamError {
    #[error("missing marker {marker}")]
    MarkerMissing { marker: MarkerSymbol },

    #[error("unexpected marker {marker} at byte offset {offset}")]
    MarkerUnexpected { marker: MarkerSymbol, offset: u64 },

    #[error("more than one marker {marker} at byte offset {offset}")]
    MarkerDuplicate { marker: MarkerSymbol, offset: u64 },

    #[error("invalid marker code 0x{value:04X} at byte offset {offset}")]
    MarkerInvalid { value: u16, offset: u64 },

    #[error("marker {marker} error {error}")]
    MarkerError { marker: MarkerSymbol, error: String },

    #[error("marker {marker} has invalid segment length {length} at byte offset {offset}")]
    SegmentLength {
        marker: MarkerSymbol,
        length: u16,
        offset: u64,
    },

    #[error("marker {marker} segment of length {length} ends before its content")]
    SegmentTooShort { marker: MarkerSymbol, length: u16 },

    #[error("marker {marker} {parameter} value {value} out of range")]
    ValueOutOfRange {
        marker: MarkerSymbol,
        parameter: &'static str,
        value: u64,
    },

    #[error("{what} index {index} out of range, only {count} available")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        count: usize,
    },

    // XTOsiz ≤ XOsiz, YTOsiz ≤ YOsiz
    #[error(
        "tile grid offset overflow: XOsiz = {image_horizontal_offset}, YOsiz = {image_vertical_offset}, XTOsiz = {tile_horizontal_offset}, YTOsiz = {tile_vertical_offset}"
    )]
    TileGridOffsetOverflow {
        tile_horizontal_offset: u32,
        tile_vertical_offset: u32,
        image_horizontal_offset: u32,
        image_vertical_offset: u32,
    },

    // XTsiz + XTOsiz > XOsiz
    // YTsiz + YTOsiz > YOsiz
    #[error(
        "tile size overflow: XOsiz = {image_horizontal_offset}, YOsiz = {image_vertical_offset}, XTOsiz = {tile_horizontal_offset}, YTOsiz = {tile_vertical_offset}, XTsiz = {reference_tile_width}, YTsiz = {reference_tile_height}"
    )]
    TileSizeOverflow {
        image_horizontal_offset: u32,
        image_vertical_offset: u32,
        tile_horizontal_offset: u32,
        tile_vertical_offset: u32,
        reference_tile_width: u32,
        reference_tile_height: u32,
    },

    #[error("marker {marker} uses unsupported {feature}")]
    Unsupported {
        marker: MarkerSymbol,
        feature: String,
    },

    #[error("end of data at byte offset {offset}, {requested} bytes requested")]
    EndOfData { offset: u64, requested: usize },

    #[error("seek to byte offset {offset} beyond end of data at {length}")]
    SeekOutOfRange { offset: u64, length: u64 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CodestreamError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MarkerMissing { .. }
            | Self::MarkerUnexpected { .. }
            | Self::MarkerDuplicate { .. }
            | Self::MarkerInvalid { .. }
            | Self::MarkerError { .. }
            | Self::SegmentLength { .. }
            | Self::SegmentTooShort { .. } => ErrorKind::MalformedStructure,
            Self::ValueOutOfRange { .. }
            | Self::IndexOutOfRange { .. }
            | Self::TileGridOffsetOverflow { .. }
            | Self::TileSizeOverflow { .. } => ErrorKind::OutOfRange,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::EndOfData { .. } | Self::SeekOutOfRange { .. } => ErrorKind::TruncatedInput,
            Self::Io(e) => match e.kind() {
                io::ErrorKind::UnexpectedEof => ErrorKind::TruncatedInput,
                _ => ErrorKind::Io,
            },
        }
    }

    pub(crate) fn marker_error(marker: MarkerSymbol, error: impl Into<String>) -> Self {
        Self::MarkerError {
            marker,
            error: error.into(),
        }
    }

    pub(crate) fn out_of_range(
        marker: MarkerSymbol,
        parameter: &'static str,
        value: impl Into<u64>,
    ) -> Self {
        Self::ValueOutOfRange {
            marker,
            parameter,
            value: value.into(),
        }
    }
}
