use std::collections::BTreeMap;
use std::fmt;

use crate::decoder_specs::DecoderSpecs;
use crate::segment::{
    CodingStyleComponentSegment, CodingStyleMarkerSegment, CommentMarkerSegment,
    ComponentRegistrationSegment, ImageAndTileSizeMarkerSegment, PackedPacketHeaderSegment,
    PacketLengthSegment, ProgressionOrderChange, ProgressionOrderChangeSegment,
    QuantizationComponentSegment, QuantizationDefaultMarkerSegment, RegionOfInterestSegment,
    StartOfTileSegment, TilePackedPacketHeaderSegment, TilePacketLength, TilePartLengthsSegment,
};

/// Header a marker segment was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderScope {
    Main,
    Tile(usize),
}

impl fmt::Display for HeaderScope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HeaderScope::Main => write!(f, "main"),
            HeaderScope::Tile(tile) => write!(f, "t{}", tile),
        }
    }
}

/// Every decoded marker segment of the main and tile-part headers.
///
/// Segments that apply to a component are keyed by scope and component,
/// so a later COC, QCC or RGN for the same component replaces the earlier
/// one. Comments are kept in the order they appear.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderInfo {
    // SIZ (Required)
    siz: ImageAndTileSizeMarkerSegment,

    // COD (Required in the main header)
    cod: BTreeMap<HeaderScope, CodingStyleMarkerSegment>,

    // COC (Optional)
    coc: BTreeMap<(HeaderScope, u16), CodingStyleComponentSegment>,

    // QCD (Required in the main header)
    qcd: BTreeMap<HeaderScope, QuantizationDefaultMarkerSegment>,

    // QCC (Optional)
    qcc: BTreeMap<(HeaderScope, u16), QuantizationComponentSegment>,

    // RGN (Optional)
    rgn: BTreeMap<(HeaderScope, u16), RegionOfInterestSegment>,

    // POC (Optional)
    poc: BTreeMap<HeaderScope, ProgressionOrderChangeSegment>,

    // CRG (Optional, main header only)
    crg: Option<ComponentRegistrationSegment>,

    // COM (Optional, repeatable)
    com: BTreeMap<(HeaderScope, usize), CommentMarkerSegment>,

    // TLM, PLM, PPM (Optional, main header only)
    tlm: Vec<TilePartLengthsSegment>,
    plm: Vec<PacketLengthSegment>,
    ppm: Vec<PackedPacketHeaderSegment>,

    // PPT, PLT (Optional, tile-part headers only) by tile index
    ppt: BTreeMap<usize, Vec<TilePackedPacketHeaderSegment>>,
    plt: BTreeMap<usize, Vec<TilePacketLength>>,

    // SOT of every tile-part, in codestream order
    tile_parts: Vec<StartOfTileSegment>,
}

impl HeaderInfo {
    pub fn new(siz: ImageAndTileSizeMarkerSegment) -> HeaderInfo {
        HeaderInfo {
            siz,
            cod: BTreeMap::new(),
            coc: BTreeMap::new(),
            qcd: BTreeMap::new(),
            qcc: BTreeMap::new(),
            rgn: BTreeMap::new(),
            poc: BTreeMap::new(),
            crg: None,
            com: BTreeMap::new(),
            tlm: Vec::new(),
            plm: Vec::new(),
            ppm: Vec::new(),
            ppt: BTreeMap::new(),
            plt: BTreeMap::new(),
            tile_parts: Vec::new(),
        }
    }

    pub fn siz(&self) -> &ImageAndTileSizeMarkerSegment {
        &self.siz
    }

    pub fn cod(&self, scope: HeaderScope) -> Option<&CodingStyleMarkerSegment> {
        self.cod.get(&scope)
    }

    pub fn coc(&self, scope: HeaderScope, component: u16) -> Option<&CodingStyleComponentSegment> {
        self.coc.get(&(scope, component))
    }

    pub fn qcd(&self, scope: HeaderScope) -> Option<&QuantizationDefaultMarkerSegment> {
        self.qcd.get(&scope)
    }

    pub fn qcc(&self, scope: HeaderScope, component: u16) -> Option<&QuantizationComponentSegment> {
        self.qcc.get(&(scope, component))
    }

    pub fn rgn(&self, scope: HeaderScope, component: u16) -> Option<&RegionOfInterestSegment> {
        self.rgn.get(&(scope, component))
    }

    pub fn poc(&self, scope: HeaderScope) -> Option<&ProgressionOrderChangeSegment> {
        self.poc.get(&scope)
    }

    pub fn crg(&self) -> Option<&ComponentRegistrationSegment> {
        self.crg.as_ref()
    }

    /// Comments of a header in codestream order.
    pub fn comments(&self, scope: HeaderScope) -> impl Iterator<Item = &CommentMarkerSegment> {
        self.com
            .range((scope, 0)..=(scope, usize::MAX))
            .map(|(_, comment)| comment)
    }

    pub fn tlm(&self) -> &[TilePartLengthsSegment] {
        &self.tlm
    }

    pub fn plm(&self) -> &[PacketLengthSegment] {
        &self.plm
    }

    pub fn ppm(&self) -> &[PackedPacketHeaderSegment] {
        &self.ppm
    }

    pub fn ppt(&self, tile: usize) -> &[TilePackedPacketHeaderSegment] {
        self.ppt.get(&tile).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn plt(&self, tile: usize) -> &[TilePacketLength] {
        self.plt.get(&tile).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tile_parts(&self) -> &[StartOfTileSegment] {
        &self.tile_parts
    }

    /// Number of tile-parts found for a tile so far.
    pub fn no_tile_parts(&self, tile: usize) -> usize {
        self.tile_parts
            .iter()
            .filter(|sot| sot.tile_index() as usize == tile)
            .count()
    }

    pub(crate) fn insert_cod(&mut self, scope: HeaderScope, segment: CodingStyleMarkerSegment) {
        self.cod.insert(scope, segment);
    }

    pub(crate) fn insert_coc(&mut self, scope: HeaderScope, segment: CodingStyleComponentSegment) {
        self.coc.insert((scope, segment.component_index()), segment);
    }

    pub(crate) fn insert_qcd(
        &mut self,
        scope: HeaderScope,
        segment: QuantizationDefaultMarkerSegment,
    ) {
        self.qcd.insert(scope, segment);
    }

    pub(crate) fn insert_qcc(&mut self, scope: HeaderScope, segment: QuantizationComponentSegment) {
        self.qcc.insert((scope, segment.component_index()), segment);
    }

    pub(crate) fn insert_rgn(&mut self, scope: HeaderScope, segment: RegionOfInterestSegment) {
        self.rgn.insert((scope, segment.component_index()), segment);
    }

    /// Adds progression changes to a header, after any already found for it.
    pub(crate) fn append_poc(
        &mut self,
        scope: HeaderScope,
        offset: u64,
        length: u16,
        progressions: Vec<ProgressionOrderChange>,
    ) -> &ProgressionOrderChangeSegment {
        let segment = self
            .poc
            .entry(scope)
            .or_insert_with(|| ProgressionOrderChangeSegment {
                segments: Vec::new(),
                progressions: Vec::new(),
            });
        segment.segments.push((offset, length));
        segment.progressions.extend(progressions);
        segment
    }

    pub(crate) fn set_crg(&mut self, segment: ComponentRegistrationSegment) {
        self.crg = Some(segment);
    }

    pub(crate) fn push_com(&mut self, scope: HeaderScope, segment: CommentMarkerSegment) {
        let index = self.comments(scope).count();
        self.com.insert((scope, index), segment);
    }

    pub(crate) fn push_tlm(&mut self, segment: TilePartLengthsSegment) {
        self.tlm.push(segment);
    }

    pub(crate) fn push_plm(&mut self, segment: PacketLengthSegment) {
        self.plm.push(segment);
    }

    pub(crate) fn push_ppm(&mut self, segment: PackedPacketHeaderSegment) {
        self.ppm.push(segment);
    }

    pub(crate) fn push_ppt(&mut self, tile: usize, segment: TilePackedPacketHeaderSegment) {
        self.ppt.entry(tile).or_default().push(segment);
    }

    pub(crate) fn push_plt(&mut self, tile: usize, segment: TilePacketLength) {
        self.plt.entry(tile).or_default().push(segment);
    }

    pub(crate) fn push_tile_part(&mut self, segment: StartOfTileSegment) {
        self.tile_parts.push(segment);
    }

    fn scopes(&self) -> Vec<HeaderScope> {
        let mut scopes = vec![HeaderScope::Main];
        let mut tiles: Vec<usize> = self
            .tile_parts
            .iter()
            .map(|sot| sot.tile_index() as usize)
            .collect();
        tiles.sort_unstable();
        tiles.dedup();
        scopes.extend(tiles.into_iter().map(HeaderScope::Tile));
        scopes
    }
}

// Header dump, one block per segment in decoding order.
impl fmt::Display for HeaderInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "--- SIZ (main) ---")?;
        write!(f, "{}", self.siz)?;

        for scope in self.scopes() {
            for (i, comment) in self.comments(scope).enumerate() {
                writeln!(f, "--- COM ({}_{}) ---", scope, i)?;
                write!(f, "{}", comment)?;
            }

            if scope == HeaderScope::Main {
                if let Some(crg) = &self.crg {
                    writeln!(f, "--- CRG (main) ---")?;
                    for (i, (x, y)) in crg
                        .horizontal_offset
                        .iter()
                        .zip(crg.vertical_offset.iter())
                        .enumerate()
                    {
                        writeln!(f, "  Component {}: offset ({}, {})", i, x, y)?;
                    }
                }
            }

            if scope != HeaderScope::Main {
                for sot in self.tile_parts.iter().filter(|sot| {
                    HeaderScope::Tile(sot.tile_index() as usize) == scope
                }) {
                    writeln!(f, "--- SOT ({}) ---", scope)?;
                    writeln!(
                        f,
                        "  Tile-part {} of {}, length {}",
                        sot.tile_part_index(),
                        sot.no_tile_parts(),
                        sot.tile_part_length()
                    )?;
                }
            }

            if let Some(cod) = self.cod.get(&scope) {
                writeln!(f, "--- COD ({}) ---", scope)?;
                write!(f, "{}", cod)?;
            }

            for ((_, component), coc) in self.coc.range((scope, 0)..=(scope, u16::MAX)) {
                writeln!(f, "--- COC ({}_c{}) ---", scope, component)?;
                write!(f, "{}", coc)?;
            }

            if let Some(qcd) = self.qcd.get(&scope) {
                writeln!(f, "--- QCD ({}) ---", scope)?;
                write!(f, "{}", qcd.quantization_parameters())?;
            }

            for ((_, component), qcc) in self.qcc.range((scope, 0)..=(scope, u16::MAX)) {
                writeln!(f, "--- QCC ({}_c{}) ---", scope, component)?;
                write!(f, "{}", qcc.quantization_parameters())?;
            }

            for ((_, component), rgn) in self.rgn.range((scope, 0)..=(scope, u16::MAX)) {
                writeln!(f, "--- RGN ({}_c{}) ---", scope, component)?;
                writeln!(f, "  Shift: {}", rgn.shift())?;
            }

            if let Some(poc) = self.poc.get(&scope) {
                writeln!(f, "--- POC ({}) ---", scope)?;
                write!(f, "{}", poc)?;
            }

            if let HeaderScope::Tile(tile) = scope {
                for ppt in self.ppt(tile) {
                    writeln!(f, "--- PPT ({}_{}) ---", scope, ppt.index())?;
                    writeln!(f, "  Packed packet headers: {} bytes", ppt.data().len())?;
                }
                for plt in self.plt(tile) {
                    writeln!(f, "--- PLT ({}_{}) ---", scope, plt.index())?;
                    writeln!(f, "  Packet lengths: {:?}", plt.packet_lengths())?;
                }
            } else {
                for ppm in &self.ppm {
                    writeln!(f, "--- PPM (main_{}) ---", ppm.index())?;
                    writeln!(f, "  Packed packet headers: {} bytes", ppm.data().len())?;
                }
                for tlm in &self.tlm {
                    writeln!(f, "--- TLM (main_{}) ---", tlm.index())?;
                    for length in tlm.tile_part_lengths() {
                        match length.tile_index {
                            Some(tile) => writeln!(
                                f,
                                "  Tile {}: {} bytes",
                                tile, length.tile_part_length
                            )?,
                            None => writeln!(f, "  {} bytes", length.tile_part_length)?,
                        }
                    }
                }
                for plm in &self.plm {
                    writeln!(f, "--- PLM (main_{}) ---", plm.index())?;
                    for (i, lengths) in plm.tile_parts().iter().enumerate() {
                        writeln!(f, "  Tile-part {}: {:?}", i, lengths)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// The result of header decoding: the decoded segments and the coding
/// parameters resolved from them.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub(crate) info: HeaderInfo,
    pub(crate) specs: DecoderSpecs,
}

impl Header {
    pub fn info(&self) -> &HeaderInfo {
        &self.info
    }

    pub fn specs(&self) -> &DecoderSpecs {
        &self.specs
    }

    pub fn image_and_tile_size_marker_segment(&self) -> &ImageAndTileSizeMarkerSegment {
        self.info.siz()
    }

    pub fn num_tiles(&self) -> usize {
        self.specs.num_tiles()
    }

    pub fn num_components(&self) -> usize {
        self.specs.num_components()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{CommentRegistrationValue, ProgressionOrder};

    fn comment(text: &str) -> CommentMarkerSegment {
        CommentMarkerSegment {
            offset: 0,
            length: text.len() as u16 + 4,
            registration_value: CommentRegistrationValue::Latin,
            comment: text.as_bytes().to_vec(),
        }
    }

    fn change(layers: u16) -> ProgressionOrderChange {
        ProgressionOrderChange {
            resolution_level_index_start: 0,
            component_index_start: 0,
            layer_index_end: layers,
            resolution_level_index_end: 1,
            component_index_end: 1,
            progression_order: ProgressionOrder::LRLCPP,
        }
    }

    #[test]
    fn test_scope_keys() {
        assert_eq!(HeaderScope::Main.to_string(), "main");
        assert_eq!(HeaderScope::Tile(3).to_string(), "t3");
    }

    #[test]
    fn test_comments_keep_order_per_scope() {
        let mut info = HeaderInfo::new(ImageAndTileSizeMarkerSegment::default());
        info.push_com(HeaderScope::Main, comment("first"));
        info.push_com(HeaderScope::Tile(0), comment("tile"));
        info.push_com(HeaderScope::Main, comment("second"));

        let main: Vec<String> = info
            .comments(HeaderScope::Main)
            .map(CommentMarkerSegment::comment_latin)
            .collect();
        assert_eq!(main, vec!["first", "second"]);
        assert_eq!(info.comments(HeaderScope::Tile(0)).count(), 1);
        assert_eq!(info.comments(HeaderScope::Tile(1)).count(), 0);
    }

    #[test]
    fn test_poc_appends() {
        let mut info = HeaderInfo::new(ImageAndTileSizeMarkerSegment::default());
        info.append_poc(HeaderScope::Tile(0), 10, 16, vec![change(1), change(2)]);
        let poc = info.append_poc(HeaderScope::Tile(0), 40, 9, vec![change(3)]);
        assert_eq!(poc.offset(), 10);
        assert_eq!(poc.length(), 16);
        assert_eq!(poc.segments(), &[(10, 16), (40, 9)]);
        let layers: Vec<u16> = poc.progressions().iter().map(|p| p.layer_index_end).collect();
        assert_eq!(layers, vec![1, 2, 3]);
    }

    #[test]
    fn test_dump_names_scopes() {
        let mut info = HeaderInfo::new(ImageAndTileSizeMarkerSegment {
            reference_grid_width: 4,
            reference_grid_height: 4,
            reference_tile_width: 4,
            reference_tile_height: 4,
            ..Default::default()
        });
        info.push_com(HeaderScope::Main, comment("hello"));
        let dump = info.to_string();
        assert!(dump.starts_with("--- SIZ (main) ---"));
        assert!(dump.contains("--- COM (main_0) ---"));
        assert!(dump.contains("  Text: hello"));
    }
}
