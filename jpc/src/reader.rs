use std::io::{self, Read, Seek};

use crate::error::CodestreamError;
use crate::marker::MarkerSymbol;

const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Buffered random access over a seekable byte source.
///
/// All multi-byte reads are big-endian. The total length is taken from the
/// source when the reader is built, so seeking past it fails rather than
/// deferring the failure to the next read. Seeks that land inside the
/// currently buffered window are served from the buffer.
pub struct RandomAccessReader<R> {
    inner: io::BufReader<R>,
    position: u64,
    length: u64,
}

impl<R: io::Read + io::Seek> RandomAccessReader<R> {
    pub fn new(inner: R) -> Result<RandomAccessReader<R>, CodestreamError> {
        RandomAccessReader::with_capacity(DEFAULT_BUFFER_SIZE, inner)
    }

    pub fn with_capacity(
        capacity: usize,
        mut inner: R,
    ) -> Result<RandomAccessReader<R>, CodestreamError> {
        let position = inner.stream_position()?;
        let length = inner.seek(io::SeekFrom::End(0))?;
        inner.seek(io::SeekFrom::Start(position))?;

        Ok(RandomAccessReader {
            inner: io::BufReader::with_capacity(capacity, inner),
            position,
            length,
        })
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn remaining(&self) -> u64 {
        self.length.saturating_sub(self.position)
    }

    pub fn seek(&mut self, offset: u64) -> Result<(), CodestreamError> {
        if offset > self.length {
            return Err(CodestreamError::SeekOutOfRange {
                offset,
                length: self.length,
            });
        }
        let delta = offset as i64 - self.position as i64;
        self.inner.seek_relative(delta)?;
        self.position = offset;
        Ok(())
    }

    pub fn skip(&mut self, count: u64) -> Result<(), CodestreamError> {
        self.seek(self.position.saturating_add(count))
    }

    pub fn read_fully(&mut self, buffer: &mut [u8]) -> Result<(), CodestreamError> {
        match self.inner.read_exact(buffer) {
            Ok(()) => {
                self.position += buffer.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                // A short read leaves the inner reader anywhere, realign it.
                self.inner.seek(io::SeekFrom::Start(self.position))?;
                Err(CodestreamError::EndOfData {
                    offset: self.position,
                    requested: buffer.len(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, CodestreamError> {
        let mut buffer = [0; 1];
        self.read_fully(&mut buffer)?;
        Ok(buffer[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodestreamError> {
        let mut buffer = [0; 2];
        self.read_fully(&mut buffer)?;
        Ok(u16::from_be_bytes(buffer))
    }

    pub fn read_u32(&mut self) -> Result<u32, CodestreamError> {
        let mut buffer = [0; 4];
        self.read_fully(&mut buffer)?;
        Ok(u32::from_be_bytes(buffer))
    }

    pub fn read_u64(&mut self) -> Result<u64, CodestreamError> {
        let mut buffer = [0; 8];
        self.read_fully(&mut buffer)?;
        Ok(u64::from_be_bytes(buffer))
    }

    pub fn read_marker(&mut self) -> Result<MarkerSymbol, CodestreamError> {
        Ok(MarkerSymbol(self.read_u16()?))
    }
}

/// Reads a single buffered marker segment.
///
/// The buffer holds the segment from its length field onwards, so a segment
/// reader starts at offset 0 on Lxxx. Reading past the end means the declared
/// length is shorter than the content it claims to carry.
pub(crate) struct SegmentReader<'a> {
    marker: MarkerSymbol,
    data: &'a [u8],
    position: usize,
}

impl<'a> SegmentReader<'a> {
    pub(crate) fn new(marker: MarkerSymbol, data: &'a [u8]) -> SegmentReader<'a> {
        SegmentReader {
            marker,
            data,
            position: 0,
        }
    }

    pub(crate) fn marker(&self) -> MarkerSymbol {
        self.marker
    }

    pub(crate) fn length(&self) -> u16 {
        self.data.len() as u16
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub(crate) fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], CodestreamError> {
        if count > self.remaining() {
            return Err(CodestreamError::SegmentTooShort {
                marker: self.marker,
                length: self.length(),
            });
        }
        let bytes = &self.data[self.position..self.position + count];
        self.position += count;
        Ok(bytes)
    }

    pub(crate) fn read_remaining(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.position..];
        self.position = self.data.len();
        bytes
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, CodestreamError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, CodestreamError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, CodestreamError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a component index, 8 bits wide for fewer than 257 components.
    pub(crate) fn read_component_index(
        &mut self,
        no_components: u16,
    ) -> Result<u16, CodestreamError> {
        if no_components < 257 {
            Ok(self.read_u8()? as u16)
        } else {
            self.read_u16()
        }
    }
}
