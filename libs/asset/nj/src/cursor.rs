// This file is part of OpenNJ.
//
// OpenNJ is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// OpenNJ is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with OpenNJ.  If not, see <http://www.gnu.org/licenses/>.
use crate::error::{DecodeError, DecodeResult};
use byteorder::{ByteOrder, LittleEndian};
use nalgebra::Vector3;

// Bounds checked little-endian reads over a borrowed buffer. The cursor is
// Copy so that decoders can fork a reader at a resolved pointer without
// disturbing the position of their caller.
#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,

    // Virtual base address of the buffer; stored pointers minus this value
    // are offsets into `data`.
    pointer_offset: u32,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8], pointer_offset: u32) -> Self {
        Self {
            data,
            position: 0,
            pointer_offset,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    pub fn skip(&mut self, count: usize) {
        self.position = self.position.saturating_add(count);
    }

    // A new reader over the same buffer, positioned at `position`.
    pub fn at(&self, position: usize) -> Self {
        Self { position, ..*self }
    }

    pub fn slice(&self, offset: usize, length: usize) -> DecodeResult<&'a [u8]> {
        match offset.checked_add(length) {
            Some(end) if end <= self.data.len() => Ok(&self.data[offset..end]),
            _ => Err(DecodeError::BufferOverrun {
                offset,
                length,
                buffer_size: self.data.len(),
            }),
        }
    }

    pub fn peek_u16(&self, offset: usize) -> DecodeResult<u16> {
        Ok(LittleEndian::read_u16(self.slice(offset, 2)?))
    }

    pub fn peek_u32(&self, offset: usize) -> DecodeResult<u32> {
        Ok(LittleEndian::read_u32(self.slice(offset, 4)?))
    }

    pub fn peek_f32(&self, offset: usize) -> DecodeResult<f32> {
        Ok(LittleEndian::read_f32(self.slice(offset, 4)?))
    }

    pub fn read_bytes(&mut self, length: usize) -> DecodeResult<&'a [u8]> {
        let bytes = self.slice(self.position, length)?;
        self.position += length;
        Ok(bytes)
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_i16(&mut self) -> DecodeResult<i16> {
        Ok(LittleEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_f32(&mut self) -> DecodeResult<f32> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn read_vec3(&mut self) -> DecodeResult<Vector3<f32>> {
        let bytes = self.read_bytes(12)?;
        Ok(Vector3::new(
            LittleEndian::read_f32(&bytes[0..4]),
            LittleEndian::read_f32(&bytes[4..8]),
            LittleEndian::read_f32(&bytes[8..12]),
        ))
    }

    /// Turn a stored pointer into an offset in this buffer. Pointers below
    /// the base or past the end of the buffer are rejected rather than
    /// clamped.
    pub fn resolve_pointer(&self, raw: u32) -> DecodeResult<usize> {
        match raw.checked_sub(self.pointer_offset) {
            Some(offset) if (offset as usize) < self.data.len() => Ok(offset as usize),
            _ => Err(DecodeError::InvalidPointer {
                raw,
                pointer_offset: self.pointer_offset,
                buffer_size: self.data.len(),
            }),
        }
    }
}
