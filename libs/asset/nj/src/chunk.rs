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
use crate::{cursor::ByteCursor, error::DecodeResult};

// Every vertex and polygon list chunk starts with one of these. The size is in
// dwords for vertex chunks and in words for polygon chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub type_flags: u8,
    pub type_id: u8,
    pub size: u16,
}

impl ChunkHeader {
    pub const SIZE: usize = 4;
    pub const NULL: u8 = 0x00;
    pub const END: u8 = 0xFF;

    pub fn from_u32(head: u32) -> Self {
        let ty = head & 0xFFFF;
        Self {
            type_flags: (ty >> 8) as u8,
            type_id: (ty & 0xFF) as u8,
            size: (head >> 16) as u16,
        }
    }

    pub fn read(cursor: &ByteCursor, offset: usize) -> DecodeResult<Self> {
        Ok(Self::from_u32(cursor.peek_u32(offset)?))
    }

    pub fn is_end(&self) -> bool {
        self.type_id == Self::END
    }
}
