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
use crate::{
    chunk::ChunkHeader,
    cursor::ByteCursor,
    error::{DecodeError, DecodeResult, StreamKind},
    mesh::{Mesh, Vertex},
    DecodeOptions,
};
use bitflags::bitflags;
use log::trace;

bitflags! {
    pub struct VertexFormat : u16 {
        const SHORT_PAD           = 0b0000_0000_0000_0001;
        const NORMAL              = 0b0000_0000_0000_0010;
        const DIFFUSE8            = 0b0000_0000_0000_0100;
        const USER_FLOAT          = 0b0000_0000_0000_1000;
        const NORMAL_FLOAT_WEIGHT = 0b0000_0000_0001_0000;
        const SPEC5               = 0b0000_0000_0010_0000;
        const SPEC4               = 0b0000_0000_0100_0000;
        const INTENSITY           = 0b0000_0000_1000_0000;
        const NORMAL_COMPACT      = 0b0000_0001_0000_0000;

        const COLOR = Self::DIFFUSE8.bits | Self::SPEC5.bits | Self::SPEC4.bits | Self::INTENSITY.bits;
    }
}

impl VertexFormat {
    pub const FIRST_ID: u8 = 0x20;
    pub const LAST_ID: u8 = 0x32;

    // The vertex chunk ids are not a bit field; each one names a fixed set.
    pub fn from_chunk_id(id: u8) -> Option<Self> {
        Some(match id {
            0x20 => Self::SHORT_PAD,
            0x21 => Self::NORMAL | Self::SHORT_PAD,
            0x22 => Self::empty(),
            0x23 => Self::DIFFUSE8,
            0x24 => Self::USER_FLOAT,
            0x25 => Self::NORMAL_FLOAT_WEIGHT,
            0x26 => Self::SPEC5,
            0x27 => Self::SPEC4,
            0x28 => Self::INTENSITY,
            0x29 => Self::NORMAL,
            0x2A => Self::NORMAL | Self::DIFFUSE8,
            0x2B => Self::NORMAL | Self::USER_FLOAT,
            0x2C => Self::NORMAL | Self::NORMAL_FLOAT_WEIGHT,
            0x2D => Self::NORMAL | Self::SPEC5,
            0x2E => Self::NORMAL | Self::SPEC4,
            0x2F => Self::NORMAL | Self::INTENSITY,
            0x30 => Self::NORMAL_COMPACT,
            0x31 => Self::NORMAL_COMPACT | Self::DIFFUSE8,
            0x32 => Self::NORMAL_COMPACT | Self::USER_FLOAT,
            _ => return None,
        })
    }

    pub fn has_color(self) -> bool {
        self.intersects(Self::COLOR)
    }

    // Bytes taken by one vertex of this format.
    pub fn stride(self) -> usize {
        let pad = if self.contains(Self::SHORT_PAD) { 4 } else { 0 };
        let mut stride = 12 + pad;
        if self.contains(Self::NORMAL) {
            stride += 12 + pad;
        } else if self.contains(Self::NORMAL_COMPACT) {
            stride += 4;
        }
        if self.has_color() {
            stride += 4;
        }
        if self.contains(Self::NORMAL_FLOAT_WEIGHT) {
            stride += 4;
        }
        stride
    }
}

// Read the position and normal of one vertex of the given format.
fn read_vertex(format: VertexFormat, cursor: &mut ByteCursor) -> DecodeResult<Vertex> {
    let position = cursor.read_vec3()?;
    if format.contains(VertexFormat::SHORT_PAD) {
        cursor.skip(4);
    }

    // The 32 bit packed normal encoding is not decoded yet. Colors and
    // weights come after the normal and are left to the stride.
    let normal = if format.contains(VertexFormat::NORMAL) {
        Some(cursor.read_vec3()?)
    } else {
        None
    };

    Ok(Vertex { position, normal })
}

fn decode_vertex_chunk(
    cursor: &ByteCursor,
    offset: usize,
    format: VertexFormat,
    mesh: &mut Mesh,
) -> DecodeResult<()> {
    // The low half of this word is an index offset we do not use.
    let num_vertices = (cursor.peek_u32(offset + ChunkHeader::SIZE)? >> 16) as usize;
    trace!(
        "vlist: {} vertices with {:?} at 0x{:X}",
        num_vertices,
        format,
        offset
    );

    // Diffuse, specular and intensity colors are not decoded; the layer is
    // still allocated so that strip colors have somewhere to land.
    if format.has_color() {
        mesh.ensure_color_layer();
    }

    let stride = format.stride();
    let start = offset + ChunkHeader::SIZE + 4;
    cursor.slice(start, num_vertices * stride)?;
    for i in 0..num_vertices {
        let vertex = read_vertex(format, &mut cursor.at(start + i * stride))?;
        mesh.push_vertex(vertex);
    }
    Ok(())
}

/// Decode the vertex chunk stream at `base` into `mesh`. An unrecognized
/// chunk stops the stream and is returned as an error, leaving the vertices
/// read so far in the mesh.
pub fn decode_vertex_list(
    cursor: &ByteCursor,
    base: usize,
    mesh: &mut Mesh,
    options: &DecodeOptions,
) -> DecodeResult<()> {
    let mut chunk_offset = base;
    for _ in 0..options.max_stream_chunks {
        let chunk = ChunkHeader::read(cursor, chunk_offset)?;
        if let Some(format) = VertexFormat::from_chunk_id(chunk.type_id) {
            decode_vertex_chunk(cursor, chunk_offset, format, mesh)?;
        } else if chunk.is_end() {
            trace!("vlist: end chunk at 0x{:X}", chunk_offset);
            return Ok(());
        } else {
            return Err(DecodeError::UnrecognizedChunk {
                stream: StreamKind::VertexList,
                id: chunk.type_id,
                offset: chunk_offset,
            });
        }
        chunk_offset += ChunkHeader::SIZE + chunk.size as usize * 4;
    }
    Err(DecodeError::IterationLimit {
        what: "vertex list",
        limit: options.max_stream_chunks,
        offset: base,
    })
}
