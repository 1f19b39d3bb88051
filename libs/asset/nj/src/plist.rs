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
    mesh::{Face, Mesh},
    DecodeOptions,
};
use log::trace;
use nalgebra::Vector2;
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UvType {
    None,
    Low,
    High,
}

impl UvType {
    // Raw texture coordinates are divided by this to land in 0..1.
    pub fn resolution(self) -> Option<f32> {
        match self {
            UvType::None => None,
            UvType::Low => Some(255.0),
            UvType::High => Some(1023.0),
        }
    }
}

// Per-vertex payload that follows the index and uv of a strip vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StripExtra {
    None,
    Normal,
    Color,
    Uv2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StripFormat {
    pub uv: UvType,
    pub extra: StripExtra,
}

impl StripFormat {
    pub const FIRST_ID: u8 = 0x40;
    pub const LAST_ID: u8 = 0x4B;

    pub fn from_chunk_id(id: u8) -> Option<Self> {
        if !(Self::FIRST_ID..=Self::LAST_ID).contains(&id) {
            return None;
        }
        let n = id - Self::FIRST_ID;
        let uv = match n % 3 {
            0 => UvType::None,
            1 => UvType::Low,
            _ => UvType::High,
        };
        let extra = match n / 3 {
            0 => StripExtra::None,
            1 => StripExtra::Normal,
            2 => StripExtra::Color,
            _ => StripExtra::Uv2,
        };
        Some(Self { uv, extra })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolygonChunk {
    Null,
    Bits,
    // Texture index; the payload lives in the size field.
    Tiny,
    Material,
    // Loose triangles.
    Volume,
    Strip(StripFormat),
    End,
}

impl PolygonChunk {
    pub fn from_chunk_id(id: u8) -> Option<Self> {
        Some(match id {
            ChunkHeader::NULL => PolygonChunk::Null,
            0x01..=0x05 => PolygonChunk::Bits,
            0x08..=0x09 => PolygonChunk::Tiny,
            0x11..=0x1F => PolygonChunk::Material,
            0x38..=0x3A => PolygonChunk::Volume,
            0x40..=0x4B => PolygonChunk::Strip(StripFormat::from_chunk_id(id)?),
            ChunkHeader::END => PolygonChunk::End,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StripVertex {
    pub index: usize,
    pub uv: Option<Vector2<f32>>,
    pub uv2: Option<Vector2<f32>>,
}

impl StripVertex {
    pub fn plain(index: usize) -> Self {
        Self {
            index,
            uv: None,
            uv2: None,
        }
    }
}

// A face produced by the strip window, with the loop uvs it carries, aligned
// with the face's read order corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StripTriangle {
    pub face: Face,
    pub uvs: [Option<Vector2<f32>>; 3],
    pub uvs2: [Option<Vector2<f32>>; 3],
}

/// Sliding window over the vertices of one triangle strip. Every vertex after
/// the second completes a triangle with the two before it; odd triangles have
/// their winding reversed, and a flipped strip reverses all of them again.
#[derive(Debug)]
pub struct StripTriangulator {
    window: VecDeque<StripVertex>,
    flip: bool,
    pushed: usize,
}

impl StripTriangulator {
    pub fn new(flip: bool) -> Self {
        Self {
            window: VecDeque::with_capacity(3),
            flip,
            pushed: 0,
        }
    }

    pub fn push(&mut self, vertex: StripVertex) -> Option<StripTriangle> {
        let position = self.pushed;
        self.pushed += 1;
        self.window.push_back(vertex);
        if self.window.len() < 3 {
            return None;
        }

        let face = Face::new(
            [
                self.window[0].index,
                self.window[1].index,
                self.window[2].index,
            ],
            self.flip ^ (position % 2 == 1),
        );

        // Uvs belong to loops, so match each window member to the first corner
        // that uses its vertex.
        let mut uvs = [None; 3];
        let mut uvs2 = [None; 3];
        for member in &self.window {
            if let Some(corner) = face.indices.iter().position(|&i| i == member.index) {
                if member.uv.is_some() {
                    uvs[corner] = member.uv;
                }
                if member.uv2.is_some() {
                    uvs2[corner] = member.uv2;
                }
            }
        }

        self.window.pop_front();
        Some(StripTriangle { face, uvs, uvs2 })
    }
}

fn read_uv(cursor: &mut ByteCursor, resolution: f32) -> DecodeResult<Vector2<f32>> {
    let u = cursor.read_u16()?;
    let v = cursor.read_u16()?;
    Ok(Vector2::new(
        f32::from(u) / resolution,
        f32::from(v) / resolution,
    ))
}

fn decode_strip_chunk(
    cursor: &ByteCursor,
    offset: usize,
    format: StripFormat,
    mesh: &mut Mesh,
) -> DecodeResult<()> {
    let mut strip_cursor = cursor.at(offset + ChunkHeader::SIZE);

    // The top two bits are the number of user flag words after each triangle.
    let header = strip_cursor.read_u16()?;
    let num_userflags = usize::from(header >> 14);
    let num_strips = usize::from(header & 0x3FFF);
    trace!(
        "plist: {} strips of {:?} with {} user flags at 0x{:X}",
        num_strips,
        format,
        num_userflags,
        offset
    );

    let resolution = format.uv.resolution();
    if resolution.is_some() {
        mesh.ensure_uv_layer();
    }
    match format.extra {
        StripExtra::Color => mesh.ensure_color_layer(),
        StripExtra::Uv2 if resolution.is_some() => mesh.ensure_uv_layer_2(),
        _ => {}
    }

    for _ in 0..num_strips {
        let count = strip_cursor.read_i16()?;
        let mut strip = StripTriangulator::new(count < 0);
        for _ in 0..count.unsigned_abs() {
            let index_offset = strip_cursor.position();
            let index = usize::from(strip_cursor.read_u16()?);
            if index >= mesh.vertices.len() {
                return Err(DecodeError::InvalidVertexIndex {
                    index,
                    vertex_count: mesh.vertices.len(),
                    offset: index_offset,
                });
            }

            let uv = match resolution {
                Some(resolution) => Some(read_uv(&mut strip_cursor, resolution)?),
                None => None,
            };

            let mut uv2 = None;
            match format.extra {
                StripExtra::None => {}
                // Strip normals are not decoded yet.
                StripExtra::Normal => strip_cursor.skip(6),
                StripExtra::Color => {
                    let ar = strip_cursor.read_u16()?;
                    let gb = strip_cursor.read_u16()?;
                    mesh.set_color(
                        index,
                        [
                            (ar & 0xFF) as u8,
                            (gb >> 8) as u8,
                            (gb & 0xFF) as u8,
                            (ar >> 8) as u8,
                        ],
                    );
                }
                StripExtra::Uv2 => {
                    if let Some(resolution) = resolution {
                        uv2 = Some(read_uv(&mut strip_cursor, resolution)?);
                    }
                }
            }

            if let Some(triangle) = strip.push(StripVertex { index, uv, uv2 }) {
                let face = mesh.push_face(triangle.face);
                for corner in 0..3 {
                    if let Some(uv) = triangle.uvs[corner] {
                        mesh.set_loop_uv(face, corner, uv);
                    }
                    if let Some(uv) = triangle.uvs2[corner] {
                        mesh.set_loop_uv_2(face, corner, uv);
                    }
                }
                strip_cursor.skip(num_userflags * 2);
            }
        }
    }
    Ok(())
}

/// Decode the polygon chunk stream at `base` into `mesh`, whose vertices must
/// already be present. An unrecognized chunk stops the stream and is returned
/// as an error, leaving the faces read so far in the mesh.
pub fn decode_polygon_list(
    cursor: &ByteCursor,
    base: usize,
    mesh: &mut Mesh,
    options: &DecodeOptions,
) -> DecodeResult<()> {
    let mut chunk_offset = base;
    for _ in 0..options.max_stream_chunks {
        let chunk = ChunkHeader::read(cursor, chunk_offset)?;
        let kind = PolygonChunk::from_chunk_id(chunk.type_id).ok_or(
            DecodeError::UnrecognizedChunk {
                stream: StreamKind::PolygonList,
                id: chunk.type_id,
                offset: chunk_offset,
            },
        )?;

        let mut size = usize::from(chunk.size);
        match kind {
            PolygonChunk::End => {
                trace!("plist: end chunk at 0x{:X}", chunk_offset);
                return Ok(());
            }
            PolygonChunk::Strip(format) => decode_strip_chunk(cursor, chunk_offset, format, mesh)?,
            PolygonChunk::Tiny => {
                trace!("plist: {:?} chunk at 0x{:X}", kind, chunk_offset);
                size = 0;
            }
            _ => trace!("plist: {:?} chunk at 0x{:X}", kind, chunk_offset),
        }
        chunk_offset += ChunkHeader::SIZE + size * 2;
    }
    Err(DecodeError::IterationLimit {
        what: "polygon list",
        limit: options.max_stream_chunks,
        offset: base,
    })
}
