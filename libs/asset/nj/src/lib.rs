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
//! Decoder for SEGA Ninja chunk models (NJCM).
//!
//! A Ninja file is a run of IFF style containers. Each `NJCM` container holds
//! a tree of transform objects, some of which point at a chunk model: a vertex
//! list stream and a polygon list stream that together build one mesh.
//! Decoding is a pure function of the input bytes; the result owns every node
//! and mesh and holds no references back into the buffer.
mod angle;
mod chunk;
mod cursor;
mod error;
mod iff;
mod mesh;
mod model;
mod object;
mod plist;
mod vlist;

#[cfg(test)]
mod testing;

pub use crate::{
    angle::angle_to_rad,
    chunk::ChunkHeader,
    cursor::ByteCursor,
    error::{DecodeError, DecodeResult, StreamKind},
    iff::{NJBM_TAG, NJCM_TAG},
    mesh::{Face, LoopUvs, Mesh, MeshId, Vertex, DEFAULT_COLOR},
    model::decode_chunk_model,
    object::{SceneNode, Transform, OBJECT_RECORD_SIZE},
    plist::{
        decode_polygon_list, PolygonChunk, StripExtra, StripFormat, StripTriangle,
        StripTriangulator, StripVertex, UvType,
    },
    vlist::{decode_vertex_list, VertexFormat},
};

/// Knobs for a single decode call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Subtracted from every stored pointer to turn it into a buffer offset.
    /// Zero for self contained files; the load address when decoding a model
    /// lifted out of a memory image.
    pub pointer_offset: u32,

    /// Deepest child nesting accepted before giving up on the tree.
    pub max_depth: usize,

    /// Chunks read from one vertex or polygon list before giving up on it.
    pub max_stream_chunks: usize,

    /// Objects decoded from one tree, siblings included.
    pub max_nodes: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            pointer_offset: 0,
            max_depth: 256,
            max_stream_chunks: 65536,
            max_nodes: 65536,
        }
    }
}

impl DecodeOptions {
    pub fn with_pointer_offset(pointer_offset: u32) -> Self {
        Self {
            pointer_offset,
            ..Default::default()
        }
    }
}

/// Forest of decoded objects plus the meshes they reference.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneGraph {
    pub roots: Vec<SceneNode>,
    pub meshes: Vec<Mesh>,
    // Non-fatal problems found outside of any mesh, e.g. skipped containers.
    pub diagnostics: Vec<DecodeError>,
}

impl SceneGraph {
    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.index())
    }

    pub fn node_count(&self) -> usize {
        self.roots.iter().map(SceneNode::node_count).sum()
    }

    /// Every warning recorded while decoding, top level first.
    pub fn warnings(&self) -> impl Iterator<Item = &DecodeError> + '_ {
        self.diagnostics
            .iter()
            .chain(self.meshes.iter().flat_map(|mesh| mesh.warnings.iter()))
    }
}

/// Decode a Ninja container file.
pub fn decode(data: &[u8], pointer_offset: u32) -> DecodeResult<SceneGraph> {
    decode_with_options(data, &DecodeOptions::with_pointer_offset(pointer_offset))
}

pub fn decode_with_options(data: &[u8], options: &DecodeOptions) -> DecodeResult<SceneGraph> {
    iff::decode_containers(data, options)
}

/// Decode a bare object tree that is not wrapped in a container, starting at
/// the object record at `object_offset`. Used for models found in memory
/// dumps and executables.
pub fn decode_object_tree(
    data: &[u8],
    object_offset: usize,
    options: &DecodeOptions,
) -> DecodeResult<SceneGraph> {
    let mut graph = SceneGraph::default();
    graph.roots = iff::decode_tree(data, object_offset, options, &mut graph.meshes)?;
    Ok(graph)
}
