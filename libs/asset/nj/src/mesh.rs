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
use crate::error::DecodeError;
use nalgebra::{Vector2, Vector3};

// Color written into freshly allocated color layers.
pub const DEFAULT_COLOR: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

// Handle into SceneGraph::meshes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub(crate) usize);

impl MeshId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vector3<f32>,
    pub normal: Option<Vector3<f32>>,
}

/// One triangle. `indices` is in strip read order; `flipped` records whether
/// the strip parity and strip flag left the triangle with reversed winding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Face {
    pub indices: [usize; 3],
    pub flipped: bool,
}

impl Face {
    pub fn new(indices: [usize; 3], flipped: bool) -> Self {
        Self { indices, flipped }
    }

    /// Corner positions in output winding order. Flipping reverses the loop
    /// cycle but keeps the first loop in place.
    pub fn loops(&self) -> [usize; 3] {
        if self.flipped {
            [0, 2, 1]
        } else {
            [0, 1, 2]
        }
    }

    pub fn winding(&self) -> [usize; 3] {
        let [a, b, c] = self.loops();
        [self.indices[a], self.indices[b], self.indices[c]]
    }
}

// Per-loop texture coordinates of one face, aligned with Face::indices.
pub type LoopUvs = [Vector2<f32>; 3];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub faces: Vec<Face>,

    // Attribute layers are absent until a chunk variant needs them.
    pub color_layer: Option<Vec<[u8; 4]>>,
    pub uv_layer: Option<Vec<LoopUvs>>,
    pub uv_layer_2: Option<Vec<LoopUvs>>,

    // Non-fatal problems hit while reading this mesh's chunk streams.
    pub warnings: Vec<DecodeError>,
}

impl Mesh {
    pub fn push_vertex(&mut self, vertex: Vertex) -> usize {
        self.vertices.push(vertex);
        if let Some(colors) = self.color_layer.as_mut() {
            colors.push(DEFAULT_COLOR);
        }
        self.vertices.len() - 1
    }

    pub fn push_face(&mut self, face: Face) -> usize {
        self.faces.push(face);
        for layer in [self.uv_layer.as_mut(), self.uv_layer_2.as_mut()]
            .into_iter()
            .flatten()
        {
            layer.push([Vector2::zeros(); 3]);
        }
        self.faces.len() - 1
    }

    pub fn ensure_color_layer(&mut self) {
        if self.color_layer.is_none() {
            self.color_layer = Some(vec![DEFAULT_COLOR; self.vertices.len()]);
        }
    }

    pub fn ensure_uv_layer(&mut self) {
        if self.uv_layer.is_none() {
            self.uv_layer = Some(vec![[Vector2::zeros(); 3]; self.faces.len()]);
        }
    }

    pub fn ensure_uv_layer_2(&mut self) {
        if self.uv_layer_2.is_none() {
            self.uv_layer_2 = Some(vec![[Vector2::zeros(); 3]; self.faces.len()]);
        }
    }

    pub fn set_color(&mut self, vertex: usize, rgba: [u8; 4]) {
        if let Some(slot) = self
            .color_layer
            .as_mut()
            .and_then(|colors| colors.get_mut(vertex))
        {
            *slot = rgba;
        }
    }

    pub fn set_loop_uv(&mut self, face: usize, corner: usize, uv: Vector2<f32>) {
        if let Some(loops) = self.uv_layer.as_mut().and_then(|l| l.get_mut(face)) {
            loops[corner] = uv;
        }
    }

    pub fn set_loop_uv_2(&mut self, face: usize, corner: usize, uv: Vector2<f32>) {
        if let Some(loops) = self.uv_layer_2.as_mut().and_then(|l| l.get_mut(face)) {
            loops[corner] = uv;
        }
    }

    pub fn has_normals(&self) -> bool {
        self.vertices.iter().any(|v| v.normal.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.faces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32) -> Vertex {
        Vertex {
            position: Vector3::new(x, 0.0, 0.0),
            normal: None,
        }
    }

    #[test]
    fn flipped_faces_reverse_the_loop_cycle() {
        let face = Face::new([4, 5, 6], false);
        assert_eq!(face.winding(), [4, 5, 6]);
        let face = Face::new([4, 5, 6], true);
        assert_eq!(face.loops(), [0, 2, 1]);
        assert_eq!(face.winding(), [4, 6, 5]);
    }

    #[test]
    fn layers_track_their_owners() {
        let mut mesh = Mesh::default();
        mesh.push_vertex(vertex(0.0));
        mesh.ensure_color_layer();
        mesh.push_vertex(vertex(1.0));
        assert_eq!(mesh.color_layer.as_ref().map(Vec::len), Some(2));

        mesh.set_color(1, [1, 2, 3, 4]);
        mesh.set_color(9, [1, 2, 3, 4]);
        assert_eq!(mesh.color_layer.as_ref().unwrap()[1], [1, 2, 3, 4]);

        mesh.push_face(Face::new([0, 1, 0], false));
        mesh.ensure_uv_layer();
        mesh.push_face(Face::new([1, 0, 1], false));
        assert_eq!(mesh.uv_layer.as_ref().map(Vec::len), Some(2));
        assert!(mesh.uv_layer_2.is_none());

        mesh.set_loop_uv(1, 2, Vector2::new(0.5, 0.25));
        assert_eq!(mesh.uv_layer.as_ref().unwrap()[1][2], Vector2::new(0.5, 0.25));
    }
}
