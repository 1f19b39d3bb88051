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
use crate::axis::AxisConversion;
use anyhow::{Context, Result};
use gltf::{json, json::validation::Checked::Valid};
use nalgebra::{Matrix4, Vector2};
use nj::{Mesh, SceneGraph, SceneNode};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use zerocopy::AsBytes;

/// Write `<dir>/<name>.gltf` and `<dir>/<name>.bin` for the decoded graph.
/// Returns the path of the written document.
pub fn export_gltf(
    graph: &SceneGraph,
    dir: &Path,
    name: &str,
    axes: &AxisConversion,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let bin_name = format!("{}.bin", name);
    let (root, data) = build_document(graph, name, &bin_name, axes);
    let bin_out = dir.join(&bin_name);
    fs::write(&bin_out, &data).with_context(|| format!("i/o error in {}", bin_out.display()))?;

    let gltf_out = dir.join(format!("{}.gltf", name));
    let writer = fs::File::create(&gltf_out)
        .with_context(|| format!("i/o error in {}", gltf_out.display()))?;
    json::serialize::to_writer_pretty(writer, &root)
        .with_context(|| format!("serializing {}", gltf_out.display()))?;
    Ok(gltf_out)
}

// One binary blob shared by every mesh in the document; each attribute gets
// its own tightly packed view.
#[derive(Default)]
struct BinBuilder {
    data: Vec<u8>,
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
}

impl BinBuilder {
    fn push(
        &mut self,
        bytes: &[u8],
        count: usize,
        type_: json::accessor::Type,
        component: json::accessor::ComponentType,
        normalized: bool,
        bounds: Option<([f32; 3], [f32; 3])>,
    ) -> json::Index<json::Accessor> {
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }

        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: bytes.len().into(),
            byte_offset: Some((offset as u64).into()),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: Some(Valid(json::buffer::Target::ArrayBuffer)),
        });

        let to_value = |v: [f32; 3]| json::Value::from(Vec::from(v));
        self.accessors.push(json::Accessor {
            buffer_view: Some(json::Index::new(self.views.len() as u32 - 1)),
            byte_offset: Some(0u64.into()),
            count: count.into(),
            component_type: Valid(json::accessor::GenericComponentType(component)),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(type_),
            min: bounds.map(|(min, _)| to_value(min)),
            max: bounds.map(|(_, max)| to_value(max)),
            name: None,
            normalized,
            sparse: None,
        });
        json::Index::new(self.accessors.len() as u32 - 1)
    }

    fn push_vec3(&mut self, values: &[[f32; 3]], bounds: bool) -> json::Index<json::Accessor> {
        let bounds = if bounds {
            Some(bounding_coords(values))
        } else {
            None
        };
        self.push(
            values.as_bytes(),
            values.len(),
            json::accessor::Type::Vec3,
            json::accessor::ComponentType::F32,
            false,
            bounds,
        )
    }

    fn push_vec2(&mut self, values: &[[f32; 2]]) -> json::Index<json::Accessor> {
        self.push(
            values.as_bytes(),
            values.len(),
            json::accessor::Type::Vec2,
            json::accessor::ComponentType::F32,
            false,
            None,
        )
    }

    fn push_colors(&mut self, values: &[[u8; 4]]) -> json::Index<json::Accessor> {
        self.push(
            values.as_bytes(),
            values.len(),
            json::accessor::Type::Vec4,
            json::accessor::ComponentType::U8,
            true,
            None,
        )
    }
}

fn bounding_coords(points: &[[f32; 3]]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::MAX, f32::MAX, f32::MAX];
    let mut max = [f32::MIN, f32::MIN, f32::MIN];
    for p in points {
        for i in 0..3 {
            min[i] = f32::min(min[i], p[i]);
            max[i] = f32::max(max[i], p[i]);
        }
    }
    (min, max)
}

// glTF puts the texture origin at the top left.
fn flip_uv(uv: &Vector2<f32>) -> [f32; 2] {
    [uv.x, 1.0 - uv.y]
}

// Triangles are written without an index buffer so that per-loop uvs survive:
// three fresh vertices per face, in output winding order.
fn export_mesh(bin: &mut BinBuilder, name: String, mesh: &Mesh) -> Option<json::Mesh> {
    if mesh.faces.is_empty() {
        return None;
    }

    let corners = mesh.faces.len() * 3;
    let mut positions = Vec::with_capacity(corners);
    let mut normals = Vec::with_capacity(corners);
    let mut colors = Vec::with_capacity(corners);
    let mut uvs = Vec::with_capacity(corners);
    let mut uvs2 = Vec::with_capacity(corners);
    for (face_index, face) in mesh.faces.iter().enumerate() {
        for corner in face.loops() {
            let vertex_index = face.indices[corner];
            let vertex = &mesh.vertices[vertex_index];
            positions.push([vertex.position.x, vertex.position.y, vertex.position.z]);
            if let Some(normal) = vertex.normal {
                normals.push([normal.x, normal.y, normal.z]);
            }
            if let Some(layer) = &mesh.color_layer {
                colors.push(layer[vertex_index]);
            }
            if let Some(layer) = &mesh.uv_layer {
                uvs.push(flip_uv(&layer[face_index][corner]));
            }
            if let Some(layer) = &mesh.uv_layer_2 {
                uvs2.push(flip_uv(&layer[face_index][corner]));
            }
        }
    }

    let mut attributes = BTreeMap::new();
    attributes.insert(
        Valid(json::mesh::Semantic::Positions),
        bin.push_vec3(&positions, true),
    );
    // glTF normals must be unit length, so a partial set is dropped.
    if normals.len() == corners {
        attributes.insert(
            Valid(json::mesh::Semantic::Normals),
            bin.push_vec3(&normals, false),
        );
    }
    if !colors.is_empty() {
        attributes.insert(
            Valid(json::mesh::Semantic::Colors(0)),
            bin.push_colors(&colors),
        );
    }
    if !uvs.is_empty() {
        attributes.insert(
            Valid(json::mesh::Semantic::TexCoords(0)),
            bin.push_vec2(&uvs),
        );
    }
    if !uvs2.is_empty() {
        attributes.insert(
            Valid(json::mesh::Semantic::TexCoords(1)),
            bin.push_vec2(&uvs2),
        );
    }

    let primitive = json::mesh::Primitive {
        attributes,
        extensions: Default::default(),
        extras: Default::default(),
        indices: None,
        material: None,
        mode: Valid(json::mesh::Mode::Triangles),
        targets: None,
    };
    Some(json::Mesh {
        extensions: Default::default(),
        extras: Default::default(),
        name: Some(name),
        primitives: vec![primitive],
        weights: None,
    })
}

fn column_major(matrix: &Matrix4<f32>) -> [f32; 16] {
    let mut out = [0f32; 16];
    out.copy_from_slice(matrix.as_slice());
    out
}

fn export_node(
    nodes: &mut Vec<json::Node>,
    node: &SceneNode,
    meshes: &[Option<json::Index<json::Mesh>>],
) -> json::Index<json::Node> {
    let children = node
        .children
        .iter()
        .map(|child| export_node(nodes, child, meshes))
        .collect::<Vec<_>>();
    nodes.push(json::Node {
        camera: None,
        children: if children.is_empty() {
            None
        } else {
            Some(children)
        },
        extensions: Default::default(),
        extras: Default::default(),
        matrix: Some(column_major(&node.transform.matrix())),
        mesh: node.mesh.and_then(|id| meshes[id.index()]),
        name: None,
        rotation: None,
        scale: None,
        skin: None,
        translation: None,
        weights: None,
    });
    json::Index::new(nodes.len() as u32 - 1)
}

/// Build the glTF document and its binary buffer. Every decoded root hangs
/// off one extra node that holds the axis conversion.
pub fn build_document(
    graph: &SceneGraph,
    name: &str,
    bin_uri: &str,
    axes: &AxisConversion,
) -> (json::Root, Vec<u8>) {
    let mut bin = BinBuilder::default();
    let meshes = graph
        .meshes
        .iter()
        .enumerate()
        .map(|(i, mesh)| export_mesh(&mut bin, format!("{}-mesh{}", name, i), mesh))
        .collect::<Vec<_>>();
    let mut json_meshes = Vec::new();
    let mut mesh_indices = Vec::with_capacity(meshes.len());
    for mesh in meshes {
        mesh_indices.push(mesh.map(|mesh| {
            json_meshes.push(mesh);
            json::Index::new(json_meshes.len() as u32 - 1)
        }));
    }

    let mut nodes = Vec::new();
    let roots = graph
        .roots
        .iter()
        .map(|root| export_node(&mut nodes, root, &mesh_indices))
        .collect::<Vec<_>>();
    nodes.push(json::Node {
        camera: None,
        children: Some(roots),
        extensions: Default::default(),
        extras: Default::default(),
        matrix: if axes.is_identity() {
            None
        } else {
            Some(column_major(&axes.matrix()))
        },
        mesh: None,
        name: Some(name.to_owned()),
        rotation: None,
        scale: None,
        skin: None,
        translation: None,
        weights: None,
    });
    let scene_root = json::Index::new(nodes.len() as u32 - 1);

    let buffers = if bin.data.is_empty() {
        Vec::new()
    } else {
        vec![json::Buffer {
            byte_length: bin.data.len().into(),
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            uri: Some(bin_uri.to_owned()),
        }]
    };
    let root = json::Root {
        accessors: bin.accessors,
        buffers,
        buffer_views: bin.views,
        meshes: json_meshes,
        nodes,
        scene: Some(json::Index::new(0)),
        scenes: vec![json::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(name.to_owned()),
            nodes: vec![scene_root],
        }],
        ..Default::default()
    };
    (root, bin.data)
}
