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
    angle::angle_to_rad,
    cursor::ByteCursor,
    error::{DecodeError, DecodeResult},
    mesh::{Mesh, MeshId},
    model::decode_chunk_model,
    DecodeOptions,
};
use log::trace;
use nalgebra::{Matrix4, Rotation3, Vector3};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    // Fixed point angles; see angle_to_rad.
    pub rotation: [u32; 3],
    pub scale: Vector3<f32>,
}

impl Transform {
    pub fn euler_radians(&self) -> Vector3<f32> {
        Vector3::new(
            angle_to_rad(self.rotation[0]),
            angle_to_rad(self.rotation[1]),
            angle_to_rad(self.rotation[2]),
        )
    }

    /// Translation * rotation * scale, with the rotation applied X first,
    /// then Y, then Z.
    pub fn matrix(&self) -> Matrix4<f32> {
        let angles = self.euler_radians();
        Matrix4::new_translation(&self.position)
            * Rotation3::from_euler_angles(angles.x, angles.y, angles.z).to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub eval_flags: u32,
    pub transform: Transform,
    pub mesh: Option<MeshId>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    // This node and everything below it.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }
}

// Object records are 52 bytes:
//   eval flags: u32, model ptr: u32, position: [f32; 3], rotation: [u32; 3],
//   scale: [f32; 3], child ptr: u32, sibling ptr: u32
pub const OBJECT_RECORD_SIZE: usize = 52;

struct ObjectRecord {
    eval_flags: u32,
    model_ptr: u32,
    transform: Transform,
    child_ptr: u32,
    sibling_ptr: u32,
}

impl ObjectRecord {
    fn read(cursor: &ByteCursor, offset: usize) -> DecodeResult<Self> {
        cursor.slice(offset, OBJECT_RECORD_SIZE)?;
        let mut record = cursor.at(offset);
        let eval_flags = record.read_u32()?;
        let model_ptr = record.read_u32()?;
        let position = record.read_vec3()?;
        let rotation = [record.read_u32()?, record.read_u32()?, record.read_u32()?];
        let scale = record.read_vec3()?;
        let child_ptr = record.read_u32()?;
        let sibling_ptr = record.read_u32()?;
        Ok(Self {
            eval_flags,
            model_ptr,
            transform: Transform {
                position,
                rotation,
                scale,
            },
            child_ptr,
            sibling_ptr,
        })
    }
}

// Builds the object tree of one buffer. Children are first-child/next-sibling
// linked in the file; siblings end up next to each other under the same
// parent. Meshes go into the shared arena, once per distinct model record.
pub(crate) struct ObjectDecoder<'a> {
    cursor: ByteCursor<'a>,
    options: &'a DecodeOptions,
    meshes: &'a mut Vec<Mesh>,
    models: HashMap<usize, MeshId>,
    nodes: usize,
}

impl<'a> ObjectDecoder<'a> {
    pub fn new(cursor: ByteCursor<'a>, options: &'a DecodeOptions, meshes: &'a mut Vec<Mesh>) -> Self {
        Self {
            cursor,
            options,
            meshes,
            models: HashMap::new(),
            nodes: 0,
        }
    }

    /// Decode the object at `offset` and every sibling chained after it.
    pub fn decode_chain(&mut self, offset: usize, depth: usize) -> DecodeResult<Vec<SceneNode>> {
        if depth > self.options.max_depth {
            return Err(DecodeError::DepthLimit {
                limit: self.options.max_depth,
                offset,
            });
        }

        let mut chain = Vec::new();
        let mut next = Some(offset);
        while let Some(offset) = next {
            self.nodes += 1;
            if self.nodes > self.options.max_nodes {
                return Err(DecodeError::IterationLimit {
                    what: "object tree",
                    limit: self.options.max_nodes,
                    offset,
                });
            }
            let (node, sibling) = self.decode_object(offset, depth)?;
            chain.push(node);
            next = sibling;
        }
        Ok(chain)
    }

    fn decode_object(
        &mut self,
        offset: usize,
        depth: usize,
    ) -> DecodeResult<(SceneNode, Option<usize>)> {
        let record = ObjectRecord::read(&self.cursor, offset)?;
        trace!(
            "object at 0x{:X}: model 0x{:08X}, child 0x{:08X}, sibling 0x{:08X}",
            offset,
            record.model_ptr,
            record.child_ptr,
            record.sibling_ptr
        );

        let mesh = if record.model_ptr != 0 {
            Some(self.decode_model(record.model_ptr)?)
        } else {
            None
        };

        let children = if record.child_ptr != 0 {
            let child = self.cursor.resolve_pointer(record.child_ptr)?;
            self.decode_chain(child, depth + 1)?
        } else {
            Vec::new()
        };

        let sibling = if record.sibling_ptr != 0 {
            Some(self.cursor.resolve_pointer(record.sibling_ptr)?)
        } else {
            None
        };

        let node = SceneNode {
            eval_flags: record.eval_flags,
            transform: record.transform,
            mesh,
            children,
        };
        Ok((node, sibling))
    }

    fn decode_model(&mut self, model_ptr: u32) -> DecodeResult<MeshId> {
        let offset = self.cursor.resolve_pointer(model_ptr)?;
        if let Some(&id) = self.models.get(&offset) {
            trace!("model at 0x{:X} already decoded as {:?}", offset, id);
            return Ok(id);
        }
        let mesh = decode_chunk_model(&self.cursor, offset, self.options)?;
        let id = MeshId(self.meshes.len());
        self.meshes.push(mesh);
        self.models.insert(offset, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ChunkWriter;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;
    use std::f32::consts::FRAC_PI_2;

    const R: u32 = OBJECT_RECORD_SIZE as u32;

    fn empty(w: &mut ChunkWriter, flags: u32, child: u32, sibling: u32) {
        w.object(flags, 0, [0.0; 3], [0; 3], [1.0; 3], child, sibling);
    }

    fn decode(data: &[u8], options: &DecodeOptions) -> DecodeResult<(Vec<SceneNode>, Vec<Mesh>)> {
        let mut meshes = Vec::new();
        let roots = ObjectDecoder::new(ByteCursor::new(data, options.pointer_offset), options, &mut meshes)
            .decode_chain(0, 0)?;
        Ok((roots, meshes))
    }

    #[test]
    fn siblings_share_a_parent() -> DecodeResult<()> {
        let mut w = ChunkWriter::default();
        empty(&mut w, 0, R, 2 * R); // 0: child 1, sibling 2
        empty(&mut w, 1, 0, 3 * R); // 1: sibling 3
        empty(&mut w, 2, 0, 0);
        empty(&mut w, 3, 0, 0);

        let (roots, meshes) = decode(&w.into_bytes(), &DecodeOptions::default())?;
        assert!(meshes.is_empty());
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].eval_flags, 0);
        assert_eq!(roots[1].eval_flags, 2);
        let children = roots[0]
            .children
            .iter()
            .map(|c| c.eval_flags)
            .collect::<Vec<_>>();
        assert_eq!(children, vec![1, 3]);
        assert!(roots[1].children.is_empty());
        assert_eq!(roots[0].node_count(), 3);
        Ok(())
    }

    #[test]
    fn it_reads_the_transform() -> DecodeResult<()> {
        let mut w = ChunkWriter::default();
        w.object(0x17, 0, [1.0, 2.0, 3.0], [0x4000, 0, 0xFFFF_FFFF], [2.0, 2.0, 2.0], 0, 0);

        let (roots, _) = decode(&w.into_bytes(), &DecodeOptions::default())?;
        let transform = &roots[0].transform;
        assert_eq!(roots[0].eval_flags, 0x17);
        assert_eq!(transform.position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(transform.scale, Vector3::new(2.0, 2.0, 2.0));
        let angles = transform.euler_radians();
        assert_relative_eq!(angles.x, FRAC_PI_2, epsilon = 0.0001);
        assert_eq!(angles.z, 0.0);

        // A quarter turn about X takes +Y to +Z before scaling and moving.
        let p = transform.matrix() * Vector4::new(0.0, 1.0, 0.0, 1.0);
        assert_relative_eq!(p.x, 1.0, epsilon = 0.001);
        assert_relative_eq!(p.y, 2.0, epsilon = 0.001);
        assert_relative_eq!(p.z, 5.0, epsilon = 0.001);
        Ok(())
    }

    #[test]
    fn shared_models_decode_once() -> DecodeResult<()> {
        let mut w = ChunkWriter::default();
        let model = 2 * R;
        w.object(0, model, [0.0; 3], [0; 3], [1.0; 3], 0, R);
        w.object(0, model, [0.0; 3], [0; 3], [1.0; 3], 0, 0);
        // Model record with no streams.
        w.u32(0);
        w.u32(0);

        let (roots, meshes) = decode(&w.into_bytes(), &DecodeOptions::default())?;
        assert_eq!(meshes.len(), 1);
        assert_eq!(roots[0].mesh, Some(MeshId(0)));
        assert_eq!(roots[1].mesh, Some(MeshId(0)));
        Ok(())
    }

    #[test]
    fn it_bounds_nesting_depth() {
        let mut w = ChunkWriter::default();
        empty(&mut w, 0, R, 0);
        // Its own child.
        empty(&mut w, 0, R, 0);

        let options = DecodeOptions {
            max_depth: 8,
            ..Default::default()
        };
        let err = decode(&w.into_bytes(), &options);
        assert!(matches!(err, Err(DecodeError::DepthLimit { limit: 8, .. })));
    }

    #[test]
    fn it_bounds_sibling_cycles() {
        let mut w = ChunkWriter::default();
        empty(&mut w, 0, 0, R);
        // Its own sibling.
        empty(&mut w, 0, 0, R);

        let options = DecodeOptions {
            max_nodes: 100,
            ..Default::default()
        };
        let err = decode(&w.into_bytes(), &options);
        assert!(matches!(err, Err(DecodeError::IterationLimit { limit: 100, .. })));
    }

    #[test]
    fn truncated_records_overrun() {
        let mut w = ChunkWriter::default();
        w.bytes(&[0u8; 40]);
        let err = decode(&w.into_bytes(), &DecodeOptions::default());
        assert!(matches!(err, Err(DecodeError::BufferOverrun { .. })));
    }
}
