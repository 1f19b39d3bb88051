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
// Helpers for building chunk streams and containers by hand in tests.

#[derive(Default)]
pub(crate) struct ChunkWriter {
    data: Vec<u8>,
}

impl ChunkWriter {
    pub fn position(&self) -> usize {
        self.data.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn u16(&mut self, v: u16) {
        self.bytes(&v.to_le_bytes());
    }

    pub fn i16(&mut self, v: i16) {
        self.bytes(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    pub fn f32s(&mut self, vs: &[f32]) {
        for v in vs {
            self.bytes(&v.to_le_bytes());
        }
    }

    pub fn patch_u32(&mut self, offset: usize, v: u32) {
        self.data[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    }

    // A chunk whose size field is filled in from the body length in `unit`s.
    pub fn chunk(&mut self, id: u8, unit: usize, body: impl FnOnce(&mut Self)) {
        let head = self.position();
        self.u32(0);
        body(self);
        let size = (self.position() - head - 4) / unit;
        self.patch_u32(head, (size as u32) << 16 | u32::from(id));
    }

    pub fn vertex_chunk(
        &mut self,
        id: u8,
        positions: &[[f32; 3]],
        mut extra: impl FnMut(&mut Self, usize),
    ) {
        self.chunk(id, 4, |w| {
            w.u32((positions.len() as u32) << 16);
            for (i, position) in positions.iter().enumerate() {
                w.f32s(position);
                extra(w, i);
            }
        });
    }

    // A strip chunk with plain indices; `flip` is applied by negating the count.
    pub fn plain_strip_chunk(&mut self, strips: &[(bool, &[u16])]) {
        self.chunk(0x40, 2, |w| {
            w.u16(strips.len() as u16);
            for (flip, indices) in strips {
                let count = indices.len() as i16;
                w.i16(if *flip { -count } else { count });
                for &index in indices.iter() {
                    w.u16(index);
                }
            }
        });
    }

    pub fn end(&mut self) {
        self.u32(0x0000_00FF);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn object(
        &mut self,
        eval_flags: u32,
        model: u32,
        position: [f32; 3],
        rotation: [u32; 3],
        scale: [f32; 3],
        child: u32,
        sibling: u32,
    ) {
        self.u32(eval_flags);
        self.u32(model);
        self.f32s(&position);
        for r in rotation {
            self.u32(r);
        }
        self.f32s(&scale);
        self.u32(child);
        self.u32(sibling);
    }

    pub fn container(&mut self, tag: &[u8; 4], payload: &[u8]) {
        self.bytes(tag);
        self.u32(payload.len() as u32);
        self.bytes(payload);
    }
}
