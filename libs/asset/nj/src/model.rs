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
    cursor::ByteCursor,
    error::{DecodeError, DecodeResult},
    mesh::Mesh,
    plist::decode_polygon_list,
    vlist::decode_vertex_list,
    DecodeOptions,
};
use log::{debug, warn};

// Stream errors are kept with the mesh; anything else ends the decode.
fn downgrade(err: DecodeError, mesh: &mut Mesh) -> DecodeResult<()> {
    if err.is_fatal() {
        return Err(err);
    }
    warn!("{}", err);
    mesh.warnings.push(err);
    Ok(())
}

/// Decode the chunk model record at `offset`: a vertex list pointer followed
/// by a polygon list pointer. The vertex list is always read first, since
/// polygon chunks index into and color its vertices.
pub fn decode_chunk_model(
    cursor: &ByteCursor,
    offset: usize,
    options: &DecodeOptions,
) -> DecodeResult<Mesh> {
    let vlist_ptr = cursor.peek_u32(offset)?;
    let plist_ptr = cursor.peek_u32(offset + 4)?;

    let mut mesh = Mesh::default();
    if vlist_ptr != 0 {
        let base = cursor.resolve_pointer(vlist_ptr)?;
        if let Err(err) = decode_vertex_list(cursor, base, &mut mesh, options) {
            downgrade(err, &mut mesh)?;
        }
    }
    if plist_ptr != 0 {
        let base = cursor.resolve_pointer(plist_ptr)?;
        if let Err(err) = decode_polygon_list(cursor, base, &mut mesh, options) {
            downgrade(err, &mut mesh)?;
        }
    }

    debug!(
        "model at 0x{:X}: {} vertices, {} faces, {} warnings",
        offset,
        mesh.vertices.len(),
        mesh.faces.len(),
        mesh.warnings.len()
    );
    Ok(mesh)
}
