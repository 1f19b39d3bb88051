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
    object::{ObjectDecoder, SceneNode},
    DecodeOptions, SceneGraph,
};
use log::{debug, trace, warn};

pub const NJCM_TAG: &[u8; 4] = b"NJCM";
pub const NJBM_TAG: &[u8; 4] = b"NJBM";

// 4 byte tag, then a u32 payload length.
const CONTAINER_HEADER_SIZE: usize = 8;

/// Walk the IFF style containers in `data`, decoding each NJCM payload as an
/// object tree whose root record sits at the start of the payload. Every other
/// container is skipped and noted in the graph's diagnostics.
pub(crate) fn decode_containers(data: &[u8], options: &DecodeOptions) -> DecodeResult<SceneGraph> {
    let mut graph = SceneGraph::default();
    let mut cursor = ByteCursor::new(data, options.pointer_offset);
    while !cursor.is_at_end() {
        let offset = cursor.position();
        if cursor.slice(offset, CONTAINER_HEADER_SIZE).is_err() {
            let err = DecodeError::TrailingData {
                offset,
                length: data.len() - offset,
            };
            debug!("{}", err);
            graph.diagnostics.push(err);
            break;
        }
        let tag = cursor.read_bytes(4)?;
        let size = cursor.read_u32()? as usize;
        let payload_start = cursor.position();
        trace!(
            "container {} at 0x{:X}, {} bytes",
            String::from_utf8_lossy(tag),
            offset,
            size
        );

        if tag == NJCM_TAG {
            let payload = cursor.slice(payload_start, size)?;
            let roots = decode_tree(payload, 0, options, &mut graph.meshes)?;
            graph.roots.extend(roots);
        } else {
            let err = DecodeError::UnsupportedContainer {
                tag: String::from_utf8_lossy(tag).into_owned(),
                offset,
            };
            // Basic models carry geometry we drop; anything else is usually
            // texture lists or relocation tables.
            if tag == NJBM_TAG {
                warn!("{}", err);
            } else {
                debug!("{}", err);
            }
            graph.diagnostics.push(err);
        }

        // A skipped record may claim more than the file holds; nothing after
        // it can be found, so stop with what has been decoded.
        match payload_start.checked_add(size) {
            Some(end) if end <= data.len() => cursor.seek(end),
            _ => break,
        }
    }
    Ok(graph)
}

/// Decode the object tree rooted at `object_offset`, appending its meshes to
/// `meshes`. Returns the root object followed by its siblings.
pub(crate) fn decode_tree(
    data: &[u8],
    object_offset: usize,
    options: &DecodeOptions,
    meshes: &mut Vec<Mesh>,
) -> DecodeResult<Vec<SceneNode>> {
    let cursor = ByteCursor::new(data, options.pointer_offset);
    ObjectDecoder::new(cursor, options, meshes).decode_chain(object_offset, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ChunkWriter;

    fn single_object() -> Vec<u8> {
        let mut w = ChunkWriter::default();
        w.object(0, 0, [0.0; 3], [0; 3], [1.0; 3], 0, 0);
        w.into_bytes()
    }

    #[test]
    fn it_skips_unknown_containers() -> DecodeResult<()> {
        let mut w = ChunkWriter::default();
        w.container(b"NJTL", &[1, 2, 3, 4, 5, 6]);
        w.container(NJCM_TAG, &single_object());
        w.container(b"POF0", &[0xFF; 3]);

        let graph = decode_containers(&w.into_bytes(), &DecodeOptions::default())?;
        assert_eq!(graph.roots.len(), 1);
        assert_eq!(graph.diagnostics.len(), 2);
        assert!(matches!(
            &graph.diagnostics[0],
            DecodeError::UnsupportedContainer { tag, offset: 0 } if tag == "NJTL"
        ));
        assert!(matches!(
            &graph.diagnostics[1],
            DecodeError::UnsupportedContainer { tag, .. } if tag == "POF0"
        ));
        Ok(())
    }

    #[test]
    fn basic_models_are_reported() -> DecodeResult<()> {
        let mut w = ChunkWriter::default();
        w.container(NJBM_TAG, &single_object());

        let graph = decode_containers(&w.into_bytes(), &DecodeOptions::default())?;
        assert!(graph.roots.is_empty());
        assert_eq!(graph.diagnostics.len(), 1);
        assert!(!graph.diagnostics[0].is_fatal());
        Ok(())
    }

    #[test]
    fn each_container_gets_its_own_roots() -> DecodeResult<()> {
        let mut w = ChunkWriter::default();
        w.container(NJCM_TAG, &single_object());
        w.container(NJCM_TAG, &single_object());

        let graph = decode_containers(&w.into_bytes(), &DecodeOptions::default())?;
        assert_eq!(graph.roots.len(), 2);
        assert!(graph.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn empty_input_is_an_empty_graph() -> DecodeResult<()> {
        let graph = decode_containers(&[], &DecodeOptions::default())?;
        assert!(graph.roots.is_empty());
        assert!(graph.meshes.is_empty());
        Ok(())
    }

    #[test]
    fn truncated_model_containers_overrun() {
        let mut w = ChunkWriter::default();
        w.bytes(NJCM_TAG);
        w.u32(0x100);
        w.bytes(&[0; 8]);
        let err = decode_containers(&w.into_bytes(), &DecodeOptions::default());
        assert!(matches!(err, Err(DecodeError::BufferOverrun { .. })));
    }

    #[test]
    fn trailing_bytes_keep_earlier_roots() -> DecodeResult<()> {
        let mut w = ChunkWriter::default();
        w.container(NJCM_TAG, &single_object());
        w.bytes(&[0; 4]);
        let graph = decode_containers(&w.into_bytes(), &DecodeOptions::default())?;
        assert_eq!(graph.roots.len(), 1);
        assert_eq!(
            graph.diagnostics,
            vec![DecodeError::TrailingData {
                offset: 60,
                length: 4
            }]
        );
        assert!(!graph.diagnostics[0].is_fatal());

        let graph = decode_containers(b"NJCM\x01", &DecodeOptions::default())?;
        assert!(graph.roots.is_empty());
        assert_eq!(graph.diagnostics.len(), 1);
        Ok(())
    }

    #[test]
    fn short_skipped_records_end_the_scan() -> DecodeResult<()> {
        let mut w = ChunkWriter::default();
        w.container(NJCM_TAG, &single_object());
        w.bytes(b"POF0");
        w.u32(64);
        w.bytes(&[0; 4]);
        let graph = decode_containers(&w.into_bytes(), &DecodeOptions::default())?;
        assert_eq!(graph.roots.len(), 1);
        assert_eq!(graph.diagnostics.len(), 1);
        assert!(matches!(
            &graph.diagnostics[0],
            DecodeError::UnsupportedContainer { tag, offset: 60 } if tag == "POF0"
        ));
        Ok(())
    }
}
