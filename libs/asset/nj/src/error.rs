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
use std::fmt;
use thiserror::Error;

pub type DecodeResult<T> = Result<T, DecodeError>;

// The two chunk streams hanging off of a chunk model record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    VertexList,
    PolygonList,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StreamKind::VertexList => write!(f, "vlist"),
            StreamKind::PolygonList => write!(f, "plist"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("read of {length} bytes at 0x{offset:X} overruns buffer of {buffer_size} bytes")]
    BufferOverrun {
        offset: usize,
        length: usize,
        buffer_size: usize,
    },

    #[error("unrecognized {stream} chunk type 0x{id:02X} at 0x{offset:X}")]
    UnrecognizedChunk {
        stream: StreamKind,
        id: u8,
        offset: usize,
    },

    #[error("pointer 0x{raw:08X} with base 0x{pointer_offset:08X} is outside of buffer of {buffer_size} bytes")]
    InvalidPointer {
        raw: u32,
        pointer_offset: u32,
        buffer_size: usize,
    },

    #[error("strip at 0x{offset:X} references vertex {index}, but only {vertex_count} are defined")]
    InvalidVertexIndex {
        index: usize,
        vertex_count: usize,
        offset: usize,
    },

    #[error("skipped unsupported container chunk {tag:?} at 0x{offset:X}")]
    UnsupportedContainer { tag: String, offset: usize },

    #[error("ignored {length} trailing bytes at 0x{offset:X}")]
    TrailingData { offset: usize, length: usize },

    #[error("object at 0x{offset:X} is nested deeper than {limit} levels")]
    DepthLimit { limit: usize, offset: usize },

    #[error("{what} starting at 0x{offset:X} ran past {limit} entries")]
    IterationLimit {
        what: &'static str,
        limit: usize,
        offset: usize,
    },
}

impl DecodeError {
    /// Fatal errors abort the whole decode; the rest are recorded as
    /// diagnostics next to whatever was decoded before they were hit.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            DecodeError::UnrecognizedChunk { .. }
                | DecodeError::UnsupportedContainer { .. }
                | DecodeError::TrailingData { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_errors_are_not_fatal() {
        let err = DecodeError::UnrecognizedChunk {
            stream: StreamKind::PolygonList,
            id: 0x99,
            offset: 0x40,
        };
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "unrecognized plist chunk type 0x99 at 0x40"
        );
    }

    #[test]
    fn bounds_errors_are_fatal() {
        let err = DecodeError::BufferOverrun {
            offset: 8,
            length: 4,
            buffer_size: 10,
        };
        assert!(err.is_fatal());
        assert!(DecodeError::InvalidPointer {
            raw: 0x10,
            pointer_offset: 0x20,
            buffer_size: 4,
        }
        .is_fatal());
    }
}
