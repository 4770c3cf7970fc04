//! Low-level file access: the byte cursor and the container loader.

/// Container header, pointer-segment table and fixup-section parsing.
pub mod container;
/// Endian-aware seekable reader used by the object-graph walker.
pub mod cursor;

pub use container::{Container, ContainerError, MemoryRef, VectorRef};
pub use cursor::{ByteCursor, CursorError};

/// Byte order of every multi-byte value in a container.
///
/// Two magics are accepted at offset 0; the byte-swapped one flips this for
/// the whole file (Wii, Xbox 360 and PS3 containers are big-endian).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    pub(crate) fn to_winnow(self) -> winnow::binary::Endianness {
        match self {
            Endianness::Little => winnow::binary::Endianness::Little,
            Endianness::Big => winnow::binary::Endianness::Big,
        }
    }
}
