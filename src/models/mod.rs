//! Decoded scene records (models, meshes, skeletons) and the vertex codecs
//! that turn their raw GPU buffers into canonical float attributes.

/// PS3 "Edge" geometry sub-codec (SPU streams, compressed indexes).
pub mod edge;
/// The mesh assembler: raw buffers + element descriptors → attribute arrays.
pub mod mesh;
/// Per-element vertex attribute codec covering the engine's format codes.
pub mod vertex_format;

use glam::{Mat4, Vec3};
use thiserror::Error;

pub use edge::{EdgeSpuConfig, EdgeVertexDescriptor};
pub use mesh::{DecodedMesh, MeshDecodeContext, decode_mesh};
pub use vertex_format::VertexElement;

/// Codec-level failures. These are surfaced per attribute (or per segment)
/// and degrade the affected mesh rather than aborting the file.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("vertex format code 0x{0:02X} has no decoder")]
    UnsupportedVertexFormat(u8),
    #[error("edge attribute format {0} has no decoder")]
    UnsupportedEdgeFormat(u8),
    #[error("edge index buffer uses compressed flavor {flavor}, which is not decodable")]
    CompressedEdgeIndexes { flavor: u8 },
    #[error("vertex data too short: need {need} bytes at offset {offset}, have {have}")]
    ShortVertexData {
        offset: usize,
        need: usize,
        have: usize,
    },
    #[error("invalid vertex stride")]
    InvalidStride,
}

/// How an index buffer is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveType {
    Points,
    Triangle,
    TriangleStrip,
    TriangleFan,
    TriangleQuads,
}

impl PrimitiveType {
    /// Map the on-disk primitive code; unknown codes are not decodable.
    pub fn from_code(code: i32) -> Option<PrimitiveType> {
        match code {
            0 => Some(PrimitiveType::Points),
            3 => Some(PrimitiveType::Triangle),
            4 => Some(PrimitiveType::TriangleStrip),
            5 => Some(PrimitiveType::TriangleFan),
            6 => Some(PrimitiveType::TriangleQuads),
            _ => None,
        }
    }
}

/// One skeleton joint.
///
/// `index` is the joint's blend-matrix slot; `inverse_bind_matrix` is stored
/// in the file already inverted (an inverse-bind transform) and must be
/// inverted back for posing.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BoneRecord {
    pub index: i32,
    pub name: String,
    pub parent_index: i32,
    pub translation: Vec3,
    pub inverse_bind_matrix: Option<Mat4>,
}

impl BoneRecord {
    pub fn bind_matrix(&self) -> Option<Mat4> {
        self.inverse_bind_matrix.map(|m| m.inverse())
    }

    /// Joint position: the bind matrix translation when a matrix is present,
    /// otherwise the local translation read from the bone record.
    pub fn position(&self) -> Vec3 {
        match self.bind_matrix() {
            Some(m) => m.w_axis.truncate(),
            None => self.translation,
        }
    }
}

/// A PS3 Edge geometry sub-mesh chunk. Segments of one mesh are concatenated
/// in vertex order, with index buffers rebased by the running vertex count.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Ps3EdgeSegment {
    pub spu_config: EdgeSpuConfig,
    /// SPU double-buffered streams 0/1, the RSX-only stream, and the skin
    /// index/weight buffer.
    pub vertex_buffers: [Vec<u8>; 4],
    pub vertex_strides: [u32; 3],
    /// Raw index data as stored; decoded on demand by the assembler since
    /// some flavors are SPU-compressed.
    pub compressed_index_buffer: Vec<u8>,
    pub vertex_element_blocks: [EdgeVertexDescriptor; 3],
}

/// One drawable mesh, holding raw buffers plus the descriptors needed to
/// decode them. Geometry is materialized lazily via [`mesh::decode_mesh`].
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MeshObject {
    pub name: String,
    pub vertex_buffers: Vec<Vec<u8>>,
    /// Total vertex size per buffer, as reported by the vertex format record.
    pub vertex_strides: Vec<u32>,
    /// Per-stream strides; a single-stream format collapses to one entry.
    pub vertex_streams: Vec<u32>,
    pub vertex_count: u32,
    pub index_buffer: Vec<u8>,
    pub index_count: u32,
    pub primitive: Option<PrimitiveType>,
    pub vertex_elements: Vec<VertexElement>,
    /// Which entry of the owning model's bone-map list skins this mesh.
    pub bone_map_index: usize,
    /// Fixed-point scale words for pack-scaled elements (version >= 6).
    pub pack_data: Option<Vec<u8>>,
    /// Platform id recorded in the vertex format (not the file's platform).
    pub platform: u32,
    pub is_ps3: bool,
    pub ps3_segments: Vec<Ps3EdgeSegment>,
}

impl MeshObject {
    pub fn new() -> MeshObject {
        MeshObject::default()
    }
}

/// A decoded model: one entry per designated model-root node in the graph.
///
/// `id` is the originating object's file offset and doubles as the identity
/// used to skip duplicate creation when the graph revisits a shared root.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ModelObject {
    pub id: u64,
    pub meshes: Vec<MeshObject>,
    pub bone_list: Vec<BoneRecord>,
    /// Raw inverse-joint matrix blob (0x40 bytes per joint).
    pub bone_matrices: Vec<u8>,
    pub bone_id_list: Vec<i32>,
    /// Per-mesh bone index remapping tables.
    pub bone_map_list: Vec<Vec<i32>>,
}

impl ModelObject {
    pub fn new(id: u64) -> ModelObject {
        ModelObject {
            id,
            ..ModelObject::default()
        }
    }
}
