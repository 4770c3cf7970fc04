//! PS3 "Edge" geometry sub-codec.
//!
//! Edge meshes are split into SPU-sized segments, each with double-buffered
//! SPU vertex streams, an RSX-only stream, a skin index/weight buffer and its
//! own compact attribute descriptors. The attribute format table is
//! independent from the main vertex codec and everything here is big-endian
//! (the format only ever shipped on PS3).

use glam::Vec4;
use half::f16;
use winnow::Parser;
use winnow::binary::{be_u16, be_u32};
use winnow::error::ContextError;

use crate::models::CodecError;

/// Skinning flavors carried in the low nibble of
/// [`EdgeSpuConfig::indexes_flavor_and_skinning_flavor`].
pub mod skin {
    pub const NONE: u8 = 0;
    pub const NO_SCALING: u8 = 1;
    pub const UNIFORM_SCALING: u8 = 2;
    pub const NON_UNIFORM_SCALING: u8 = 3;
    pub const SINGLE_BONE_NO_SCALING: u8 = 4;
    pub const SINGLE_BONE_UNIFORM_SCALING: u8 = 5;
    pub const SINGLE_BONE_NON_UNIFORM_SCALING: u8 = 6;
}

/// Edge attribute ids used by the assembler.
pub mod attribute_id {
    pub const POSITION: u8 = 1;
    pub const UV0: u8 = 5;
    pub const COLOR: u8 = 9;
}

type WResult<T> = Result<T, winnow::error::ErrMode<ContextError>>;

/// The per-segment SPU configuration block (16 bytes on disk), plus the
/// skin-matrix window fields that live in the owning segment record.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EdgeSpuConfig {
    pub flags_and_uniform_table_count: u8,
    pub command_buffer_hole_size: u8,
    pub input_vertex_format_id: u8,
    pub secondary_input_vertex_format_id: u8,
    pub output_vertex_format_id: u8,
    pub vertex_delta_format_id: u8,
    pub indexes_flavor_and_skinning_flavor: u8,
    pub skinning_matrix_format: u8,
    pub num_vertexes: u16,
    pub num_indexes: u16,
    pub indexes_offset: u32,
    /// Primary and overflow skin-matrix windows (byte offsets/sizes into the
    /// SPU matrix area, 0x30 bytes per matrix).
    pub skin_matrix_offset0: u16,
    pub skin_matrix_offset1: u16,
    pub skin_matrix_size0: u16,
    pub skin_matrix_size1: u16,
}

fn parse_spu_config(input: &mut &[u8]) -> WResult<EdgeSpuConfig> {
    let fixed: &[u8] = winnow::token::take(8usize).parse_next(input)?;
    let num_vertexes = be_u16.parse_next(input)?;
    let num_indexes = be_u16.parse_next(input)?;
    let indexes_offset = be_u32.parse_next(input)?;
    Ok(EdgeSpuConfig {
        flags_and_uniform_table_count: fixed[0],
        command_buffer_hole_size: fixed[1],
        input_vertex_format_id: fixed[2],
        secondary_input_vertex_format_id: fixed[3],
        output_vertex_format_id: fixed[4],
        vertex_delta_format_id: fixed[5],
        indexes_flavor_and_skinning_flavor: fixed[6],
        skinning_matrix_format: fixed[7],
        num_vertexes,
        num_indexes,
        indexes_offset,
        ..EdgeSpuConfig::default()
    })
}

impl EdgeSpuConfig {
    pub fn parse(data: &[u8]) -> Result<EdgeSpuConfig, CodecError> {
        parse_spu_config(&mut &data[..]).map_err(|_| CodecError::ShortVertexData {
            offset: 0,
            need: 16,
            have: data.len(),
        })
    }

    pub fn skinning_flavor(&self) -> u8 {
        self.indexes_flavor_and_skinning_flavor & 0xF
    }

    pub fn index_flavor(&self) -> u8 {
        self.indexes_flavor_and_skinning_flavor >> 4
    }

    pub fn is_single_bone(&self) -> bool {
        matches!(
            self.skinning_flavor(),
            skin::SINGLE_BONE_NO_SCALING
                | skin::SINGLE_BONE_UNIFORM_SCALING
                | skin::SINGLE_BONE_NON_UNIFORM_SCALING
        )
    }
}

/// One attribute of one Edge stream (8 bytes on disk, all byte-sized fields).
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EdgeAttributeBlock {
    pub offset: u8,
    pub format: u8,
    pub component_count: u8,
    pub edge_attribute_id: u8,
    pub size: u8,
    pub vertex_program_slot_index: u8,
    pub fixed_block_offset: u8,
    pub padding: u8,
}

impl EdgeAttributeBlock {
    pub fn parse(data: &[u8]) -> Result<EdgeAttributeBlock, CodecError> {
        if data.len() < 8 {
            return Err(CodecError::ShortVertexData {
                offset: 0,
                need: 8,
                have: data.len(),
            });
        }
        Ok(EdgeAttributeBlock {
            offset: data[0],
            format: data[1],
            component_count: data[2],
            edge_attribute_id: data[3],
            size: data[4],
            vertex_program_slot_index: data[5],
            fixed_block_offset: data[6],
            padding: data[7],
        })
    }

    /// Decode this attribute for `vertex_count` vertices of `buffer`.
    pub fn unpack(
        &self,
        buffer: &[u8],
        vertex_count: usize,
        stride: usize,
    ) -> Result<Vec<Vec4>, CodecError> {
        if stride == 0 {
            return Err(CodecError::InvalidStride);
        }
        let mut out = Vec::with_capacity(vertex_count);
        for i in 0..vertex_count {
            let vertex =
                buffer
                    .get(i * stride..(i + 1) * stride)
                    .ok_or(CodecError::ShortVertexData {
                        offset: i * stride,
                        need: stride,
                        have: buffer.len(),
                    })?;
            out.push(self.unpack_vertex(vertex)?);
        }
        Ok(out)
    }

    fn unpack_vertex(&self, vertex: &[u8]) -> Result<Vec4, CodecError> {
        let offset = self.offset as usize;

        // Positions with a 4th component are SHORT4 with a homogeneous
        // divide, mirroring the main codec's behavior for that layout.
        if self.edge_attribute_id == attribute_id::POSITION && self.component_count == 4 {
            let mut s = [0f32; 4];
            for (i, value) in s.iter_mut().enumerate() {
                *value = f32::from(be_i16_at(vertex, offset + 2 * i)?);
            }
            let w = if s[3] == 0.0 { 1.0 } else { s[3] };
            return Ok(Vec4::new(s[0] / w, s[1] / w, s[2] / w, s[3]));
        }

        // X11Y11Z10N packs all three components into one dword.
        if self.format == 6 {
            let raw = be_u32_at(vertex, offset)?;
            return Ok(Vec4::new(
                (raw & 0x7FF) as f32 / 0x7FF as f32,
                ((raw >> 11) & 0x7FF) as f32 / 0x7FF as f32,
                (raw >> 22) as f32 / 0x3FF as f32,
                1.0,
            ));
        }

        let size = component_size(self.format)
            .ok_or(CodecError::UnsupportedEdgeFormat(self.format))?;
        let mut out = Vec4::new(0.0, 0.0, 0.0, 1.0);
        for i in 0..4usize {
            if i < self.component_count as usize {
                out[i] = decode_component(self.format, vertex, offset + size * i)?;
            }
        }
        Ok(out)
    }
}

/// Bytes per component for each Edge format code. `None` marks the reserved
/// or fixed-point formats this codec cannot decode.
fn component_size(format: u8) -> Option<usize> {
    match format {
        1 => Some(2), // I16N
        2 => Some(4), // F32
        3 => Some(2), // F16
        4 => Some(1), // U8N
        5 => Some(2), // I16
        6 => Some(4), // X11Y11Z10N
        7 => Some(1), // U8
        _ => None,
    }
}

fn decode_component(format: u8, data: &[u8], offset: usize) -> Result<f32, CodecError> {
    match format {
        1 => Ok(f32::from(be_i16_at(data, offset)?) / 0x7FFF as f32),
        2 => Ok(f32::from_bits(be_u32_at(data, offset)?)),
        3 => Ok(f16::from_bits(be_u16_at(data, offset)?).to_f32()),
        4 => Ok(f32::from(u8_at(data, offset)?) / 0x7F as f32),
        5 => Ok(f32::from(be_i16_at(data, offset)?)),
        7 => Ok(f32::from(u8_at(data, offset)?)),
        other => Err(CodecError::UnsupportedEdgeFormat(other)),
    }
}

fn u8_at(data: &[u8], offset: usize) -> Result<u8, CodecError> {
    data.get(offset)
        .copied()
        .ok_or(CodecError::ShortVertexData {
            offset,
            need: 1,
            have: data.len(),
        })
}

fn be_u16_at(data: &[u8], offset: usize) -> Result<u16, CodecError> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes(b.try_into().unwrap()))
        .ok_or(CodecError::ShortVertexData {
            offset,
            need: 2,
            have: data.len(),
        })
}

fn be_i16_at(data: &[u8], offset: usize) -> Result<i16, CodecError> {
    Ok(be_u16_at(data, offset)? as i16)
}

fn be_u32_at(data: &[u8], offset: usize) -> Result<u32, CodecError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes(b.try_into().unwrap()))
        .ok_or(CodecError::ShortVertexData {
            offset,
            need: 4,
            have: data.len(),
        })
}

/// The per-stream vertex layout: attribute count, stride, and one
/// [`EdgeAttributeBlock`] per attribute.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EdgeVertexDescriptor {
    pub attribute_count: u8,
    pub vertex_stride: u8,
    pub elements: Vec<EdgeAttributeBlock>,
}

impl EdgeVertexDescriptor {
    /// Parse a descriptor block. An empty slice is a valid "no stream here"
    /// descriptor.
    pub fn parse(data: &[u8]) -> Result<EdgeVertexDescriptor, CodecError> {
        if data.is_empty() {
            return Ok(EdgeVertexDescriptor::default());
        }
        let attribute_count = data[0];
        let vertex_stride = *data.get(1).unwrap_or(&0);
        let mut elements = Vec::with_capacity(attribute_count as usize);
        for i in 0..attribute_count as usize {
            let start = (i + 1) * 0x08;
            let block = data
                .get(start..start + 0x08)
                .ok_or(CodecError::ShortVertexData {
                    offset: start,
                    need: 0x08,
                    have: data.len(),
                })?;
            elements.push(EdgeAttributeBlock::parse(block)?);
        }
        Ok(EdgeVertexDescriptor {
            attribute_count,
            vertex_stride,
            elements,
        })
    }
}

/// Decode an Edge segment's index data.
///
/// Flavors 0 and 1 are plain big-endian u16 triangle lists (clockwise and
/// counter-clockwise winding). Flavors 2 and 3 are the SPU-compressed form,
/// which is not publicly documented; those fail explicitly rather than
/// producing synthetic topology.
pub fn decode_edge_indices(
    data: &[u8],
    index_count: usize,
    flavor: u8,
) -> Result<Vec<u32>, CodecError> {
    match flavor {
        0 | 1 => {
            let need = index_count * 2;
            if data.len() < need {
                return Err(CodecError::ShortVertexData {
                    offset: 0,
                    need,
                    have: data.len(),
                });
            }
            Ok((0..index_count)
                .map(|i| u32::from(u16::from_be_bytes([data[i * 2], data[i * 2 + 1]])))
                .collect())
        }
        other => Err(CodecError::CompressedEdgeIndexes { flavor: other }),
    }
}
