//! Mesh assembler: decodes a [`MeshObject`]'s raw vertex/index buffers into
//! parallel attribute arrays, on demand.
//!
//! Codec failures here never abort the mesh; a failed attribute is logged
//! and left empty so the remaining attributes stay usable.

use glam::{Vec2, Vec3, Vec4};
use itertools::Itertools;
use tracing::{debug, warn};

use crate::data::Endianness;
use crate::models::edge::{self, EdgeAttributeBlock, attribute_id};
use crate::models::vertex_format::{VertexFormatCode, usage};
use crate::models::{CodecError, MeshObject, PrimitiveType, Ps3EdgeSegment};

/// File-level context a mesh needs for decoding but does not own.
#[derive(Debug, Clone, Copy)]
pub struct MeshDecodeContext<'a> {
    /// The owning model's bone-map list; `MeshObject::bone_map_index`
    /// selects the entry that skins this mesh.
    pub bone_maps: &'a [Vec<i32>],
    pub endianness: Endianness,
    pub version: u32,
    /// The container's platform id (distinct from the vertex format's
    /// platform field).
    pub platform: u32,
    pub build_bones: bool,
    pub build_faces: bool,
}

/// Canonical decoded geometry: parallel arrays indexed by vertex, plus
/// triangle indices.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DecodedMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Vec4>,
    pub weights: Vec<[f32; 4]>,
    pub bone_indices: Vec<[u16; 4]>,
    pub triangles: Vec<[u32; 3]>,
}

/// SuperChargers packs some position streams as 3 coordinates + a per-vertex
/// divisor, all i16.
const PACKED_POSITION_FORMAT: u8 = VertexFormatCode::Short4n as u8;
/// Elements with this format code are skipped outright.
const SKIPPED_FORMAT: u8 = VertexFormatCode::Unused as u8;

/// Decode a mesh into attribute arrays. Infallible by design: every codec
/// failure degrades to a missing attribute (or missing faces) with a log
/// line, matching the per-attribute error policy of the format.
pub fn decode_mesh(mesh: &MeshObject, ctx: &MeshDecodeContext) -> DecodedMesh {
    if mesh.is_ps3 {
        decode_ps3_mesh(mesh, ctx)
    } else {
        decode_standard_mesh(mesh, ctx)
    }
}

fn decode_standard_mesh(mesh: &MeshObject, ctx: &MeshDecodeContext) -> DecodedMesh {
    let mut out = DecodedMesh::default();
    let vertex_count = mesh.vertex_count as usize;
    if vertex_count == 0 || mesh.vertex_buffers.is_empty() {
        return out;
    }

    let endian = ctx.endianness;
    let mut buffer: &[u8] = &mesh.vertex_buffers[0];

    // Wii vertex buffers with a 0x009F marker carry a 4-byte prefix.
    if ctx.platform == 2
        && buffer.len() >= 4
        && u16::from_be_bytes([buffer[0], buffer[1]]) == 0x9F
    {
        buffer = &buffer[4..];
    }

    let pack_data: Option<&[u8]> = if ctx.version >= 6 {
        mesh.pack_data.as_deref()
    } else {
        // Pre-version-6 files keep the scale words at the tail of the vertex
        // buffer; the largest pack offset over scaled elements locates them.
        let pack_offset = mesh
            .vertex_elements
            .iter()
            .filter(|e| e.format_code != SKIPPED_FORMAT && e.pack_type_and_frac_hint & 7 == 2)
            .map(|e| e.pack_data_offset as usize)
            .max()
            .unwrap_or(0);
        buffer
            .len()
            .checked_sub(pack_offset + 4)
            .map(|start| &buffer[start..])
    };

    for element in &mesh.vertex_elements {
        if element.format_code == SKIPPED_FORMAT {
            continue;
        }
        let Some(&stream_stride) = mesh.vertex_streams.get(element.stream as usize) else {
            warn!(stream = element.stream, "element references a missing stream");
            continue;
        };
        let stream_stride = stream_stride as usize;

        // Streams are packed back to back, each rounded up to 32 bytes.
        let stream_offset: usize = mesh.vertex_streams[..element.stream as usize]
            .iter()
            .map(|&s| (s as usize * vertex_count).next_multiple_of(0x20))
            .sum();
        let stream_end = stream_offset + vertex_count * stream_stride;
        let Some(stream) = buffer.get(stream_offset..stream_end) else {
            warn!(
                usage = element.usage,
                stream_offset, stream_end, "vertex stream out of bounds, skipping attribute"
            );
            continue;
        };

        let attribute = match element.usage {
            usage::POSITION => {
                let positions = if element.format_code == PACKED_POSITION_FORMAT {
                    packed_positions(mesh, buffer, endian)
                } else {
                    element
                        .unpack(stream, stream_stride, pack_data, endian)
                        .map(|vals| vals.into_iter().map(|v| v.truncate()).collect())
                };
                match positions {
                    Ok(positions) => {
                        out.positions = positions;
                        continue;
                    }
                    Err(e) => Err(e),
                }
            }
            usage::NORMAL => element
                .unpack(stream, stream_stride, pack_data, endian)
                .map(|vals| {
                    out.normals = vals.into_iter().map(|v| v.truncate()).collect();
                }),
            usage::COLOR => element
                .unpack(stream, stream_stride, pack_data, endian)
                .map(|vals| {
                    out.colors = vals;
                }),
            usage::TEXCOORD if element.usage_index == 0 => element
                .unpack(stream, stream_stride, pack_data, endian)
                .map(|vals| {
                    out.uvs = vals.into_iter().map(|v| Vec2::new(v.x, v.y)).collect();
                }),
            usage::BLENDWEIGHTS if element.usage_index == 0 && ctx.build_bones => element
                .unpack(stream, stream_stride, pack_data, endian)
                .map(|vals| {
                    out.weights = vals
                        .iter()
                        .map(|v| padded_components(v, element.component_count))
                        .map(normalize_weights(0.01))
                        .collect();
                }),
            usage::BLENDINDICES if element.usage_index == 0 && ctx.build_bones => element
                .unpack(stream, stream_stride, pack_data, endian)
                .map(|vals| {
                    out.bone_indices = vals
                        .iter()
                        .map(|v| {
                            let w = padded_components(v, element.component_count);
                            w.map(|f| f.clamp(0.0, f32::from(u16::MAX)) as u16)
                        })
                        .collect();
                }),
            _ => continue,
        };
        if let Err(e) = attribute {
            warn!(usage = element.usage, error = %e, "attribute decode failed");
        }
    }

    if ctx.build_faces {
        out.triangles = decode_faces(mesh, ctx);
    }
    out
}

/// SuperChargers packed position stream: x/y/z/divisor as i16 quads read
/// with the top-level vertex stride.
fn packed_positions(
    mesh: &MeshObject,
    buffer: &[u8],
    endian: Endianness,
) -> Result<Vec<Vec3>, CodecError> {
    let stride = *mesh.vertex_strides.first().unwrap_or(&0) as usize;
    if stride < 8 {
        return Err(CodecError::InvalidStride);
    }
    let read_i16 = |bytes: [u8; 2]| match endian {
        Endianness::Little => i16::from_le_bytes(bytes),
        Endianness::Big => i16::from_be_bytes(bytes),
    };
    let mut positions = Vec::with_capacity(mesh.vertex_count as usize);
    for i in 0..mesh.vertex_count as usize {
        let base = i * stride;
        let vertex = buffer
            .get(base..base + 8)
            .ok_or(CodecError::ShortVertexData {
                offset: base,
                need: 8,
                have: buffer.len(),
            })?;
        let coord = [
            read_i16([vertex[0], vertex[1]]),
            read_i16([vertex[2], vertex[3]]),
            read_i16([vertex[4], vertex[5]]),
        ];
        let divisor = read_i16([vertex[6], vertex[7]]);
        let divisor = if divisor == 0 { 1.0 } else { f32::from(divisor) };
        positions.push(Vec3::new(
            f32::from(coord[0]) / divisor,
            f32::from(coord[1]) / divisor,
            f32::from(coord[2]) / divisor,
        ));
    }
    Ok(positions)
}

fn padded_components(value: &Vec4, count: u8) -> [f32; 4] {
    let mut padded = [0.0f32; 4];
    for i in 0..(count as usize).min(4) {
        padded[i] = value[i];
    }
    padded
}

/// Renormalize a weight quad whose sum drifted outside the tolerance.
fn normalize_weights(tolerance: f32) -> impl Fn([f32; 4]) -> [f32; 4] {
    move |weights| {
        let sum: f32 = weights.iter().sum();
        if sum > 0.001 && (sum - 1.0).abs() > tolerance {
            weights.map(|w| w / sum)
        } else {
            weights
        }
    }
}

fn decode_faces(mesh: &MeshObject, ctx: &MeshDecodeContext) -> Vec<[u32; 3]> {
    let index_count = mesh.index_count as usize;
    if index_count == 0 {
        return Vec::new();
    }
    // Index width follows the addressable vertex range.
    let wide = mesh.vertex_count > 0xFFFF;
    let indices = read_indices(&mesh.index_buffer, index_count, wide, ctx.endianness);

    match mesh.primitive {
        Some(PrimitiveType::TriangleStrip) => {
            let restart = if wide { u32::MAX } else { u32::from(u16::MAX) };
            expand_triangle_strip(&indices, restart)
        }
        _ => indices
            .iter()
            .copied()
            .tuples()
            .map(|(a, b, c)| [a, b, c])
            .collect(),
    }
}

fn read_indices(buffer: &[u8], count: usize, wide: bool, endian: Endianness) -> Vec<u32> {
    let width = if wide { 4 } else { 2 };
    let available = buffer.len() / width;
    if available < count {
        warn!(count, available, "index buffer is short, truncating");
    }
    let count = count.min(available);
    (0..count)
        .map(|i| {
            let at = i * width;
            if wide {
                let b = [buffer[at], buffer[at + 1], buffer[at + 2], buffer[at + 3]];
                match endian {
                    Endianness::Little => u32::from_le_bytes(b),
                    Endianness::Big => u32::from_be_bytes(b),
                }
            } else {
                let b = [buffer[at], buffer[at + 1]];
                u32::from(match endian {
                    Endianness::Little => u16::from_le_bytes(b),
                    Endianness::Big => u16::from_be_bytes(b),
                })
            }
        })
        .collect()
}

/// Expand a triangle strip into a triangle list: alternate winding per step,
/// drop degenerate triangles, and treat the all-ones sentinel as a primitive
/// restart.
fn expand_triangle_strip(indices: &[u32], restart: u32) -> Vec<[u32; 3]> {
    let mut triangles = Vec::new();
    for run in indices.split(|&i| i == restart) {
        for k in 0..run.len().saturating_sub(2) {
            let (a, b, c) = if k % 2 == 0 {
                (run[k], run[k + 1], run[k + 2])
            } else {
                (run[k + 1], run[k], run[k + 2])
            };
            if a != b && b != c && a != c {
                triangles.push([a, b, c]);
            }
        }
    }
    triangles
}

// --- PS3 Edge path ----------------------------------------------------------

fn decode_ps3_mesh(mesh: &MeshObject, ctx: &MeshDecodeContext) -> DecodedMesh {
    let mut out = DecodedMesh::default();
    if mesh.ps3_segments.is_empty() {
        return out;
    }

    if let Some(positions) = batched_attribute(mesh, attribute_id::POSITION) {
        out.positions = positions.iter().map(|v| v.truncate()).collect();
    }
    if let Some(uvs) = batched_attribute(mesh, attribute_id::UV0) {
        out.uvs = uvs.iter().map(|v| Vec2::new(v.x, v.y)).collect();
    }
    if let Some(colors) = batched_attribute(mesh, attribute_id::COLOR) {
        out.colors = colors;
    }

    let bone_map_present = ctx
        .bone_maps
        .get(mesh.bone_map_index)
        .is_some_and(|map| !map.is_empty());
    if ctx.build_bones && bone_map_present {
        let mut weights = Vec::new();
        let mut indices = Vec::new();
        for segment in &mesh.ps3_segments {
            if let Some((w, i)) = segment_bone_buffers(segment) {
                weights.extend(w);
                indices.extend(i);
            }
        }
        out.weights = weights
            .iter()
            .map(|quad| quad.map(|w| f32::from(w) / 255.0))
            .map(normalize_weights(0.001))
            .collect();
        out.bone_indices = indices;
    }

    if ctx.build_faces {
        out.triangles = batched_ps3_faces(mesh);
    }
    out
}

/// Concatenate one attribute across all segments, in vertex order. Segments
/// lacking the attribute zero-fill their vertex range so later segments stay
/// aligned; if no segment carries it at all the attribute is absent.
fn batched_attribute(mesh: &MeshObject, attribute: u8) -> Option<Vec<Vec4>> {
    let mut batched = Vec::new();
    let mut any = false;
    for segment in &mesh.ps3_segments {
        let vertex_count = segment.spu_config.num_vertexes as usize;
        match segment_attribute(segment, attribute) {
            Some(Ok(values)) => {
                any = true;
                batched.extend(values);
            }
            Some(Err(e)) => {
                warn!(attribute, error = %e, "edge attribute decode failed, zero-filling");
                batched.extend(std::iter::repeat_n(Vec4::new(0.0, 0.0, 0.0, 1.0), vertex_count));
            }
            None => {
                batched.extend(std::iter::repeat_n(Vec4::new(0.0, 0.0, 0.0, 1.0), vertex_count));
            }
        }
    }
    any.then_some(batched)
}

fn segment_attribute(
    segment: &Ps3EdgeSegment,
    attribute: u8,
) -> Option<Result<Vec<Vec4>, CodecError>> {
    let vertex_count = segment.spu_config.num_vertexes as usize;

    // Positions with no descriptor on the primary SPU stream are plain
    // float3 at the start of that stream.
    if attribute == attribute_id::POSITION
        && segment.vertex_element_blocks[0].attribute_count == 0
    {
        let synthetic = EdgeAttributeBlock {
            format: 2,
            component_count: 3,
            edge_attribute_id: attribute_id::POSITION,
            ..EdgeAttributeBlock::default()
        };
        return Some(synthetic.unpack(&segment.vertex_buffers[0], vertex_count, 0x0C));
    }

    for (stream, descriptor) in segment.vertex_element_blocks.iter().enumerate() {
        if descriptor.attribute_count == 0 {
            continue;
        }
        for element in &descriptor.elements {
            if element.edge_attribute_id == attribute {
                return Some(element.unpack(
                    &segment.vertex_buffers[stream],
                    vertex_count,
                    segment.vertex_strides[stream] as usize,
                ));
            }
        }
    }
    None
}

/// Decode one segment's skin buffer into per-vertex weight/index quads,
/// remapping bone indices through the segment's two skin-matrix windows.
fn segment_bone_buffers(segment: &Ps3EdgeSegment) -> Option<(Vec<[u8; 4]>, Vec<[u16; 4]>)> {
    let config = &segment.spu_config;
    if config.skinning_flavor() == edge::skin::NONE {
        return None;
    }

    let vertex_count = config.num_vertexes as usize;
    let skin = &segment.vertex_buffers[3];
    // Windows are byte offsets into the 0x30-byte-per-matrix SPU area.
    let window0_base = u32::from(config.skin_matrix_offset0 / 0x30);
    let window1_base = u32::from(config.skin_matrix_offset1 / 0x30);
    let window0_size = u32::from(config.skin_matrix_size0 / 0x30);

    if config.is_single_bone() {
        if skin.len() < vertex_count {
            warn!(
                have = skin.len(),
                need = vertex_count,
                "single-bone skin buffer is short"
            );
            return None;
        }
        let weights = vec![[0xFF, 0, 0, 0]; vertex_count];
        let indices = (0..vertex_count)
            .map(|i| [(u32::from(skin[i]) + window0_base) as u16, 0, 0, 0])
            .collect();
        return Some((weights, indices));
    }

    if skin.len() < vertex_count * 8 {
        warn!(
            have = skin.len(),
            need = vertex_count * 8,
            "skin buffer is short"
        );
        return None;
    }
    let mut weights = Vec::with_capacity(vertex_count);
    let mut indices = Vec::with_capacity(vertex_count);
    for i in 0..vertex_count {
        let mut weight_quad = [0u8; 4];
        let mut index_quad = [0u16; 4];
        for j in 0..4 {
            weight_quad[j] = skin[i * 8 + j * 2];
            let raw = u32::from(skin[i * 8 + j * 2 + 1]);
            let mapped = if raw < window0_size {
                raw + window0_base
            } else {
                (raw + window1_base).saturating_sub(window0_size)
            };
            index_quad[j] = mapped as u16;
        }
        weights.push(weight_quad);
        indices.push(index_quad);
    }
    Some((weights, indices))
}

/// Concatenate segment index buffers, rebasing each by the running vertex
/// count. Any undecodable segment drops the whole face list; partial
/// topology would silently stitch across unrelated segments.
fn batched_ps3_faces(mesh: &MeshObject) -> Vec<[u32; 3]> {
    let mut indices: Vec<u32> = Vec::new();
    let mut base = 0u32;
    for segment in &mesh.ps3_segments {
        let config = &segment.spu_config;
        match edge::decode_edge_indices(
            &segment.compressed_index_buffer,
            config.num_indexes as usize,
            config.index_flavor(),
        ) {
            Ok(segment_indices) => {
                indices.extend(segment_indices.iter().map(|&i| i + base));
            }
            Err(e) => {
                debug!(error = %e, "edge index decode failed, dropping faces");
                return Vec::new();
            }
        }
        base += u32::from(config.num_vertexes);
    }
    indices
        .iter()
        .copied()
        .tuples()
        .map(|(a, b, c)| [a, b, c])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::edge::EdgeSpuConfig;
    use crate::models::vertex_format::VertexElement;

    fn ctx(bone_maps: &[Vec<i32>]) -> MeshDecodeContext<'_> {
        MeshDecodeContext {
            bone_maps,
            endianness: Endianness::Little,
            version: 9,
            platform: 1,
            build_bones: true,
            build_faces: true,
        }
    }

    fn float3_position_mesh() -> MeshObject {
        let mut buffer = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for f in v {
                buffer.extend_from_slice(&f.to_le_bytes());
            }
        }
        let mut index_buffer = Vec::new();
        for i in [0u16, 1, 2] {
            index_buffer.extend_from_slice(&i.to_le_bytes());
        }
        MeshObject {
            vertex_buffers: vec![buffer],
            vertex_strides: vec![12],
            vertex_streams: vec![12],
            vertex_count: 3,
            index_buffer,
            index_count: 3,
            primitive: Some(PrimitiveType::Triangle),
            vertex_elements: vec![VertexElement {
                format_code: VertexFormatCode::Float3 as u8,
                usage: usage::POSITION,
                component_count: 3,
                ..VertexElement::default()
            }],
            ..MeshObject::default()
        }
    }

    #[test]
    fn decodes_float3_positions_and_triangles() {
        let mesh = float3_position_mesh();
        let decoded = decode_mesh(&mesh, &ctx(&[]));
        assert_eq!(decoded.positions.len(), 3);
        assert_eq!(decoded.positions[1], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(decoded.triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn build_faces_false_skips_indices() {
        let mesh = float3_position_mesh();
        let mut context = ctx(&[]);
        context.build_faces = false;
        let decoded = decode_mesh(&mesh, &context);
        assert!(decoded.triangles.is_empty());
        assert_eq!(decoded.positions.len(), 3);
    }

    #[test]
    fn unknown_attribute_format_degrades_to_partial_mesh() {
        let mut mesh = float3_position_mesh();
        mesh.vertex_elements.push(VertexElement {
            format_code: 0x40,
            usage: usage::COLOR,
            component_count: 4,
            ..VertexElement::default()
        });
        let decoded = decode_mesh(&mesh, &ctx(&[]));
        // positions still decode; colors are simply absent
        assert_eq!(decoded.positions.len(), 3);
        assert!(decoded.colors.is_empty());
    }

    #[test]
    fn wii_marker_prefix_is_stripped() {
        let mut mesh = float3_position_mesh();
        let mut prefixed = vec![0x00, 0x9F, 0x00, 0x00];
        prefixed.extend_from_slice(&mesh.vertex_buffers[0]);
        mesh.vertex_buffers[0] = prefixed;
        let mut context = ctx(&[]);
        context.platform = 2;
        let decoded = decode_mesh(&mesh, &context);
        assert_eq!(decoded.positions[1], Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn strip_expansion_alternates_winding_and_skips_degenerates() {
        assert_eq!(
            expand_triangle_strip(&[0, 1, 2, 3], u32::from(u16::MAX)),
            vec![[0, 1, 2], [2, 1, 3]]
        );
        // degenerate (repeated index) triangles dropped
        assert!(expand_triangle_strip(&[0, 1, 1, 2], u32::from(u16::MAX)).is_empty());
        // restart sentinel splits runs
        let restart = u32::from(u16::MAX);
        assert_eq!(
            expand_triangle_strip(&[0, 1, 2, restart, 4, 5, 6], restart),
            vec![[0, 1, 2], [4, 5, 6]]
        );
    }

    #[test]
    fn weight_renormalization() {
        let normalize = normalize_weights(0.01);
        let normalized = normalize([0.5, 0.5, 0.5, 0.5]);
        assert!((normalized.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        // already-normalized quads pass through untouched
        assert_eq!(normalize([0.25, 0.25, 0.25, 0.25]), [0.25, 0.25, 0.25, 0.25]);
        // all-zero quads stay zero rather than dividing by ~0
        assert_eq!(normalize([0.0; 4]), [0.0; 4]);
    }

    #[test]
    fn packed_position_divisor() {
        let mut buffer = Vec::new();
        for s in [512i16, 1024, 2048, 512] {
            buffer.extend_from_slice(&s.to_le_bytes());
        }
        let mesh = MeshObject {
            vertex_count: 1,
            vertex_strides: vec![8],
            ..MeshObject::default()
        };
        let positions = packed_positions(&mesh, &buffer, Endianness::Little).unwrap();
        assert_eq!(positions[0], Vec3::new(1.0, 2.0, 4.0));
    }

    fn edge_segment_with_positions(vertices: &[[f32; 3]]) -> Ps3EdgeSegment {
        let mut buffer = Vec::new();
        for v in vertices {
            for f in v {
                buffer.extend_from_slice(&f.to_be_bytes());
            }
        }
        let mut index_buffer = Vec::new();
        for i in 0..vertices.len() as u16 {
            index_buffer.extend_from_slice(&i.to_be_bytes());
        }
        Ps3EdgeSegment {
            spu_config: EdgeSpuConfig {
                num_vertexes: vertices.len() as u16,
                num_indexes: vertices.len() as u16,
                // flavor 0 indexes, no skinning
                indexes_flavor_and_skinning_flavor: 0,
                ..EdgeSpuConfig::default()
            },
            vertex_buffers: [buffer, Vec::new(), Vec::new(), Vec::new()],
            vertex_strides: [12, 0, 0],
            compressed_index_buffer: index_buffer,
            vertex_element_blocks: Default::default(),
        }
    }

    #[test]
    fn ps3_segments_concatenate_with_rebased_indices() {
        let mesh = MeshObject {
            is_ps3: true,
            ps3_segments: vec![
                edge_segment_with_positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]),
                edge_segment_with_positions(&[[2.0, 0.0, 0.0], [3.0, 0.0, 0.0], [2.0, 1.0, 0.0]]),
            ],
            ..MeshObject::default()
        };
        let decoded = decode_mesh(&mesh, &ctx(&[]));
        assert_eq!(decoded.positions.len(), 6);
        assert_eq!(decoded.positions[3], Vec3::new(2.0, 0.0, 0.0));
        // second segment's indices are rebased by the first's vertex count
        assert_eq!(decoded.triangles, vec![[0, 1, 2], [3, 4, 5]]);
    }

    #[test]
    fn ps3_compressed_indices_drop_faces_but_keep_vertices() {
        let mut segment =
            edge_segment_with_positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        segment.spu_config.indexes_flavor_and_skinning_flavor = 0x20; // compressed flavor
        let mesh = MeshObject {
            is_ps3: true,
            ps3_segments: vec![segment],
            ..MeshObject::default()
        };
        let decoded = decode_mesh(&mesh, &ctx(&[]));
        assert_eq!(decoded.positions.len(), 3);
        assert!(decoded.triangles.is_empty());
    }

    #[test]
    fn ps3_skin_window_remapping() {
        // 1 vertex, 4 weight/index pairs; window0 holds 2 matrices starting
        // at slot 4, overflow window starts at slot 16
        let skin = vec![
            0xFF, 0x00, // weight, index 0 -> window 0
            0x00, 0x01, // index 1 -> window 0
            0x00, 0x02, // index 2 -> overflow
            0x00, 0x03, // index 3 -> overflow
        ];
        let segment = Ps3EdgeSegment {
            spu_config: EdgeSpuConfig {
                num_vertexes: 1,
                indexes_flavor_and_skinning_flavor: edge::skin::NO_SCALING,
                skin_matrix_offset0: 4 * 0x30,
                skin_matrix_offset1: 16 * 0x30,
                skin_matrix_size0: 2 * 0x30,
                ..EdgeSpuConfig::default()
            },
            vertex_buffers: [Vec::new(), Vec::new(), Vec::new(), skin],
            ..Ps3EdgeSegment::default()
        };
        let (weights, indices) = segment_bone_buffers(&segment).unwrap();
        assert_eq!(weights[0], [0xFF, 0x00, 0x00, 0x00]);
        assert_eq!(indices[0], [4, 5, 16, 17]);
    }

    #[test]
    fn ps3_single_bone_skinning() {
        let segment = Ps3EdgeSegment {
            spu_config: EdgeSpuConfig {
                num_vertexes: 2,
                indexes_flavor_and_skinning_flavor: edge::skin::SINGLE_BONE_NO_SCALING,
                skin_matrix_offset0: 3 * 0x30,
                ..EdgeSpuConfig::default()
            },
            vertex_buffers: [Vec::new(), Vec::new(), Vec::new(), vec![0, 1]],
            ..Ps3EdgeSegment::default()
        };
        let (weights, indices) = segment_bone_buffers(&segment).unwrap();
        assert_eq!(weights, vec![[0xFF, 0, 0, 0]; 2]);
        assert_eq!(indices, vec![[3, 0, 0, 0], [4, 0, 0, 0]]);
    }
}
