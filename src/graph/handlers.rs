//! The shared handler library: one method per node kind.
//!
//! Handlers locate their fields with platform-width-aware seeks, recurse via
//! `process_object`, and thread decoded data into the in-progress model and
//! mesh records. A handler that finds itself outside the model/mesh context
//! it needs logs and skips; only structural read failures propagate.

use glam::{Mat4, Vec3};
use tracing::{debug, warn};

use crate::data::Endianness;
use crate::data::container::MemoryRef;
use crate::data::cursor::ByteCursor;
use crate::models::edge::{EdgeSpuConfig, EdgeVertexDescriptor};
use crate::models::vertex_format::{VERTEX_ELEMENT_SIZE, VertexElement};
use crate::models::{BoneRecord, MeshObject, PrimitiveType, Ps3EdgeSegment};

use super::variant::FieldOffset;
use super::{BoneSpec, DataListInfo, EdgeSegmentParts, GraphError, GraphWalker, Value};

const fn off(wide: u64, narrow: u64) -> FieldOffset {
    FieldOffset { wide, narrow }
}

impl GraphWalker<'_> {
    // --- Shared helpers -----------------------------------------------------

    /// Materialize a memory reference, degrading an out-of-bounds reference
    /// to an empty buffer instead of failing the file.
    fn memref_bytes_or_empty(&self, memref: &MemoryRef) -> Vec<u8> {
        match self.container.memory_ref_bytes(memref) {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                warn!(error = %e, "memory reference out of bounds");
                Vec::new()
            }
        }
    }

    /// Read a memory-handle index and materialize the referenced block.
    fn read_handle_bytes(&self, bs: &mut ByteCursor) -> Result<Vec<u8>, GraphError> {
        let index = if self.container.is_64bit {
            bs.read_u64()?
        } else {
            u64::from(bs.read_u32()?)
        };
        match self.container.thumbnail(index) {
            Some(memref) => Ok(self.memref_bytes_or_empty(&memref)),
            None => {
                warn!(index, "memory handle index out of range");
                Ok(Vec::new())
            }
        }
    }

    /// Read the pointer at a platform-width-dependent field offset and
    /// process the object it leads to.
    fn follow_pointer_field(&mut self, base: u64, field: FieldOffset) -> Result<Value, GraphError> {
        let container = self.container;
        let mut bs = container.cursor();
        container.seek_field(&mut bs, base, field.wide, field.narrow);
        let pointer = container.read_pointer(&mut bs)?;
        self.process_object(pointer)
    }

    fn data_list_info(&mut self, offset: u64) -> Result<DataListInfo, GraphError> {
        let container = self.container;
        let mut bs = container.cursor();
        container.seek_field(&mut bs, offset, 0x0C, 0x08);
        let count = bs.read_u32()?;
        let capacity = bs.read_u32()?;
        container.seek_field(&mut bs, offset, 0x18, 0x10);
        let data = container.read_memory_ref(&mut bs)?;
        Ok(DataListInfo {
            count,
            capacity,
            data,
        })
    }

    fn named_object_name(&mut self, offset: u64) -> Result<String, GraphError> {
        let container = self.container;
        let mut bs = container.cursor();
        container.seek_field(&mut bs, offset, 0x10, 0x08);
        Ok(container.read_string(&mut bs)?)
    }

    // --- Generic list and leaf kinds ---------------------------------------

    pub(crate) fn data_list(&mut self, offset: u64) -> Result<Value, GraphError> {
        Ok(Value::DataList(self.data_list_info(offset)?))
    }

    pub(crate) fn named_object(&mut self, offset: u64) -> Result<Value, GraphError> {
        Ok(Value::Name(self.named_object_name(offset)?))
    }

    pub(crate) fn object_list(&mut self, offset: u64) -> Result<Value, GraphError> {
        let list = self.data_list_info(offset)?;
        if list.count == 0 || list.data.is_empty() {
            return Ok(Value::List(Vec::new()));
        }
        let stride = if self.container.is_64bit { 8u64 } else { 4 };
        let mut values = Vec::with_capacity(list.count as usize);
        for i in 0..u64::from(list.count) {
            let pointer = {
                let mut bs = self.container.cursor();
                bs.seek_to(list.data.offset + stride * i);
                self.container.read_pointer(&mut bs)?
            };
            values.push(self.process_object(pointer)?);
        }
        Ok(Value::List(values))
    }

    pub(crate) fn int_list(&mut self, offset: u64) -> Result<Value, GraphError> {
        let list = self.data_list_info(offset)?;
        if list.count == 0 || list.data.is_empty() {
            return Ok(Value::Ints(Vec::new()));
        }
        let mut bs = self.container.cursor();
        let mut ints = Vec::with_capacity(list.count as usize);
        for i in 0..u64::from(list.count) {
            bs.seek_to(list.data.offset + 4 * i);
            ints.push(bs.read_i32()?);
        }
        Ok(Value::Ints(ints))
    }

    // --- Skeletons ----------------------------------------------------------

    pub(crate) fn skeleton(&mut self, offset: u64) -> Result<Value, GraphError> {
        let container = self.container;
        let mut bs = container.cursor();
        container.seek_field(&mut bs, offset, 0x20, 0x10);
        let inverse_joints = container.read_memory_ref(&mut bs)?;
        let matrix_blob = self.memref_bytes_or_empty(&inverse_joints);
        match self.current_model_mut() {
            Some(model) => model.bone_matrices = matrix_blob,
            None => warn!("skeleton encountered outside a model"),
        }

        let mut bs = container.cursor();
        container.seek_field(&mut bs, offset, 0x18, 0x0C);
        let bone_list = container.read_pointer(&mut bs)?;
        self.process_object(bone_list)?;
        Ok(Value::Absent)
    }

    pub(crate) fn skeleton_bone(&mut self, offset: u64) -> Result<Value, GraphError> {
        let name = self.named_object_name(offset)?;
        let container = self.container;
        let mut bs = container.cursor();
        container.seek_field(&mut bs, offset, 0x18, 0x0C);
        let parent_index = bs.read_i32()?;
        container.seek_field(&mut bs, offset, 0x1C, 0x10);
        let blend_matrix_index = bs.read_i32()?;
        container.seek_field(&mut bs, offset, 0x20, 0x14);
        let translation = Vec3::new(bs.read_f32()?, bs.read_f32()?, bs.read_f32()?);
        Ok(Value::Bone(BoneSpec {
            name,
            parent_index,
            blend_matrix_index,
            translation,
        }))
    }

    pub(crate) fn skeleton_bone_list(&mut self, offset: u64) -> Result<Value, GraphError> {
        let Value::List(values) = self.object_list(offset)? else {
            return Ok(Value::Absent);
        };
        // Bones without a blend-matrix slot are corrupt leftovers; drop them
        // before matrix binding.
        let specs: Vec<BoneSpec> = values
            .into_iter()
            .filter_map(|v| match v {
                Value::Bone(spec) => Some(spec),
                _ => None,
            })
            .filter(|spec| spec.blend_matrix_index != -1)
            .collect();

        let endianness = self.container.endianness;
        let Some(model) = self.current_model_mut() else {
            warn!("bone list encountered outside a model");
            return Ok(Value::Absent);
        };
        let records: Vec<BoneRecord> = specs
            .into_iter()
            .map(|spec| {
                let matrix = joint_matrix(&model.bone_matrices, spec.blend_matrix_index, endianness);
                let name = if spec.name.is_empty() {
                    format!("bone_{}", spec.blend_matrix_index)
                } else {
                    spec.name
                };
                BoneRecord {
                    index: spec.blend_matrix_index,
                    name,
                    parent_index: spec.parent_index - 1,
                    translation: spec.translation,
                    inverse_bind_matrix: matrix,
                }
            })
            .collect();
        model.bone_list.extend(records);
        Ok(Value::Absent)
    }

    // --- Graphics buffers ---------------------------------------------------

    pub(crate) fn graphics_vertex_buffer(&mut self, offset: u64) -> Result<Value, GraphError> {
        self.follow_pointer_field(offset, off(0x10, 0x0C))?;
        Ok(Value::Absent)
    }

    pub(crate) fn graphics_index_buffer(&mut self, offset: u64) -> Result<Value, GraphError> {
        self.follow_pointer_field(offset, off(0x10, 0x0C))?;
        Ok(Value::Absent)
    }

    pub(crate) fn vertex_buffer(&mut self, offset: u64) -> Result<Value, GraphError> {
        let container = self.container;
        let mut bs = container.cursor();
        container.seek_field(&mut bs, offset, 0x0C, 0x08);
        let vertex_count = bs.read_u32()?;
        container.seek_field(&mut bs, offset, 0x20, 0x14);
        let data = self.read_handle_bytes(&mut bs)?;

        // The count must land on the mesh before the format handler runs;
        // the format handler populates the same mesh's elements and streams.
        match self.current_mesh_mut() {
            Some(mesh) => mesh.vertex_count = vertex_count,
            None => {
                warn!("vertex buffer encountered outside a mesh");
                return Ok(Value::Absent);
            }
        }

        let mut bs = container.cursor();
        container.seek_field(&mut bs, offset, 0x28, 0x18);
        let format = container.read_pointer(&mut bs)?;
        let stride = match self.process_object(format)? {
            Value::Size(size) => size,
            _ => {
                debug!("vertex format did not resolve, stride unknown");
                0
            }
        };

        let pack_data = if container.version >= 0x06 {
            let mut bs = container.cursor();
            container.seek_field(&mut bs, offset, 0x30, 0x20);
            let pack = container.read_memory_ref(&mut bs)?;
            (!pack.is_empty()).then(|| self.memref_bytes_or_empty(&pack))
        } else {
            None
        };

        if let Some(mesh) = self.current_mesh_mut() {
            mesh.vertex_buffers.push(data);
            mesh.vertex_strides.push(stride);
            if let Some(pack) = pack_data
                && !pack.is_empty()
            {
                mesh.pack_data = Some(pack);
            }
        }
        Ok(Value::Absent)
    }

    pub(crate) fn vertex_format(&mut self, offset: u64) -> Result<Value, GraphError> {
        let container = self.container;
        let mut bs = container.cursor();
        container.seek_field(&mut bs, offset, 0x0C, 0x08);
        let vertex_size = bs.read_u32()?;
        container.seek_field(&mut bs, offset, 0x30, 0x1C);
        let format_platform = bs.read_u32()?;
        container.seek_field(&mut bs, offset, 0x20, 0x14);
        let _platform_data = container.read_memory_ref(&mut bs)?;
        container.seek_field(&mut bs, offset, 0x10, 0x0C);
        let elements_ref = container.read_memory_ref(&mut bs)?;
        let element_bytes = self.memref_bytes_or_empty(&elements_ref);
        container.seek_field(&mut bs, offset, 0x58, 0x30);
        let streams_ref = container.read_memory_ref(&mut bs)?;

        let mut streams = Vec::new();
        if !streams_ref.is_empty() {
            bs.seek_to(streams_ref.offset);
            for _ in 0..streams_ref.size / 4 {
                streams.push(bs.read_u32()?);
            }
        } else {
            streams.push(vertex_size);
        }

        let endianness = container.endianness;
        let mut elements = Vec::new();
        for chunk in element_bytes.chunks_exact(VERTEX_ELEMENT_SIZE) {
            match VertexElement::parse(chunk, endianness) {
                Ok(element) => elements.push(element),
                Err(e) => warn!(error = %e, "bad vertex element descriptor"),
            }
        }

        match self.current_mesh_mut() {
            Some(mesh) => {
                mesh.platform = format_platform;
                mesh.vertex_streams.extend(streams);
                mesh.vertex_elements.extend(elements);
            }
            None => warn!("vertex format encountered outside a mesh"),
        }
        Ok(Value::Size(vertex_size))
    }

    pub(crate) fn index_buffer(&mut self, offset: u64) -> Result<Value, GraphError> {
        let container = self.container;
        let mut bs = container.cursor();
        container.seek_field(&mut bs, offset, 0x0C, 0x08);
        let index_count = bs.read_u32()?;
        container.seek_field(&mut bs, offset, 0x20, 0x14);
        let data = self.read_handle_bytes(&mut bs)?;
        container.seek_field(&mut bs, offset, 0x30, 0x1C);
        let code = bs.read_i32()?;
        let primitive =
            PrimitiveType::from_code(code).ok_or(GraphError::UnsupportedPrimitive(code))?;

        match self.current_mesh_mut() {
            Some(mesh) => {
                mesh.index_count = index_count;
                mesh.index_buffer = data;
                mesh.primitive = Some(primitive);
            }
            None => warn!("index buffer encountered outside a mesh"),
        }
        Ok(Value::Absent)
    }

    // --- PS3 Edge geometry --------------------------------------------------

    pub(crate) fn ps3_edge_geometry(&mut self, offset: u64) -> Result<Value, GraphError> {
        // The geometry record is itself an object list of segments.
        let Value::List(values) = self.object_list(offset)? else {
            return Ok(Value::Absent);
        };
        let mut bs = self.container.cursor();
        bs.seek_to(offset + 0x19);
        let _is_skinned = bs.read_u8()?;

        let segments: Vec<Ps3EdgeSegment> = values
            .into_iter()
            .filter_map(|v| match v {
                Value::EdgeSegment(parts) => Some(*parts),
                _ => None,
            })
            .map(|parts| Ps3EdgeSegment {
                spu_config: parts.spu_config,
                vertex_buffers: [
                    parts.spu_vertexes0,
                    parts.spu_vertexes1,
                    parts.rsx_vertexes,
                    parts.skin_indexes_and_weights,
                ],
                vertex_strides: [
                    u32::from(parts.descriptors[0].vertex_stride),
                    u32::from(parts.descriptors[1].vertex_stride),
                    u32::from(parts.descriptors[2].vertex_stride),
                ],
                compressed_index_buffer: parts.indexes,
                vertex_element_blocks: parts.descriptors,
            })
            .collect();

        match self.current_mesh_mut() {
            Some(mesh) => {
                mesh.is_ps3 = true;
                mesh.ps3_segments.extend(segments);
            }
            None => warn!("edge geometry encountered outside a mesh"),
        }
        Ok(Value::Absent)
    }

    pub(crate) fn ps3_edge_geometry_segment(&mut self, offset: u64) -> Result<Value, GraphError> {
        let container = self.container;
        let mut bs = container.cursor();

        bs.seek_to(offset + 0x08);
        let spu_config_ref = container.read_memory_ref(&mut bs)?;
        bs.seek_to(offset + 0x10);
        let indexes = container.read_memory_ref(&mut bs)?;
        bs.seek_to(offset + 0x1C);
        let spu_vertexes0 = container.read_memory_ref(&mut bs)?;
        bs.seek_to(offset + 0x24);
        let spu_vertexes1 = container.read_memory_ref(&mut bs)?;
        bs.seek_to(offset + 0x38);
        let rsx_vertexes = container.read_memory_ref(&mut bs)?;
        bs.seek_to(offset + 0x44);
        let skin_matrix_offset0 = bs.read_u16()?;
        let skin_matrix_offset1 = bs.read_u16()?;
        let skin_matrix_size0 = bs.read_u16()?;
        let skin_matrix_size1 = bs.read_u16()?;
        bs.seek_to(offset + 0x50);
        let skin_indexes_and_weights = container.read_memory_ref(&mut bs)?;
        bs.seek_to(offset + 0x60);
        let descriptor0 = container.read_memory_ref(&mut bs)?;
        bs.seek_to(offset + 0x68);
        let descriptor1 = container.read_memory_ref(&mut bs)?;
        bs.seek_to(offset + 0x78);
        let rsx_descriptor = container.read_memory_ref(&mut bs)?;

        let spu_bytes = self.memref_bytes_or_empty(&spu_config_ref);
        let mut spu_config = if spu_bytes.is_empty() {
            warn!("edge segment without SPU config");
            EdgeSpuConfig::default()
        } else {
            EdgeSpuConfig::parse(&spu_bytes).unwrap_or_else(|e| {
                warn!(error = %e, "bad SPU config");
                EdgeSpuConfig::default()
            })
        };
        spu_config.skin_matrix_offset0 = skin_matrix_offset0;
        spu_config.skin_matrix_offset1 = skin_matrix_offset1;
        spu_config.skin_matrix_size0 = skin_matrix_size0;
        spu_config.skin_matrix_size1 = skin_matrix_size1;

        let parse_descriptor = |memref: &MemoryRef| {
            let bytes = self.memref_bytes_or_empty(memref);
            EdgeVertexDescriptor::parse(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "bad edge vertex descriptor");
                EdgeVertexDescriptor::default()
            })
        };
        let descriptors = [
            parse_descriptor(&descriptor0),
            parse_descriptor(&descriptor1),
            parse_descriptor(&rsx_descriptor),
        ];

        Ok(Value::EdgeSegment(Box::new(EdgeSegmentParts {
            spu_config,
            indexes: self.memref_bytes_or_empty(&indexes),
            spu_vertexes0: self.memref_bytes_or_empty(&spu_vertexes0),
            spu_vertexes1: self.memref_bytes_or_empty(&spu_vertexes1),
            rsx_vertexes: self.memref_bytes_or_empty(&rsx_vertexes),
            skin_indexes_and_weights: self.memref_bytes_or_empty(&skin_indexes_and_weights),
            descriptors,
        })))
    }

    // --- Scene-graph node kinds ---------------------------------------------

    pub(crate) fn scene_info(&mut self, offset: u64) -> Result<Value, GraphError> {
        if !self.add_model(offset) {
            return Ok(Value::Absent);
        }
        self.follow_pointer_field(offset, off(0x00, 0x14))?;
        Ok(Value::Absent)
    }

    pub(crate) fn group(&mut self, offset: u64) -> Result<Value, GraphError> {
        self.follow_pointer_field(offset, off(0x00, 0x20))?;
        Ok(Value::Absent)
    }

    pub(crate) fn geometry(&mut self, offset: u64) -> Result<Value, GraphError> {
        self.group(offset)?;
        let bone_map_index = self
            .current_model_mut()
            .map(|m| m.bone_map_list.len().saturating_sub(1))
            .unwrap_or(0);
        match self.current_model_mut() {
            Some(model) => model.meshes.push(MeshObject {
                bone_map_index,
                ..MeshObject::default()
            }),
            None => {
                warn!("geometry encountered outside a model");
                return Ok(Value::Absent);
            }
        }
        self.follow_pointer_field(offset, off(0x00, 0x24))?;
        Ok(Value::Absent)
    }

    pub(crate) fn edge_geometry_attr(
        &mut self,
        offset: u64,
        new_mesh: bool,
    ) -> Result<Value, GraphError> {
        if new_mesh {
            match self.current_model_mut() {
                Some(model) => model.meshes.push(MeshObject::new()),
                None => {
                    warn!("edge geometry attr encountered outside a model");
                    return Ok(Value::Absent);
                }
            }
        }
        self.follow_pointer_field(offset, off(0x00, 0x10))?;
        Ok(Value::Absent)
    }

    pub(crate) fn geometry_attr(&mut self, offset: u64) -> Result<Value, GraphError> {
        match self.current_model_mut() {
            Some(model) => model.meshes.push(MeshObject::new()),
            None => {
                warn!("geometry attr encountered outside a model");
                return Ok(Value::Absent);
            }
        }
        self.follow_pointer_field(offset, off(0x00, 0x10))?;
        self.follow_pointer_field(offset, off(0x00, 0x14))?;
        Ok(Value::Absent)
    }

    pub(crate) fn animation_database(&mut self, offset: u64) -> Result<Value, GraphError> {
        if !self.add_model(offset) {
            return Ok(Value::Absent);
        }
        self.follow_pointer_field(offset, off(0x00, 0x14))?;
        self.follow_pointer_field(offset, off(0x00, 0x18))?;
        Ok(Value::Absent)
    }

    pub(crate) fn attr_set(&mut self, offset: u64) -> Result<Value, GraphError> {
        self.group(offset)?;
        self.follow_pointer_field(offset, off(0x00, 0x24))?;
        Ok(Value::Absent)
    }

    pub(crate) fn blend_matrix_select(
        &mut self,
        offset: u64,
        bone_map: FieldOffset,
    ) -> Result<Value, GraphError> {
        let value = self.follow_pointer_field(offset, bone_map)?;
        let ints = match value {
            Value::Ints(ints) => ints,
            _ => {
                debug!("blend matrix select without an index list");
                Vec::new()
            }
        };
        match self.current_model_mut() {
            Some(model) => model.bone_map_list.push(ints),
            None => warn!("blend matrix select encountered outside a model"),
        }
        self.attr_set(offset)
    }

    pub(crate) fn animation_info(&mut self, offset: u64) -> Result<Value, GraphError> {
        self.follow_pointer_field(offset, off(0x00, 0x14))?;
        Ok(Value::Absent)
    }

    pub(crate) fn skeleton_info(&mut self, offset: u64) -> Result<Value, GraphError> {
        self.follow_pointer_field(offset, off(0x00, 0x14))?;
        Ok(Value::Absent)
    }

    // --- Physics/entity node kinds (Trap Team and earlier) ------------------

    pub(crate) fn sprite_info(
        &mut self,
        offset: u64,
        context_data: FieldOffset,
    ) -> Result<Value, GraphError> {
        self.follow_pointer_field(offset, context_data)?;
        Ok(Value::Absent)
    }

    pub(crate) fn physics_model(&mut self, offset: u64) -> Result<Value, GraphError> {
        self.follow_pointer_field(offset, off(0x00, 0x14))?;
        Ok(Value::Absent)
    }

    pub(crate) fn physics_body_trap_team(&mut self, offset: u64) -> Result<Value, GraphError> {
        if !self.add_model(offset) {
            return Ok(Value::Absent);
        }
        self.follow_pointer_field(offset, off(0x00, 0x28))?;

        let container = self.container;
        let mut bs = container.cursor();
        // NGP and DURANGO builds pack the entity pointer four bytes earlier.
        if container.platform == 0x0B || container.platform == 0x04 {
            bs.seek_to(offset + 0x20);
        } else {
            container.seek_field(&mut bs, offset, 0x00, 0x30);
        }
        let entity = container.read_pointer(&mut bs)?;
        self.process_object(entity)?;
        Ok(Value::Absent)
    }

    pub(crate) fn physics_body_giants(&mut self, offset: u64) -> Result<Value, GraphError> {
        if !self.add_model(offset) {
            return Ok(Value::Absent);
        }
        self.follow_pointer_field(offset, off(0x00, 0x24))?;
        self.follow_pointer_field(offset, off(0x00, 0x20))?;
        Ok(Value::Absent)
    }

    pub(crate) fn body_entity_info(&mut self, offset: u64) -> Result<Value, GraphError> {
        let lists = self.follow_pointer_field(offset, off(0x00, 0x24))?;
        if let Value::List(values) = lists {
            let int_lists: Vec<Vec<i32>> = values
                .into_iter()
                .map(|v| match v {
                    Value::Ints(ints) => ints,
                    _ => Vec::new(),
                })
                .collect();
            match self.current_model_mut() {
                Some(model) => model.bone_map_list.extend(int_lists),
                None => warn!("entity info encountered outside a model"),
            }
        }
        self.entity_info(offset)
    }

    pub(crate) fn entity_info(&mut self, offset: u64) -> Result<Value, GraphError> {
        self.follow_pointer_field(offset, off(0x00, 0x14))?;
        Ok(Value::Absent)
    }

    pub(crate) fn drawable(&mut self, offset: u64) -> Result<Value, GraphError> {
        match self.current_model_mut() {
            Some(model) => model.meshes.push(MeshObject::new()),
            None => {
                warn!("drawable encountered outside a model");
                return Ok(Value::Absent);
            }
        }
        let container = self.container;
        let mut bs = container.cursor();
        container.seek_field(&mut bs, offset, 0x00, 0x16);
        let blend_matrix_set = bs.read_u16()?;
        if let Some(mesh) = self.current_mesh_mut() {
            mesh.bone_map_index = usize::from(blend_matrix_set);
        }
        self.follow_pointer_field(offset, off(0x00, 0x0C))?;
        Ok(Value::Absent)
    }

    pub(crate) fn physics_world_trap_team(&mut self, offset: u64) -> Result<Value, GraphError> {
        // Worlds are commonly revisited; creation is deduplicated but the
        // entity graph below is walked every time, as shipped files expect.
        self.add_model(offset);
        self.follow_pointer_field(offset, off(0x00, 0x28))?;
        Ok(Value::Absent)
    }

    pub(crate) fn physics_world_giants(&mut self, offset: u64) -> Result<Value, GraphError> {
        self.follow_pointer_field(offset, off(0x00, 0x20))?;
        Ok(Value::Absent)
    }

    pub(crate) fn physics_combiner_link(&mut self, offset: u64) -> Result<Value, GraphError> {
        self.follow_pointer_field(offset, off(0x00, 0x0C))?;
        Ok(Value::Absent)
    }

    pub(crate) fn actor_info(&mut self, offset: u64, model: FieldOffset) -> Result<Value, GraphError> {
        self.follow_pointer_field(offset, model)?;
        Ok(Value::Absent)
    }

    pub(crate) fn mobile_lod_geometry(&mut self, offset: u64) -> Result<Value, GraphError> {
        self.geometry(offset)?;
        self.follow_pointer_field(offset, off(0x00, 0x2C))?;
        Ok(Value::Absent)
    }

    pub(crate) fn runtime_technique_instance(&mut self, offset: u64) -> Result<Value, GraphError> {
        self.follow_pointer_field(offset, off(0x00, 0x28))?;
        Ok(Value::Absent)
    }

    // --- SuperChargers model node kinds -------------------------------------

    pub(crate) fn graphics_skin_info(&mut self, offset: u64) -> Result<Value, GraphError> {
        if !self.add_model(offset) {
            return Ok(Value::Absent);
        }
        self.follow_pointer_field(offset, off(0x28, 0x14))?;
        self.follow_pointer_field(offset, off(0x30, 0x18))?;
        Ok(Value::Absent)
    }

    pub(crate) fn model_info(&mut self, offset: u64) -> Result<Value, GraphError> {
        if !self.add_model(offset) {
            return Ok(Value::Absent);
        }
        self.follow_pointer_field(offset, off(0x28, 0x14))?;
        Ok(Value::Absent)
    }

    pub(crate) fn model_data(&mut self, offset: u64) -> Result<Value, GraphError> {
        let container = self.container;
        let mut bs = container.cursor();
        container.seek_field(&mut bs, offset, 0x40, 0x30);
        let _transforms = container.read_object_vector(&mut bs)?;
        container.seek_field(&mut bs, offset, 0x58, 0x3C);
        let _transform_hierarchy = container.read_int_vector(&mut bs)?;
        container.seek_field(&mut bs, offset, 0x70, 0x48);
        let draw_calls = container.read_object_vector(&mut bs)?;
        container.seek_field(&mut bs, offset, 0x88, 0x54);
        let _draw_call_transform_indices = container.read_int_vector(&mut bs)?;
        container.seek_field(&mut bs, offset, 0xB8, 0x6C);
        let blend_matrix_indices = container.read_int_vector(&mut bs)?;

        match self.current_model_mut() {
            Some(model) => model.bone_id_list = blend_matrix_indices,
            None => {
                warn!("model data encountered outside a model");
                return Ok(Value::Absent);
            }
        }

        for draw_call in draw_calls {
            // Each draw call appends its own bone-map window; the mesh is
            // created pointing at the slot the draw call will fill.
            if let Some(model) = self.current_model_mut() {
                let bone_map_index = model.bone_map_list.len();
                model.meshes.push(MeshObject {
                    bone_map_index,
                    ..MeshObject::default()
                });
            }
            self.process_object(draw_call)?;
        }
        Ok(Value::Absent)
    }

    pub(crate) fn model_draw_call_data(&mut self, offset: u64) -> Result<Value, GraphError> {
        let name = self.named_object_name(offset)?;
        self.follow_pointer_field(offset, off(0x48, 0x34))?;
        self.follow_pointer_field(offset, off(0x50, 0x38))?;
        self.follow_pointer_field(offset, off(0x58, 0x3C))?;

        let container = self.container;
        let mut bs = container.cursor();
        container.seek_field(&mut bs, offset, 0x60, 0x40);
        let blend_vector_offset = usize::from(bs.read_u16()?);
        container.seek_field(&mut bs, offset, 0x62, 0x42);
        let blend_vector_count = usize::from(bs.read_u16()?);

        if let Some(model) = self.current_model_mut() {
            let end = (blend_vector_offset + blend_vector_count).min(model.bone_id_list.len());
            let start = blend_vector_offset.min(end);
            model.bone_map_list.push(model.bone_id_list[start..end].to_vec());
            if let Some(mesh) = model.meshes.last_mut() {
                mesh.name = name;
            }
        }
        Ok(Value::Absent)
    }
}

/// Read one 0x40-byte column-major joint matrix from the skeleton's matrix
/// blob. The blob stores inverse-bind transforms.
fn joint_matrix(blob: &[u8], index: i32, endianness: Endianness) -> Option<Mat4> {
    if index < 0 {
        return None;
    }
    let start = index as usize * 0x40;
    let bytes = blob.get(start..start + 0x40)?;
    let mut cols = [0f32; 16];
    for (i, chunk) in bytes.chunks_exact(4).enumerate() {
        let raw: [u8; 4] = chunk.try_into().unwrap();
        cols[i] = f32::from_bits(match endianness {
            Endianness::Little => u32::from_le_bytes(raw),
            Endianness::Big => u32::from_be_bytes(raw),
        });
    }
    Some(Mat4::from_cols_array(&cols))
}
