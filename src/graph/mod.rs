//! The recursive, type-dispatching object-graph walker.
//!
//! `processObject` is a state machine over the byte buffer: seek to a
//! resolved pointer, read the leading type index, resolve a type name from
//! the metatype table, and dispatch to the active schema variant's handler.
//! Unknown type indices and unregistered type names degrade to "absent"
//! rather than failing the file; corrupt or forward-compatible graphs decode
//! partially instead of not at all.

mod handlers;
/// Per-title registries, offset tables and platform-width rules.
pub mod variant;

use std::collections::HashSet;

use glam::Vec3;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::data::container::{Container, MemoryRef};
use crate::data::cursor::CursorError;
use crate::models::edge::{EdgeSpuConfig, EdgeVertexDescriptor};
use crate::models::{MeshObject, ModelObject};
use variant::{Handler, VariantDescriptor};

/// Walks deeper than any shipped scene graph; a chain this long means a
/// pointer cycle or corrupt data.
const MAX_DEPTH: usize = 512;
/// Total visit cap, bounding pathological but acyclic graphs.
const MAX_VISITS: usize = 1 << 20;

/// Walker failures. Unlike type-lookup misses these abort the file: they
/// indicate structurally unusable data, not merely unknown node kinds.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("object graph too deep at 0x{offset:X} (depth {depth}, visits {visits})")]
    GraphTooDeep {
        offset: u64,
        depth: usize,
        visits: usize,
    },
    #[error("primitive type {0} is not supported")]
    UnsupportedPrimitive(i32),
    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// What a handler hands back to its caller. Most handlers mutate the
/// in-progress model records and return `Absent`; the rest return decoded
/// sub-values their parent node consumes.
#[derive(Debug)]
pub(crate) enum Value {
    Absent,
    /// A vertex size, returned by the vertex-format handler and recorded as
    /// the buffer stride by the vertex-buffer handler.
    Size(u32),
    Name(String),
    Ints(Vec<i32>),
    List(Vec<Value>),
    Bone(BoneSpec),
    DataList(DataListInfo),
    EdgeSegment(Box<EdgeSegmentParts>),
}

/// Raw fields of one skeleton bone record, before matrix binding.
#[derive(Debug, Clone)]
pub(crate) struct BoneSpec {
    pub name: String,
    pub parent_index: i32,
    pub blend_matrix_index: i32,
    pub translation: Vec3,
}

/// The `{count, capacity, data}` header shared by every list node kind.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DataListInfo {
    pub count: u32,
    #[allow(dead_code)]
    pub capacity: u32,
    pub data: MemoryRef,
}

/// Everything read out of one PS3 Edge geometry segment record.
#[derive(Debug)]
pub(crate) struct EdgeSegmentParts {
    pub spu_config: EdgeSpuConfig,
    pub indexes: Vec<u8>,
    pub spu_vertexes0: Vec<u8>,
    pub spu_vertexes1: Vec<u8>,
    pub rsx_vertexes: Vec<u8>,
    pub skin_indexes_and_weights: Vec<u8>,
    pub descriptors: [EdgeVertexDescriptor; 3],
}

/// The graph walker: container + variant in, model records out.
pub struct GraphWalker<'a> {
    container: &'a Container,
    variant: &'static VariantDescriptor,
    models: Vec<ModelObject>,
    /// Offsets on the active recursion stack, for cycle detection.
    active: HashSet<u64>,
    depth: usize,
    visits: usize,
}

impl<'a> GraphWalker<'a> {
    pub fn new(container: &'a Container, variant: &'static VariantDescriptor) -> GraphWalker<'a> {
        GraphWalker {
            container,
            variant,
            models: Vec::new(),
            active: HashSet::new(),
            depth: 0,
            visits: 0,
        }
    }

    pub fn into_models(self) -> Vec<ModelObject> {
        self.models
    }

    /// Walk the root object list. Its location moved from `segment[1] + 4`
    /// to `segment[1]` in version 9.
    pub fn walk_root(&mut self) -> Result<(), GraphError> {
        let root = if self.container.version >= 0x09 {
            self.container.null_boundary()
        } else {
            self.container.null_boundary() + 4
        };
        self.object_list(root)?;
        Ok(())
    }

    /// Decode a single object by resolved pointer.
    pub fn walk_object(&mut self, pointer: u64) -> Result<(), GraphError> {
        self.process_object(Some(pointer))?;
        Ok(())
    }

    pub(crate) fn process_object(&mut self, pointer: Option<u64>) -> Result<Value, GraphError> {
        let Some(pointer) = pointer else {
            return Ok(Value::Absent);
        };
        if pointer <= self.container.null_boundary() {
            return Ok(Value::Absent);
        }
        if self.active.contains(&pointer) {
            warn!(offset = format_args!("0x{pointer:X}"), "pointer cycle detected, skipping");
            return Ok(Value::Absent);
        }
        self.visits += 1;
        if self.depth >= MAX_DEPTH || self.visits >= MAX_VISITS {
            return Err(GraphError::GraphTooDeep {
                offset: pointer,
                depth: self.depth,
                visits: self.visits,
            });
        }

        let mut bs = self.container.cursor();
        bs.seek_to(pointer);
        let type_index = if self.container.is_64bit {
            bs.read_u64()?
        } else {
            u64::from(bs.read_u32()?)
        };
        let Some(metatype) = self.container.metatypes.get(type_index as usize) else {
            debug!(
                offset = format_args!("0x{pointer:X}"),
                type_index, "type index out of range, skipping object"
            );
            return Ok(Value::Absent);
        };
        let Some(handler) = self.variant.handler(metatype) else {
            trace!(metatype, "unregistered type, skipping object");
            return Ok(Value::Absent);
        };

        self.active.insert(pointer);
        self.depth += 1;
        let result = self.dispatch(handler, pointer);
        self.depth -= 1;
        self.active.remove(&pointer);
        result
    }

    fn dispatch(&mut self, handler: Handler, offset: u64) -> Result<Value, GraphError> {
        match handler {
            Handler::DataList => self.data_list(offset),
            Handler::NamedObject => self.named_object(offset),
            Handler::ObjectList => self.object_list(offset),
            Handler::IntList => self.int_list(offset),
            Handler::Skeleton2 => self.skeleton(offset),
            Handler::SkeletonBoneList => self.skeleton_bone_list(offset),
            Handler::SkeletonBone => self.skeleton_bone(offset),
            Handler::GraphicsVertexBuffer => self.graphics_vertex_buffer(offset),
            Handler::GraphicsIndexBuffer => self.graphics_index_buffer(offset),
            Handler::VertexBuffer => self.vertex_buffer(offset),
            Handler::VertexFormat => self.vertex_format(offset),
            Handler::IndexBuffer => self.index_buffer(offset),
            Handler::Ps3EdgeGeometry => self.ps3_edge_geometry(offset),
            Handler::Ps3EdgeGeometrySegment => self.ps3_edge_geometry_segment(offset),
            Handler::GraphicsSkinInfo => self.graphics_skin_info(offset),
            Handler::ModelInfo => self.model_info(offset),
            Handler::ModelData => self.model_data(offset),
            Handler::ModelDrawCallData => self.model_draw_call_data(offset),
            Handler::SceneInfo => self.scene_info(offset),
            Handler::Group => self.group(offset),
            Handler::Geometry => self.geometry(offset),
            Handler::EdgeGeometryAttr { new_mesh } => self.edge_geometry_attr(offset, new_mesh),
            Handler::GeometryAttr => self.geometry_attr(offset),
            Handler::AnimationDatabase => self.animation_database(offset),
            Handler::AttrSet => self.attr_set(offset),
            Handler::BlendMatrixSelect { bone_map } => self.blend_matrix_select(offset, bone_map),
            Handler::Animation2Info => self.animation_info(offset),
            Handler::Skeleton2Info => self.skeleton_info(offset),
            Handler::SpriteInfo { context_data } => self.sprite_info(offset, context_data),
            Handler::PhysicsModel => self.physics_model(offset),
            Handler::PhysicsBodyTrapTeam => self.physics_body_trap_team(offset),
            Handler::PhysicsBodyGiants => self.physics_body_giants(offset),
            Handler::BodyEntityInfo => self.body_entity_info(offset),
            Handler::EntityInfo => self.entity_info(offset),
            Handler::Drawable => self.drawable(offset),
            Handler::PhysicsWorldTrapTeam => self.physics_world_trap_team(offset),
            Handler::PhysicsWorldGiants => self.physics_world_giants(offset),
            Handler::PhysicsCombinerLink => self.physics_combiner_link(offset),
            Handler::ActorInfo { model } => self.actor_info(offset, model),
            Handler::MobileLodGeometry => self.mobile_lod_geometry(offset),
            Handler::RuntimeTechniqueInstance => self.runtime_technique_instance(offset),
            Handler::Ignore => Ok(Value::Absent),
        }
    }

    // --- Model bookkeeping --------------------------------------------------

    /// Create a model for a root node's offset unless one already exists.
    /// Returns whether the model is new; revisits of shared roots are
    /// expected and must not duplicate the model.
    pub(crate) fn add_model(&mut self, id: u64) -> bool {
        if self.models.iter().any(|m| m.id == id) {
            debug!(id = format_args!("0x{id:X}"), "model root revisited, skipping");
            return false;
        }
        debug!(id = format_args!("0x{id:X}"), "new model root");
        self.models.push(ModelObject::new(id));
        true
    }

    pub(crate) fn current_model_mut(&mut self) -> Option<&mut ModelObject> {
        self.models.last_mut()
    }

    pub(crate) fn current_mesh_mut(&mut self) -> Option<&mut MeshObject> {
        self.models.last_mut()?.meshes.last_mut()
    }
}
