//! Per-title schema variant tables.
//!
//! The supported container versions map onto five game-title variants. All
//! variants share one handler library (`Handler`); what differs between them
//! is captured as data: which type names are registered, the byte offsets of
//! fields whose position moved between titles, and the platform-id →
//! pointer-width assignment (platform ids were renumbered between titles).

/// A 64/32-bit pair of byte offsets for one logical field. Node kinds that
/// only ever shipped on 32-bit titles carry a zero wide offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOffset {
    pub wide: u64,
    pub narrow: u64,
}

const fn off(wide: u64, narrow: u64) -> FieldOffset {
    FieldOffset { wide, narrow }
}

/// The shared handler library. Variants that disagree only on a field offset
/// share a variant with the offset as payload; variants that disagree on
/// structure get separate entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    DataList,
    NamedObject,
    ObjectList,
    IntList,
    Skeleton2,
    SkeletonBoneList,
    SkeletonBone,
    GraphicsVertexBuffer,
    GraphicsIndexBuffer,
    VertexBuffer,
    VertexFormat,
    IndexBuffer,
    Ps3EdgeGeometry,
    Ps3EdgeGeometrySegment,
    GraphicsSkinInfo,
    ModelInfo,
    ModelData,
    ModelDrawCallData,
    SceneInfo,
    Group,
    Geometry,
    EdgeGeometryAttr { new_mesh: bool },
    GeometryAttr,
    AnimationDatabase,
    AttrSet,
    BlendMatrixSelect { bone_map: FieldOffset },
    Animation2Info,
    Skeleton2Info,
    SpriteInfo { context_data: FieldOffset },
    PhysicsModel,
    PhysicsBodyTrapTeam,
    PhysicsBodyGiants,
    BodyEntityInfo,
    EntityInfo,
    Drawable,
    PhysicsWorldTrapTeam,
    PhysicsWorldGiants,
    PhysicsCombinerLink,
    ActorInfo { model: FieldOffset },
    MobileLodGeometry,
    RuntimeTechniqueInstance,
    /// Registered so the walker recognizes the node, but decodes nothing.
    Ignore,
}

/// One schema variant: registry plus platform rules, selected per file by
/// the container version.
pub struct VariantDescriptor {
    pub title: &'static str,
    /// Platform id → 64-bit pointers. `None` rejects the platform id.
    pub pointer_width: fn(u32) -> Option<bool>,
    pub registry: &'static [(&'static str, Handler)],
}

impl VariantDescriptor {
    pub fn handler(&self, metatype: &str) -> Option<Handler> {
        self.registry
            .iter()
            .find(|(name, _)| *name == metatype)
            .map(|&(_, handler)| handler)
    }
}

/// Select the schema variant for a container version. Version 0x0A (the
/// final title generation) shares the SuperChargers tables.
pub fn variant_for_version(version: u32) -> Option<&'static VariantDescriptor> {
    match version {
        0x05 => Some(&SPYROS_ADVENTURE),
        0x06 => Some(&GIANTS),
        0x07 => Some(&SWAP_FORCE),
        0x08 => Some(&TRAP_TEAM),
        0x09 | 0x0A => Some(&SUPERCHARGERS),
        _ => None,
    }
}

// --- Platform-width tables --------------------------------------------------
//
// Index = platform id. The id space was reshuffled between title generations
// (slot 3 was DEPRECATED, later DURANGO; slot 12 was MARMALADE, later
// ASPEN64), so each generation carries its own table.

fn legacy_pointer_width(platform: u32) -> Option<bool> {
    const WIDE: [bool; 14] = [
        false, // DEFAULT
        false, // WIN32
        false, // WII
        true,  // DEPRECATED
        false, // ASPEN
        false, // XENON
        false, // PS3
        false, // OSX
        true,  // WIN64
        false, // CAFE
        false, // NGP
        false, // ANDROID
        false, // MARMALADE
        false, // MAX
    ];
    WIDE.get(platform as usize).copied()
}

fn swap_force_pointer_width(platform: u32) -> Option<bool> {
    const WIDE: [bool; 18] = [
        false, // DEFAULT
        false, // WIN32
        false, // WII
        true,  // DURANGO
        false, // ASPEN
        false, // XENON
        false, // PS3
        false, // OSX
        true,  // WIN64
        false, // CAFE
        false, // RASPI
        false, // ANDROID
        false, // MARMALADE
        false, // LGTV
        true,  // PS4
        false, // WP8
        false, // LINUX
        false, // MAX
    ];
    WIDE.get(platform as usize).copied()
}

fn superchargers_pointer_width(platform: u32) -> Option<bool> {
    const WIDE: [bool; 18] = [
        false, // DEFAULT
        false, // WIN32
        false, // WII
        true,  // DURANGO
        false, // ASPEN
        false, // XENON
        false, // PS3
        false, // OSX
        true,  // WIN64
        false, // CAFE
        false, // RASPI
        false, // ANDROID
        true,  // ASPEN64
        false, // LGTV
        true,  // PS4
        false, // WP8
        false, // LINUX
        false, // MAX
    ];
    WIDE.get(platform as usize).copied()
}

// --- Registries -------------------------------------------------------------

/// Handlers shared verbatim by the four scene-graph-shaped variants.
macro_rules! shared_graphics_types {
    () => {
        [
            ("igDataList", Handler::DataList),
            ("igNamedObject", Handler::NamedObject),
            ("igObjectList", Handler::ObjectList),
            ("igSkeleton2", Handler::Skeleton2),
            ("igSkeletonBoneList", Handler::SkeletonBoneList),
            ("igSkeletonBone", Handler::SkeletonBone),
            ("igGraphicsVertexBuffer", Handler::GraphicsVertexBuffer),
            ("igGraphicsIndexBuffer", Handler::GraphicsIndexBuffer),
            ("igVertexBuffer", Handler::VertexBuffer),
            ("igVertexFormat", Handler::VertexFormat),
            ("igIndexBuffer", Handler::IndexBuffer),
            ("igPS3EdgeGeometry", Handler::Ps3EdgeGeometry),
            ("igPS3EdgeGeometrySegment", Handler::Ps3EdgeGeometrySegment),
        ]
    };
}

macro_rules! registry {
    ($($extra:expr),* $(,)?) => {
        {
            const SHARED: [(&str, Handler); 13] = shared_graphics_types!();
            const EXTRA: &[(&str, Handler)] = &[$($extra),*];
            const LEN: usize = SHARED.len() + EXTRA.len();
            const TABLE: [(&str, Handler); LEN] = {
                let mut table = [("", Handler::Ignore); LEN];
                let mut i = 0;
                while i < SHARED.len() {
                    table[i] = SHARED[i];
                    i += 1;
                }
                let mut j = 0;
                while j < EXTRA.len() {
                    table[SHARED.len() + j] = EXTRA[j];
                    j += 1;
                }
                table
            };
            &TABLE
        }
    };
}

/// Skylanders: Spyro's Adventure (version 0x05).
pub static SPYROS_ADVENTURE: VariantDescriptor = VariantDescriptor {
    title: "Spyro's Adventure",
    pointer_width: legacy_pointer_width,
    registry: registry![
        ("igIntList", Handler::IntList),
        ("igEdgeGeometryAttr", Handler::EdgeGeometryAttr { new_mesh: true }),
        ("igGeometryAttr", Handler::GeometryAttr),
        ("igWiiGeometryAttr", Handler::GeometryAttr),
        ("igFxMaterialNode", Handler::Group),
        ("igActor2", Handler::Group),
        ("igGroup", Handler::Group),
        ("igSpatialNode", Handler::Group),
        ("igNodeList", Handler::ObjectList),
        ("igSceneInfo", Handler::SceneInfo),
        (
            "tfbSpriteInfo",
            Handler::SpriteInfo {
                context_data: off(0x00, 0xD0),
            },
        ),
        ("tfbPhysicsModel", Handler::PhysicsModel),
        ("tfbPhysicsBody", Handler::PhysicsBodyGiants),
        ("tfbBodyEntityInfo", Handler::EntityInfo),
        ("tfbWorldEntityInfo", Handler::EntityInfo),
        ("DrawableList", Handler::ObjectList),
        ("Drawable", Handler::Drawable),
        ("tfbPhysicsWorld", Handler::PhysicsWorldGiants),
        ("tfbPhysicsCombinerLink", Handler::PhysicsCombinerLink),
        (
            "tfbActorInfo",
            Handler::ActorInfo {
                model: off(0x00, 0xDC),
            },
        ),
        (
            "igBlendMatrixSelect",
            Handler::BlendMatrixSelect {
                bone_map: off(0x00, 0xB0),
            },
        ),
        ("tfbRuntimeTechniqueInstance", Handler::RuntimeTechniqueInstance),
    ],
};

/// Skylanders: Giants (version 0x06).
pub static GIANTS: VariantDescriptor = VariantDescriptor {
    title: "Giants",
    pointer_width: legacy_pointer_width,
    registry: registry![
        ("igIntList", Handler::IntList),
        ("igEdgeGeometryAttr", Handler::EdgeGeometryAttr { new_mesh: true }),
        ("igGeometryAttr", Handler::GeometryAttr),
        ("igWiiGeometryAttr", Handler::GeometryAttr),
        ("igFxMaterialNode", Handler::Group),
        ("igActor2", Handler::Group),
        ("igGroup", Handler::Group),
        ("igSpatialNode", Handler::Group),
        ("igNodeList", Handler::ObjectList),
        ("igSceneInfo", Handler::SceneInfo),
        (
            "tfbSpriteInfo",
            Handler::SpriteInfo {
                context_data: off(0x00, 0xD0),
            },
        ),
        ("tfbPhysicsModel", Handler::PhysicsModel),
        ("tfbPhysicsBody", Handler::PhysicsBodyGiants),
        ("tfbBodyEntityInfo", Handler::EntityInfo),
        ("tfbWorldEntityInfo", Handler::EntityInfo),
        ("DrawableList", Handler::ObjectList),
        ("Drawable", Handler::Drawable),
        ("tfbPhysicsWorld", Handler::PhysicsWorldGiants),
        ("tfbPhysicsCombinerLink", Handler::PhysicsCombinerLink),
        (
            "tfbActorInfo",
            Handler::ActorInfo {
                model: off(0x00, 0xDC),
            },
        ),
        (
            "igBlendMatrixSelect",
            Handler::BlendMatrixSelect {
                bone_map: off(0x00, 0xB4),
            },
        ),
        ("tfbRuntimeTechniqueInstance", Handler::RuntimeTechniqueInstance),
    ],
};

/// Skylanders: Swap Force (version 0x07).
pub static SWAP_FORCE: VariantDescriptor = VariantDescriptor {
    title: "Swap Force",
    pointer_width: swap_force_pointer_width,
    registry: registry![
        ("igIntList", Handler::IntList),
        ("igSceneInfo", Handler::SceneInfo),
        ("igGroup", Handler::Group),
        ("igActor2", Handler::Group),
        ("igTransform", Handler::Group),
        ("igFxMaterialNode", Handler::Group),
        ("igGeometry", Handler::Geometry),
        ("igWiiGeometry", Handler::Geometry),
        ("igNodeList", Handler::ObjectList),
        ("igAttrList", Handler::ObjectList),
        ("igEdgeGeometryAttr", Handler::EdgeGeometryAttr { new_mesh: false }),
        ("igGeometryAttr", Handler::GeometryAttr),
        ("igWiiGeometryAttr", Handler::GeometryAttr),
        ("asAnimationDatabase", Handler::AnimationDatabase),
        ("igAttrSet", Handler::AttrSet),
        (
            "igBlendMatrixSelect",
            Handler::BlendMatrixSelect {
                bone_map: off(0x00, 0xB4),
            },
        ),
        // Lost Islands exclusive indirections
        ("igSkeleton2Info", Handler::Skeleton2Info),
        ("igSkeleton2List", Handler::ObjectList),
        ("igAnimation2Info", Handler::Animation2Info),
        ("igAnimation2List", Handler::ObjectList),
        // Spyro's Adventure Wii U re-releases carry these node kinds but
        // their content is not decodable here.
        ("tfbSpriteInfo", Handler::Ignore),
        ("tfbPhysicsModel", Handler::Ignore),
        ("tfbPhysicsBody", Handler::Ignore),
        ("tfbBodyEntityInfo", Handler::Ignore),
    ],
};

/// Skylanders: Trap Team (version 0x08).
pub static TRAP_TEAM: VariantDescriptor = VariantDescriptor {
    title: "Trap Team",
    pointer_width: swap_force_pointer_width,
    registry: registry![
        ("igIntList", Handler::IntList),
        ("igEdgeGeometryAttr", Handler::EdgeGeometryAttr { new_mesh: false }),
        ("igGeometryAttr", Handler::GeometryAttr),
        ("igWiiGeometryAttr", Handler::GeometryAttr),
        ("igFxMaterialNode", Handler::Group),
        ("igNodeList", Handler::ObjectList),
        ("igIntListList", Handler::ObjectList),
        (
            "tfbSpriteInfo",
            Handler::SpriteInfo {
                context_data: off(0x00, 0xD8),
            },
        ),
        ("tfbPhysicsModel", Handler::PhysicsModel),
        ("tfbPhysicsBody", Handler::PhysicsBodyTrapTeam),
        ("tfbBodyEntityInfo", Handler::BodyEntityInfo),
        ("DrawableList", Handler::ObjectList),
        ("Drawable", Handler::Drawable),
        ("tfbPhysicsWorld", Handler::PhysicsWorldTrapTeam),
        ("tfbPhysicsCombinerLink", Handler::PhysicsCombinerLink),
        ("tfbWorldEntityInfo", Handler::EntityInfo),
        (
            "tfbActorInfo",
            Handler::ActorInfo {
                model: off(0x00, 0xEC),
            },
        ),
        // iOS exclusive node kinds
        ("igActor2", Handler::Group),
        ("tfbPointLightPicker", Handler::Group),
        (
            "igBlendMatrixSelect",
            Handler::BlendMatrixSelect {
                bone_map: off(0x00, 0xB4),
            },
        ),
        ("tfbMobileLodGeometry", Handler::MobileLodGeometry),
        ("igAttrList", Handler::ObjectList),
        ("igGroup", Handler::Group),
        ("igGeometry", Handler::Geometry),
    ],
};

/// Skylanders: SuperChargers (versions 0x09 and 0x0A).
pub static SUPERCHARGERS: VariantDescriptor = VariantDescriptor {
    title: "SuperChargers",
    pointer_width: superchargers_pointer_width,
    registry: registry![
        ("CGraphicsSkinInfo", Handler::GraphicsSkinInfo),
        ("igModelInfo", Handler::ModelInfo),
        ("igModelData", Handler::ModelData),
        ("igModelDrawCallData", Handler::ModelDrawCallData),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_variant_mapping() {
        assert_eq!(variant_for_version(0x05).unwrap().title, "Spyro's Adventure");
        assert_eq!(variant_for_version(0x06).unwrap().title, "Giants");
        assert_eq!(variant_for_version(0x07).unwrap().title, "Swap Force");
        assert_eq!(variant_for_version(0x08).unwrap().title, "Trap Team");
        assert_eq!(variant_for_version(0x09).unwrap().title, "SuperChargers");
        assert_eq!(variant_for_version(0x0A).unwrap().title, "SuperChargers");
        assert!(variant_for_version(0x04).is_none());
        assert!(variant_for_version(0x0B).is_none());
    }

    #[test]
    fn pointer_width_tables_differ_by_generation() {
        // slot 12: MARMALADE (32-bit) before SuperChargers, ASPEN64 after
        assert_eq!((GIANTS.pointer_width)(12), Some(false));
        assert_eq!((SWAP_FORCE.pointer_width)(12), Some(false));
        assert_eq!((SUPERCHARGERS.pointer_width)(12), Some(true));
        // PS4 only exists from Swap Force on
        assert_eq!((GIANTS.pointer_width)(14), None);
        assert_eq!((SWAP_FORCE.pointer_width)(14), Some(true));
        // WIN64 is wide everywhere
        for variant in [&SPYROS_ADVENTURE, &GIANTS, &SWAP_FORCE, &TRAP_TEAM, &SUPERCHARGERS] {
            assert_eq!((variant.pointer_width)(8), Some(true));
        }
        // unknown platform ids are rejected, not defaulted
        assert_eq!((SUPERCHARGERS.pointer_width)(99), None);
    }

    #[test]
    fn registries_resolve_shared_and_exclusive_types() {
        assert_eq!(
            SUPERCHARGERS.handler("igModelInfo"),
            Some(Handler::ModelInfo)
        );
        assert_eq!(SUPERCHARGERS.handler("igSceneInfo"), None);
        assert_eq!(SWAP_FORCE.handler("igSceneInfo"), Some(Handler::SceneInfo));
        assert_eq!(TRAP_TEAM.handler("Drawable"), Some(Handler::Drawable));
        assert_eq!(SWAP_FORCE.handler("tfbPhysicsBody"), Some(Handler::Ignore));
        assert_eq!(
            TRAP_TEAM.handler("tfbPhysicsBody"),
            Some(Handler::PhysicsBodyTrapTeam)
        );
        // every variant resolves the shared graphics kinds
        for variant in [&SPYROS_ADVENTURE, &GIANTS, &SWAP_FORCE, &TRAP_TEAM, &SUPERCHARGERS] {
            assert_eq!(variant.handler("igVertexBuffer"), Some(Handler::VertexBuffer));
            assert_eq!(
                variant.handler("igPS3EdgeGeometrySegment"),
                Some(Handler::Ps3EdgeGeometrySegment)
            );
            assert_eq!(variant.handler("igNotAThing"), None);
        }
    }

    #[test]
    fn blend_matrix_select_offset_differs_for_spyros_adventure() {
        let ssa = SPYROS_ADVENTURE.handler("igBlendMatrixSelect").unwrap();
        let ssf = SWAP_FORCE.handler("igBlendMatrixSelect").unwrap();
        assert_eq!(
            ssa,
            Handler::BlendMatrixSelect {
                bone_map: off(0x00, 0xB0)
            }
        );
        assert_eq!(
            ssf,
            Handler::BlendMatrixSelect {
                bone_map: off(0x00, 0xB4)
            }
        );
    }
}
