//! Top-level IGZ decoding entry points.
//!
//! `IgzFile::parse` loads a container, selects the schema variant for its
//! version, walks the object graph, and hands back model records. Geometry
//! stays raw until a caller materializes it with [`IgzFile::decode_mesh`].

use bon::Builder;
use tracing::{debug, warn};

use crate::data::container::{self, Container, ContainerError};
use crate::error::IgzResult;
use crate::graph::GraphWalker;
use crate::graph::variant::variant_for_version;
use crate::models::mesh::{DecodedMesh, MeshDecodeContext, decode_mesh};
use crate::models::{MeshObject, ModelObject};

/// The Wii platform id, stable across every title generation.
pub const WII_PLATFORM: u32 = 2;

/// Decode-time options. All switches default to on; the ceiling matches the
/// interactive importer's prompt threshold.
#[derive(Debug, Clone, Builder)]
pub struct DecodeOptions {
    /// Materialize geometry in [`IgzFile::decode_models`].
    #[builder(default = true)]
    pub build_meshes: bool,
    /// Decode blend-weight/blend-index attributes.
    #[builder(default = true)]
    pub build_bones: bool,
    /// Decode index buffers into triangles.
    #[builder(default = true)]
    pub build_faces: bool,
    /// Wii files decode with known gaps; allow them anyway.
    #[builder(default = true)]
    pub allow_legacy_platform: bool,
    /// Decode a single object at this offset instead of the root list.
    pub first_object_offset: Option<u64>,
    /// Upper bound on models materialized by [`IgzFile::decode_models`].
    #[builder(default = 50)]
    pub model_count_ceiling: usize,
}

impl Default for DecodeOptions {
    fn default() -> DecodeOptions {
        DecodeOptions::builder().build()
    }
}

/// A fully parsed IGZ file: the loaded container plus every model the graph
/// walk produced.
#[derive(Debug)]
pub struct IgzFile {
    pub container: Container,
    pub models: Vec<ModelObject>,
    options: DecodeOptions,
}

impl IgzFile {
    /// Parse with default options.
    pub fn parse(data: Vec<u8>) -> IgzResult<IgzFile> {
        IgzFile::parse_with_options(data, DecodeOptions::default())
    }

    pub fn parse_with_options(data: Vec<u8>, options: DecodeOptions) -> IgzResult<IgzFile> {
        let (_, version) = container::detect(&data)?;
        let variant =
            variant_for_version(version).ok_or(ContainerError::UnsupportedVersion(version))?;
        let container = Container::parse(data, variant.pointer_width)?;
        debug!(
            version = container.version,
            platform = container.platform,
            variant = variant.title,
            "loaded container"
        );

        if !options.allow_legacy_platform
            && container.version < 0x0A
            && container.platform == WII_PLATFORM
        {
            return Err(ContainerError::UnsupportedPlatform {
                version: container.version,
                platform: container.platform,
            }
            .into());
        }

        let mut walker = GraphWalker::new(&container, variant);
        match options.first_object_offset {
            Some(offset) => walker.walk_object(offset)?,
            None => walker.walk_root()?,
        }
        let models = walker.into_models();

        Ok(IgzFile {
            container,
            models,
            options,
        })
    }

    /// Decode one mesh of one model into attribute arrays.
    pub fn decode_mesh(&self, model: &ModelObject, mesh: &MeshObject) -> DecodedMesh {
        let ctx = MeshDecodeContext {
            bone_maps: &model.bone_map_list,
            endianness: self.container.endianness,
            version: self.container.version,
            platform: self.container.platform,
            build_bones: self.options.build_bones,
            build_faces: self.options.build_faces,
        };
        decode_mesh(mesh, &ctx)
    }

    /// Decode geometry for every model, up to the configured ceiling. Meshes
    /// with no vertex data are skipped.
    pub fn decode_models(&self) -> Vec<Vec<DecodedMesh>> {
        if !self.options.build_meshes {
            return Vec::new();
        }
        let limit = self.options.model_count_ceiling.min(self.models.len());
        if limit < self.models.len() {
            warn!(
                total = self.models.len(),
                limit, "model count exceeds ceiling, truncating"
            );
        }
        self.models[..limit]
            .iter()
            .map(|model| {
                model
                    .meshes
                    .iter()
                    .filter(|mesh| mesh.vertex_count > 0 || mesh.is_ps3)
                    .map(|mesh| self.decode_mesh(model, mesh))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use glam::Mat4;

    const MAGIC: u32 = 0x015A4749;
    const SEG0: u32 = 0x240;
    const SEG1: u32 = 0x500;

    fn put_u32(data: &mut Vec<u8>, offset: usize, value: u32) {
        if data.len() < offset + 4 {
            data.resize(offset + 4, 0);
        }
        data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn put_f32(data: &mut Vec<u8>, offset: usize, value: f32) {
        put_u32(data, offset, value.to_bits());
    }

    fn table_fixup(tag: u32, entries: &[&str]) -> Vec<u8> {
        let mut body = Vec::new();
        for entry in entries {
            body.extend_from_slice(entry.as_bytes());
            body.push(0);
            if body.len() % 2 != 0 {
                body.push(0);
            }
        }
        let mut record = Vec::new();
        record.extend_from_slice(&tag.to_le_bytes());
        record.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        record.extend_from_slice(&((0x10 + body.len()) as u32).to_le_bytes());
        record.extend_from_slice(&0x10u32.to_le_bytes());
        record.extend_from_slice(&body);
        record
    }

    /// A little-endian version-9 (SuperChargers, WIN32) container skeleton:
    /// fixup tables at segment 0, object area from segment 1 up.
    fn base_container(metatypes: &[&str], strings: &[&str]) -> Vec<u8> {
        let mut data = Vec::new();
        put_u32(&mut data, 0x00, MAGIC);
        put_u32(&mut data, 0x04, 0x09);
        put_u32(&mut data, 0x08, 0);
        put_u32(&mut data, 0x0C, 1); // platform: WIN32
        put_u32(&mut data, 0x10, 2); // fixup records
        put_u32(&mut data, 0x18, SEG0);
        put_u32(&mut data, 0x28, SEG1);
        data.resize(SEG0 as usize, 0);
        data.extend_from_slice(&table_fixup(0x5445_4D54, metatypes)); // TMET
        data.extend_from_slice(&table_fixup(0x5254_5354, strings)); // TSTR
        data.resize(0x800, 0);
        data
    }

    /// Write the root object list at segment 1: entry pointers live at
    /// segment-local 0x40, each raw value is segment-local.
    fn set_root_list(data: &mut Vec<u8>, entries: &[u32]) {
        let base = SEG1 as usize;
        put_u32(data, base + 0x08, entries.len() as u32); // count
        put_u32(data, base + 0x0C, entries.len() as u32); // capacity
        put_u32(data, base + 0x10, entries.len() as u32 * 4); // memref size
        put_u32(data, base + 0x14, 0x40); // memref pointer (selector 0)
        for (i, &raw) in entries.iter().enumerate() {
            put_u32(data, base + 0x40 + i * 4, raw);
        }
    }

    #[test]
    fn unregistered_type_soft_skips_to_zero_models() {
        let mut data = base_container(&["igSomethingUnknown"], &[]);
        set_root_list(&mut data, &[0x80]);
        put_u32(&mut data, SEG1 as usize + 0x80, 0); // type index 0
        let igz = IgzFile::parse(data).unwrap();
        assert!(igz.models.is_empty());
    }

    #[test]
    fn out_of_range_type_index_soft_skips() {
        let mut data = base_container(&[], &[]);
        set_root_list(&mut data, &[0x80]);
        put_u32(&mut data, SEG1 as usize + 0x80, 5); // no metatype table at all
        let igz = IgzFile::parse(data).unwrap();
        assert!(igz.models.is_empty());
    }

    #[test]
    fn model_root_revisits_are_idempotent() {
        let mut data = base_container(&["igModelInfo"], &[]);
        // the same object is listed twice
        set_root_list(&mut data, &[0x80, 0x80]);
        let object = SEG1 as usize + 0x80;
        put_u32(&mut data, object, 0); // igModelInfo
        put_u32(&mut data, object + 0x14, 0x8000_0000); // model data: null
        let igz = IgzFile::parse(data).unwrap();
        assert_eq!(igz.models.len(), 1);
        assert_eq!(igz.models[0].id, SEG1 as u64 + 0x80);
    }

    #[test]
    fn self_referencing_pointer_does_not_recurse_forever() {
        let mut data = base_container(&["igModelInfo"], &[]);
        set_root_list(&mut data, &[0x80]);
        let object = SEG1 as usize + 0x80;
        put_u32(&mut data, object, 0);
        put_u32(&mut data, object + 0x14, 0x80); // model data points at itself
        let igz = IgzFile::parse(data).unwrap();
        assert_eq!(igz.models.len(), 1);
    }

    #[test]
    fn first_object_offset_override() {
        let mut data = base_container(&["igModelInfo"], &[]);
        // root list is empty; the object is only reachable via the override
        set_root_list(&mut data, &[]);
        let object = SEG1 as usize + 0x80;
        put_u32(&mut data, object, 0);
        put_u32(&mut data, object + 0x14, 0x8000_0000);

        let options = DecodeOptions::builder()
            .first_object_offset(SEG1 as u64 + 0x80)
            .build();
        let igz = IgzFile::parse_with_options(data, options).unwrap();
        assert_eq!(igz.models.len(), 1);
    }

    #[test]
    fn wii_files_can_be_rejected() {
        let mut data = base_container(&[], &[]);
        put_u32(&mut data, 0x0C, WII_PLATFORM);
        set_root_list(&mut data, &[]);
        let options = DecodeOptions::builder().allow_legacy_platform(false).build();
        let err = IgzFile::parse_with_options(data.clone(), options).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Container(ContainerError::UnsupportedPlatform { platform: 2, .. })
        ));
        // and accepted when allowed
        assert!(IgzFile::parse(data).is_ok());
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut data = base_container(&[], &[]);
        put_u32(&mut data, 0x04, 0x0B);
        let err = IgzFile::parse(data).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Container(ContainerError::UnsupportedVersion(0x0B))
        ));
    }

    #[test]
    fn skeleton_graph_decodes_bones() {
        let mut data = base_container(
            &[
                "CGraphicsSkinInfo",
                "igSkeleton2",
                "igSkeletonBoneList",
                "igSkeletonBone",
            ],
            &["root_bone"],
        );
        set_root_list(&mut data, &[0x80]);
        let seg = SEG1 as usize;

        // CGraphicsSkinInfo at local 0x80
        put_u32(&mut data, seg + 0x80, 0);
        put_u32(&mut data, seg + 0x80 + 0x14, 0x100); // skeleton
        put_u32(&mut data, seg + 0x80 + 0x18, 0x8000_0000); // skin: null

        // igSkeleton2 at local 0x100
        put_u32(&mut data, seg + 0x100, 1);
        put_u32(&mut data, seg + 0x100 + 0x0C, 0x180); // bone list
        put_u32(&mut data, seg + 0x100 + 0x10, 0x40); // inverse joints: size
        put_u32(&mut data, seg + 0x100 + 0x14, 0x200); // inverse joints: ptr

        // identity inverse-bind matrix at local 0x200
        for i in 0..4 {
            put_f32(&mut data, seg + 0x200 + i * 0x10 + i * 4, 1.0);
        }

        // igSkeletonBoneList at local 0x180
        put_u32(&mut data, seg + 0x180, 2);
        put_u32(&mut data, seg + 0x180 + 0x08, 1); // count
        put_u32(&mut data, seg + 0x180 + 0x0C, 1); // capacity
        put_u32(&mut data, seg + 0x180 + 0x10, 4); // memref size
        put_u32(&mut data, seg + 0x180 + 0x14, 0x1C0); // memref ptr
        put_u32(&mut data, seg + 0x1C0, 0x240); // -> bone object

        // igSkeletonBone at local 0x240
        put_u32(&mut data, seg + 0x240, 3);
        put_u32(&mut data, seg + 0x240 + 0x08, 0); // name: string table slot 0
        put_u32(&mut data, seg + 0x240 + 0x0C, 0); // parent index
        put_u32(&mut data, seg + 0x240 + 0x10, 0); // blend matrix index
        put_f32(&mut data, seg + 0x240 + 0x14, 1.0);
        put_f32(&mut data, seg + 0x240 + 0x18, 2.0);
        put_f32(&mut data, seg + 0x240 + 0x1C, 3.0);

        let igz = IgzFile::parse(data).unwrap();
        assert_eq!(igz.models.len(), 1);
        let model = &igz.models[0];
        assert_eq!(model.bone_matrices.len(), 0x40);
        assert_eq!(model.bone_list.len(), 1);
        let bone = &model.bone_list[0];
        assert_eq!(bone.name, "root_bone");
        assert_eq!(bone.index, 0);
        // the file's parent index is rebased by one
        assert_eq!(bone.parent_index, -1);
        assert_eq!(bone.translation, glam::Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bone.inverse_bind_matrix, Some(Mat4::IDENTITY));
        assert_eq!(bone.bind_matrix(), Some(Mat4::IDENTITY));
    }

    #[test]
    fn default_options() {
        let options = DecodeOptions::default();
        assert!(options.build_meshes);
        assert!(options.build_bones);
        assert!(options.build_faces);
        assert!(options.allow_legacy_platform);
        assert_eq!(options.first_object_offset, None);
        assert_eq!(options.model_count_ceiling, 50);
    }
}
