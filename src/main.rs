use std::path::PathBuf;

use clap::Parser;

use igzunpack::{DecodeOptions, IgzFile};

/// Inspect Alchemy engine IGZ scene containers.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// .igz / .bld file(s) to inspect
    files: Vec<PathBuf>,

    /// Skip blend-weight/blend-index decoding
    #[clap(long)]
    no_bones: bool,

    /// Skip index-buffer decoding
    #[clap(long)]
    no_faces: bool,

    /// Decode geometry and print per-mesh attribute statistics
    #[clap(long)]
    decode: bool,

    /// Only decode the object at this file offset (hex with 0x prefix)
    #[clap(long, value_parser = parse_offset)]
    first_object: Option<u64>,

    /// Maximum number of models to decode
    #[clap(long, default_value_t = 50)]
    max_models: usize,

    /// Reject Wii files instead of decoding them with known gaps
    #[clap(long)]
    strict_platform: bool,
}

fn parse_offset(s: &str) -> Result<u64, std::num::ParseIntError> {
    match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn main() -> Result<(), igzunpack::error::Error> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    for path in &args.files {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { memmap2::MmapOptions::new().map(&file)? };

        let options = DecodeOptions::builder()
            .build_bones(!args.no_bones)
            .build_faces(!args.no_faces)
            .allow_legacy_platform(!args.strict_platform)
            .maybe_first_object_offset(args.first_object)
            .model_count_ceiling(args.max_models)
            .build();

        let igz = IgzFile::parse_with_options(mmap.to_vec(), options)?;
        println!(
            "{}: version 0x{:02X}, platform {}, endianness {:?}, {} models",
            path.display(),
            igz.container.version,
            igz.container.platform,
            igz.container.endianness,
            igz.models.len()
        );
        for model in &igz.models {
            println!(
                "  model 0x{:X}: {} meshes, {} bones, {} bone maps",
                model.id,
                model.meshes.len(),
                model.bone_list.len(),
                model.bone_map_list.len()
            );
        }

        if args.decode {
            for (model, meshes) in igz.models.iter().zip(igz.decode_models()) {
                for (mesh, decoded) in model
                    .meshes
                    .iter()
                    .filter(|m| m.vertex_count > 0 || m.is_ps3)
                    .zip(meshes)
                {
                    println!(
                        "    mesh {:?}: {} vertices, {} triangles, {} normals, {} uvs, {} colors, {} weighted",
                        mesh.name,
                        decoded.positions.len(),
                        decoded.triangles.len(),
                        decoded.normals.len(),
                        decoded.uvs.len(),
                        decoded.colors.len(),
                        decoded.weights.len()
                    );
                }
            }
        }
    }
    Ok(())
}
