use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bsp_reader::bsp::LumpKind;
use bsp_reader::{build_model_geometry, Bsp, GeometryOptions};
use clap::Parser;
use memmap::Mmap;

use crate::obj::ObjWriter;

mod logger;
mod obj;

#[derive(clap::Parser)]
#[clap(name = "bsp-mesh", version, about)]
struct Args {
    /// Log more detail; repeat for debug and trace output
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Prints the header, the lump directory, and record counts
    Info { map: PathBuf },

    /// Lists the textures the map references
    Textures { map: PathBuf },

    /// Lists the static props placed in the map
    Props { map: PathBuf },

    /// Writes a model's geometry as a Wavefront OBJ file
    ExportObj {
        map: PathBuf,

        #[clap(long)]
        output: PathBuf,

        /// Model to export; 0 is the world
        #[clap(long, default_value_t = 0)]
        model: usize,

        /// Keep each displacement's own normals where it meets its neighbors
        #[clap(long)]
        no_smooth: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.verbose)?;

    match args.command {
        Command::Info { map } => with_map(&map, info),
        Command::Textures { map } => with_map(&map, textures),
        Command::Props { map } => with_map(&map, props),
        Command::ExportObj {
            map,
            output,
            model,
            no_smooth,
        } => with_map(&map, |bsp| {
            let options = GeometryOptions {
                smooth_displacement_normals: !no_smooth,
            };
            export_obj(bsp, &output, model, &options)
        }),
    }
}

fn with_map(path: &Path, f: impl FnOnce(&Bsp) -> Result<()>) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Opening map file {:?}", path))?;
    let data = unsafe { Mmap::map(&file) }?;
    let bsp = Bsp::parse(&data).with_context(|| format!("Parsing map file {:?}", path))?;
    f(&bsp)
}

fn info(bsp: &Bsp) -> Result<()> {
    let stdout = stdout();
    let mut out = stdout.lock();

    let header = bsp.header();
    writeln!(out, "version: {}", header.version)?;
    writeln!(out, "revision: {}", header.map_revision)?;
    writeln!(out, "size: {} bytes", bsp.data().len())?;

    writeln!(out, "lumps:")?;
    for kind in LumpKind::ALL {
        let lump = &header.lumps[kind.index()];
        if lump.length == 0 {
            continue;
        }
        writeln!(
            out,
            "  {:>2} {:<22} offset {:>9} length {:>9} version {}",
            kind.index(),
            format!("{kind:?}"),
            lump.offset,
            lump.length,
            lump.version,
        )?;
    }

    writeln!(out, "planes: {}", bsp.planes().len())?;
    writeln!(out, "vertices: {}", bsp.vertices().len())?;
    writeln!(out, "edges: {}", bsp.edges().len())?;
    writeln!(out, "faces: {}", bsp.faces().len())?;
    writeln!(out, "texture infos: {}", bsp.tex_infos().len())?;
    writeln!(out, "textures: {}", bsp.tex_datas().len())?;
    writeln!(out, "models: {}", bsp.models().len())?;
    writeln!(out, "displacements: {}", bsp.disp_infos().len())?;
    for entry in bsp.game_lumps() {
        writeln!(
            out,
            "game lump {} version {}: {} bytes",
            entry.id_string(),
            entry.version,
            entry.length,
        )?;
    }
    if let Some(static_props) = bsp.static_props() {
        writeln!(
            out,
            "static props: {} (lump version {})",
            static_props.props.len(),
            static_props.version,
        )?;
    }
    out.flush()?;
    Ok(())
}

fn textures(bsp: &Bsp) -> Result<()> {
    let stdout = stdout();
    let mut out = stdout.lock();
    for (index, texture) in bsp.textures()?.iter().enumerate() {
        writeln!(
            out,
            "{index:>4} {:>4}x{:<4} {}",
            texture.width, texture.height, texture.name,
        )?;
    }
    out.flush()?;
    Ok(())
}

fn props(bsp: &Bsp) -> Result<()> {
    let static_props = match bsp.static_props() {
        Some(static_props) => static_props,
        None => {
            println!("no supported static prop lump");
            return Ok(());
        }
    };

    let stdout = stdout();
    let mut out = stdout.lock();
    for (prop, model_name) in static_props.iter_named() {
        let [x, y, z] = prop.origin;
        let [pitch, yaw, roll] = prop.angles;
        writeln!(
            out,
            "{model_name} at ({x}, {y}, {z}) angles ({pitch}, {yaw}, {roll}) skin {} solid {} \
             fade {}..{}",
            prop.skin, prop.solid, prop.fade_min_dist, prop.fade_max_dist,
        )?;
    }
    out.flush()?;
    Ok(())
}

fn export_obj(bsp: &Bsp, output: &Path, model: usize, options: &GeometryOptions) -> Result<()> {
    let surfaces = build_model_geometry(bsp, model, options)
        .with_context(|| format!("Building geometry for model {model}"))?;
    let names: Vec<&str> = bsp
        .textures()?
        .iter()
        .map(|texture| texture.name)
        .collect();

    let file = File::create(output).with_context(|| format!("Creating {:?}", output))?;
    let mut writer = ObjWriter::new(BufWriter::new(file));
    for surface in &surfaces {
        let material = names.get(surface.tex_data).copied().unwrap_or("unknown");
        writer.write_surface(surface, material)?;
    }
    let (vertices, triangles) = (writer.vertex_count(), writer.triangle_count());
    writer.finish()?.flush()?;

    println!(
        "Wrote {} surfaces, {vertices} vertices, {triangles} triangles to {:?}",
        surfaces.len(),
        output,
    );
    Ok(())
}
