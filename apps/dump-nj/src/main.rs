// This file is part of OpenNJ.
//
// OpenNJ is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// OpenNJ is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with OpenNJ.  If not, see <http://www.gnu.org/licenses/>.
mod axis;
mod export_gltf;

use crate::{
    axis::{Axis, AxisConversion},
    export_gltf::export_gltf,
};
use anyhow::{bail, Context, Result};
use log::debug;
use nj::{decode_object_tree, decode_with_options, DecodeOptions, Mesh, SceneGraph, SceneNode};
use std::{
    fs,
    num::ParseIntError,
    path::{Path, PathBuf},
};
use structopt::StructOpt;

fn parse_number(s: &str) -> Result<u32, ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

/// Dump SEGA Ninja chunk models (NJCM)
#[derive(Debug, StructOpt)]
struct Opt {
    /// Address the data was loaded at; subtracted from every stored pointer
    #[structopt(short, long, default_value = "0", parse(try_from_str = parse_number))]
    pointer_offset: u32,

    /// Decode a bare object tree at this file offset instead of a container
    #[structopt(short, long, parse(try_from_str = parse_number))]
    object: Option<u32>,

    /// Show the object hierarchy
    #[structopt(short, long)]
    tree: bool,

    /// Show details of every mesh
    #[structopt(short, long)]
    meshes: bool,

    /// Export each input as glTF into this directory
    #[structopt(short, long, parse(from_os_str))]
    gltf: Option<PathBuf>,

    /// Forward axis of the source model
    #[structopt(long, default_value = "-z", allow_hyphen_values = true)]
    forward: Axis,

    /// Up axis of the source model
    #[structopt(long, default_value = "y", allow_hyphen_values = true)]
    up: Axis,

    /// Ninja files to dump
    #[structopt(parse(from_os_str))]
    inputs: Vec<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();
    let axes = AxisConversion::new(opt.forward, opt.up)?;
    let options = DecodeOptions::with_pointer_offset(opt.pointer_offset);

    let mut failed = 0;
    for input in &opt.inputs {
        if let Err(e) = dump_file(input, &opt, &options, &axes) {
            eprintln!("{}: {:#}", input.display(), e);
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{} of {} inputs failed", failed, opt.inputs.len());
    }

    Ok(())
}

fn dump_file(
    path: &Path,
    opt: &Opt,
    options: &DecodeOptions,
    axes: &AxisConversion,
) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    debug!("read {} bytes from {}", data.len(), path.display());
    let graph = match opt.object {
        Some(offset) => decode_object_tree(&data, offset as usize, options),
        None => decode_with_options(&data, options),
    }
    .with_context(|| format!("decoding {}", path.display()))?;

    let title = path.display().to_string();
    println!("{}", title);
    println!("{}", "=".repeat(title.len()));
    println!(
        "roots: {}, objects: {}, meshes: {}, warnings: {}",
        graph.roots.len(),
        graph.node_count(),
        graph.meshes.len(),
        graph.warnings().count()
    );
    for warning in graph.warnings() {
        println!("  warning: {}", warning);
    }

    if opt.tree {
        println!();
        for root in &graph.roots {
            show_node(&graph, root, 0);
        }
    }

    if opt.meshes {
        for (i, mesh) in graph.meshes.iter().enumerate() {
            println!();
            show_mesh(i, mesh);
        }
    }

    if let Some(dir) = &opt.gltf {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_owned());
        let output = export_gltf(&graph, dir, &name, axes)?;
        println!("Writing: {}", output.display());
    }
    println!();

    Ok(())
}

fn show_node(graph: &SceneGraph, node: &SceneNode, depth: usize) {
    let t = &node.transform;
    let angles = t.euler_radians();
    let mesh = match node.mesh.and_then(|id| graph.mesh(id).map(|m| (id, m))) {
        Some((id, m)) => format!(
            "mesh{} ({}v/{}f)",
            id.index(),
            m.vertices.len(),
            m.faces.len()
        ),
        None => "-".to_owned(),
    };
    println!(
        "{:indent$}{:08X} pos({:.3}, {:.3}, {:.3}) rot({:.3}, {:.3}, {:.3}) scale({:.3}, {:.3}, {:.3}) {}",
        "",
        node.eval_flags,
        t.position.x,
        t.position.y,
        t.position.z,
        angles.x,
        angles.y,
        angles.z,
        t.scale.x,
        t.scale.y,
        t.scale.z,
        mesh,
        indent = depth * 2
    );
    for child in &node.children {
        show_node(graph, child, depth + 1);
    }
}

fn show_mesh(index: usize, mesh: &Mesh) {
    let flipped = mesh.faces.iter().filter(|f| f.flipped).count();
    println!("mesh{}", index);
    println!("{:>12}: {}", "vertices", mesh.vertices.len());
    println!("{:>12}: {} ({} flipped)", "faces", mesh.faces.len(), flipped);
    println!("{:>12}: {}", "normals", mesh.has_normals());
    println!("{:>12}: {}", "colors", mesh.color_layer.is_some());
    println!("{:>12}: {}", "uv", mesh.uv_layer.is_some());
    println!("{:>12}: {}", "uv2", mesh.uv_layer_2.is_some());
    for warning in &mesh.warnings {
        println!("{:>12}: {}", "warning", warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_decimal_and_hex() {
        assert_eq!(parse_number("0"), Ok(0));
        assert_eq!(parse_number("1234"), Ok(1234));
        assert_eq!(parse_number("0x8C010000"), Ok(0x8C01_0000));
        assert_eq!(parse_number("0XfF"), Ok(0xFF));
        assert!(parse_number("0x").is_err());
        assert!(parse_number("twelve").is_err());
    }

    #[test]
    fn it_parses_the_command_line() -> Result<()> {
        let opt = Opt::from_iter_safe(&[
            "dump-nj",
            "-p",
            "0x8C000000",
            "--forward",
            "y",
            "--up",
            "-z",
            "--tree",
            "model.nj",
        ])?;
        assert_eq!(opt.pointer_offset, 0x8C00_0000);
        assert_eq!(opt.forward, Axis::Y);
        assert_eq!(opt.up, Axis::NegZ);
        assert!(opt.tree);
        assert!(!opt.meshes);
        assert_eq!(opt.inputs, vec![PathBuf::from("model.nj")]);
        Ok(())
    }
}
