//! Whole-model geometry: every drawable face of a model as a mesh, ready for upload.

use log::{debug, trace};

use crate::bsp::{Bsp, Face, LumpKind};
use crate::displacement::{smooth_neighbor_normals, tessellate_all, Displacement};
use crate::error::{Error, Result};
use crate::geometry::{triangulate_face, Mesh};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeometryOptions {
    /// Reconcile normals and tangents where displacements meet.
    pub smooth_displacement_normals: bool,
}

impl Default for GeometryOptions {
    fn default() -> Self {
        Self {
            smooth_displacement_normals: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceKind {
    Flat,
    Displacement { index: usize },
}

/// The mesh of one face.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    pub face_index: usize,
    /// Index into the texture data lump, for grouping surfaces by material.
    pub tex_data: usize,
    pub kind: SurfaceKind,
    pub mesh: Mesh,
}

/// Builds the meshes of every drawable face of a model, in face order.
///
/// Displacements are tessellated and smoothed across the whole map, since their neighbors may
/// belong to any model, but only those on the model's faces are returned.
pub fn build_model_geometry(
    bsp: &Bsp,
    model_index: usize,
    options: &GeometryOptions,
) -> Result<Vec<Surface>> {
    let faces: Vec<(usize, &Face)> = bsp.model_faces(model_index)?.collect();

    let displacements = if faces.iter().any(|(_, face)| face.disp_info_index().is_some()) {
        let mut displacements = tessellate_all(bsp)?;
        if options.smooth_displacement_normals {
            smooth_neighbor_normals(&mut displacements)?;
        }
        displacements
    } else {
        Vec::new()
    };

    let mut surfaces = Vec::new();
    for (face_index, face) in faces {
        let tex_info_index = match face.tex_info_index() {
            Some(index) => index,
            None => continue,
        };
        let tex_info = bsp.tex_info(tex_info_index)?;
        let tex_data = tex_info.tex_data as usize;

        let (kind, mesh) = match face.disp_info_index() {
            Some(index) => {
                if !tex_info.surface_flags().is_drawable() {
                    continue;
                }
                let displacement = displacement_for_face(&displacements, index, face_index)?;
                (SurfaceKind::Displacement { index }, displacement.to_mesh())
            }
            None => match triangulate_face(bsp, face_index)? {
                Some(mesh) => (SurfaceKind::Flat, mesh),
                None => continue,
            },
        };
        trace!(
            "face {face_index}: {kind:?} surface with {} triangles",
            mesh.triangle_count(),
        );
        surfaces.push(Surface {
            face_index,
            tex_data,
            kind,
            mesh,
        });
    }

    debug!(
        "model {model_index}: {} surfaces, {} vertices, {} triangles",
        surfaces.len(),
        surfaces.iter().map(|s| s.mesh.vertices.len()).sum::<usize>(),
        surfaces.iter().map(|s| s.mesh.triangle_count()).sum::<usize>(),
    );
    Ok(surfaces)
}

fn displacement_for_face(
    displacements: &[Displacement],
    index: usize,
    face_index: usize,
) -> Result<&Displacement> {
    let displacement = displacements.get(index).ok_or_else(|| {
        Error::out_of_bounds(
            LumpKind::DispInfo,
            format!("face {face_index} displacement {index} of {}", displacements.len()),
        )
    })?;
    if displacement.face_index != face_index {
        return Err(Error::invalid_body(
            LumpKind::DispInfo,
            format!(
                "face {face_index} names displacement {index}, which belongs to face {}",
                displacement.face_index,
            ),
        ));
    }
    Ok(displacement)
}
