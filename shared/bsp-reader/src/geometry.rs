use bytemuck::{Pod, Zeroable};
use log::trace;
use nalgebra_glm::{cross, dot, normalize, vec2, vec4, Vec2, Vec3, Vec4};

use crate::bsp::{Bsp, Face, TexData, TexInfo};
use crate::error::Result;

/// A renderable vertex. The tangent's fourth component is the bitangent sign.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 4],
    pub uv: [f32; 2],
    pub alpha: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    /// Triangle list, three indices per triangle.
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Projects a position onto the texture axes, normalized by the texture size.
pub fn texture_coordinates(position: &Vec3, tex_info: &TexInfo, tex_data: &TexData) -> Vec2 {
    let [s, t] = &tex_info.texture_vecs;
    vec2(
        (dot(&tex_info.s_axis(), position) + s[3]) / tex_data.width as f32,
        (dot(&tex_info.t_axis(), position) + t[3]) / tex_data.height as f32,
    )
}

/// Orthogonalizes the texture's s axis against `normal`. The sign records whether the t axis agrees
/// with `normal × tangent`.
pub fn tangent(normal: &Vec3, tex_info: &TexInfo) -> Vec4 {
    let s_axis = tex_info.s_axis();
    let tangent = normalize(&(s_axis - normal * dot(normal, &s_axis)));
    let sign = if dot(&cross(normal, &tangent), &tex_info.t_axis()) < 0.0 {
        -1.0
    } else {
        1.0
    };
    vec4(tangent.x, tangent.y, tangent.z, sign)
}

/// Whether a face is triangulated as a flat polygon.
///
/// Faces without texture info, with a hidden surface flag, with fewer than three edges, or with a
/// displacement are not.
pub fn is_flat_drawable(bsp: &Bsp, face: &Face) -> Result<bool> {
    let tex_info = match face.tex_info_index() {
        Some(index) => bsp.tex_info(index)?,
        None => return Ok(false),
    };
    Ok(tex_info.surface_flags().is_drawable()
        && face.edge_count() >= 3
        && face.disp_info_index().is_none())
}

/// Vertex count of a flat face's mesh.
pub fn vertex_count(face: &Face) -> usize {
    face.edge_count()
}

/// Index count of a flat face's triangle fan.
pub fn index_count(face: &Face) -> usize {
    face.edge_count().saturating_sub(2) * 3
}

/// Fan-triangulates a flat face. Returns `None` for faces that are not drawn as flat polygons.
///
/// Every vertex takes the plane normal unmodified, regardless of the face's side.
pub fn triangulate_face(bsp: &Bsp, face_index: usize) -> Result<Option<Mesh>> {
    let face = bsp.face(face_index)?;
    if !is_flat_drawable(bsp, face)? {
        return Ok(None);
    }
    let tex_info = bsp.tex_info(face.tex_info as usize)?;
    let tex_data = bsp.tex_data_for(tex_info)?;
    let normal = bsp.plane(face.plane_num as usize)?.normal_vec();
    let tangent: [f32; 4] = tangent(&normal, tex_info).into();

    let edge_count = face.edge_count();
    let vertices = (0..edge_count)
        .map(|index| {
            let position = Vec3::from(bsp.face_vertex(face, index)?);
            Ok(Vertex {
                position: position.into(),
                normal: normal.into(),
                tangent,
                uv: texture_coordinates(&position, tex_info, tex_data).into(),
                alpha: 0.0,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut indices = Vec::with_capacity(index_count(face));
    for i in 1..edge_count as u32 - 1 {
        indices.extend_from_slice(&[0, i, i + 1]);
    }
    trace!(
        "face {face_index}: {} vertices, {} triangles",
        vertices.len(),
        indices.len() / 3,
    );

    Ok(Some(Mesh { vertices, indices }))
}
