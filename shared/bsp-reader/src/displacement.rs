//! Displacement surfaces: a face subdivided into a `(2^power + 1)²` vertex grid and pushed along a
//! per-vertex offset field.
//!
//! Grid coordinates run `x` from corner 0 towards corner 3 and `y` from corner 0 towards corner 1,
//! where corner 0 is the face vertex nearest the displacement's start position.

use std::ops::{Add, Mul, Sub};

use log::debug;
use nalgebra_glm::{cross, distance, distance2, normalize, Vec2, Vec3};

use crate::bsp::{Bsp, DispInfo, DispSubNeighbor, LumpKind, NeighborOrientation, NeighborSpan};
use crate::error::{Error, Result};
use crate::geometry::{tangent, texture_coordinates, Mesh, Vertex};
use crate::limits::{MAX_DISP_CORNER_NEIGHBORS, MAX_MAP_DISP_POWER, MIN_MAP_DISP_POWER};

mod smoothing;
mod sub_edge;

pub use smoothing::smooth_neighbor_normals;
pub use sub_edge::{Axis, GridCoord, SubEdgeIterator};

/// Corners within this distance of each other are treated as shared.
pub const CORNER_MATCH_TOLERANCE: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridCorner {
    LowerLeft = 0,
    UpperLeft = 1,
    UpperRight = 2,
    LowerRight = 3,
}

impl GridCorner {
    pub const ALL: [GridCorner; 4] = [
        GridCorner::LowerLeft,
        GridCorner::UpperLeft,
        GridCorner::UpperRight,
        GridCorner::LowerRight,
    ];

    /// Wraps `index` into `0..4`.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index & 3]
    }

    pub fn coord(self, side_len: i32) -> GridCoord {
        let max = side_len - 1;
        match self {
            Self::LowerLeft => GridCoord::new(0, 0),
            Self::UpperLeft => GridCoord::new(0, max),
            Self::UpperRight => GridCoord::new(max, max),
            Self::LowerRight => GridCoord::new(max, 0),
        }
    }
}

/// An edge of the grid. Each edge runs from the corner with the same index to the next corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridEdge {
    Left = 0,
    Top = 1,
    Right = 2,
    Bottom = 3,
}

impl GridEdge {
    pub const ALL: [GridEdge; 4] = [
        GridEdge::Left,
        GridEdge::Top,
        GridEdge::Right,
        GridEdge::Bottom,
    ];

    /// Wraps `index` into `0..4`.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index & 3]
    }
}

/// A validated edge adjacency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubNeighbor {
    /// Index of the neighboring displacement.
    pub index: usize,
    pub orientation: NeighborOrientation,
    pub span: NeighborSpan,
    pub neighbor_span: NeighborSpan,
}

/// A tessellated displacement, addressed by its displacement info index.
#[derive(Clone, Debug, PartialEq)]
pub struct Displacement {
    pub index: usize,
    pub face_index: usize,
    pub power: u32,
    /// Row-major, `y * side_len + x`.
    pub vertices: Vec<Vertex>,
    pub edge_neighbors: [[Option<SubNeighbor>; 2]; 4],
    pub corner_neighbors: [Vec<usize>; 4],
}

impl Displacement {
    pub fn side_len(&self) -> usize {
        (1 << self.power) + 1
    }

    pub fn vertex_index(&self, x: usize, y: usize) -> usize {
        y * self.side_len() + x
    }

    pub fn corner_vertex_index(&self, corner: GridCorner) -> usize {
        let coord = corner.coord(self.side_len() as i32);
        self.vertex_index(coord.x as usize, coord.y as usize)
    }

    pub fn edge_midpoint_index(&self, edge: GridEdge) -> usize {
        let end = self.side_len() - 1;
        let mid = self.side_len() / 2;
        match edge {
            GridEdge::Left => self.vertex_index(0, mid),
            GridEdge::Top => self.vertex_index(mid, end),
            GridEdge::Right => self.vertex_index(end, mid),
            GridEdge::Bottom => self.vertex_index(mid, 0),
        }
    }

    /// The corner nearest `position`, if it is within [`CORNER_MATCH_TOLERANCE`].
    pub fn find_corner(&self, position: &Vec3) -> Option<GridCorner> {
        let mut closest = None;
        let mut closest_distance = f32::MAX;
        for corner in GridCorner::ALL {
            let vertex = &self.vertices[self.corner_vertex_index(corner)];
            let d = distance(&Vec3::from(vertex.position), position);
            if d < closest_distance {
                closest = Some(corner);
                closest_distance = d;
            }
        }
        closest.filter(|_| closest_distance <= CORNER_MATCH_TOLERANCE)
    }

    /// Every other displacement adjacent through an edge or a corner, each listed once.
    pub fn neighbor_indices(&self) -> Vec<usize> {
        let corners = self.corner_neighbors.iter().flatten().copied();
        let edges = self
            .edge_neighbors
            .iter()
            .flatten()
            .flatten()
            .map(|sub| sub.index);
        let mut result = Vec::new();
        for index in corners.chain(edges) {
            if index != self.index && !result.contains(&index) {
                result.push(index);
            }
        }
        result
    }

    /// Two triangles per grid quad, `(bottom left, top left, top right)` then
    /// `(bottom left, top right, bottom right)`.
    pub fn indices(&self) -> Vec<u32> {
        let side_len = self.side_len() as u32;
        let quads = side_len - 1;
        let mut indices = Vec::with_capacity((quads * quads * 6) as usize);
        for x in 0..quads {
            for y in 0..quads {
                let bottom_left = y * side_len + x;
                let top_left = (y + 1) * side_len + x;
                let top_right = (y + 1) * side_len + x + 1;
                let bottom_right = y * side_len + x + 1;
                indices.extend_from_slice(&[
                    bottom_left,
                    top_left,
                    top_right,
                    bottom_left,
                    top_right,
                    bottom_right,
                ]);
            }
        }
        indices
    }

    pub fn to_mesh(&self) -> Mesh {
        Mesh {
            vertices: self.vertices.clone(),
            indices: self.indices(),
        }
    }
}

/// Tessellates every displacement in the map, in index order, so that neighbor indices address the
/// returned vector.
pub fn tessellate_all(bsp: &Bsp) -> Result<Vec<Displacement>> {
    let displacements = (0..bsp.disp_infos().len())
        .map(|index| tessellate(bsp, index))
        .collect::<Result<Vec<_>>>()?;
    debug!("tessellated {} displacements", displacements.len());
    Ok(displacements)
}

/// Expands one displacement into its vertex grid with provisional normals and tangents.
pub fn tessellate(bsp: &Bsp, index: usize) -> Result<Displacement> {
    let disp_info = bsp.disp_info(index)?;
    if !(MIN_MAP_DISP_POWER..=MAX_MAP_DISP_POWER).contains(&disp_info.power) {
        return Err(Error::invalid_body(
            LumpKind::DispInfo,
            format!("displacement {index} has power {}", disp_info.power),
        ));
    }
    let power = disp_info.power as u32;
    let side_len = (1usize << power) + 1;

    let face_index = disp_info.map_face as usize;
    let face = bsp.face(face_index)?;
    if face.edge_count() < 4 {
        return Err(Error::invalid_body(
            LumpKind::Faces,
            format!(
                "displacement {index} face {face_index} has {} edges",
                face.num_edges,
            ),
        ));
    }
    let tex_info = match face.tex_info_index() {
        Some(tex_info) => bsp.tex_info(tex_info)?,
        None => {
            return Err(Error::invalid_body(
                LumpKind::Faces,
                format!("displacement {index} face {face_index} has no texture info"),
            ))
        }
    };
    let tex_data = bsp.tex_data_for(tex_info)?;
    let disp_verts = bsp.disp_verts_for(disp_info, side_len * side_len)?;

    let mut corners = [Vec3::zeros(); 4];
    let mut first_corner = 0;
    let mut first_corner_distance = f32::MAX;
    for (i, corner) in corners.iter_mut().enumerate() {
        *corner = Vec3::from(bsp.face_vertex(face, i)?);
        let d = distance2(&disp_info.start_position_vec(), corner);
        if d < first_corner_distance {
            first_corner = i;
            first_corner_distance = d;
        }
    }
    corners.rotate_left(first_corner);
    let corner_uvs = corners.map(|corner| texture_coordinates(&corner, tex_info, tex_data));

    let fraction = 1.0 / (side_len - 1) as f32;
    let position_steps = [
        (corners[1] - corners[0]) * fraction,
        (corners[2] - corners[3]) * fraction,
    ];
    let uv_steps = [
        (corner_uvs[1] - corner_uvs[0]) * fraction,
        (corner_uvs[2] - corner_uvs[3]) * fraction,
    ];

    let mut positions = Vec::with_capacity(side_len * side_len);
    let mut vertices = Vec::with_capacity(side_len * side_len);
    for y in 0..side_len {
        for x in 0..side_len {
            let disp_vert = &disp_verts[y * side_len + x];
            let position = bilinear(&corners, &position_steps, fraction, x, y) + disp_vert.offset();
            let uv: Vec2 = bilinear(&corner_uvs, &uv_steps, fraction, x, y);
            positions.push(position);
            vertices.push(Vertex {
                position: position.into(),
                uv: uv.into(),
                alpha: (disp_vert.alpha / 255.0).clamp(0.0, 1.0),
                ..Vertex::default()
            });
        }
    }

    for y in 0..side_len {
        for x in 0..side_len {
            let normal = grid_normal(&positions, side_len, x, y);
            let vertex = &mut vertices[y * side_len + x];
            vertex.normal = normal.into();
            vertex.tangent = tangent(&normal, tex_info).into();
        }
    }

    Ok(Displacement {
        index,
        face_index,
        power,
        vertices,
        edge_neighbors: edge_neighbors(bsp, index, disp_info)?,
        corner_neighbors: corner_neighbors(bsp, index, disp_info)?,
    })
}

/// Interpolates across the grid: first along `y` on the 0→1 and 3→2 sides, then along `x` between
/// those two points.
fn bilinear<V>(corners: &[V; 4], steps: &[V; 2], fraction: f32, x: usize, y: usize) -> V
where
    V: Copy + Add<Output = V> + Sub<Output = V> + Mul<f32, Output = V>,
{
    let start = steps[0] * y as f32 + corners[0];
    let end = steps[1] * y as f32 + corners[3];
    start + (end - start) * fraction * x as f32
}

/// Sums the face normals of both triangles in each quadrant around a grid vertex.
fn grid_normal(positions: &[Vec3], side_len: usize, x: usize, y: usize) -> Vec3 {
    let at = |x: usize, y: usize| positions[y * side_len + x];
    let center = at(x, y);
    let max = side_len - 1;
    let mut normal = Vec3::zeros();

    if x > 0 {
        let left = at(x - 1, y);
        if y > 0 {
            let bottom = at(x, y - 1);
            let bottom_left = at(x - 1, y - 1);
            normal += cross(&(left - center), &(bottom - center));
            normal += cross(&(bottom - bottom_left), &(left - bottom_left));
        }
        if y < max {
            let top = at(x, y + 1);
            let top_left = at(x - 1, y + 1);
            normal += cross(&(top - center), &(left - center));
            normal += cross(&(left - top_left), &(top - top_left));
        }
    }
    if x < max {
        let right = at(x + 1, y);
        if y > 0 {
            let bottom = at(x, y - 1);
            let bottom_right = at(x + 1, y - 1);
            normal += cross(&(bottom - center), &(right - center));
            normal += cross(&(right - bottom_right), &(bottom - bottom_right));
        }
        if y < max {
            let top = at(x, y + 1);
            let top_right = at(x + 1, y + 1);
            normal += cross(&(right - center), &(top - center));
            normal += cross(&(top - top_right), &(right - top_right));
        }
    }

    normalize(&normal)
}

fn edge_neighbors(
    bsp: &Bsp,
    index: usize,
    disp_info: &DispInfo,
) -> Result<[[Option<SubNeighbor>; 2]; 4]> {
    let mut result = [[None; 2]; 4];
    for (edge, neighbor) in disp_info.edge_neighbors.iter().enumerate() {
        for (sub_index, sub) in neighbor.sub_neighbors.iter().enumerate() {
            result[edge][sub_index] = validate_sub_neighbor(bsp, index, sub)?;
        }
    }
    Ok(result)
}

fn validate_sub_neighbor(
    bsp: &Bsp,
    index: usize,
    sub: &DispSubNeighbor,
) -> Result<Option<SubNeighbor>> {
    let neighbor = match sub.neighbor_index() {
        Some(neighbor) => neighbor,
        None => return Ok(None),
    };
    bsp.disp_info(neighbor)?;
    if neighbor == index {
        return Err(Error::invalid_body(
            LumpKind::DispInfo,
            format!("displacement {index} lists itself as an edge neighbor"),
        ));
    }
    if !sub.neighbor_orientation.is_valid()
        || !sub.span.is_valid()
        || !sub.neighbor_span.is_valid()
    {
        return Err(Error::invalid_body(
            LumpKind::DispInfo,
            format!(
                "displacement {index} neighbor {neighbor} has orientation {} and spans {}/{}",
                sub.neighbor_orientation.0, sub.span.0, sub.neighbor_span.0,
            ),
        ));
    }
    Ok(Some(SubNeighbor {
        index: neighbor,
        orientation: sub.neighbor_orientation,
        span: sub.span,
        neighbor_span: sub.neighbor_span,
    }))
}

fn corner_neighbors(bsp: &Bsp, index: usize, disp_info: &DispInfo) -> Result<[Vec<usize>; 4]> {
    let mut result: [Vec<usize>; 4] = Default::default();
    for (corner, neighbors) in disp_info.corner_neighbors.iter().enumerate() {
        let count = neighbors.neighbor_count as usize;
        if count > MAX_DISP_CORNER_NEIGHBORS {
            return Err(Error::invalid_body(
                LumpKind::DispInfo,
                format!("displacement {index} corner {corner} has {count} neighbors"),
            ));
        }
        for &neighbor in &neighbors.neighbors[..count] {
            bsp.disp_info(neighbor as usize)?;
            result[corner].push(neighbor as usize);
        }
    }
    Ok(result)
}
