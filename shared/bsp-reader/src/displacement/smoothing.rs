//! Reconciles normals and tangents where displacements meet, so shared vertices shade alike.
//!
//! Three passes run in order over every displacement in ascending index order: corners, then
//! T-junctions, then edges. Results at vertices shared by more than two displacements depend on
//! that order.

use log::debug;
use nalgebra_glm::{dot, lerp, normalize, Vec3};

use crate::displacement::{
    Displacement, GridCoord, GridCorner, GridEdge, SubEdgeIterator, SubNeighbor,
};
use crate::bsp::LumpKind;
use crate::error::{Error, Result};
use crate::geometry::Vertex;

/// Smooths every displacement against its neighbors in place.
///
/// `displacements` must be the whole map as returned by
/// [`tessellate_all`](crate::displacement::tessellate_all), since neighbors are addressed by
/// displacement index. Anything else is rejected before a vertex is touched.
pub fn smooth_neighbor_normals(displacements: &mut [Displacement]) -> Result<()> {
    check_arena(displacements)?;
    blend_corners(displacements);
    blend_t_junctions(displacements);
    blend_edges(displacements)?;
    debug!("smoothed {} displacements", displacements.len());
    Ok(())
}

fn check_arena(displacements: &[Displacement]) -> Result<()> {
    let count = displacements.len();
    for (position, displacement) in displacements.iter().enumerate() {
        if displacement.index != position {
            return Err(Error::out_of_bounds(
                LumpKind::DispInfo,
                format!("displacement {} is at position {position}", displacement.index),
            ));
        }
        if let Some(neighbor) = displacement
            .neighbor_indices()
            .into_iter()
            .find(|&neighbor| neighbor >= count)
        {
            return Err(Error::out_of_bounds(
                LumpKind::DispInfo,
                format!("displacement {position} neighbor {neighbor} of {count}"),
            ));
        }
    }
    Ok(())
}

/// The blended attributes of a vertex. The tangent's sign is not blended.
#[derive(Clone, Copy)]
struct Shading {
    normal: Vec3,
    tangent: Vec3,
}

impl Shading {
    fn of(vertex: &Vertex) -> Self {
        let [x, y, z, _] = vertex.tangent;
        Self {
            normal: Vec3::from(vertex.normal),
            tangent: Vec3::new(x, y, z),
        }
    }

    fn apply_to(self, vertex: &mut Vertex) {
        vertex.normal = self.normal.into();
        vertex.tangent[..3].copy_from_slice(self.tangent.as_slice());
    }
}

fn average(shadings: &[Shading]) -> Shading {
    let count = shadings.len() as f32;
    let mut normal = Vec3::zeros();
    let mut tangent = Vec3::zeros();
    for shading in shadings {
        normal += shading.normal;
        tangent += shading.tangent;
    }
    Shading {
        normal: normal / count,
        tangent: tangent / count,
    }
}

/// Averages each corner with the coincident corners of every adjacent displacement.
pub(crate) fn blend_corners(displacements: &mut [Displacement]) {
    for index in 0..displacements.len() {
        let neighbors = displacements[index].neighbor_indices();

        for corner in GridCorner::ALL {
            let own = displacements[index].corner_vertex_index(corner);
            let own_vertex = &displacements[index].vertices[own];
            let position = Vec3::from(own_vertex.position);

            let mut participants = vec![(index, own)];
            let mut shadings = vec![Shading::of(own_vertex)];
            for &neighbor in &neighbors {
                let neighbor_disp = &displacements[neighbor];
                if let Some(neighbor_corner) = neighbor_disp.find_corner(&position) {
                    let vertex = neighbor_disp.corner_vertex_index(neighbor_corner);
                    participants.push((neighbor, vertex));
                    shadings.push(Shading::of(&neighbor_disp.vertices[vertex]));
                }
            }

            let blended = average(&shadings);
            for (disp, vertex) in participants {
                blended.apply_to(&mut displacements[disp].vertices[vertex]);
            }
        }
    }
}

/// Where an edge is split between two finer neighbors, averages its midpoint with the corner both
/// neighbors place there.
pub(crate) fn blend_t_junctions(displacements: &mut [Displacement]) {
    for index in 0..displacements.len() {
        for edge in GridEdge::ALL {
            let [Some(a), Some(b)] = displacements[index].edge_neighbors[edge as usize] else {
                continue;
            };

            let mid = displacements[index].edge_midpoint_index(edge);
            let mid_vertex = &displacements[index].vertices[mid];
            let position = Vec3::from(mid_vertex.position);
            let matched = |neighbor: usize| {
                let disp = &displacements[neighbor];
                disp.find_corner(&position)
                    .map(|corner| disp.corner_vertex_index(corner))
            };
            let (Some(a_vertex), Some(b_vertex)) = (matched(a.index), matched(b.index)) else {
                continue;
            };

            let blended = average(&[
                Shading::of(mid_vertex),
                Shading::of(&displacements[a.index].vertices[a_vertex]),
                Shading::of(&displacements[b.index].vertices[b_vertex]),
            ]);
            blended.apply_to(&mut displacements[index].vertices[mid]);
            blended.apply_to(&mut displacements[a.index].vertices[a_vertex]);
            blended.apply_to(&mut displacements[b.index].vertices[b_vertex]);
        }
    }
}

/// Averages matched vertices along shared edges, and interpolates the vertices between matches on
/// the finer side.
pub(crate) fn blend_edges(displacements: &mut [Displacement]) -> Result<()> {
    for index in 0..displacements.len() {
        for edge in GridEdge::ALL {
            for sub_index in 0..2 {
                if let Some(sub) = displacements[index].edge_neighbors[edge as usize][sub_index] {
                    blend_edge(displacements, index, edge, sub_index, &sub)?;
                }
            }
        }
    }
    Ok(())
}

fn blend_edge(
    displacements: &mut [Displacement],
    index: usize,
    edge: GridEdge,
    sub_index: usize,
    sub: &SubNeighbor,
) -> Result<()> {
    let neighbor = sub.index;
    let mut iter = SubEdgeIterator::new(
        displacements[index].power,
        displacements[neighbor].power,
        edge,
        sub_index,
        sub,
        true,
    )?;
    let free_axis = iter.free_axis();
    let edge_axis = free_axis.other();

    // The first step lands on the start of the span, which the corner and T-junction passes own.
    iter.advance();
    let mut previous = iter.coord();

    while iter.advance() {
        let current = iter.vertex_index()?;
        if !iter.is_last_vertex() {
            let theirs = iter.neighbor_vertex_index()?;
            let blended = average(&[
                Shading::of(&displacements[index].vertices[current]),
                Shading::of(&displacements[neighbor].vertices[theirs]),
            ]);
            blended.apply_to(&mut displacements[index].vertices[current]);
            blended.apply_to(&mut displacements[neighbor].vertices[theirs]);
        }

        let coord = iter.coord();
        let displacement = &mut displacements[index];
        let from = coord_index(displacement, previous);
        for tween in previous[free_axis] + 1..coord[free_axis] {
            let t = (tween - previous[free_axis]) as f32
                / (coord[free_axis] - previous[free_axis]) as f32;
            let mut at = GridCoord::default();
            at[edge_axis] = coord[edge_axis];
            at[free_axis] = tween;
            let (shading, sign) = interpolate(
                &displacement.vertices[from],
                &displacement.vertices[current],
                t,
            );
            let target = coord_index(displacement, at);
            let target = &mut displacement.vertices[target];
            shading.apply_to(target);
            target.tangent[3] = sign;
        }

        previous = coord;
    }
    Ok(())
}

fn coord_index(displacement: &Displacement, coord: GridCoord) -> usize {
    displacement.vertex_index(coord.x as usize, coord.y as usize)
}

/// Shading for a vertex a fraction `t` of the way from `from` to `to` along an edge, with the
/// tangent sign of `to`. The normal is renormalized and the tangent made orthogonal to it.
fn interpolate(from: &Vertex, to: &Vertex, t: f32) -> (Shading, f32) {
    let a = Shading::of(from);
    let b = Shading::of(to);
    let normal = normalize(&lerp(&a.normal, &b.normal, t));
    let tangent = lerp(&a.tangent, &b.tangent, t);
    let tangent = normalize(&(tangent - normal * dot(&normal, &tangent)));
    (Shading { normal, tangent }, to.tangent[3])
}
