use std::ops::{Index, IndexMut};

use crate::bsp::{LumpKind, NeighborOrientation, NeighborSpan};
use crate::displacement::{GridCorner, GridEdge, SubNeighbor};
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::Y,
            Self::Y => Self::X,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn offset_by(self, delta: GridCoord) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y)
    }

    fn offset_back_by(self, delta: GridCoord) -> Self {
        Self::new(self.x - delta.x, self.y - delta.y)
    }
}

impl Index<Axis> for GridCoord {
    type Output = i32;

    fn index(&self, axis: Axis) -> &i32 {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }
}

impl IndexMut<Axis> for GridCoord {
    fn index_mut(&mut self, axis: Axis) -> &mut i32 {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        }
    }
}

impl GridEdge {
    /// The axis whose coordinate is constant along this edge.
    pub fn fixed_axis(self) -> Axis {
        const EDGE_AXES: [Axis; 4] = [Axis::X, Axis::Y, Axis::X, Axis::Y];
        EDGE_AXES[self as usize]
    }

    pub fn free_axis(self) -> Axis {
        self.fixed_axis().other()
    }

    /// The constant coordinate of this edge, for a grid of `side_len` vertices.
    fn fixed_coordinate(self, side_len: i32) -> i32 {
        const SIDE_MULTIPLIERS: [i32; 4] = [0, 1, 1, 0];
        SIDE_MULTIPLIERS[self as usize] * (side_len - 1)
    }
}

/// One in 16.16 fixed point.
const FIXED_ONE: i32 = 1 << 16;

/// The endpoints of the part of `edge` a span covers, in the edge's corner-to-corner direction.
fn span_bounds(side_len: i32, edge: GridEdge, span: NeighborSpan) -> (GridCoord, GridCoord) {
    let free = edge.free_axis();
    let mid = side_len / 2;
    let mut start = GridCorner::from_index(edge as usize).coord(side_len);
    let mut end = GridCorner::from_index(edge as usize + 1).coord(side_len);

    // Right and bottom edges run from the high end of their free axis to the low end.
    let descending = matches!(edge, GridEdge::Right | GridEdge::Bottom);
    match (span, descending) {
        (NeighborSpan::CORNER_TO_MIDPOINT, true) | (NeighborSpan::MIDPOINT_TO_CORNER, false) => {
            start[free] = mid
        }
        (NeighborSpan::CORNER_TO_MIDPOINT, false) | (NeighborSpan::MIDPOINT_TO_CORNER, true) => {
            end[free] = mid
        }
        _ => {}
    }
    (start, end)
}

/// Rotates a step in our grid into a neighbor's grid.
fn rotate_increment(orientation: NeighborOrientation, increment: GridCoord) -> GridCoord {
    let GridCoord { x, y } = increment;
    match orientation {
        NeighborOrientation::CCW_0 => GridCoord::new(x, y),
        NeighborOrientation::CCW_90 => GridCoord::new(y, -x),
        NeighborOrientation::CCW_180 => GridCoord::new(-x, -y),
        _ => GridCoord::new(-y, x),
    }
}

fn malformed(message: String) -> Error {
    Error::invalid_body(LumpKind::DispInfo, message)
}

/// Walks a shared edge of two displacements in lockstep.
///
/// The coarser side advances one vertex per step and the finer side `2^|power difference|`. Both
/// coordinates start before the first vertex; call [`SubEdgeIterator::advance`] before reading
/// them.
#[derive(Clone, Debug)]
pub struct SubEdgeIterator {
    side_len: i32,
    neighbor_side_len: i32,
    coord: GridCoord,
    increment: GridCoord,
    neighbor_coord: GridCoord,
    neighbor_increment: GridCoord,
    end: i32,
    free_axis: Axis,
}

impl SubEdgeIterator {
    /// Sets up a walk along `edge` against the neighbor in slot `sub_index` of that edge.
    ///
    /// With `touch_corners` the walk also visits the vertices at both ends of the span.
    pub fn new(
        power: u32,
        neighbor_power: u32,
        edge: GridEdge,
        sub_index: usize,
        sub: &SubNeighbor,
        touch_corners: bool,
    ) -> Result<Self> {
        let side_len = (1 << power) + 1;
        let neighbor_side_len = (1 << neighbor_power) + 1;
        let edge_axis = edge.fixed_axis();
        let free_axis = edge.free_axis();

        let mut coord = GridCoord::default();
        coord[edge_axis] = edge.fixed_coordinate(side_len);
        coord[free_axis] = side_len / 2 * sub_index as i32;
        let mut neighbor_coord =
            transform_into_neighbor(side_len, neighbor_side_len, edge, sub, coord)?;

        let mut increment = GridCoord::default();
        let mut neighbor_step = GridCoord::default();
        if neighbor_power > power {
            increment[free_axis] = 1;
            neighbor_step[free_axis] = 1 << (neighbor_power - power);
        } else {
            increment[free_axis] = 1 << (power - neighbor_power);
            neighbor_step[free_axis] = 1;
        }
        let neighbor_increment = rotate_increment(sub.orientation, neighbor_step);

        let mut end = if sub.span == NeighborSpan::CORNER_TO_MIDPOINT {
            side_len >> 1
        } else {
            side_len - 1
        };

        if touch_corners {
            coord = coord.offset_back_by(increment);
            neighbor_coord = neighbor_coord.offset_back_by(neighbor_increment);
            end += increment[free_axis];
        }

        Ok(Self {
            side_len,
            neighbor_side_len,
            coord,
            increment,
            neighbor_coord,
            neighbor_increment,
            end,
            free_axis,
        })
    }

    /// Steps both sides. Returns whether our coordinate is still within the span.
    pub fn advance(&mut self) -> bool {
        self.coord = self.coord.offset_by(self.increment);
        self.neighbor_coord = self.neighbor_coord.offset_by(self.neighbor_increment);
        self.coord[self.free_axis] < self.end
    }

    /// Whether the next step would leave the span.
    pub fn is_last_vertex(&self) -> bool {
        self.coord[self.free_axis] + self.increment[self.free_axis] >= self.end
    }

    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    pub fn neighbor_coord(&self) -> GridCoord {
        self.neighbor_coord
    }

    pub fn free_axis(&self) -> Axis {
        self.free_axis
    }

    pub fn vertex_index(&self) -> Result<usize> {
        grid_index(self.coord, self.side_len)
    }

    pub fn neighbor_vertex_index(&self) -> Result<usize> {
        grid_index(self.neighbor_coord, self.neighbor_side_len)
    }
}

fn grid_index(coord: GridCoord, side_len: i32) -> Result<usize> {
    if (0..side_len).contains(&coord.x) && (0..side_len).contains(&coord.y) {
        Ok((coord.y * side_len + coord.x) as usize)
    } else {
        Err(malformed(format!(
            "edge walk reached ({}, {}) outside a {side_len}x{side_len} grid",
            coord.x, coord.y,
        )))
    }
}

/// Maps a vertex on our edge to the matching vertex on the neighbor's edge.
///
/// The position along the edge is carried across as a 16.16 fraction of the span so that repeated
/// mappings agree exactly. Both ends are bounded by our own span, so a walk that covers it stays
/// inside the neighbor's grid whatever `neighbor_span` claims.
fn transform_into_neighbor(
    side_len: i32,
    neighbor_side_len: i32,
    edge: GridEdge,
    sub: &SubNeighbor,
    coord: GridCoord,
) -> Result<GridCoord> {
    let (src_start, src_end) = span_bounds(side_len, edge, sub.span);

    let neighbor_edge = GridEdge::from_index(edge as usize + 2 + sub.orientation.quarter_turns());
    let (dest_end, dest_start) = span_bounds(neighbor_side_len, neighbor_edge, sub.span);

    let free = edge.free_axis();
    let span_len = src_end[free] - src_start[free];
    if span_len == 0 {
        return Err(malformed(format!("degenerate span on {edge:?} edge")));
    }
    let fixed_percent = (coord[free] - src_start[free]) * FIXED_ONE / span_len;
    if !(0..=FIXED_ONE).contains(&fixed_percent) {
        return Err(malformed(format!(
            "({}, {}) is outside the {:?} span of the {edge:?} edge",
            coord.x, coord.y, sub.span,
        )));
    }

    let neighbor_fixed = neighbor_edge.fixed_axis();
    let neighbor_free = neighbor_edge.free_axis();
    let mut out = GridCoord::default();
    out[neighbor_fixed] = dest_start[neighbor_fixed];
    out[neighbor_free] = dest_start[neighbor_free]
        + (dest_end[neighbor_free] - dest_start[neighbor_free]) * fixed_percent / FIXED_ONE;

    if !(0..neighbor_side_len).contains(&out.x) || !(0..neighbor_side_len).contains(&out.y) {
        return Err(malformed(format!(
            "({}, {}) maps to ({}, {}) outside the neighbor's grid",
            coord.x, coord.y, out.x, out.y,
        )));
    }
    Ok(out)
}
