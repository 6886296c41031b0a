use fully_occupied::FullyOccupied;
use nalgebra_glm::{vec3, Vec3};

use crate::surface::SurfaceFlags;

#[repr(C)]
#[derive(Debug)]
pub struct Plane {
    pub normal: [f32; 3],
    pub dist: f32,
    pub axis_type: i32,
}

unsafe impl FullyOccupied for Plane {}

impl Plane {
    pub fn normal_vec(&self) -> Vec3 {
        Vec3::from(self.normal)
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct Edge {
    pub v: [u16; 2],
}

unsafe impl FullyOccupied for Edge {}

#[repr(C)]
#[derive(Debug)]
pub struct Face {
    pub plane_num: u16,
    pub side: u8,
    pub on_node: u8,
    pub first_edge: i32,
    pub num_edges: i16,
    pub tex_info: i16,
    pub disp_info: i16,
    pub surface_fog_volume_id: i16,
    pub styles: [u8; 4],
    pub light_ofs: i32,
    pub area: f32,
    pub lightmap_texture_mins_in_luxels: [i32; 2],
    pub lightmap_texture_size_in_luxels: [i32; 2],
    pub orig_face: i32,
    pub num_prims: u16,
    pub first_prim_id: u16,
    pub smoothing_groups: u32,
}

unsafe impl FullyOccupied for Face {}

impl Face {
    pub fn tex_info_index(&self) -> Option<usize> {
        usize::try_from(self.tex_info).ok()
    }

    pub fn disp_info_index(&self) -> Option<usize> {
        usize::try_from(self.disp_info).ok()
    }

    pub fn edge_count(&self) -> usize {
        usize::try_from(self.num_edges).unwrap_or(0)
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct TexInfo {
    /// World-space projection axes `s` and `t`, each with a translation in the fourth component.
    pub texture_vecs: [[f32; 4]; 2],
    pub lightmap_vecs: [[f32; 4]; 2],
    pub flags: i32,
    pub tex_data: i32,
}

unsafe impl FullyOccupied for TexInfo {}

impl TexInfo {
    pub fn surface_flags(&self) -> SurfaceFlags {
        SurfaceFlags::from_bits_truncate(self.flags as u32)
    }

    pub fn s_axis(&self) -> Vec3 {
        let [x, y, z, _] = self.texture_vecs[0];
        vec3(x, y, z)
    }

    pub fn t_axis(&self) -> Vec3 {
        let [x, y, z, _] = self.texture_vecs[1];
        vec3(x, y, z)
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct TexData {
    pub reflectivity: [f32; 3],
    pub name_string_table_id: i32,
    pub width: i32,
    pub height: i32,
    pub view_width: i32,
    pub view_height: i32,
}

unsafe impl FullyOccupied for TexData {}

#[repr(C)]
#[derive(Debug)]
pub struct Model {
    pub mins: [f32; 3],
    pub maxs: [f32; 3],
    pub origin: [f32; 3],
    pub head_node: i32,
    pub first_face: i32,
    pub num_faces: i32,
}

unsafe impl FullyOccupied for Model {}

#[repr(C)]
#[derive(Debug)]
pub struct DispInfo {
    pub start_position: [f32; 3],
    pub disp_vert_start: i32,
    pub disp_tri_start: i32,
    pub power: i32,
    pub min_tess: i32,
    pub smoothing_angle: f32,
    pub contents: i32,
    pub map_face: u16,
    pub _padding: u16,
    pub lightmap_alpha_start: i32,
    pub lightmap_sample_position_start: i32,
    pub edge_neighbors: [DispNeighbor; 4],
    pub corner_neighbors: [DispCornerNeighbors; 4],
    pub allowed_verts: [u32; 10],
}

unsafe impl FullyOccupied for DispInfo {}

impl DispInfo {
    pub fn start_position_vec(&self) -> Vec3 {
        Vec3::from(self.start_position)
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct DispNeighbor {
    pub sub_neighbors: [DispSubNeighbor; 2],
}

unsafe impl FullyOccupied for DispNeighbor {}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct DispSubNeighbor {
    pub neighbor: u16,
    pub neighbor_orientation: NeighborOrientation,
    pub span: NeighborSpan,
    pub neighbor_span: NeighborSpan,
    pub _padding: u8,
}

unsafe impl FullyOccupied for DispSubNeighbor {}

impl DispSubNeighbor {
    pub const NO_NEIGHBOR: u16 = 0xffff;

    pub fn neighbor_index(&self) -> Option<usize> {
        (self.neighbor != Self::NO_NEIGHBOR).then_some(self.neighbor as usize)
    }
}

/// Counter-clockwise rotation of a neighbor's grid relative to ours, in quarter turns.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NeighborOrientation(pub u8);

unsafe impl FullyOccupied for NeighborOrientation {}

impl NeighborOrientation {
    pub const CCW_0: Self = Self(0);
    pub const CCW_90: Self = Self(1);
    pub const CCW_180: Self = Self(2);
    pub const CCW_270: Self = Self(3);

    pub fn is_valid(self) -> bool {
        self.0 <= 3
    }

    pub fn quarter_turns(self) -> usize {
        self.0 as usize
    }
}

/// Which portion of an edge a sub-neighbor covers.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NeighborSpan(pub u8);

unsafe impl FullyOccupied for NeighborSpan {}

impl NeighborSpan {
    pub const CORNER_TO_CORNER: Self = Self(0);
    pub const CORNER_TO_MIDPOINT: Self = Self(1);
    pub const MIDPOINT_TO_CORNER: Self = Self(2);

    pub fn is_valid(self) -> bool {
        self.0 <= 2
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct DispCornerNeighbors {
    pub neighbors: [u16; 4],
    pub neighbor_count: u8,
    pub _padding: u8,
}

unsafe impl FullyOccupied for DispCornerNeighbors {}

#[repr(C)]
#[derive(Debug)]
pub struct DispVert {
    pub vec: [f32; 3],
    pub dist: f32,
    pub alpha: f32,
}

unsafe impl FullyOccupied for DispVert {}

impl DispVert {
    pub fn offset(&self) -> Vec3 {
        Vec3::from(self.vec) * self.dist
    }
}
