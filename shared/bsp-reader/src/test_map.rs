//! Assembles small BSP files in memory for tests.

use std::mem::size_of;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::bsp::{GameLumpEntry, Header, LumpKind, IDENT, LUMP_COUNT};
use crate::displacement::SubNeighbor;
use crate::surface::SurfaceFlags;

#[derive(Clone, Debug)]
pub struct FaceSpec {
    pub plane_num: u16,
    pub side: u8,
    pub first_edge: i32,
    pub num_edges: i16,
    pub tex_info: i16,
    pub disp_info: i16,
}

#[derive(Clone, Debug)]
pub struct TexInfoSpec {
    pub s: [f32; 4],
    pub t: [f32; 4],
    pub flags: SurfaceFlags,
    pub tex_data: i32,
}

impl Default for TexInfoSpec {
    fn default() -> Self {
        Self {
            s: [1.0, 0.0, 0.0, 0.0],
            t: [0.0, 1.0, 0.0, 0.0],
            flags: SurfaceFlags::empty(),
            tex_data: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TexDataSpec {
    pub name: String,
    pub width: i32,
    pub height: i32,
}

#[derive(Clone, Debug)]
pub struct DispSpec {
    pub start_position: [f32; 3],
    pub power: i32,
    pub disp_vert_start: i32,
    pub map_face: u16,
    pub edge_neighbors: [[Option<SubNeighbor>; 2]; 4],
    /// Written with a count of the full length, but at most four entries.
    pub corner_neighbors: [Vec<u16>; 4],
}

#[derive(Clone, Copy, Debug)]
pub struct DispVertSpec {
    pub vec: [f32; 3],
    pub dist: f32,
    pub alpha: f32,
}

#[derive(Clone, Debug)]
pub struct StaticPropsSpec {
    pub version: u16,
    pub names: Vec<String>,
    pub leaves: Vec<u16>,
    /// Raw prop records, already in the layout of `version`.
    pub props: Vec<Vec<u8>>,
    /// Extra bytes appended after the props.
    pub trailing: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct MapBuilder {
    pub ident: i32,
    pub version: i32,
    pub planes: Vec<([f32; 3], f32)>,
    pub vertices: Vec<[f32; 3]>,
    pub edges: Vec<[u16; 2]>,
    pub surf_edges: Vec<i32>,
    pub faces: Vec<FaceSpec>,
    /// Store faces in the HDR face lump and leave the LDR one empty.
    pub hdr_faces_only: bool,
    pub tex_infos: Vec<TexInfoSpec>,
    pub tex_datas: Vec<TexDataSpec>,
    pub models: Vec<(i32, i32)>,
    pub disp_infos: Vec<DispSpec>,
    pub disp_verts: Vec<DispVertSpec>,
    pub static_props: Option<StaticPropsSpec>,
    /// Lumps whose contents replace whatever the builder would write.
    pub raw_lumps: Vec<(LumpKind, Vec<u8>)>,
    /// Descriptors patched after layout, as `(offset, length)`.
    pub descriptor_overrides: Vec<(LumpKind, i32, i32)>,
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self {
            ident: IDENT,
            version: 20,
            planes: Vec::new(),
            vertices: Vec::new(),
            // Edge 0 cannot be referenced with a sign, so it is reserved.
            edges: vec![[0, 0]],
            surf_edges: Vec::new(),
            faces: Vec::new(),
            hdr_faces_only: false,
            tex_infos: Vec::new(),
            tex_datas: Vec::new(),
            models: Vec::new(),
            disp_infos: Vec::new(),
            disp_verts: Vec::new(),
            static_props: None,
            raw_lumps: Vec::new(),
            descriptor_overrides: Vec::new(),
        }
    }
}

impl MapBuilder {
    /// One 64x64 quad in the z = 0 plane, facing up, as the only face of model 0.
    pub fn flat_quad(tex_info: TexInfoSpec) -> Self {
        let mut builder = Self::default();
        builder.planes.push(([0.0, 0.0, 1.0], 0.0));
        builder.tex_infos.push(tex_info);
        builder.tex_datas.push(TexDataSpec {
            name: "dev/dev_measuregeneric01".to_string(),
            width: 64,
            height: 64,
        });
        builder.add_quad_face([
            [0.0, 0.0, 0.0],
            [64.0, 0.0, 0.0],
            [64.0, 64.0, 0.0],
            [0.0, 64.0, 0.0],
        ]);
        builder.models.push((0, 1));
        builder
    }

    /// An empty world with one upward plane, one texture, and model 0 covering every face added
    /// before [`MapBuilder::build`].
    pub fn displacement_world() -> Self {
        let mut builder = Self::default();
        builder.planes.push(([0.0, 0.0, 1.0], 0.0));
        builder.tex_infos.push(TexInfoSpec {
            s: [1.0 / 4.0, 0.0, 0.0, 0.0],
            t: [0.0, 1.0 / 4.0, 0.0, 0.0],
            ..TexInfoSpec::default()
        });
        builder.tex_datas.push(TexDataSpec {
            name: "nature/blendgrassdirt01".to_string(),
            width: 128,
            height: 128,
        });
        builder
    }

    /// Adds a four-sided face on plane 0 with texture info 0. Alternate surface edges are stored
    /// reversed. Returns the face index.
    pub fn add_quad_face(&mut self, corners: [[f32; 3]; 4]) -> usize {
        let first_vertex = self.vertices.len() as u16;
        self.vertices.extend_from_slice(&corners);
        let first_edge = self.surf_edges.len() as i32;
        for i in 0..4u16 {
            let from = first_vertex + i;
            let to = first_vertex + (i + 1) % 4;
            let edge = self.edges.len() as i32;
            if i % 2 == 0 {
                self.edges.push([from, to]);
                self.surf_edges.push(edge);
            } else {
                self.edges.push([to, from]);
                self.surf_edges.push(-edge);
            }
        }
        self.faces.push(FaceSpec {
            plane_num: 0,
            side: 0,
            first_edge,
            num_edges: 4,
            tex_info: 0,
            disp_info: -1,
        });
        self.faces.len() - 1
    }

    /// Adds a displacement over a rectangular face whose first corner is the start position. Each
    /// grid vertex is raised along +z to `height(x, y)` of its undisplaced world position. Returns
    /// the displacement index.
    pub fn add_displacement(
        &mut self,
        corners: [[f32; 3]; 4],
        power: i32,
        height: impl Fn(f32, f32) -> f32,
    ) -> usize {
        let face = self.add_quad_face(corners);
        let index = self.disp_infos.len();
        self.faces[face].disp_info = index as i16;

        let side_len = (1 << power) + 1;
        let disp_vert_start = self.disp_verts.len() as i32;
        let [c0, c1, _, c3] = corners;
        for y in 0..side_len {
            for x in 0..side_len {
                let fx = x as f32 / (side_len - 1) as f32;
                let fy = y as f32 / (side_len - 1) as f32;
                let wx = c0[0] + (c3[0] - c0[0]) * fx + (c1[0] - c0[0]) * fy;
                let wy = c0[1] + (c3[1] - c0[1]) * fx + (c1[1] - c0[1]) * fy;
                self.disp_verts.push(DispVertSpec {
                    vec: [0.0, 0.0, 1.0],
                    dist: height(wx, wy),
                    alpha: 0.0,
                });
            }
        }

        self.disp_infos.push(DispSpec {
            start_position: c0,
            power,
            disp_vert_start,
            map_face: face as u16,
            edge_neighbors: [[None; 2]; 4],
            corner_neighbors: Default::default(),
        });
        index
    }

    pub fn build(&self) -> BuiltMap {
        let mut lumps: Vec<Vec<u8>> = vec![Vec::new(); LUMP_COUNT];

        let planes = &mut lumps[LumpKind::Planes.index()];
        for (normal, dist) in &self.planes {
            write_f32s(planes, normal);
            planes.write_f32::<LittleEndian>(*dist).unwrap();
            planes.write_i32::<LittleEndian>(0).unwrap();
        }

        let vertices = &mut lumps[LumpKind::Vertices.index()];
        for vertex in &self.vertices {
            write_f32s(vertices, vertex);
        }

        let edges = &mut lumps[LumpKind::Edges.index()];
        for edge in &self.edges {
            edges.write_u16::<LittleEndian>(edge[0]).unwrap();
            edges.write_u16::<LittleEndian>(edge[1]).unwrap();
        }

        let surf_edges = &mut lumps[LumpKind::SurfEdges.index()];
        for &surf_edge in &self.surf_edges {
            surf_edges.write_i32::<LittleEndian>(surf_edge).unwrap();
        }

        let face_kind = if self.hdr_faces_only {
            LumpKind::FacesHdr
        } else {
            LumpKind::Faces
        };
        let faces = &mut lumps[face_kind.index()];
        for face in &self.faces {
            write_face(faces, face);
        }

        let tex_infos = &mut lumps[LumpKind::TexInfo.index()];
        for tex_info in &self.tex_infos {
            write_f32s(tex_infos, &tex_info.s);
            write_f32s(tex_infos, &tex_info.t);
            write_f32s(tex_infos, &[0.0; 8]);
            tex_infos
                .write_i32::<LittleEndian>(tex_info.flags.bits() as i32)
                .unwrap();
            tex_infos.write_i32::<LittleEndian>(tex_info.tex_data).unwrap();
        }

        let mut string_table = Vec::new();
        let mut string_data = Vec::new();
        let tex_datas = &mut lumps[LumpKind::TexData.index()];
        for (index, tex_data) in self.tex_datas.iter().enumerate() {
            string_table
                .write_i32::<LittleEndian>(string_data.len() as i32)
                .unwrap();
            string_data.extend_from_slice(tex_data.name.as_bytes());
            string_data.push(0);

            write_f32s(tex_datas, &[0.5, 0.5, 0.5]);
            tex_datas.write_i32::<LittleEndian>(index as i32).unwrap();
            for value in [tex_data.width, tex_data.height, tex_data.width, tex_data.height] {
                tex_datas.write_i32::<LittleEndian>(value).unwrap();
            }
        }
        lumps[LumpKind::TexDataStringTable.index()] = string_table;
        lumps[LumpKind::TexDataStringData.index()] = string_data;

        let models = &mut lumps[LumpKind::Models.index()];
        for &(first_face, num_faces) in &self.models {
            write_f32s(models, &[0.0; 9]);
            models.write_i32::<LittleEndian>(0).unwrap();
            models.write_i32::<LittleEndian>(first_face).unwrap();
            models.write_i32::<LittleEndian>(num_faces).unwrap();
        }

        let disp_infos = &mut lumps[LumpKind::DispInfo.index()];
        for disp_info in &self.disp_infos {
            write_disp_info(disp_infos, disp_info);
        }

        let disp_verts = &mut lumps[LumpKind::DispVerts.index()];
        for disp_vert in &self.disp_verts {
            write_f32s(disp_verts, &disp_vert.vec);
            disp_verts.write_f32::<LittleEndian>(disp_vert.dist).unwrap();
            disp_verts.write_f32::<LittleEndian>(disp_vert.alpha).unwrap();
        }

        for (kind, data) in &self.raw_lumps {
            lumps[kind.index()] = data.clone();
        }

        // Lay the lumps out in order after the header, 4-byte aligned. The game lump goes last so
        // that its sub-entry offsets are known when it is written.
        let mut data = vec![0; size_of::<Header>()];
        let mut descriptors = vec![(0i32, 0i32); LUMP_COUNT];
        for kind in LumpKind::ALL {
            if kind == LumpKind::GameLump {
                continue;
            }
            let lump = &lumps[kind.index()];
            pad_to_4(&mut data);
            descriptors[kind.index()] = (data.len() as i32, lump.len() as i32);
            data.extend_from_slice(lump);
        }
        pad_to_4(&mut data);
        let game_lump_offset = data.len();
        let game_lump = if lumps[LumpKind::GameLump.index()].is_empty() {
            self.game_lump(game_lump_offset)
        } else {
            lumps[LumpKind::GameLump.index()].clone()
        };
        descriptors[LumpKind::GameLump.index()] = (game_lump_offset as i32, game_lump.len() as i32);
        data.extend_from_slice(&game_lump);

        for &(kind, offset, length) in &self.descriptor_overrides {
            descriptors[kind.index()] = (offset, length);
        }

        let mut header = Vec::with_capacity(size_of::<Header>());
        header.write_i32::<LittleEndian>(self.ident).unwrap();
        header.write_i32::<LittleEndian>(self.version).unwrap();
        for (offset, length) in descriptors {
            header.write_i32::<LittleEndian>(offset).unwrap();
            header.write_i32::<LittleEndian>(length).unwrap();
            header.write_i32::<LittleEndian>(0).unwrap();
            header.write_i32::<LittleEndian>(0).unwrap();
        }
        header.write_i32::<LittleEndian>(1).unwrap();
        data[..header.len()].copy_from_slice(&header);

        BuiltMap::new(&data)
    }

    fn game_lump(&self, lump_offset: usize) -> Vec<u8> {
        let static_props = match &self.static_props {
            Some(static_props) => static_props,
            None => return Vec::new(),
        };

        let mut sub_entry = Vec::new();
        sub_entry
            .write_i32::<LittleEndian>(static_props.names.len() as i32)
            .unwrap();
        for name in &static_props.names {
            let mut record = [0u8; 128];
            record[..name.len()].copy_from_slice(name.as_bytes());
            sub_entry.extend_from_slice(&record);
        }
        sub_entry
            .write_i32::<LittleEndian>(static_props.leaves.len() as i32)
            .unwrap();
        for &leaf in &static_props.leaves {
            sub_entry.write_u16::<LittleEndian>(leaf).unwrap();
        }
        sub_entry
            .write_i32::<LittleEndian>(static_props.props.len() as i32)
            .unwrap();
        for prop in &static_props.props {
            sub_entry.extend_from_slice(prop);
        }
        sub_entry.extend_from_slice(&static_props.trailing);

        let mut lump = Vec::new();
        lump.write_i32::<LittleEndian>(1).unwrap();
        lump.write_i32::<LittleEndian>(GameLumpEntry::STATIC_PROPS).unwrap();
        lump.write_u16::<LittleEndian>(0).unwrap();
        lump.write_u16::<LittleEndian>(static_props.version).unwrap();
        let sub_entry_offset = lump_offset + 4 + size_of::<GameLumpEntry>();
        lump.write_i32::<LittleEndian>(sub_entry_offset as i32).unwrap();
        lump.write_i32::<LittleEndian>(sub_entry.len() as i32).unwrap();
        lump.extend_from_slice(&sub_entry);
        lump
    }
}

fn write_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for &value in values {
        out.write_f32::<LittleEndian>(value).unwrap();
    }
}

fn write_face(out: &mut Vec<u8>, face: &FaceSpec) {
    out.write_u16::<LittleEndian>(face.plane_num).unwrap();
    out.write_u8(face.side).unwrap();
    out.write_u8(0).unwrap();
    out.write_i32::<LittleEndian>(face.first_edge).unwrap();
    out.write_i16::<LittleEndian>(face.num_edges).unwrap();
    out.write_i16::<LittleEndian>(face.tex_info).unwrap();
    out.write_i16::<LittleEndian>(face.disp_info).unwrap();
    out.write_i16::<LittleEndian>(-1).unwrap();
    // styles through smoothing groups
    out.extend_from_slice(&[0; 40]);
}

fn write_disp_info(out: &mut Vec<u8>, disp_info: &DispSpec) {
    write_f32s(out, &disp_info.start_position);
    out.write_i32::<LittleEndian>(disp_info.disp_vert_start).unwrap();
    out.write_i32::<LittleEndian>(0).unwrap();
    out.write_i32::<LittleEndian>(disp_info.power).unwrap();
    out.write_i32::<LittleEndian>(0).unwrap();
    out.write_f32::<LittleEndian>(0.0).unwrap();
    out.write_i32::<LittleEndian>(1).unwrap();
    out.write_u16::<LittleEndian>(disp_info.map_face).unwrap();
    out.write_u16::<LittleEndian>(0).unwrap();
    out.write_i32::<LittleEndian>(0).unwrap();
    out.write_i32::<LittleEndian>(0).unwrap();

    for edge in &disp_info.edge_neighbors {
        for sub in edge {
            match sub {
                Some(sub) => {
                    out.write_u16::<LittleEndian>(sub.index as u16).unwrap();
                    out.write_u8(sub.orientation.0).unwrap();
                    out.write_u8(sub.span.0).unwrap();
                    out.write_u8(sub.neighbor_span.0).unwrap();
                }
                None => {
                    out.write_u16::<LittleEndian>(0xffff).unwrap();
                    out.extend_from_slice(&[0; 3]);
                }
            }
            out.write_u8(0).unwrap();
        }
    }

    for neighbors in &disp_info.corner_neighbors {
        for slot in 0..4 {
            let neighbor = neighbors.get(slot).copied().unwrap_or(0xffff);
            out.write_u16::<LittleEndian>(neighbor).unwrap();
        }
        out.write_u8(neighbors.len() as u8).unwrap();
        out.write_u8(0).unwrap();
    }

    out.extend_from_slice(&[0; 40]);
}

fn pad_to_4(data: &mut Vec<u8>) {
    while data.len() % 4 != 0 {
        data.push(0);
    }
}

/// A 4-byte aligned map image.
pub struct BuiltMap {
    words: Vec<u32>,
    len: usize,
}

impl BuiltMap {
    pub fn new(data: &[u8]) -> Self {
        let mut words = vec![0u32; (data.len() + 3) / 4];
        bytemuck::cast_slice_mut::<u32, u8>(&mut words)[..data.len()].copy_from_slice(data);
        Self {
            words,
            len: data.len(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u32, u8>(&self.words)[..self.len]
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u32, u8>(&mut self.words)[..self.len]
    }
}
