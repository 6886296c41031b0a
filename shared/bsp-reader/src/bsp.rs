use std::mem::size_of;

use fully_occupied::FullyOccupied;
use log::debug;

use crate::byte_view::ByteView;
use crate::error::{Error, Result};
use crate::limits::*;

mod game_lump;
mod lump;
mod records;

pub use game_lump::{
    GameLumpEntry, StaticProp, StaticPropDictEntry, StaticPropRecord, StaticPropV4,
    StaticPropV5, StaticPropV6, StaticPropV7Multiplayer2013, StaticProps,
};
pub use lump::{Header, LumpDescriptor, LumpKind, IDENT, LUMP_COUNT, MAX_VERSION, MIN_VERSION};
pub use records::{
    DispCornerNeighbors, DispInfo, DispNeighbor, DispSubNeighbor, DispVert, Edge, Face, Model,
    NeighborOrientation, NeighborSpan, Plane, TexData, TexInfo,
};

/// A validated BSP file.
///
/// Construction checks the header and every lump this crate consumes; no accessor can then read
/// outside the buffer. Record fields that index other lumps come from the file and are checked
/// where they are followed.
#[derive(Clone)]
pub struct Bsp<'a> {
    data: &'a [u8],
    header: &'a Header,
    planes: &'a [Plane],
    vertices: &'a [[f32; 3]],
    edges: &'a [Edge],
    surf_edges: &'a [i32],
    faces: &'a [Face],
    tex_infos: &'a [TexInfo],
    tex_datas: &'a [TexData],
    tex_data_string_table: &'a [i32],
    tex_data_string_data: &'a [u8],
    models: &'a [Model],
    disp_infos: &'a [DispInfo],
    disp_verts: &'a [DispVert],
    game_lumps: &'a [GameLumpEntry],
    static_props: Option<StaticProps<'a>>,
}

impl<'a> Bsp<'a> {
    /// Validates `data` as a BSP file. The buffer must be at least 4-byte aligned, which memory
    /// maps always are.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let file = ByteView::new(data);
        if data.len() < size_of::<Header>() {
            return Err(Error::invalid_header(format!(
                "file is {} bytes, shorter than the {} byte header",
                data.len(),
                size_of::<Header>(),
            )));
        }
        let header: &Header = file
            .read(0, "header")
            .map_err(|e| Error::invalid_header(e.message().to_string()))?;
        if header.ident != IDENT {
            return Err(Error::invalid_header(format!(
                "identifier {:#010x} is not VBSP",
                header.ident,
            )));
        }
        if !(MIN_VERSION..=MAX_VERSION).contains(&header.version) {
            return Err(Error::unsupported_version(format!(
                "version {} is outside {MIN_VERSION}..={MAX_VERSION}",
                header.version,
            )));
        }
        debug!(
            "BSP version {} revision {}",
            header.version, header.map_revision,
        );

        let lumps = LumpReader { file, header };

        let faces = lumps.slice(LumpKind::Faces, MAX_MAP_FACES)?;
        let faces = if faces.is_empty() {
            // Maps compiled with HDR lighting only may leave the LDR face lump empty.
            lumps.slice(LumpKind::FacesHdr, MAX_MAP_FACES)?
        } else {
            faces
        };

        let game_lump_data = lumps.data(LumpKind::GameLump)?;
        let game_lumps = game_lump::parse_directory(
            ByteView::new(game_lump_data).scoped(LumpKind::GameLump),
            game_lump_data.len(),
            file,
        )?;
        let mut static_props = None;
        for entry in game_lumps {
            if entry.id == GameLumpEntry::STATIC_PROPS {
                static_props = game_lump::parse_static_props(file, entry)?;
            }
        }

        let bsp = Self {
            data,
            header,
            planes: lumps.slice(LumpKind::Planes, MAX_MAP_PLANES)?,
            vertices: lumps.slice(LumpKind::Vertices, MAX_MAP_VERTS)?,
            edges: lumps.slice(LumpKind::Edges, MAX_MAP_EDGES)?,
            surf_edges: lumps.slice(LumpKind::SurfEdges, MAX_MAP_SURFEDGES)?,
            faces,
            tex_infos: lumps.slice(LumpKind::TexInfo, MAX_MAP_TEXINFO)?,
            tex_datas: lumps.slice(LumpKind::TexData, MAX_MAP_TEXDATA)?,
            tex_data_string_table: lumps
                .slice(LumpKind::TexDataStringTable, MAX_MAP_TEXDATA_STRING_TABLE)?,
            tex_data_string_data: lumps
                .slice(LumpKind::TexDataStringData, MAX_MAP_TEXDATA_STRING_DATA)?,
            models: lumps.slice(LumpKind::Models, MAX_MAP_MODELS)?,
            disp_infos: lumps.slice(LumpKind::DispInfo, MAX_MAP_DISPINFO)?,
            disp_verts: lumps.slice(LumpKind::DispVerts, MAX_MAP_DISP_VERTS)?,
            game_lumps,
            static_props,
        };
        debug!(
            "parsed {} faces, {} displacements, {} models",
            bsp.faces.len(),
            bsp.disp_infos.len(),
            bsp.models.len(),
        );
        Ok(bsp)
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn header(&self) -> &'a Header {
        self.header
    }

    pub fn version(&self) -> i32 {
        self.header.version
    }

    pub fn planes(&self) -> &'a [Plane] {
        self.planes
    }

    pub fn vertices(&self) -> &'a [[f32; 3]] {
        self.vertices
    }

    pub fn edges(&self) -> &'a [Edge] {
        self.edges
    }

    pub fn surf_edges(&self) -> &'a [i32] {
        self.surf_edges
    }

    pub fn faces(&self) -> &'a [Face] {
        self.faces
    }

    pub fn tex_infos(&self) -> &'a [TexInfo] {
        self.tex_infos
    }

    pub fn tex_datas(&self) -> &'a [TexData] {
        self.tex_datas
    }

    pub fn tex_data_string_table(&self) -> &'a [i32] {
        self.tex_data_string_table
    }

    pub fn tex_data_string_data(&self) -> &'a [u8] {
        self.tex_data_string_data
    }

    pub fn models(&self) -> &'a [Model] {
        self.models
    }

    pub fn disp_infos(&self) -> &'a [DispInfo] {
        self.disp_infos
    }

    pub fn disp_verts(&self) -> &'a [DispVert] {
        self.disp_verts
    }

    pub fn game_lumps(&self) -> &'a [GameLumpEntry] {
        self.game_lumps
    }

    /// The static prop game lump, if present and of a supported version.
    pub fn static_props(&self) -> Option<&StaticProps<'a>> {
        self.static_props.as_ref()
    }

    pub fn face(&self, index: usize) -> Result<&'a Face> {
        get(self.faces, index, LumpKind::Faces, "face")
    }

    pub fn plane(&self, index: usize) -> Result<&'a Plane> {
        get(self.planes, index, LumpKind::Planes, "plane")
    }

    pub fn tex_info(&self, index: usize) -> Result<&'a TexInfo> {
        get(self.tex_infos, index, LumpKind::TexInfo, "texture info")
    }

    /// Follows a texture info's texture data index.
    pub fn tex_data_for(&self, tex_info: &TexInfo) -> Result<&'a TexData> {
        let index = usize::try_from(tex_info.tex_data).map_err(|_| {
            Error::out_of_bounds(
                LumpKind::TexData,
                format!("negative texture data index {}", tex_info.tex_data),
            )
        })?;
        get(self.tex_datas, index, LumpKind::TexData, "texture data")
    }

    pub fn disp_info(&self, index: usize) -> Result<&'a DispInfo> {
        get(self.disp_infos, index, LumpKind::DispInfo, "displacement info")
    }

    /// The `count` displacement vertices starting at `disp_info.disp_vert_start`.
    pub fn disp_verts_for(&self, disp_info: &DispInfo, count: usize) -> Result<&'a [DispVert]> {
        usize::try_from(disp_info.disp_vert_start)
            .ok()
            .and_then(|start| self.disp_verts.get(start..start.checked_add(count)?))
            .ok_or_else(|| {
                Error::out_of_bounds(
                    LumpKind::DispVerts,
                    format!(
                        "{count} vertices at {} exceed {} displacement vertices",
                        disp_info.disp_vert_start,
                        self.disp_verts.len(),
                    ),
                )
            })
    }

    /// Resolves the `index`th surface edge of `face` to a vertex position.
    ///
    /// A negative surface edge walks its edge backwards, so its second vertex leads.
    pub fn face_vertex(&self, face: &Face, index: usize) -> Result<[f32; 3]> {
        let surf_edge_index = usize::try_from(face.first_edge)
            .ok()
            .and_then(|first| first.checked_add(index))
            .ok_or_else(|| {
                Error::out_of_bounds(
                    LumpKind::SurfEdges,
                    format!("face first edge {} is negative", face.first_edge),
                )
            })?;
        let surf_edge = *get(
            self.surf_edges,
            surf_edge_index,
            LumpKind::SurfEdges,
            "surface edge",
        )?;
        let edge = get(
            self.edges,
            surf_edge.unsigned_abs() as usize,
            LumpKind::Edges,
            "edge",
        )?;
        let vertex_index = edge.v[if surf_edge < 0 { 1 } else { 0 }] as usize;
        get(self.vertices, vertex_index, LumpKind::Vertices, "vertex").copied()
    }

    /// Iterates the faces of a model with their indices into the face lump.
    pub fn model_faces(
        &self,
        model_index: usize,
    ) -> Result<impl Iterator<Item = (usize, &'a Face)> + 'a> {
        let model = get(self.models, model_index, LumpKind::Models, "model")?;
        let range = usize::try_from(model.first_face)
            .ok()
            .zip(usize::try_from(model.num_faces).ok())
            .and_then(|(first, count)| Some(first..first.checked_add(count)?))
            .filter(|range| range.end <= self.faces.len())
            .ok_or_else(|| {
                Error::out_of_bounds(
                    LumpKind::Faces,
                    format!(
                        "model {model_index} faces {}+{} exceed {} faces",
                        model.first_face,
                        model.num_faces,
                        self.faces.len(),
                    ),
                )
            })?;
        let faces: &'a [Face] = self.faces;
        Ok(range.clone().zip(&faces[range]))
    }
}

/// Reads typed lump slices out of a file whose header has been validated.
struct LumpReader<'a> {
    file: ByteView<'a>,
    header: &'a Header,
}

impl<'a> LumpReader<'a> {
    fn data(&self, kind: LumpKind) -> Result<&'a [u8]> {
        let descriptor = &self.header.lumps[kind.index()];
        let (offset, length) = match (
            usize::try_from(descriptor.offset),
            usize::try_from(descriptor.length),
        ) {
            (Ok(offset), Ok(length)) => (offset, length),
            _ => {
                return Err(Error::invalid_body(
                    kind,
                    format!(
                        "descriptor has offset {} and length {}",
                        descriptor.offset, descriptor.length,
                    ),
                ))
            }
        };
        if descriptor.four_cc != [0; 4] {
            debug!("{kind:?} lump is compressed, which is unsupported");
        }
        self.file.scoped(kind).bytes(offset, length, "lump data")
    }

    fn slice<T: FullyOccupied>(&self, kind: LumpKind, max_count: usize) -> Result<&'a [T]> {
        let data = self.data(kind)?;
        if data.len() % size_of::<T>() != 0 {
            return Err(Error::invalid_body(
                kind,
                format!(
                    "length {} is not a multiple of the {} byte record",
                    data.len(),
                    size_of::<T>(),
                ),
            ));
        }
        let count = data.len() / size_of::<T>();
        if count > max_count {
            return Err(Error::invalid_body(
                kind,
                format!("{count} records exceed the limit of {max_count}"),
            ));
        }
        ByteView::new(data).scoped(kind).read_slice(0, count, "lump records")
    }
}

fn get<'a, T>(slice: &'a [T], index: usize, kind: LumpKind, what: &str) -> Result<&'a T> {
    slice
        .get(index)
        .ok_or_else(|| Error::out_of_bounds(kind, format!("{what} {index} of {}", slice.len())))
}
