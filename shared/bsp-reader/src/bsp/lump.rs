use fully_occupied::FullyOccupied;

/// "VBSP" read as a little-endian i32.
pub const IDENT: i32 = i32::from_le_bytes(*b"VBSP");

pub const MIN_VERSION: i32 = 19;
pub const MAX_VERSION: i32 = 21;

pub const LUMP_COUNT: usize = 64;

#[repr(C)]
#[derive(Debug)]
pub struct Header {
    pub ident: i32,
    pub version: i32,
    pub lumps: [LumpDescriptor; LUMP_COUNT],
    pub map_revision: i32,
}

unsafe impl FullyOccupied for Header {}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct LumpDescriptor {
    pub offset: i32,
    pub length: i32,
    pub version: i32,
    /// Uncompressed size, or zero when the lump is stored uncompressed.
    pub four_cc: [u8; 4],
}

unsafe impl FullyOccupied for LumpDescriptor {}

macro_rules! lump_kinds {
    ($($name:ident = $index:literal,)*) => {
        /// Position of a lump in the header's directory.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum LumpKind {
            $($name = $index,)*
        }

        impl LumpKind {
            pub const ALL: [LumpKind; LUMP_COUNT] = [$(LumpKind::$name,)*];
        }
    };
}

lump_kinds! {
    Entities = 0,
    Planes = 1,
    TexData = 2,
    Vertices = 3,
    Visibility = 4,
    Nodes = 5,
    TexInfo = 6,
    Faces = 7,
    Lighting = 8,
    Occlusion = 9,
    Leaves = 10,
    FaceIds = 11,
    Edges = 12,
    SurfEdges = 13,
    Models = 14,
    WorldLights = 15,
    LeafFaces = 16,
    LeafBrushes = 17,
    Brushes = 18,
    BrushSides = 19,
    Areas = 20,
    AreaPortals = 21,
    PropCollision = 22,
    PropHulls = 23,
    PropHullVerts = 24,
    PropTris = 25,
    DispInfo = 26,
    OriginalFaces = 27,
    PhysDisp = 28,
    PhysCollide = 29,
    VertNormals = 30,
    VertNormalIndices = 31,
    DispLightmapAlphas = 32,
    DispVerts = 33,
    DispLightmapSamplePositions = 34,
    GameLump = 35,
    LeafWaterData = 36,
    Primitives = 37,
    PrimVerts = 38,
    PrimIndices = 39,
    PakFile = 40,
    ClipPortalVerts = 41,
    Cubemaps = 42,
    TexDataStringData = 43,
    TexDataStringTable = 44,
    Overlays = 45,
    LeafMinDistToWater = 46,
    FaceMacroTextureInfo = 47,
    DispTris = 48,
    PropBlob = 49,
    WaterOverlays = 50,
    LeafAmbientIndexHdr = 51,
    LeafAmbientIndex = 52,
    LightingHdr = 53,
    WorldLightsHdr = 54,
    LeafAmbientLightingHdr = 55,
    LeafAmbientLighting = 56,
    XzipPakFile = 57,
    FacesHdr = 58,
    MapFlags = 59,
    OverlayFades = 60,
    OverlaySystemLevels = 61,
    PhysLevel = 62,
    DispMultiBlend = 63,
}

impl LumpKind {
    pub fn index(self) -> usize {
        self as usize
    }
}
