//! Engine-imposed maximum record counts per lump.

pub const MAX_MAP_PLANES: usize = 65536;
pub const MAX_MAP_VERTS: usize = 65536;
pub const MAX_MAP_EDGES: usize = 256000;
pub const MAX_MAP_SURFEDGES: usize = 512000;
pub const MAX_MAP_FACES: usize = 65536;
pub const MAX_MAP_TEXINFO: usize = 12288;
pub const MAX_MAP_TEXDATA: usize = 2048;
pub const MAX_MAP_TEXDATA_STRING_TABLE: usize = 65536;
pub const MAX_MAP_TEXDATA_STRING_DATA: usize = 256000;
pub const MAX_MAP_MODELS: usize = 1024;
pub const MAX_MAP_DISPINFO: usize = 2048;

pub const MIN_MAP_DISP_POWER: i32 = 2;
pub const MAX_MAP_DISP_POWER: i32 = 4;

const MAX_DISP_SIDE_LENGTH: usize = (1 << MAX_MAP_DISP_POWER) + 1;
pub const MAX_MAP_DISP_VERTS: usize =
    MAX_MAP_DISPINFO * MAX_DISP_SIDE_LENGTH * MAX_DISP_SIDE_LENGTH;

pub const MAX_DISP_CORNER_NEIGHBORS: usize = 4;

pub const STATIC_PROP_NAME_LENGTH: usize = 128;
