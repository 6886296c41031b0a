use bitflags::bitflags;

bitflags! {
    /// Surface flags carried by a texture info.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SurfaceFlags: u32 {
        const LIGHT = 0x0001;
        const SKY2D = 0x0002;
        const SKY = 0x0004;
        const WARP = 0x0008;
        const TRANS = 0x0010;
        const NOPORTAL = 0x0020;
        const TRIGGER = 0x0040;
        const NODRAW = 0x0080;
        const HINT = 0x0100;
        const SKIP = 0x0200;
        const NOLIGHT = 0x0400;
        const BUMPLIGHT = 0x0800;
        const NOSHADOWS = 0x1000;
        const NODECALS = 0x2000;
        const NOCHOP = 0x4000;
        const HITBOX = 0x8000;
    }
}

impl SurfaceFlags {
    /// Flags whose faces never produce visible geometry.
    pub const HIDDEN: Self = Self::NODRAW.union(Self::SKIP).union(Self::TRIGGER);

    pub fn is_drawable(self) -> bool {
        !self.intersects(Self::HIDDEN)
    }
}
