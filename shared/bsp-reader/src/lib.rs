#![deny(unsafe_op_in_unsafe_fn)]

#[cfg(test)]
#[macro_use]
extern crate quickcheck_macros;

pub mod bsp;
pub mod byte_view;
pub mod displacement;
pub mod error;
pub mod geometry;
pub mod limits;
pub mod surface;
pub mod texture;
pub mod world;

#[cfg(test)]
mod test_map;

pub use bsp::Bsp;
pub use error::{Error, Reason, Result};
pub use geometry::{Mesh, Vertex};
pub use world::{build_model_geometry, GeometryOptions, Surface, SurfaceKind};
