use std::io::{self, Write};

use bsp_reader::Surface;

/// Streams surfaces into a single Wavefront OBJ file, one object per surface.
pub struct ObjWriter<W: Write> {
    inner: W,
    vertex_count: usize,
    triangle_count: usize,
}

impl<W: Write> ObjWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            vertex_count: 0,
            triangle_count: 0,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    pub fn write_surface(&mut self, surface: &Surface, material: &str) -> io::Result<()> {
        writeln!(self.inner, "o face_{}", surface.face_index)?;
        writeln!(self.inner, "usemtl {material}")?;
        for vertex in &surface.mesh.vertices {
            let [x, y, z] = vertex.position;
            writeln!(self.inner, "v {x} {y} {z}")?;
        }
        for vertex in &surface.mesh.vertices {
            // OBJ texture space starts at the bottom left.
            let [u, v] = vertex.uv;
            writeln!(self.inner, "vt {u} {}", 1.0 - v)?;
        }
        for vertex in &surface.mesh.vertices {
            let [x, y, z] = vertex.normal;
            writeln!(self.inner, "vn {x} {y} {z}")?;
        }

        // OBJ indices are 1-based and global to the file.
        let base = self.vertex_count + 1;
        for triangle in surface.mesh.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| base + i as usize);
            writeln!(self.inner, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
        }

        self.vertex_count += surface.mesh.vertices.len();
        self.triangle_count += surface.mesh.triangle_count();
        Ok(())
    }

    pub fn finish(self) -> io::Result<W> {
        Ok(self.inner)
    }
}
