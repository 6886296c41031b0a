use crate::bsp::{Bsp, LumpKind, TexData};
use crate::byte_view::ByteView;
use crate::error::{Error, Result};

/// A texture referenced by the map, with its name resolved through the string table.
#[derive(Clone, Copy, Debug)]
pub struct Texture<'a> {
    pub name: &'a str,
    pub width: i32,
    pub height: i32,
    pub reflectivity: [f32; 3],
}

impl<'a> Bsp<'a> {
    /// Looks up the material path of a texture data record.
    pub fn texture_name(&self, tex_data: &TexData) -> Result<&'a str> {
        let table = self.tex_data_string_table();
        let offset = usize::try_from(tex_data.name_string_table_id)
            .ok()
            .and_then(|id| table.get(id))
            .ok_or_else(|| {
                Error::out_of_bounds(
                    LumpKind::TexDataStringTable,
                    format!(
                        "string table index {} of {}",
                        tex_data.name_string_table_id,
                        table.len(),
                    ),
                )
            })?;
        let offset = usize::try_from(*offset).map_err(|_| {
            Error::out_of_bounds(
                LumpKind::TexDataStringData,
                format!("negative string offset {offset}"),
            )
        })?;
        ByteView::new(self.tex_data_string_data())
            .scoped(LumpKind::TexDataStringData)
            .read_str(offset, "texture name")
    }

    /// All texture data records in lump order.
    pub fn textures(&self) -> Result<Vec<Texture<'a>>> {
        self.tex_datas()
            .iter()
            .map(|tex_data| {
                Ok(Texture {
                    name: self.texture_name(tex_data)?,
                    width: tex_data.width,
                    height: tex_data.height,
                    reflectivity: tex_data.reflectivity,
                })
            })
            .collect()
    }
}
