use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use fully_occupied::FullyOccupied;
use log::{debug, warn};

use crate::bsp::LumpKind;
use crate::byte_view::ByteView;
use crate::error::{Error, Result};
use crate::limits::STATIC_PROP_NAME_LENGTH;

/// Directory entry of a game lump sub-entry. Offsets are relative to the start of the file.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct GameLumpEntry {
    pub id: i32,
    pub flags: u16,
    pub version: u16,
    pub offset: i32,
    pub length: i32,
}

unsafe impl FullyOccupied for GameLumpEntry {}

impl GameLumpEntry {
    pub const STATIC_PROPS: i32 = i32::from_be_bytes(*b"sprp");
    pub const DETAIL_PROPS: i32 = i32::from_be_bytes(*b"dprp");

    /// The four-character id as it reads in tools, e.g. "sprp".
    pub fn id_string(&self) -> String {
        self.id
            .to_be_bytes()
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '?' })
            .collect()
    }
}

/// Parses the directory at the head of the game lump. `view` spans the game lump; the returned
/// entries have had their own regions validated against `file`.
pub(crate) fn parse_directory<'a>(
    view: ByteView<'a>,
    lump_len: usize,
    file: ByteView<'a>,
) -> Result<&'a [GameLumpEntry]> {
    if lump_len == 0 {
        return Ok(&[]);
    }
    let count = view.read_i32(0, "game lump count")?;
    let count = usize::try_from(count).map_err(|_| {
        Error::invalid_body(LumpKind::GameLump, format!("negative entry count {count}"))
    })?;
    let directory_len = count
        .checked_mul(size_of::<GameLumpEntry>())
        .and_then(|len| len.checked_add(4))
        .filter(|&len| len <= lump_len)
        .ok_or_else(|| {
            Error::out_of_bounds(
                LumpKind::GameLump,
                format!("{count} entries do not fit in {lump_len} bytes"),
            )
        })?;
    debug!("game lump directory: {count} entries in {directory_len} bytes");

    let entries: &[GameLumpEntry] = view.read_slice(4, count, "game lump directory")?;
    for entry in entries {
        entry_data(file, entry)?;
    }
    Ok(entries)
}

/// Returns the bytes of a sub-entry, checked against the whole file.
pub(crate) fn entry_data<'a>(file: ByteView<'a>, entry: &GameLumpEntry) -> Result<&'a [u8]> {
    let (offset, length) = match (usize::try_from(entry.offset), usize::try_from(entry.length)) {
        (Ok(offset), Ok(length)) => (offset, length),
        _ => {
            return Err(Error::invalid_body(
                LumpKind::GameLump,
                format!(
                    "sub-entry {} has offset {} and length {}",
                    entry.id_string(),
                    entry.offset,
                    entry.length,
                ),
            ))
        }
    };
    file.scoped(LumpKind::GameLump)
        .bytes(offset, length, "game lump sub-entry")
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaticProp {
    pub origin: [f32; 3],
    pub angles: [f32; 3],
    /// Index into the model name dictionary.
    pub prop_type: u16,
    pub first_leaf: u16,
    pub leaf_count: u16,
    pub solid: u8,
    pub flags: u32,
    pub skin: i32,
    pub fade_min_dist: f32,
    pub fade_max_dist: f32,
    pub lighting_origin: [f32; 3],
    pub forced_fade_scale: Option<f32>,
    pub dx_level: Option<(u16, u16)>,
    pub lightmap_resolution: Option<(u8, u8)>,
}

/// An on-disk static prop record of one lump version.
pub trait StaticPropRecord: Pod {
    fn to_static_prop(&self) -> StaticProp;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct StaticPropV4 {
    pub origin: [f32; 3],
    pub angles: [f32; 3],
    pub prop_type: u16,
    pub first_leaf: u16,
    pub leaf_count: u16,
    pub solid: u8,
    pub flags: u8,
    pub skin: i32,
    pub fade_min_dist: f32,
    pub fade_max_dist: f32,
    pub lighting_origin: [f32; 3],
}

impl StaticPropRecord for StaticPropV4 {
    fn to_static_prop(&self) -> StaticProp {
        StaticProp {
            origin: self.origin,
            angles: self.angles,
            prop_type: self.prop_type,
            first_leaf: self.first_leaf,
            leaf_count: self.leaf_count,
            solid: self.solid,
            flags: self.flags as u32,
            skin: self.skin,
            fade_min_dist: self.fade_min_dist,
            fade_max_dist: self.fade_max_dist,
            lighting_origin: self.lighting_origin,
            forced_fade_scale: None,
            dx_level: None,
            lightmap_resolution: None,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct StaticPropV5 {
    pub v4: StaticPropV4,
    pub forced_fade_scale: f32,
}

impl StaticPropRecord for StaticPropV5 {
    fn to_static_prop(&self) -> StaticProp {
        StaticProp {
            forced_fade_scale: Some(self.forced_fade_scale),
            ..self.v4.to_static_prop()
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct StaticPropV6 {
    pub v5: StaticPropV5,
    pub min_dx_level: u16,
    pub max_dx_level: u16,
}

impl StaticPropRecord for StaticPropV6 {
    fn to_static_prop(&self) -> StaticProp {
        StaticProp {
            dx_level: Some((self.min_dx_level, self.max_dx_level)),
            ..self.v5.to_static_prop()
        }
    }
}

/// The 2013 multiplayer layout, stored as lump version 7 or 10. It is not compatible with the
/// version 7 or 10 records of other engine branches.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct StaticPropV7Multiplayer2013 {
    pub origin: [f32; 3],
    pub angles: [f32; 3],
    pub prop_type: u16,
    pub first_leaf: u16,
    pub leaf_count: u16,
    pub solid: u8,
    pub _padding0: u8,
    pub skin: i32,
    pub fade_min_dist: f32,
    pub fade_max_dist: f32,
    pub lighting_origin: [f32; 3],
    pub forced_fade_scale: f32,
    pub min_dx_level: u16,
    pub max_dx_level: u16,
    pub flags: u32,
    pub lightmap_res_x: u8,
    pub lightmap_res_y: u8,
    pub _padding1: u16,
}

impl StaticPropRecord for StaticPropV7Multiplayer2013 {
    fn to_static_prop(&self) -> StaticProp {
        StaticProp {
            origin: self.origin,
            angles: self.angles,
            prop_type: self.prop_type,
            first_leaf: self.first_leaf,
            leaf_count: self.leaf_count,
            solid: self.solid,
            flags: self.flags,
            skin: self.skin,
            fade_min_dist: self.fade_min_dist,
            fade_max_dist: self.fade_max_dist,
            lighting_origin: self.lighting_origin,
            forced_fade_scale: Some(self.forced_fade_scale),
            dx_level: Some((self.min_dx_level, self.max_dx_level)),
            lightmap_resolution: Some((self.lightmap_res_x, self.lightmap_res_y)),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct StaticPropDictEntry {
    pub model_name: [u8; STATIC_PROP_NAME_LENGTH],
}

unsafe impl FullyOccupied for StaticPropDictEntry {}

impl StaticPropDictEntry {
    /// The model path up to the first NUL, or `None` if it is not UTF-8.
    pub fn model_name(&self) -> Option<&str> {
        let len = self
            .model_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.model_name.len());
        std::str::from_utf8(&self.model_name[..len]).ok()
    }
}

/// The decoded static prop game lump.
#[derive(Clone, Debug, Default)]
pub struct StaticProps<'a> {
    pub version: u16,
    pub dictionary: &'a [StaticPropDictEntry],
    pub leaves: &'a [u16],
    pub props: Vec<StaticProp>,
}

impl<'a> StaticProps<'a> {
    /// Iterates props together with their model names. Props whose dictionary index is out of range
    /// are skipped with a warning.
    pub fn iter_named(&self) -> impl Iterator<Item = (&StaticProp, &'a str)> + '_ {
        let dictionary = self.dictionary;
        self.props.iter().filter_map(move |prop| {
            match dictionary.get(prop.prop_type as usize) {
                Some(entry) => Some((prop, entry.model_name().unwrap_or(""))),
                None => {
                    warn!(
                        "static prop dictionary index {} out of range ({} entries)",
                        prop.prop_type,
                        dictionary.len(),
                    );
                    None
                }
            }
        })
    }
}

/// Decodes the static prop sub-entry. Unsupported versions yield `Ok(None)` after a warning.
pub(crate) fn parse_static_props<'a>(
    file: ByteView<'a>,
    entry: &GameLumpEntry,
) -> Result<Option<StaticProps<'a>>> {
    match entry.version {
        4 => parse_static_props_as::<StaticPropV4>(file, entry).map(Some),
        5 => parse_static_props_as::<StaticPropV5>(file, entry).map(Some),
        6 => parse_static_props_as::<StaticPropV6>(file, entry).map(Some),
        7 | 10 => parse_static_props_as::<StaticPropV7Multiplayer2013>(file, entry).map(Some),
        version => {
            warn!("unsupported static prop lump version {version}, ignoring static props");
            Ok(None)
        }
    }
}

fn parse_static_props_as<'a, R: StaticPropRecord>(
    file: ByteView<'a>,
    entry: &GameLumpEntry,
) -> Result<StaticProps<'a>> {
    let data = entry_data(file, entry)?;
    let view = ByteView::new(data).scoped(LumpKind::GameLump);
    let mut offset = 0;

    let dictionary =
        read_counted::<StaticPropDictEntry>(view, &mut offset, "static prop dictionary")?;
    let leaves = read_counted::<u16>(view, &mut offset, "static prop leaves")?;

    let prop_count = read_count(view, &mut offset, "static props")?;
    let prop_bytes = prop_count
        .checked_mul(size_of::<R>())
        .ok_or_else(|| Error::invalid_body(LumpKind::GameLump, "static prop count overflows"))?;
    let prop_data = view.bytes(offset, prop_bytes, "static props")?;
    offset += prop_bytes;

    if offset != data.len() {
        return Err(Error::invalid_body(
            LumpKind::GameLump,
            format!(
                "static prop lump is {} bytes but its contents account for {offset}",
                data.len(),
            ),
        ));
    }

    // Prop records follow a variable number of 2-byte leaves, so they may be misaligned.
    let props: Vec<StaticProp> = prop_data
        .chunks_exact(size_of::<R>())
        .map(|chunk| bytemuck::pod_read_unaligned::<R>(chunk).to_static_prop())
        .collect();
    debug!(
        "static props v{}: {} models, {} leaves, {} props",
        entry.version,
        dictionary.len(),
        leaves.len(),
        props.len(),
    );

    Ok(StaticProps {
        version: entry.version,
        dictionary,
        leaves,
        props,
    })
}

fn read_count(view: ByteView, offset: &mut usize, what: &str) -> Result<usize> {
    let count = view.read_i32(*offset, what)?;
    *offset += 4;
    usize::try_from(count)
        .map_err(|_| Error::invalid_body(LumpKind::GameLump, format!("{what}: count {count}")))
}

fn read_counted<'a, T: FullyOccupied>(
    view: ByteView<'a>,
    offset: &mut usize,
    what: &str,
) -> Result<&'a [T]> {
    let count = read_count(view, offset, what)?;
    let records = view.read_slice::<T>(*offset, count, what)?;
    *offset += records.len() * size_of::<T>();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use super::{
        GameLumpEntry, StaticPropDictEntry, StaticPropV4, StaticPropV5, StaticPropV6,
        StaticPropV7Multiplayer2013,
    };

    #[test]
    fn record_sizes() {
        assert_eq!(size_of::<GameLumpEntry>(), 16);
        assert_eq!(size_of::<StaticPropDictEntry>(), 128);
        assert_eq!(size_of::<StaticPropV4>(), 56);
        assert_eq!(size_of::<StaticPropV5>(), 60);
        assert_eq!(size_of::<StaticPropV6>(), 64);
        assert_eq!(size_of::<StaticPropV7Multiplayer2013>(), 72);
    }

    #[test]
    fn static_prop_id() {
        assert_eq!(GameLumpEntry::STATIC_PROPS, 0x7370_7270);
        let entry = GameLumpEntry {
            id: GameLumpEntry::STATIC_PROPS,
            flags: 0,
            version: 6,
            offset: 0,
            length: 0,
        };
        assert_eq!(entry.id_string(), "sprp");
    }

    #[test]
    fn dictionary_names_stop_at_nul() {
        let mut entry = StaticPropDictEntry {
            model_name: [0; 128],
        };
        entry.model_name[..14].copy_from_slice(b"models/can.mdl");
        assert_eq!(entry.model_name(), Some("models/can.mdl"));
    }
}
