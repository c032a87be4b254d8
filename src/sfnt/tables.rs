// glyphkit/src/sfnt/tables.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Loaders for the fixed-schema sfnt tables.

use log::{trace, warn};

use crate::error::{Error, FontResult};
use crate::stream::Stream;

use super::directory::SfntDirectory;
use super::{
    TAG_GASP, TAG_HDMX, TAG_HEAD, TAG_HHEA, TAG_HMTX, TAG_KERN, TAG_MAXP, TAG_NAME, TAG_OS2,
    TAG_POST, TAG_VHEA, TAG_VMTX,
};

/// The `head` table.
#[derive(Clone, Copy, Debug, Default)]
pub struct Header {
    pub table_version: u32,
    pub font_revision: u32,
    pub flags: u16,
    pub units_per_em: u16,
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
    pub mac_style: u16,
    pub lowest_rec_ppem: u16,
    pub index_to_loc_format: i16,
}

pub fn load_header(stream: &mut Stream, dir: &SfntDirectory) -> FontResult<Header> {
    dir.goto_table(stream, TAG_HEAD)?;
    let mut frame = stream.frame(54)?;
    let header = Header {
        table_version: frame.get_u32()?,
        font_revision: frame.get_u32()?,
        flags: {
            let _checksum_adjust = frame.get_u32()?;
            let _magic = frame.get_u32()?;
            frame.get_u16()?
        },
        units_per_em: frame.get_u16()?,
        x_min: {
            // creation and modification stamps
            let _ = frame.get_u32()?;
            let _ = frame.get_u32()?;
            let _ = frame.get_u32()?;
            let _ = frame.get_u32()?;
            frame.get_i16()?
        },
        y_min: frame.get_i16()?,
        x_max: frame.get_i16()?,
        y_max: frame.get_i16()?,
        mac_style: frame.get_u16()?,
        lowest_rec_ppem: frame.get_u16()?,
        index_to_loc_format: {
            let _direction = frame.get_i16()?;
            frame.get_i16()?
        },
    };
    trace!("units per em: {}", header.units_per_em);
    if header.units_per_em == 0 {
        return Err(Error::InvalidTable);
    }
    Ok(header)
}

/// The `maxp` table.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaxProfile {
    pub version: u32,
    pub num_glyphs: u16,
    pub max_points: u16,
    pub max_contours: u16,
    pub max_composite_points: u16,
    pub max_composite_contours: u16,
    pub max_zones: u16,
    pub max_twilight_points: u16,
    pub max_storage: u16,
    pub max_function_defs: u16,
    pub max_instruction_defs: u16,
    pub max_stack_elements: u16,
    pub max_size_of_instructions: u16,
    pub max_component_elements: u16,
    pub max_component_depth: u16,
}

pub fn load_max_profile(stream: &mut Stream, dir: &SfntDirectory) -> FontResult<MaxProfile> {
    dir.goto_table(stream, TAG_MAXP)?;
    let mut frame = stream.frame(32)?;
    let mut profile = MaxProfile {
        version: frame.get_u32()?,
        num_glyphs: frame.get_u16()?,
        max_points: frame.get_u16()?,
        max_contours: frame.get_u16()?,
        max_composite_points: frame.get_u16()?,
        max_composite_contours: frame.get_u16()?,
        max_zones: frame.get_u16()?,
        max_twilight_points: frame.get_u16()?,
        max_storage: frame.get_u16()?,
        max_function_defs: frame.get_u16()?,
        max_instruction_defs: frame.get_u16()?,
        max_stack_elements: frame.get_u16()?,
        max_size_of_instructions: frame.get_u16()?,
        max_component_elements: frame.get_u16()?,
        max_component_depth: frame.get_u16()?,
    };
    // Certain broken fonts (e.g. `Keystrokes MT') declare no function
    // definitions at all; give them the historical default.
    if profile.max_function_defs == 0 {
        profile.max_function_defs = 64;
    }
    if profile.max_component_depth == 0 {
        profile.max_component_depth = 1;
    }
    Ok(profile)
}

/// The `hhea` (or `vhea`) header.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsHeader {
    pub version: u32,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub advance_max: u16,
    pub min_start_side_bearing: i16,
    pub min_end_side_bearing: i16,
    pub max_extent: i16,
    pub caret_slope_rise: i16,
    pub caret_slope_run: i16,
    pub number_of_metrics: u16,
}

/// The dense metric arrays from `hmtx`/`vmtx`: `number_of_metrics`
/// (advance, bearing) pairs, then trailing bearings reusing the last
/// advance.
#[derive(Clone, Debug, Default)]
pub struct MetricsTable {
    pub long: Vec<(u16, i16)>,
    pub short: Vec<i16>,
}

impl MetricsTable {
    /// The (bearing, advance) pair for a glyph, in font units.
    pub fn lookup(&self, glyph_index: u32) -> (i16, u16) {
        let index = glyph_index as usize;
        if index < self.long.len() {
            let (advance, bearing) = self.long[index];
            (bearing, advance)
        } else {
            let advance = self.long.last().map(|&(a, _)| a).unwrap_or(0);
            let bearing = self
                .short
                .get(index - self.long.len())
                .copied()
                .unwrap_or(0);
            (bearing, advance)
        }
    }
}

fn load_metrics_header(
    stream: &mut Stream,
    dir: &SfntDirectory,
    vertical: bool,
) -> FontResult<Option<MetricsHeader>> {
    let tag = if vertical { TAG_VHEA } else { TAG_HHEA };
    match dir.goto_table(stream, tag) {
        Ok(_) => {}
        // The vertical header is optional.
        Err(Error::TableMissing) if vertical => return Ok(None),
        Err(e) => return Err(e),
    }
    let mut frame = stream.frame(36)?;
    let header = MetricsHeader {
        version: frame.get_u32()?,
        ascender: frame.get_i16()?,
        descender: frame.get_i16()?,
        line_gap: frame.get_i16()?,
        advance_max: frame.get_u16()?,
        min_start_side_bearing: frame.get_i16()?,
        min_end_side_bearing: frame.get_i16()?,
        max_extent: frame.get_i16()?,
        caret_slope_rise: frame.get_i16()?,
        caret_slope_run: frame.get_i16()?,
        number_of_metrics: {
            let _caret_offset = frame.get_i16()?;
            for _ in 0..4 {
                let _reserved = frame.get_i16()?;
            }
            let _data_format = frame.get_i16()?;
            frame.get_u16()?
        },
    };
    Ok(Some(header))
}

fn load_metrics_table(
    stream: &mut Stream,
    dir: &SfntDirectory,
    num_glyphs: u16,
    num_longs: u16,
    vertical: bool,
) -> FontResult<MetricsTable> {
    let tag = if vertical { TAG_VMTX } else { TAG_HMTX };
    match dir.goto_table(stream, tag) {
        Ok(_) => {}
        // Some fonts carry a vertical header with no metrics to back it
        // (e.g. mingliu); treat that as no vertical metrics at all.
        Err(Error::TableMissing) if vertical => {
            return Ok(MetricsTable::default());
        }
        Err(e) => return Err(e),
    }
    if num_longs > num_glyphs {
        warn!("more metrics than glyphs");
        return Err(Error::InvalidTable);
    }
    let num_shorts = num_glyphs - num_longs;
    let mut table = MetricsTable {
        long: Vec::with_capacity(num_longs as usize),
        short: Vec::with_capacity(num_shorts as usize),
    };
    let mut frame = stream.frame(num_longs as usize * 4 + num_shorts as usize * 2)?;
    for _ in 0..num_longs {
        let advance = frame.get_u16()?;
        let bearing = frame.get_i16()?;
        table.long.push((advance, bearing));
    }
    for _ in 0..num_shorts {
        table.short.push(frame.get_i16()?);
    }
    Ok(table)
}

/// Loads `hhea` + `hmtx`. The horizontal side is mandatory.
pub fn load_horizontal(
    stream: &mut Stream,
    dir: &SfntDirectory,
    num_glyphs: u16,
) -> FontResult<(MetricsHeader, MetricsTable)> {
    let header = load_metrics_header(stream, dir, false)?.ok_or(Error::TableMissing)?;
    let table = load_metrics_table(stream, dir, num_glyphs, header.number_of_metrics, false)?;
    Ok((header, table))
}

/// Loads `vhea` + `vmtx` when present.
pub fn load_vertical(
    stream: &mut Stream,
    dir: &SfntDirectory,
    num_glyphs: u16,
) -> FontResult<Option<(MetricsHeader, MetricsTable)>> {
    let header = match load_metrics_header(stream, dir, true)? {
        Some(header) => header,
        None => return Ok(None),
    };
    let table = load_metrics_table(stream, dir, num_glyphs, header.number_of_metrics, true)?;
    if table.long.is_empty() && table.short.is_empty() {
        return Ok(None);
    }
    Ok(Some((header, table)))
}

/// The subset of `OS/2` the engine consumes.
#[derive(Clone, Copy, Debug)]
pub struct Os2 {
    pub version: u16,
    pub x_avg_char_width: i16,
    pub us_weight_class: u16,
    pub fs_selection: u16,
    pub s_typo_ascender: i16,
    pub s_typo_descender: i16,
    pub s_typo_line_gap: i16,
    pub us_win_ascent: u16,
    pub us_win_descent: u16,
}

/// Loads `OS/2`. Mac-era fonts lack it; that is not an error.
pub fn load_os2(stream: &mut Stream, dir: &SfntDirectory) -> FontResult<Option<Os2>> {
    match dir.goto_table(stream, TAG_OS2) {
        Ok(_) => {}
        Err(Error::TableMissing) => return Ok(None),
        Err(e) => return Err(e),
    }
    let mut frame = stream.frame(78)?;
    let version = frame.get_u16()?;
    let x_avg_char_width = frame.get_i16()?;
    let us_weight_class = frame.get_u16()?;
    // usWidthClass .. sFamilyClass
    for _ in 0..12 {
        let _ = frame.get_i16()?;
    }
    // panose
    let _ = frame.get_bytes(10)?;
    // unicode ranges
    for _ in 0..4 {
        let _ = frame.get_u32()?;
    }
    // vendor id
    let _ = frame.get_bytes(4)?;
    let fs_selection = frame.get_u16()?;
    let _first_char = frame.get_u16()?;
    let _last_char = frame.get_u16()?;
    let s_typo_ascender = frame.get_i16()?;
    let s_typo_descender = frame.get_i16()?;
    let s_typo_line_gap = frame.get_i16()?;
    let us_win_ascent = frame.get_u16()?;
    let us_win_descent = frame.get_u16()?;
    Ok(Some(Os2 {
        version,
        x_avg_char_width,
        us_weight_class,
        fs_selection,
        s_typo_ascender,
        s_typo_descender,
        s_typo_line_gap,
        us_win_ascent,
        us_win_descent,
    }))
}

/// The fixed part of `post`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Postscript {
    pub format_type: u32,
    pub italic_angle: i32,
    pub underline_position: i16,
    pub underline_thickness: i16,
    pub is_fixed_pitch: bool,
}

pub fn load_postscript(stream: &mut Stream, dir: &SfntDirectory) -> FontResult<Postscript> {
    dir.goto_table(stream, TAG_POST)?;
    let mut frame = stream.frame(16)?;
    Ok(Postscript {
        format_type: frame.get_u32()?,
        italic_angle: frame.get_i32()?,
        underline_position: frame.get_i16()?,
        underline_thickness: frame.get_i16()?,
        is_fixed_pitch: frame.get_u32()? != 0,
    })
}

/// One record of the `name` table; the string is a slice of the pooled
/// storage.
#[derive(Clone, Copy, Debug)]
pub struct NameRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    pub name_id: u16,
    pub offset: usize,
    pub length: usize,
}

/// The `name` table: records plus one pooled string storage.
#[derive(Clone, Debug, Default)]
pub struct NameTable {
    pub records: Vec<NameRecord>,
    pub storage: Vec<u8>,
}

impl NameTable {
    /// Raw bytes of a record's string.
    pub fn bytes(&self, record: &NameRecord) -> &[u8] {
        let end = (record.offset + record.length).min(self.storage.len());
        let start = record.offset.min(end);
        &self.storage[start..end]
    }

    /// Resolves a name id to text, preferring Microsoft Unicode entries
    /// and falling back to Macintosh Roman.
    pub fn english_name(&self, name_id: u16) -> Option<String> {
        let record = self
            .records
            .iter()
            .find(|r| r.name_id == name_id && r.platform_id == 3 && (r.encoding_id == 1 || r.encoding_id == 0))
            .or_else(|| {
                self.records
                    .iter()
                    .find(|r| r.name_id == name_id && r.platform_id == 1 && r.encoding_id == 0)
            })?;
        let bytes = self.bytes(record);
        if record.platform_id == 3 {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from(pair[0]) << 8 | u16::from(pair[1]))
                .collect();
            Some(String::from_utf16_lossy(&units))
        } else {
            Some(bytes.iter().map(|&b| b as char).collect())
        }
    }
}

pub fn load_names(stream: &mut Stream, dir: &SfntDirectory) -> FontResult<NameTable> {
    let table_offset = {
        dir.goto_table(stream, TAG_NAME)?;
        stream.pos()
    };
    let mut frame = stream.frame(6)?;
    let _format = frame.get_u16()?;
    let count = frame.get_u16()?;
    let storage_offset = frame.get_u16()?;
    drop(frame);

    let mut records = Vec::with_capacity(count as usize);
    let mut storage_size = 0usize;
    let mut frame = stream.frame(count as usize * 12)?;
    for _ in 0..count {
        let record = NameRecord {
            platform_id: frame.get_u16()?,
            encoding_id: frame.get_u16()?,
            language_id: frame.get_u16()?,
            name_id: frame.get_u16()?,
            length: frame.get_u16()? as usize,
            offset: frame.get_u16()? as usize,
        };
        storage_size = storage_size.max(record.offset + record.length);
        records.push(record);
    }
    drop(frame);

    let mut storage = vec![0; storage_size];
    if storage_size > 0 {
        stream.read_at(table_offset + u64::from(storage_offset), &mut storage)?;
    }
    Ok(NameTable { records, storage })
}

/// The `gasp` table.
#[derive(Clone, Debug, Default)]
pub struct Gasp {
    pub version: u16,
    /// `(max_ppem, behavior)` pairs.
    pub ranges: Vec<(u16, u16)>,
}

pub fn load_gasp(stream: &mut Stream, dir: &SfntDirectory) -> FontResult<Gasp> {
    match dir.goto_table(stream, TAG_GASP) {
        Ok(_) => {}
        Err(Error::TableMissing) => return Ok(Gasp::default()),
        Err(e) => return Err(e),
    }
    let mut frame = stream.frame(4)?;
    let version = frame.get_u16()?;
    let num_ranges = frame.get_u16()?;
    drop(frame);
    let mut ranges = Vec::with_capacity(num_ranges as usize);
    let mut frame = stream.frame(num_ranges as usize * 4)?;
    for _ in 0..num_ranges {
        ranges.push((frame.get_u16()?, frame.get_u16()?));
    }
    Ok(Gasp { version, ranges })
}

/// One `hdmx` record: device advances for every glyph at one ppem.
#[derive(Clone, Debug)]
pub struct HdmxRecord {
    pub ppem: u8,
    pub max_width: u8,
    pub widths: Vec<u8>,
}

/// The `hdmx` table.
#[derive(Clone, Debug, Default)]
pub struct Hdmx {
    pub records: Vec<HdmxRecord>,
}

impl Hdmx {
    /// The device advance table for a given ppem, if recorded.
    pub fn widths_for_ppem(&self, ppem: u16) -> Option<&[u8]> {
        self.records
            .iter()
            .find(|r| u16::from(r.ppem) == ppem)
            .map(|r| r.widths.as_slice())
    }
}

pub fn load_hdmx(stream: &mut Stream, dir: &SfntDirectory, num_glyphs: u16) -> FontResult<Hdmx> {
    match dir.goto_table(stream, TAG_HDMX) {
        Ok(_) => {}
        Err(Error::TableMissing) => return Ok(Hdmx::default()),
        Err(e) => return Err(e),
    }
    let mut frame = stream.frame(8)?;
    let version = frame.get_u16()?;
    let num_records = frame.get_i16()?;
    let record_size = frame.get_i32()?;
    drop(frame);
    // Only format 0.
    if version != 0 || num_records < 0 {
        return Ok(Hdmx::default());
    }
    let padding = i64::from(record_size) - i64::from(num_glyphs) - 2;
    let mut records = Vec::with_capacity(num_records as usize);
    for _ in 0..num_records {
        let ppem = stream.read_u8()?;
        let max_width = stream.read_u8()?;
        let mut widths = vec![0; num_glyphs as usize];
        stream.read(&mut widths)?;
        if padding > 0 {
            stream.skip(padding as u64)?;
        }
        records.push(HdmxRecord {
            ppem,
            max_width,
            widths,
        });
    }
    Ok(Hdmx { records })
}

/// The format-0 horizontal kerning pairs, sorted by (left, right).
#[derive(Clone, Debug, Default)]
pub struct KernTable {
    pub pairs: Vec<(u16, u16, i16)>,
}

impl KernTable {
    /// The kerning value for a pair, if listed.
    pub fn lookup(&self, left: u16, right: u16) -> Option<i16> {
        self.pairs
            .binary_search_by_key(&(left, right), |&(l, r, _)| (l, r))
            .ok()
            .map(|i| self.pairs[i].2)
    }
}

/// Loads the first format-0 horizontal `kern` subtable; every other
/// subtable is ignored.
pub fn load_kern(stream: &mut Stream, dir: &SfntDirectory) -> FontResult<KernTable> {
    match dir.goto_table(stream, TAG_KERN) {
        Ok(_) => {}
        Err(Error::TableMissing) => return Ok(KernTable::default()),
        Err(e) => return Err(e),
    }
    let _version = stream.read_u16()?;
    let num_tables = stream.read_u16()?;
    for _ in 0..num_tables {
        let _subtable_version = stream.read_u16()?;
        let length = stream.read_u16()?;
        let coverage = stream.read_u16()?;
        if coverage == 0x0001 {
            let num_pairs = stream.read_u16()?;
            // skip searchRange/entrySelector/rangeShift
            stream.skip(6)?;
            let mut pairs = Vec::with_capacity(num_pairs as usize);
            let mut frame = stream.frame(num_pairs as usize * 6)?;
            for _ in 0..num_pairs {
                let left = frame.get_u16()?;
                let right = frame.get_u16()?;
                let value = frame.get_i16()?;
                pairs.push((left, right, value));
            }
            pairs.sort_by_key(|&(l, r, _)| (l, r));
            return Ok(KernTable { pairs });
        }
        // Jump to the next subtable; `length` covers the 6-byte header.
        let body = u64::from(length).saturating_sub(6);
        stream.skip(body)?;
    }
    Ok(KernTable::default())
}

#[cfg(test)]
mod tests {
    use super::MetricsTable;

    #[test]
    fn trailing_bearings_reuse_last_advance() {
        let table = MetricsTable {
            long: vec![(500, 10), (600, 20)],
            short: vec![30, 40],
        };
        assert_eq!(table.lookup(1), (20, 600));
        assert_eq!(table.lookup(2), (30, 600));
        assert_eq!(table.lookup(3), (40, 600));
    }

    #[test]
    fn kern_binary_search() {
        let table = super::KernTable {
            pairs: vec![(1, 2, -30), (1, 5, 12), (4, 4, 7)],
        };
        assert_eq!(table.lookup(1, 5), Some(12));
        assert_eq!(table.lookup(5, 1), None);
    }
}
