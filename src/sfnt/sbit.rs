// glyphkit/src/sfnt/sbit.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Embedded bitmaps: the `EBLC` index and `EBDT` image data.

use log::warn;

use crate::bitmap::{Bitmap, PixelMode};
use crate::error::{Error, FontResult};
use crate::stream::Stream;

use super::directory::SfntDirectory;
use super::{TAG_EBDT, TAG_EBLC};

const MAX_COMPOSITE_SBIT_DEPTH: u32 = 8;

/// Metrics of one embedded bitmap, in pixels.
#[derive(Clone, Copy, Debug, Default)]
pub struct SbitMetrics {
    pub height: i32,
    pub width: i32,
    pub hori_bearing_x: i32,
    pub hori_bearing_y: i32,
    pub hori_advance: i32,
    pub vert_bearing_x: i32,
    pub vert_bearing_y: i32,
    pub vert_advance: i32,
}

/// Line metrics of a strike.
#[derive(Clone, Copy, Debug, Default)]
pub struct SbitLineMetrics {
    pub ascender: i8,
    pub descender: i8,
    pub max_width: u8,
}

/// A contiguous glyph-index interval of one strike.
#[derive(Clone, Debug)]
pub struct SbitRange {
    pub first_glyph: u16,
    pub last_glyph: u16,
    pub index_format: u16,
    pub image_format: u16,
    pub image_offset: u32,
    pub image_size: u32,
    pub metrics: SbitMetrics,
    pub glyph_offsets: Vec<u32>,
    pub glyph_codes: Vec<u16>,
}

/// One set of bitmaps at a single ppem and bit depth.
#[derive(Clone, Debug)]
pub struct SbitStrike {
    pub hori: SbitLineMetrics,
    pub vert: SbitLineMetrics,
    pub start_glyph: u16,
    pub end_glyph: u16,
    pub x_ppem: u8,
    pub y_ppem: u8,
    pub bit_depth: u8,
    pub flags: i8,
    pub ranges: Vec<SbitRange>,
}

/// The parsed `EBLC` table.
#[derive(Clone, Debug, Default)]
pub struct SbitTable {
    pub strikes: Vec<SbitStrike>,
}

fn load_line_metrics(frame: &mut crate::stream::Frame) -> FontResult<SbitLineMetrics> {
    let metrics = SbitLineMetrics {
        ascender: frame.get_i8()?,
        descender: frame.get_i8()?,
        max_width: frame.get_u8()?,
    };
    // caret slope, caret offset, min bearings, baselines, padding
    let _ = frame.get_bytes(9)?;
    Ok(metrics)
}

fn load_big_metrics(frame: &mut crate::stream::Frame) -> FontResult<SbitMetrics> {
    Ok(SbitMetrics {
        height: i32::from(frame.get_u8()?),
        width: i32::from(frame.get_u8()?),
        hori_bearing_x: i32::from(frame.get_i8()?),
        hori_bearing_y: i32::from(frame.get_i8()?),
        hori_advance: i32::from(frame.get_u8()?),
        vert_bearing_x: i32::from(frame.get_i8()?),
        vert_bearing_y: i32::from(frame.get_i8()?),
        vert_advance: i32::from(frame.get_u8()?),
    })
}

fn load_small_metrics(frame: &mut crate::stream::Frame) -> FontResult<SbitMetrics> {
    Ok(SbitMetrics {
        height: i32::from(frame.get_u8()?),
        width: i32::from(frame.get_u8()?),
        hori_bearing_x: i32::from(frame.get_i8()?),
        hori_bearing_y: i32::from(frame.get_i8()?),
        hori_advance: i32::from(frame.get_u8()?),
        vert_bearing_x: 0,
        vert_bearing_y: 0,
        vert_advance: 0,
    })
}

impl SbitTable {
    /// Loads the strikes table. `EBLC` versions other than `0x00020000`
    /// are treated as malformed.
    pub fn load(stream: &mut Stream, dir: &SfntDirectory) -> FontResult<Option<SbitTable>> {
        match dir.goto_table(stream, TAG_EBLC) {
            Ok(_) => {}
            Err(Error::TableMissing) => return Ok(None),
            Err(e) => return Err(e),
        }
        let table_base = stream.pos();
        let mut frame = stream.frame(8)?;
        let version = frame.get_u32()?;
        let num_strikes = frame.get_u32()?;
        drop(frame);
        if version != 0x0002_0000 || num_strikes >= 0x10000 {
            warn!("invalid EBLC version {:#x}", version);
            return Err(Error::InvalidTable);
        }

        let mut strikes = Vec::with_capacity(num_strikes as usize);
        let mut range_lists = Vec::with_capacity(num_strikes as usize);
        let mut frame = stream.frame(num_strikes as usize * 48)?;
        for _ in 0..num_strikes {
            let ranges_offset = frame.get_u32()?;
            let _index_tables_size = frame.get_u32()?;
            let num_ranges = frame.get_u32()?;
            let _color_ref = frame.get_u32()?;
            let hori = load_line_metrics(&mut frame)?;
            let vert = load_line_metrics(&mut frame)?;
            let strike = SbitStrike {
                hori,
                vert,
                start_glyph: frame.get_u16()?,
                end_glyph: frame.get_u16()?,
                x_ppem: frame.get_u8()?,
                y_ppem: frame.get_u8()?,
                bit_depth: frame.get_u8()?,
                flags: frame.get_i8()?,
                ranges: Vec::new(),
            };
            strikes.push(strike);
            range_lists.push((ranges_offset, num_ranges));
        }
        drop(frame);

        for (strike, (ranges_offset, num_ranges)) in strikes.iter_mut().zip(range_lists) {
            let list_base = table_base + u64::from(ranges_offset);
            stream.seek(list_base)?;
            let mut headers = Vec::with_capacity(num_ranges as usize);
            let mut frame = stream.frame(num_ranges as usize * 8)?;
            for _ in 0..num_ranges {
                let first_glyph = frame.get_u16()?;
                let last_glyph = frame.get_u16()?;
                let table_offset = frame.get_u32()?;
                headers.push((first_glyph, last_glyph, table_offset));
            }
            drop(frame);

            for (first_glyph, last_glyph, table_offset) in headers {
                stream.seek(list_base + u64::from(table_offset))?;
                let mut frame = stream.frame(8)?;
                let mut range = SbitRange {
                    first_glyph,
                    last_glyph,
                    index_format: frame.get_u16()?,
                    image_format: frame.get_u16()?,
                    image_offset: frame.get_u32()?,
                    image_size: 0,
                    metrics: SbitMetrics::default(),
                    glyph_offsets: Vec::new(),
                    glyph_codes: Vec::new(),
                };
                drop(frame);
                load_range_body(stream, &mut range)?;
                strike.ranges.push(range);
            }
        }

        Ok(Some(SbitTable { strikes }))
    }

    /// The strike exactly matching `(x_ppem, y_ppem)`, if any.
    pub fn find_strike(&self, x_ppem: u16, y_ppem: u16) -> Option<&SbitStrike> {
        self.strikes
            .iter()
            .find(|s| u16::from(s.x_ppem) == x_ppem && u16::from(s.y_ppem) == y_ppem)
    }
}

fn load_range_body(stream: &mut Stream, range: &mut SbitRange) -> FontResult<()> {
    match range.index_format {
        1 | 3 => {
            // Per-glyph explicit offsets, one extra entry for sizing.
            let num_glyphs = u32::from(range.last_glyph) - u32::from(range.first_glyph) + 2;
            let large = range.index_format == 1;
            let elem = if large { 4 } else { 2 };
            let mut frame = stream.frame(num_glyphs as usize * elem)?;
            for _ in 0..num_glyphs {
                let value = if large {
                    frame.get_u32()?
                } else {
                    u32::from(frame.get_u16()?)
                };
                range.glyph_offsets.push(range.image_offset + value);
            }
        }
        2 => {
            let mut frame = stream.frame(12)?;
            range.image_size = frame.get_u32()?;
            range.metrics = load_big_metrics(&mut frame)?;
        }
        4 => {
            let count = stream.read_u32()?;
            let mut frame = stream.frame(count as usize * 4)?;
            for _ in 0..count {
                range.glyph_codes.push(frame.get_u16()?);
                range
                    .glyph_offsets
                    .push(range.image_offset + u32::from(frame.get_u16()?));
            }
        }
        5 => {
            let mut frame = stream.frame(12)?;
            range.image_size = frame.get_u32()?;
            range.metrics = load_big_metrics(&mut frame)?;
            drop(frame);
            let count = stream.read_u32()?;
            let mut frame = stream.frame(count as usize * 2)?;
            for _ in 0..count {
                range.glyph_codes.push(frame.get_u16()?);
            }
        }
        _ => return Err(Error::InvalidTable),
    }
    Ok(())
}

/// Resolves a glyph's `EBDT` offset within a strike.
fn find_range<'a>(strike: &'a SbitStrike, glyph_index: u32) -> Option<(&'a SbitRange, u32)> {
    if glyph_index < u32::from(strike.start_glyph) || glyph_index > u32::from(strike.end_glyph) {
        return None;
    }
    for range in &strike.ranges {
        if glyph_index < u32::from(range.first_glyph) || glyph_index > u32::from(range.last_glyph)
        {
            continue;
        }
        let delta = (glyph_index - u32::from(range.first_glyph)) as usize;
        let offset = match range.index_format {
            1 | 3 => *range.glyph_offsets.get(delta)?,
            2 => range.image_offset + range.image_size * delta as u32,
            4 => {
                let n = range
                    .glyph_codes
                    .iter()
                    .position(|&code| u32::from(code) == glyph_index)?;
                *range.glyph_offsets.get(n)?
            }
            5 => {
                let n = range
                    .glyph_codes
                    .iter()
                    .position(|&code| u32::from(code) == glyph_index)?;
                range.image_offset + range.image_size * n as u32
            }
            _ => return None,
        };
        return Some((range, offset));
    }
    None
}

/// Loads the embedded bitmap for `(glyph_index, ppem)` into a fresh
/// bitmap, returning its metrics.
///
/// Fails with `InvalidArgument` when no sbit exists at that strike.
pub fn load_sbit_image(
    stream: &mut Stream,
    dir: &SfntDirectory,
    table: &SbitTable,
    glyph_index: u32,
    x_ppem: u16,
    y_ppem: u16,
) -> FontResult<(Bitmap, SbitMetrics)> {
    let strike = table
        .find_strike(x_ppem, y_ppem)
        .ok_or(Error::InvalidArgument)?;
    let (range, glyph_offset) = find_range(strike, glyph_index).ok_or(Error::InvalidArgument)?;

    dir.goto_table(stream, TAG_EBDT)?;
    let ebdt_pos = stream.pos();

    let mut map = Bitmap::default();
    let mut metrics = SbitMetrics::default();
    load_image_rec(
        stream, strike, range, ebdt_pos, glyph_offset, &mut map, 0, 0, &mut metrics, 0,
    )?;

    // A horizontal-only strike makes up its vertical metrics.
    if strike.flags & 1 != 0 {
        let advance = i32::from(strike.hori.ascender) - i32::from(strike.hori.descender);
        metrics.vert_bearing_x = -metrics.width / 2;
        metrics.vert_bearing_y = advance / 10;
        metrics.vert_advance = advance * 12 / 10;
    }

    crop_bitmap(&mut map, &mut metrics);
    Ok((map, metrics))
}

fn load_image_rec(
    stream: &mut Stream,
    strike: &SbitStrike,
    range: &SbitRange,
    ebdt_pos: u64,
    glyph_offset: u32,
    map: &mut Bitmap,
    x_offset: i32,
    y_offset: i32,
    metrics: &mut SbitMetrics,
    depth: u32,
) -> FontResult<()> {
    if depth > MAX_COMPOSITE_SBIT_DEPTH {
        return Err(Error::InvalidComposite);
    }
    stream.seek(ebdt_pos + u64::from(glyph_offset))?;

    // Metrics precede the image except for constant-metrics ranges.
    *metrics = match range.index_format {
        2 | 5 => range.metrics,
        _ => match range.image_format {
            1 | 2 | 8 => {
                let mut frame = stream.frame(5)?;
                let m = load_small_metrics(&mut frame)?;
                drop(frame);
                if range.image_format == 8 {
                    stream.skip(1)?; // pad
                }
                m
            }
            _ => {
                let mut frame = stream.frame(8)?;
                load_big_metrics(&mut frame)?
            }
        },
    };

    // The top-level call allocates the target pixmap.
    if map.pixel_mode.is_none() {
        let mode = PixelMode::from_bit_depth(strike.bit_depth)?;
        if metrics.width <= 0 || metrics.height <= 0 {
            // An empty image is not an error.
            return Ok(());
        }
        *map = Bitmap::new(metrics.width as u32, metrics.height as u32, mode);
    }

    match range.image_format {
        1 | 2 | 5 | 6 | 7 => load_single_image(
            stream,
            map,
            x_offset,
            y_offset,
            strike.bit_depth,
            range.image_format,
            metrics,
        ),
        8 | 9 => {
            let num_components = stream.read_u16()?;
            let mut components = Vec::with_capacity(num_components as usize);
            let mut frame = stream.frame(num_components as usize * 4)?;
            for _ in 0..num_components {
                let glyph_code = frame.get_u16()?;
                let dx = i32::from(frame.get_i8()?);
                let dy = i32::from(frame.get_i8()?);
                components.push((glyph_code, dx, dy));
            }
            drop(frame);

            for (glyph_code, dx, dy) in components {
                let (elem_range, elem_offset) = find_range(strike, u32::from(glyph_code))
                    .ok_or(Error::InvalidArgument)?;
                let mut elem_metrics = SbitMetrics::default();
                load_image_rec(
                    stream,
                    strike,
                    elem_range,
                    ebdt_pos,
                    elem_offset,
                    map,
                    x_offset + dx,
                    y_offset + dy,
                    &mut elem_metrics,
                    depth + 1,
                )?;
            }
            Ok(())
        }
        _ => Err(Error::InvalidFileFormat),
    }
}

fn load_single_image(
    stream: &mut Stream,
    map: &mut Bitmap,
    x_offset: i32,
    y_offset: i32,
    pix_bits: u8,
    image_format: u16,
    metrics: &SbitMetrics,
) -> FontResult<()> {
    // The source must land inside the target pixmap.
    if x_offset < 0
        || y_offset < 0
        || x_offset + metrics.width > map.width as i32
        || y_offset + metrics.height > map.rows as i32
    {
        return Err(Error::InvalidArgument);
    }

    let glyph_width = metrics.width;
    let glyph_height = metrics.height;
    let pix_bits = i32::from(pix_bits);
    let line_bits = glyph_width * pix_bits;

    let (glyph_size, byte_padded) = match image_format {
        1 | 6 => {
            let line_length = match pix_bits {
                1 => (glyph_width + 7) >> 3,
                2 => (glyph_width + 3) >> 2,
                4 => (glyph_width + 1) >> 1,
                _ => glyph_width,
            };
            (glyph_height * line_length, true)
        }
        2 | 5 | 7 => ((glyph_height * line_bits + 7) >> 3, false),
        _ => return Err(Error::InvalidFileFormat),
    };

    let mut frame = stream.frame(glyph_size.max(0) as usize)?;
    let source = frame.get_bytes(glyph_size.max(0) as usize)?;
    blit_sbit(
        map,
        source,
        line_bits,
        byte_padded,
        x_offset * pix_bits,
        y_offset,
        glyph_height,
    );
    Ok(())
}

/// Blits packed source rows into the target bitmap at a bit offset.
///
/// The offsets are relative to the top-left corner of the target; a
/// positive `y_offset` goes down.
fn blit_sbit(
    target: &mut Bitmap,
    source: &[u8],
    line_bits: i32,
    byte_padded: bool,
    x_offset: i32,
    y_offset: i32,
    source_height: i32,
) {
    let pitch = target.pitch;
    let mut line_start = (x_offset >> 3) as usize + y_offset as usize * pitch;

    // A 16-bit accumulator holds the last loaded bits at its top end.
    let mut acc: u16 = 0;
    let mut loaded: i32 = 0;
    let mut source = source.iter();

    for _ in 0..source_height {
        let mut cursor = line_start;
        let mut count = line_bits;
        let shift = (x_offset & 7) as u32;
        let space = 8 - shift;

        while count >= 8 {
            if loaded < 8 {
                let byte = source.next().copied().unwrap_or(0);
                acc |= u16::from(byte) << (8 - loaded);
                loaded += 8;
            }
            let val = (acc >> 8) as u8;
            if shift != 0 {
                if cursor < target.buffer.len() {
                    target.buffer[cursor] |= val >> shift;
                }
                if cursor + 1 < target.buffer.len() {
                    target.buffer[cursor + 1] |= val << (space % 8);
                }
            } else if cursor < target.buffer.len() {
                target.buffer[cursor] = val;
            }
            cursor += 1;
            acc <<= 8;
            loaded -= 8;
            count -= 8;
        }

        if count > 0 {
            if loaded < count {
                let byte = source.next().copied().unwrap_or(0);
                acc |= u16::from(byte) << (8 - loaded);
                loaded += 8;
            }
            let val = ((acc >> 8) as u8) & !(0xFFu8 >> count);
            if cursor < target.buffer.len() {
                target.buffer[cursor] |= val >> shift;
            }
            if count > space as i32 && cursor + 1 < target.buffer.len() {
                target.buffer[cursor + 1] |= val << (space % 8);
            }
            acc <<= count;
            loaded -= count;
        }

        if byte_padded {
            acc = 0;
            loaded = 0;
        }
        line_start += pitch;
    }
}

/// Trims empty rows and (for 1-bit images) empty columns, adjusting the
/// metrics so the bitmap tightly bounds the drawn pixels.
fn crop_bitmap(map: &mut Bitmap, metrics: &mut SbitMetrics) {
    if map.is_empty() {
        return;
    }

    // Empty top rows.
    let mut top = 0;
    while top < map.rows && map.row(top).iter().all(|&b| b == 0) {
        top += 1;
    }
    if top >= map.rows {
        map.clear();
        metrics.width = 0;
        metrics.height = 0;
        return;
    }
    if top > 0 {
        let pitch = map.pitch;
        map.buffer.drain(..top as usize * pitch);
        map.rows -= top;
        metrics.height -= top as i32;
        metrics.hori_bearing_y -= top as i32;
        metrics.vert_bearing_y -= top as i32;
    }

    // Empty bottom rows.
    let mut bottom = map.rows;
    while bottom > 0 && map.row(bottom - 1).iter().all(|&b| b == 0) {
        bottom -= 1;
    }
    if bottom < map.rows {
        let removed = map.rows - bottom;
        map.buffer.truncate(bottom as usize * map.pitch);
        map.rows = bottom;
        metrics.height -= removed as i32;
    }

    // Column cropping assumes the mono layout.
    if map.pixel_mode != Some(PixelMode::Mono) {
        return;
    }

    // Empty left columns: shift the whole image left one pixel at a time.
    while map.width > 0 {
        let occupied = (0..map.rows).any(|y| map.mono_pixel(0, y));
        if occupied {
            break;
        }
        for y in 0..map.rows {
            let row = map.row_mut(y);
            let mut carry = 0u8;
            for byte in row.iter_mut().rev() {
                let new_carry = (*byte & 0x80) >> 7;
                *byte = (*byte << 1) | carry;
                carry = new_carry;
            }
        }
        map.width -= 1;
        metrics.width -= 1;
        metrics.hori_bearing_x += 1;
        metrics.vert_bearing_x += 1;
    }

    // Empty right columns.
    while map.width > 0 {
        let right = map.width - 1;
        let occupied = (0..map.rows).any(|y| map.mono_pixel(right, y));
        if occupied {
            break;
        }
        map.width -= 1;
        metrics.width -= 1;
    }

    if map.width == 0 {
        map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blit_byte_aligned_row() {
        let mut map = Bitmap::new(8, 2, PixelMode::Mono);
        blit_sbit(&mut map, &[0b1010_0000, 0b0100_0000], 8, true, 0, 0, 2);
        assert_eq!(map.row(0)[0], 0b1010_0000);
        assert_eq!(map.row(1)[0], 0b0100_0000);
    }

    #[test]
    fn blit_with_bit_offset() {
        let mut map = Bitmap::new(12, 1, PixelMode::Mono);
        blit_sbit(&mut map, &[0b1100_0000], 4, true, 6, 0, 1);
        assert_eq!(map.row(0)[0], 0b0000_0011);
        assert_eq!(map.row(0)[1], 0);
    }

    #[test]
    fn crop_trims_rows_and_columns() {
        let mut map = Bitmap::new(8, 4, PixelMode::Mono);
        // One pixel at (2, 1) and one at (5, 2).
        map.row_mut(1)[0] = 0b0010_0000;
        map.row_mut(2)[0] = 0b0000_0100;
        let mut metrics = SbitMetrics {
            width: 8,
            height: 4,
            hori_bearing_x: 1,
            hori_bearing_y: 4,
            ..SbitMetrics::default()
        };
        crop_bitmap(&mut map, &mut metrics);
        assert_eq!(map.rows, 2);
        assert_eq!(map.width, 4);
        assert_eq!(metrics.height, 2);
        assert_eq!(metrics.width, 4);
        assert_eq!(metrics.hori_bearing_x, 3);
        assert_eq!(metrics.hori_bearing_y, 3);
        assert!(map.mono_pixel(0, 0));
        assert!(map.mono_pixel(3, 1));
    }

    #[test]
    fn crop_empties_blank_bitmap() {
        let mut map = Bitmap::new(4, 3, PixelMode::Mono);
        let mut metrics = SbitMetrics {
            width: 4,
            height: 3,
            ..SbitMetrics::default()
        };
        crop_bitmap(&mut map, &mut metrics);
        assert!(map.is_empty());
        assert_eq!(metrics.width, 0);
        assert_eq!(metrics.height, 0);
    }
}
