// glyphkit/src/sfnt/cmap.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Character-to-glyph maps.
//!
//! Only the per-subtable headers are parsed when the face opens; code
//! lookups decode the subtable bytes on demand.

use byteorder::{BigEndian, ByteOrder};
use log::warn;

use crate::error::{Error, FontResult};
use crate::face::{CharmapInfo, Encoding};
use crate::stream::Stream;

use super::directory::SfntDirectory;
use super::TAG_CMAP;

/// One cmap subtable: identity plus the offset of its body within the
/// table bytes.
#[derive(Clone, Copy, Debug)]
pub struct Subtable {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub format: u16,
    offset: usize,
}

impl Subtable {
    /// The abstract encoding this subtable speaks.
    pub fn encoding(&self) -> Encoding {
        match (self.platform_id, self.encoding_id) {
            (0, _) => Encoding::Unicode,
            (3, 1) | (3, 10) => Encoding::Unicode,
            (3, 0) => Encoding::Symbol,
            (1, 0) => Encoding::MacRoman,
            _ => Encoding::None,
        }
    }
}

/// The `cmap` table: raw bytes plus parsed subtable headers.
#[derive(Clone, Debug, Default)]
pub struct CharMaps {
    data: Vec<u8>,
    pub subtables: Vec<Subtable>,
}

impl CharMaps {
    /// Loads the table and its subtable headers.
    pub fn load(stream: &mut Stream, dir: &SfntDirectory) -> FontResult<CharMaps> {
        let data = dir.read_table(stream, TAG_CMAP)?;
        if data.len() < 4 {
            return Err(Error::InvalidTable);
        }
        let count = BigEndian::read_u16(&data[2..]);
        let mut subtables = Vec::with_capacity(count as usize);
        for n in 0..count as usize {
            let record = 4 + n * 8;
            if record + 8 > data.len() {
                return Err(Error::InvalidTable);
            }
            let platform_id = BigEndian::read_u16(&data[record..]);
            let encoding_id = BigEndian::read_u16(&data[record + 2..]);
            let offset = BigEndian::read_u32(&data[record + 4..]) as usize;
            if offset + 2 > data.len() {
                warn!("cmap subtable offset out of range");
                continue;
            }
            let format = BigEndian::read_u16(&data[offset..]);
            subtables.push(Subtable {
                platform_id,
                encoding_id,
                format,
                offset,
            });
        }
        Ok(CharMaps { data, subtables })
    }

    /// The public charmap descriptors, in table order.
    pub fn infos(&self) -> Vec<CharmapInfo> {
        self.subtables
            .iter()
            .map(|sub| CharmapInfo {
                platform_id: sub.platform_id,
                encoding_id: sub.encoding_id,
                encoding: sub.encoding(),
            })
            .collect()
    }

    fn body(&self, sub: &Subtable) -> &[u8] {
        &self.data[sub.offset..]
    }

    /// Maps a character code through subtable `index`; 0 when absent.
    pub fn char_index(&self, index: usize, code: u32) -> u32 {
        let sub = match self.subtables.get(index) {
            Some(sub) => sub,
            None => return 0,
        };
        let body = self.body(sub);
        match sub.format {
            0 => lookup_format0(body, code),
            4 => lookup_format4(body, code),
            6 => lookup_format6(body, code),
            12 => lookup_format12(body, code),
            _ => 0,
        }
    }

    /// The first charcode strictly above `code` with a nonzero glyph, in
    /// subtable `index`.
    pub fn next_char(&self, index: usize, code: u32) -> Option<(u32, u32)> {
        let sub = self.subtables.get(index)?;
        let body = self.body(sub);
        match sub.format {
            0 => next_format0(body, code),
            4 => next_format4(body, code),
            6 => next_format6(body, code),
            12 => next_format12(body, code),
            _ => None,
        }
    }
}

fn lookup_format0(body: &[u8], code: u32) -> u32 {
    if code > 0xFF || body.len() < 262 {
        return 0;
    }
    u32::from(body[6 + code as usize])
}

fn next_format0(body: &[u8], code: u32) -> Option<(u32, u32)> {
    let mut next = code + 1;
    while next <= 0xFF {
        let gid = lookup_format0(body, next);
        if gid != 0 {
            return Some((next, gid));
        }
        next += 1;
    }
    None
}

struct Format4<'a> {
    body: &'a [u8],
    seg_count: usize,
}

impl<'a> Format4<'a> {
    fn new(body: &'a [u8]) -> Option<Format4<'a>> {
        if body.len() < 16 {
            return None;
        }
        let seg_count_x2 = BigEndian::read_u16(&body[6..]) as usize;
        if seg_count_x2 == 0 || body.len() < 16 + seg_count_x2 * 4 {
            return None;
        }
        Some(Format4 {
            body,
            seg_count: seg_count_x2 / 2,
        })
    }

    fn end_code(&self, seg: usize) -> u32 {
        u32::from(BigEndian::read_u16(&self.body[14 + seg * 2..]))
    }

    fn start_code(&self, seg: usize) -> u32 {
        u32::from(BigEndian::read_u16(
            &self.body[16 + self.seg_count * 2 + seg * 2..],
        ))
    }

    fn id_delta(&self, seg: usize) -> i32 {
        i32::from(BigEndian::read_i16(
            &self.body[16 + self.seg_count * 4 + seg * 2..],
        ))
    }

    fn id_range_offset_pos(&self, seg: usize) -> usize {
        16 + self.seg_count * 6 + seg * 2
    }

    fn glyph(&self, seg: usize, code: u32) -> u32 {
        let offset_pos = self.id_range_offset_pos(seg);
        if offset_pos + 2 > self.body.len() {
            return 0;
        }
        let range_offset = BigEndian::read_u16(&self.body[offset_pos..]) as usize;
        let gid = if range_offset == 0 {
            (code as i32 + self.id_delta(seg)) as u32 & 0xFFFF
        } else {
            let index =
                offset_pos + range_offset + (code - self.start_code(seg)) as usize * 2;
            if index + 2 > self.body.len() {
                return 0;
            }
            let raw = u32::from(BigEndian::read_u16(&self.body[index..]));
            if raw == 0 {
                0
            } else {
                (raw as i32 + self.id_delta(seg)) as u32 & 0xFFFF
            }
        };
        gid
    }

    fn lookup(&self, code: u32) -> u32 {
        if code > 0xFFFF {
            return 0;
        }
        for seg in 0..self.seg_count {
            if code <= self.end_code(seg) {
                if code < self.start_code(seg) {
                    return 0;
                }
                return self.glyph(seg, code);
            }
        }
        0
    }

    fn next(&self, code: u32) -> Option<(u32, u32)> {
        let mut next = code + 1;
        while next <= 0xFFFF {
            // Find the segment covering or following `next`.
            let mut seg = None;
            for s in 0..self.seg_count {
                if next <= self.end_code(s) {
                    seg = Some(s);
                    break;
                }
            }
            let seg = seg?;
            let start = self.start_code(seg);
            if start == 0xFFFF && self.end_code(seg) == 0xFFFF {
                return None;
            }
            if next < start {
                next = start;
            }
            while next <= self.end_code(seg) {
                let gid = self.glyph(seg, next);
                if gid != 0 {
                    return Some((next, gid));
                }
                next += 1;
            }
        }
        None
    }
}

fn lookup_format4(body: &[u8], code: u32) -> u32 {
    Format4::new(body).map_or(0, |table| table.lookup(code))
}

fn next_format4(body: &[u8], code: u32) -> Option<(u32, u32)> {
    Format4::new(body)?.next(code)
}

fn lookup_format6(body: &[u8], code: u32) -> u32 {
    if body.len() < 10 {
        return 0;
    }
    let first = u32::from(BigEndian::read_u16(&body[6..]));
    let count = u32::from(BigEndian::read_u16(&body[8..]));
    if code < first || code >= first + count {
        return 0;
    }
    let index = 10 + (code - first) as usize * 2;
    if index + 2 > body.len() {
        return 0;
    }
    u32::from(BigEndian::read_u16(&body[index..]))
}

fn next_format6(body: &[u8], code: u32) -> Option<(u32, u32)> {
    if body.len() < 10 {
        return None;
    }
    let first = u32::from(BigEndian::read_u16(&body[6..]));
    let count = u32::from(BigEndian::read_u16(&body[8..]));
    let mut next = (code + 1).max(first);
    while next < first + count {
        let gid = lookup_format6(body, next);
        if gid != 0 {
            return Some((next, gid));
        }
        next += 1;
    }
    None
}

struct Format12<'a> {
    body: &'a [u8],
    groups: usize,
}

impl<'a> Format12<'a> {
    fn new(body: &'a [u8]) -> Option<Format12<'a>> {
        if body.len() < 16 {
            return None;
        }
        let groups = BigEndian::read_u32(&body[12..]) as usize;
        if body.len() < 16 + groups * 12 {
            return None;
        }
        Some(Format12 { body, groups })
    }

    fn group(&self, n: usize) -> (u32, u32, u32) {
        let at = 16 + n * 12;
        (
            BigEndian::read_u32(&self.body[at..]),
            BigEndian::read_u32(&self.body[at + 4..]),
            BigEndian::read_u32(&self.body[at + 8..]),
        )
    }
}

fn lookup_format12(body: &[u8], code: u32) -> u32 {
    let table = match Format12::new(body) {
        Some(table) => table,
        None => return 0,
    };
    for n in 0..table.groups {
        let (start, end, start_gid) = table.group(n);
        if code >= start && code <= end {
            return start_gid + (code - start);
        }
        if code < start {
            break;
        }
    }
    0
}

fn next_format12(body: &[u8], code: u32) -> Option<(u32, u32)> {
    let table = Format12::new(body)?;
    let next = code.checked_add(1)?;
    for n in 0..table.groups {
        let (start, end, start_gid) = table.group(n);
        if next <= end {
            let candidate = next.max(start);
            return Some((candidate, start_gid + (candidate - start)));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::build_cmap_format4;

    #[test]
    fn format0_lookup_and_iteration() {
        let mut body = vec![0u8; 262];
        body[1] = 0; // format 0
        body[65 + 6] = 9; // 'A' -> glyph 9
        assert_eq!(lookup_format0(&body, 65), 9);
        assert_eq!(lookup_format0(&body, 66), 0);
        assert_eq!(next_format0(&body, 0), Some((65, 9)));
        assert_eq!(next_format0(&body, 65), None);
    }

    #[test]
    fn format4_segments() {
        // 'A'..'C' -> 1..3, 'a'..'b' -> 10..11
        let body = build_cmap_format4(&[(65, 67, 1), (97, 98, 10)]);
        assert_eq!(lookup_format4(&body, 65), 1);
        assert_eq!(lookup_format4(&body, 67), 3);
        assert_eq!(lookup_format4(&body, 68), 0);
        assert_eq!(lookup_format4(&body, 97), 10);
        assert_eq!(next_format4(&body, 67), Some((97, 10)));
        assert_eq!(next_format4(&body, 98), None);
    }

    #[test]
    fn format6_dense_range() {
        let mut body = vec![0u8; 10 + 4];
        body[1] = 6;
        body[7] = 32; // first
        body[9] = 2; // count
        body[11] = 5; // glyph for 32
        body[13] = 0; // glyph for 33 absent
        assert_eq!(lookup_format6(&body, 32), 5);
        assert_eq!(lookup_format6(&body, 33), 0);
        assert_eq!(lookup_format6(&body, 34), 0);
        assert_eq!(next_format6(&body, 0), Some((32, 5)));
        assert_eq!(next_format6(&body, 32), None);
    }
}
