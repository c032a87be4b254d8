// glyphkit/src/truetype/glyph.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Loading of simple and composite `glyf` outlines.

use log::warn;

use crate::error::{Error, FontResult};
use crate::fixed::{mul_fix, round_pos, Fixed, Vector};
use crate::outline::PointTags;
use crate::sfnt::tables::{MaxProfile, MetricsTable};
use crate::stream::Stream;

use super::interp::{CodeRange, ExecContext, ExecMetrics, ExecState, Zone};

const ARGS_ARE_WORDS: u16 = 0x0001;
const ARGS_ARE_XY_VALUES: u16 = 0x0002;
const ROUND_XY_TO_GRID: u16 = 0x0004;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_XY_SCALE: u16 = 0x0040;
const WE_HAVE_A_2X2: u16 = 0x0080;
const WE_HAVE_INSTR: u16 = 0x0100;
const USE_MY_METRICS: u16 = 0x0200;

/// Everything the hinting pass needs besides the zone itself.
pub(super) struct HintEnv<'a> {
    pub state: &'a mut ExecState,
    pub fpgm: &'a [u8],
    pub prep: &'a [u8],
    pub metrics: ExecMetrics,
}

/// Per-element metrics threaded through composite assembly.
#[derive(Clone, Copy, Debug, Default)]
struct SubMetrics {
    left_bearing: i32,
    advance: u32,
    pp1: Vector,
    pp2: Vector,
    bbox_y_max: i32,
    preserved: bool,
}

/// The finished product of one glyph load.
pub(super) struct LoadedGlyph {
    pub zone: Zone,
    pub pp1: Vector,
    pub pp2: Vector,
    /// Design-space left side bearing and advance (after USE_MY_METRICS).
    pub left_bearing: i32,
    pub advance: u32,
    /// yMax of the top-level glyph header, font units.
    pub bbox_y_max: i32,
}

pub(super) struct GlyphLoader<'a> {
    pub stream: &'a mut Stream,
    pub glyf_start: u64,
    pub loca: &'a [u32],
    pub hmtx: &'a MetricsTable,
    pub fixed_pitch: bool,
    pub advance_max: u16,
    pub maxp: &'a MaxProfile,
    /// `None` for `NO_SCALE` loads.
    pub scale: Option<(Fixed, Fixed)>,
    pub hinted: bool,
    pub pedantic: bool,
    pub hint_env: Option<HintEnv<'a>>,
    left_points: i32,
    left_contours: i32,
}

impl<'a> GlyphLoader<'a> {
    pub fn new(
        stream: &'a mut Stream,
        glyf_start: u64,
        loca: &'a [u32],
        hmtx: &'a MetricsTable,
        fixed_pitch: bool,
        advance_max: u16,
        maxp: &'a MaxProfile,
        scale: Option<(Fixed, Fixed)>,
        hinted: bool,
        pedantic: bool,
        hint_env: Option<HintEnv<'a>>,
    ) -> GlyphLoader<'a> {
        let left_points =
            i32::from(maxp.max_points.max(maxp.max_composite_points)).max(64);
        let left_contours =
            i32::from(maxp.max_contours.max(maxp.max_composite_contours)).max(16);
        GlyphLoader {
            stream,
            glyf_start,
            loca,
            hmtx,
            fixed_pitch,
            advance_max,
            maxp,
            scale,
            hinted,
            pedantic,
            hint_env,
            left_points,
            left_contours,
        }
    }

    pub fn load(&mut self, glyph_index: u32) -> FontResult<LoadedGlyph> {
        let (zone, metrics) = self.load_element(glyph_index, 0, self.hinted)?;
        Ok(LoadedGlyph {
            zone,
            pp1: metrics.pp1,
            pp2: metrics.pp2,
            left_bearing: metrics.left_bearing,
            advance: metrics.advance,
            bbox_y_max: metrics.bbox_y_max,
        })
    }

    fn scale_x(&self, v: i32) -> i32 {
        match self.scale {
            Some((x, _)) => mul_fix(v, x),
            None => v,
        }
    }

    fn scale_y(&self, v: i32) -> i32 {
        match self.scale {
            Some((_, y)) => mul_fix(v, y),
            None => v,
        }
    }

    fn load_element(
        &mut self,
        glyph_index: u32,
        depth: u16,
        hinted: bool,
    ) -> FontResult<(Zone, SubMetrics)> {
        if depth > self.maxp.max_component_depth {
            return Err(Error::InvalidComposite);
        }
        let index = glyph_index as usize;
        if index + 1 >= self.loca.len() {
            return Err(Error::InvalidGlyphIndex);
        }

        let (lsb, mut advance) = self.hmtx.lookup(glyph_index);
        if self.fixed_pitch {
            advance = self.advance_max;
        }
        let mut metrics = SubMetrics {
            left_bearing: i32::from(lsb),
            advance: u32::from(advance),
            ..SubMetrics::default()
        };

        let offset = self.loca[index];
        let next = self.loca[index + 1];
        if next < offset {
            return Err(Error::InvalidTable);
        }
        let byte_count = (next - offset) as usize;

        if byte_count == 0 {
            // A zero-length entry is a blank glyph (a space), not the
            // missing glyph.
            metrics.pp1 = Vector::zero();
            metrics.pp2 = Vector::new(self.scale_x(i32::from(advance)), 0);
            return Ok((Zone::default(), metrics));
        }
        if byte_count < 10 {
            return Err(Error::InvalidTable);
        }

        self.stream.seek(self.glyf_start + u64::from(offset))?;
        let mut frame = self.stream.frame(10)?;
        let n_contours = frame.get_i16()?;
        let x_min = i32::from(frame.get_i16()?);
        let _y_min = frame.get_i16()?;
        let _x_max = frame.get_i16()?;
        let y_max = i32::from(frame.get_i16()?);
        drop(frame);

        metrics.bbox_y_max = y_max;
        let pp1_x = x_min - i32::from(lsb);
        let pp2_x = pp1_x + i32::from(advance);
        metrics.pp1 = Vector::new(self.scale_x(pp1_x), 0);
        metrics.pp2 = Vector::new(self.scale_x(pp2_x), 0);

        if n_contours >= 0 {
            let zone = self.load_simple(
                n_contours as usize,
                byte_count - 10,
                pp1_x,
                pp2_x,
                hinted,
                &mut metrics,
            )?;
            Ok((zone, metrics))
        } else {
            let zone = self.load_composite(depth, hinted, &mut metrics)?;
            Ok((zone, metrics))
        }
    }

    fn load_simple(
        &mut self,
        n_contours: usize,
        byte_count: usize,
        pp1_x: i32,
        pp2_x: i32,
        hinted: bool,
        metrics: &mut SubMetrics,
    ) -> FontResult<Zone> {
        if n_contours as i32 > self.left_contours {
            warn!("too many contours in glyph");
            return Err(Error::TooManyContours);
        }

        let mut frame = self.stream.frame(byte_count)?;

        let mut contours = Vec::with_capacity(n_contours);
        let mut last_end: i32 = -1;
        for _ in 0..n_contours {
            let end = i32::from(frame.get_u16()?);
            if end <= last_end {
                return Err(Error::InvalidTable);
            }
            last_end = end;
            contours.push(end as u16);
        }
        let n_points = if n_contours > 0 {
            last_end as usize + 1
        } else {
            0
        };
        if n_points as i32 > self.left_points {
            warn!("too many points in glyph");
            return Err(Error::TooManyPoints);
        }

        let n_ins = frame.get_u16()? as usize;
        if n_ins > self.maxp.max_size_of_instructions as usize {
            return Err(Error::InvalidTable);
        }
        let instructions = frame.get_bytes(n_ins)?.to_vec();

        // Flags, run-length encoded via the repeat bit.
        let mut flags = Vec::with_capacity(n_points);
        while flags.len() < n_points {
            let value = frame.get_u8()?;
            flags.push(value);
            if value & 0x08 != 0 {
                let repeat = frame.get_u8()?;
                for _ in 0..repeat {
                    if flags.len() >= n_points {
                        break;
                    }
                    flags.push(value);
                }
            }
        }

        // X coordinates: short/same bits per flag.
        let mut points = vec![Vector::zero(); n_points + 2];
        let mut x = 0i32;
        for (point, &flag) in points.iter_mut().zip(flags.iter()) {
            if flag & 0x02 != 0 {
                let delta = i32::from(frame.get_u8()?);
                x += if flag & 0x10 != 0 { delta } else { -delta };
            } else if flag & 0x10 == 0 {
                x += i32::from(frame.get_i16()?);
            }
            point.x = x;
        }
        // Y coordinates.
        let mut y = 0i32;
        for (point, &flag) in points.iter_mut().zip(flags.iter()) {
            if flag & 0x04 != 0 {
                let delta = i32::from(frame.get_u8()?);
                y += if flag & 0x20 != 0 { delta } else { -delta };
            } else if flag & 0x20 == 0 {
                y += i32::from(frame.get_i16()?);
            }
            point.y = y;
        }
        drop(frame);

        self.left_points -= n_points as i32;
        self.left_contours -= n_contours as i32;

        // The two phantom points, in font units like everything else.
        points[n_points] = Vector::new(pp1_x, 0);
        points[n_points + 1] = Vector::new(pp2_x, 0);

        let mut tags: Vec<PointTags> = flags
            .iter()
            .map(|&f| {
                if f & 0x01 != 0 {
                    PointTags::ON_CURVE
                } else {
                    PointTags::empty()
                }
            })
            .collect();
        tags.push(PointTags::empty());
        tags.push(PointTags::empty());

        let total = n_points + 2;
        let mut zone = Zone {
            org: points,
            cur: Vec::new(),
            tags,
            contours,
        };

        if let Some((x_scale, y_scale)) = self.scale {
            for point in &mut zone.org {
                point.x = mul_fix(point.x, x_scale);
                point.y = mul_fix(point.y, y_scale);
            }
            if hinted {
                // Round pp1 and shift the whole glyph with it, then round
                // pp2 on its own.
                let pp1 = zone.org[total - 2].x;
                let shift = round_pos(pp1) - pp1;
                for point in &mut zone.org {
                    point.x += shift;
                }
                zone.cur = zone.org.clone();
                zone.cur[total - 1].x = round_pos(zone.cur[total - 1].x);

                if !instructions.is_empty() {
                    self.run_instructions(&mut zone, &instructions, false)?;
                }
            } else {
                zone.cur = zone.org.clone();
            }
        } else {
            zone.cur = zone.org.clone();
        }

        // Save the element's phantom points and drop them from the zone.
        metrics.pp1 = zone.cur[total - 2];
        metrics.pp2 = zone.cur[total - 1];
        zone.org.truncate(total - 2);
        zone.cur.truncate(total - 2);
        zone.tags.truncate(total - 2);
        Ok(zone)
    }

    fn load_composite(
        &mut self,
        depth: u16,
        hinted: bool,
        metrics: &mut SubMetrics,
    ) -> FontResult<Zone> {
        let mut zone = Zone::default();
        let mut instructions: Option<Vec<u8>> = None;

        loop {
            let mut frame = self.stream.frame(4)?;
            let flags = frame.get_u16()?;
            let sub_index = u32::from(frame.get_u16()?);
            drop(frame);

            let arg_bytes = if flags & ARGS_ARE_WORDS != 0 { 4 } else { 2 };
            let xform_bytes = if flags & WE_HAVE_A_SCALE != 0 {
                2
            } else if flags & WE_HAVE_AN_XY_SCALE != 0 {
                4
            } else if flags & WE_HAVE_A_2X2 != 0 {
                8
            } else {
                0
            };
            let mut frame = self.stream.frame(arg_bytes + xform_bytes)?;
            let (arg1, arg2) = if flags & ARGS_ARE_WORDS != 0 {
                (i32::from(frame.get_i16()?), i32::from(frame.get_i16()?))
            } else {
                (i32::from(frame.get_i8()?), i32::from(frame.get_i8()?))
            };
            // 2.14 on the wire, widened to 16.16.
            let mut xx = 0x10000;
            let mut xy = 0;
            let mut yx = 0;
            let mut yy = 0x10000;
            let mut is_scaled = false;
            if flags & WE_HAVE_A_SCALE != 0 {
                xx = i32::from(frame.get_i16()?) << 2;
                yy = xx;
                is_scaled = true;
            } else if flags & WE_HAVE_AN_XY_SCALE != 0 {
                xx = i32::from(frame.get_i16()?) << 2;
                yy = i32::from(frame.get_i16()?) << 2;
                is_scaled = true;
            } else if flags & WE_HAVE_A_2X2 != 0 {
                xx = i32::from(frame.get_i16()?) << 2;
                xy = i32::from(frame.get_i16()?) << 2;
                yx = i32::from(frame.get_i16()?) << 2;
                yy = i32::from(frame.get_i16()?) << 2;
                is_scaled = true;
            }
            drop(frame);
            let after_element = self.stream.pos();

            // A non-unit transform disables hinting of the sub-element.
            let determinant = mul_fix(xx, yy) - mul_fix(xy, yx);
            let sub_hinted = hinted && determinant.abs() == 0x10000;

            let (mut child, child_metrics) =
                self.load_element(sub_index, depth + 1, sub_hinted)?;

            if is_scaled {
                for list in [&mut child.cur, &mut child.org].iter_mut() {
                    for point in list.iter_mut() {
                        let nx = mul_fix(point.x, xx) + mul_fix(point.y, yx);
                        let ny = mul_fix(point.x, xy) + mul_fix(point.y, yy);
                        *point = Vector::new(nx, ny);
                    }
                }
            }

            // Element offset: either a scaled (x, y) pair or an anchor
            // point match.
            let (dx, dy) = if flags & ARGS_ARE_XY_VALUES != 0 {
                let mut dx = self.scale_x(arg1);
                let mut dy = self.scale_y(arg2);
                if self.scale.is_some() && flags & ROUND_XY_TO_GRID != 0 {
                    dx = round_pos(dx);
                    dy = round_pos(dy);
                }
                (dx, dy)
            } else {
                let anchor = zone
                    .cur
                    .get(arg1.max(0) as usize)
                    .copied()
                    .ok_or(Error::InvalidComposite)?;
                let target = child
                    .cur
                    .get(arg2.max(0) as usize)
                    .copied()
                    .ok_or(Error::InvalidComposite)?;
                (anchor.x - target.x, anchor.y - target.y)
            };
            for point in &mut child.cur {
                point.x += dx;
                point.y += dy;
            }
            child.org = child.cur.clone();

            if flags & USE_MY_METRICS != 0 && !metrics.preserved {
                metrics.left_bearing = child_metrics.left_bearing;
                metrics.advance = child_metrics.advance;
                metrics.pp1 = child_metrics.pp1;
                metrics.pp2 = child_metrics.pp2;
                metrics.preserved = true;
            }

            // Merge into the composite zone.
            let base = zone.n_points() as u16;
            zone.org.extend_from_slice(&child.org);
            zone.cur.extend_from_slice(&child.cur);
            zone.tags.extend_from_slice(&child.tags);
            zone.contours
                .extend(child.contours.iter().map(|&end| end + base));

            self.stream.seek(after_element)?;
            if flags & MORE_COMPONENTS == 0 {
                if flags & WE_HAVE_INSTR != 0 && hinted {
                    let n_ins = self.stream.read_u16()? as usize;
                    if n_ins > self.maxp.max_size_of_instructions as usize {
                        return Err(Error::InvalidTable);
                    }
                    let mut code = vec![0; n_ins];
                    self.stream.read(&mut code)?;
                    instructions = Some(code);
                }
                break;
            }
        }

        // Composite phantom points, with the whole assembly re-run
        // through the glyph program when instructions are present.
        if hinted {
            let total = zone.n_points() + 2;
            zone.org.push(metrics.pp1);
            zone.org.push(metrics.pp2);
            zone.cur.push(Vector::new(round_pos(metrics.pp1.x), metrics.pp1.y));
            zone.cur.push(Vector::new(round_pos(metrics.pp2.x), metrics.pp2.y));
            zone.tags.push(PointTags::empty());
            zone.tags.push(PointTags::empty());
            for tag in &mut zone.tags {
                *tag &= PointTags::ON_CURVE;
            }
            // cur becomes the starting org for the composite program.
            zone.org = zone.cur.clone();

            if let Some(code) = instructions {
                if !code.is_empty() {
                    self.run_instructions(&mut zone, &code, true)?;
                }
            }

            metrics.pp1 = zone.cur[total - 2];
            metrics.pp2 = zone.cur[total - 1];
            zone.org.truncate(total - 2);
            zone.cur.truncate(total - 2);
            zone.tags.truncate(total - 2);
        }

        Ok(zone)
    }

    fn run_instructions(
        &mut self,
        zone: &mut Zone,
        code: &[u8],
        is_composite: bool,
    ) -> FontResult<()> {
        let env = match self.hint_env.as_mut() {
            Some(env) => env,
            None => return Ok(()),
        };
        let mut metrics = env.metrics;
        metrics.is_composite = is_composite;
        metrics.pedantic = self.pedantic;
        let mut exec = ExecContext::new(env.state, zone, env.fpgm, env.prep, code, metrics);
        exec.run(CodeRange::Glyph)
    }
}
