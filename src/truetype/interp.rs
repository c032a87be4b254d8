// glyphkit/src/truetype/interp.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The TrueType bytecode interpreter.
//!
//! Three code ranges run against the same machine: the font program (once
//! per size), the cvt program (at every size change), and each glyph's
//! program. The machine state is a value stack, a storage area, a scaled
//! CVT, function definitions, two point zones (twilight and glyph), and
//! the graphics state.

use log::warn;

use crate::error::{Error, FontResult};
use crate::fixed::{mul_div, mul_fix, Fixed, Pos, Vector};
use crate::outline::PointTags;

/// Hard budget against runaway programs.
const MAX_INSTRUCTIONS: u32 = 1_000_000;

/// Identifies one of the three code ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeRange {
    Font,
    Cvt,
    Glyph,
}

/// A zone of points the interpreter can address.
#[derive(Clone, Default, Debug)]
pub struct Zone {
    /// Scaled, unhinted positions.
    pub org: Vec<Vector>,
    /// Working (hinted) positions.
    pub cur: Vec<Vector>,
    pub tags: Vec<PointTags>,
    pub contours: Vec<u16>,
}

impl Zone {
    pub fn with_capacity(points: usize) -> Zone {
        Zone {
            org: vec![Vector::zero(); points],
            cur: vec![Vector::zero(); points],
            tags: vec![PointTags::empty(); points],
            contours: Vec::new(),
        }
    }

    #[inline]
    pub fn n_points(&self) -> usize {
        self.cur.len()
    }
}

/// A 2.14 unit vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitVector {
    pub x: i32,
    pub y: i32,
}

pub const AXIS_X: UnitVector = UnitVector { x: 0x4000, y: 0 };
pub const AXIS_Y: UnitVector = UnitVector { x: 0, y: 0x4000 };

/// Rounding engine state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundState {
    ToGrid,
    ToHalfGrid,
    ToDoubleGrid,
    DownToGrid,
    UpToGrid,
    Off,
    /// period, phase, threshold (26.6)
    Super(Pos, Pos, Pos),
}

/// The graphics state of the interpreter.
#[derive(Clone, Copy, Debug)]
pub struct GraphicsState {
    pub rp0: usize,
    pub rp1: usize,
    pub rp2: usize,
    pub projection: UnitVector,
    pub freedom: UnitVector,
    pub dual: UnitVector,
    pub round_state: RoundState,
    pub min_distance: Pos,
    pub control_value_cutin: Pos,
    pub single_width_cutin: Pos,
    pub single_width_value: Pos,
    pub delta_base: u32,
    pub delta_shift: u32,
    pub auto_flip: bool,
    pub loop_count: u32,
    pub gep0: u32,
    pub gep1: u32,
    pub gep2: u32,
    pub scan_control: bool,
    pub scan_type: i32,
    /// Bit 0 inhibits glyph-program grid fitting; bit 1 forces the
    /// default graphics state. Only the cvt program may set it.
    pub instruct_control: u8,
}

impl Default for GraphicsState {
    fn default() -> GraphicsState {
        GraphicsState {
            rp0: 0,
            rp1: 0,
            rp2: 0,
            projection: AXIS_X,
            freedom: AXIS_X,
            dual: AXIS_X,
            round_state: RoundState::ToGrid,
            min_distance: 64,
            control_value_cutin: 68,
            single_width_cutin: 0,
            single_width_value: 0,
            delta_base: 9,
            delta_shift: 3,
            auto_flip: true,
            loop_count: 1,
            gep0: 1,
            gep1: 1,
            gep2: 1,
            scan_control: false,
            scan_type: 0,
            instruct_control: 0,
        }
    }
}

impl GraphicsState {
    /// Resets the per-glyph fields to their defaults while keeping the
    /// values a cvt program is allowed to carry over.
    pub fn reset_for_glyph(&mut self) {
        self.rp0 = 0;
        self.rp1 = 0;
        self.rp2 = 0;
        self.projection = AXIS_X;
        self.freedom = AXIS_X;
        self.dual = AXIS_X;
        self.loop_count = 1;
        self.gep0 = 1;
        self.gep1 = 1;
        self.gep2 = 1;
    }
}

/// A function or instruction definition recorded by `FDEF`/`IDEF`.
#[derive(Clone, Copy, Debug)]
pub struct Definition {
    pub range: CodeRange,
    pub start: usize,
    pub end: usize,
    pub opcode: u8,
    pub active: bool,
}

/// Everything the interpreter persists between runs, owned by the size
/// object.
#[derive(Clone, Debug, Default)]
pub struct ExecState {
    pub storage: Vec<i32>,
    /// Scaled control values, 26.6.
    pub cvt: Vec<Pos>,
    pub functions: Vec<Option<Definition>>,
    pub instruction_defs: Vec<Definition>,
    pub twilight: Zone,
    pub graphics_state: GraphicsState,
}

/// Per-run limits and scale factors.
#[derive(Clone, Copy, Debug)]
pub struct ExecMetrics {
    pub x_ppem: u16,
    pub y_ppem: u16,
    pub x_scale: Fixed,
    pub y_scale: Fixed,
    pub max_stack: usize,
    pub pedantic: bool,
    pub is_composite: bool,
}

struct CallRecord {
    caller_range: CodeRange,
    caller_ip: usize,
    definition: Definition,
    remaining: u32,
}

/// One interpreter activation.
pub struct ExecContext<'a> {
    state: &'a mut ExecState,
    glyph: &'a mut Zone,
    font_code: &'a [u8],
    cvt_code: &'a [u8],
    glyph_code: &'a [u8],
    metrics: ExecMetrics,
    gs: GraphicsState,
    stack: Vec<i32>,
    call_stack: Vec<CallRecord>,
    range: CodeRange,
    ip: usize,
    executed: u32,
    /// dot(freedom, projection), 2.14.
    f_dot_p: i32,
}

impl<'a> ExecContext<'a> {
    pub fn new(
        state: &'a mut ExecState,
        glyph: &'a mut Zone,
        font_code: &'a [u8],
        cvt_code: &'a [u8],
        glyph_code: &'a [u8],
        metrics: ExecMetrics,
    ) -> ExecContext<'a> {
        let gs = state.graphics_state;
        ExecContext {
            state,
            glyph,
            font_code,
            cvt_code,
            glyph_code,
            metrics,
            gs,
            stack: Vec::new(),
            call_stack: Vec::new(),
            range: CodeRange::Glyph,
            ip: 0,
            executed: 0,
            f_dot_p: 0x4000,
        }
    }

    /// Runs one code range to completion. In lenient mode a bytecode
    /// error stops execution and is swallowed; in pedantic mode it is
    /// returned.
    pub fn run(&mut self, range: CodeRange) -> FontResult<()> {
        self.range = range;
        self.ip = 0;
        if range == CodeRange::Glyph {
            self.gs.reset_for_glyph();
        }
        self.recompute_f_dot_p();
        let result = self.execute();
        if range != CodeRange::Glyph || self.metrics.pedantic {
            // The font and cvt programs define the machine; their errors
            // always surface.
            if range == CodeRange::Glyph {
                self.state.graphics_state.instruct_control = self.gs.instruct_control;
                return result;
            }
            self.save_state_after_prep(range);
            return result;
        }
        if let Err(error) = result {
            warn!("glyph program stopped: {}", error);
        }
        Ok(())
    }

    fn save_state_after_prep(&mut self, range: CodeRange) {
        // The cvt program's graphics state becomes the per-size default,
        // with the per-glyph fields normalized.
        let mut gs = self.gs;
        gs.reset_for_glyph();
        if range == CodeRange::Cvt {
            self.state.graphics_state = gs;
        } else {
            // The font program may only define functions; keep defaults
            // but carry instruction-control just in case.
            let mut default = GraphicsState::default();
            default.instruct_control = gs.instruct_control;
            self.state.graphics_state = default;
        }
    }

    fn code(&self, range: CodeRange) -> &[u8] {
        match range {
            CodeRange::Font => self.font_code,
            CodeRange::Cvt => self.cvt_code,
            CodeRange::Glyph => self.glyph_code,
        }
    }

    // ------------------------------------------------------------------
    // Stack
    // ------------------------------------------------------------------

    fn push(&mut self, value: i32) -> FontResult<()> {
        if self.stack.len() >= self.metrics.max_stack {
            return Err(Error::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> FontResult<i32> {
        self.stack.pop().ok_or(Error::StackUnderflow)
    }

    // ------------------------------------------------------------------
    // Projection helpers
    // ------------------------------------------------------------------

    fn recompute_f_dot_p(&mut self) {
        let dot = dot14(
            self.gs.freedom.x,
            self.gs.freedom.y,
            self.gs.projection.x,
            self.gs.projection.y,
        );
        // Degenerate freedom/projection combinations behave as unity.
        self.f_dot_p = if dot.abs() < 0x400 { 0x4000 } else { dot };
    }

    fn project(&self, d: Vector) -> Pos {
        dot_project(d, self.gs.projection)
    }

    fn dual_project(&self, d: Vector) -> Pos {
        dot_project(d, self.gs.dual)
    }

    fn move_point(&mut self, zone_is_twilight: bool, point: usize, distance: Pos) -> FontResult<()> {
        let freedom = self.gs.freedom;
        let f_dot_p = self.f_dot_p;
        let zone = if zone_is_twilight {
            &mut self.state.twilight
        } else {
            &mut *self.glyph
        };
        if point >= zone.n_points() {
            return Err(Error::InvalidReferencePoint);
        }
        if freedom.x != 0 {
            zone.cur[point].x += mul_div(distance, freedom.x, f_dot_p);
            zone.tags[point] |= PointTags::TOUCHED_X;
        }
        if freedom.y != 0 {
            zone.cur[point].y += mul_div(distance, freedom.y, f_dot_p);
            zone.tags[point] |= PointTags::TOUCHED_Y;
        }
        Ok(())
    }

    fn zone_is_twilight(&self, gep: u32) -> FontResult<bool> {
        match gep {
            0 => Ok(true),
            1 => Ok(false),
            _ => Err(Error::InvalidCodeRange),
        }
    }

    fn zone(&self, twilight: bool) -> &Zone {
        if twilight {
            &self.state.twilight
        } else {
            &*self.glyph
        }
    }

    fn zone_mut(&mut self, twilight: bool) -> &mut Zone {
        if twilight {
            &mut self.state.twilight
        } else {
            &mut *self.glyph
        }
    }

    fn point_cur(&self, twilight: bool, point: usize) -> FontResult<Vector> {
        let zone = self.zone(twilight);
        zone.cur
            .get(point)
            .copied()
            .ok_or(Error::InvalidReferencePoint)
    }

    fn point_org(&self, twilight: bool, point: usize) -> FontResult<Vector> {
        let zone = self.zone(twilight);
        zone.org
            .get(point)
            .copied()
            .ok_or(Error::InvalidReferencePoint)
    }

    // ------------------------------------------------------------------
    // Rounding
    // ------------------------------------------------------------------

    fn round(&self, distance: Pos) -> Pos {
        round_with(self.gs.round_state, distance)
    }

    fn current_ppem(&self) -> i32 {
        // The ppem along the projection axis.
        if self.gs.projection.x.abs() >= self.gs.projection.y.abs() {
            i32::from(self.metrics.x_ppem)
        } else {
            i32::from(self.metrics.y_ppem)
        }
    }

    // ------------------------------------------------------------------
    // CVT and storage
    // ------------------------------------------------------------------

    fn read_cvt(&self, index: i32) -> FontResult<Pos> {
        self.state
            .cvt
            .get(index.max(0) as usize)
            .copied()
            .ok_or(Error::InvalidCvtIndex)
    }

    fn write_cvt(&mut self, index: i32, value: Pos) -> FontResult<()> {
        let slot = self
            .state
            .cvt
            .get_mut(index.max(0) as usize)
            .ok_or(Error::InvalidCvtIndex)?;
        *slot = value;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Code scanning
    // ------------------------------------------------------------------

    fn instruction_length(code: &[u8], ip: usize) -> usize {
        match code[ip] {
            0x40 => {
                // NPUSHB
                if ip + 1 < code.len() {
                    2 + code[ip + 1] as usize
                } else {
                    1
                }
            }
            0x41 => {
                if ip + 1 < code.len() {
                    2 + 2 * code[ip + 1] as usize
                } else {
                    1
                }
            }
            op @ 0xB0..=0xB7 => 1 + (op - 0xB0) as usize + 1,
            op @ 0xB8..=0xBF => 1 + 2 * ((op - 0xB8) as usize + 1),
            _ => 1,
        }
    }

    /// Skips forward from the current ip to the matching ELSE/EIF.
    fn skip_conditional(&mut self, stop_at_else: bool) -> FontResult<()> {
        let code = self.code(self.range);
        let mut depth = 0u32;
        let mut ip = self.ip;
        while ip < code.len() {
            match code[ip] {
                0x58 => depth += 1, // IF
                0x1B if depth == 0 && stop_at_else => {
                    // ELSE at our level
                    self.ip = ip + 1;
                    return Ok(());
                }
                0x59 => {
                    // EIF
                    if depth == 0 {
                        self.ip = ip + 1;
                        return Ok(());
                    }
                    depth -= 1;
                }
                _ => {}
            }
            ip += Self::instruction_length(code, ip);
        }
        Err(Error::InvalidCodeRange)
    }

    /// Scans a FDEF/IDEF body, returning the span of its contents.
    fn scan_definition(&mut self) -> FontResult<(usize, usize)> {
        let code = self.code(self.range);
        let start = self.ip;
        let mut ip = self.ip;
        while ip < code.len() {
            if code[ip] == 0x2D {
                // ENDF
                self.ip = ip + 1;
                return Ok((start, ip));
            }
            if code[ip] == 0x2C || code[ip] == 0x89 {
                // nested FDEF/IDEF is malformed
                return Err(Error::InvalidOpcode);
            }
            ip += Self::instruction_length(code, ip);
        }
        Err(Error::InvalidCodeRange)
    }

    // ------------------------------------------------------------------
    // The main loop
    // ------------------------------------------------------------------

    fn execute(&mut self) -> FontResult<()> {
        loop {
            let code = self.code(self.range);
            if self.ip >= code.len() {
                // Fell off the end: pop a call frame or finish.
                if let Some(frame) = self.call_stack.pop() {
                    // Function bodies must exit via ENDF.
                    let _ = frame;
                    return Err(Error::InvalidCodeRange);
                }
                return Ok(());
            }
            self.executed += 1;
            if self.executed > MAX_INSTRUCTIONS {
                return Err(Error::InvalidOpcode);
            }
            let code = self.code(self.range);
            let opcode = code[self.ip];
            self.ip += 1;
            self.dispatch(opcode)?;
        }
    }

    fn dispatch(&mut self, opcode: u8) -> FontResult<()> {
        match opcode {
            // ---- vectors ------------------------------------------------
            0x00 | 0x01 => {
                let axis = if opcode & 1 != 0 { AXIS_X } else { AXIS_Y };
                self.gs.projection = axis;
                self.gs.freedom = axis;
                self.gs.dual = axis;
                self.recompute_f_dot_p();
            }
            0x02 | 0x03 => {
                let axis = if opcode & 1 != 0 { AXIS_X } else { AXIS_Y };
                self.gs.projection = axis;
                self.gs.dual = axis;
                self.recompute_f_dot_p();
            }
            0x04 | 0x05 => {
                self.gs.freedom = if opcode & 1 != 0 { AXIS_X } else { AXIS_Y };
                self.recompute_f_dot_p();
            }
            0x06 | 0x07 | 0x08 | 0x09 => {
                // SPVTL / SFVTL: the line from zp2's point (top of
                // stack) to zp1's point.
                let p2 = self.pop()? as usize;
                let p1 = self.pop()? as usize;
                let zp1 = self.zone_is_twilight(self.gs.gep1)?;
                let zp2 = self.zone_is_twilight(self.gs.gep2)?;
                let a = self.point_cur(zp1, p1)?;
                let b = self.point_cur(zp2, p2)?;
                let mut dx = a.x - b.x;
                let mut dy = a.y - b.y;
                if dx == 0 && dy == 0 {
                    dx = 0x4000;
                } else if opcode & 1 != 0 {
                    // perpendicular: rotate 90° counter-clockwise
                    let tmp = dy;
                    dy = dx;
                    dx = -tmp;
                }
                let unit = normalize_to_unit(dx, dy);
                if opcode <= 0x07 {
                    self.gs.projection = unit;
                    self.gs.dual = unit;
                } else {
                    self.gs.freedom = unit;
                }
                self.recompute_f_dot_p();
            }
            0x0A => {
                // SPVFS
                let y = self.pop()?;
                let x = self.pop()?;
                let unit = normalize_to_unit(x, y);
                self.gs.projection = unit;
                self.gs.dual = unit;
                self.recompute_f_dot_p();
            }
            0x0B => {
                let y = self.pop()?;
                let x = self.pop()?;
                self.gs.freedom = normalize_to_unit(x, y);
                self.recompute_f_dot_p();
            }
            0x0C => {
                let projection = self.gs.projection;
                self.push(projection.x)?;
                self.push(projection.y)?;
            }
            0x0D => {
                let freedom = self.gs.freedom;
                self.push(freedom.x)?;
                self.push(freedom.y)?;
            }
            0x0E => {
                self.gs.freedom = self.gs.projection;
                self.recompute_f_dot_p();
            }
            0x0F => self.op_isect()?,

            // ---- reference points and zones -----------------------------
            0x10 => self.gs.rp0 = self.pop()? as usize,
            0x11 => self.gs.rp1 = self.pop()? as usize,
            0x12 => self.gs.rp2 = self.pop()? as usize,
            0x13 => {
                let v = self.pop()? as u32;
                self.zone_is_twilight(v)?;
                self.gs.gep0 = v;
            }
            0x14 => {
                let v = self.pop()? as u32;
                self.zone_is_twilight(v)?;
                self.gs.gep1 = v;
            }
            0x15 => {
                let v = self.pop()? as u32;
                self.zone_is_twilight(v)?;
                self.gs.gep2 = v;
            }
            0x16 => {
                let v = self.pop()? as u32;
                self.zone_is_twilight(v)?;
                self.gs.gep0 = v;
                self.gs.gep1 = v;
                self.gs.gep2 = v;
            }
            0x17 => {
                let v = self.pop()?;
                self.gs.loop_count = if v < 0 { 0 } else { v as u32 };
            }

            // ---- rounding -----------------------------------------------
            0x18 => self.gs.round_state = RoundState::ToGrid,
            0x19 => self.gs.round_state = RoundState::ToHalfGrid,
            0x3D => self.gs.round_state = RoundState::ToDoubleGrid,
            0x7C => self.gs.round_state = RoundState::UpToGrid,
            0x7D => self.gs.round_state = RoundState::DownToGrid,
            0x7A => self.gs.round_state = RoundState::Off,
            0x76 => {
                let selector = self.pop()?;
                self.gs.round_state = super_round_state(selector, 64);
            }
            0x77 => {
                let selector = self.pop()?;
                // 45-degree period: sqrt(2)/2 pixels.
                self.gs.round_state = super_round_state(selector, 45);
            }

            // ---- control flow -------------------------------------------
            0x1B => {
                // ELSE reached at runtime: the IF body was executed; skip
                // to EIF.
                self.skip_conditional(false)?;
            }
            0x1C => {
                // JMPR
                let offset = self.pop()?;
                self.jump(offset)?;
            }
            0x58 => {
                let condition = self.pop()?;
                if condition == 0 {
                    self.skip_conditional(true)?;
                }
            }
            0x59 => {} // EIF in straight-line execution
            0x78 => {
                // JROT
                let condition = self.pop()?;
                let offset = self.pop()?;
                if condition != 0 {
                    self.jump(offset)?;
                }
            }
            0x79 => {
                let condition = self.pop()?;
                let offset = self.pop()?;
                if condition == 0 {
                    self.jump(offset)?;
                }
            }

            // ---- distances and widths -----------------------------------
            0x1A => self.gs.min_distance = self.pop()?,
            0x1D => self.gs.control_value_cutin = self.pop()?,
            0x1E => self.gs.single_width_cutin = self.pop()?,
            0x1F => {
                let value = self.pop()?;
                // SSW takes font units.
                self.gs.single_width_value = mul_fix(value, self.metrics.x_scale);
            }

            // ---- stack management ---------------------------------------
            0x20 => {
                let top = self.pop()?;
                self.push(top)?;
                self.push(top)?;
            }
            0x21 => {
                self.pop()?;
            }
            0x22 => self.stack.clear(),
            0x23 => {
                let a = self.pop()?;
                let b = self.pop()?;
                self.push(a)?;
                self.push(b)?;
            }
            0x24 => {
                let depth = self.stack.len() as i32;
                self.push(depth)?;
            }
            0x25 => {
                // CINDEX
                let index = self.pop()?;
                let value = self.peek_index(index)?;
                self.push(value)?;
            }
            0x26 => {
                // MINDEX
                let index = self.pop()?;
                if index <= 0 || index as usize > self.stack.len() {
                    return Err(Error::StackUnderflow);
                }
                let at = self.stack.len() - index as usize;
                let value = self.stack.remove(at);
                self.push(value)?;
            }
            0x8A => {
                // ROLL
                let a = self.pop()?;
                let b = self.pop()?;
                let c = self.pop()?;
                self.push(b)?;
                self.push(a)?;
                self.push(c)?;
            }

            // ---- definitions and calls ----------------------------------
            0x2A => {
                // LOOPCALL
                let function = self.pop()?;
                let count = self.pop()?;
                if count > 0 {
                    self.enter_function(function, count as u32)?;
                }
            }
            0x2B => {
                let function = self.pop()?;
                self.enter_function(function, 1)?;
            }
            0x2C => self.op_fdef()?,
            0x2D => self.op_endf()?,
            0x89 => self.op_idef()?,

            // ---- point movement -----------------------------------------
            0x2E | 0x2F => self.op_mdap(opcode & 1 != 0)?,
            0x30 | 0x31 => self.op_iup(opcode & 1 != 0)?,
            0x32 | 0x33 => self.op_shp(opcode & 1 != 0)?,
            0x34 | 0x35 => self.op_shc(opcode & 1 != 0)?,
            0x36 | 0x37 => self.op_shz(opcode & 1 != 0)?,
            0x38 => self.op_shpix()?,
            0x39 => self.op_ip()?,
            0x3A | 0x3B => self.op_msirp(opcode & 1 != 0)?,
            0x3C => self.op_alignrp()?,
            0x3E | 0x3F => self.op_miap(opcode & 1 != 0)?,
            0x46 | 0x47 => self.op_gc(opcode & 1 != 0)?,
            0x48 => self.op_scfs()?,
            0x49 | 0x4A => self.op_md(opcode == 0x4A)?,
            0x27 => self.op_alignpts()?,
            0x29 => self.op_utp()?,
            0x80 => self.op_flippt()?,
            0x81 | 0x82 => self.op_fliprange(opcode == 0x81)?,
            0xC0..=0xDF => self.op_mdrp(opcode - 0xC0)?,
            0xE0..=0xFF => self.op_mirp(opcode - 0xE0)?,

            // ---- pushing data -------------------------------------------
            0x40 => {
                let count = self.fetch_byte()? as usize;
                for _ in 0..count {
                    let byte = self.fetch_byte()?;
                    self.push(i32::from(byte))?;
                }
            }
            0x41 => {
                let count = self.fetch_byte()? as usize;
                for _ in 0..count {
                    let word = self.fetch_word()?;
                    self.push(i32::from(word))?;
                }
            }
            0xB0..=0xB7 => {
                let count = (opcode - 0xB0) as usize + 1;
                for _ in 0..count {
                    let byte = self.fetch_byte()?;
                    self.push(i32::from(byte))?;
                }
            }
            0xB8..=0xBF => {
                let count = (opcode - 0xB8) as usize + 1;
                for _ in 0..count {
                    let word = self.fetch_word()?;
                    self.push(i32::from(word))?;
                }
            }

            // ---- storage and cvt ----------------------------------------
            0x42 => {
                let value = self.pop()?;
                let index = self.pop()?;
                match self.state.storage.get_mut(index.max(0) as usize) {
                    Some(slot) => *slot = value,
                    None => return Err(Error::InvalidCvtIndex),
                }
            }
            0x43 => {
                let index = self.pop()?;
                let value = self
                    .state
                    .storage
                    .get(index.max(0) as usize)
                    .copied()
                    .ok_or(Error::InvalidCvtIndex)?;
                self.push(value)?;
            }
            0x44 => {
                let value = self.pop()?;
                let index = self.pop()?;
                self.write_cvt(index, value)?;
            }
            0x45 => {
                let index = self.pop()?;
                let value = self.read_cvt(index)?;
                self.push(value)?;
            }
            0x70 => {
                // WCVTF: value in font units.
                let value = self.pop()?;
                let index = self.pop()?;
                let scaled = mul_fix(value, self.projection_scale());
                self.write_cvt(index, scaled)?;
            }

            // ---- measurements -------------------------------------------
            0x4B => {
                let ppem = self.current_ppem();
                self.push(ppem)?;
            }
            0x4C => {
                let size = i32::from(self.metrics.y_ppem) << 6;
                self.push(size)?;
            }

            // ---- flags --------------------------------------------------
            0x4D => self.gs.auto_flip = true,
            0x4E => self.gs.auto_flip = false,
            0x4F => {
                self.pop()?; // DEBUG
            }
            0x5E => self.gs.delta_base = self.pop()? as u32,
            0x5F => self.gs.delta_shift = (self.pop()? as u32).min(6),
            0x7E | 0x7F => {
                // SANGW / AA: obsolete, pop and ignore.
                self.pop()?;
            }
            0x85 => {
                let value = self.pop()?;
                self.gs.scan_control = decide_scan_control(value, self.current_ppem());
            }
            0x8D => self.gs.scan_type = self.pop()?,
            0x8E => {
                // INSTCTRL
                let selector = self.pop()?;
                let value = self.pop()?;
                if self.range != CodeRange::Cvt {
                    return Err(Error::InvalidOpcode);
                }
                if selector >= 1 && selector <= 2 {
                    let bit = 1 << (selector - 1);
                    if value != 0 {
                        self.gs.instruct_control |= bit;
                    } else {
                        self.gs.instruct_control &= !bit;
                    }
                }
            }
            0x88 => {
                // GETINFO
                let selector = self.pop()?;
                let mut result = 0;
                if selector & 1 != 0 {
                    result |= 2; // interpreter version
                }
                self.push(result)?;
            }

            // ---- logic --------------------------------------------------
            0x50 => self.binary_op(|a, b| (a < b) as i32)?,
            0x51 => self.binary_op(|a, b| (a <= b) as i32)?,
            0x52 => self.binary_op(|a, b| (a > b) as i32)?,
            0x53 => self.binary_op(|a, b| (a >= b) as i32)?,
            0x54 => self.binary_op(|a, b| (a == b) as i32)?,
            0x55 => self.binary_op(|a, b| (a != b) as i32)?,
            0x56 => {
                let value = self.pop()?;
                let rounded = self.round(value);
                self.push(((rounded & 127) == 64) as i32)?;
            }
            0x57 => {
                let value = self.pop()?;
                let rounded = self.round(value);
                self.push(((rounded & 127) == 0) as i32)?;
            }
            0x5A => self.binary_op(|a, b| (a != 0 && b != 0) as i32)?,
            0x5B => self.binary_op(|a, b| (a != 0 || b != 0) as i32)?,
            0x5C => {
                let value = self.pop()?;
                self.push((value == 0) as i32)?;
            }

            // ---- arithmetic ---------------------------------------------
            0x60 => self.binary_op(|a, b| a.wrapping_add(b))?,
            0x61 => self.binary_op(|a, b| a.wrapping_sub(b))?,
            0x62 => {
                let b = self.pop()?;
                let a = self.pop()?;
                if b == 0 {
                    return Err(Error::DivideByZero);
                }
                self.push(mul_div(a, 64, b))?;
            }
            0x63 => self.binary_op(|a, b| mul_div(a, b, 64))?,
            0x64 => {
                let value = self.pop()?;
                self.push(value.wrapping_abs())?;
            }
            0x65 => {
                let value = self.pop()?;
                self.push(value.wrapping_neg())?;
            }
            0x66 => {
                let value = self.pop()?;
                self.push(value & -64)?;
            }
            0x67 => {
                let value = self.pop()?;
                self.push((value + 63) & -64)?;
            }
            0x8B => self.binary_op(|a, b| a.max(b))?,
            0x8C => self.binary_op(|a, b| a.min(b))?,
            0x68..=0x6B => {
                // ROUND[ab]; engine compensation is not modeled.
                let value = self.pop()?;
                let rounded = self.round(value);
                self.push(rounded)?;
            }
            0x6C..=0x6F => {
                // NROUND: compensation only, a no-op here.
                let value = self.pop()?;
                self.push(value)?;
            }

            // ---- deltas -------------------------------------------------
            0x5D => self.op_deltap(1)?,
            0x71 => self.op_deltap(2)?,
            0x72 => self.op_deltap(3)?,
            0x73 => self.op_deltac(1)?,
            0x74 => self.op_deltac(2)?,
            0x75 => self.op_deltac(3)?,

            _ => {
                // Maybe an IDEF-provided instruction.
                if let Some(def) = self
                    .state
                    .instruction_defs
                    .iter()
                    .find(|d| d.active && d.opcode == opcode)
                    .copied()
                {
                    self.enter_definition(def, 1)?;
                } else {
                    return Err(Error::InvalidOpcode);
                }
            }
        }
        Ok(())
    }

    fn peek_index(&self, index: i32) -> FontResult<i32> {
        if index <= 0 || index as usize > self.stack.len() {
            return Err(Error::StackUnderflow);
        }
        Ok(self.stack[self.stack.len() - index as usize])
    }

    fn binary_op<F>(&mut self, f: F) -> FontResult<()>
    where
        F: FnOnce(i32, i32) -> i32,
    {
        let b = self.pop()?;
        let a = self.pop()?;
        self.push(f(a, b))
    }

    fn fetch_byte(&mut self) -> FontResult<u8> {
        let code = self.code(self.range);
        let byte = *code.get(self.ip).ok_or(Error::InvalidCodeRange)?;
        self.ip += 1;
        Ok(byte)
    }

    fn fetch_word(&mut self) -> FontResult<i16> {
        let hi = self.fetch_byte()?;
        let lo = self.fetch_byte()?;
        Ok(((u16::from(hi) << 8) | u16::from(lo)) as i16)
    }

    fn jump(&mut self, offset: i32) -> FontResult<()> {
        // The offset is relative to the jump opcode itself.
        let base = self.ip as i64 - 1;
        let target = base + i64::from(offset);
        let len = self.code(self.range).len() as i64;
        if target < 0 || target > len {
            return Err(Error::InvalidCodeRange);
        }
        self.ip = target as usize;
        Ok(())
    }

    fn enter_function(&mut self, index: i32, count: u32) -> FontResult<()> {
        let def = self
            .state
            .functions
            .get(index.max(0) as usize)
            .and_then(|d| *d)
            .ok_or(Error::InvalidOpcode)?;
        self.enter_definition(def, count)
    }

    fn enter_definition(&mut self, def: Definition, count: u32) -> FontResult<()> {
        if self.call_stack.len() >= 32 {
            return Err(Error::StackOverflow);
        }
        self.call_stack.push(CallRecord {
            caller_range: self.range,
            caller_ip: self.ip,
            definition: def,
            remaining: count,
        });
        self.range = def.range;
        self.ip = def.start;
        Ok(())
    }

    fn op_fdef(&mut self) -> FontResult<()> {
        if self.range == CodeRange::Glyph {
            return Err(Error::InvalidOpcode);
        }
        let index = self.pop()?;
        let range = self.range;
        let (start, end) = self.scan_definition()?;
        let slot = self
            .state
            .functions
            .get_mut(index.max(0) as usize)
            .ok_or(Error::InvalidOpcode)?;
        *slot = Some(Definition {
            range,
            start,
            end,
            opcode: 0,
            active: true,
        });
        Ok(())
    }

    fn op_idef(&mut self) -> FontResult<()> {
        if self.range == CodeRange::Glyph {
            return Err(Error::InvalidOpcode);
        }
        let opcode = self.pop()? as u8;
        let range = self.range;
        let (start, end) = self.scan_definition()?;
        let def = Definition {
            range,
            start,
            end,
            opcode,
            active: true,
        };
        if let Some(existing) = self
            .state
            .instruction_defs
            .iter_mut()
            .find(|d| d.opcode == opcode)
        {
            *existing = def;
        } else {
            self.state.instruction_defs.push(def);
        }
        Ok(())
    }

    fn op_endf(&mut self) -> FontResult<()> {
        let mut frame = self.call_stack.pop().ok_or(Error::InvalidCodeRange)?;
        if frame.remaining > 1 {
            frame.remaining -= 1;
            self.ip = frame.definition.start;
            self.call_stack.push(frame);
        } else {
            self.range = frame.caller_range;
            self.ip = frame.caller_ip;
        }
        Ok(())
    }

    fn projection_scale(&self) -> Fixed {
        // Scale along the projection axis, for WCVTF and twilight setup.
        if self.gs.projection.x.abs() >= self.gs.projection.y.abs() {
            self.metrics.x_scale
        } else {
            self.metrics.y_scale
        }
    }

    // ------------------------------------------------------------------
    // Point instructions
    // ------------------------------------------------------------------

    fn op_mdap(&mut self, round: bool) -> FontResult<()> {
        let point = self.pop()? as usize;
        let twilight = self.zone_is_twilight(self.gs.gep0)?;
        let position = self.project(self.point_cur(twilight, point)?);
        let distance = if round {
            self.round(position) - position
        } else {
            0
        };
        self.move_point(twilight, point, distance)?;
        self.gs.rp0 = point;
        self.gs.rp1 = point;
        Ok(())
    }

    fn op_miap(&mut self, round: bool) -> FontResult<()> {
        let cvt_index = self.pop()?;
        let point = self.pop()? as usize;
        let twilight = self.zone_is_twilight(self.gs.gep0)?;
        let mut distance = self.read_cvt(cvt_index)?;

        if twilight {
            // Twilight points spring into existence on first use.
            let freedom = self.gs.freedom;
            let zone = self.zone_mut(true);
            let slot = zone
                .org
                .get_mut(point)
                .ok_or(Error::InvalidReferencePoint)?;
            slot.x = mul14(distance, freedom.x);
            slot.y = mul14(distance, freedom.y);
            zone.cur[point] = *slot;
        }

        let position = self.project(self.point_cur(twilight, point)?);
        if round {
            if (distance - position).abs() > self.gs.control_value_cutin {
                distance = position;
            }
            distance = self.round(distance);
        }
        self.move_point(twilight, point, distance - position)?;
        self.gs.rp0 = point;
        self.gs.rp1 = point;
        Ok(())
    }

    fn op_mdrp(&mut self, flags: u8) -> FontResult<()> {
        let point = self.pop()? as usize;
        let zp0 = self.zone_is_twilight(self.gs.gep0)?;
        let zp1 = self.zone_is_twilight(self.gs.gep1)?;
        let rp0 = self.gs.rp0;

        let org_dist = {
            let a = self.point_org(zp1, point)?;
            let b = self.point_org(zp0, rp0)?;
            self.dual_project(a - b)
        };
        let org_dist = self.apply_single_width(org_dist);

        let mut distance = if flags & 0x04 != 0 {
            self.round(org_dist)
        } else {
            org_dist
        };
        if flags & 0x08 != 0 {
            distance = apply_min_distance(distance, org_dist, self.gs.min_distance);
        }

        let cur_dist = {
            let a = self.point_cur(zp1, point)?;
            let b = self.point_cur(zp0, rp0)?;
            self.project(a - b)
        };
        self.move_point(zp1, point, distance - cur_dist)?;
        self.gs.rp1 = self.gs.rp0;
        self.gs.rp2 = point;
        if flags & 0x10 != 0 {
            self.gs.rp0 = point;
        }
        Ok(())
    }

    fn op_mirp(&mut self, flags: u8) -> FontResult<()> {
        let cvt_index = self.pop()?;
        let point = self.pop()? as usize;
        let zp0 = self.zone_is_twilight(self.gs.gep0)?;
        let zp1 = self.zone_is_twilight(self.gs.gep1)?;
        let rp0 = self.gs.rp0;

        let mut cvt_dist = self.read_cvt(cvt_index)?;
        cvt_dist = self.apply_single_width(cvt_dist);

        if zp1 {
            // Twilight target: derive the original position directly.
            let origin = self.point_org(zp0, rp0)?;
            let freedom = self.gs.freedom;
            let zone = self.zone_mut(true);
            let slot = zone
                .org
                .get_mut(point)
                .ok_or(Error::InvalidReferencePoint)?;
            slot.x = origin.x + mul14(cvt_dist, freedom.x);
            slot.y = origin.y + mul14(cvt_dist, freedom.y);
            zone.cur[point] = *slot;
        }

        let org_dist = {
            let a = self.point_org(zp1, point)?;
            let b = self.point_org(zp0, rp0)?;
            self.dual_project(a - b)
        };

        if self.gs.auto_flip && (org_dist ^ cvt_dist) < 0 {
            cvt_dist = -cvt_dist;
        }

        let mut distance = if flags & 0x04 != 0 {
            if (cvt_dist - org_dist).abs() > self.gs.control_value_cutin {
                cvt_dist = org_dist;
            }
            self.round(cvt_dist)
        } else {
            cvt_dist
        };
        if flags & 0x08 != 0 {
            distance = apply_min_distance(distance, org_dist, self.gs.min_distance);
        }

        let cur_dist = {
            let a = self.point_cur(zp1, point)?;
            let b = self.point_cur(zp0, rp0)?;
            self.project(a - b)
        };
        self.move_point(zp1, point, distance - cur_dist)?;
        self.gs.rp1 = self.gs.rp0;
        self.gs.rp2 = point;
        if flags & 0x10 != 0 {
            self.gs.rp0 = point;
        }
        Ok(())
    }

    fn apply_single_width(&self, distance: Pos) -> Pos {
        if (distance.abs() - self.gs.single_width_value).abs() < self.gs.single_width_cutin {
            if distance >= 0 {
                self.gs.single_width_value
            } else {
                -self.gs.single_width_value
            }
        } else {
            distance
        }
    }

    fn op_msirp(&mut self, set_rp0: bool) -> FontResult<()> {
        let distance = self.pop()?;
        let point = self.pop()? as usize;
        let zp0 = self.zone_is_twilight(self.gs.gep0)?;
        let zp1 = self.zone_is_twilight(self.gs.gep1)?;
        let rp0 = self.gs.rp0;

        if zp1 {
            let origin = self.point_org(zp0, rp0)?;
            let zone = self.zone_mut(true);
            let slot = zone
                .org
                .get_mut(point)
                .ok_or(Error::InvalidReferencePoint)?;
            *slot = origin;
            zone.cur[point] = origin;
        }

        let cur_dist = {
            let a = self.point_cur(zp1, point)?;
            let b = self.point_cur(zp0, rp0)?;
            self.project(a - b)
        };
        self.move_point(zp1, point, distance - cur_dist)?;
        self.gs.rp1 = self.gs.rp0;
        self.gs.rp2 = point;
        if set_rp0 {
            self.gs.rp0 = point;
        }
        Ok(())
    }

    fn op_gc(&mut self, original: bool) -> FontResult<()> {
        let point = self.pop()? as usize;
        let twilight = self.zone_is_twilight(self.gs.gep2)?;
        let value = if original {
            self.dual_project(self.point_org(twilight, point)?)
        } else {
            self.project(self.point_cur(twilight, point)?)
        };
        self.push(value)
    }

    fn op_scfs(&mut self) -> FontResult<()> {
        let value = self.pop()?;
        let point = self.pop()? as usize;
        let twilight = self.zone_is_twilight(self.gs.gep2)?;
        let position = self.project(self.point_cur(twilight, point)?);
        self.move_point(twilight, point, value - position)?;
        if twilight {
            let zone = self.zone_mut(true);
            zone.org[point] = zone.cur[point];
        }
        Ok(())
    }

    fn op_md(&mut self, original: bool) -> FontResult<()> {
        let p2 = self.pop()? as usize;
        let p1 = self.pop()? as usize;
        let zp0 = self.zone_is_twilight(self.gs.gep0)?;
        let zp1 = self.zone_is_twilight(self.gs.gep1)?;
        let distance = if original {
            let a = self.point_org(zp0, p1)?;
            let b = self.point_org(zp1, p2)?;
            self.dual_project(a - b)
        } else {
            let a = self.point_cur(zp0, p1)?;
            let b = self.point_cur(zp1, p2)?;
            self.project(a - b)
        };
        self.push(distance)
    }

    fn op_ip(&mut self) -> FontResult<()> {
        let count = self.gs.loop_count;
        self.gs.loop_count = 1;
        let zp0 = self.zone_is_twilight(self.gs.gep0)?;
        let zp1 = self.zone_is_twilight(self.gs.gep1)?;
        let zp2 = self.zone_is_twilight(self.gs.gep2)?;
        let rp1 = self.gs.rp1;
        let rp2 = self.gs.rp2;

        let org1 = self.point_org(zp0, rp1)?;
        let org2 = self.point_org(zp1, rp2)?;
        let cur1 = self.point_cur(zp0, rp1)?;
        let cur2 = self.point_cur(zp1, rp2)?;
        let org_range = self.dual_project(org2 - org1);
        let cur_range = self.project(cur2 - cur1);

        for _ in 0..count {
            let point = self.pop()? as usize;
            let org_dist = self.dual_project(self.point_org(zp2, point)? - org1);
            let cur_dist = self.project(self.point_cur(zp2, point)? - cur1);
            let new_dist = if org_dist != 0 {
                if org_range != 0 {
                    mul_div(org_dist, cur_range, org_range)
                } else {
                    org_dist
                }
            } else {
                0
            };
            self.move_point(zp2, point, new_dist - cur_dist)?;
        }
        Ok(())
    }

    fn op_alignrp(&mut self) -> FontResult<()> {
        let count = self.gs.loop_count;
        self.gs.loop_count = 1;
        let zp0 = self.zone_is_twilight(self.gs.gep0)?;
        let zp1 = self.zone_is_twilight(self.gs.gep1)?;
        let rp0 = self.gs.rp0;
        let origin = self.point_cur(zp0, rp0)?;
        for _ in 0..count {
            let point = self.pop()? as usize;
            let distance = self.project(self.point_cur(zp1, point)? - origin);
            self.move_point(zp1, point, -distance)?;
        }
        Ok(())
    }

    fn op_alignpts(&mut self) -> FontResult<()> {
        let p2 = self.pop()? as usize;
        let p1 = self.pop()? as usize;
        let zp0 = self.zone_is_twilight(self.gs.gep0)?;
        let zp1 = self.zone_is_twilight(self.gs.gep1)?;
        let distance = {
            let a = self.point_cur(zp0, p2)?;
            let b = self.point_cur(zp1, p1)?;
            self.project(a - b) / 2
        };
        self.move_point(zp1, p1, distance)?;
        self.move_point(zp0, p2, -distance)?;
        Ok(())
    }

    fn op_shpix(&mut self) -> FontResult<()> {
        let amount = self.pop()?;
        let count = self.gs.loop_count;
        self.gs.loop_count = 1;
        let zp2 = self.zone_is_twilight(self.gs.gep2)?;
        let freedom = self.gs.freedom;
        let dx = mul14(amount, freedom.x);
        let dy = mul14(amount, freedom.y);
        for _ in 0..count {
            let point = self.pop()? as usize;
            let zone = self.zone_mut(zp2);
            if point >= zone.n_points() {
                return Err(Error::InvalidReferencePoint);
            }
            if dx != 0 {
                zone.cur[point].x += dx;
                zone.tags[point] |= PointTags::TOUCHED_X;
            }
            if dy != 0 {
                zone.cur[point].y += dy;
                zone.tags[point] |= PointTags::TOUCHED_Y;
            }
        }
        Ok(())
    }

    /// The displacement of the SHP/SHC/SHZ reference point, as (dx, dy)
    /// along the freedom vector.
    fn reference_displacement(&self, use_rp1: bool) -> FontResult<(Pos, Pos, bool, usize)> {
        let (gep, rp) = if use_rp1 {
            (self.gs.gep0, self.gs.rp1)
        } else {
            (self.gs.gep1, self.gs.rp2)
        };
        let twilight = self.zone_is_twilight(gep)?;
        let cur = self.point_cur(twilight, rp)?;
        let org = self.point_org(twilight, rp)?;
        let distance = self.project(cur - org);
        let dx = mul_div(distance, self.gs.freedom.x, self.f_dot_p);
        let dy = mul_div(distance, self.gs.freedom.y, self.f_dot_p);
        Ok((dx, dy, twilight, rp))
    }

    fn op_shp(&mut self, use_rp1: bool) -> FontResult<()> {
        let (dx, dy, _, _) = self.reference_displacement(use_rp1)?;
        let count = self.gs.loop_count;
        self.gs.loop_count = 1;
        let zp2 = self.zone_is_twilight(self.gs.gep2)?;
        for _ in 0..count {
            let point = self.pop()? as usize;
            let zone = self.zone_mut(zp2);
            if point >= zone.n_points() {
                return Err(Error::InvalidReferencePoint);
            }
            if dx != 0 {
                zone.cur[point].x += dx;
                zone.tags[point] |= PointTags::TOUCHED_X;
            }
            if dy != 0 {
                zone.cur[point].y += dy;
                zone.tags[point] |= PointTags::TOUCHED_Y;
            }
        }
        Ok(())
    }

    fn op_shc(&mut self, use_rp1: bool) -> FontResult<()> {
        let contour = self.pop()? as usize;
        let (dx, dy, ref_twilight, ref_point) = self.reference_displacement(use_rp1)?;
        let zp2 = self.zone_is_twilight(self.gs.gep2)?;
        let zone = self.zone_mut(zp2);
        let (first, last) = contour_span(zone, contour)?;
        for point in first..=last {
            if zp2 == ref_twilight && point == ref_point {
                continue;
            }
            if dx != 0 {
                zone.cur[point].x += dx;
                zone.tags[point] |= PointTags::TOUCHED_X;
            }
            if dy != 0 {
                zone.cur[point].y += dy;
                zone.tags[point] |= PointTags::TOUCHED_Y;
            }
        }
        Ok(())
    }

    fn op_shz(&mut self, use_rp1: bool) -> FontResult<()> {
        let zone_arg = self.pop()? as u32;
        let twilight = self.zone_is_twilight(zone_arg)?;
        let (dx, dy, ref_twilight, ref_point) = self.reference_displacement(use_rp1)?;
        let zone = self.zone_mut(twilight);
        // SHZ moves every point without touching it.
        for point in 0..zone.n_points() {
            if twilight == ref_twilight && point == ref_point {
                continue;
            }
            zone.cur[point].x += dx;
            zone.cur[point].y += dy;
        }
        Ok(())
    }

    fn op_isect(&mut self) -> FontResult<()> {
        let b1 = self.pop()? as usize;
        let b0 = self.pop()? as usize;
        let a1 = self.pop()? as usize;
        let a0 = self.pop()? as usize;
        let point = self.pop()? as usize;
        let zp0 = self.zone_is_twilight(self.gs.gep0)?;
        let zp1 = self.zone_is_twilight(self.gs.gep1)?;
        let zp2 = self.zone_is_twilight(self.gs.gep2)?;

        let pa0 = self.point_cur(zp1, a0)?;
        let pa1 = self.point_cur(zp1, a1)?;
        let pb0 = self.point_cur(zp0, b0)?;
        let pb1 = self.point_cur(zp0, b1)?;

        let dax = i64::from(pa1.x - pa0.x);
        let day = i64::from(pa1.y - pa0.y);
        let dbx = i64::from(pb1.x - pb0.x);
        let dby = i64::from(pb1.y - pb0.y);
        let discriminant = dax * dby - day * dbx;

        let target = if discriminant.abs() >= 0x40 {
            let dx = i64::from(pb0.x - pa0.x);
            let dy = i64::from(pb0.y - pa0.y);
            let val = dx * dby - dy * dbx;
            Vector::new(
                (i64::from(pa0.x) + (val * dax) / discriminant) as i32,
                (i64::from(pa0.y) + (val * day) / discriminant) as i32,
            )
        } else {
            // Degenerate: the middle of the four points.
            Vector::new(
                (pa0.x + pa1.x + pb0.x + pb1.x) / 4,
                (pa0.y + pa1.y + pb0.y + pb1.y) / 4,
            )
        };

        let zone = self.zone_mut(zp2);
        if point >= zone.n_points() {
            return Err(Error::InvalidReferencePoint);
        }
        zone.cur[point] = target;
        zone.tags[point] |= PointTags::TOUCHED_X | PointTags::TOUCHED_Y;
        Ok(())
    }

    fn op_utp(&mut self) -> FontResult<()> {
        let point = self.pop()? as usize;
        let twilight = self.zone_is_twilight(self.gs.gep0)?;
        let mut mask = PointTags::empty();
        if self.gs.freedom.x != 0 {
            mask |= PointTags::TOUCHED_X;
        }
        if self.gs.freedom.y != 0 {
            mask |= PointTags::TOUCHED_Y;
        }
        let zone = self.zone_mut(twilight);
        let tags = zone
            .tags
            .get_mut(point)
            .ok_or(Error::InvalidReferencePoint)?;
        tags.remove(mask);
        Ok(())
    }

    fn op_flippt(&mut self) -> FontResult<()> {
        let count = self.gs.loop_count;
        self.gs.loop_count = 1;
        for _ in 0..count {
            let point = self.pop()? as usize;
            let tags = self
                .glyph
                .tags
                .get_mut(point)
                .ok_or(Error::InvalidReferencePoint)?;
            tags.toggle(PointTags::ON_CURVE);
        }
        Ok(())
    }

    fn op_fliprange(&mut self, set_on: bool) -> FontResult<()> {
        let high = self.pop()? as usize;
        let low = self.pop()? as usize;
        if low > high || high >= self.glyph.n_points() {
            return Err(Error::InvalidReferencePoint);
        }
        for point in low..=high {
            if set_on {
                self.glyph.tags[point] |= PointTags::ON_CURVE;
            } else {
                self.glyph.tags[point].remove(PointTags::ON_CURVE);
            }
        }
        Ok(())
    }

    fn op_deltap(&mut self, stage: u32) -> FontResult<()> {
        let count = self.pop()?;
        let zp0 = self.zone_is_twilight(self.gs.gep0)?;
        let ppem = self.current_ppem() as u32;
        for _ in 0..count.max(0) {
            let point = self.pop()? as usize;
            let arg = self.pop()? as u32;
            let target_ppem = self.gs.delta_base + (stage - 1) * 16 + ((arg >> 4) & 0xF);
            if target_ppem != ppem {
                continue;
            }
            let mut steps = (arg & 0xF) as i32 - 8;
            if steps >= 0 {
                steps += 1;
            }
            let amount = steps * (1 << (6 - self.gs.delta_shift));
            self.move_point(zp0, point, amount)?;
        }
        Ok(())
    }

    fn op_deltac(&mut self, stage: u32) -> FontResult<()> {
        let count = self.pop()?;
        let ppem = self.current_ppem() as u32;
        for _ in 0..count.max(0) {
            let cvt_index = self.pop()?;
            let arg = self.pop()? as u32;
            let target_ppem = self.gs.delta_base + (stage - 1) * 16 + ((arg >> 4) & 0xF);
            if target_ppem != ppem {
                continue;
            }
            let mut steps = (arg & 0xF) as i32 - 8;
            if steps >= 0 {
                steps += 1;
            }
            let amount = steps * (1 << (6 - self.gs.delta_shift));
            let value = self.read_cvt(cvt_index)?;
            self.write_cvt(cvt_index, value + amount)?;
        }
        Ok(())
    }

    fn op_iup(&mut self, x_axis: bool) -> FontResult<()> {
        let zone = &mut *self.glyph;
        let touched_mask = if x_axis {
            PointTags::TOUCHED_X
        } else {
            PointTags::TOUCHED_Y
        };

        let mut first = 0usize;
        for &end in zone.contours.clone().iter() {
            let last = end as usize;
            if last >= zone.n_points() {
                return Err(Error::InvalidReferencePoint);
            }
            iup_contour(zone, first, last, x_axis, touched_mask);
            first = last + 1;
        }
        Ok(())
    }
}

fn contour_span(zone: &Zone, contour: usize) -> FontResult<(usize, usize)> {
    let end = *zone
        .contours
        .get(contour)
        .ok_or(Error::InvalidReferencePoint)? as usize;
    let start = if contour == 0 {
        0
    } else {
        zone.contours[contour - 1] as usize + 1
    };
    if end >= zone.n_points() {
        return Err(Error::InvalidReferencePoint);
    }
    Ok((start, end))
}

fn axis_get(v: Vector, x_axis: bool) -> Pos {
    if x_axis {
        v.x
    } else {
        v.y
    }
}

fn axis_set(v: &mut Vector, x_axis: bool, value: Pos) {
    if x_axis {
        v.x = value;
    } else {
        v.y = value;
    }
}

/// Interpolates the untouched points of one contour along one axis.
fn iup_contour(zone: &mut Zone, first: usize, last: usize, x_axis: bool, mask: PointTags) {
    // Find the first touched point.
    let mut anchor = None;
    for point in first..=last {
        if zone.tags[point].contains(mask) {
            anchor = Some(point);
            break;
        }
    }
    let anchor = match anchor {
        Some(anchor) => anchor,
        None => return,
    };

    let count = last - first + 1;
    let advance = |p: usize| if p == last { first } else { p + 1 };

    let mut ref1 = anchor;
    let mut steps = 0usize;
    while steps < count {
        // Find the next touched point, cyclically.
        let mut ref2 = advance(ref1);
        let mut span = 0usize;
        while !zone.tags[ref2].contains(mask) && ref2 != anchor {
            ref2 = advance(ref2);
            span += 1;
            if span > count {
                break;
            }
        }

        // Interpolate the run strictly between ref1 and ref2.
        let org1 = axis_get(zone.org[ref1], x_axis);
        let org2 = axis_get(zone.org[ref2], x_axis);
        let cur1 = axis_get(zone.cur[ref1], x_axis);
        let cur2 = axis_get(zone.cur[ref2], x_axis);
        let (lo_org, lo_cur, hi_org, hi_cur) = if org1 <= org2 {
            (org1, cur1, org2, cur2)
        } else {
            (org2, cur2, org1, cur1)
        };

        let mut point = advance(ref1);
        while point != ref2 {
            let u = axis_get(zone.org[point], x_axis);
            let new = if u <= lo_org {
                u + (lo_cur - lo_org)
            } else if u >= hi_org {
                u + (hi_cur - hi_org)
            } else if hi_org != lo_org {
                lo_cur + mul_div(u - lo_org, hi_cur - lo_cur, hi_org - lo_org)
            } else {
                lo_cur
            };
            axis_set(&mut zone.cur[point], x_axis, new);
            point = advance(point);
            steps += 1;
        }

        steps += 1;
        ref1 = ref2;
        if ref1 == anchor {
            break;
        }
    }
}

#[inline]
fn dot14(ax: i32, ay: i32, bx: i32, by: i32) -> i32 {
    ((i64::from(ax) * i64::from(bx) + i64::from(ay) * i64::from(by) + 0x2000) >> 14) as i32
}

#[inline]
fn dot_project(d: Vector, unit: UnitVector) -> Pos {
    ((i64::from(d.x) * i64::from(unit.x) + i64::from(d.y) * i64::from(unit.y) + 0x2000) >> 14)
        as i32
}

#[inline]
fn mul14(value: i32, unit: i32) -> i32 {
    ((i64::from(value) * i64::from(unit) + 0x2000) >> 14) as i32
}

fn isqrt(value: i64) -> i64 {
    if value <= 0 {
        return 0;
    }
    let mut x = value;
    let mut next = (x + 1) / 2;
    while next < x {
        x = next;
        next = (x + value / x) / 2;
    }
    x
}

/// Normalizes an arbitrary direction to a 2.14 unit vector.
fn normalize_to_unit(dx: i32, dy: i32) -> UnitVector {
    if dx == 0 && dy == 0 {
        return AXIS_X;
    }
    let fx = i64::from(dx) << 14;
    let fy = i64::from(dy) << 14;
    let length = isqrt(i64::from(dx) * i64::from(dx) + i64::from(dy) * i64::from(dy));
    if length == 0 {
        return AXIS_X;
    }
    UnitVector {
        x: (fx / length) as i32,
        y: (fy / length) as i32,
    }
}

#[inline]
fn floor_div(a: i32, b: i32) -> i32 {
    let q = a / b;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn apply_min_distance(distance: Pos, org_dist: Pos, min_distance: Pos) -> Pos {
    if org_dist >= 0 {
        distance.max(min_distance)
    } else {
        distance.min(-min_distance)
    }
}

fn decide_scan_control(value: i32, ppem: i32) -> bool {
    let threshold = value & 0xFF;
    let flags = value & 0x3F00;
    let mut control = false;
    // Bit 8: set dropout if ppem <= threshold. Bits 9/10 concern rotation
    // and stretching, which this engine never applies.
    if flags & 0x100 != 0 && ppem <= threshold {
        control = true;
    }
    if flags & 0x800 != 0 && ppem > threshold {
        control = false;
    }
    control
}

fn super_round_state(selector: i32, grid_period: Pos) -> RoundState {
    let period = match (selector >> 6) & 3 {
        0 => grid_period / 2,
        1 => grid_period,
        2 => grid_period * 2,
        _ => grid_period,
    };
    let phase = match (selector >> 4) & 3 {
        0 => 0,
        1 => period / 4,
        2 => period / 2,
        _ => period * 3 / 4,
    };
    let threshold = match selector & 0xF {
        0 => period - 1,
        n => (i32::from(n as u8) - 4) * period / 8,
    };
    RoundState::Super(period, phase, threshold)
}

/// Applies a rounding mode to a projected distance.
pub fn round_with(state: RoundState, distance: Pos) -> Pos {
    let result = match state {
        RoundState::Off => return distance,
        RoundState::ToGrid => {
            if distance >= 0 {
                (distance + 32) & -64
            } else {
                -((-distance + 32) & -64)
            }
        }
        RoundState::ToHalfGrid => {
            if distance >= 0 {
                (distance & -64) + 32
            } else {
                -(((-distance) & -64) + 32)
            }
        }
        RoundState::ToDoubleGrid => {
            if distance >= 0 {
                (distance + 16) & -32
            } else {
                -((-distance + 16) & -32)
            }
        }
        RoundState::DownToGrid => {
            if distance >= 0 {
                distance & -64
            } else {
                -((-distance) & -64)
            }
        }
        RoundState::UpToGrid => {
            if distance >= 0 {
                (distance + 63) & -64
            } else {
                -((-distance + 63) & -64)
            }
        }
        RoundState::Super(period, phase, threshold) => {
            if period <= 0 {
                return distance;
            }
            if distance >= 0 {
                let mut value = floor_div(distance - phase + threshold, period) * period + phase;
                if value < 0 {
                    value = phase;
                }
                value
            } else {
                let mut value =
                    -(floor_div(threshold - phase - distance, period) * period + phase);
                if value > 0 {
                    value = -phase;
                }
                value
            }
        }
    };
    // Rounding never flips the sign of a nonzero distance.
    if distance > 0 && result < 0 {
        0
    } else if distance < 0 && result > 0 {
        0
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> ExecMetrics {
        ExecMetrics {
            x_ppem: 12,
            y_ppem: 12,
            x_scale: 0x0C00 << 6, // arbitrary
            y_scale: 0x0C00 << 6,
            max_stack: 64,
            pedantic: true,
            is_composite: false,
        }
    }

    fn run_glyph(state: &mut ExecState, zone: &mut Zone, code: &[u8]) -> FontResult<()> {
        let m = metrics();
        let mut exec = ExecContext::new(state, zone, &[], &[], code, m);
        exec.run(CodeRange::Glyph)
    }

    fn small_state() -> ExecState {
        ExecState {
            storage: vec![0; 16],
            cvt: vec![0; 16],
            functions: vec![None; 16],
            instruction_defs: Vec::new(),
            twilight: Zone::with_capacity(4),
            graphics_state: GraphicsState::default(),
        }
    }

    #[test]
    fn push_and_arithmetic() {
        let mut state = small_state();
        let mut zone = Zone::with_capacity(4);
        // PUSHB[1] 100 36 ; ADD ; PUSHB[0] 1 ; WS
        let code = [0xB1, 100, 36, 0x60, 0xB0, 1, 0x23, 0x42];
        run_glyph(&mut state, &mut zone, &code).unwrap();
        assert_eq!(state.storage[1], 136);
    }

    #[test]
    fn stack_underflow_is_reported() {
        let mut state = small_state();
        let mut zone = Zone::with_capacity(4);
        assert_eq!(
            run_glyph(&mut state, &mut zone, &[0x60]),
            Err(Error::StackUnderflow)
        );
    }

    #[test]
    fn if_else_branches() {
        let mut state = small_state();
        let mut zone = Zone::with_capacity(4);
        // PUSHB[0] 0 ; IF ; PUSHB[1] 0 7 ; WS ; ELSE ; PUSHB[1] 0 9 ; WS ; EIF
        let code = [
            0xB0, 0, 0x58, 0xB1, 0, 7, 0x42, 0x1B, 0xB1, 0, 9, 0x42, 0x59,
        ];
        run_glyph(&mut state, &mut zone, &code).unwrap();
        assert_eq!(state.storage[0], 9);
    }

    #[test]
    fn function_definition_and_call() {
        let mut state = small_state();
        let mut zone = Zone::with_capacity(4);
        // Font program: FDEF 0 { DUP ADD } (doubles top of stack)
        let font = [0xB0, 0, 0x2C, 0x20, 0x60, 0x2D];
        {
            let m = metrics();
            let mut exec = ExecContext::new(&mut state, &mut zone, &font, &[], &[], m);
            exec.run(CodeRange::Font).unwrap();
        }
        assert!(state.functions[0].is_some());
        // Glyph program: PUSHB[0] 21 ; PUSHB[0] 0 ; CALL ; PUSHB[0] 3 ; SWAP ; WS
        let glyph = [0xB0, 21, 0xB0, 0, 0x2B, 0xB0, 3, 0x23, 0x42];
        {
            let m = metrics();
            let mut exec = ExecContext::new(&mut state, &mut zone, &font, &[], &glyph, m);
            exec.run(CodeRange::Glyph).unwrap();
        }
        assert_eq!(state.storage[3], 42);
    }

    #[test]
    fn mdap_rounds_point_to_grid() {
        let mut state = small_state();
        let mut zone = Zone::with_capacity(4);
        zone.cur[0] = Vector::new(100, 0); // 1.5625 px
        zone.org[0] = Vector::new(100, 0);
        zone.contours = vec![3];
        // SVTCA[x] ; PUSHB[0] 0 ; MDAP[round]
        let code = [0x01, 0xB0, 0, 0x2F];
        run_glyph(&mut state, &mut zone, &code).unwrap();
        assert_eq!(zone.cur[0].x, 128);
        assert!(zone.tags[0].contains(PointTags::TOUCHED_X));
    }

    #[test]
    fn shpix_moves_along_freedom_vector() {
        let mut state = small_state();
        let mut zone = Zone::with_capacity(4);
        zone.contours = vec![3];
        // SVTCA[y] ; PUSHB[1] 2 64 ; SHPIX (move point 2 by one pixel in y)
        let code = [0x00, 0xB1, 2, 64, 0x38];
        run_glyph(&mut state, &mut zone, &code).unwrap();
        assert_eq!(zone.cur[2].y, 64);
        assert!(zone.tags[2].contains(PointTags::TOUCHED_Y));
    }

    #[test]
    fn iup_interpolates_between_touched_points() {
        let mut state = small_state();
        let mut zone = Zone {
            org: vec![
                Vector::new(0, 0),
                Vector::new(64, 0),
                Vector::new(128, 0),
            ],
            cur: vec![
                Vector::new(0, 0),
                Vector::new(64, 0),
                Vector::new(192, 0),
            ],
            tags: vec![
                PointTags::TOUCHED_X,
                PointTags::empty(),
                PointTags::TOUCHED_X,
            ],
            contours: vec![2],
        };
        // Point 2 moved from 128 to 192; point 1 sits halfway in the
        // original outline, so it lands halfway after IUP[x].
        run_glyph(&mut state, &mut zone, &[0x31]).unwrap();
        assert_eq!(zone.cur[1].x, 96);
    }

    #[test]
    fn round_modes() {
        assert_eq!(round_with(RoundState::ToGrid, 96), 128);
        assert_eq!(round_with(RoundState::ToGrid, -96), -128);
        assert_eq!(round_with(RoundState::DownToGrid, 127), 64);
        assert_eq!(round_with(RoundState::UpToGrid, 65), 128);
        assert_eq!(round_with(RoundState::ToDoubleGrid, 40), 32);
        assert_eq!(round_with(RoundState::Off, 77), 77);
        // half grid: result is n + 0.5 pixels
        assert_eq!(round_with(RoundState::ToHalfGrid, 70) & 63, 32);
    }

    #[test]
    fn runaway_loop_is_terminated() {
        let mut state = small_state();
        let mut zone = Zone::with_capacity(4);
        // PUSHW[0] -3 ; JMPR -> jumps onto itself forever
        let code = [0xB8, 0xFF, 0xFD, 0x1C];
        assert!(run_glyph(&mut state, &mut zone, &code).is_err());
    }

    #[test]
    fn instctrl_only_in_cvt_program() {
        let mut state = small_state();
        let mut zone = Zone::with_capacity(4);
        let code = [0xB1, 1, 1, 0x8E];
        // In the glyph program this is an error...
        assert_eq!(
            run_glyph(&mut state, &mut zone, &code),
            Err(Error::InvalidOpcode)
        );
        // ...in the cvt program it sets the control bit.
        let m = metrics();
        let mut exec = ExecContext::new(&mut state, &mut zone, &[], &code, &[], m);
        exec.run(CodeRange::Cvt).unwrap();
        assert_eq!(state.graphics_state.instruct_control & 1, 1);
    }
}
