// glyphkit/src/truetype/mod.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The TrueType font driver.

mod glyph;
pub mod interp;

use log::{debug, warn};

use crate::error::{Error, FontResult};
use crate::face::{
    FaceFlags, FaceInfo, GlyphFormat, GlyphSlot, SizeId, SizeMetrics,
};
use crate::fixed::{ceil_pos, floor_pos, mul_fix, round_pos, BBox, Vector};
use crate::hinting::LoadFlags;
use crate::module::{DriverFace, DriverFlags, FontDriver, ModuleInfo, ProbeResult};
use crate::sfnt::cmap::CharMaps;
use crate::sfnt::directory::SfntDirectory;
use crate::sfnt::sbit::{load_sbit_image, SbitTable};
use crate::sfnt::tables::{
    self, Gasp, Hdmx, Header, KernTable, MaxProfile, MetricsHeader, MetricsTable, Postscript,
};
use crate::sfnt::{TAG_CVT, TAG_FPGM, TAG_GLYF, TAG_LOCA, TAG_OTTO, TAG_PREP};
use crate::stream::Stream;

use self::glyph::{GlyphLoader, HintEnv};
use self::interp::{
    CodeRange, ExecContext, ExecMetrics, ExecState, GraphicsState, Zone,
};

/// The TrueType driver. Accepts sfnt resources with a `glyf` table;
/// `OTTO`-flavored resources fall through to the CFF driver.
pub struct TrueTypeDriver;

impl TrueTypeDriver {
    pub fn new() -> TrueTypeDriver {
        TrueTypeDriver
    }
}

impl Default for TrueTypeDriver {
    fn default() -> TrueTypeDriver {
        TrueTypeDriver::new()
    }
}

impl FontDriver for TrueTypeDriver {
    fn info(&self) -> ModuleInfo {
        ModuleInfo {
            name: "truetype",
            version: 0x0001_0000,
            requires: 0x0001_0000,
        }
    }

    fn flags(&self) -> DriverFlags {
        DriverFlags::SCALABLE | DriverFlags::USES_OUTLINES | DriverFlags::HAS_HINTER
    }

    fn init_face(&self, mut stream: Stream, face_index: u32) -> ProbeResult {
        let dir = match SfntDirectory::load(&mut stream, face_index) {
            Ok(dir) => dir,
            Err(e) => return Err((stream, e)),
        };
        if dir.format == TAG_OTTO || dir.find(TAG_GLYF).is_none() {
            return Err((stream, Error::UnknownFileFormat));
        }
        match TtFace::load(stream, dir) {
            Ok(face) => Ok(face),
            Err((stream, e)) => Err((stream, e)),
        }
    }
}

/// Per-size interpreter state.
struct TtSize {
    id: SizeId,
    exec: ExecState,
    metrics: SizeMetrics,
    /// True once fpgm and prep have run at the current metrics.
    ready: bool,
}

pub(crate) struct TtFace {
    stream: Stream,
    dir: SfntDirectory,
    info: FaceInfo,
    maxp: MaxProfile,
    hori_header: MetricsHeader,
    hori: MetricsTable,
    vert: Option<(MetricsHeader, MetricsTable)>,
    os2: Option<tables::Os2>,
    post: Postscript,
    charmaps: CharMaps,
    #[allow(dead_code)]
    gasp: Gasp,
    hdmx: Hdmx,
    kern: KernTable,
    loca: Vec<u32>,
    cvt_base: Vec<i16>,
    fpgm: Vec<u8>,
    prep: Vec<u8>,
    sbit: Option<SbitTable>,
    postscript_name: Option<String>,
    sizes: Vec<TtSize>,
}

impl TtFace {
    fn load(mut stream: Stream, dir: SfntDirectory) -> Result<Box<TtFace>, (Stream, Error)> {
        match Self::load_inner(&mut stream, &dir) {
            Ok(mut face) => {
                face.stream = stream;
                face.dir = dir;
                Ok(Box::new(face))
            }
            Err(e) => Err((stream, e)),
        }
    }

    fn load_inner(stream: &mut Stream, dir: &SfntDirectory) -> FontResult<TtFace> {
        let header = tables::load_header(stream, dir)?;
        let maxp = tables::load_max_profile(stream, dir)?;
        let (hori_header, hori) = tables::load_horizontal(stream, dir, maxp.num_glyphs)?;
        let vert = tables::load_vertical(stream, dir, maxp.num_glyphs)?;
        let os2 = tables::load_os2(stream, dir)?;
        let post = tables::load_postscript(stream, dir)?;
        let names = tables::load_names(stream, dir)?;
        let charmaps = CharMaps::load(stream, dir)?;
        let gasp = tables::load_gasp(stream, dir)?;
        let hdmx = tables::load_hdmx(stream, dir, maxp.num_glyphs)?;
        let kern = tables::load_kern(stream, dir)?;
        let loca = load_loca(stream, dir, &header, maxp.num_glyphs)?;

        let cvt_base = match dir.read_table(stream, TAG_CVT) {
            Ok(data) => data
                .chunks_exact(2)
                .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
                .collect(),
            Err(Error::TableMissing) => Vec::new(),
            Err(e) => return Err(e),
        };
        let fpgm = match dir.read_table(stream, TAG_FPGM) {
            Ok(data) => data,
            Err(Error::TableMissing) => Vec::new(),
            Err(e) => return Err(e),
        };
        let prep = match dir.read_table(stream, TAG_PREP) {
            Ok(data) => data,
            Err(Error::TableMissing) => Vec::new(),
            Err(e) => return Err(e),
        };
        let sbit = SbitTable::load(stream, dir)?;

        let mut flags = FaceFlags::SCALABLE | FaceFlags::HORIZONTAL | FaceFlags::SFNT;
        if vert.is_some() {
            flags |= FaceFlags::VERTICAL;
        }
        if !kern.pairs.is_empty() {
            flags |= FaceFlags::KERNING;
        }
        if sbit.is_some() {
            flags |= FaceFlags::FIXED_SIZES;
        }
        if post.is_fixed_pitch {
            flags |= FaceFlags::FIXED_WIDTH;
        }

        let info = FaceInfo {
            flags,
            num_faces: dir.num_faces,
            num_glyphs: u32::from(maxp.num_glyphs),
            family_name: names.english_name(1),
            style_name: names.english_name(2),
            units_per_em: header.units_per_em,
            bbox: BBox {
                x_min: i32::from(header.x_min),
                y_min: i32::from(header.y_min),
                x_max: i32::from(header.x_max),
                y_max: i32::from(header.y_max),
            },
            ascender: hori_header.ascender,
            descender: hori_header.descender,
            height: hori_header.ascender - hori_header.descender + hori_header.line_gap,
            max_advance_width: hori_header.advance_max as i16,
            max_advance_height: vert
                .as_ref()
                .map(|(h, _)| h.advance_max as i16)
                .unwrap_or(hori_header.ascender - hori_header.descender + hori_header.line_gap),
            underline_position: post.underline_position,
            underline_thickness: post.underline_thickness,
            charmaps: charmaps.infos(),
        };

        debug!(
            "TrueType face: {} glyphs, {} units/em",
            maxp.num_glyphs, header.units_per_em
        );

        let postscript_name = names.english_name(6);

        Ok(TtFace {
            stream: Stream::from_memory(std::rc::Rc::new(Vec::new())),
            dir: SfntDirectory::empty(),
            info,
            maxp,
            hori_header,
            hori,
            vert,
            os2,
            post,
            charmaps,
            gasp,
            hdmx,
            kern,
            loca,
            cvt_base,
            fpgm,
            prep,
            sbit,
            postscript_name,
            sizes: Vec::new(),
        })
    }

    fn size_index(&self, id: SizeId) -> Option<usize> {
        self.sizes.iter().position(|s| s.id == id)
    }

    /// Builds the interpreter state for a size and runs the font and cvt
    /// programs at its metrics.
    fn reset_size(&mut self, index: usize) -> FontResult<()> {
        let metrics = self.sizes[index].metrics;
        let max_stack = usize::from(self.maxp.max_stack_elements).max(32) + 32;

        let mut exec = ExecState {
            storage: vec![0; usize::from(self.maxp.max_storage)],
            cvt: self
                .cvt_base
                .iter()
                .map(|&v| mul_fix(i32::from(v), metrics.y_scale))
                .collect(),
            functions: vec![None; usize::from(self.maxp.max_function_defs)],
            instruction_defs: Vec::new(),
            twilight: Zone::with_capacity(usize::from(self.maxp.max_twilight_points)),
            graphics_state: GraphicsState::default(),
        };

        if metrics.x_ppem == 0 {
            self.sizes[index].exec = exec;
            self.sizes[index].ready = false;
            return Ok(());
        }

        let exec_metrics = ExecMetrics {
            x_ppem: metrics.x_ppem,
            y_ppem: metrics.y_ppem,
            x_scale: metrics.x_scale,
            y_scale: metrics.y_scale,
            max_stack,
            pedantic: false,
            is_composite: false,
        };
        let mut scratch = Zone::default();
        if !self.fpgm.is_empty() {
            let mut ctx = ExecContext::new(
                &mut exec,
                &mut scratch,
                &self.fpgm,
                &self.prep,
                &[],
                exec_metrics,
            );
            ctx.run(CodeRange::Font)?;
        }
        if !self.prep.is_empty() {
            let mut ctx = ExecContext::new(
                &mut exec,
                &mut scratch,
                &self.fpgm,
                &self.prep,
                &[],
                exec_metrics,
            );
            ctx.run(CodeRange::Cvt)?;
        }

        self.sizes[index].exec = exec;
        self.sizes[index].ready = true;
        Ok(())
    }

    fn fill_bitmap_slot(
        &mut self,
        slot: &mut GlyphSlot,
        glyph_index: u32,
        x_ppem: u16,
        y_ppem: u16,
    ) -> FontResult<()> {
        let sbit = self.sbit.as_ref().ok_or(Error::InvalidArgument)?;
        let (bitmap, metrics) = load_sbit_image(
            &mut self.stream,
            &self.dir,
            sbit,
            glyph_index,
            x_ppem,
            y_ppem,
        )?;

        slot.outline.clear();
        slot.bitmap = bitmap;
        slot.bitmap_left = metrics.hori_bearing_x;
        slot.bitmap_top = metrics.hori_bearing_y;
        slot.metrics.width = metrics.width << 6;
        slot.metrics.height = metrics.height << 6;
        slot.metrics.hori_bearing_x = metrics.hori_bearing_x << 6;
        slot.metrics.hori_bearing_y = metrics.hori_bearing_y << 6;
        slot.metrics.hori_advance = metrics.hori_advance << 6;
        slot.metrics.vert_bearing_x = metrics.vert_bearing_x << 6;
        slot.metrics.vert_bearing_y = metrics.vert_bearing_y << 6;
        slot.metrics.vert_advance = metrics.vert_advance << 6;

        let (_, design_advance) = self.hori.lookup(glyph_index);
        slot.linear_hori_advance = i32::from(design_advance);
        slot.linear_vert_advance = i32::from(self.design_vert_advance(glyph_index));
        slot.format = GlyphFormat::Bitmap;
        Ok(())
    }

    fn design_vert_advance(&self, glyph_index: u32) -> i32 {
        if let Some((_, ref vmtx)) = self.vert {
            let (_, advance) = vmtx.lookup(glyph_index);
            return i32::from(advance);
        }
        if let Some(os2) = &self.os2 {
            return i32::from(os2.s_typo_ascender) - i32::from(os2.s_typo_descender)
                + i32::from(os2.s_typo_line_gap);
        }
        i32::from(self.hori_header.ascender)
            + i32::from(self.hori_header.descender)
            + i32::from(self.hori_header.line_gap)
    }

    fn vertical_design_metrics(&self, glyph_index: u32) -> (i32, i32) {
        // (top side bearing, advance height), font units.
        if let Some((_, ref vmtx)) = self.vert {
            let (tsb, advance) = vmtx.lookup(glyph_index);
            return (i32::from(tsb), i32::from(advance));
        }
        if let Some(os2) = &self.os2 {
            return (
                i32::from(os2.s_typo_line_gap) / 2,
                i32::from(os2.s_typo_ascender) - i32::from(os2.s_typo_descender)
                    + i32::from(os2.s_typo_line_gap),
            );
        }
        (
            i32::from(self.hori_header.line_gap) / 2,
            i32::from(self.hori_header.ascender)
                + i32::from(self.hori_header.descender)
                + i32::from(self.hori_header.line_gap),
        )
    }
}

impl DriverFace for TtFace {
    fn info(&self) -> &FaceInfo {
        &self.info
    }

    fn load_glyph(
        &mut self,
        slot: &mut GlyphSlot,
        size: Option<(SizeId, &SizeMetrics)>,
        glyph_index: u32,
        flags: LoadFlags,
    ) -> FontResult<()> {
        if glyph_index >= self.info.num_glyphs {
            return Err(Error::InvalidGlyphIndex);
        }

        // Embedded bitmaps win when a size is selected.
        if let Some((_, metrics)) = size {
            if !flags.contains(LoadFlags::NO_BITMAP) && self.sbit.is_some() {
                let (x_ppem, y_ppem) = (metrics.x_ppem, metrics.y_ppem);
                if self
                    .fill_bitmap_slot(slot, glyph_index, x_ppem, y_ppem)
                    .is_ok()
                {
                    return Ok(());
                }
            }
        }
        if flags.contains(LoadFlags::SBITS_ONLY) {
            return Err(Error::InvalidGlyphFormat);
        }

        let scaled = size.is_some() && !flags.contains(LoadFlags::NO_SCALE);
        let mut hinted = scaled && !flags.contains(LoadFlags::NO_HINTING);
        let pedantic = flags.contains(LoadFlags::PEDANTIC);

        // Make sure the size's interpreter state is live, and honor the
        // cvt program's instruction control.
        let mut size_slot: Option<usize> = None;
        if let Some((id, _)) = size {
            if let Some(index) = self.size_index(id) {
                if !self.sizes[index].ready && self.sizes[index].metrics.x_ppem != 0 {
                    self.reset_size(index)?;
                }
                let control = self.sizes[index].exec.graphics_state.instruct_control;
                if control & 1 != 0 {
                    hinted = false;
                }
                if control & 2 != 0 {
                    let preserved = control;
                    self.sizes[index].exec.graphics_state = GraphicsState::default();
                    self.sizes[index].exec.graphics_state.instruct_control = preserved;
                }
                size_slot = Some(index);
            } else {
                return Err(Error::InvalidHandle);
            }
        }

        self.dir.goto_table(&mut self.stream, TAG_GLYF)?;
        let glyf_start = self.stream.pos();

        let scale = if scaled {
            size.map(|(_, m)| (m.x_scale, m.y_scale))
        } else {
            None
        };

        let loaded = {
            let TtFace {
                ref mut stream,
                ref loca,
                ref hori,
                ref post,
                ref hori_header,
                ref maxp,
                ref fpgm,
                ref prep,
                ref mut sizes,
                ..
            } = *self;

            let hint_env = match (hinted, size_slot, size) {
                (true, Some(index), Some((_, metrics))) => Some(HintEnv {
                    state: &mut sizes[index].exec,
                    fpgm,
                    prep,
                    metrics: ExecMetrics {
                        x_ppem: metrics.x_ppem,
                        y_ppem: metrics.y_ppem,
                        x_scale: metrics.x_scale,
                        y_scale: metrics.y_scale,
                        max_stack: usize::from(maxp.max_stack_elements).max(32) + 32,
                        pedantic,
                        is_composite: false,
                    },
                }),
                _ => None,
            };

            let mut loader = GlyphLoader::new(
                stream,
                glyf_start,
                loca,
                hori,
                post.is_fixed_pitch,
                hori_header.advance_max,
                maxp,
                scale,
                hinted,
                pedantic,
                hint_env,
            );
            loader.load(glyph_index)?
        };

        // Move the outline so its origin sits at the left phantom point.
        let mut zone = loaded.zone;
        let shift = -loaded.pp1.x;
        for point in zone.cur.iter_mut() {
            point.x += shift;
        }

        slot.outline.points = zone.cur;
        slot.outline.tags = zone.tags;
        slot.outline.contours = zone.contours;

        let mut cbox = slot.outline.control_box();
        if hinted {
            cbox.x_min = floor_pos(cbox.x_min);
            cbox.y_min = floor_pos(cbox.y_min);
            cbox.x_max = ceil_pos(cbox.x_max);
            cbox.y_max = ceil_pos(cbox.y_max);
        }

        slot.metrics.hori_bearing_x = cbox.x_min;
        slot.metrics.hori_bearing_y = cbox.y_max;
        slot.metrics.hori_advance = loaded.pp2.x - loaded.pp1.x;
        slot.metrics.width = cbox.width();
        slot.metrics.height = cbox.height();

        slot.linear_hori_advance = loaded.advance as i32;
        slot.linear_vert_advance = self.design_vert_advance(glyph_index);

        // Vertical metrics, synthesized when the font has none.
        {
            let (top_bearing, advance_height) = self.vertical_design_metrics(glyph_index);
            let (mut top, mut advance) = if scaled {
                let scale_y = size.map(|(_, m)| m.y_scale).unwrap_or(0x10000);
                (
                    mul_fix(top_bearing + loaded.bbox_y_max, scale_y) - cbox.y_max,
                    mul_fix(advance_height, scale_y),
                )
            } else {
                (top_bearing + loaded.bbox_y_max - cbox.y_max, advance_height)
            };
            let mut left = (cbox.x_min - cbox.x_max) / 2;
            if hinted {
                left = floor_pos(left);
                top = ceil_pos(top);
                advance = round_pos(advance);
            }
            slot.metrics.vert_bearing_x = left;
            slot.metrics.vert_bearing_y = top;
            slot.metrics.vert_advance = advance;
        }

        // Prefer the device advance from `hdmx` when grid fitting.
        if hinted && !self.post.is_fixed_pitch {
            if let Some((_, metrics)) = size {
                if let Some(widths) = self.hdmx.widths_for_ppem(metrics.x_ppem) {
                    if let Some(&width) = widths.get(glyph_index as usize) {
                        slot.metrics.hori_advance = i32::from(width) << 6;
                    }
                }
            }
        }

        slot.format = GlyphFormat::Outline;
        Ok(())
    }

    fn char_index(&self, charmap: usize, code: u32) -> u32 {
        self.charmaps.char_index(charmap, code)
    }

    fn next_char(&self, charmap: usize, code: u32) -> Option<(u32, u32)> {
        self.charmaps.next_char(charmap, code)
    }

    fn init_size(&mut self, id: SizeId) -> FontResult<()> {
        self.sizes.push(TtSize {
            id,
            exec: ExecState::default(),
            metrics: SizeMetrics::default(),
            ready: false,
        });
        Ok(())
    }

    fn done_size(&mut self, id: SizeId) {
        self.sizes.retain(|s| s.id != id);
    }

    fn set_size(&mut self, id: SizeId, metrics: &mut SizeMetrics) -> FontResult<()> {
        let index = self.size_index(id).ok_or(Error::InvalidHandle)?;
        self.sizes[index].metrics = *metrics;
        self.reset_size(index)?;
        Ok(())
    }

    fn kerning(&self, left: u32, right: u32) -> Option<Vector> {
        if left > 0xFFFF || right > 0xFFFF {
            return None;
        }
        self.kern
            .lookup(left as u16, right as u16)
            .map(|value| Vector::new(i32::from(value), 0))
    }

    fn postscript_name(&self) -> Option<&str> {
        self.postscript_name.as_deref()
    }
}

fn load_loca(
    stream: &mut Stream,
    dir: &SfntDirectory,
    header: &Header,
    num_glyphs: u16,
) -> FontResult<Vec<u32>> {
    let data = dir.read_table(stream, TAG_LOCA)?;
    let wanted = usize::from(num_glyphs) + 1;
    let mut loca = Vec::with_capacity(wanted);
    if header.index_to_loc_format == 0 {
        let available = data.len() / 2;
        if available < wanted {
            warn!("short loca table ({} of {} entries)", available, wanted);
        }
        for pair in data.chunks_exact(2).take(wanted) {
            loca.push(u32::from(u16::from_be_bytes([pair[0], pair[1]])) * 2);
        }
    } else {
        let available = data.len() / 4;
        if available < wanted {
            warn!("short loca table ({} of {} entries)", available, wanted);
        }
        for quad in data.chunks_exact(4).take(wanted) {
            loca.push(u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]));
        }
    }
    if loca.len() < 2 {
        return Err(Error::InvalidTable);
    }
    Ok(loca)
}
