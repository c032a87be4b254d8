// glyphkit/src/face.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Faces, sizes, and the glyph slot.

use log::warn;

use crate::bitmap::{Bitmap, RenderMode};
use crate::error::{Error, FontResult};
use crate::fixed::{div_fix, mul_div, mul_fix, round_pos, BBox, Fixed, Matrix, Pos, Vector, FIXED_ONE};
use crate::hinting::{KerningMode, LoadFlags};
use crate::library::Library;
use crate::module::{DriverFace, DriverFlags};
use crate::stream::Stream;

bitflags! {
    /// Capabilities recorded on a face at init time.
    pub struct FaceFlags: u32 {
        /// The face carries scalable outlines.
        const SCALABLE = 0x0001;
        /// The face carries embedded bitmap strikes.
        const FIXED_SIZES = 0x0002;
        /// All glyphs share one advance width.
        const FIXED_WIDTH = 0x0004;
        /// The resource is sfnt-wrapped.
        const SFNT = 0x0008;
        /// Horizontal metrics are present.
        const HORIZONTAL = 0x0010;
        /// Vertical metrics are present.
        const VERTICAL = 0x0020;
        /// The face has kerning information.
        const KERNING = 0x0040;
        /// Glyph names are available.
        const GLYPH_NAMES = 0x0080;
    }
}

/// The character encoding a charmap speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Unicode,
    MacRoman,
    AppleRoman,
    Symbol,
    AdobeStandard,
    AdobeCustom,
    Latin1,
    None,
}

/// One character-to-glyph mapping of a face.
#[derive(Clone, Copy, Debug)]
pub struct CharmapInfo {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub encoding: Encoding,
}

/// The immutable face-wide properties a driver fills in at init time.
#[derive(Clone, Debug, Default)]
pub struct FaceInfo {
    pub flags: FaceFlags,
    pub num_faces: u32,
    pub num_glyphs: u32,
    pub family_name: Option<String>,
    pub style_name: Option<String>,
    /// Font units per em; 0 for pure bitmap faces.
    pub units_per_em: u16,
    /// Global bounding box in font units.
    pub bbox: BBox,
    pub ascender: i16,
    pub descender: i16,
    pub height: i16,
    pub max_advance_width: i16,
    pub max_advance_height: i16,
    pub underline_position: i16,
    pub underline_thickness: i16,
    pub charmaps: Vec<CharmapInfo>,
}

impl Default for FaceFlags {
    fn default() -> FaceFlags {
        FaceFlags::empty()
    }
}

/// A stable identifier for a size object within its face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeId(pub(crate) u32);

/// Scaled metrics of an active size.
#[derive(Clone, Copy, Debug, Default)]
pub struct SizeMetrics {
    pub x_ppem: u16,
    pub y_ppem: u16,
    /// 16.16 scale from font units to 26.6 pixels.
    pub x_scale: Fixed,
    pub y_scale: Fixed,
    /// Scaled ascender/descender/height/max advance, 26.6, grid-rounded.
    pub ascender: Pos,
    pub descender: Pos,
    pub height: Pos,
    pub max_advance: Pos,
}

struct SizeRec {
    id: SizeId,
    metrics: SizeMetrics,
}

/// The image kind currently held by a glyph slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlyphFormat {
    None,
    Outline,
    Bitmap,
    Composite,
}

impl Default for GlyphFormat {
    fn default() -> GlyphFormat {
        GlyphFormat::None
    }
}

/// Scaled metrics of the glyph in the slot, 26.6.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlyphMetrics {
    pub width: Pos,
    pub height: Pos,
    pub hori_bearing_x: Pos,
    pub hori_bearing_y: Pos,
    pub hori_advance: Pos,
    pub vert_bearing_x: Pos,
    pub vert_bearing_y: Pos,
    pub vert_advance: Pos,
}

/// The scratchpad one glyph is loaded into.
#[derive(Default)]
pub struct GlyphSlot {
    pub format: GlyphFormat,
    pub outline: crate::outline::Outline,
    pub bitmap: Bitmap,
    /// Bitmap origin relative to the pen position, pixels.
    pub bitmap_left: i32,
    pub bitmap_top: i32,
    pub metrics: GlyphMetrics,
    /// Unrounded design advances scaled to the current ppem, 16.16.
    /// Left in design units under `LINEAR_DESIGN`.
    pub linear_hori_advance: Fixed,
    pub linear_vert_advance: Fixed,
    /// The advance vector for this glyph under the requested layout.
    pub advance: Vector,
}

impl GlyphSlot {
    /// Resets the slot to the defined empty state.
    pub fn clear(&mut self) {
        self.format = GlyphFormat::None;
        self.outline.clear();
        self.bitmap.clear();
        self.bitmap_left = 0;
        self.bitmap_top = 0;
        self.metrics = GlyphMetrics::default();
        self.linear_hori_advance = 0;
        self.linear_vert_advance = 0;
        self.advance = Vector::zero();
    }
}

/// A single face of an opened font resource.
pub struct Face {
    library: Library,
    driver_name: &'static str,
    driver_flags: DriverFlags,
    inner: Box<dyn DriverFace>,
    sizes: Vec<SizeRec>,
    next_size_id: u32,
    active_size: Option<SizeId>,
    slot: GlyphSlot,
    charmap: Option<usize>,
    matrix: Matrix,
    delta: Vector,
}

impl Face {
    pub(crate) fn from_parts(
        library: Library,
        driver_name: &'static str,
        driver_flags: DriverFlags,
        inner: Box<dyn DriverFace>,
    ) -> FontResult<Face> {
        let mut face = Face {
            library,
            driver_name,
            driver_flags,
            inner,
            sizes: Vec::new(),
            next_size_id: 0,
            active_size: None,
            slot: GlyphSlot::default(),
            charmap: None,
            matrix: Matrix::IDENTITY,
            delta: Vector::zero(),
        };
        let default_size = face.new_size()?;
        face.activate_size(default_size)?;

        // Prefer a Unicode charmap when the font has one.
        face.charmap = face
            .info()
            .charmaps
            .iter()
            .position(|cm| cm.encoding == Encoding::Unicode)
            .or_else(|| if face.info().charmaps.is_empty() { None } else { Some(0) });
        Ok(face)
    }

    /// The driver this face was opened through.
    #[inline]
    pub fn driver_name(&self) -> &'static str {
        self.driver_name
    }

    /// The immutable face properties.
    #[inline]
    pub fn info(&self) -> &FaceInfo {
        self.inner.info()
    }

    #[inline]
    pub fn num_glyphs(&self) -> u32 {
        self.info().num_glyphs
    }

    /// The last loaded glyph.
    #[inline]
    pub fn glyph(&self) -> &GlyphSlot {
        &self.slot
    }

    /// The metrics of the active size, if one is active.
    pub fn size_metrics(&self) -> Option<&SizeMetrics> {
        let id = self.active_size?;
        self.sizes.iter().find(|s| s.id == id).map(|s| &s.metrics)
    }

    // ----------------------------------------------------------------
    // Sizes
    // ----------------------------------------------------------------

    /// Creates a new size object for this face. The new size is not
    /// activated.
    pub fn new_size(&mut self) -> FontResult<SizeId> {
        let id = SizeId(self.next_size_id);
        self.next_size_id += 1;
        self.inner.init_size(id)?;
        self.sizes.push(SizeRec {
            id,
            metrics: SizeMetrics::default(),
        });
        Ok(id)
    }

    /// Makes `id` the active size.
    pub fn activate_size(&mut self, id: SizeId) -> FontResult<()> {
        if self.sizes.iter().any(|s| s.id == id) {
            self.active_size = Some(id);
            Ok(())
        } else {
            Err(Error::UnlistedObject)
        }
    }

    /// Destroys a size object. If it was active, the head of the size
    /// list becomes the active size.
    pub fn done_size(&mut self, id: SizeId) -> FontResult<()> {
        let index = self
            .sizes
            .iter()
            .position(|s| s.id == id)
            .ok_or(Error::UnlistedObject)?;
        self.sizes.remove(index);
        self.inner.done_size(id);
        if self.active_size == Some(id) {
            self.active_size = self.sizes.first().map(|s| s.id);
        }
        Ok(())
    }

    fn active_metrics_mut(&mut self) -> FontResult<(&mut SizeMetrics, SizeId)> {
        let id = self.active_size.ok_or(Error::InvalidHandle)?;
        let rec = self
            .sizes
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(Error::InvalidHandle)?;
        Ok((&mut rec.metrics, id))
    }

    /// Sets the active size from a character size in 26.6 points and a
    /// resolution in dpi.
    pub fn set_char_size(
        &mut self,
        char_width: Pos,
        char_height: Pos,
        horz_resolution: u32,
        vert_resolution: u32,
    ) -> FontResult<()> {
        let mut char_width = char_width;
        let mut char_height = char_height;
        if char_width == 0 {
            char_width = char_height;
        } else if char_height == 0 {
            char_height = char_width;
        }
        let horz_resolution = if horz_resolution == 0 { 72 } else { horz_resolution };
        let vert_resolution = if vert_resolution == 0 { 72 } else { vert_resolution };
        char_width = char_width.max(64);
        char_height = char_height.max(64);

        let dim_x = round_pos(mul_div(char_width, horz_resolution as i32, 72));
        let dim_y = round_pos(mul_div(char_height, vert_resolution as i32, 72));

        self.apply_pixel_dims(dim_x, dim_y)
    }

    /// Sets the active size from integer pixel dimensions.
    pub fn set_pixel_sizes(&mut self, pixel_width: u32, pixel_height: u32) -> FontResult<()> {
        let mut pixel_width = pixel_width;
        let mut pixel_height = pixel_height;
        if pixel_width == 0 {
            pixel_width = pixel_height;
        } else if pixel_height == 0 {
            pixel_height = pixel_width;
        }
        pixel_width = pixel_width.max(1);
        pixel_height = pixel_height.max(1);
        self.apply_pixel_dims((pixel_width as i32) << 6, (pixel_height as i32) << 6)
    }

    fn apply_pixel_dims(&mut self, dim_x: Pos, dim_y: Pos) -> FontResult<()> {
        let info = self.info();
        let scalable = info.flags.contains(FaceFlags::SCALABLE);
        let units_per_em = i32::from(info.units_per_em);
        let design = (
            i32::from(info.ascender),
            i32::from(info.descender),
            i32::from(info.height),
            i32::from(info.max_advance_width),
        );

        let (metrics, id) = self.active_metrics_mut()?;
        metrics.x_ppem = (dim_x >> 6) as u16;
        metrics.y_ppem = (dim_y >> 6) as u16;
        metrics.x_scale = FIXED_ONE;
        metrics.y_scale = FIXED_ONE;

        if scalable && units_per_em > 0 {
            metrics.x_scale = div_fix(dim_x, units_per_em);
            metrics.y_scale = div_fix(dim_y, units_per_em);
            metrics.ascender = round_pos(mul_fix(design.0, metrics.y_scale));
            metrics.descender = round_pos(mul_fix(design.1, metrics.y_scale));
            metrics.height = round_pos(mul_fix(design.2, metrics.y_scale));
            metrics.max_advance = round_pos(mul_fix(design.3, metrics.x_scale));
        }

        let mut metrics_copy = *metrics;
        self.inner.set_size(id, &mut metrics_copy)?;
        let (metrics, _) = self.active_metrics_mut()?;
        *metrics = metrics_copy;
        Ok(())
    }

    // ----------------------------------------------------------------
    // Charmaps
    // ----------------------------------------------------------------

    /// Selects the first charmap with the given encoding.
    pub fn select_charmap(&mut self, encoding: Encoding) -> FontResult<()> {
        let index = self
            .info()
            .charmaps
            .iter()
            .position(|cm| cm.encoding == encoding)
            .ok_or(Error::InvalidArgument)?;
        self.charmap = Some(index);
        Ok(())
    }

    /// Selects a charmap by index into `info().charmaps`.
    pub fn set_charmap(&mut self, index: usize) -> FontResult<()> {
        if index >= self.info().charmaps.len() {
            return Err(Error::InvalidArgument);
        }
        self.charmap = Some(index);
        Ok(())
    }

    /// The index of the currently selected charmap.
    #[inline]
    pub fn charmap_index(&self) -> Option<usize> {
        self.charmap
    }

    /// Maps a character code to a glyph index; 0 when absent or when no
    /// charmap is selected.
    pub fn char_index(&self, code: u32) -> u32 {
        match self.charmap {
            Some(index) => self.inner.char_index(index, code),
            None => 0,
        }
    }

    /// The first character code in the selected charmap with its glyph.
    pub fn first_char(&self) -> Option<(u32, u32)> {
        let charmap = self.charmap?;
        let gid = self.inner.char_index(charmap, 0);
        if gid != 0 {
            return Some((0, gid));
        }
        self.inner.next_char(charmap, 0)
    }

    /// The next character code after `code`, with its glyph.
    pub fn next_char(&self, code: u32) -> Option<(u32, u32)> {
        let charmap = self.charmap?;
        self.inner.next_char(charmap, code)
    }

    // ----------------------------------------------------------------
    // Transform
    // ----------------------------------------------------------------

    /// Sets the transform applied to glyphs at load time. `None` resets
    /// to identity / zero.
    pub fn set_transform(&mut self, matrix: Option<Matrix>, delta: Option<Vector>) {
        self.matrix = matrix.unwrap_or(Matrix::IDENTITY);
        self.delta = delta.unwrap_or_else(Vector::zero);
    }

    fn transform_pending(&self) -> bool {
        !self.matrix.is_identity() || self.delta != Vector::zero()
    }

    // ----------------------------------------------------------------
    // Glyph loading
    // ----------------------------------------------------------------

    /// Loads a glyph into the slot.
    pub fn load_glyph(&mut self, glyph_index: u32, flags: LoadFlags) -> FontResult<()> {
        if glyph_index >= self.info().num_glyphs {
            return Err(Error::InvalidGlyphIndex);
        }
        let flags = flags.normalize();
        self.slot.clear();

        let scaled = !flags.contains(LoadFlags::NO_SCALE);
        if scaled && self.active_size.is_none() {
            return Err(Error::InvalidHandle);
        }

        let size = match (scaled, self.active_size) {
            (true, Some(id)) => {
                let metrics = *self
                    .sizes
                    .iter()
                    .find(|s| s.id == id)
                    .map(|s| &s.metrics)
                    .ok_or(Error::InvalidHandle)?;
                Some((id, metrics))
            }
            _ => None,
        };

        // Decide whether the auto-hinter takes over this load.
        let hinter = self.library.auto_hinter();
        let mut autohint = hinter.is_some()
            && !flags.intersects(LoadFlags::NO_SCALE | LoadFlags::NO_HINTING)
            && self.driver_flags.contains(DriverFlags::SCALABLE)
            && self.driver_flags.contains(DriverFlags::USES_OUTLINES);
        if autohint
            && self.driver_flags.contains(DriverFlags::HAS_HINTER)
            && !flags.contains(LoadFlags::FORCE_AUTOHINT)
        {
            autohint = false;
        }

        let result = if autohint {
            let hinter = hinter.unwrap();
            let (id, metrics) = size.unwrap();

            // Embedded bitmaps still win over the auto-hinter.
            let mut loaded = false;
            if self.info().flags.contains(FaceFlags::FIXED_SIZES)
                && !flags.contains(LoadFlags::NO_BITMAP)
            {
                let sbit_flags = flags | LoadFlags::SBITS_ONLY;
                if self
                    .inner
                    .load_glyph(&mut self.slot, Some((id, &metrics)), glyph_index, sbit_flags)
                    .is_ok()
                    && self.slot.format == GlyphFormat::Bitmap
                {
                    loaded = true;
                }
            }
            if loaded {
                Ok(())
            } else {
                hinter.load_glyph(
                    &mut *self.inner,
                    &mut self.slot,
                    (id, &metrics),
                    glyph_index,
                    flags,
                )
            }
        } else {
            let size_ref = size.as_ref().map(|&(id, ref m)| (id, m));
            self.inner
                .load_glyph(&mut self.slot, size_ref, glyph_index, flags)
                .and_then(|()| {
                    if self.slot.format == GlyphFormat::Outline {
                        self.slot.outline.check()
                    } else {
                        Ok(())
                    }
                })
        };

        if let Err(error) = result {
            self.slot.clear();
            return Err(error);
        }

        // The advance under the requested layout.
        if flags.contains(LoadFlags::VERTICAL_LAYOUT) {
            self.slot.advance = Vector::new(0, self.slot.metrics.vert_advance);
        } else {
            self.slot.advance = Vector::new(self.slot.metrics.hori_advance, 0);
        }

        // Linear advances: design units scaled to the current ppem in
        // 16.16, unless the caller asked for raw design values.
        if !flags.contains(LoadFlags::LINEAR_DESIGN) {
            let em = i32::from(self.info().units_per_em);
            if em > 0 {
                if let Some((_, ref metrics)) = size {
                    self.slot.linear_hori_advance = mul_div(
                        self.slot.linear_hori_advance,
                        (i32::from(metrics.x_ppem)) << 16,
                        em,
                    );
                    self.slot.linear_vert_advance = mul_div(
                        self.slot.linear_vert_advance,
                        (i32::from(metrics.y_ppem)) << 16,
                        em,
                    );
                }
            }
        }

        if !flags.contains(LoadFlags::IGNORE_TRANSFORM) && self.transform_pending() {
            match self.library.transform_slot(&mut self.slot, &self.matrix, self.delta) {
                Ok(()) => {}
                Err(Error::CannotRenderGlyph) | Err(Error::UnimplementedFeature) => {
                    warn!("no renderer to transform glyph format {:?}", self.slot.format);
                }
                Err(e) => return Err(e),
            }
            self.slot.advance = self.matrix.transform_vector(self.slot.advance);
        }

        if flags.contains(LoadFlags::RENDER)
            && self.slot.format != GlyphFormat::Bitmap
            && self.slot.format != GlyphFormat::Composite
        {
            let mode = if flags.contains(LoadFlags::MONOCHROME) {
                RenderMode::Mono
            } else {
                RenderMode::Normal
            };
            self.library.render_slot(&mut self.slot, mode)?;
        }

        Ok(())
    }

    /// Shorthand for `char_index` + `load_glyph`.
    pub fn load_char(&mut self, char_code: u32, flags: LoadFlags) -> FontResult<()> {
        let glyph_index = if self.charmap.is_some() {
            self.char_index(char_code)
        } else {
            char_code
        };
        self.load_glyph(glyph_index, flags)
    }

    /// Rasterizes the current slot through the appropriate renderer.
    pub fn render_glyph(&mut self, mode: RenderMode) -> FontResult<()> {
        self.library.render_slot(&mut self.slot, mode)
    }

    // ----------------------------------------------------------------
    // Kerning and extras
    // ----------------------------------------------------------------

    /// The kerning vector between two glyphs. Zero when the face has no
    /// kerning information.
    pub fn kerning(&self, left: u32, right: u32, mode: KerningMode) -> FontResult<Vector> {
        let mut kerning = match self.inner.kerning(left, right) {
            Some(v) => v,
            None => return Ok(Vector::zero()),
        };
        if mode != KerningMode::Unscaled {
            let metrics = self.size_metrics().ok_or(Error::InvalidHandle)?;
            kerning.x = mul_fix(kerning.x, metrics.x_scale);
            kerning.y = mul_fix(kerning.y, metrics.y_scale);
            if mode == KerningMode::Default {
                kerning.x = round_pos(kerning.x);
                kerning.y = round_pos(kerning.y);
            }
        }
        Ok(kerning)
    }

    /// Attaches an auxiliary stream (e.g. metrics) through the driver.
    pub fn attach_stream(&mut self, stream: &mut Stream) -> FontResult<()> {
        self.inner.attach(stream)
    }

    /// The glyph name for an index, when the format records names.
    pub fn glyph_name(&self, glyph_index: u32) -> Option<&str> {
        if glyph_index >= self.info().num_glyphs {
            return None;
        }
        self.inner.glyph_name(glyph_index)
    }

    /// The face's Postscript name, if known.
    pub fn postscript_name(&self) -> Option<&str> {
        self.inner.postscript_name()
    }
}
