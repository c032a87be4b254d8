// glyphkit/src/module.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Pluggable modules: font drivers, renderers, and auto-hinters.
//!
//! A module is a kind tag plus a behavior object; the library keeps them in
//! registration order and dispatches face opens and glyph renders across
//! them.

use std::rc::Rc;

use crate::bitmap::RenderMode;
use crate::error::{Error, FontResult};
use crate::face::{FaceInfo, GlyphFormat, GlyphSlot, SizeId, SizeMetrics};
use crate::fixed::{Matrix, Vector};
use crate::hinting::LoadFlags;
use crate::stream::Stream;

/// Identity of a module: registry name and version.
#[derive(Clone, Copy, Debug)]
pub struct ModuleInfo {
    /// Unique registry name.
    pub name: &'static str,
    /// Module version, 16.16 (major.minor). A re-registration with a
    /// higher version replaces the module; a lower one is rejected.
    pub version: u32,
    /// Minimum library version required, 16.16.
    pub requires: u32,
}

bitflags! {
    /// Capabilities a font driver declares once.
    pub struct DriverFlags: u32 {
        /// Faces carry scalable outlines.
        const SCALABLE = 0x01;
        /// Glyphs are produced as outlines (as opposed to bitmaps only).
        const USES_OUTLINES = 0x02;
        /// The driver has a native hinter; the auto-hinter steps aside
        /// unless forced.
        const HAS_HINTER = 0x04;
    }
}

/// The outcome of a driver probe: a live face, or the stream handed back
/// together with the reason so the next driver can try.
pub type ProbeResult = Result<Box<dyn DriverFace>, (Stream, Error)>;

/// A font-format driver.
pub trait FontDriver {
    fn info(&self) -> ModuleInfo;

    fn flags(&self) -> DriverFlags;

    /// Probes `stream` and, on success, builds the driver-side face
    /// object, which takes ownership of the stream. Returning
    /// `UnknownFileFormat` makes the dispatch loop try the next driver;
    /// any other error aborts the open.
    fn init_face(&self, stream: Stream, face_index: u32) -> ProbeResult;
}

/// Per-face driver state and operations.
///
/// The format-independent bookkeeping (sizes, the glyph slot, transforms,
/// charmap selection) lives in [`crate::face::Face`]; this trait carries
/// everything format-specific.
pub trait DriverFace {
    /// The properties recorded at face-init time. Immutable afterwards.
    fn info(&self) -> &FaceInfo;

    /// Loads one glyph into `slot`. `size` is absent for unscaled loads.
    fn load_glyph(
        &mut self,
        slot: &mut GlyphSlot,
        size: Option<(SizeId, &SizeMetrics)>,
        glyph_index: u32,
        flags: LoadFlags,
    ) -> FontResult<()>;

    /// Maps a character code through the given charmap.
    fn char_index(&self, charmap: usize, code: u32) -> u32;

    /// Returns the first charcode strictly above `code` in the charmap,
    /// with its glyph index, or `None` at the end of the map.
    fn next_char(&self, charmap: usize, code: u32) -> Option<(u32, u32)>;

    /// Creates driver-side state for a new size object.
    fn init_size(&mut self, _id: SizeId) -> FontResult<()> {
        Ok(())
    }

    /// Discards driver-side state for a size object.
    fn done_size(&mut self, _id: SizeId) {}

    /// Notifies the driver that a size changed; the driver may override
    /// the computed metrics (the TrueType driver re-runs the cvt program
    /// here).
    fn set_size(&mut self, _id: SizeId, _metrics: &mut SizeMetrics) -> FontResult<()> {
        Ok(())
    }

    /// Unscaled kerning between two glyphs; `None` if the font has no
    /// kerning information.
    fn kerning(&self, _left: u32, _right: u32) -> Option<Vector> {
        None
    }

    /// Attaches an auxiliary resource (e.g. a metrics file) to the face.
    fn attach(&mut self, _stream: &mut Stream) -> FontResult<()> {
        Err(Error::UnimplementedFeature)
    }

    /// The glyph name for an index, if the format records names.
    fn glyph_name(&self, _glyph_index: u32) -> Option<&str> {
        None
    }

    /// The face's Postscript name, if known.
    fn postscript_name(&self) -> Option<&str> {
        None
    }
}

/// A glyph-format-specialized output stage.
pub trait Renderer {
    fn info(&self) -> ModuleInfo;

    /// The slot format this renderer accepts.
    fn glyph_format(&self) -> GlyphFormat;

    /// Rasterizes the slot's image into its bitmap. `pool` is the
    /// library's scratch buffer.
    fn render(
        &self,
        slot: &mut GlyphSlot,
        mode: RenderMode,
        origin: Vector,
        pool: &mut [u8],
    ) -> FontResult<()>;

    /// Applies a transform to the slot's image in place.
    fn transform_glyph(
        &self,
        slot: &mut GlyphSlot,
        matrix: &Matrix,
        delta: Vector,
    ) -> FontResult<()> {
        if slot.format != self.glyph_format() {
            return Err(Error::InvalidGlyphFormat);
        }
        slot.outline.transform(matrix);
        slot.outline.translate(delta.x, delta.y);
        Ok(())
    }
}

/// A whole-face hinting engine that replaces the driver's scaler.
pub trait AutoHinter {
    fn info(&self) -> ModuleInfo;

    /// Loads and hints one glyph through the driver face.
    fn load_glyph(
        &self,
        face: &mut dyn DriverFace,
        slot: &mut GlyphSlot,
        size: (SizeId, &SizeMetrics),
        glyph_index: u32,
        flags: LoadFlags,
    ) -> FontResult<()>;
}

/// A registered plugin.
#[derive(Clone)]
pub enum Module {
    Driver(Rc<dyn FontDriver>),
    Renderer(Rc<dyn Renderer>),
    AutoHinter(Rc<dyn AutoHinter>),
}

impl Module {
    pub fn info(&self) -> ModuleInfo {
        match self {
            Module::Driver(d) => d.info(),
            Module::Renderer(r) => r.info(),
            Module::AutoHinter(h) => h.info(),
        }
    }
}
