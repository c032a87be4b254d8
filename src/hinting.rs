// glyphkit/src/hinting.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Glyph-load configuration.

bitflags! {
    /// Options accepted by `Face::load_glyph`.
    pub struct LoadFlags: u32 {
        /// Produce the outline in design units and inhibit hinting.
        const NO_SCALE = 0x0001;
        /// Scale but skip the hinter.
        const NO_HINTING = 0x0002;
        /// Do not consult the embedded-bitmap tables.
        const NO_BITMAP = 0x0004;
        /// Rasterize after loading.
        const RENDER = 0x0008;
        /// When rendering, produce 1-bit output.
        const MONOCHROME = 0x0010;
        /// Bytecode and charstring errors fail the load instead of being
        /// swallowed.
        const PEDANTIC = 0x0020;
        /// Do not apply the face transform.
        const IGNORE_TRANSFORM = 0x0040;
        /// Interpret the advance vertically; synthesize vertical metrics
        /// if the font has none.
        const VERTICAL_LAYOUT = 0x0080;
        /// Use the auto-hinter even if the driver has a native hinter.
        const FORCE_AUTOHINT = 0x0100;
        /// Only succeed if an embedded bitmap exists at this size.
        const SBITS_ONLY = 0x0200;
        /// Leave the linear advances in design units.
        const LINEAR_DESIGN = 0x0400;
        /// Internal: loading a composite sub-element. Implies `NO_SCALE`,
        /// `NO_HINTING`, and `IGNORE_TRANSFORM`, and clears `RENDER`.
        const NO_RECURSE = 0x0800;
    }
}

impl LoadFlags {
    /// Expands the implications of `NO_RECURSE`, as done at the top of
    /// every glyph load.
    pub fn normalize(mut self) -> LoadFlags {
        if self.contains(LoadFlags::NO_RECURSE) {
            self |= LoadFlags::NO_SCALE | LoadFlags::NO_HINTING | LoadFlags::IGNORE_TRANSFORM;
            self.remove(LoadFlags::RENDER);
        }
        if self.contains(LoadFlags::NO_SCALE) {
            self |= LoadFlags::NO_HINTING | LoadFlags::NO_BITMAP;
        }
        self
    }
}

/// How `Face::kerning` scales its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KerningMode {
    /// Grid-fitted 26.6 pixel distances.
    Default,
    /// Scaled to 26.6 pixels but not rounded.
    Unfitted,
    /// Raw font units.
    Unscaled,
}

#[cfg(test)]
mod tests {
    use super::LoadFlags;

    #[test]
    fn no_recurse_expansion() {
        let flags = (LoadFlags::NO_RECURSE | LoadFlags::RENDER).normalize();
        assert!(flags.contains(LoadFlags::NO_SCALE));
        assert!(flags.contains(LoadFlags::NO_HINTING));
        assert!(flags.contains(LoadFlags::IGNORE_TRANSFORM));
        assert!(!flags.contains(LoadFlags::RENDER));
    }
}
