// glyphkit/src/library.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The library: a registry of modules and the entry point for opening
//! faces.

use log::{debug, trace};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::bitmap::RenderMode;
use crate::error::{Error, FontResult};
use crate::face::{Face, GlyphFormat, GlyphSlot};
use crate::fixed::{Matrix, Vector};
use crate::module::{AutoHinter, Module, Renderer};
use crate::stream::{Stream, StreamSource};

/// Upper bound on registered modules.
pub const MAX_MODULES: usize = 32;

/// Size of the scratch buffer handed to renderers.
pub const RENDER_POOL_SIZE: usize = 16384;

/// The library version, 16.16.
pub const LIBRARY_VERSION: u32 = 0x0001_0000;

struct LibraryCore {
    modules: Vec<Module>,
    renderers: Vec<Rc<dyn Renderer>>,
    cur_renderer: Option<Rc<dyn Renderer>>,
    auto_hinter: Option<Rc<dyn AutoHinter>>,
    raster_pool: Vec<u8>,
}

/// A process-wide font engine context.
///
/// Cloning a `Library` clones the handle, not the registry; faces keep a
/// handle to the library they were opened from.
#[derive(Clone)]
pub struct Library {
    core: Rc<RefCell<LibraryCore>>,
}

/// Describes how to open a face.
pub enum OpenSource {
    /// Open a file by path.
    Path(PathBuf),
    /// Wrap bytes already in memory.
    Memory(Rc<Vec<u8>>),
    /// Use a caller-supplied stream source.
    Stream(Box<dyn StreamSource>),
}

/// Arguments to [`Library::open_face`].
pub struct OpenArgs {
    pub source: OpenSource,
    /// Pin the open to one driver by registry name instead of probing.
    pub driver: Option<&'static str>,
}

impl Library {
    /// Creates a library with an empty module registry.
    pub fn new() -> Library {
        Library {
            core: Rc::new(RefCell::new(LibraryCore {
                modules: Vec::new(),
                renderers: Vec::new(),
                cur_renderer: None,
                auto_hinter: None,
                raster_pool: vec![0; RENDER_POOL_SIZE],
            })),
        }
    }

    /// Creates a library with the built-in format drivers registered:
    /// TrueType, Type 1, and CFF, in that probing order.
    pub fn with_default_modules() -> Library {
        let library = Library::new();
        library
            .add_module(Module::Driver(Rc::new(
                crate::truetype::TrueTypeDriver::new(),
            )))
            .expect("registry cannot be full yet");
        library
            .add_module(Module::Driver(Rc::new(
                crate::postscript::Type1Driver::new(),
            )))
            .expect("registry cannot be full yet");
        library
            .add_module(Module::Driver(Rc::new(crate::postscript::CffDriver::new())))
            .expect("registry cannot be full yet");
        library
    }

    /// Registers a module. A module with the same name is replaced when
    /// the new version is strictly higher and rejected otherwise.
    pub fn add_module(&self, module: Module) -> FontResult<()> {
        let info = module.info();
        if info.requires > LIBRARY_VERSION {
            return Err(Error::InvalidArgument);
        }
        let mut core = self.core.borrow_mut();
        if let Some(existing) = core.modules.iter().position(|m| m.info().name == info.name) {
            if info.version <= core.modules[existing].info().version {
                return Err(Error::LowerModuleVersion);
            }
            let old = core.modules.remove(existing);
            Self::unhook(&mut core, &old);
        }
        if core.modules.len() >= MAX_MODULES {
            return Err(Error::TooManyModules);
        }
        match &module {
            Module::Renderer(renderer) => {
                core.renderers.push(Rc::clone(renderer));
                Self::refresh_cur_renderer(&mut core);
            }
            Module::AutoHinter(hinter) => {
                core.auto_hinter = Some(Rc::clone(hinter));
            }
            Module::Driver(_) => {}
        }
        debug!("registered module `{}'", info.name);
        core.modules.push(module);
        Ok(())
    }

    /// Unregisters a module by name.
    pub fn remove_module(&self, name: &str) -> FontResult<()> {
        let mut core = self.core.borrow_mut();
        let index = core
            .modules
            .iter()
            .position(|m| m.info().name == name)
            .ok_or(Error::InvalidHandle)?;
        let module = core.modules.remove(index);
        Self::unhook(&mut core, &module);
        Ok(())
    }

    fn unhook(core: &mut LibraryCore, module: &Module) {
        match module {
            Module::Renderer(renderer) => {
                core.renderers
                    .retain(|r| r.info().name != renderer.info().name);
                Self::refresh_cur_renderer(core);
            }
            Module::AutoHinter(hinter) => {
                if core
                    .auto_hinter
                    .as_ref()
                    .map_or(false, |h| h.info().name == hinter.info().name)
                {
                    core.auto_hinter = None;
                }
            }
            Module::Driver(_) => {}
        }
    }

    fn refresh_cur_renderer(core: &mut LibraryCore) {
        core.cur_renderer = core
            .renderers
            .iter()
            .find(|r| r.glyph_format() == GlyphFormat::Outline)
            .cloned();
    }

    /// The registered auto-hinter, if any.
    pub(crate) fn auto_hinter(&self) -> Option<Rc<dyn AutoHinter>> {
        self.core.borrow().auto_hinter.clone()
    }

    /// Moves the named renderer to the head of the renderer list so later
    /// lookups of its format prefer it.
    pub fn set_renderer(&self, name: &str) -> FontResult<()> {
        let mut core = self.core.borrow_mut();
        let index = core
            .renderers
            .iter()
            .position(|r| r.info().name == name)
            .ok_or(Error::InvalidArgument)?;
        let renderer = core.renderers.remove(index);
        core.renderers.insert(0, renderer);
        Self::refresh_cur_renderer(&mut core);
        Ok(())
    }

    fn lookup_renderer(&self, format: GlyphFormat, after: usize) -> Option<(Rc<dyn Renderer>, usize)> {
        let core = self.core.borrow();
        if after == 0 && format == GlyphFormat::Outline {
            if let Some(renderer) = &core.cur_renderer {
                let position = core
                    .renderers
                    .iter()
                    .position(|r| r.info().name == renderer.info().name)
                    .unwrap_or(0);
                return Some((Rc::clone(renderer), position + 1));
            }
        }
        core.renderers
            .iter()
            .enumerate()
            .skip(after)
            .find(|(_, r)| r.glyph_format() == format)
            .map(|(i, r)| (Rc::clone(r), i + 1))
    }

    /// Renders a slot through the renderer chain for its format.
    pub(crate) fn render_slot(&self, slot: &mut GlyphSlot, mode: RenderMode) -> FontResult<()> {
        if slot.format == GlyphFormat::Bitmap {
            return Ok(());
        }
        let mut after = 0;
        let mut error = Error::UnimplementedFeature;
        let mut switched = false;
        while let Some((renderer, next)) = self.lookup_renderer(slot.format, after) {
            let result = {
                let mut core = self.core.borrow_mut();
                let pool = &mut core.raster_pool;
                renderer.render(slot, mode, Vector::zero(), pool)
            };
            match result {
                Ok(()) => {
                    if switched {
                        let _ = self.set_renderer(renderer.info().name);
                    }
                    return Ok(());
                }
                // Unsupported mode for this renderer; try another one for
                // the same format.
                Err(Error::CannotRenderGlyph) => {
                    error = Error::CannotRenderGlyph;
                    after = next;
                    switched = true;
                }
                Err(other) => return Err(other),
            }
        }
        Err(error)
    }

    /// Transforms a slot's image through the renderer for its format.
    pub(crate) fn transform_slot(
        &self,
        slot: &mut GlyphSlot,
        matrix: &Matrix,
        delta: Vector,
    ) -> FontResult<()> {
        match self.lookup_renderer(slot.format, 0) {
            Some((renderer, _)) => renderer.transform_glyph(slot, matrix, delta),
            // Outline slots can be transformed without a registered
            // renderer; anything else needs one.
            None if slot.format == GlyphFormat::Outline => {
                slot.outline.transform(matrix);
                slot.outline.translate(delta.x, delta.y);
                Ok(())
            }
            None => Err(Error::CannotRenderGlyph),
        }
    }

    // ----------------------------------------------------------------
    // Opening faces
    // ----------------------------------------------------------------

    /// Opens the face at `face_index` in the named file.
    pub fn new_face<P>(&self, path: P, face_index: u32) -> FontResult<Face>
    where
        P: Into<PathBuf>,
    {
        self.open_face(
            OpenArgs {
                source: OpenSource::Path(path.into()),
                driver: None,
            },
            face_index,
        )
    }

    /// Opens a face over bytes already in memory.
    pub fn new_memory_face(&self, bytes: Rc<Vec<u8>>, face_index: u32) -> FontResult<Face> {
        self.open_face(
            OpenArgs {
                source: OpenSource::Memory(bytes),
                driver: None,
            },
            face_index,
        )
    }

    /// Opens a face, probing each registered driver in order unless the
    /// arguments pin one.
    pub fn open_face(&self, args: OpenArgs, face_index: u32) -> FontResult<Face> {
        let stream = match args.source {
            OpenSource::Path(path) => Stream::from_path(path)?,
            OpenSource::Memory(bytes) => Stream::from_memory(bytes),
            OpenSource::Stream(source) => Stream::from_source(source),
        };

        let drivers: Vec<Rc<dyn crate::module::FontDriver>> = {
            let core = self.core.borrow();
            core.modules
                .iter()
                .filter_map(|m| match m {
                    Module::Driver(d) => Some(Rc::clone(d)),
                    _ => None,
                })
                .collect()
        };

        if let Some(name) = args.driver {
            let driver = drivers
                .iter()
                .find(|d| d.info().name == name)
                .ok_or(Error::InvalidHandle)?;
            return match driver.init_face(stream, face_index) {
                Ok(inner) => {
                    Face::from_parts(self.clone(), driver.info().name, driver.flags(), inner)
                }
                Err((_, error)) => Err(error),
            };
        }

        let mut stream = stream;
        for driver in &drivers {
            trace!("probing driver `{}'", driver.info().name);
            match driver.init_face(stream, face_index) {
                Ok(inner) => {
                    debug!("face opened by driver `{}'", driver.info().name);
                    return Face::from_parts(
                        self.clone(),
                        driver.info().name,
                        driver.flags(),
                        inner,
                    );
                }
                Err((returned, Error::UnknownFileFormat)) => stream = returned,
                Err((_, error)) => return Err(error),
            }
        }
        Err(Error::UnknownFileFormat)
    }
}

impl Default for Library {
    fn default() -> Library {
        Library::new()
    }
}
