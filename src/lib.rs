// glyphkit/src/lib.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#[macro_use]
extern crate bitflags;

pub mod bitmap;
pub mod error;
pub mod face;
pub mod fixed;
pub mod hinting;
pub mod library;
pub mod module;
pub mod outline;
pub mod postscript;
pub mod sfnt;
pub mod stream;
pub mod truetype;

#[cfg(test)]
mod test;
