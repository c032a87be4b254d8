// glyphkit/src/stream.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Byte-oriented access to a font resource.
//!
//! A [`Stream`] may be memory-backed, file-backed, or driven by a caller
//! supplied [`StreamSource`]. Parsers read either directly (`read`,
//! `read_u16`, ...) or through a *frame*: a window of exactly `n` bytes
//! acquired up front with [`Stream::frame`], then consumed with cursor
//! getters. The frame borrows the stream mutably, so at most one frame is
//! live at a time and it is released on every exit path when it drops.

use byteorder::{BigEndian, ByteOrder};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::rc::Rc;

use crate::error::{Error, FontResult};
use crate::fixed::Tag;

/// A caller-supplied random-access byte source.
pub trait StreamSource {
    /// Total size of the resource in bytes.
    fn len(&self) -> u64;
    /// Reads up to `buf.len()` bytes at `pos`, returning the count read.
    fn read_at(&mut self, pos: u64, buf: &mut [u8]) -> std::io::Result<usize>;
}

enum Backing {
    Memory(Rc<Vec<u8>>),
    File(File),
    User(Box<dyn StreamSource>),
}

/// A positioned byte stream over a font resource.
pub struct Stream {
    backing: Backing,
    pos: u64,
    size: u64,
}

impl Stream {
    /// Wraps a shared byte buffer. No I/O is ever performed.
    pub fn from_memory(bytes: Rc<Vec<u8>>) -> Stream {
        let size = bytes.len() as u64;
        Stream {
            backing: Backing::Memory(bytes),
            pos: 0,
            size,
        }
    }

    /// Opens a file-backed stream; the stream owns the descriptor.
    pub fn from_path<P>(path: P) -> FontResult<Stream>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).map_err(|_| Error::CannotOpenResource)?;
        let size = file
            .metadata()
            .map_err(|_| Error::CannotOpenResource)?
            .len();
        Ok(Stream {
            backing: Backing::File(file),
            pos: 0,
            size,
        })
    }

    /// Wraps a caller-supplied source. The caller keeps lifetime
    /// responsibility for whatever the source refers to.
    pub fn from_source(source: Box<dyn StreamSource>) -> Stream {
        let size = source.len();
        Stream {
            backing: Backing::User(source),
            pos: 0,
            size,
        }
    }

    /// Total stream size in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.size
    }

    /// Current read position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Moves the read position to `pos`.
    pub fn seek(&mut self, pos: u64) -> FontResult<()> {
        if pos > self.size {
            return Err(Error::InvalidStreamSeek);
        }
        self.pos = pos;
        Ok(())
    }

    /// Skips `count` bytes forward.
    pub fn skip(&mut self, count: u64) -> FontResult<()> {
        let new_pos = self.pos.checked_add(count).ok_or(Error::InvalidStreamSeek)?;
        self.seek(new_pos)
    }

    /// Reads exactly `buf.len()` bytes at the current position.
    ///
    /// A short read fails with `InvalidStreamRead(n)` where `n` is the
    /// number of bytes actually placed in `buf`; the position still
    /// advances by `n` so EOF-tolerant parsers can resume.
    pub fn read(&mut self, buf: &mut [u8]) -> FontResult<()> {
        let wanted = buf.len();
        let got = self.read_raw(buf)?;
        if got != wanted {
            return Err(Error::InvalidStreamRead(got));
        }
        Ok(())
    }

    /// Seeks to `pos` and reads exactly `buf.len()` bytes.
    pub fn read_at(&mut self, pos: u64, buf: &mut [u8]) -> FontResult<()> {
        self.seek(pos)?;
        self.read(buf)
    }

    fn read_raw(&mut self, buf: &mut [u8]) -> FontResult<usize> {
        let got = match self.backing {
            Backing::Memory(ref bytes) => {
                let start = self.pos.min(self.size) as usize;
                let avail = bytes.len() - start;
                let n = buf.len().min(avail);
                buf[..n].copy_from_slice(&bytes[start..start + n]);
                n
            }
            Backing::File(ref mut file) => {
                file.seek(SeekFrom::Start(self.pos))
                    .map_err(|_| Error::InvalidStreamSeek)?;
                let mut total = 0;
                while total < buf.len() {
                    match file.read(&mut buf[total..]) {
                        Ok(0) => break,
                        Ok(n) => total += n,
                        Err(e) => return Err(e.into()),
                    }
                }
                total
            }
            Backing::User(ref mut source) => source
                .read_at(self.pos, buf)
                .map_err(Error::from)?,
        };
        self.pos += got as u64;
        Ok(got)
    }

    /// Acquires a frame of exactly `count` bytes starting at the current
    /// position. Fails with `InvalidStreamRead` if fewer bytes remain.
    /// The stream position after the frame drops is the frame's end.
    pub fn frame(&mut self, count: usize) -> FontResult<Frame> {
        if self.pos + count as u64 > self.size {
            return Err(Error::InvalidStreamRead(
                (self.size - self.pos.min(self.size)) as usize,
            ));
        }
        let data = match self.backing {
            Backing::Memory(ref bytes) => {
                let start = self.pos as usize;
                self.pos += count as u64;
                FrameData::Borrowed(&bytes[start..start + count])
            }
            _ => {
                let mut buffer = vec![0; count];
                self.read(&mut buffer)?;
                FrameData::Owned(buffer)
            }
        };
        Ok(Frame { data, cursor: 0 })
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> FontResult<u8> {
        let mut buf = [0; 1];
        self.read(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16(&mut self) -> FontResult<u16> {
        let mut buf = [0; 2];
        self.read(&mut buf)?;
        Ok(BigEndian::read_u16(&buf))
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32(&mut self) -> FontResult<u32> {
        let mut buf = [0; 4];
        self.read(&mut buf)?;
        Ok(BigEndian::read_u32(&buf))
    }
}

enum FrameData<'a> {
    Borrowed(&'a [u8]),
    Owned(Vec<u8>),
}

/// A cursor over an acquired stream frame.
pub struct Frame<'a> {
    data: FrameData<'a>,
    cursor: usize,
}

impl<'a> Frame<'a> {
    #[inline]
    fn bytes(&self) -> &[u8] {
        match self.data {
            FrameData::Borrowed(slice) => slice,
            FrameData::Owned(ref vec) => vec,
        }
    }

    /// Bytes left in the frame.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes().len() - self.cursor
    }

    fn take(&mut self, count: usize) -> FontResult<&[u8]> {
        if self.remaining() < count {
            return Err(Error::InvalidStreamRead(self.remaining()));
        }
        let start = self.cursor;
        self.cursor += count;
        match self.data {
            FrameData::Borrowed(slice) => Ok(&slice[start..start + count]),
            FrameData::Owned(ref vec) => Ok(&vec[start..start + count]),
        }
    }

    pub fn get_u8(&mut self) -> FontResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn get_i8(&mut self) -> FontResult<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn get_u16(&mut self) -> FontResult<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn get_i16(&mut self) -> FontResult<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    pub fn get_u32(&mut self) -> FontResult<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn get_i32(&mut self) -> FontResult<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    pub fn get_tag(&mut self) -> FontResult<Tag> {
        Ok(Tag(BigEndian::read_u32(self.take(4)?)))
    }

    /// Copies `count` raw bytes out of the frame.
    pub fn get_bytes(&mut self, count: usize) -> FontResult<&[u8]> {
        self.take(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_stream(bytes: &[u8]) -> Stream {
        Stream::from_memory(Rc::new(bytes.to_vec()))
    }

    #[test]
    fn read_and_seek() {
        let mut stream = memory_stream(&[1, 2, 3, 4, 5]);
        let mut buf = [0; 2];
        stream.read(&mut buf).unwrap();
        assert_eq!(buf, [1, 2]);
        assert_eq!(stream.pos(), 2);
        stream.seek(4).unwrap();
        stream.read(&mut buf).unwrap_err();
        assert_eq!(stream.seek(6), Err(Error::InvalidStreamSeek));
    }

    #[test]
    fn short_read_reports_count() {
        let mut stream = memory_stream(&[1, 2, 3]);
        let mut buf = [0; 8];
        assert_eq!(stream.read(&mut buf), Err(Error::InvalidStreamRead(3)));
        assert_eq!(buf[..3], [1, 2, 3]);
    }

    #[test]
    fn frame_getters_advance_and_bound() {
        let mut stream = memory_stream(&[0x00, 0x01, 0xff, 0xfe, b'g', b'l', b'y', b'f', 9]);
        {
            let mut frame = stream.frame(8).unwrap();
            assert_eq!(frame.get_u16().unwrap(), 1);
            assert_eq!(frame.get_i16().unwrap(), -2);
            assert_eq!(frame.get_tag().unwrap(), Tag::new(b"glyf"));
            assert_eq!(frame.get_u8(), Err(Error::InvalidStreamRead(0)));
        }
        // frame dropped; stream resumes at frame end
        assert_eq!(stream.pos(), 8);
        assert_eq!(stream.read_u8().unwrap(), 9);
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut stream = memory_stream(&[0; 4]);
        stream.seek(2).unwrap();
        assert!(stream.frame(3).is_err());
        assert!(stream.frame(2).is_ok());
    }

    struct EchoSource(Vec<u8>);

    impl StreamSource for EchoSource {
        fn len(&self) -> u64 {
            self.0.len() as u64
        }
        fn read_at(&mut self, pos: u64, buf: &mut [u8]) -> std::io::Result<usize> {
            let start = (pos as usize).min(self.0.len());
            let n = buf.len().min(self.0.len() - start);
            buf[..n].copy_from_slice(&self.0[start..start + n]);
            Ok(n)
        }
    }

    #[test]
    fn user_source_frames_copy() {
        let mut stream = Stream::from_source(Box::new(EchoSource(vec![7, 8, 9, 10])));
        stream.seek(1).unwrap();
        let mut frame = stream.frame(2).unwrap();
        assert_eq!(frame.get_u8().unwrap(), 8);
        assert_eq!(frame.get_u8().unwrap(), 9);
    }
}
