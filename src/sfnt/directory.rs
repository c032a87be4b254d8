// glyphkit/src/sfnt/directory.rs
//
// Copyright © 2026 The Glyphkit Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The sfnt table directory, with TrueType Collection selection.

use log::trace;

use crate::error::{Error, FontResult};
use crate::fixed::Tag;
use crate::stream::Stream;

use super::{TAG_OTTO, TAG_TRUE, TAG_TTCF};

/// One entry of the table directory.
#[derive(Clone, Copy, Debug)]
pub struct TableEntry {
    pub tag: Tag,
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
}

/// A parsed sfnt table directory for one face of a resource.
#[derive(Clone, Debug)]
pub struct SfntDirectory {
    /// The sfnt version word (`0x00010000`, `true`, or `OTTO`).
    pub format: Tag,
    /// Number of faces in the resource (1 unless a collection).
    pub num_faces: u32,
    tables: Vec<TableEntry>,
}

impl SfntDirectory {
    /// A directory with no tables, used as a pre-move placeholder by
    /// driver faces that take ownership of their directory after parsing.
    pub(crate) fn empty() -> SfntDirectory {
        SfntDirectory {
            format: Tag(0),
            num_faces: 0,
            tables: Vec::new(),
        }
    }

    /// Parses the directory for `face_index`, handling the `ttcf` wrapper.
    ///
    /// Non-sfnt resources fail with `UnknownFileFormat` so driver probing
    /// can continue; malformed sfnt data fails with `InvalidFileFormat`.
    pub fn load(stream: &mut Stream, face_index: u32) -> FontResult<SfntDirectory> {
        stream.seek(0)?;
        if stream.len() < 12 {
            return Err(Error::UnknownFileFormat);
        }

        let mut num_faces = 1u32;
        let first_tag = Tag(stream.read_u32().map_err(|_| Error::UnknownFileFormat)?);
        let directory_start = if first_tag == TAG_TTCF {
            let mut frame = stream.frame(8)?;
            let _version = frame.get_u32()?;
            let count = frame.get_u32()?;
            drop(frame);
            if count == 0 || count > 0xFFFF {
                return Err(Error::InvalidFileFormat);
            }
            num_faces = count;
            if face_index >= count {
                return Err(Error::InvalidFaceIndex);
            }
            let mut offsets = stream.frame(count as usize * 4)?;
            let mut selected = 0;
            for n in 0..count {
                let offset = offsets.get_u32()?;
                if n == face_index {
                    selected = offset;
                }
            }
            u64::from(selected)
        } else {
            if face_index > 0 {
                return Err(Error::InvalidFaceIndex);
            }
            0
        };

        stream.seek(directory_start)?;
        let mut frame = stream.frame(12).map_err(|_| Error::UnknownFileFormat)?;
        let format = frame.get_tag()?;
        let num_tables = frame.get_u16()?;
        // searchRange / entrySelector / rangeShift are read for
        // validation only.
        let _search_range = frame.get_u16()?;
        let _entry_selector = frame.get_u16()?;
        let _range_shift = frame.get_u16()?;
        drop(frame);

        if format != Tag(0x00010000) && format != TAG_TRUE && format != TAG_OTTO {
            return Err(Error::UnknownFileFormat);
        }
        if num_tables == 0 {
            return Err(Error::InvalidFileFormat);
        }

        let mut tables = Vec::with_capacity(num_tables as usize);
        let mut frame = stream
            .frame(num_tables as usize * 16)
            .map_err(|_| Error::InvalidFileFormat)?;
        for _ in 0..num_tables {
            let entry = TableEntry {
                tag: frame.get_tag()?,
                checksum: frame.get_u32()?,
                offset: frame.get_u32()?,
                length: frame.get_u32()?,
            };
            trace!(
                "  {:?}  -  {:08x}  -  {:08x}",
                entry.tag,
                entry.offset,
                entry.length
            );
            tables.push(entry);
        }
        drop(frame);

        Ok(SfntDirectory {
            format,
            num_faces,
            tables,
        })
    }

    /// Looks up a table entry by tag.
    pub fn find(&self, tag: Tag) -> Option<&TableEntry> {
        self.tables.iter().find(|entry| entry.tag == tag)
    }

    /// Seeks the stream to the start of the named table and returns its
    /// length. A missing table is `TableMissing`, distinguishable from a
    /// malformed one.
    pub fn goto_table(&self, stream: &mut Stream, tag: Tag) -> FontResult<u32> {
        let entry = self.find(tag).ok_or(Error::TableMissing)?;
        stream.seek(u64::from(entry.offset))?;
        Ok(entry.length)
    }

    /// Reads the named table's bytes in full.
    pub fn read_table(&self, stream: &mut Stream, tag: Tag) -> FontResult<Vec<u8>> {
        let length = self.goto_table(stream, tag)?;
        let mut data = vec![0; length as usize];
        stream.read(&mut data)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::SfntBuilder;
    use std::rc::Rc;

    #[test]
    fn rejects_non_sfnt_data() {
        let mut stream = Stream::from_memory(Rc::new(b"%!PS-AdobeFont-1.0".to_vec()));
        assert_eq!(
            SfntDirectory::load(&mut stream, 0).unwrap_err(),
            Error::UnknownFileFormat
        );
    }

    #[test]
    fn loads_directory_and_finds_tables() {
        let mut builder = SfntBuilder::new(0x00010000);
        builder.add_table(*b"abcd", vec![1, 2, 3, 4]);
        builder.add_table(*b"wxyz", vec![9]);
        let bytes = builder.build();
        let mut stream = Stream::from_memory(Rc::new(bytes));
        let dir = SfntDirectory::load(&mut stream, 0).unwrap();
        assert_eq!(dir.num_faces, 1);
        let length = dir.goto_table(&mut stream, Tag::new(b"abcd")).unwrap();
        assert_eq!(length, 4);
        assert_eq!(stream.read_u32().unwrap(), 0x01020304);
        assert_eq!(
            dir.goto_table(&mut stream, Tag::new(b"none")).unwrap_err(),
            Error::TableMissing
        );
    }

    #[test]
    fn collection_face_selection() {
        let mut builder = SfntBuilder::new(0x00010000);
        builder.add_table(*b"abcd", vec![7; 8]);
        let collection = builder.build_collection(3);
        let mut stream = Stream::from_memory(Rc::new(collection));
        let dir = SfntDirectory::load(&mut stream, 2).unwrap();
        assert_eq!(dir.num_faces, 3);
        assert!(dir.find(Tag::new(b"abcd")).is_some());
        let mut stream2 = Stream::from_memory(stream_bytes(&stream));
        assert_eq!(
            SfntDirectory::load(&mut stream2, 3).unwrap_err(),
            Error::InvalidFaceIndex
        );
    }

    fn stream_bytes(_stream: &Stream) -> Rc<Vec<u8>> {
        // Rebuild the collection; streams do not expose their backing.
        let mut builder = SfntBuilder::new(0x00010000);
        builder.add_table(*b"abcd", vec![7; 8]);
        Rc::new(builder.build_collection(3))
    }
}
