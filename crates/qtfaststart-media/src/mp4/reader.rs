//! Atom header reader and box-tree walkers.

use super::{Atom, AtomType};
use crate::{Error, Result};
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom};

/// Size of a compact atom header (size + type).
pub const HEADER_SIZE: u8 = 8;

/// Size of an atom header carrying a 64-bit extended size.
pub const EXTENDED_HEADER_SIZE: u8 = 16;

/// Reads atom headers from a seekable source.
pub struct AtomReader<R> {
    reader: R,
}

impl<R: Read + Seek> AtomReader<R> {
    /// Create a new atom reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read one atom header at the current position.
    ///
    /// On success the source is left immediately after the header, ready to
    /// read the body or seek past it.
    pub fn read_atom(&mut self) -> Result<Atom> {
        let position = self.reader.stream_position()?;

        let mut header = [0u8; 8];
        self.read_header_bytes(&mut header, position)?;

        let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let atom_type = AtomType::from_bytes([header[4], header[5], header[6], header[7]]);

        let (size, header_size) = if size == 1 {
            // 64-bit extended size
            let mut ext = [0u8; 8];
            self.read_header_bytes(&mut ext, position)?;
            (u64::from_be_bytes(ext), EXTENDED_HEADER_SIZE)
        } else {
            (size, HEADER_SIZE)
        };

        Ok(Atom {
            atom_type,
            position,
            size,
            header_size,
        })
    }

    /// Walk the top-level atoms starting at the current position.
    pub fn top_level(&mut self) -> TopLevelAtoms<'_, R> {
        TopLevelAtoms {
            reader: self,
            done: false,
        }
    }

    /// Get a mutable reference to the underlying source.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consume the reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_header_bytes(&mut self, buf: &mut [u8], position: u64) -> Result<()> {
        self.reader.read_exact(buf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                Error::EndOfData { offset: position }
            } else {
                Error::Io(e)
            }
        })
    }
}

/// Iterator over the top-level atoms of a file.
///
/// The walk stops, rather than fails, on the first header that cannot be
/// read: trailing garbage and truncated files simply end the sequence.
pub struct TopLevelAtoms<'a, R> {
    reader: &'a mut AtomReader<R>,
    done: bool,
}

impl<R: Read + Seek> Iterator for TopLevelAtoms<'_, R> {
    type Item = Atom;

    fn next(&mut self) -> Option<Atom> {
        if self.done {
            return None;
        }

        let atom = match self.reader.read_atom() {
            Ok(atom) => atom,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::trace!("Top-level walk ended: {}", _e);
                self.done = true;
                return None;
            }
        };

        if atom.size == 0 {
            // A zero-size mdat runs to end of file, nothing follows it,
            // whichever header width declared the size.
            if atom.atom_type == AtomType::MDAT {
                self.done = true;
                return Some(atom);
            }
            // Any other compact zero-size atom is stepped over header-only.
            if atom.header_size == HEADER_SIZE {
                return Some(atom);
            }
        }

        if atom.size < atom.header_size as u64 {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "Stopping at {} atom with impossible size {} at offset {}",
                atom.atom_type,
                atom.size,
                atom.position
            );
            self.done = true;
            return None;
        }

        if self.reader.get_mut().seek(SeekFrom::Start(atom.end())).is_err() {
            self.done = true;
        }

        Some(atom)
    }
}

/// Read the immediate children of `parent` from an in-memory buffer.
///
/// Positions are relative to the start of `data`. A child that is smaller
/// than its own header or that overruns `parent` is rejected.
pub fn read_children(data: &[u8], parent: &Atom) -> Result<Vec<Atom>> {
    let stop = parent.end().min(data.len() as u64);
    let mut reader = AtomReader::new(Cursor::new(data));
    reader
        .get_mut()
        .seek(SeekFrom::Start(parent.data_offset()))?;

    let mut children = Vec::new();
    let mut pos = parent.data_offset();

    while pos < stop {
        let child = reader.read_atom()?;

        if child.size < child.header_size as u64 || child.end() > stop {
            return Err(Error::InvalidAtomSize {
                atom_type: child.atom_type,
                position: child.position,
                size: child.size,
            });
        }

        pos = child.end();
        reader.get_mut().seek(SeekFrom::Start(pos))?;
        children.push(child);
    }

    Ok(children)
}
